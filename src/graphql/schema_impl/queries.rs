use async_graphql::{Context, Object, ID};

use crate::{
    app_state::AppState,
    auth::{
        can_view_attempt, extract_claims_from_context, require_admin, require_owner_or_admin,
        require_same_organization, require_test_manager,
    },
    errors::{AppError, AppResult},
    graphql::helpers::{parse_id, validate_test_available_for_taking},
    models::{
        domain::test::{Test, TestStatus},
        domain::test_attempt::{answer_key, TestAttempt},
        dto::response::{
            AttemptResponse, AttemptReview, PaginatedResponseAttempt, PaginatedResponseTestDto,
            PaginatedResponseUserDto, PaginationMetadata, QuestionResultDetail, TestDto,
            TestForTaking, UserDto,
        },
    },
};

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn me(&self, ctx: &Context<'_>) -> AppResult<UserDto> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx)?;

        state.user_service.get_user(&claims.sub).await
    }

    async fn user(&self, ctx: &Context<'_>, id: ID) -> AppResult<UserDto> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx)?;

        let id_str = parse_id(&id)?;
        require_owner_or_admin(&claims, &id_str)?;

        let user = state.user_service.get_user(&id_str).await?;
        require_same_organization(&claims, &user.organization_id)?;

        Ok(user)
    }

    async fn users(
        &self,
        ctx: &Context<'_>,
        offset: Option<i64>,
        limit: Option<i64>,
    ) -> AppResult<PaginatedResponseUserDto> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx)?;

        require_admin(&claims)?;

        let offset = offset.unwrap_or(0).max(0);
        let limit = limit.unwrap_or(20).clamp(1, 100);

        state
            .user_service
            .get_all_users_paginated(&claims.organization_id, offset, limit)
            .await
    }

    async fn organization(
        &self,
        ctx: &Context<'_>,
    ) -> AppResult<crate::models::domain::Organization> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx)?;

        state
            .organization_service
            .get_organization(&claims.organization_id)
            .await
    }

    /// Full test including correct options; authors and admins only.
    async fn test(&self, ctx: &Context<'_>, id: ID) -> AppResult<Test> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx)?;

        require_test_manager(&claims)?;

        let id_str = parse_id(&id)?;
        let test = state.test_service.get_test(&id_str).await?;
        require_same_organization(&claims, &test.organization_id)?;

        Ok(test)
    }

    /// The student-facing view: correct options are stripped before the
    /// response leaves the server.
    async fn test_for_taking(&self, ctx: &Context<'_>, id: ID) -> AppResult<TestForTaking> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx)?;

        let id_str = parse_id(&id)?;
        let test = state.test_service.get_test(&id_str).await?;

        require_same_organization(&claims, &test.organization_id)?;
        validate_test_available_for_taking(&test.status)?;

        Ok(TestForTaking::from_test(test))
    }

    async fn tests(
        &self,
        ctx: &Context<'_>,
        offset: Option<i64>,
        limit: Option<i64>,
    ) -> AppResult<PaginatedResponseTestDto> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx)?;

        let offset = offset.unwrap_or(0).max(0);
        let limit = limit.unwrap_or(20).clamp(1, 100);

        // Students only see what they can take; authors also see drafts.
        let status_filter = if claims.role.can_manage_tests() {
            None
        } else {
            Some(TestStatus::Published)
        };

        let (tests, total) = state
            .test_service
            .list_tests(&claims.organization_id, status_filter, offset, limit)
            .await?;

        Ok(PaginatedResponseTestDto {
            data: tests.into_iter().map(TestDto::from).collect(),
            pagination: PaginationMetadata {
                offset,
                limit,
                total,
            },
        })
    }

    async fn attempt(&self, ctx: &Context<'_>, id: ID) -> AppResult<AttemptResponse> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx)?;

        let id_str = parse_id(&id)?;
        let attempt = state.attempt_service.get_attempt(&id_str).await?;

        self::authorize_attempt_access(ctx, &claims, &attempt).await?;

        Ok(AttemptResponse::from(attempt))
    }

    async fn my_attempts(
        &self,
        ctx: &Context<'_>,
        test_id: Option<ID>,
        offset: Option<i64>,
        limit: Option<i64>,
    ) -> AppResult<PaginatedResponseAttempt> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx)?;

        let offset = offset.unwrap_or(0).max(0);
        let limit = limit.unwrap_or(10).clamp(1, 50);

        let test_id = match test_id {
            Some(id) => Some(parse_id(&id)?),
            None => None,
        };

        let (attempts, total) = state
            .attempt_repository
            .list_by_student(&claims.sub, test_id, offset, limit)
            .await?;

        Ok(PaginatedResponseAttempt {
            data: attempts.into_iter().map(AttemptResponse::from).collect(),
            pagination: PaginationMetadata {
                offset,
                limit,
                total,
            },
        })
    }

    /// Every attempt at one test; teachers and admins of the owning org.
    async fn test_attempts(
        &self,
        ctx: &Context<'_>,
        test_id: ID,
        offset: Option<i64>,
        limit: Option<i64>,
    ) -> AppResult<PaginatedResponseAttempt> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx)?;

        require_test_manager(&claims)?;

        let test_id = parse_id(&test_id)?;
        let test = state.test_service.get_test(&test_id).await?;
        require_same_organization(&claims, &test.organization_id)?;

        let offset = offset.unwrap_or(0).max(0);
        let limit = limit.unwrap_or(10).clamp(1, 50);

        let (attempts, total) = state
            .attempt_repository
            .list_by_test(&test_id, offset, limit)
            .await?;

        Ok(PaginatedResponseAttempt {
            data: attempts.into_iter().map(AttemptResponse::from).collect(),
            pagination: PaginationMetadata {
                offset,
                limit,
                total,
            },
        })
    }

    /// Per-question breakdown of an attempt against its test.
    async fn attempt_review(&self, ctx: &Context<'_>, attempt_id: ID) -> AppResult<AttemptReview> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx)?;

        let attempt_id = parse_id(&attempt_id)?;
        let attempt = state.attempt_service.get_attempt(&attempt_id).await?;

        self::authorize_attempt_access(ctx, &claims, &attempt).await?;

        let test = state.test_service.get_test(&attempt.test_id).await?;

        let question_results = test
            .questions
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let key = answer_key(index);
                let selected = attempt.answers.get(&key).copied();
                let is_correct = selected == Some(question.correct_option);

                QuestionResultDetail {
                    question_id: question.id.clone(),
                    question_key: key,
                    text: question.text.clone(),
                    options: question.options.clone(),
                    correct_option: question.correct_option,
                    selected_option: selected,
                    is_correct,
                    marks_awarded: if is_correct { question.marks } else { 0 },
                    marks_possible: question.marks,
                }
            })
            .collect();

        Ok(AttemptReview {
            attempt: AttemptResponse::from(attempt),
            test_id: test.id.clone(),
            test_name: test.name.clone(),
            total_marks: test.total_marks,
            question_results,
        })
    }
}

/// Students reach their own attempts; teachers and admins reach attempts on
/// tests owned by their organization.
async fn authorize_attempt_access(
    ctx: &Context<'_>,
    claims: &crate::auth::Claims,
    attempt: &TestAttempt,
) -> AppResult<()> {
    can_view_attempt(claims, &attempt.student_id)?;

    if claims.sub != attempt.student_id {
        let state = ctx.data::<AppState>().map_err(AppError::from)?;
        let test = state.test_service.get_test(&attempt.test_id).await?;
        require_same_organization(claims, &test.organization_id)?;
    }

    Ok(())
}
