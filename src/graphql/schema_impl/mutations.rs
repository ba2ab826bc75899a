use std::sync::Arc;

use async_graphql::{Context, Object, ID};
use chrono::Utc;

use crate::{
    app_state::AppState,
    auth::{
        extract_claims_from_context, require_admin, require_owner_or_admin,
        require_same_organization, require_test_manager,
    },
    errors::{AppError, AppResult},
    graphql::helpers::parse_id,
    models::{
        domain::test::Test,
        domain::user::UserRole,
        dto::{
            request::{
                answers_to_map, CreateTestRequest, CreateUserRequest, SaveAnswersInput,
                SubmitAttemptInput, UpdateTestRequest, UpdateUserRequest,
            },
            response::{
                AttemptResponse, CreateUserResponse, DeleteUserResponse, StartAttemptResponse,
                UpdateUserResponse,
            },
        },
    },
    services::attempt_service::schedule_auto_timeout,
};

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn create_user(
        &self,
        ctx: &Context<'_>,
        input: CreateUserRequest,
    ) -> AppResult<CreateUserResponse> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx)?;

        require_admin(&claims)?;
        if input.role == UserRole::Superadmin {
            return Err(AppError::Forbidden(
                "Superadmin accounts cannot be created through the API".to_string(),
            ));
        }

        state
            .user_service
            .create_user(input, &claims.organization_id)
            .await
    }

    async fn update_user(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: UpdateUserRequest,
    ) -> AppResult<UpdateUserResponse> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx)?;

        let id_str = parse_id(&id)?;
        require_owner_or_admin(&claims, &id_str)?;

        let target = state.user_service.get_user_by_id(&id_str).await?;
        require_same_organization(&claims, &target.organization_id)?;

        state.user_service.update_user(&id_str, input).await
    }

    async fn delete_user(&self, ctx: &Context<'_>, id: ID) -> AppResult<DeleteUserResponse> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx)?;

        require_admin(&claims)?;

        let id_str = parse_id(&id)?;
        let target = state.user_service.get_user_by_id(&id_str).await?;
        require_same_organization(&claims, &target.organization_id)?;

        let response = state.user_service.delete_user(&id_str).await?;

        // A deleted account keeps no live sessions.
        state.refresh_tokens.revoke_all_for_user(&id_str).await?;

        Ok(response)
    }

    async fn create_test(&self, ctx: &Context<'_>, input: CreateTestRequest) -> AppResult<Test> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx)?;

        require_test_manager(&claims)?;

        state
            .test_service
            .create_test(input, &claims.organization_id, &claims.sub)
            .await
    }

    async fn update_test(&self, ctx: &Context<'_>, input: UpdateTestRequest) -> AppResult<Test> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx)?;

        require_test_manager(&claims)?;

        let existing = state.test_service.get_test(&input.id).await?;
        require_same_organization(&claims, &existing.organization_id)?;

        state.test_service.update_test(input, &claims.sub).await
    }

    async fn publish_test(&self, ctx: &Context<'_>, id: ID) -> AppResult<Test> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx)?;

        require_test_manager(&claims)?;

        let id_str = parse_id(&id)?;
        let existing = state.test_service.get_test(&id_str).await?;
        require_same_organization(&claims, &existing.organization_id)?;

        state.test_service.publish_test(&id_str, &claims.sub).await
    }

    /// Creates or resumes the caller's attempt at a test. A fresh attempt
    /// gets an in-process countdown that times it out at the deadline.
    async fn start_attempt(&self, ctx: &Context<'_>, test_id: ID) -> AppResult<StartAttemptResponse> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx)?;

        let test_id = parse_id(&test_id)?;
        let test = state.test_service.get_test(&test_id).await?;
        require_same_organization(&claims, &test.organization_id)?;

        let started = state.attempt_service.start(&test_id, &claims.sub).await?;

        if !started.resumed {
            schedule_auto_timeout(Arc::clone(&state.attempt_service), &started.attempt);
        }

        let remaining_seconds = started.attempt.remaining_seconds(Utc::now());
        Ok(StartAttemptResponse {
            attempt: AttemptResponse::from(started.attempt),
            resumed: started.resumed,
            remaining_seconds,
        })
    }

    /// Auto-save: overwrites the attempt's whole answer map.
    async fn save_answers(&self, ctx: &Context<'_>, input: SaveAnswersInput) -> AppResult<bool> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx)?;

        let attempt_id = parse_id(&input.attempt_id)?;
        let attempt = state.attempt_service.get_attempt(&attempt_id).await?;
        if attempt.student_id != claims.sub {
            return Err(AppError::Forbidden(
                "You can only save answers on your own attempt".to_string(),
            ));
        }

        let answers = answers_to_map(&input.answers);
        state
            .attempt_service
            .update_answers(&attempt_id, &answers)
            .await?;

        Ok(true)
    }

    /// Explicit submit with the full in-memory answer map, which is
    /// authoritative for scoring.
    async fn submit_attempt(
        &self,
        ctx: &Context<'_>,
        input: SubmitAttemptInput,
    ) -> AppResult<AttemptResponse> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx)?;

        let attempt_id = parse_id(&input.attempt_id)?;
        let attempt = state.attempt_service.get_attempt(&attempt_id).await?;
        if attempt.student_id != claims.sub {
            return Err(AppError::Forbidden(
                "You can only submit your own attempt".to_string(),
            ));
        }

        let answers = answers_to_map(&input.answers);
        let finalized = state
            .attempt_service
            .complete(&attempt_id, &answers, Utc::now())
            .await?;

        Ok(AttemptResponse::from(finalized))
    }
}
