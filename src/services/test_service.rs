use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::{AppError, AppResult},
    models::domain::test::{Question, QuestionOptions, Test, TestStatus},
    models::dto::request::{CreateTestRequest, QuestionInput, UpdateTestRequest},
    repositories::TestRepository,
};

pub struct TestService {
    repository: Arc<dyn TestRepository>,
}

impl TestService {
    pub fn new(repository: Arc<dyn TestRepository>) -> Self {
        Self { repository }
    }

    pub async fn get_test(&self, id: &str) -> AppResult<Test> {
        let test = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Test with id '{}' not found", id)))?;

        Ok(test)
    }

    pub async fn create_test(
        &self,
        request: CreateTestRequest,
        organization_id: &str,
        creator_id: &str,
    ) -> AppResult<Test> {
        request.validate()?;

        if self
            .repository
            .find_by_name_in_organization(organization_id, &request.name)
            .await?
            .is_some()
        {
            return Err(AppError::AlreadyExists(format!(
                "A test named '{}' already exists in this organization",
                request.name
            )));
        }

        let questions = request
            .questions
            .into_iter()
            .map(question_from_input)
            .collect();

        let test = Test::new(
            organization_id,
            &request.name,
            &request.description,
            request.duration_minutes,
            questions,
            creator_id,
        );

        self.repository.create(test).await
    }

    /// Applies a partial edit. Replacing the question list recomputes the
    /// derived total marks so the invariant `total == sum(marks)` holds.
    pub async fn update_test(&self, request: UpdateTestRequest, editor_id: &str) -> AppResult<Test> {
        request.validate()?;

        let mut test = self.get_test(&request.id).await?;

        if let Some(name) = request.name {
            if name != test.name
                && self
                    .repository
                    .find_by_name_in_organization(&test.organization_id, &name)
                    .await?
                    .is_some()
            {
                return Err(AppError::AlreadyExists(format!(
                    "A test named '{}' already exists in this organization",
                    name
                )));
            }
            test.name = name;
        }
        if let Some(description) = request.description {
            test.description = description;
        }
        if let Some(duration_minutes) = request.duration_minutes {
            test.duration_minutes = duration_minutes;
        }
        if let Some(questions) = request.questions {
            test.questions = questions.into_iter().map(question_from_input).collect();
            test.recompute_total_marks();
        }

        test.last_edited_by_user_id = Some(editor_id.to_string());
        test.modified_at = Some(Utc::now());

        self.repository.update(test).await
    }

    pub async fn publish_test(&self, id: &str, editor_id: &str) -> AppResult<Test> {
        let mut test = self.get_test(id).await?;

        if test.questions.is_empty() {
            return Err(AppError::BadRequest(
                "A test needs at least one question before it can be published".to_string(),
            ));
        }
        if test.status == TestStatus::Published {
            return Err(AppError::BadRequest("Test is already published".to_string()));
        }

        test.status = TestStatus::Published;
        test.last_edited_by_user_id = Some(editor_id.to_string());
        test.modified_at = Some(Utc::now());

        self.repository.update(test).await
    }

    pub async fn list_tests(
        &self,
        organization_id: &str,
        status: Option<TestStatus>,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<Test>, i64)> {
        self.repository
            .list_by_organization(organization_id, status, offset, limit)
            .await
    }
}

fn question_from_input(input: QuestionInput) -> Question {
    Question {
        id: Uuid::new_v4().to_string(),
        text: input.text,
        options: QuestionOptions {
            a: input.options.a,
            b: input.options.b,
            c: input.options.c,
            d: input.options.d,
        },
        correct_option: input.correct_option,
        marks: input.marks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::test::fixtures::two_question_test;
    use crate::models::domain::test::OptionKey;
    use crate::models::dto::request::QuestionOptionsInput;
    use crate::repositories::MockTestRepository;

    fn create_request(name: &str) -> CreateTestRequest {
        CreateTestRequest {
            name: name.to_string(),
            description: "desc".to_string(),
            duration_minutes: 30,
            questions: vec![QuestionInput {
                text: "What is 2 + 2?".to_string(),
                options: QuestionOptionsInput {
                    a: "3".to_string(),
                    b: "4".to_string(),
                    c: "5".to_string(),
                    d: "6".to_string(),
                },
                correct_option: OptionKey::B,
                marks: 5,
            }],
        }
    }

    #[actix_rt::test]
    async fn create_test_computes_total_marks() {
        let mut repo = MockTestRepository::new();
        repo.expect_find_by_name_in_organization()
            .returning(|_, _| Ok(None));
        repo.expect_create().returning(|test| Ok(test));

        let service = TestService::new(Arc::new(repo));
        let test = service
            .create_test(create_request("Maths"), "org-1", "teacher-1")
            .await
            .unwrap();

        assert_eq!(test.total_marks, 5);
        assert_eq!(test.status, TestStatus::Draft);
        assert_eq!(test.created_by_user_id, "teacher-1");
    }

    #[actix_rt::test]
    async fn create_test_rejects_duplicate_name_in_organization() {
        let mut repo = MockTestRepository::new();
        repo.expect_find_by_name_in_organization()
            .returning(|_, _| Ok(Some(two_question_test())));

        let service = TestService::new(Arc::new(repo));
        let result = service
            .create_test(create_request("Sample Test"), "org-1", "teacher-1")
            .await;

        assert!(matches!(result, Err(AppError::AlreadyExists(_))));
    }

    #[actix_rt::test]
    async fn update_test_recomputes_total_marks() {
        let existing = two_question_test();
        let existing_id = existing.id.clone();

        let mut repo = MockTestRepository::new();
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        repo.expect_update().returning(|test| Ok(test));

        let service = TestService::new(Arc::new(repo));

        let request = UpdateTestRequest {
            id: existing_id,
            name: None,
            description: None,
            duration_minutes: None,
            questions: Some(vec![QuestionInput {
                text: "Only question".to_string(),
                options: QuestionOptionsInput {
                    a: "w".to_string(),
                    b: "x".to_string(),
                    c: "y".to_string(),
                    d: "z".to_string(),
                },
                correct_option: OptionKey::D,
                marks: 20,
            }]),
        };

        let updated = service.update_test(request, "editor-1").await.unwrap();
        assert_eq!(updated.total_marks, 20);
        assert_eq!(updated.questions.len(), 1);
        assert_eq!(
            updated.last_edited_by_user_id,
            Some("editor-1".to_string())
        );
    }

    #[actix_rt::test]
    async fn publish_requires_questions() {
        let mut empty = two_question_test();
        empty.questions.clear();
        empty.recompute_total_marks();
        let id = empty.id.clone();

        let mut repo = MockTestRepository::new();
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(empty.clone())));

        let service = TestService::new(Arc::new(repo));
        let result = service.publish_test(&id, "teacher-1").await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[actix_rt::test]
    async fn publish_transitions_draft_to_published() {
        let draft = two_question_test();
        let id = draft.id.clone();

        let mut repo = MockTestRepository::new();
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(draft.clone())));
        repo.expect_update().returning(|test| Ok(test));

        let service = TestService::new(Arc::new(repo));
        let published = service.publish_test(&id, "teacher-1").await.unwrap();

        assert_eq!(published.status, TestStatus::Published);
    }
}
