use async_graphql::InputObject;
use once_cell::sync::Lazy;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::models::domain::test::OptionKey;
use crate::models::domain::test_attempt::AnswerMap;
use crate::models::domain::user::UserRole;

static USERNAME_REGEX: Lazy<regex::Regex> = Lazy::new(|| {
    regex::Regex::new(r"^[a-zA-Z0-9_]+$").expect("USERNAME_REGEX is a valid regex pattern")
});

/// Answer map keys are question position keys: `q0`, `q1`, ...
static ANSWER_KEY_REGEX: Lazy<regex::Regex> =
    Lazy::new(|| regex::Regex::new(r"^q\d+$").expect("ANSWER_KEY_REGEX is a valid regex pattern"));

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterOrganizationRequest {
    #[validate(length(min = 1, max = 100))]
    pub organization_name: String,

    #[validate(nested)]
    pub admin: CreateUserRequest,
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100))]
    pub last_name: String,

    #[validate(
        length(min = 3, max = 50),
        regex(
            path = *USERNAME_REGEX,
            message = "Username must be alphanumeric with underscores"
        )
    )]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    pub role: UserRole,
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,

    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct QuestionOptionsInput {
    #[validate(length(min = 1, max = 500))]
    pub a: String,

    #[validate(length(min = 1, max = 500))]
    pub b: String,

    #[validate(length(min = 1, max = 500))]
    pub c: String,

    #[validate(length(min = 1, max = 500))]
    pub d: String,
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct QuestionInput {
    #[validate(length(min = 1, max = 1000))]
    pub text: String,

    #[validate(nested)]
    pub options: QuestionOptionsInput,

    pub correct_option: OptionKey,

    #[validate(range(min = 1, max = 20))]
    pub marks: i16,
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct CreateTestRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,

    #[validate(length(max = 2000))]
    pub description: String,

    #[validate(range(min = 5, max = 180))]
    pub duration_minutes: i16,

    #[validate(nested)]
    pub questions: Vec<QuestionInput>,
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct UpdateTestRequest {
    pub id: String,

    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    #[validate(range(min = 5, max = 180))]
    pub duration_minutes: Option<i16>,

    #[validate(nested)]
    pub questions: Option<Vec<QuestionInput>>,
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct AnswerInput {
    #[validate(regex(
        path = *ANSWER_KEY_REGEX,
        message = "Answer keys must look like q0, q1, ..."
    ))]
    pub question_key: String,

    pub selected_option: OptionKey,
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct SaveAnswersInput {
    pub attempt_id: String,

    #[validate(nested)]
    pub answers: Vec<AnswerInput>,
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct SubmitAttemptInput {
    pub attempt_id: String,

    #[validate(nested)]
    pub answers: Vec<AnswerInput>,
}

/// Collapses answer inputs into the persisted map shape. Later duplicates of
/// the same key overwrite earlier ones, matching last-write-wins saves.
pub fn answers_to_map(answers: &[AnswerInput]) -> AnswerMap {
    answers
        .iter()
        .map(|a| (a.question_key.clone(), a.selected_option))
        .collect()
}

/// Used where validator's derive cannot reach: answer keys must stay inside
/// the question range of the attempt they belong to.
pub fn validate_answer_keys(answers: &AnswerMap, total_questions: i16) -> Result<(), ValidationError> {
    for key in answers.keys() {
        if !ANSWER_KEY_REGEX.is_match(key) {
            return Err(ValidationError::new("malformed_answer_key"));
        }
        let index: i64 = key[1..].parse().unwrap_or(i64::MAX);
        if index >= total_questions as i64 {
            return Err(ValidationError::new("answer_key_out_of_range"));
        }
    }
    Ok(())
}
