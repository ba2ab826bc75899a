use async_graphql::SimpleObject;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::domain::test::{OptionKey, Question, QuestionOptions, Test, TestStatus};
use crate::models::domain::test_attempt::{AnswerMap, AttemptStatus, TestAttempt};
use crate::models::domain::User;

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct UserDto {
    pub id: String,
    pub organization_id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: crate::models::domain::UserRole,
    pub attempted_tests: i64,
    #[graphql(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        UserDto {
            id: user.id,
            organization_id: user.organization_id,
            username: user.username,
            email: user.email,
            full_name: format!("{} {}", user.first_name, user.last_name),
            role: user.role,
            attempted_tests: user.attempted_tests,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize, SimpleObject)]
#[graphql(concrete(name = "UserResponse", params(UserDto)))]
pub struct ApiResponse<T: async_graphql::OutputType> {
    pub data: T,
    pub message: String,
}

pub type CreateUserResponse = ApiResponse<UserDto>;
pub type UpdateUserResponse = ApiResponse<UserDto>;

#[derive(Debug, Serialize, SimpleObject)]
pub struct DeleteUserResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct PaginationMetadata {
    pub offset: i64,
    pub limit: i64,
    pub total: i64,
}

#[derive(Debug, Serialize, SimpleObject)]
pub struct PaginatedResponseUserDto {
    pub data: Vec<UserDto>,
    pub pagination: PaginationMetadata,
}

#[derive(Debug, Serialize, SimpleObject)]
pub struct PaginatedResponseTestDto {
    pub data: Vec<TestDto>,
    pub pagination: PaginationMetadata,
}

#[derive(Debug, Serialize, SimpleObject)]
pub struct PaginatedResponseAttempt {
    pub data: Vec<AttemptResponse>,
    pub pagination: PaginationMetadata,
}

/// Test metadata without question bodies, safe for listings.
#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct TestDto {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub description: String,
    pub duration_minutes: i16,
    pub question_count: i64,
    pub total_marks: i16,
    pub status: TestStatus,
    pub created_by_user_id: String,
    pub attempts: i64,
    pub highest_score: i16,
}

impl From<Test> for TestDto {
    fn from(test: Test) -> Self {
        TestDto {
            id: test.id,
            organization_id: test.organization_id,
            name: test.name,
            description: test.description,
            duration_minutes: test.duration_minutes,
            question_count: test.questions.len() as i64,
            total_marks: test.total_marks,
            status: test.status,
            created_by_user_id: test.created_by_user_id,
            attempts: test.attempts,
            highest_score: test.highest_score,
        }
    }
}

/// A question as shown to a student taking the test: the correct option
/// never crosses the wire.
#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct QuestionForTaking {
    pub id: String,
    pub text: String,
    pub options: QuestionOptions,
    pub marks: i16,
}

impl From<Question> for QuestionForTaking {
    fn from(question: Question) -> Self {
        QuestionForTaking {
            id: question.id,
            text: question.text,
            options: question.options,
            marks: question.marks,
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct TestForTaking {
    pub id: String,
    pub name: String,
    pub description: String,
    pub duration_minutes: i16,
    pub total_marks: i16,
    pub questions: Vec<QuestionForTaking>,
}

impl TestForTaking {
    pub fn from_test(test: Test) -> Self {
        TestForTaking {
            id: test.id,
            name: test.name,
            description: test.description,
            duration_minutes: test.duration_minutes,
            total_marks: test.total_marks,
            questions: test
                .questions
                .into_iter()
                .map(QuestionForTaking::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct AnswerEntry {
    pub question_key: String,
    pub selected_option: OptionKey,
}

/// Answer map entries ordered by question position for stable output.
pub fn answers_to_entries(answers: &AnswerMap) -> Vec<AnswerEntry> {
    let mut entries: Vec<AnswerEntry> = answers
        .iter()
        .map(|(key, option)| AnswerEntry {
            question_key: key.clone(),
            selected_option: *option,
        })
        .collect();
    entries.sort_by_key(|e| {
        e.question_key
            .get(1..)
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(i64::MAX)
    });
    entries
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct AttemptResponse {
    pub id: String,
    pub test_id: String,
    pub student_id: String,
    pub status: AttemptStatus,
    pub answers: Vec<AnswerEntry>,
    pub score_achieved: i16,
    pub correct_answer_count: i16,
    pub total_questions: i16,
    pub time_taken_seconds: i64,
    pub start_time: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl From<TestAttempt> for AttemptResponse {
    fn from(attempt: TestAttempt) -> Self {
        AttemptResponse {
            id: attempt.id,
            test_id: attempt.test_id,
            student_id: attempt.student_id,
            status: attempt.status,
            answers: answers_to_entries(&attempt.answers),
            score_achieved: attempt.score_achieved,
            correct_answer_count: attempt.correct_answer_count,
            total_questions: attempt.total_questions,
            time_taken_seconds: attempt.time_taken_seconds,
            start_time: attempt.start_time,
            deadline: attempt.deadline,
            end_time: attempt.end_time,
        }
    }
}

#[derive(Debug, Serialize, SimpleObject)]
pub struct StartAttemptResponse {
    pub attempt: AttemptResponse,
    /// True when an existing in-progress attempt was picked up instead of a
    /// fresh one being created.
    pub resumed: bool,
    pub remaining_seconds: i64,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct QuestionResultDetail {
    pub question_id: String,
    pub question_key: String,
    pub text: String,
    pub options: QuestionOptions,
    pub correct_option: OptionKey,
    pub selected_option: Option<OptionKey>,
    pub is_correct: bool,
    pub marks_awarded: i16,
    pub marks_possible: i16,
}

#[derive(Debug, Serialize, SimpleObject)]
pub struct AttemptReview {
    pub attempt: AttemptResponse,
    pub test_id: String,
    pub test_name: String,
    pub total_marks: i16,
    pub question_results: Vec<QuestionResultDetail>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::test::fixtures::two_question_test;
    use crate::models::domain::test_attempt::answer_key;
    use crate::models::domain::UserRole;

    #[test]
    fn test_user_dto_full_name() {
        let user = User::new(
            "org-1",
            "johndoe",
            "john@example.com",
            "John",
            "Doe",
            UserRole::Teacher,
            "hash".to_string(),
        );

        let dto: UserDto = user.into();
        assert_eq!(dto.full_name, "John Doe");
        assert_eq!(dto.username, "johndoe");
    }

    #[test]
    fn test_test_for_taking_strips_correct_options() {
        let test = two_question_test();
        let for_taking = TestForTaking::from_test(test);

        assert_eq!(for_taking.questions.len(), 2);
        assert_eq!(for_taking.total_marks, 5);
        // QuestionForTaking has no correct_option field; the serialized form
        // must not leak it either.
        let json = serde_json::to_string(&for_taking).unwrap();
        assert!(!json.contains("correct_option"));
    }

    #[test]
    fn test_answer_entries_sorted_by_position() {
        let mut answers = AnswerMap::new();
        answers.insert(answer_key(10), OptionKey::C);
        answers.insert(answer_key(2), OptionKey::A);
        answers.insert(answer_key(0), OptionKey::B);

        let entries = answers_to_entries(&answers);
        let keys: Vec<&str> = entries.iter().map(|e| e.question_key.as_str()).collect();
        assert_eq!(keys, vec!["q0", "q2", "q10"]);
    }
}
