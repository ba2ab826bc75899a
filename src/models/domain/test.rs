use async_graphql::{Enum, SimpleObject};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The four option slots every question carries, keyed `a`..`d`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, Enum)]
#[serde(rename_all = "lowercase")]
pub enum OptionKey {
    A,
    B,
    C,
    D,
}

impl OptionKey {
    pub const ALL: [OptionKey; 4] = [OptionKey::A, OptionKey::B, OptionKey::C, OptionKey::D];

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKey::A => "a",
            OptionKey::B => "b",
            OptionKey::C => "c",
            OptionKey::D => "d",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, SimpleObject)]
pub struct QuestionOptions {
    pub a: String,
    pub b: String,
    pub c: String,
    pub d: String,
}

impl QuestionOptions {
    pub fn get(&self, key: OptionKey) -> &str {
        match key {
            OptionKey::A => &self.a,
            OptionKey::B => &self.b,
            OptionKey::C => &self.c,
            OptionKey::D => &self.d,
        }
    }
}

/// A single four-option question. The correct key is typed, so it can only
/// ever name one of the four declared options.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, SimpleObject)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub options: QuestionOptions,
    pub correct_option: OptionKey,
    pub marks: i16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, Enum)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Draft,
    Published,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Draft => "draft",
            TestStatus::Published => "published",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, SimpleObject)]
pub struct Test {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub description: String,
    pub duration_minutes: i16,
    pub questions: Vec<Question>,
    /// Always the sum of the questions' marks, recomputed on every edit.
    pub total_marks: i16,
    pub status: TestStatus,
    pub created_by_user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_edited_by_user_id: Option<String>,
    pub attempts: i64,
    pub highest_score: i16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl Test {
    pub fn new(
        organization_id: &str,
        name: &str,
        description: &str,
        duration_minutes: i16,
        questions: Vec<Question>,
        created_by_user_id: &str,
    ) -> Self {
        let total_marks = Self::sum_marks(&questions);
        Test {
            id: Uuid::new_v4().to_string(),
            organization_id: organization_id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            duration_minutes,
            questions,
            total_marks,
            status: TestStatus::Draft,
            created_by_user_id: created_by_user_id.to_string(),
            last_edited_by_user_id: None,
            attempts: 0,
            highest_score: 0,
            created_at: Some(Utc::now()),
            modified_at: Some(Utc::now()),
        }
    }

    pub fn sum_marks(questions: &[Question]) -> i16 {
        questions.iter().map(|q| q.marks).sum()
    }

    pub fn recompute_total_marks(&mut self) {
        self.total_marks = Self::sum_marks(&self.questions);
    }
}

#[cfg(test)]
pub mod fixtures {
    use super::*;

    pub fn question(text: &str, correct: OptionKey, marks: i16) -> Question {
        Question {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            options: QuestionOptions {
                a: "Option A".to_string(),
                b: "Option B".to_string(),
                c: "Option C".to_string(),
                d: "Option D".to_string(),
            },
            correct_option: correct,
            marks,
        }
    }

    pub fn two_question_test() -> Test {
        Test::new(
            "org-1",
            "Sample Test",
            "Two questions, marks 2 and 3",
            10,
            vec![
                question("First question", OptionKey::A, 2),
                question("Second question", OptionKey::B, 3),
            ],
            "teacher-1",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_total_marks_is_sum_of_question_marks() {
        let test = two_question_test();
        assert_eq!(test.total_marks, 5);
    }

    #[test]
    fn test_recompute_total_marks_after_edit() {
        let mut test = two_question_test();
        test.questions.push(question("Third", OptionKey::D, 7));
        test.recompute_total_marks();

        assert_eq!(test.total_marks, 12);
    }

    #[test]
    fn test_new_test_starts_as_draft() {
        let test = two_question_test();
        assert_eq!(test.status, TestStatus::Draft);
        assert_eq!(test.attempts, 0);
        assert_eq!(test.highest_score, 0);
    }

    #[test]
    fn test_option_key_serialization() {
        let json = serde_json::to_string(&OptionKey::C).unwrap();
        assert_eq!(json, "\"c\"");

        let parsed: OptionKey = serde_json::from_str("\"a\"").unwrap();
        assert_eq!(parsed, OptionKey::A);
    }

    #[test]
    fn test_options_lookup_by_key() {
        let q = question("Q", OptionKey::B, 1);
        assert_eq!(q.options.get(OptionKey::B), "Option B");
        assert_eq!(q.options.get(q.correct_option), "Option B");
    }
}
