use std::collections::HashMap;

use async_graphql::Enum;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::test::{OptionKey, Test};

/// Student answers keyed by question position (`q0`, `q1`, ...).
pub type AnswerMap = HashMap<String, OptionKey>;

/// Storage key for the answer at question position `index`.
pub fn answer_key(index: usize) -> String {
    format!("q{}", index)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, Enum)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Completed,
    TimedOut,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Completed => "completed",
            AttemptStatus::TimedOut => "timed_out",
        }
    }

    /// Terminal attempts are never mutated again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AttemptStatus::Completed | AttemptStatus::TimedOut)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct TestAttempt {
    pub id: String,
    pub test_id: String,
    pub student_id: String,
    pub status: AttemptStatus,
    pub answers: AnswerMap,
    pub score_achieved: i16,
    pub correct_answer_count: i16,
    pub total_questions: i16,
    pub time_taken_seconds: i64,
    pub start_time: DateTime<Utc>,
    /// Authoritative end of the allotted window: `start_time + duration`.
    pub deadline: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl TestAttempt {
    pub fn start(test: &Test, student_id: &str) -> Self {
        let now = Utc::now();
        TestAttempt {
            id: Uuid::new_v4().to_string(),
            test_id: test.id.clone(),
            student_id: student_id.to_string(),
            status: AttemptStatus::InProgress,
            answers: AnswerMap::new(),
            score_achieved: 0,
            correct_answer_count: 0,
            total_questions: test.questions.len() as i16,
            time_taken_seconds: 0,
            start_time: now,
            deadline: now + Duration::minutes(test.duration_minutes as i64),
            end_time: None,
            created_at: Some(now),
            modified_at: Some(now),
        }
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == AttemptStatus::InProgress && now > self.deadline
    }

    pub fn allotted_seconds(&self) -> i64 {
        (self.deadline - self.start_time).num_seconds()
    }

    /// Seconds left on the clock at `now`, never negative.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        (self.deadline - now).num_seconds().max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::test::fixtures::two_question_test;

    #[test]
    fn test_start_creates_in_progress_attempt() {
        let test = two_question_test();
        let attempt = TestAttempt::start(&test, "student-1");

        assert_eq!(attempt.status, AttemptStatus::InProgress);
        assert!(attempt.answers.is_empty());
        assert_eq!(attempt.total_questions, 2);
        assert_eq!(attempt.score_achieved, 0);
        assert_eq!(attempt.allotted_seconds(), 600);
        assert!(attempt.end_time.is_none());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!AttemptStatus::InProgress.is_terminal());
        assert!(AttemptStatus::Completed.is_terminal());
        assert!(AttemptStatus::TimedOut.is_terminal());
    }

    #[test]
    fn test_status_serialization_uses_snake_case() {
        let json = serde_json::to_string(&AttemptStatus::TimedOut).unwrap();
        assert_eq!(json, "\"timed_out\"");
        assert_eq!(AttemptStatus::TimedOut.as_str(), "timed_out");
    }

    #[test]
    fn test_answer_key_format() {
        assert_eq!(answer_key(0), "q0");
        assert_eq!(answer_key(17), "q17");
    }

    #[test]
    fn test_overdue_detection() {
        let test = two_question_test();
        let attempt = TestAttempt::start(&test, "student-1");

        let before_deadline = attempt.deadline - Duration::seconds(1);
        let after_deadline = attempt.deadline + Duration::seconds(1);

        assert!(!attempt.is_overdue(before_deadline));
        assert!(attempt.is_overdue(after_deadline));
        assert_eq!(attempt.remaining_seconds(after_deadline), 0);
    }

    #[test]
    fn test_answer_map_round_trip() {
        let mut answers = AnswerMap::new();
        answers.insert(answer_key(0), OptionKey::A);
        answers.insert(answer_key(1), OptionKey::C);

        let json = serde_json::to_string(&answers).unwrap();
        let parsed: AnswerMap = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.get("q0"), Some(&OptionKey::A));
        assert_eq!(parsed.get("q1"), Some(&OptionKey::C));
    }
}
