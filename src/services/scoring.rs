use crate::models::domain::test::Question;
use crate::models::domain::test_attempt::{answer_key, AnswerMap};

/// Outcome of grading one answer map against a question list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScoreSummary {
    pub achieved: i16,
    pub correct_count: i16,
    pub total: i16,
}

/// Grades an answer map. Deterministic and total: unanswered and wrongly
/// answered questions both contribute zero, and `total` is always the sum of
/// the question marks regardless of the answers.
pub fn score(questions: &[Question], answers: &AnswerMap) -> ScoreSummary {
    let mut achieved: i16 = 0;
    let mut correct_count: i16 = 0;
    let mut total: i16 = 0;

    for (index, question) in questions.iter().enumerate() {
        total += question.marks;

        if answers.get(&answer_key(index)) == Some(&question.correct_option) {
            achieved += question.marks;
            correct_count += 1;
        }
    }

    ScoreSummary {
        achieved,
        correct_count,
        total,
    }
}
