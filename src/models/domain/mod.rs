pub mod organization;
pub mod refresh_token;
pub mod test;
pub mod test_attempt;
pub mod user;

pub use organization::Organization;
pub use refresh_token::RefreshToken;
pub use test::{OptionKey, Question, QuestionOptions, Test, TestStatus};
pub use test_attempt::{AnswerMap, AttemptStatus, TestAttempt};
pub use user::{User, UserRole};
