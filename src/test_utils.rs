use crate::models::domain::test::fixtures::question;
use crate::models::domain::test::{OptionKey, Test, TestStatus};
use crate::models::domain::{User, UserRole};


#[cfg(test)]
mod tests {
    use super::fixtures::*;

    #[test]
    fn test_fixture_test_is_takeable() {
        let test = published_test();
        assert_eq!(test.total_marks, 5);
        assert_eq!(test.questions.len(), 2);
    }

    #[test]
    fn test_fixture_users_have_roles() {
        assert_eq!(student("s").role, crate::models::domain::UserRole::Student);
        assert_eq!(teacher("t").role, crate::models::domain::UserRole::Teacher);
    }
}
