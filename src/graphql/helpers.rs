use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::domain::test::TestStatus;

/// Helper to validate a UUID id coming in through a GraphQL ID string.
pub fn parse_id(id: &str) -> AppResult<String> {
    Uuid::parse_str(id)
        .map(|_| id.to_string())
        .map_err(|_| AppError::ValidationError("Invalid UUID format".to_string()))
}

/// Check if a test can currently be taken by students
pub fn is_test_available_for_taking(status: &TestStatus) -> bool {
    matches!(status, TestStatus::Published)
}

/// Validate a test is available for taking, return error if not
pub fn validate_test_available_for_taking(status: &TestStatus) -> AppResult<()> {
    if !is_test_available_for_taking(status) {
        return Err(AppError::BadRequest(
            "Test is not available for taking".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_accepts_uuids() {
        let id = Uuid::new_v4().to_string();
        assert_eq!(parse_id(&id).unwrap(), id);
    }

    #[test]
    fn test_parse_id_rejects_garbage() {
        assert!(parse_id("not-a-uuid").is_err());
    }

    #[test]
    fn test_draft_tests_are_not_takeable() {
        assert!(validate_test_available_for_taking(&TestStatus::Draft).is_err());
        assert!(validate_test_available_for_taking(&TestStatus::Published).is_ok());
    }
}
