use async_graphql::Context;

use crate::{
    auth::Claims,
    errors::{AppError, AppResult},
    models::domain::user::UserRole,
};

pub fn require_superadmin(claims: &Claims) -> AppResult<()> {
    if claims.role != UserRole::Superadmin {
        return Err(AppError::Forbidden(
            "Only the superadmin can perform this action".to_string(),
        ));
    }
    Ok(())
}

pub fn require_admin(claims: &Claims) -> AppResult<()> {
    if !matches!(claims.role, UserRole::Admin | UserRole::Superadmin) {
        return Err(AppError::Forbidden(
            "Only admins can perform this action".to_string(),
        ));
    }
    Ok(())
}

/// Test authoring and result inspection: teachers and above.
pub fn require_test_manager(claims: &Claims) -> AppResult<()> {
    if !claims.role.can_manage_tests() {
        return Err(AppError::Forbidden(
            "Only teachers and admins can perform this action".to_string(),
        ));
    }
    Ok(())
}

pub fn require_owner_or_admin(claims: &Claims, resource_owner_id: &str) -> AppResult<()> {
    if !matches!(claims.role, UserRole::Admin | UserRole::Superadmin)
        && claims.sub != resource_owner_id
    {
        return Err(AppError::Forbidden(
            "You can only access your own resources".to_string(),
        ));
    }
    Ok(())
}

/// Every cross-entity operation stays inside the caller's organization; the
/// superadmin is unscoped.
pub fn require_same_organization(claims: &Claims, organization_id: &str) -> AppResult<()> {
    if claims.role != UserRole::Superadmin && claims.organization_id != organization_id {
        return Err(AppError::Forbidden(
            "Resource belongs to another organization".to_string(),
        ));
    }
    Ok(())
}

/// Students see their own attempts; teachers and admins see attempts for
/// their organization's tests.
pub fn can_view_attempt(claims: &Claims, attempt_student_id: &str) -> AppResult<()> {
    if claims.sub == attempt_student_id || claims.role.can_manage_tests() {
        return Ok(());
    }
    Err(AppError::Forbidden(
        "You can only view your own attempts".to_string(),
    ))
}

pub fn extract_claims_from_context(ctx: &Context<'_>) -> AppResult<Claims> {
    ctx.data::<Claims>()
        .cloned()
        .map_err(|_| AppError::Unauthorized("Authentication required".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_claims(user_id: &str, role: UserRole) -> Claims {
        Claims {
            sub: user_id.to_string(),
            username: user_id.to_string(),
            email: format!("{}@example.com", user_id),
            role,
            organization_id: "org-1".to_string(),
            iat: 0,
            exp: 9999999999,
        }
    }

    #[test]
    fn test_require_admin_success() {
        let claims = create_test_claims("admin", UserRole::Admin);
        assert!(require_admin(&claims).is_ok());

        let claims = create_test_claims("root", UserRole::Superadmin);
        assert!(require_admin(&claims).is_ok());
    }

    #[test]
    fn test_require_superadmin() {
        assert!(require_superadmin(&create_test_claims("root", UserRole::Superadmin)).is_ok());
        assert!(require_superadmin(&create_test_claims("admin", UserRole::Admin)).is_err());
    }

    #[test]
    fn test_require_admin_failure() {
        let claims = create_test_claims("teacher", UserRole::Teacher);
        assert!(require_admin(&claims).is_err());
    }

    #[test]
    fn test_require_test_manager() {
        assert!(require_test_manager(&create_test_claims("t", UserRole::Teacher)).is_ok());
        assert!(require_test_manager(&create_test_claims("a", UserRole::Admin)).is_ok());
        assert!(require_test_manager(&create_test_claims("s", UserRole::Student)).is_err());
    }

    #[test]
    fn test_require_owner_or_admin_as_owner() {
        let claims = create_test_claims("john", UserRole::Student);
        assert!(require_owner_or_admin(&claims, "john").is_ok());
    }

    #[test]
    fn test_require_owner_or_admin_as_admin() {
        let claims = create_test_claims("admin", UserRole::Admin);
        assert!(require_owner_or_admin(&claims, "other_user").is_ok());
    }

    #[test]
    fn test_require_owner_or_admin_failure() {
        let claims = create_test_claims("john", UserRole::Student);
        assert!(require_owner_or_admin(&claims, "jane").is_err());
    }

    #[test]
    fn test_require_same_organization() {
        let claims = create_test_claims("admin", UserRole::Admin);
        assert!(require_same_organization(&claims, "org-1").is_ok());
        assert!(require_same_organization(&claims, "org-2").is_err());

        let root = create_test_claims("root", UserRole::Superadmin);
        assert!(require_same_organization(&root, "org-2").is_ok());
    }

    #[test]
    fn test_can_view_attempt() {
        let student = create_test_claims("student-1", UserRole::Student);
        assert!(can_view_attempt(&student, "student-1").is_ok());
        assert!(can_view_attempt(&student, "student-2").is_err());

        let teacher = create_test_claims("teacher-1", UserRole::Teacher);
        assert!(can_view_attempt(&teacher, "student-2").is_ok());
    }
}
