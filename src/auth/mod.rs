pub mod claims;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod utils;

pub use claims::Claims;
pub use jwt::JwtService;
pub use middleware::{AuthMiddleware, AuthenticatedUser};
pub use utils::{
    can_view_attempt, extract_claims_from_context, require_admin, require_owner_or_admin,
    require_same_organization, require_superadmin, require_test_manager,
};
