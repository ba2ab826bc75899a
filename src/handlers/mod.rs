pub mod auth_handler;
pub mod graphql_handler;
pub mod health_handler;
pub mod report_handler;

pub use auth_handler::{login, logout, refresh_token, register_organization};
pub use graphql_handler::{graphiql, graphql};
pub use health_handler::{health_check, health_check_live, health_check_ready};
pub use report_handler::{attempt_report, test_summary};
