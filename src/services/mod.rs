pub mod attempt_service;
pub mod attempt_sweeper;
pub mod countdown;
pub mod organization_service;
pub mod report_service;
pub mod scoring;
pub mod test_service;
pub mod user_service;
