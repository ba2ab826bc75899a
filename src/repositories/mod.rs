pub mod organization_repository;
pub mod refresh_token_repository;
pub mod test_attempt_repository;
pub mod test_repository;
pub mod user_repository;

pub use organization_repository::{MongoOrganizationRepository, OrganizationRepository};
pub use refresh_token_repository::{MongoRefreshTokenRepository, RefreshTokenRepository};
pub use test_attempt_repository::{
    AttemptFinalization, MongoTestAttemptRepository, TestAttemptRepository,
};
pub use test_repository::{MongoTestRepository, TestRepository};
pub use user_repository::{MongoUserRepository, UserRepository};

#[cfg(test)]
pub use organization_repository::MockOrganizationRepository;
#[cfg(test)]
pub use refresh_token_repository::MockRefreshTokenRepository;
#[cfg(test)]
pub use test_attempt_repository::MockTestAttemptRepository;
#[cfg(test)]
pub use test_repository::MockTestRepository;
#[cfg(test)]
pub use user_repository::MockUserRepository;

/// MongoDB reports unique-index violations as write error 11000; repositories
/// translate those into `AppError::AlreadyExists` so callers can react.
pub(crate) fn is_duplicate_key_error(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};
    matches!(
        &*err.kind,
        ErrorKind::Write(WriteFailure::WriteError(write_err)) if write_err.code == 11000
    )
}
