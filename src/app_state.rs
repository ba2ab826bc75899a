use std::sync::Arc;

use crate::{
    auth::JwtService,
    config::Config,
    db::Database,
    errors::AppResult,
    repositories::{
        MongoOrganizationRepository, MongoRefreshTokenRepository, MongoTestAttemptRepository,
        MongoTestRepository, MongoUserRepository, RefreshTokenRepository, TestAttemptRepository,
    },
    services::{
        attempt_service::AttemptService, organization_service::OrganizationService,
        test_service::TestService, user_service::UserService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Database,
    pub jwt_service: JwtService,
    pub user_service: Arc<UserService>,
    pub organization_service: Arc<OrganizationService>,
    pub test_service: Arc<TestService>,
    pub attempt_service: Arc<AttemptService>,
    pub attempt_repository: Arc<dyn TestAttemptRepository>,
    pub refresh_tokens: Arc<dyn RefreshTokenRepository>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Database::connect(&config).await?;

        let organization_repository = Arc::new(MongoOrganizationRepository::new(&db));
        organization_repository.ensure_indexes().await?;

        let user_repository = Arc::new(MongoUserRepository::new(&db));
        user_repository.ensure_indexes().await?;

        let test_repository = Arc::new(MongoTestRepository::new(&db));
        test_repository.ensure_indexes().await?;

        let attempt_repository = Arc::new(MongoTestAttemptRepository::new(&db));
        attempt_repository.ensure_indexes().await?;

        let refresh_token_repository = Arc::new(MongoRefreshTokenRepository::new(&db));
        refresh_token_repository.ensure_indexes().await?;

        let jwt_service = JwtService::new(
            &config.jwt_secret,
            config.jwt_expiration_hours,
            config.refresh_expiration_hours,
        );

        let user_service = Arc::new(UserService::new(user_repository.clone()));
        let organization_service = Arc::new(OrganizationService::new(
            organization_repository,
            Arc::clone(&user_service),
        ));
        let test_service = Arc::new(TestService::new(test_repository.clone()));
        let attempt_service = Arc::new(AttemptService::new(
            attempt_repository.clone(),
            test_repository,
            user_repository,
        ));

        Ok(Self {
            config: Arc::new(config),
            db,
            jwt_service,
            user_service,
            organization_service,
            test_service,
            attempt_service,
            attempt_repository,
            refresh_tokens: refresh_token_repository,
        })
    }
}
