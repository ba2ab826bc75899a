use std::sync::Arc;

use validator::Validate;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{Organization, UserRole},
    models::dto::request::RegisterOrganizationRequest,
    models::dto::response::UserDto,
    repositories::OrganizationRepository,
    services::user_service::UserService,
};

pub struct OrganizationService {
    repository: Arc<dyn OrganizationRepository>,
    user_service: Arc<UserService>,
}

impl OrganizationService {
    pub fn new(repository: Arc<dyn OrganizationRepository>, user_service: Arc<UserService>) -> Self {
        Self {
            repository,
            user_service,
        }
    }

    pub async fn get_organization(&self, id: &str) -> AppResult<Organization> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Organization with id '{}' not found", id)))
    }

    /// Signs up a new organization together with its first admin account.
    pub async fn register(
        &self,
        request: RegisterOrganizationRequest,
    ) -> AppResult<(Organization, UserDto)> {
        request.validate()?;

        if request.admin.role != UserRole::Admin {
            return Err(AppError::ValidationError(
                "The initial organization account must have the admin role".to_string(),
            ));
        }

        if self
            .repository
            .find_by_name(&request.organization_name)
            .await?
            .is_some()
        {
            return Err(AppError::AlreadyExists(format!(
                "Organization '{}' already exists",
                request.organization_name
            )));
        }

        let organization = Organization::new(&request.organization_name);
        let organization = self.repository.create(organization).await?;

        let admin = self
            .user_service
            .create_user(request.admin, &organization.id)
            .await?;

        log::info!(
            "Registered organization '{}' with admin '{}'",
            organization.name,
            admin.data.username
        );

        Ok((organization, admin.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dto::request::CreateUserRequest;
    use crate::repositories::{MockOrganizationRepository, MockUserRepository};

    fn register_request(role: UserRole) -> RegisterOrganizationRequest {
        RegisterOrganizationRequest {
            organization_name: "Acme School".to_string(),
            admin: CreateUserRequest {
                first_name: "Ada".to_string(),
                last_name: "Admin".to_string(),
                username: "ada_admin".to_string(),
                email: "ada@example.com".to_string(),
                password: "a-long-password".to_string(),
                role,
            },
        }
    }

    fn service(
        orgs: MockOrganizationRepository,
        users: MockUserRepository,
    ) -> OrganizationService {
        OrganizationService::new(
            Arc::new(orgs),
            Arc::new(UserService::new(Arc::new(users))),
        )
    }

    #[actix_rt::test]
    async fn register_creates_organization_and_admin() {
        let mut orgs = MockOrganizationRepository::new();
        orgs.expect_find_by_name().returning(|_| Ok(None));
        orgs.expect_create().returning(|org| Ok(org));

        let mut users = MockUserRepository::new();
        users.expect_find_by_username().returning(|_| Ok(None));
        users.expect_create().returning(|user| Ok(user));

        let service = service(orgs, users);
        let (org, admin) = service.register(register_request(UserRole::Admin)).await.unwrap();

        assert_eq!(org.name, "Acme School");
        assert_eq!(admin.username, "ada_admin");
        assert_eq!(admin.organization_id, org.id);
    }

    #[actix_rt::test]
    async fn register_rejects_non_admin_initial_account() {
        let service = service(MockOrganizationRepository::new(), MockUserRepository::new());

        let result = service.register(register_request(UserRole::Student)).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[actix_rt::test]
    async fn register_rejects_duplicate_organization_name() {
        let mut orgs = MockOrganizationRepository::new();
        orgs.expect_find_by_name()
            .returning(|_| Ok(Some(Organization::new("Acme School"))));

        let service = service(orgs, MockUserRepository::new());

        let result = service.register(register_request(UserRole::Admin)).await;
        assert!(matches!(result, Err(AppError::AlreadyExists(_))));
    }
}
