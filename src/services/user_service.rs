use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::{
    auth::password,
    errors::{AppError, AppResult},
    models::domain::{User, UserRole},
    models::dto::request::{CreateUserRequest, UpdateUserRequest},
    models::dto::response::{
        ApiResponse, CreateUserResponse, DeleteUserResponse, PaginatedResponseUserDto,
        PaginationMetadata, UpdateUserResponse, UserDto,
    },
    repositories::UserRepository,
};

pub struct UserService {
    repository: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self { repository }
    }

    pub async fn create_user(
        &self,
        request: CreateUserRequest,
        organization_id: &str,
    ) -> AppResult<CreateUserResponse> {
        request.validate()?;

        if self
            .repository
            .find_by_username(&request.username)
            .await?
            .is_some()
        {
            return Err(AppError::AlreadyExists(format!(
                "Username '{}' is already taken",
                request.username
            )));
        }

        let password_hash = password::hash_password(&request.password)?;
        let user = User::new(
            organization_id,
            &request.username,
            &request.email,
            &request.first_name,
            &request.last_name,
            request.role,
            password_hash,
        );

        let created = self.repository.create(user).await?;

        Ok(ApiResponse {
            data: UserDto::from(created),
            message: "User created successfully".to_string(),
        })
    }

    /// Username/password login. The same error is returned for an unknown
    /// username and a wrong password, so login probing learns nothing.
    pub async fn authenticate(&self, username: &str, plain_password: &str) -> AppResult<User> {
        let user = self
            .repository
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid username or password".to_string()))?;

        if !password::verify_password(plain_password, &user.password_hash)? {
            return Err(AppError::Unauthorized(
                "Invalid username or password".to_string(),
            ));
        }

        Ok(user)
    }

    pub async fn get_user(&self, id: &str) -> AppResult<UserDto> {
        let user = self.require_user(id).await?;
        Ok(UserDto::from(user))
    }

    pub async fn get_user_by_id(&self, id: &str) -> AppResult<User> {
        self.require_user(id).await
    }

    pub async fn get_all_users_paginated(
        &self,
        organization_id: &str,
        offset: i64,
        limit: i64,
    ) -> AppResult<PaginatedResponseUserDto> {
        let (users, total) = self
            .repository
            .list_by_organization(organization_id, offset, limit)
            .await?;

        Ok(PaginatedResponseUserDto {
            data: users.into_iter().map(UserDto::from).collect(),
            pagination: PaginationMetadata {
                offset,
                limit,
                total,
            },
        })
    }

    pub async fn update_user(
        &self,
        id: &str,
        request: UpdateUserRequest,
    ) -> AppResult<UpdateUserResponse> {
        request.validate()?;

        let mut user = self.require_user(id).await?;

        if let Some(first_name) = request.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = request.last_name {
            user.last_name = last_name;
        }
        if let Some(email) = request.email {
            user.email = email;
        }
        user.modified_at = Some(Utc::now());

        let updated = self.repository.update(user).await?;

        Ok(ApiResponse {
            data: UserDto::from(updated),
            message: "User updated successfully".to_string(),
        })
    }

    pub async fn delete_user(&self, id: &str) -> AppResult<DeleteUserResponse> {
        let user = self.require_user(id).await?;

        if user.role == UserRole::Superadmin {
            return Err(AppError::Forbidden(
                "The superadmin account cannot be deleted".to_string(),
            ));
        }

        self.repository.delete(id).await?;

        Ok(DeleteUserResponse {
            message: format!("User '{}' deleted", user.username),
        })
    }

    async fn require_user(&self, id: &str) -> AppResult<User> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id '{}' not found", id)))
    }
}
