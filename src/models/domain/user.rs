use async_graphql::Enum;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, Enum)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Superadmin,
    Admin,
    Teacher,
    Student,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Superadmin => "superadmin",
            UserRole::Admin => "admin",
            UserRole::Teacher => "teacher",
            UserRole::Student => "student",
        }
    }

    /// Teachers and admins can author tests and inspect results.
    pub fn can_manage_tests(&self) -> bool {
        matches!(self, UserRole::Superadmin | UserRole::Admin | UserRole::Teacher)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    pub id: String,
    pub organization_id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub password_hash: String,
    /// Lifetime count of tests this user has completed as a student.
    pub attempted_tests: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(
        organization_id: &str,
        username: &str,
        email: &str,
        first_name: &str,
        last_name: &str,
        role: UserRole,
        password_hash: String,
    ) -> Self {
        User {
            id: Uuid::new_v4().to_string(),
            organization_id: organization_id.to_string(),
            username: username.to_string(),
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            role,
            password_hash,
            attempted_tests: 0,
            created_at: Some(Utc::now()),
            modified_at: Some(Utc::now()),
        }
    }
}

#[cfg(test)]
impl User {
    pub fn test_user(username: &str, role: UserRole) -> Self {
        User::new(
            "org-1",
            username,
            &format!("{}@example.com", username),
            "Test",
            "User",
            role,
            "hash".to_string(),
        )
    }
}
