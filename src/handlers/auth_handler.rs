use actix_web::{post, web, HttpResponse};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    app_state::AppState,
    errors::{AppError, AppResult},
    models::domain::refresh_token::{hash_token, RefreshToken},
    models::domain::UserRole,
    models::dto::request::{LoginRequest, RegisterOrganizationRequest},
};

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub refresh_token: String,
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub organization_id: String,
}

#[post("/auth/register")]
pub async fn register_organization(
    state: web::Data<AppState>,
    request: web::Json<RegisterOrganizationRequest>,
) -> Result<HttpResponse, AppError> {
    let (organization, admin) = state
        .organization_service
        .register(request.into_inner())
        .await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "organization": organization,
        "admin": admin,
    })))
}

#[post("/auth/login")]
pub async fn login(
    state: web::Data<AppState>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    request.validate()?;

    let user = state
        .user_service
        .authenticate(&request.username, &request.password)
        .await?;

    let token = state.jwt_service.create_token(&user)?;
    let refresh_token_str = issue_refresh_token(&state, &user.id).await?;

    log::info!("User '{}' logged in", user.username);

    Ok(HttpResponse::Ok().json(AuthResponse {
        token,
        refresh_token: refresh_token_str,
        user_id: user.id,
        username: user.username,
        email: user.email,
        role: user.role,
        organization_id: user.organization_id,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshTokenResponse {
    pub token: String,
    pub refresh_token: String,
}

#[post("/auth/refresh")]
pub async fn refresh_token(
    state: web::Data<AppState>,
    request: web::Json<RefreshTokenRequest>,
) -> Result<HttpResponse, AppError> {
    let refresh_claims = state
        .jwt_service
        .validate_refresh_token(&request.refresh_token)?;

    // The JWT alone is not enough: the stored copy must still be live.
    let stored = state
        .refresh_tokens
        .find_by_token_hash(&hash_token(&request.refresh_token))
        .await?
        .ok_or_else(|| AppError::Unauthorized("Refresh token is not recognized".to_string()))?;

    if !stored.is_valid() {
        return Err(AppError::Unauthorized(
            "Refresh token has been revoked or expired".to_string(),
        ));
    }

    let user = state
        .user_service
        .get_user_by_id(&refresh_claims.sub)
        .await
        .map_err(|_| {
            AppError::Unauthorized("User associated with refresh token not found".to_string())
        })?;

    // Rotate: the presented token dies with this exchange.
    state
        .refresh_tokens
        .revoke_by_token_hash(&stored.token_hash)
        .await?;

    let new_token = state.jwt_service.create_token(&user)?;
    let new_refresh_token = issue_refresh_token(&state, &user.id).await?;

    log::info!("Token refreshed successfully for user '{}'", user.username);

    Ok(HttpResponse::Ok().json(RefreshTokenResponse {
        token: new_token,
        refresh_token: new_refresh_token,
    }))
}

#[post("/auth/logout")]
pub async fn logout(
    state: web::Data<AppState>,
    request: web::Json<RefreshTokenRequest>,
) -> Result<HttpResponse, AppError> {
    // Best effort: an unknown token is already as logged-out as it gets.
    match state
        .refresh_tokens
        .revoke_by_token_hash(&hash_token(&request.refresh_token))
        .await
    {
        Ok(()) | Err(AppError::NotFound(_)) => {}
        Err(err) => return Err(err),
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Logged out" })))
}

async fn issue_refresh_token(state: &AppState, user_id: &str) -> AppResult<String> {
    let refresh_token_str = state.jwt_service.create_refresh_token(user_id)?;

    let expires_at =
        Utc::now() + Duration::hours(state.jwt_service.refresh_expiration_hours());
    let record = RefreshToken::new(
        user_id.to_string(),
        hash_token(&refresh_token_str),
        expires_at,
    );
    state.refresh_tokens.create(record).await?;

    Ok(refresh_token_str)
}
