//! Account and profile handlers.
//!
//! ```text
//! POST /api/v1/auth/register
//! POST /api/v1/auth/login
//! POST /api/v1/auth/logout
//! GET  /api/v1/users/me
//! PUT  /api/v1/users/me/profile
//! PUT  /api/v1/users/me/settings
//! GET  /api/v1/users/me/counters/audit
//! ```

use actix_web::{get, post, put, web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::accounts::{CounterAudit, PasswordChange, ProfileUpdate, Registration};
use crate::domain::user::{User, UserCounters, UserId};
use crate::domain::Error;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::ApiResult;

/// User document as returned to clients. Same shape as the stored document
/// minus the password hash.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub bio: String,
    pub profile_pic: String,
    #[serde(flatten)]
    pub counters: UserCounters,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            bio: user.bio,
            profile_pic: user.profile_pic,
            counters: user.counters,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Registration request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

/// Login request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Profile update request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    pub username: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub profile_pic: Option<String>,
}

/// Password change request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Register a new account and establish a session.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Invalid registration", body = Error),
        (status = 409, description = "Username or email taken", body = Error)
    ),
    tags = ["auth"],
    operation_id = "register",
    security([])
)]
#[post("/auth/register")]
pub async fn register(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    let user = state
        .accounts
        .register(Registration {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            password_confirmation: payload.password_confirmation,
        })
        .await?;
    session.persist_user(&user.id)?;
    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

/// Authenticate by email and password and establish a session.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success", body = UserResponse,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 401, description = "Invalid credentials", body = Error)
    ),
    tags = ["auth"],
    operation_id = "login",
    security([])
)]
#[post("/auth/login")]
pub async fn login(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let user = state
        .accounts
        .login(&payload.email, &payload.password)
        .await?;
    session.persist_user(&user.id)?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// Destroy the session.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses((status = 204, description = "Session cleared")),
    tags = ["auth"],
    operation_id = "logout"
)]
#[post("/auth/logout")]
pub async fn logout(session: SessionContext) -> ApiResult<HttpResponse> {
    session.clear();
    Ok(HttpResponse::NoContent().finish())
}

/// The authenticated user's profile with stored counters.
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not logged in", body = Error)
    ),
    tags = ["users"],
    operation_id = "currentUser"
)]
#[get("/users/me")]
pub async fn me(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<UserResponse>> {
    let user_id = session.require_user_id()?;
    let user = state.accounts.current_user(&user_id).await?;
    Ok(web::Json(UserResponse::from(user)))
}

/// Update username, bio, and optionally the profile picture URL.
#[utoipa::path(
    put,
    path = "/api/v1/users/me/profile",
    request_body = ProfileRequest,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 401, description = "Not logged in", body = Error),
        (status = 409, description = "Username taken", body = Error)
    ),
    tags = ["users"],
    operation_id = "updateProfile"
)]
#[put("/users/me/profile")]
pub async fn update_profile(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<ProfileRequest>,
) -> ApiResult<web::Json<UserResponse>> {
    let user_id = session.require_user_id()?;
    let payload = payload.into_inner();
    let user = state
        .accounts
        .update_profile(
            &user_id,
            ProfileUpdate {
                username: payload.username,
                bio: payload.bio,
                profile_pic: payload.profile_pic,
            },
        )
        .await?;
    Ok(web::Json(UserResponse::from(user)))
}

/// Change the password after verifying the current one.
#[utoipa::path(
    put,
    path = "/api/v1/users/me/settings",
    request_body = SettingsRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Invalid change", body = Error),
        (status = 401, description = "Not logged in", body = Error)
    ),
    tags = ["users"],
    operation_id = "updateSettings"
)]
#[put("/users/me/settings")]
pub async fn update_settings(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<SettingsRequest>,
) -> ApiResult<HttpResponse> {
    let user_id = session.require_user_id()?;
    let payload = payload.into_inner();
    state
        .accounts
        .change_password(
            &user_id,
            PasswordChange {
                current_password: payload.current_password,
                new_password: payload.new_password,
                confirm_password: payload.confirm_password,
            },
        )
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Recompute the caller's counters from source records.
#[utoipa::path(
    get,
    path = "/api/v1/users/me/counters/audit",
    responses(
        (status = 200, description = "Stored and recomputed counters", body = CounterAudit),
        (status = 401, description = "Not logged in", body = Error)
    ),
    tags = ["users"],
    operation_id = "auditCounters"
)]
#[get("/users/me/counters/audit")]
pub async fn audit_counters(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<CounterAudit>> {
    let user_id = session.require_user_id()?;
    let audit = state.accounts.audit_counters(&user_id).await?;
    Ok(web::Json(audit))
}
