//! HTTP handlers. Each one decodes the request, calls a service, and renders
//! the result; failures convert into [`ApiError`].

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    http::StatusCode,
    response::Redirect,
    Json,
};
use serde::Serialize;
use tracing::info;
use validator::Validate;

use crate::auth::access::require_role;
use crate::auth::account::{
    AccountView, DeleteAccountRequest, LoginRequest, LoginResponse, LogoutRequest,
    RegisterRequest, RegisterResponse, RestoreLinkRequest, RestorePasswordRequest,
    UpdateAccountRequest,
};
use crate::auth::jwt::{Claims, Role};
use crate::errors::Error;

use super::error::ApiError;
use super::routes::ApiState;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self { message: message.into() })
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok", version: crate::VERSION })
}

pub async fn register_handler(
    State(state): State<ApiState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let Json(request) = payload?;
    let token = state.session.register(request).await?;
    Ok((StatusCode::CREATED, Json(RegisterResponse { token })))
}

pub async fn activate_handler(
    State(state): State<ApiState>,
    Path(link): Path<String>,
) -> Result<Redirect, ApiError> {
    let account = state.activation.activate(&link).await?;
    info!(account_id = %account.id, "Activation link followed");
    Ok(Redirect::to(&state.client_url))
}

pub async fn login_handler(
    State(state): State<ApiState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload?;
    let (token, account) = state.session.login(request).await?;
    Ok(Json(LoginResponse { token, account }))
}

pub async fn logout_handler(
    State(state): State<ApiState>,
    payload: Result<Json<LogoutRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) = payload?;
    request.validate().map_err(Error::from)?;
    state.session.logout(&request.token).await?;
    Ok(MessageResponse::new("Logged out"))
}

pub async fn me_handler(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<AccountView>, ApiError> {
    let account_id = claims.account_id().map_err(Error::from)?;
    Ok(Json(state.session.account(account_id).await?))
}

pub async fn update_me_handler(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<UpdateAccountRequest>, JsonRejection>,
) -> Result<Json<AccountView>, ApiError> {
    let Json(request) = payload?;
    let account_id = claims.account_id().map_err(Error::from)?;
    Ok(Json(state.session.update_account(account_id, request).await?))
}

/// Callers may delete themselves; deleting anyone else needs the admin role.
pub async fn delete_account_handler(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<DeleteAccountRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) = payload?;
    request.validate().map_err(Error::from)?;

    let caller = state.session.account(claims.account_id().map_err(Error::from)?).await?;
    if caller.email != request.email {
        require_role(&claims, Role::Admin)?;
    }

    state.session.delete_account(&request.email).await?;
    Ok(MessageResponse::new("Account deleted"))
}

pub async fn restore_request_handler(
    State(state): State<ApiState>,
    payload: Result<Json<RestoreLinkRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let Json(request) = payload?;
    request.validate().map_err(Error::from)?;
    state.session.request_password_restore(&request.email).await?;
    Ok((
        StatusCode::ACCEPTED,
        MessageResponse::new("If the account exists, a restore mail has been sent"),
    ))
}

pub async fn restore_password_handler(
    State(state): State<ApiState>,
    payload: Result<Json<RestorePasswordRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) = payload?;
    state.session.restore_password(request).await?;
    Ok(MessageResponse::new("Password updated"))
}

pub async fn list_accounts_handler(
    State(state): State<ApiState>,
) -> Result<Json<Vec<AccountView>>, ApiError> {
    Ok(Json(state.session.list_accounts().await?))
}
