//! Request extractors for sessions, roles and the automation API key.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum::http::header::{AUTHORIZATION, COOKIE, USER_AGENT};

use super::error::AppError;
use super::state::AppState;
use crate::api::User;
use crate::auth;
use crate::db::services;

pub const API_KEY_HEADER: &str = "x-api-key";

fn header<'a>(parts: &'a Parts, name: impl axum::http::header::AsHeaderName) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}

fn session_token(parts: &Parts) -> Option<&str> {
    header(parts, COOKIE)
        .and_then(auth::token_from_cookie_header)
        .or_else(|| header(parts, AUTHORIZATION).and_then(auth::token_from_authorization))
}

/// The signed-in user, if any. Never rejects.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(secret) = state.config.jwt_secret.as_deref() else {
            return Ok(MaybeUser(None));
        };
        let Some(open_id) = session_token(parts).and_then(|t| auth::verify_session_token(secret, t))
        else {
            return Ok(MaybeUser(None));
        };
        let user = services::find_user(state.repository.as_ref(), &open_id).await?;
        Ok(MaybeUser(user))
    }
}

/// A signed-in user; 401 otherwise.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match MaybeUser::from_request_parts(parts, state).await? {
            MaybeUser(Some(user)) => Ok(AuthUser(user)),
            MaybeUser(None) => Err(AppError::Unauthorized),
        }
    }
}

/// A signed-in admin; 401 when anonymous, 403 for other roles.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}

/// Caller presented the scheduled-task API key in `X-API-Key`.
#[derive(Debug, Clone, Copy)]
pub struct ApiKey;

impl FromRequestParts<AppState> for ApiKey {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let expected = state
            .config
            .scheduled_task_api_key
            .as_deref()
            .ok_or(AppError::Unauthorized)?;
        match header(parts, API_KEY_HEADER) {
            Some(provided) if auth::constant_time_eq(provided.trim(), expected) => Ok(ApiKey),
            _ => {
                tracing::warn!("Rejected automation request with missing or invalid API key");
                Err(AppError::Unauthorized)
            }
        }
    }
}

/// Client address and user agent as reported by the proxy headers.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl<S: Send + Sync> FromRequestParts<S> for ClientInfo {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = header(parts, "x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .or_else(|| header(parts, "x-real-ip"))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        Ok(ClientInfo {
            ip,
            user_agent: header(parts, USER_AGENT).map(str::to_string),
        })
    }
}
