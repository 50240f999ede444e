//! Request middleware
//!
//! - Login guard for the HTML pages (redirects to the login form)
//! - Session and staff guards for the admin JSON API
//! - Error page rendering

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::db::DynDatabasePool;
use crate::models::Redactor;
use crate::render::Renderer;
use crate::services::{NewspaperService, RedactorService, TopicService};

use super::common::{redirect_found, ErrorPage, WebError};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub config: Arc<Config>,
    pub renderer: Arc<Renderer>,
    pub topic_service: Arc<TopicService>,
    pub newspaper_service: Arc<NewspaperService>,
    pub redactor_service: Arc<RedactorService>,
}

/// Redactor owning the request's session
#[derive(Debug, Clone)]
pub struct CurrentRedactor(pub Redactor);

/// Token of the request's session
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

impl<S: Send + Sync> FromRequestParts<S> for CurrentRedactor {
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentRedactor>()
            .cloned()
            .ok_or_else(|| WebError::Internal(anyhow::anyhow!("Login guard not installed")))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for SessionToken {
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionToken>()
            .cloned()
            .ok_or_else(|| WebError::Internal(anyhow::anyhow!("Login guard not installed")))
    }
}

/// Error response for the admin API
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

/// Session token from `Authorization: Bearer` or the `session` cookie
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
    {
        return Some(token.to_string());
    }

    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies
        .split(';')
        .filter_map(|cookie| cookie.trim().strip_prefix("session="))
        .find(|token| !token.is_empty())
        .map(str::to_string)
}

async fn authenticate(
    state: &AppState,
    request: &mut Request,
) -> Result<bool, crate::services::RedactorServiceError> {
    let Some(token) = extract_session_token(request.headers()) else {
        return Ok(false);
    };
    let Some(redactor) = state.redactor_service.validate_session(&token).await? else {
        return Ok(false);
    };
    request.extensions_mut().insert(CurrentRedactor(redactor));
    request.extensions_mut().insert(SessionToken(token));
    Ok(true)
}

/// Login guard for HTML pages.
///
/// Anonymous requests are sent to the login form with the original path
/// and query in `next`.
pub async fn require_login(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(&state, &mut request).await {
        Ok(true) => next.run(request).await,
        Ok(false) => {
            let target = request
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/");
            redirect_found(&format!(
                "/accounts/login/?next={}",
                urlencoding::encode(target)
            ))
        }
        Err(e) => WebError::from(e).into_response(),
    }
}

/// Session guard for the admin API
pub async fn require_api_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match authenticate(&state, &mut request).await {
        Ok(true) => Ok(next.run(request).await),
        Ok(false) => Err(ApiError::unauthorized("Authentication required")),
        Err(e) => Err(ApiError::internal_error(format!(
            "Session validation failed: {}",
            e
        ))),
    }
}

/// Staff authorization for the admin API; runs after `require_api_auth`
pub async fn require_staff(request: Request, next: Next) -> Result<Response, ApiError> {
    let redactor = request
        .extensions()
        .get::<CurrentRedactor>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !redactor.0.is_staff {
        return Err(ApiError::forbidden("Staff privileges required"));
    }

    Ok(next.run(request).await)
}

/// Replace error responses carrying an [`ErrorPage`] with the rendered page.
pub async fn render_error_pages(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    let Some(page) = response.extensions().get::<ErrorPage>().cloned() else {
        return response;
    };
    page.render(&state.renderer).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_token_from_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(header::COOKIE, HeaderValue::from_static("session=cookie"));
        assert_eq!(extract_session_token(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn test_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=xyz; other=1"),
        );
        assert_eq!(extract_session_token(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn test_cleared_cookie_is_no_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session="));
        assert_eq!(extract_session_token(&headers), None);
        assert_eq!(extract_session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_api_error_status() {
        let response = ApiError::forbidden("no").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let response = ApiError::unauthorized("no").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
