//! Login and logout

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use std::collections::HashMap;
use tera::Context as TeraContext;

use crate::forms::{FormData, LoginForm};
use crate::services::RedactorServiceError;

use super::common::{redirect_found, render_page, WebError};
use super::middleware::{extract_session_token, AppState};

pub const LOGIN_URL: &str = "/accounts/login/";

const CLEAR_COOKIE: &str = "session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/accounts/login/", get(login_page).post(login))
        .route("/accounts/logout/", post(logout))
}

/// Only same-site absolute paths are followed after login.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/",
    }
}

fn render_login(state: &AppState, form: &LoginForm, next: &str) -> Result<Response, WebError> {
    let mut context = TeraContext::new();
    context.insert("form", form);
    context.insert("next", next);
    render_page(state, "registration/login.html", &context)
}

/// GET /accounts/login/
async fn login_page(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, WebError> {
    let next = query.get("next").map(String::as_str).unwrap_or_default();
    render_login(&state, &LoginForm::default(), next)
}

/// POST /accounts/login/
async fn login(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    let data = FormData::new(pairs);
    let next = data.value("next");
    let mut form = LoginForm::from_data(&data);

    let Some((username, password)) = form.clean() else {
        return render_login(&state, &form, &next);
    };

    let session = match state.redactor_service.login(&username, &password).await {
        Ok((_, session)) => session,
        Err(RedactorServiceError::AuthenticationError) => {
            form.reject_credentials();
            return render_login(&state, &form, &next);
        }
        Err(e) => return Err(e.into()),
    };

    let session_config = &state.config.session;
    let mut cookie = format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        session.id,
        session_config.expiration_days * 24 * 60 * 60
    );
    if session_config.secure_cookie {
        cookie.push_str("; Secure");
    }

    let mut response = redirect_found(safe_next(Some(next.as_str())));
    response.headers_mut().insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).map_err(|e| WebError::Internal(e.into()))?,
    );
    Ok(response)
}

/// POST /accounts/logout/
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, WebError> {
    if let Some(token) = extract_session_token(&headers) {
        state.redactor_service.logout(&token).await?;
    }

    let mut response = redirect_found(LOGIN_URL);
    response
        .headers_mut()
        .insert(header::SET_COOKIE, HeaderValue::from_static(CLEAR_COOKIE));
    Ok(response.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/topics/?page=2")), "/topics/?page=2");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(Some("/\\evil")), "/");
        assert_eq!(safe_next(Some("")), "/");
        assert_eq!(safe_next(None), "/");
    }
}
