//! Home, static pages and the 404 fallback

use axum::{
    extract::{Request, State},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use super::common::{page_context, render_page, WebError};
use super::middleware::{extract_session_token, AppState, CurrentRedactor, SessionToken};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/about-us/", get(about_us))
        .route("/contacts/", get(contacts))
}

/// GET / - counts and this session's visit counter
async fn index(
    State(state): State<AppState>,
    CurrentRedactor(user): CurrentRedactor,
    SessionToken(token): SessionToken,
) -> Result<Response, WebError> {
    let num_topics = state.topic_service.count().await?;
    let num_redactors = state.redactor_service.count().await?;
    let num_newspapers = state.newspaper_service.count().await?;
    let num_visits = state.redactor_service.record_visit(&token).await?;

    let mut context = page_context(&user);
    context.insert("num_topics", &num_topics);
    context.insert("num_redactors", &num_redactors);
    context.insert("num_newspapers", &num_newspapers);
    context.insert("num_visits", &num_visits);
    render_page(&state, "newspapers/index.html", &context)
}

async fn about_us(
    State(state): State<AppState>,
    CurrentRedactor(user): CurrentRedactor,
) -> Result<Response, WebError> {
    render_page(&state, "newspapers/about_us.html", &page_context(&user))
}

async fn contacts(
    State(state): State<AppState>,
    CurrentRedactor(user): CurrentRedactor,
) -> Result<Response, WebError> {
    render_page(&state, "newspapers/contacts.html", &page_context(&user))
}

/// Unknown routes. Anonymous visitors are sent to the login form like any
/// other page.
pub async fn not_found(State(state): State<AppState>, request: Request) -> Response {
    let token = extract_session_token(request.headers());
    let logged_in = match token {
        Some(token) => matches!(
            state.redactor_service.validate_session(&token).await,
            Ok(Some(_))
        ),
        None => false,
    };
    if !logged_in {
        let target = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        return super::common::redirect_found(&format!(
            "/accounts/login/?next={}",
            urlencoding::encode(target)
        ));
    }
    WebError::not_found("The page you requested was not found.").into_response()
}
