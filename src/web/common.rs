//! Shared helpers for the HTML handlers

use axum::{
    extract::{FromRequestParts, Path},
    http::{header, request::Parts, StatusCode},
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;
use std::collections::HashMap;
use tera::Context as TeraContext;

use crate::forms::SearchForm;
use crate::models::{InvalidPage, PageRequest, PagedResult, Redactor};
use crate::render::{fallback_error_page, RenderError, Renderer};
use crate::services::{NewspaperServiceError, RedactorServiceError, TopicServiceError};

use super::middleware::AppState;

/// `302 Found` to `location`
pub fn redirect_found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Error page to render once the response leaves the handler
#[derive(Debug, Clone)]
pub struct ErrorPage {
    pub status: StatusCode,
    pub message: String,
}

impl ErrorPage {
    pub fn render(&self, renderer: &Renderer) -> Response {
        let template = if self.status == StatusCode::NOT_FOUND {
            "404.html"
        } else {
            "error.html"
        };
        let mut context = TeraContext::new();
        context.insert("status", &self.status.as_u16());
        context.insert("message", &self.message);

        let body = renderer.render(template, &context).unwrap_or_else(|e| {
            tracing::error!("Failed to render error page: {}", e);
            fallback_error_page(self.status.as_u16(), &self.message)
        });
        (self.status, Html(body)).into_response()
    }
}

/// Error returned by HTML handlers
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error("{0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl WebError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let page = match self {
            WebError::NotFound(message) => ErrorPage {
                status: StatusCode::NOT_FOUND,
                message,
            },
            WebError::Internal(e) => {
                tracing::error!("Request failed: {:#}", e);
                ErrorPage {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "Something went wrong on our side.".to_string(),
                }
            }
        };

        let mut response = (
            page.status,
            Html(fallback_error_page(page.status.as_u16(), &page.message)),
        )
            .into_response();
        response.extensions_mut().insert(page);
        response
    }
}

impl From<InvalidPage> for WebError {
    fn from(e: InvalidPage) -> Self {
        WebError::NotFound(format!("Invalid page ({})", e))
    }
}

impl From<RenderError> for WebError {
    fn from(e: RenderError) -> Self {
        WebError::Internal(e.into())
    }
}

impl From<TopicServiceError> for WebError {
    fn from(e: TopicServiceError) -> Self {
        match e {
            TopicServiceError::NotFound(_) => WebError::not_found("No topic found matching the query"),
            TopicServiceError::InvalidPage(e) => e.into(),
            TopicServiceError::InternalError(e) => WebError::Internal(e),
            other => WebError::Internal(other.into()),
        }
    }
}

impl From<NewspaperServiceError> for WebError {
    fn from(e: NewspaperServiceError) -> Self {
        match e {
            NewspaperServiceError::NotFound(_) => {
                WebError::not_found("No newspaper found matching the query")
            }
            NewspaperServiceError::InvalidPage(e) => e.into(),
            NewspaperServiceError::InternalError(e) => WebError::Internal(e),
            other => WebError::Internal(other.into()),
        }
    }
}

impl From<RedactorServiceError> for WebError {
    fn from(e: RedactorServiceError) -> Self {
        match e {
            RedactorServiceError::NotFound(_) => {
                WebError::not_found("No redactor found matching the query")
            }
            RedactorServiceError::InvalidPage(e) => e.into(),
            RedactorServiceError::InternalError(e) => WebError::Internal(e),
            other => WebError::Internal(other.into()),
        }
    }
}

/// Numeric `{id}` path segment; anything else is an unknown page.
#[derive(Debug, Clone, Copy)]
pub struct ObjectId(pub i64);

impl<S: Send + Sync> FromRequestParts<S> for ObjectId {
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| WebError::not_found("The page you requested was not found."))?;
        raw.parse()
            .map(ObjectId)
            .map_err(|_| WebError::not_found("The page you requested was not found."))
    }
}

/// Render `template` as a 200 page
pub fn render_page(
    state: &AppState,
    template: &str,
    context: &TeraContext,
) -> Result<Response, WebError> {
    let body = state.renderer.render(template, context)?;
    Ok(Html(body).into_response())
}

/// Context every logged-in page starts from
pub fn page_context(user: &Redactor) -> TeraContext {
    let mut context = TeraContext::new();
    context.insert("user", user);
    context
}

/// `page` query parameter; anything unusable is a 404
pub fn page_request(query: &HashMap<String, String>) -> Result<PageRequest, WebError> {
    Ok(PageRequest::parse(query.get("page").map(String::as_str))?)
}

/// Query-string fragment that keeps the search term across page links
pub fn search_query(form: &SearchForm) -> String {
    if form.value.is_empty() {
        String::new()
    } else {
        format!("{}={}", form.name, urlencoding::encode(&form.value))
    }
}

/// Add the list, pagination and search entries shared by list pages.
pub fn insert_list<T: Serialize>(
    context: &mut TeraContext,
    list_name: &str,
    page: &PagedResult<T>,
    search_form: &SearchForm,
) {
    let info = page.info();
    context.insert(list_name, &page.items);
    context.insert("is_paginated", &info.has_other_pages);
    context.insert("page_obj", &info);
    context.insert("search_form", search_form);
    context.insert("search_query", &search_query(search_form));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_found() {
        let response = redirect_found("/topics/");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/topics/");
    }

    #[test]
    fn test_search_query_encodes_value() {
        let form = SearchForm::newspapers().with_value("art & craft");
        assert_eq!(search_query(&form), "topic=art%20%26%20craft");
        assert_eq!(search_query(&SearchForm::topics()), "");
    }

    #[test]
    fn test_page_request_errors_are_not_found() {
        let query = HashMap::from([("page".to_string(), "abc".to_string())]);
        assert!(matches!(page_request(&query), Err(WebError::NotFound(_))));
        assert!(matches!(
            page_request(&HashMap::new()),
            Ok(PageRequest::Number(1))
        ));
    }

    #[test]
    fn test_web_error_carries_error_page() {
        let response = WebError::not_found("gone").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let page = response.extensions().get::<ErrorPage>().unwrap();
        assert_eq!(page.message, "gone");
    }
}
