//! Web layer - HTML pages, admin API and routing
//!
//! Every page except the login form requires a session. Anonymous visitors
//! are redirected to `/accounts/login/?next=...`; the admin API answers
//! with JSON errors instead.

pub mod admin;
pub mod auth;
pub mod common;
pub mod middleware;
pub mod newspapers;
pub mod redactors;
pub mod site;
pub mod topics;


use axum::{middleware as axum_middleware, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::repositories::{
    SqlxNewspaperRepository, SqlxRedactorRepository, SqlxSessionRepository, SqlxTopicRepository,
};
use crate::db::DynDatabasePool;
use crate::render::Renderer;
use crate::services::{NewspaperService, RedactorService, TopicService};

pub use middleware::{AppState, CurrentRedactor};

impl AppState {
    /// Wire repositories, services and templates over `pool`.
    pub fn new(pool: DynDatabasePool, config: Config) -> anyhow::Result<Self> {
        let topic_repo = SqlxTopicRepository::boxed(pool.clone());
        let redactor_repo = SqlxRedactorRepository::boxed(pool.clone());
        let newspaper_repo = SqlxNewspaperRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());

        let topic_service = Arc::new(TopicService::new(topic_repo.clone()));
        let newspaper_service = Arc::new(NewspaperService::new(
            newspaper_repo,
            topic_repo,
            redactor_repo.clone(),
        ));
        let redactor_service = Arc::new(RedactorService::with_session_expiration(
            redactor_repo,
            session_repo,
            config.session.expiration_days,
        ));

        Ok(Self {
            pool,
            config: Arc::new(config),
            renderer: Arc::new(Renderer::new()?),
            topic_service,
            newspaper_service,
            redactor_service,
        })
    }
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    // HTML pages behind the login guard
    let pages = Router::new()
        .merge(site::router())
        .merge(topics::router())
        .merge(newspapers::router())
        .merge(redactors::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_login,
        ));

    // Admin API: session, then staff
    let admin_api = admin::router()
        .route_layer(axum_middleware::from_fn(middleware::require_staff))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_api_auth,
        ));

    Router::new()
        .merge(auth::router())
        .merge(pages)
        .nest("/admin/api", admin_api)
        .fallback(site::not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::render_error_pages,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
