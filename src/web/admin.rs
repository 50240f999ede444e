//! Admin JSON API
//!
//! Staff-only listings mirroring the admin registrations of the three
//! entities. Mounted under `/admin/api`.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{NewspaperWithTopic, Redactor, Topic};

use super::middleware::{AppState, ApiError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(get_dashboard))
        .route("/topics", get(list_topics))
        .route("/redactors", get(list_redactors))
        .route("/redactors/{id}", get(get_redactor))
        .route("/newspapers", get(list_newspapers))
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub topics: i64,
    pub newspapers: i64,
    pub redactors: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct NewspaperQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub topic: Option<i64>,
}

/// `?topic=` with no value means no filter.
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Serialize)]
pub struct TopicRow {
    pub id: i64,
    pub name: String,
}

impl From<Topic> for TopicRow {
    fn from(topic: Topic) -> Self {
        Self {
            id: topic.id,
            name: topic.name,
        }
    }
}

/// Redactor columns shown in the admin list
#[derive(Debug, Serialize)]
pub struct RedactorRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub years_of_experience: i32,
}

impl From<Redactor> for RedactorRow {
    fn from(r: Redactor) -> Self {
        Self {
            id: r.id,
            username: r.username,
            email: r.email,
            first_name: r.first_name,
            last_name: r.last_name,
            is_staff: r.is_staff,
            years_of_experience: r.years_of_experience,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NewspaperRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub published_date: NaiveDate,
    pub topic: Option<String>,
}

impl From<NewspaperWithTopic> for NewspaperRow {
    fn from(row: NewspaperWithTopic) -> Self {
        Self {
            id: row.newspaper.id,
            title: row.newspaper.title,
            content: row.newspaper.content,
            published_date: row.newspaper.published_date,
            topic: row.topic.map(|t| t.name),
        }
    }
}

/// GET /admin/api/dashboard
async fn get_dashboard(State(state): State<AppState>) -> Result<Json<DashboardResponse>, ApiError> {
    let topics = state
        .topic_service
        .count()
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;
    let newspapers = state
        .newspaper_service
        .count()
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;
    let redactors = state
        .redactor_service
        .count()
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok(Json(DashboardResponse {
        topics,
        newspapers,
        redactors,
    }))
}

/// GET /admin/api/topics?q=
async fn list_topics(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<TopicRow>>, ApiError> {
    let topics = state
        .topic_service
        .filter_by_substring(query.q.trim())
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;
    Ok(Json(topics.into_iter().map(Into::into).collect()))
}

/// GET /admin/api/redactors?q= - ordered by experience, then username
async fn list_redactors(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<RedactorRow>>, ApiError> {
    let redactors = state
        .redactor_service
        .list_for_admin(&query.q)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;
    Ok(Json(redactors.into_iter().map(Into::into).collect()))
}

/// GET /admin/api/redactors/{id} - full record without the password hash
async fn get_redactor(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Redactor>, ApiError> {
    let redactor = state
        .redactor_service
        .get_by_id(id)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?
        .ok_or_else(|| ApiError::not_found(format!("Redactor not found: {}", id)))?;

    Ok(Json(redactor))
}

/// GET /admin/api/newspapers?q=&topic= - ordered by publication date
async fn list_newspapers(
    State(state): State<AppState>,
    Query(query): Query<NewspaperQuery>,
) -> Result<Json<Vec<NewspaperRow>>, ApiError> {
    let newspapers = state
        .newspaper_service
        .list_for_admin(&query.q, query.topic)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;
    Ok(Json(newspapers.into_iter().map(Into::into).collect()))
}
