//! Redactor pages

use axum::{
    extract::{Query, State},
    response::Response,
    routing::get,
    Form, Router,
};
use std::collections::HashMap;
use serde::Serialize;

use crate::forms::{FormData, RedactorCreationForm, RedactorUpdateForm, SearchForm};
use crate::models::Redactor;
use crate::services::RedactorServiceError;

use super::common::{
    insert_list, page_context, page_request, redirect_found, render_page, ObjectId, WebError,
};
use super::middleware::{AppState, CurrentRedactor};

const LIST_URL: &str = "/redactors/";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/redactors/", get(list))
        .route("/redactors/create/", get(create_page).post(create))
        .route("/redactors/{id}/", get(detail))
        .route("/redactors/{id}/update/", get(update_page).post(update))
        .route("/redactors/{id}/delete/", get(delete_page).post(delete))
}

/// GET /redactors/?username=&page=
async fn list(
    State(state): State<AppState>,
    CurrentRedactor(user): CurrentRedactor,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, WebError> {
    let search_form = SearchForm::redactors().bind(&query);
    let page = state
        .redactor_service
        .list(
            &search_form.needle(),
            page_request(&query)?,
            state.config.pagination.redactors,
        )
        .await?;

    let mut context = page_context(&user);
    insert_list(&mut context, "redactor_list", &page, &search_form);
    render_page(&state, "newspapers/redactor_list.html", &context)
}

/// GET /redactors/{id}/
async fn detail(
    State(state): State<AppState>,
    CurrentRedactor(user): CurrentRedactor,
    ObjectId(id): ObjectId,
) -> Result<Response, WebError> {
    let detail = state
        .redactor_service
        .get_detail(id)
        .await?
        .ok_or_else(|| WebError::not_found("No redactor found matching the query"))?;

    let mut context = page_context(&user);
    context.insert("redactor", &detail.redactor);
    context.insert("newspapers", &detail.newspapers);
    render_page(&state, "newspapers/redactor_detail.html", &context)
}

fn render_form<F: Serialize>(
    state: &AppState,
    user: &Redactor,
    form: &F,
    object: Option<&Redactor>,
) -> Result<Response, WebError> {
    let mut context = page_context(user);
    context.insert("form", form);
    context.insert("object", &object);
    render_page(state, "newspapers/redactor_form.html", &context)
}

async fn get_redactor(state: &AppState, id: i64) -> Result<Redactor, WebError> {
    state
        .redactor_service
        .get_by_id(id)
        .await?
        .ok_or_else(|| WebError::not_found("No redactor found matching the query"))
}

async fn create_page(
    State(state): State<AppState>,
    CurrentRedactor(user): CurrentRedactor,
) -> Result<Response, WebError> {
    render_form(&state, &user, &RedactorCreationForm::new(), None)
}

/// POST /redactors/create/ - registration, then the new redactor's page
async fn create(
    State(state): State<AppState>,
    CurrentRedactor(user): CurrentRedactor,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    let mut form = RedactorCreationForm::from_data(&FormData::new(pairs));
    let Some(input) = form.clean() else {
        return render_form(&state, &user, &form, None);
    };

    match state.redactor_service.create(input).await {
        Ok(created) => Ok(redirect_found(&created.detail_url())),
        Err(RedactorServiceError::UsernameExists(_)) => {
            form.reject_duplicate();
            render_form(&state, &user, &form, None)
        }
        Err(e) => Err(e.into()),
    }
}

async fn update_page(
    State(state): State<AppState>,
    CurrentRedactor(user): CurrentRedactor,
    ObjectId(id): ObjectId,
) -> Result<Response, WebError> {
    let redactor = get_redactor(&state, id).await?;
    let form = RedactorUpdateForm::from_redactor(&redactor);
    render_form(&state, &user, &form, Some(&redactor))
}

async fn update(
    State(state): State<AppState>,
    CurrentRedactor(user): CurrentRedactor,
    ObjectId(id): ObjectId,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    let redactor = get_redactor(&state, id).await?;
    let mut form = RedactorUpdateForm::from_data(&FormData::new(pairs));
    let Some(input) = form.clean() else {
        return render_form(&state, &user, &form, Some(&redactor));
    };

    match state.redactor_service.update(id, input).await {
        Ok(_) => Ok(redirect_found(LIST_URL)),
        Err(RedactorServiceError::UsernameExists(_)) => {
            form.reject_duplicate();
            render_form(&state, &user, &form, Some(&redactor))
        }
        Err(e) => Err(e.into()),
    }
}

async fn delete_page(
    State(state): State<AppState>,
    CurrentRedactor(user): CurrentRedactor,
    ObjectId(id): ObjectId,
) -> Result<Response, WebError> {
    let redactor = get_redactor(&state, id).await?;
    let mut context = page_context(&user);
    context.insert("object", &redactor);
    render_page(&state, "newspapers/redactor_confirm_delete.html", &context)
}

async fn delete(State(state): State<AppState>, ObjectId(id): ObjectId) -> Result<Response, WebError> {
    state.redactor_service.delete(id).await?;
    Ok(redirect_found(LIST_URL))
}
