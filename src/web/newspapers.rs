//! Newspaper pages

use axum::{
    extract::{Query, State},
    response::Response,
    routing::get,
    Form, Router,
};
use std::collections::HashMap;

use crate::forms::{FormData, NewspaperForm, SearchForm};
use crate::models::{Newspaper, Redactor};
use crate::services::NewspaperServiceError;

use super::common::{
    insert_list, page_context, page_request, redirect_found, render_page, ObjectId, WebError,
};
use super::middleware::{AppState, CurrentRedactor};

const LIST_URL: &str = "/newspapers/";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/newspapers/", get(list))
        .route("/newspapers/create/", get(create_page).post(create))
        .route("/newspapers/{id}/", get(detail))
        .route("/newspapers/{id}/update/", get(update_page).post(update))
        .route("/newspapers/{id}/delete/", get(delete_page).post(delete))
}

/// GET /newspapers/?topic=&page=
async fn list(
    State(state): State<AppState>,
    CurrentRedactor(user): CurrentRedactor,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, WebError> {
    let search_form = SearchForm::newspapers().bind(&query);
    let page = state
        .newspaper_service
        .list(
            &search_form.needle(),
            page_request(&query)?,
            state.config.pagination.newspapers,
        )
        .await?;

    let mut context = page_context(&user);
    insert_list(&mut context, "newspaper_list", &page, &search_form);
    render_page(&state, "newspapers/newspaper_list.html", &context)
}

/// GET /newspapers/{id}/
async fn detail(
    State(state): State<AppState>,
    CurrentRedactor(user): CurrentRedactor,
    ObjectId(id): ObjectId,
) -> Result<Response, WebError> {
    let detail = state
        .newspaper_service
        .get_detail(id)
        .await?
        .ok_or_else(|| WebError::not_found("No newspaper found matching the query"))?;

    let mut context = page_context(&user);
    context.insert("newspaper", &detail.newspaper);
    context.insert("topic", &detail.topic);
    context.insert("publishers", &detail.publishers);
    render_page(&state, "newspapers/newspaper_detail.html", &context)
}

async fn render_form(
    state: &AppState,
    user: &Redactor,
    form: &NewspaperForm,
    object: Option<&Newspaper>,
) -> Result<Response, WebError> {
    let topics = state.topic_service.list_all().await?;
    let redactors = state.redactor_service.list_all().await?;

    let mut context = page_context(user);
    context.insert("form", form);
    context.insert("object", &object);
    context.insert("topics", &topics);
    context.insert("redactors", &redactors);
    context.insert("selected_topic", &form.selected_topic());
    context.insert("selected_publishers", &form.selected_publishers());
    render_page(state, "newspapers/newspaper_form.html", &context)
}

/// Attach a reference error from the service to the form, or pass it on.
fn reject_reference(
    form: &mut NewspaperForm,
    error: NewspaperServiceError,
) -> Result<(), WebError> {
    match error {
        NewspaperServiceError::TopicNotFound(_) => form.reject_topic(),
        NewspaperServiceError::PublisherNotFound(id) => form.reject_publisher(id),
        other => return Err(other.into()),
    }
    Ok(())
}

async fn get_newspaper(state: &AppState, id: i64) -> Result<Newspaper, WebError> {
    state
        .newspaper_service
        .get_by_id(id)
        .await?
        .ok_or_else(|| WebError::not_found("No newspaper found matching the query"))
}

async fn create_page(
    State(state): State<AppState>,
    CurrentRedactor(user): CurrentRedactor,
) -> Result<Response, WebError> {
    render_form(&state, &user, &NewspaperForm::default(), None).await
}

async fn create(
    State(state): State<AppState>,
    CurrentRedactor(user): CurrentRedactor,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    let mut form = NewspaperForm::from_data(&FormData::new(pairs));
    let Some(input) = form.clean() else {
        return render_form(&state, &user, &form, None).await;
    };

    match state.newspaper_service.create(input).await {
        Ok(_) => Ok(redirect_found(LIST_URL)),
        Err(e) => {
            reject_reference(&mut form, e)?;
            render_form(&state, &user, &form, None).await
        }
    }
}

async fn update_page(
    State(state): State<AppState>,
    CurrentRedactor(user): CurrentRedactor,
    ObjectId(id): ObjectId,
) -> Result<Response, WebError> {
    let detail = state
        .newspaper_service
        .get_detail(id)
        .await?
        .ok_or_else(|| WebError::not_found("No newspaper found matching the query"))?;
    let form = NewspaperForm::from_detail(&detail);
    render_form(&state, &user, &form, Some(&detail.newspaper)).await
}

async fn update(
    State(state): State<AppState>,
    CurrentRedactor(user): CurrentRedactor,
    ObjectId(id): ObjectId,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    let newspaper = get_newspaper(&state, id).await?;
    let mut form = NewspaperForm::from_data(&FormData::new(pairs));
    let Some(input) = form.clean() else {
        return render_form(&state, &user, &form, Some(&newspaper)).await;
    };

    match state.newspaper_service.update(id, input).await {
        Ok(updated) => Ok(redirect_found(&updated.detail_url())),
        Err(e) => {
            reject_reference(&mut form, e)?;
            render_form(&state, &user, &form, Some(&newspaper)).await
        }
    }
}

async fn delete_page(
    State(state): State<AppState>,
    CurrentRedactor(user): CurrentRedactor,
    ObjectId(id): ObjectId,
) -> Result<Response, WebError> {
    let newspaper = get_newspaper(&state, id).await?;
    let mut context = page_context(&user);
    context.insert("object", &newspaper);
    render_page(&state, "newspapers/newspaper_confirm_delete.html", &context)
}

async fn delete(State(state): State<AppState>, ObjectId(id): ObjectId) -> Result<Response, WebError> {
    state.newspaper_service.delete(id).await?;
    Ok(redirect_found(LIST_URL))
}
