//! Topic pages

use axum::{
    extract::{Query, State},
    response::Response,
    routing::get,
    Form, Router,
};
use std::collections::HashMap;

use crate::forms::{FormData, SearchForm, TopicForm};
use crate::models::{Redactor, Topic};
use crate::services::TopicServiceError;

use super::common::{
    insert_list, page_context, page_request, redirect_found, render_page, ObjectId, WebError,
};
use super::middleware::{AppState, CurrentRedactor};

const LIST_URL: &str = "/topics/";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/topics/", get(list))
        .route("/topics/create/", get(create_page).post(create))
        .route("/topics/{id}/update/", get(update_page).post(update))
        .route("/topics/{id}/delete/", get(delete_page).post(delete))
}

/// GET /topics/?name=&page=
async fn list(
    State(state): State<AppState>,
    CurrentRedactor(user): CurrentRedactor,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, WebError> {
    let search_form = SearchForm::topics().bind(&query);
    let page = state
        .topic_service
        .list(
            &search_form.needle(),
            page_request(&query)?,
            state.config.pagination.topics,
        )
        .await?;

    let mut context = page_context(&user);
    insert_list(&mut context, "topic_list", &page, &search_form);
    render_page(&state, "newspapers/topic_list.html", &context)
}

fn render_form(
    state: &AppState,
    user: &Redactor,
    form: &TopicForm,
    object: Option<&Topic>,
) -> Result<Response, WebError> {
    let mut context = page_context(user);
    context.insert("form", form);
    context.insert("object", &object);
    render_page(state, "newspapers/topic_form.html", &context)
}

async fn get_topic(state: &AppState, id: i64) -> Result<Topic, WebError> {
    state
        .topic_service
        .get_by_id(id)
        .await?
        .ok_or_else(|| WebError::not_found("No topic found matching the query"))
}

async fn create_page(
    State(state): State<AppState>,
    CurrentRedactor(user): CurrentRedactor,
) -> Result<Response, WebError> {
    render_form(&state, &user, &TopicForm::default(), None)
}

async fn create(
    State(state): State<AppState>,
    CurrentRedactor(user): CurrentRedactor,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    let mut form = TopicForm::from_data(&FormData::new(pairs));
    let Some(input) = form.clean() else {
        return render_form(&state, &user, &form, None);
    };

    match state.topic_service.create(input).await {
        Ok(_) => Ok(redirect_found(LIST_URL)),
        Err(TopicServiceError::DuplicateName(_)) => {
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
    let topic = get_topic(&state, id).await?;
    render_form(&state, &user, &TopicForm::from_topic(&topic), Some(&topic))
}

async fn update(
    State(state): State<AppState>,
    CurrentRedactor(user): CurrentRedactor,
    ObjectId(id): ObjectId,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    let topic = get_topic(&state, id).await?;
    let mut form = TopicForm::from_data(&FormData::new(pairs));
    let Some(input) = form.clean() else {
        return render_form(&state, &user, &form, Some(&topic));
    };

    match state.topic_service.update(id, input).await {
        Ok(_) => Ok(redirect_found(LIST_URL)),
        Err(TopicServiceError::DuplicateName(_)) => {
            form.reject_duplicate();
            render_form(&state, &user, &form, Some(&topic))
        }
        Err(e) => Err(e.into()),
    }
}

async fn delete_page(
    State(state): State<AppState>,
    CurrentRedactor(user): CurrentRedactor,
    ObjectId(id): ObjectId,
) -> Result<Response, WebError> {
    let topic = get_topic(&state, id).await?;
    let mut context = page_context(&user);
    context.insert("object", &topic);
    render_page(&state, "newspapers/topic_confirm_delete.html", &context)
}

async fn delete(State(state): State<AppState>, ObjectId(id): ObjectId) -> Result<Response, WebError> {
    state.topic_service.delete(id).await?;
    Ok(redirect_found(LIST_URL))
}
