//! Route table and handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use codezen_core::{Comment, Guideline, Project, Review};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::auth::CurrentUser;
use crate::body::JsonBody;
use crate::error::ApiError;
use crate::state::AppState;

type ApiResult<T> = Result<T, ApiError>;
type Created<T> = (StatusCode, Json<T>);

/// Body of `POST /api/v1/projects`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub language: String,
}

/// Body of `POST /api/v1/projects/{id}/reviews`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    #[serde(default)]
    pub code: String,
}

/// Body of `POST /api/v1/projects/{id}/guidelines`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGuidelineRequest {
    #[serde(default)]
    pub rule_text: String,
}

/// Body of `POST /api/v1/projects/{id}/reviews/{reviewId}/comments`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub message: String,
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/projects", get(list_projects).post(create_project))
        .route(
            "/api/v1/projects/{id}",
            get(get_project).delete(delete_project),
        )
        .route(
            "/api/v1/projects/{id}/reviews",
            get(list_reviews).post(create_review),
        )
        .route("/api/v1/projects/{id}/reviews/{review_id}", get(get_review))
        .route(
            "/api/v1/projects/{id}/reviews/{review_id}/comments",
            get(list_comments).post(create_comment),
        )
        .route(
            "/api/v1/projects/{id}/guidelines",
            get(list_guidelines).post(create_guideline),
        )
        .route(
            "/api/v1/projects/{id}/guidelines/{guideline_id}",
            delete(delete_guideline),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// --- Projects ---

async fn create_project(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    JsonBody(body): JsonBody<CreateProjectRequest>,
) -> ApiResult<Created<Project>> {
    let project = state
        .service
        .create_project(&user, &body.name, &body.language)?;
    Ok((StatusCode::CREATED, Json(project)))
}

async fn list_projects(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(state.service.list_projects(&user)?))
}

async fn get_project(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Project>> {
    Ok(Json(state.service.get_project(&user, id)?))
}

async fn delete_project(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.service.delete_project(&user, id)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Reviews ---

async fn create_review(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<CreateReviewRequest>,
) -> ApiResult<Created<Review>> {
    let review = state.service.create_review(&user, id, &body.code).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

async fn list_reviews(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<Review>>> {
    Ok(Json(state.service.list_reviews(&user, id)?))
}

async fn get_review(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path((id, review_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Review>> {
    Ok(Json(state.service.get_review(&user, id, review_id)?))
}

// --- Guidelines ---

async fn create_guideline(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<CreateGuidelineRequest>,
) -> ApiResult<Created<Guideline>> {
    let guideline = state.service.add_guideline(&user, id, &body.rule_text)?;
    Ok((StatusCode::CREATED, Json(guideline)))
}

async fn list_guidelines(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<Guideline>>> {
    Ok(Json(state.service.list_guidelines(&user, id)?))
}

async fn delete_guideline(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path((id, guideline_id)): Path<(i64, i64)>,
) -> ApiResult<StatusCode> {
    state.service.delete_guideline(&user, id, guideline_id)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Comments ---

async fn create_comment(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path((id, review_id)): Path<(i64, i64)>,
    JsonBody(body): JsonBody<CreateCommentRequest>,
) -> ApiResult<Created<Comment>> {
    let reply = state
        .service
        .post_comment(&user, id, review_id, &body.message)
        .await?;
    Ok((StatusCode::CREATED, Json(reply)))
}

async fn list_comments(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path((id, review_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Vec<Comment>>> {
    Ok(Json(state.service.list_comments(&user, id, review_id)?))
}
