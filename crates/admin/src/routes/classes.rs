//! Class route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use tracing::instrument;

use crate::db::ClassRepository;
use crate::error::AppError;
use crate::models::{ClassDetail, ClassFilter, CreateClassInput, UpdateClassInput};
use crate::state::AppState;
use maple_spruce_core::{ClassId, ClassStatus};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/classes", get(list).post(create))
        .route("/classes/{id}", get(show).patch(update).delete(destroy))
        .route("/classes/{id}/publish", post(publish))
        .route("/classes/{id}/unpublish", post(unpublish))
}

/// Query for `POST /classes/{id}/unpublish?status=cancelled`.
#[derive(Debug, Deserialize)]
pub struct UnpublishQuery {
    /// Status to move the class to (default: `draft`).
    #[serde(default = "draft")]
    pub status: ClassStatus,
}

const fn draft() -> ClassStatus {
    ClassStatus::Draft
}

#[instrument(skip(state, input))]
async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateClassInput>,
) -> Result<(StatusCode, Json<ClassDetail>), AppError> {
    let class = state.classes().create_class(input).await?;
    Ok((StatusCode::CREATED, Json(class)))
}

async fn list(
    State(state): State<AppState>,
    Query(filter): Query<ClassFilter>,
) -> Result<Json<Vec<ClassDetail>>, AppError> {
    Ok(Json(ClassRepository::new(state.pool()).list(&filter).await?))
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<ClassId>,
) -> Result<Json<ClassDetail>, AppError> {
    Ok(Json(state.classes().get_class(id).await?))
}

#[instrument(skip(state, input))]
async fn update(
    State(state): State<AppState>,
    Path(id): Path<ClassId>,
    Json(input): Json<UpdateClassInput>,
) -> Result<Json<ClassDetail>, AppError> {
    Ok(Json(state.classes().update_class(id, input).await?))
}

#[instrument(skip(state))]
async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<ClassId>,
) -> Result<StatusCode, AppError> {
    state.classes().delete_class(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn publish(
    State(state): State<AppState>,
    Path(id): Path<ClassId>,
) -> Result<Json<ClassDetail>, AppError> {
    Ok(Json(state.classes().publish_class(id).await?))
}

#[instrument(skip(state))]
async fn unpublish(
    State(state): State<AppState>,
    Path(id): Path<ClassId>,
    Query(query): Query<UnpublishQuery>,
) -> Result<Json<ClassDetail>, AppError> {
    Ok(Json(
        state.classes().unpublish_class(id, query.status).await?,
    ))
}
