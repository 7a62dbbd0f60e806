//! Instructor route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use tracing::instrument;

use crate::db::InstructorRepository;
use crate::error::AppError;
use crate::models::{CreateInstructorInput, Instructor, InstructorFilter, UpdateInstructorInput};
use crate::state::AppState;
use maple_spruce_core::InstructorId;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/instructors", get(list).post(create))
        .route("/instructors/{id}", get(show).patch(update).delete(destroy))
}

#[instrument(skip(state, input))]
async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateInstructorInput>,
) -> Result<(StatusCode, Json<Instructor>), AppError> {
    let input = input.validate()?;
    let instructor = InstructorRepository::new(state.pool()).create(&input).await?;
    Ok((StatusCode::CREATED, Json(instructor)))
}

async fn list(
    State(state): State<AppState>,
    Query(filter): Query<InstructorFilter>,
) -> Result<Json<Vec<Instructor>>, AppError> {
    Ok(Json(
        InstructorRepository::new(state.pool()).list(&filter).await?,
    ))
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<InstructorId>,
) -> Result<Json<Instructor>, AppError> {
    InstructorRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("instructor", id))
}

#[instrument(skip(state, input))]
async fn update(
    State(state): State<AppState>,
    Path(id): Path<InstructorId>,
    Json(input): Json<UpdateInstructorInput>,
) -> Result<Json<Instructor>, AppError> {
    let input = input.validate()?;
    Ok(Json(
        InstructorRepository::new(state.pool())
            .update(id, &input)
            .await?,
    ))
}

#[instrument(skip(state))]
async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<InstructorId>,
) -> Result<StatusCode, AppError> {
    let instructors = InstructorRepository::new(state.pool());
    let classes = instructors.class_count(id).await?;
    if classes > 0 {
        return Err(AppError::Conflict(format!(
            "instructor {id} is assigned to {classes} class(es)"
        )));
    }
    instructors.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
