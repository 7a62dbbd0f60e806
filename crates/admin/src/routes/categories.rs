//! Category route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use tracing::instrument;

use crate::db::CategoryRepository;
use crate::error::AppError;
use crate::models::{Category, CreateCategoryInput, UpdateCategoryInput};
use crate::state::AppState;
use maple_spruce_core::CategoryId;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list).post(create))
        .route("/categories/{id}", get(show).patch(update).delete(destroy))
}

#[instrument(skip(state, input))]
async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateCategoryInput>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    let input = input.validate()?;
    let category = CategoryRepository::new(state.pool()).create(&input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn list(State(state): State<AppState>) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(CategoryRepository::new(state.pool()).list().await?))
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<Category>, AppError> {
    CategoryRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("category", id))
}

#[instrument(skip(state, input))]
async fn update(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    Json(input): Json<UpdateCategoryInput>,
) -> Result<Json<Category>, AppError> {
    let input = input.validate()?;
    Ok(Json(
        CategoryRepository::new(state.pool())
            .update(id, &input)
            .await?,
    ))
}

#[instrument(skip(state))]
async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode, AppError> {
    let categories = CategoryRepository::new(state.pool());
    let (products, classes) = categories.reference_counts(id).await?;
    if products > 0 || classes > 0 {
        return Err(AppError::Conflict(format!(
            "category {id} is used by {products} product(s) and {classes} class(es)"
        )));
    }
    categories.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
