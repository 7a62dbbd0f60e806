//! Product route handlers. Writes go through `CatalogService` so Square
//! stays in step.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use tracing::instrument;

use crate::db::ProductRepository;
use crate::error::AppError;
use crate::models::{
    AdjustQuantityInput, CreateProductInput, Product, ProductFilter, UpdateProductInput,
};
use crate::state::AppState;
use maple_spruce_core::ProductId;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list).post(create))
        .route("/products/{id}", get(show).patch(update).delete(destroy))
        .route("/products/{id}/adjust", post(adjust))
}

#[instrument(skip(state, input))]
async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateProductInput>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let product = state.catalog().create_product(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn list(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(ProductRepository::new(state.pool()).list(&filter).await?))
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(state.catalog().get_product(id).await?))
}

#[instrument(skip(state, input))]
async fn update(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(input): Json<UpdateProductInput>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(state.catalog().update_product(id, input).await?))
}

#[instrument(skip(state, input))]
async fn adjust(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(input): Json<AdjustQuantityInput>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(state.catalog().adjust_quantity(id, input).await?))
}

#[instrument(skip(state))]
async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode, AppError> {
    state.catalog().delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
