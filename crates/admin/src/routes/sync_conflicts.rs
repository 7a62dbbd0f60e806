//! Square sync check and conflict route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use tracing::instrument;

use crate::db::SyncConflictRepository;
use crate::error::AppError;
use crate::models::{ConflictFilter, ResolveConflictInput, SyncConflict, SyncSummary};
use crate::services::ProductCheck;
use crate::state::AppState;
use maple_spruce_core::{ProductId, SyncConflictId};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sync/check", post(check_all))
        .route("/sync/check/{product_id}", post(check_product))
        .route("/sync/conflicts", get(list))
        .route("/sync/conflicts/{id}", get(show))
        .route("/sync/conflicts/{id}/resolve", post(resolve))
}

#[instrument(skip(state))]
async fn check_all(State(state): State<AppState>) -> Result<Json<SyncSummary>, AppError> {
    Ok(Json(state.sync().check_all_products().await?))
}

#[instrument(skip(state))]
async fn check_product(
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
) -> Result<Json<ProductCheck>, AppError> {
    Ok(Json(state.sync().check_product(product_id).await?))
}

async fn list(
    State(state): State<AppState>,
    Query(filter): Query<ConflictFilter>,
) -> Result<Json<Vec<SyncConflict>>, AppError> {
    Ok(Json(
        SyncConflictRepository::new(state.pool())
            .list(&filter)
            .await?,
    ))
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<SyncConflictId>,
) -> Result<Json<SyncConflict>, AppError> {
    Ok(Json(state.sync().get_conflict(id).await?))
}

#[instrument(skip(state, input))]
async fn resolve(
    State(state): State<AppState>,
    Path(id): Path<SyncConflictId>,
    Json(input): Json<ResolveConflictInput>,
) -> Result<Json<SyncConflict>, AppError> {
    Ok(Json(state.sync().resolve_conflict(id, input).await?))
}
