//! Artist route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use tracing::instrument;

use crate::db::ArtistRepository;
use crate::error::AppError;
use crate::models::{Artist, ArtistFilter, CreateArtistInput, UpdateArtistInput};
use crate::state::AppState;
use maple_spruce_core::ArtistId;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/artists", get(list).post(create))
        .route("/artists/{id}", get(show).patch(update).delete(destroy))
        .route("/artists/{id}/publish", post(publish))
        .route("/artists/{id}/unpublish", post(unpublish))
}

#[instrument(skip(state, input))]
async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateArtistInput>,
) -> Result<(StatusCode, Json<Artist>), AppError> {
    let input = input.validate()?;
    let artist = ArtistRepository::new(state.pool()).create(&input).await?;
    tracing::info!(artist_id = %artist.id, "Artist created");
    Ok((StatusCode::CREATED, Json(artist)))
}

async fn list(
    State(state): State<AppState>,
    Query(filter): Query<ArtistFilter>,
) -> Result<Json<Vec<Artist>>, AppError> {
    Ok(Json(ArtistRepository::new(state.pool()).list(&filter).await?))
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<ArtistId>,
) -> Result<Json<Artist>, AppError> {
    ArtistRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("artist", id))
}

#[instrument(skip(state, input))]
async fn update(
    State(state): State<AppState>,
    Path(id): Path<ArtistId>,
    Json(input): Json<UpdateArtistInput>,
) -> Result<Json<Artist>, AppError> {
    let input = input.validate()?;
    Ok(Json(
        ArtistRepository::new(state.pool()).update(id, &input).await?,
    ))
}

/// Delete an artist who no longer has products on file.
#[instrument(skip(state))]
async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<ArtistId>,
) -> Result<StatusCode, AppError> {
    let artists = ArtistRepository::new(state.pool());
    let products = artists.product_count(id).await?;
    if products > 0 {
        return Err(AppError::Conflict(format!(
            "artist {id} still has {products} product(s); mark the artist inactive instead"
        )));
    }

    if let Some(artist) = artists.get(id).await?
        && artist.webflow_item_id.is_some()
        && state.webflow().is_some()
    {
        state.publishing().unpublish_artist(id).await?;
    }
    artists.delete(id).await?;
    tracing::info!(artist_id = %id, "Artist deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn publish(
    State(state): State<AppState>,
    Path(id): Path<ArtistId>,
) -> Result<Json<Artist>, AppError> {
    Ok(Json(state.publishing().publish_artist(id).await?))
}

async fn unpublish(
    State(state): State<AppState>,
    Path(id): Path<ArtistId>,
) -> Result<Json<Artist>, AppError> {
    Ok(Json(state.publishing().unpublish_artist(id).await?))
}
