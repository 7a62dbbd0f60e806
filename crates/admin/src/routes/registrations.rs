//! Registration route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use tracing::instrument;

use crate::db::RegistrationRepository;
use crate::error::AppError;
use crate::models::{
    CreateRegistrationInput, QuoteRequest, Registration, RegistrationFilter,
    UpdateRegistrationInput,
};
use crate::services::RegistrationQuote;
use crate::state::AppState;
use maple_spruce_core::RegistrationId;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/registrations", get(list).post(create))
        .route("/registrations/quote", post(quote))
        .route(
            "/registrations/{id}",
            get(show).patch(update).delete(destroy),
        )
        .route("/registrations/{id}/cancel", post(cancel))
}

/// Price a registration without booking it.
#[instrument(skip(state, request))]
async fn quote(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<RegistrationQuote>, AppError> {
    Ok(Json(state.registrations().quote(request, Utc::now()).await?))
}

#[instrument(skip(state, input))]
async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateRegistrationInput>,
) -> Result<(StatusCode, Json<Registration>), AppError> {
    let registration = state
        .registrations()
        .create_registration(input, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

async fn list(
    State(state): State<AppState>,
    Query(filter): Query<RegistrationFilter>,
) -> Result<Json<Vec<Registration>>, AppError> {
    Ok(Json(
        RegistrationRepository::new(state.pool())
            .list(&filter)
            .await?,
    ))
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<RegistrationId>,
) -> Result<Json<Registration>, AppError> {
    Ok(Json(state.registrations().get_registration(id).await?))
}

#[instrument(skip(state, input))]
async fn update(
    State(state): State<AppState>,
    Path(id): Path<RegistrationId>,
    Json(input): Json<UpdateRegistrationInput>,
) -> Result<Json<Registration>, AppError> {
    Ok(Json(
        state.registrations().update_registration(id, input).await?,
    ))
}

#[instrument(skip(state))]
async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<RegistrationId>,
) -> Result<Json<Registration>, AppError> {
    Ok(Json(state.registrations().cancel_registration(id).await?))
}

#[instrument(skip(state))]
async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<RegistrationId>,
) -> Result<StatusCode, AppError> {
    RegistrationRepository::new(state.pool()).delete(id).await?;
    tracing::info!(registration_id = %id, "Registration deleted");
    Ok(StatusCode::NO_CONTENT)
}
