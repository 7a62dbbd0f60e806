//! Discount code route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use tracing::instrument;

use crate::db::{ClassRepository, DiscountRepository};
use crate::error::AppError;
use crate::models::{
    CreateDiscountInput, Discount, DiscountFilter, UpdateDiscountInput, ValidationError,
    normalize_code,
};
use crate::state::AppState;
use maple_spruce_core::{ClassId, DiscountId};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/discounts", get(list).post(create))
        .route("/discounts/by-code/{code}", get(show_by_code))
        .route("/discounts/{id}", get(show).patch(update).delete(destroy))
}

#[instrument(skip(state, input))]
async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateDiscountInput>,
) -> Result<(StatusCode, Json<Discount>), AppError> {
    let input = input.validate()?;
    check_class(&state, input.class_id).await?;
    let discount = DiscountRepository::new(state.pool()).create(&input).await?;
    tracing::info!(discount_id = %discount.id, code = %discount.code, "Discount created");
    Ok((StatusCode::CREATED, Json(discount)))
}

async fn list(
    State(state): State<AppState>,
    Query(filter): Query<DiscountFilter>,
) -> Result<Json<Vec<Discount>>, AppError> {
    Ok(Json(DiscountRepository::new(state.pool()).list(&filter).await?))
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<DiscountId>,
) -> Result<Json<Discount>, AppError> {
    DiscountRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("discount", id))
}

/// Look a code up the way a student would type it (case and spacing are
/// normalized first).
async fn show_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Discount>, AppError> {
    let code = normalize_code(&code)?;
    DiscountRepository::new(state.pool())
        .get_by_code(&code)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("discount code", &code))
}

#[instrument(skip(state, input))]
async fn update(
    State(state): State<AppState>,
    Path(id): Path<DiscountId>,
    Json(input): Json<UpdateDiscountInput>,
) -> Result<Json<Discount>, AppError> {
    let input = input.validate()?;
    check_class(&state, input.class_id.flatten()).await?;
    Ok(Json(
        DiscountRepository::new(state.pool())
            .update(id, &input)
            .await?,
    ))
}

#[instrument(skip(state))]
async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<DiscountId>,
) -> Result<StatusCode, AppError> {
    let discounts = DiscountRepository::new(state.pool());
    let registrations = discounts.registration_count(id).await?;
    if registrations > 0 {
        return Err(AppError::Conflict(format!(
            "discount {id} was used by {registrations} registration(s); mark it inactive instead"
        )));
    }
    discounts.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// A class-scoped code must point at a class that exists.
async fn check_class(state: &AppState, class_id: Option<ClassId>) -> Result<(), AppError> {
    if let Some(class_id) = class_id
        && !ClassRepository::new(state.pool()).exists(class_id).await?
    {
        return Err(ValidationError::new(
            "class_id",
            format!("class {class_id} does not exist"),
        )
        .into());
    }
    Ok(())
}
