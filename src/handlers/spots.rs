// handlers/spots.rs - owner-scoped CRUD for /spots
//
// Every handler runs behind jwt_auth_middleware, so an AuthUser is always on
// the request. Lookups go through SpotFilter::one(id, caller), which makes a
// spot owned by someone else look exactly like a missing one.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::{Spot, SpotDraft, SpotPatch};
use crate::state::AppState;
use crate::store::SpotFilter;

#[derive(Debug, Serialize)]
pub struct SpotBody {
    pub spot: Spot,
}

#[derive(Debug, Serialize)]
pub struct SpotsBody {
    pub spots: Vec<Spot>,
}

/// POST /spots - create a spot owned by the caller
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<SpotBody> {
    let payload = spot_payload(body)?;
    let draft = SpotDraft::from_value(&payload)?;

    let spot = state.store.insert(Spot::new(draft, user.user_id)).await?;
    tracing::info!("Created spot {} for user {}", spot.id, user.user_id);

    Ok(ApiResponse::created(SpotBody { spot }))
}

/// GET /spots - every spot the caller owns
pub async fn index(State(state): State<AppState>, user: AuthUser) -> ApiResult<SpotsBody> {
    let spots = state.store.find(SpotFilter::owned_by(user.user_id)).await?;
    tracing::debug!("Listed {} spots for user {}", spots.len(), user.user_id);

    Ok(ApiResponse::success(SpotsBody { spots }))
}

/// GET /spots/:id
pub async fn show(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<SpotBody> {
    let id = parse_spot_id(&id)?;
    let spot = state.store.find_404(SpotFilter::one(id, user.user_id)).await?;

    Ok(ApiResponse::success(SpotBody { spot }))
}

/// PATCH /spots/:id - partial update; `owner` and blank fields never apply
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<()> {
    let id = parse_spot_id(&id)?;
    let payload = spot_payload(body)?;
    let patch = SpotPatch::from_value(&payload)?;
    if patch.is_empty() {
        tracing::debug!("Spot update for {} carries no changes; only updatedAt moves", id);
    }

    let spot = state.store.find_404(SpotFilter::one(id, user.user_id)).await?;
    require_ownership(&user, &spot)?;

    state.store.update(spot.id, patch).await?;
    tracing::info!("Updated spot {} for user {}", spot.id, user.user_id);

    Ok(ApiResponse::no_content())
}

/// DELETE /spots/:id
pub async fn destroy(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_spot_id(&id)?;

    let spot = state.store.find_404(SpotFilter::one(id, user.user_id)).await?;
    require_ownership(&user, &spot)?;

    state.store.delete(spot.id).await?;
    tracing::info!("Deleted spot {} for user {}", spot.id, user.user_id);

    Ok(ApiResponse::no_content())
}

/// Second ownership check after the scoped fetch
pub fn require_ownership(user: &AuthUser, spot: &Spot) -> Result<(), ApiError> {
    if spot.is_owned_by(user.user_id) {
        Ok(())
    } else {
        tracing::warn!("User {} attempted to modify spot {} owned by {}", user.user_id, spot.id, spot.owner);
        Err(ApiError::unauthorized("You do not own this spot"))
    }
}

/// Ids that are not UUIDs cannot name any spot, so they are plain 404s
fn parse_spot_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found("Spot not found"))
}

/// Unwrap the `{ "spot": { ... } }` request envelope
fn spot_payload(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    let Json(body) = body?;
    match body {
        Value::Object(mut map) => map
            .remove("spot")
            .ok_or_else(|| ApiError::bad_request("Request body must contain a 'spot' object")),
        _ => Err(ApiError::bad_request("Request body must be a JSON object")),
    }
}
