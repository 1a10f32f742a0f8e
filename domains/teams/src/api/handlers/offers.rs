//! Offer handlers: proposals, decisions, withdrawals, listings

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crewup_common::{Page, Pagination};

use crate::api::{AuthUser, TeamsState};
use crate::domain::entities::{Offer, OfferedBy, Position};
use crate::domain::state::OfferState;
use crate::error::Result;

// ============================================================================
// Request/response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateOfferRequest {
    pub position: Position,
}

#[derive(Debug, Deserialize)]
pub struct DecideOfferRequest {
    pub is_accepted: bool,
}

#[derive(Debug, Deserialize)]
pub struct MyOffersQuery {
    pub offered_by: OfferedBy,
}

#[derive(Debug, Deserialize)]
pub struct TeamOffersQuery {
    pub offered_by: OfferedBy,
    pub position: Option<Position>,
}

#[derive(Debug, Serialize)]
pub struct OfferResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub team_id: Uuid,
    pub position: Position,
    pub offered_by: OfferedBy,
    pub state: OfferState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Offer> for OfferResponse {
    fn from(offer: Offer) -> Self {
        Self {
            id: offer.id,
            user_id: offer.user_id,
            team_id: offer.team_id,
            position: offer.position,
            offered_by: offer.offered_by,
            state: offer.state(),
            created_at: offer.created_at,
            updated_at: offer.updated_at,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/teams/{team_id}/offers
pub async fn offer_to_team(
    State(state): State<TeamsState>,
    AuthUser(user_id): AuthUser,
    Path(team_id): Path<Uuid>,
    Json(request): Json<CreateOfferRequest>,
) -> Result<(StatusCode, Json<OfferResponse>)> {
    let offer = state
        .offers
        .offer_by_user(user_id, team_id, request.position)
        .await?;
    Ok((StatusCode::CREATED, Json(offer.into())))
}

/// POST /v1/users/{user_id}/offers
pub async fn offer_to_user(
    State(state): State<TeamsState>,
    AuthUser(user_id): AuthUser,
    Path(target_user_id): Path<Uuid>,
    Json(request): Json<CreateOfferRequest>,
) -> Result<(StatusCode, Json<OfferResponse>)> {
    let offer = state
        .offers
        .offer_by_team(user_id, target_user_id, request.position)
        .await?;
    Ok((StatusCode::CREATED, Json(offer.into())))
}

/// GET /v1/offers
pub async fn my_offers(
    State(state): State<TeamsState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<MyOffersQuery>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<OfferResponse>>> {
    let offers = state
        .offers
        .list_user_offers(user_id, query.offered_by, pagination.request())
        .await?;
    Ok(Json(offers.map(OfferResponse::from)))
}

/// PATCH /v1/offers/{offer_id}
pub async fn user_decide(
    State(state): State<TeamsState>,
    AuthUser(user_id): AuthUser,
    Path(offer_id): Path<Uuid>,
    Json(request): Json<DecideOfferRequest>,
) -> Result<StatusCode> {
    state
        .offers
        .user_decide(user_id, offer_id, request.is_accepted)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /v1/offers/{offer_id}
pub async fn user_cancel(
    State(state): State<TeamsState>,
    AuthUser(user_id): AuthUser,
    Path(offer_id): Path<Uuid>,
) -> Result<StatusCode> {
    state.offers.cancel_by_user(user_id, offer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/teams/current/offers
pub async fn team_offers(
    State(state): State<TeamsState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<TeamOffersQuery>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<OfferResponse>>> {
    let offers = state
        .offers
        .list_team_offers(user_id, query.position, query.offered_by, pagination.request())
        .await?;
    Ok(Json(offers.map(OfferResponse::from)))
}

/// PATCH /v1/teams/current/offers/{offer_id}
pub async fn team_decide(
    State(state): State<TeamsState>,
    AuthUser(user_id): AuthUser,
    Path(offer_id): Path<Uuid>,
    Json(request): Json<DecideOfferRequest>,
) -> Result<StatusCode> {
    state
        .offers
        .team_decide(user_id, offer_id, request.is_accepted)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /v1/teams/current/offers/{offer_id}
pub async fn team_cancel(
    State(state): State<TeamsState>,
    AuthUser(user_id): AuthUser,
    Path(offer_id): Path<Uuid>,
) -> Result<StatusCode> {
    state.offers.cancel_by_team(user_id, offer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
