//! API state and request identity

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crewup_common::Error;

use crate::service::{OfferService, TeamService};

/// Shared state for teams API routes
#[derive(Clone)]
pub struct TeamsState {
    pub teams: TeamService,
    pub offers: OfferService,
}

/// The calling user's id, taken from the `x-user-id` header.
///
/// Identity is established upstream; this layer only needs to know who
/// the verified caller is. Services still check that the id names a
/// registered user.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get("x-user-id")
            .ok_or_else(|| Error::Authentication("Missing x-user-id header".to_string()))?;
        let raw = value
            .to_str()
            .map_err(|_| Error::Authentication("Invalid x-user-id header".to_string()))?;
        let user_id = Uuid::parse_str(raw)
            .map_err(|_| Error::Authentication("x-user-id must be a UUID".to_string()))?;
        Ok(AuthUser(user_id))
    }
}
