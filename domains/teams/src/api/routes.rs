//! Route table for the teams domain

use axum::{
    routing::{delete, get, patch, post},
    Router,
};

use crate::api::handlers::{offers, teams, users};
use crate::api::TeamsState;

pub fn routes() -> Router<TeamsState> {
    Router::new()
        // Users
        .route("/v1/users", post(users::register))
        .route("/v1/users/{user_id}/offers", post(offers::offer_to_user))
        // Teams
        .route("/v1/teams", post(teams::create_team).get(teams::list_teams))
        .route(
            "/v1/teams/current",
            get(teams::current_team).patch(teams::update_team),
        )
        .route("/v1/teams/current/recruiting", patch(teams::set_recruiting))
        .route("/v1/teams/current/complete", post(teams::end_project))
        .route("/v1/teams/current/leave", post(teams::leave_team))
        .route(
            "/v1/teams/current/members/{user_id}",
            delete(teams::fire_member),
        )
        .route("/v1/teams/{team_id}", get(teams::get_team))
        // Offers
        .route("/v1/teams/{team_id}/offers", post(offers::offer_to_team))
        .route("/v1/teams/current/offers", get(offers::team_offers))
        .route(
            "/v1/teams/current/offers/{offer_id}",
            patch(offers::team_decide).delete(offers::team_cancel),
        )
        .route("/v1/offers", get(offers::my_offers))
        .route(
            "/v1/offers/{offer_id}",
            patch(offers::user_decide).delete(offers::user_cancel),
        )
}
