//! Crewup application composition root
//!
//! Wires the teams domain onto the Postgres store and the structured-log
//! notifier, and composes the final router.

use std::sync::Arc;

use axum::Router;
use sqlx::PgPool;

use crewup_common::Config;
use crewup_notify::{Notifier, TracingNotifier};
use crewup_teams::{CascadeScope, OfferService, PgStore, Store, TeamService, TeamsState};

/// Embedded schema migrations, applied at startup by the binary
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Create the main application router with all routes and middleware
pub fn create_app(config: &Config, pool: PgPool) -> Router {
    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier::new());
    let cascade = CascadeScope::from_config(&config.offer_cascade_scope);

    let teams_state = TeamsState {
        teams: TeamService::new(store.clone(), notifier.clone()),
        offers: OfferService::new(store, notifier, cascade),
    };

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .route("/", axum::routing::get(|| async { "Crewup API" }))
        .merge(crewup_teams::routes().with_state(teams_state))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
