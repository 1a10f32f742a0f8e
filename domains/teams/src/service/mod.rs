//! Application services for the teams domain
//!
//! Services own authorization and orchestration; the entities own the
//! state rules and the store owns atomicity. Notifications are
//! fire-and-forget: a delivery failure is logged and never fails the
//! operation that triggered it.

pub mod offers;
pub mod teams;

pub use offers::OfferService;
pub use teams::{CreateTeamCommand, TeamService, UpdateTeamCommand};

use crewup_notify::{Notifier, TeamEvent};

pub(crate) async fn dispatch(notifier: &dyn Notifier, event: TeamEvent) {
    if let Err(err) = notifier.notify(event).await {
        tracing::warn!(error = %err, "notification delivery failed");
    }
}
