//! Crewup Notification Gateway
//!
//! Delivers fire-and-forget notifications for team and offer events:
//! - Structured-log delivery for production and local development
//! - Mock delivery for testing
//!
//! Delivery failures must never affect the operation that produced the
//! event; callers log and move on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod log;
pub mod mock;

pub use log::TracingNotifier;
pub use mock::MockNotifier;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Notification delivery error: {0}")]
    Delivery(String),
}

/// Which side of an offer initiated it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OfferSide {
    User,
    Leader,
}

/// A notifiable event in the team/offer lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TeamEvent {
    /// An offer was created and the other side should hear about it
    OfferReceived {
        offer_id: Uuid,
        user_id: Uuid,
        team_id: Uuid,
        offered_by: OfferSide,
    },
    /// A user was admitted to a team
    MemberJoined { user_id: Uuid, team_id: Uuid },
    /// A member was removed by the leader
    MemberFired { user_id: Uuid, team_id: Uuid },
    /// A member left of their own accord
    MemberLeft { user_id: Uuid, team_id: Uuid },
    /// The team completed its project
    ProjectCompleted {
        team_id: Uuid,
        project_url: String,
        completed_at: DateTime<Utc>,
    },
    /// The team disbanded without a project output
    TeamDisbanded { team_id: Uuid },
}

impl TeamEvent {
    /// The team this event concerns
    pub fn team_id(&self) -> Uuid {
        match self {
            TeamEvent::OfferReceived { team_id, .. }
            | TeamEvent::MemberJoined { team_id, .. }
            | TeamEvent::MemberFired { team_id, .. }
            | TeamEvent::MemberLeft { team_id, .. }
            | TeamEvent::ProjectCompleted { team_id, .. }
            | TeamEvent::TeamDisbanded { team_id } => *team_id,
        }
    }
}

/// Notification gateway trait for different delivery backends
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one event. Must not block on downstream retries.
    async fn notify(&self, event: TeamEvent) -> Result<(), NotifyError>;
}
