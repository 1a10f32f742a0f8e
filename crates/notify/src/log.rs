//! Structured-log notification delivery
//!
//! The default backend: every event is emitted as a structured `tracing`
//! event. Downstream push/email integrations consume the same `TeamEvent`
//! stream behind the `Notifier` trait.

use crate::{NotifyError, Notifier, TeamEvent};

/// Notifier that delivers events to the tracing pipeline
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl TracingNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, event: TeamEvent) -> Result<(), NotifyError> {
        tracing::info!(team_id = %event.team_id(), event = ?event, "notification");
        Ok(())
    }
}
