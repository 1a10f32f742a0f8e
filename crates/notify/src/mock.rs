//! Mock notification delivery for tests
//!
//! Records every delivered event so tests can assert on the stream, and can
//! be switched into a failing mode to verify that delivery failures never
//! affect core operations.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use crate::{NotifyError, Notifier, TeamEvent};

/// Notifier that records events in memory
#[derive(Debug, Clone, Default)]
pub struct MockNotifier {
    events: Arc<Mutex<Vec<TeamEvent>>>,
    fail: Arc<AtomicBool>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events delivered so far, in order
    pub fn events(&self) -> Vec<TeamEvent> {
        self.events.lock().expect("mock notifier poisoned").clone()
    }

    /// Number of events delivered so far
    pub fn len(&self) -> usize {
        self.events.lock().expect("mock notifier poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every subsequent delivery fail
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, event: TeamEvent) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Delivery("mock delivery failure".to_string()));
        }
        self.events
            .lock()
            .expect("mock notifier poisoned")
            .push(event);
        Ok(())
    }
}
