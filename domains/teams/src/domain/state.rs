//! State machines for teams domain entities
//!
//! Two machines live here:
//! - Membership lifecycle (leader/progress until the team resolves)
//! - Offer lifecycle (pending until one side decides or withdraws)
//!
//! Offer state is derived from stored flags, never persisted directly.

use serde::{Deserialize, Serialize};

pub use crewup_common::StateError;

// ============================================================================
// Membership State Machine
// ============================================================================

/// Team member lifecycle status. `Leader` and `Progress` are the two
/// active statuses; everything else is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "team_member_status", rename_all = "UPPERCASE")]
pub enum TeamMemberStatus {
    /// Founding member; the only status with administrative rights
    Leader,
    /// Admitted member of a team still in progress
    Progress,
    /// Left the team voluntarily
    Quit,
    /// Team disbanded before delivering
    Incomplete,
    /// Team delivered its project
    Complete,
}

impl TeamMemberStatus {
    /// Active statuses count against team capacity and block joining
    /// another team
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Leader | Self::Progress)
    }

    /// Check if this is a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Quit | Self::Incomplete | Self::Complete)
    }

    /// Get all valid next statuses from the current status
    pub fn valid_transitions(&self) -> &'static [TeamMemberStatus] {
        match self {
            Self::Leader => &[Self::Incomplete, Self::Complete],
            Self::Progress => &[Self::Quit, Self::Incomplete, Self::Complete],
            Self::Quit | Self::Incomplete | Self::Complete => &[],
        }
    }
}

impl std::fmt::Display for TeamMemberStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Leader => write!(f, "leader"),
            Self::Progress => write!(f, "progress"),
            Self::Quit => write!(f, "quit"),
            Self::Incomplete => write!(f, "incomplete"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// Events that trigger membership status transitions
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MembershipEvent {
    /// Member leaves the team voluntarily
    Quit,
    /// Team disbands without a delivered project
    Disband,
    /// Team delivers its project
    Complete,
}

impl std::fmt::Display for MembershipEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Quit => write!(f, "quit"),
            Self::Disband => write!(f, "disband"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// Membership state machine
pub struct MembershipStateMachine;

impl MembershipStateMachine {
    /// Attempt a status transition
    pub fn transition(
        current: TeamMemberStatus,
        event: MembershipEvent,
    ) -> Result<TeamMemberStatus, StateError> {
        if current.is_terminal() {
            return Err(StateError::TerminalState(current.to_string()));
        }

        let next = match (&current, &event) {
            // Guard: the leader cannot walk away from a team in progress
            (TeamMemberStatus::Leader, MembershipEvent::Quit) => {
                return Err(StateError::GuardFailed(
                    "The team leader cannot leave the team".to_string(),
                ));
            }
            (TeamMemberStatus::Progress, MembershipEvent::Quit) => TeamMemberStatus::Quit,
            (_, MembershipEvent::Disband) => TeamMemberStatus::Incomplete,
            (_, MembershipEvent::Complete) => TeamMemberStatus::Complete,
            _ => {
                return Err(StateError::InvalidTransition {
                    from: current.to_string(),
                    to: "unknown".to_string(),
                    event: event.to_string(),
                });
            }
        };

        Ok(next)
    }

    /// Check if a transition is valid without performing it
    pub fn can_transition(current: TeamMemberStatus, event: &MembershipEvent) -> bool {
        Self::transition(current, *event).is_ok()
    }
}

// ============================================================================
// Offer State Machine
// ============================================================================

/// Offer states. Derived from the stored (`is_accepted`, `is_deleted`)
/// pair, not stored directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OfferState {
    Pending,
    Accepted,
    Declined,
    Cancelled,
}

impl OfferState {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Declined | Self::Cancelled)
    }

    /// Get all valid next states from the current state
    pub fn valid_transitions(&self) -> &'static [OfferState] {
        match self {
            Self::Pending => &[Self::Accepted, Self::Declined, Self::Cancelled],
            Self::Accepted | Self::Declined | Self::Cancelled => &[],
        }
    }
}

impl std::fmt::Display for OfferState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Accepted => write!(f, "accepted"),
            Self::Declined => write!(f, "declined"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Events that trigger offer state transitions
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OfferEvent {
    /// The receiving side accepts the offer
    Accept,
    /// The receiving side declines the offer
    Decline,
    /// The proposing side withdraws the offer
    Cancel,
}

impl std::fmt::Display for OfferEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accept => write!(f, "accept"),
            Self::Decline => write!(f, "decline"),
            Self::Cancel => write!(f, "cancel"),
        }
    }
}

/// Offer state machine
pub struct OfferStateMachine;

impl OfferStateMachine {
    /// Attempt a state transition
    pub fn transition(current: OfferState, event: OfferEvent) -> Result<OfferState, StateError> {
        if current.is_terminal() {
            return Err(StateError::TerminalState(current.to_string()));
        }

        let next = match (&current, &event) {
            (OfferState::Pending, OfferEvent::Accept) => OfferState::Accepted,
            (OfferState::Pending, OfferEvent::Decline) => OfferState::Declined,
            (OfferState::Pending, OfferEvent::Cancel) => OfferState::Cancelled,
            _ => {
                return Err(StateError::InvalidTransition {
                    from: current.to_string(),
                    to: "unknown".to_string(),
                    event: event.to_string(),
                });
            }
        };

        Ok(next)
    }

    /// Check if a transition is valid without performing it
    pub fn can_transition(current: OfferState, event: &OfferEvent) -> bool {
        Self::transition(current, *event).is_ok()
    }
}

// ============================================================================
// Tests
// ============================================================================
