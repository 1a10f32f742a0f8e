//! Teams domain: users, teams, memberships, and join offers

pub mod api;
pub mod domain;
pub mod error;
pub mod repository;
pub mod service;

// Re-export domain types at the crate root for convenience
pub use domain::entities::*;
pub use domain::state::{
    MembershipEvent, MembershipStateMachine, OfferEvent, OfferState, OfferStateMachine,
    StateError, TeamMemberStatus,
};
pub use error::{Result, TeamsError};
// Re-export repository types
pub use repository::{Acceptance, CascadeScope, MemoryStore, PgStore, Store};
// Re-export service types
pub use service::{CreateTeamCommand, OfferService, TeamService, UpdateTeamCommand};
// Re-export API types
pub use api::{routes, AuthUser, TeamsState};
