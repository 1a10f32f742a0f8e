//! Storage boundary for the teams domain
//!
//! Services talk to a single [`Store`] trait. The multi-row operations
//! (team creation, offer acceptance, departures, project end) are part of
//! the trait so each backend can make them atomic its own way: the
//! Postgres backend uses transactions with conditional updates, the
//! in-memory backend serializes everything behind one lock.

use async_trait::async_trait;
use uuid::Uuid;

use crewup_common::{Page, PageRequest, RepositoryError};

use crate::domain::entities::{Offer, OfferedBy, Position, Team, TeamMember, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = std::result::Result<T, RepositoryError>;

/// How far an accepted offer's cancellation cascade reaches over the
/// joining user's other pending offers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CascadeScope {
    /// Void every other pending offer for the user
    #[default]
    AllPositions,
    /// Void only pending offers for the same position
    SamePosition,
}

impl CascadeScope {
    pub fn from_config(value: &str) -> Self {
        match value {
            "same-position" => CascadeScope::SamePosition,
            _ => CascadeScope::AllPositions,
        }
    }
}

/// Outcome of an acceptance attempt
#[derive(Debug, Clone)]
pub enum Acceptance {
    /// The slot was claimed; the membership exists and the cascade ran
    Admitted {
        member: TeamMember,
        team: Team,
        /// Ids of the user's other pending offers voided by the cascade
        cascaded: Vec<Uuid>,
    },
    /// The position filled up first; nothing was changed
    PositionFull,
}

#[async_trait]
pub trait Store: Send + Sync {
    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<User>>;

    // ------------------------------------------------------------------
    // Teams
    // ------------------------------------------------------------------

    /// Persist a new team together with its leader membership. Fails
    /// with [`RepositoryError::AlreadyExists`] if the leader already has
    /// an active membership.
    async fn insert_team(&self, team: &Team, leader: &TeamMember) -> StoreResult<()>;

    async fn find_team(&self, team_id: Uuid) -> StoreResult<Option<Team>>;

    /// Write team metadata, capacity maximums, and the recruiting flag.
    /// Never writes the current occupancy counters.
    async fn update_team(&self, team: &Team) -> StoreResult<()>;

    async fn record_visit(&self, team_id: Uuid) -> StoreResult<()>;

    /// Recruiting teams, newest first, optionally narrowed to teams with
    /// an open slot for `position`
    async fn list_recruiting_teams(
        &self,
        position: Option<Position>,
        page: PageRequest,
    ) -> StoreResult<Page<Team>>;

    // ------------------------------------------------------------------
    // Members
    // ------------------------------------------------------------------

    /// The user's active membership, if any
    async fn find_current_member(&self, user_id: Uuid) -> StoreResult<Option<TeamMember>>;

    async fn find_current_member_of_team(
        &self,
        user_id: Uuid,
        team_id: Uuid,
    ) -> StoreResult<Option<TeamMember>>;

    async fn list_active_members(&self, team_id: Uuid) -> StoreResult<Vec<TeamMember>>;

    // ------------------------------------------------------------------
    // Offers
    // ------------------------------------------------------------------

    async fn insert_offer(&self, offer: &Offer) -> StoreResult<()>;

    async fn find_offer(&self, offer_id: Uuid) -> StoreResult<Option<Offer>>;

    async fn list_user_offers(
        &self,
        user_id: Uuid,
        offered_by: OfferedBy,
        page: PageRequest,
    ) -> StoreResult<Page<Offer>>;

    async fn list_team_offers(
        &self,
        team_id: Uuid,
        position: Option<Position>,
        offered_by: OfferedBy,
        page: PageRequest,
    ) -> StoreResult<Page<Offer>>;

    /// Atomically: re-check the offer is pending, claim a slot, admit the
    /// member, archive the offer, and cascade over the user's other
    /// pending offers.
    ///
    /// Fails with [`RepositoryError::NotFound`] when the offer is no
    /// longer pending and [`RepositoryError::AlreadyExists`] when the
    /// user joined another team first. A full position is not an error;
    /// it reports as [`Acceptance::PositionFull`] with no changes made.
    async fn accept_offer(&self, offer_id: Uuid, cascade: CascadeScope) -> StoreResult<Acceptance>;

    /// Mark a pending offer declined. [`RepositoryError::NotFound`] when
    /// it is no longer pending.
    async fn decline_offer(&self, offer_id: Uuid) -> StoreResult<()>;

    /// Withdraw a pending offer. [`RepositoryError::NotFound`] when it
    /// is no longer pending.
    async fn cancel_offer(&self, offer_id: Uuid) -> StoreResult<()>;

    /// Persist a departed membership and release its slot. The slot
    /// release is relative so concurrent admissions are never lost.
    async fn commit_departure(&self, member: &TeamMember) -> StoreResult<()>;

    /// Persist a resolved team and its members, and void the team's
    /// remaining pending offers.
    async fn commit_project_end(&self, team: &Team, members: &[TeamMember]) -> StoreResult<()>;
}
