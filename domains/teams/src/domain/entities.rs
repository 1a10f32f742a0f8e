//! Core domain entities for the teams domain

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::state::{
    MembershipEvent, MembershipStateMachine, OfferEvent, OfferState, OfferStateMachine,
    StateError, TeamMemberStatus,
};
use crate::error::{Result, TeamsError};

// ============================================================================
// Position
// ============================================================================

/// Project roles a team recruits for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "position", rename_all = "UPPERCASE")]
pub enum Position {
    Designer,
    Backend,
    Frontend,
    Manager,
}

impl Position {
    /// Every position, in capacity-column order
    pub const ALL: [Position; 4] = [
        Position::Designer,
        Position::Backend,
        Position::Frontend,
        Position::Manager,
    ];
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Designer => write!(f, "designer"),
            Self::Backend => write!(f, "backend"),
            Self::Frontend => write!(f, "frontend"),
            Self::Manager => write!(f, "manager"),
        }
    }
}

/// Which side of the table proposed an offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "offered_by", rename_all = "UPPERCASE")]
pub enum OfferedBy {
    /// A user asked to join a team
    User,
    /// A team leader invited a user
    Leader,
}

impl std::fmt::Display for OfferedBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Leader => write!(f, "leader"),
        }
    }
}

// ============================================================================
// Capacities
// ============================================================================

/// Per-position headcount, used both for a team's configured maximums
/// and its current occupancy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacities {
    pub designer: u8,
    pub backend: u8,
    pub frontend: u8,
    pub manager: u8,
}

impl Capacities {
    pub fn new(designer: u8, backend: u8, frontend: u8, manager: u8) -> Self {
        Self {
            designer,
            backend,
            frontend,
            manager,
        }
    }

    pub fn get(&self, position: Position) -> u8 {
        match position {
            Position::Designer => self.designer,
            Position::Backend => self.backend,
            Position::Frontend => self.frontend,
            Position::Manager => self.manager,
        }
    }

    pub fn get_mut(&mut self, position: Position) -> &mut u8 {
        match position {
            Position::Designer => &mut self.designer,
            Position::Backend => &mut self.backend,
            Position::Frontend => &mut self.frontend,
            Position::Manager => &mut self.manager,
        }
    }
}

// ============================================================================
// Team
// ============================================================================

/// Editable team metadata, validated as a unit on create and update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamProfile {
    pub project_name: String,
    pub project_description: String,
    pub expectation: String,
    pub open_chat_url: String,
}

impl TeamProfile {
    pub fn validate(&self) -> Result<()> {
        Self::check_length(&self.project_name, "project_name", 20)?;
        Self::check_length(&self.project_description, "project_description", 500)?;
        Self::check_length(&self.expectation, "expectation", 200)?;
        Self::check_length(&self.open_chat_url, "open_chat_url", 100)?;
        Ok(())
    }

    fn check_length(value: &str, field: &str, max: usize) -> Result<()> {
        let len = value.chars().count();
        if len == 0 || len > max {
            return Err(TeamsError::Validation(format!(
                "{field} must be 1 to {max} characters"
            )));
        }
        Ok(())
    }
}

/// A project team with per-position capacity tracking
///
/// The `current` counters are the capacity invariant: for every position,
/// `current <= max`. Only admissions and departures move them; profile
/// updates may grow or shrink `max` but never touch `current`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: Uuid,
    pub project_name: String,
    pub project_description: String,
    pub expectation: String,
    pub open_chat_url: String,
    pub project_url: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub max: Capacities,
    pub current: Capacities,
    pub visited_cnt: i64,
    pub is_recruiting: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Team {
    /// Create a team with its leader already occupying one slot
    pub fn new(profile: TeamProfile, leader_position: Position, max: Capacities) -> Result<Self> {
        profile.validate()?;
        if max.get(leader_position) == 0 {
            return Err(TeamsError::TeamLeaderPositionUnavailable);
        }

        let mut current = Capacities::default();
        *current.get_mut(leader_position) = 1;

        let now = Utc::now();
        let mut team = Self {
            id: Uuid::new_v4(),
            project_name: profile.project_name,
            project_description: profile.project_description,
            expectation: profile.expectation,
            open_chat_url: profile.open_chat_url,
            project_url: None,
            completed_at: None,
            max,
            current,
            visited_cnt: 0,
            is_recruiting: true,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        if team.is_full() {
            team.is_recruiting = false;
        }
        Ok(team)
    }

    pub fn is_position_full(&self, position: Position) -> bool {
        self.current.get(position) >= self.max.get(position)
    }

    pub fn is_full(&self) -> bool {
        Position::ALL.iter().all(|&p| self.is_position_full(p))
    }

    /// Claim one slot for `position`. Closes recruiting once every
    /// position is staffed.
    pub fn reserve_slot(&mut self, position: Position) -> Result<()> {
        if self.is_position_full(position) {
            return Err(TeamsError::TeamPositionUnavailable);
        }
        *self.current.get_mut(position) += 1;
        if self.is_full() {
            self.is_recruiting = false;
        }
        self.touch();
        Ok(())
    }

    /// Return one slot for `position` after a departure. A slot opening
    /// up always reopens recruiting.
    pub fn release_slot(&mut self, position: Position) {
        let count = self.current.get_mut(position);
        if *count > 0 {
            *count -= 1;
        }
        self.is_recruiting = true;
        self.touch();
    }

    /// Apply a profile edit and new capacity maximums. Shrinking a
    /// position below its current occupancy is rejected, checked in
    /// column order so the first offending position is reported.
    pub fn update_profile(&mut self, profile: TeamProfile, max: Capacities) -> Result<()> {
        profile.validate()?;
        for position in Position::ALL {
            if self.current.get(position) > max.get(position) {
                return Err(TeamsError::CapacityUpdateUnavailable(position));
            }
        }

        self.project_name = profile.project_name;
        self.project_description = profile.project_description;
        self.expectation = profile.expectation;
        self.open_chat_url = profile.open_chat_url;
        self.max = max;
        self.touch();
        Ok(())
    }

    pub fn set_recruiting(&mut self, is_recruiting: bool) {
        self.is_recruiting = is_recruiting;
        self.touch();
    }

    pub fn visit(&mut self) {
        self.visited_cnt += 1;
    }

    /// Mark the project delivered
    pub fn complete(&mut self, project_url: String, completed_at: DateTime<Utc>) {
        self.project_url = Some(project_url);
        self.completed_at = Some(completed_at);
        self.is_recruiting = false;
        self.touch();
    }

    /// Disband without a delivered project
    pub fn disband(&mut self) {
        self.is_recruiting = false;
        self.is_deleted = true;
        self.touch();
    }

    /// Capacity invariant check
    pub fn validate(&self) -> Result<()> {
        for position in Position::ALL {
            if self.current.get(position) > self.max.get(position) {
                return Err(TeamsError::Validation(format!(
                    "{position} occupancy exceeds its maximum"
                )));
            }
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// ============================================================================
// TeamMember
// ============================================================================

/// A user's membership on a team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TeamMember {
    pub id: Uuid,
    pub user_id: Uuid,
    pub team_id: Uuid,
    pub position: Position,
    pub is_leader: bool,
    pub status: TeamMemberStatus,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TeamMember {
    /// The founding membership, created together with its team
    pub fn leader(user_id: Uuid, team_id: Uuid, position: Position) -> Self {
        Self::build(user_id, team_id, position, true, TeamMemberStatus::Leader)
    }

    /// A membership created by an accepted offer
    pub fn admit(user_id: Uuid, team_id: Uuid, position: Position) -> Self {
        Self::build(user_id, team_id, position, false, TeamMemberStatus::Progress)
    }

    fn build(
        user_id: Uuid,
        team_id: Uuid,
        position: Position,
        is_leader: bool,
        status: TeamMemberStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            team_id,
            position,
            is_leader,
            status,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active() && !self.is_deleted
    }

    /// Voluntary departure. The leader guard surfaces as
    /// [`TeamsError::TeamLeaderUnavailable`].
    pub fn quit(&mut self) -> Result<()> {
        self.status = self.apply(MembershipEvent::Quit)?;
        self.is_deleted = true;
        self.touch();
        Ok(())
    }

    /// Removal by the leader. Keeps the status as-is so the record shows
    /// how far the member got.
    pub fn fire(&mut self) -> Result<()> {
        if self.is_leader {
            return Err(TeamsError::TeamLeaderUnavailable);
        }
        self.is_deleted = true;
        self.touch();
        Ok(())
    }

    /// Team delivered; the membership stays visible as history
    pub fn complete(&mut self) -> Result<()> {
        self.status = self.apply(MembershipEvent::Complete)?;
        self.touch();
        Ok(())
    }

    /// Team disbanded before delivering
    pub fn disband(&mut self) -> Result<()> {
        self.status = self.apply(MembershipEvent::Disband)?;
        self.is_deleted = true;
        self.touch();
        Ok(())
    }

    fn apply(&self, event: MembershipEvent) -> Result<TeamMemberStatus> {
        MembershipStateMachine::transition(self.status, event).map_err(|err| match err {
            StateError::GuardFailed(_) => TeamsError::TeamLeaderUnavailable,
            other => TeamsError::Validation(other.to_string()),
        })
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// ============================================================================
// Offer
// ============================================================================

/// A join offer between a user and a team
///
/// The decision is stored as `(is_accepted, is_deleted)`: a pending offer
/// has neither flag set, a decided or cancelled offer always has
/// `is_deleted = true` and keeps its row for listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Offer {
    pub id: Uuid,
    pub user_id: Uuid,
    pub team_id: Uuid,
    pub position: Position,
    pub offered_by: OfferedBy,
    pub is_accepted: Option<bool>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Offer {
    pub fn new(user_id: Uuid, team_id: Uuid, position: Position, offered_by: OfferedBy) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            team_id,
            position,
            offered_by,
            is_accepted: None,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Derived lifecycle state
    pub fn state(&self) -> OfferState {
        match (self.is_accepted, self.is_deleted) {
            (Some(true), _) => OfferState::Accepted,
            (Some(false), _) => OfferState::Declined,
            (None, true) => OfferState::Cancelled,
            (None, false) => OfferState::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state() == OfferState::Pending
    }

    pub fn accept(&mut self) -> Result<()> {
        self.apply(OfferEvent::Accept)?;
        self.is_accepted = Some(true);
        self.is_deleted = true;
        self.touch();
        Ok(())
    }

    pub fn decline(&mut self) -> Result<()> {
        self.apply(OfferEvent::Decline)?;
        self.is_accepted = Some(false);
        self.is_deleted = true;
        self.touch();
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<()> {
        self.apply(OfferEvent::Cancel)?;
        self.is_deleted = true;
        self.touch();
        Ok(())
    }

    // Settled offers read as absent to any further decision.
    fn apply(&self, event: OfferEvent) -> Result<OfferState> {
        OfferStateMachine::transition(self.state(), event).map_err(|_| TeamsError::OfferNotFound)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// ============================================================================
// User
// ============================================================================

/// Minimal user identity; profile concerns live outside this domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: String) -> Result<Self> {
        let len = username.chars().count();
        if len == 0 || len > 30 {
            return Err(TeamsError::Validation(
                "username must be 1 to 30 characters".to_string(),
            ));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            username,
            created_at: now,
            updated_at: now,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> TeamProfile {
        TeamProfile {
            project_name: "crewup".to_string(),
            project_description: "A team formation service".to_string(),
            expectation: "Ship something real".to_string(),
            open_chat_url: "https://chat.example.com/crewup".to_string(),
        }
    }

    fn team() -> Team {
        Team::new(profile(), Position::Backend, Capacities::new(1, 2, 1, 1)).unwrap()
    }

    mod team_entity {
        use super::*;

        #[test]
        fn test_new_team_seats_the_leader() {
            let team = team();
            assert_eq!(team.current.backend, 1);
            assert_eq!(team.current.designer, 0);
            assert!(team.is_recruiting);
            assert!(!team.is_deleted);
            assert!(team.validate().is_ok());
        }

        #[test]
        fn test_new_team_rejects_leader_position_without_capacity() {
            let result = Team::new(profile(), Position::Designer, Capacities::new(0, 2, 1, 1));
            assert_eq!(result.unwrap_err(), TeamsError::TeamLeaderPositionUnavailable);
        }

        #[test]
        fn test_new_team_rejects_invalid_profile() {
            let mut bad = profile();
            bad.project_name = String::new();
            let result = Team::new(bad, Position::Backend, Capacities::new(1, 2, 1, 1));
            assert!(matches!(result, Err(TeamsError::Validation(_))));
        }

        #[test]
        fn test_solo_team_starts_closed() {
            let team = Team::new(profile(), Position::Manager, Capacities::new(0, 0, 0, 1)).unwrap();
            assert!(team.is_full());
            assert!(!team.is_recruiting);
        }

        #[test]
        fn test_reserve_slot_rejects_full_position() {
            let mut team = team();
            assert!(team.reserve_slot(Position::Designer).is_ok());
            assert_eq!(
                team.reserve_slot(Position::Designer).unwrap_err(),
                TeamsError::TeamPositionUnavailable
            );
            assert_eq!(team.current.designer, 1);
        }

        #[test]
        fn test_filling_last_slot_closes_recruiting() {
            let mut team = team();
            team.reserve_slot(Position::Designer).unwrap();
            team.reserve_slot(Position::Backend).unwrap();
            team.reserve_slot(Position::Frontend).unwrap();
            assert!(team.is_recruiting);
            team.reserve_slot(Position::Manager).unwrap();
            assert!(team.is_full());
            assert!(!team.is_recruiting);
        }

        #[test]
        fn test_release_slot_reopens_recruiting() {
            let mut team = Team::new(profile(), Position::Manager, Capacities::new(0, 1, 0, 1)).unwrap();
            team.reserve_slot(Position::Backend).unwrap();
            assert!(!team.is_recruiting);

            team.release_slot(Position::Backend);
            assert_eq!(team.current.backend, 0);
            assert!(team.is_recruiting);
        }

        #[test]
        fn test_release_slot_never_underflows() {
            let mut team = team();
            team.release_slot(Position::Designer);
            assert_eq!(team.current.designer, 0);
        }

        #[test]
        fn test_update_profile_rejects_shrinking_below_occupancy() {
            let mut team = team();
            team.reserve_slot(Position::Designer).unwrap();

            let result = team.update_profile(profile(), Capacities::new(0, 2, 1, 1));
            assert_eq!(
                result.unwrap_err(),
                TeamsError::CapacityUpdateUnavailable(Position::Designer)
            );
            // Nothing applied
            assert_eq!(team.max.designer, 1);
        }

        #[test]
        fn test_update_profile_applies_metadata_and_max() {
            let mut team = team();
            let mut edited = profile();
            edited.project_name = "crewup-v2".to_string();

            team.update_profile(edited, Capacities::new(2, 2, 1, 1)).unwrap();
            assert_eq!(team.project_name, "crewup-v2");
            assert_eq!(team.max.designer, 2);
            assert_eq!(team.current.backend, 1);
        }

        #[test]
        fn test_complete_and_disband() {
            let mut delivered = team();
            let when = Utc::now();
            delivered.complete("https://github.com/example/crewup".to_string(), when);
            assert_eq!(delivered.completed_at, Some(when));
            assert!(!delivered.is_recruiting);
            assert!(!delivered.is_deleted);

            let mut dropped = team();
            dropped.disband();
            assert!(dropped.is_deleted);
            assert!(!dropped.is_recruiting);
        }
    }

    mod team_member_entity {
        use super::*;

        #[test]
        fn test_leader_cannot_quit() {
            let mut leader = TeamMember::leader(Uuid::new_v4(), Uuid::new_v4(), Position::Backend);
            assert_eq!(leader.quit().unwrap_err(), TeamsError::TeamLeaderUnavailable);
            assert!(leader.is_active());
        }

        #[test]
        fn test_leader_cannot_be_fired() {
            let mut leader = TeamMember::leader(Uuid::new_v4(), Uuid::new_v4(), Position::Backend);
            assert_eq!(leader.fire().unwrap_err(), TeamsError::TeamLeaderUnavailable);
        }

        #[test]
        fn test_member_quit() {
            let mut member = TeamMember::admit(Uuid::new_v4(), Uuid::new_v4(), Position::Designer);
            member.quit().unwrap();
            assert_eq!(member.status, TeamMemberStatus::Quit);
            assert!(member.is_deleted);
            assert!(!member.is_active());
        }

        #[test]
        fn test_fired_member_keeps_status() {
            let mut member = TeamMember::admit(Uuid::new_v4(), Uuid::new_v4(), Position::Designer);
            member.fire().unwrap();
            assert_eq!(member.status, TeamMemberStatus::Progress);
            assert!(member.is_deleted);
            assert!(!member.is_active());
        }

        #[test]
        fn test_complete_keeps_membership_visible() {
            let mut member = TeamMember::admit(Uuid::new_v4(), Uuid::new_v4(), Position::Designer);
            member.complete().unwrap();
            assert_eq!(member.status, TeamMemberStatus::Complete);
            assert!(!member.is_deleted);
            assert!(!member.is_active());
        }

        #[test]
        fn test_disband_soft_deletes() {
            let mut leader = TeamMember::leader(Uuid::new_v4(), Uuid::new_v4(), Position::Backend);
            leader.disband().unwrap();
            assert_eq!(leader.status, TeamMemberStatus::Incomplete);
            assert!(leader.is_deleted);
        }

        #[test]
        fn test_terminal_member_cannot_quit_again() {
            let mut member = TeamMember::admit(Uuid::new_v4(), Uuid::new_v4(), Position::Designer);
            member.quit().unwrap();
            assert!(matches!(member.quit(), Err(TeamsError::Validation(_))));
        }
    }

    mod offer_entity {
        use super::*;

        fn offer() -> Offer {
            Offer::new(Uuid::new_v4(), Uuid::new_v4(), Position::Frontend, OfferedBy::User)
        }

        #[test]
        fn test_new_offer_is_pending() {
            let offer = offer();
            assert_eq!(offer.state(), OfferState::Pending);
            assert!(offer.is_pending());
        }

        #[test]
        fn test_accept_sets_both_flags() {
            let mut offer = offer();
            offer.accept().unwrap();
            assert_eq!(offer.is_accepted, Some(true));
            assert!(offer.is_deleted);
            assert_eq!(offer.state(), OfferState::Accepted);
        }

        #[test]
        fn test_decline_sets_both_flags() {
            let mut offer = offer();
            offer.decline().unwrap();
            assert_eq!(offer.is_accepted, Some(false));
            assert!(offer.is_deleted);
            assert_eq!(offer.state(), OfferState::Declined);
        }

        #[test]
        fn test_cancel_leaves_decision_unset() {
            let mut offer = offer();
            offer.cancel().unwrap();
            assert_eq!(offer.is_accepted, None);
            assert!(offer.is_deleted);
            assert_eq!(offer.state(), OfferState::Cancelled);
        }

        #[test]
        fn test_settled_offer_reads_as_not_found() {
            let mut offer = offer();
            offer.decline().unwrap();
            assert_eq!(offer.accept().unwrap_err(), TeamsError::OfferNotFound);
            assert_eq!(offer.cancel().unwrap_err(), TeamsError::OfferNotFound);
        }
    }

    mod user_entity {
        use super::*;

        #[test]
        fn test_valid_username() {
            let user = User::new("nari".to_string()).unwrap();
            assert_eq!(user.username, "nari");
        }

        #[test]
        fn test_rejects_empty_and_oversized_usernames() {
            assert!(User::new(String::new()).is_err());
            assert!(User::new("x".repeat(31)).is_err());
            assert!(User::new("x".repeat(30)).is_ok());
        }
    }
}
