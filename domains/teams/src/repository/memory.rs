//! In-memory store backend
//!
//! Keeps the whole state behind one mutex so every multi-row operation
//! is linearized, which is exactly the atomicity the trait asks for.
//! Used by the service test suites; production wiring uses [`PgStore`].
//!
//! [`PgStore`]: super::PgStore

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crewup_common::{Page, PageRequest, RepositoryError};

use crate::domain::entities::{Offer, OfferedBy, Position, Team, TeamMember, User};
use crate::repository::{Acceptance, CascadeScope, Store, StoreResult};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    teams: HashMap<Uuid, Team>,
    members: HashMap<Uuid, TeamMember>,
    offers: HashMap<Uuid, Offer>,
    /// user id -> membership id of their one active membership
    active_member_by_user: HashMap<Uuid, Uuid>,
    /// user id -> ids of their pending offers, for the cascade
    pending_offers_by_user: HashMap<Uuid, BTreeSet<Uuid>>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Newest first with the row id as tiebreaker, sliced after the cursor row
fn keyset<T, K>(mut rows: Vec<T>, page: &PageRequest, key_of: K) -> Page<T>
where
    K: Fn(&T) -> (DateTime<Utc>, Uuid),
{
    rows.sort_by(|a, b| key_of(b).cmp(&key_of(a)));
    let total = rows.len() as i64;

    let start = match page.after {
        Some(after) => rows
            .iter()
            .position(|row| key_of(row).1 == after)
            .map(|idx| idx + 1)
            .unwrap_or(0),
        None => 0,
    };
    let data = rows.into_iter().skip(start).take(page.size as usize).collect();
    Page { data, total }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut s = self.lock();
        if s.users.contains_key(&user.id) {
            return Err(RepositoryError::AlreadyExists);
        }
        s.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.lock().users.get(&user_id).cloned())
    }

    async fn insert_team(&self, team: &Team, leader: &TeamMember) -> StoreResult<()> {
        let mut s = self.lock();
        if s.active_member_by_user.contains_key(&leader.user_id) {
            return Err(RepositoryError::AlreadyExists);
        }
        s.teams.insert(team.id, team.clone());
        s.members.insert(leader.id, leader.clone());
        s.active_member_by_user.insert(leader.user_id, leader.id);
        Ok(())
    }

    async fn find_team(&self, team_id: Uuid) -> StoreResult<Option<Team>> {
        Ok(self.lock().teams.get(&team_id).cloned())
    }

    async fn update_team(&self, team: &Team) -> StoreResult<()> {
        let mut s = self.lock();
        let entry = s.teams.get_mut(&team.id).ok_or(RepositoryError::NotFound)?;
        // Occupancy and visits may have moved since the caller loaded
        // the team; those columns belong to other operations. A max
        // below the live occupancy would break the capacity invariant,
        // so the shrink is re-checked against the stored counters.
        for position in Position::ALL {
            if team.max.get(position) < entry.current.get(position) {
                return Err(RepositoryError::InvalidData(format!(
                    "{position} capacity below occupancy"
                )));
            }
        }
        let current = entry.current;
        let visited_cnt = entry.visited_cnt;
        *entry = team.clone();
        entry.current = current;
        entry.visited_cnt = visited_cnt;
        Ok(())
    }

    async fn record_visit(&self, team_id: Uuid) -> StoreResult<()> {
        let mut s = self.lock();
        let team = s.teams.get_mut(&team_id).ok_or(RepositoryError::NotFound)?;
        team.visit();
        Ok(())
    }

    async fn list_recruiting_teams(
        &self,
        position: Option<Position>,
        page: PageRequest,
    ) -> StoreResult<Page<Team>> {
        let s = self.lock();
        let rows: Vec<Team> = s
            .teams
            .values()
            .filter(|t| !t.is_deleted && t.is_recruiting)
            .filter(|t| position.map_or(true, |p| !t.is_position_full(p)))
            .cloned()
            .collect();
        Ok(keyset(rows, &page, |t| (t.created_at, t.id)))
    }

    async fn find_current_member(&self, user_id: Uuid) -> StoreResult<Option<TeamMember>> {
        let s = self.lock();
        Ok(s.active_member_by_user
            .get(&user_id)
            .and_then(|id| s.members.get(id))
            .cloned())
    }

    async fn find_current_member_of_team(
        &self,
        user_id: Uuid,
        team_id: Uuid,
    ) -> StoreResult<Option<TeamMember>> {
        Ok(self
            .find_current_member(user_id)
            .await?
            .filter(|m| m.team_id == team_id))
    }

    async fn list_active_members(&self, team_id: Uuid) -> StoreResult<Vec<TeamMember>> {
        let s = self.lock();
        let mut members: Vec<TeamMember> = s
            .members
            .values()
            .filter(|m| m.team_id == team_id && m.is_active())
            .cloned()
            .collect();
        members.sort_by_key(|m| (m.created_at, m.id));
        Ok(members)
    }

    async fn insert_offer(&self, offer: &Offer) -> StoreResult<()> {
        let mut s = self.lock();
        if s.offers.contains_key(&offer.id) {
            return Err(RepositoryError::AlreadyExists);
        }
        s.offers.insert(offer.id, offer.clone());
        if offer.is_pending() {
            s.pending_offers_by_user
                .entry(offer.user_id)
                .or_default()
                .insert(offer.id);
        }
        Ok(())
    }

    async fn find_offer(&self, offer_id: Uuid) -> StoreResult<Option<Offer>> {
        Ok(self.lock().offers.get(&offer_id).cloned())
    }

    async fn list_user_offers(
        &self,
        user_id: Uuid,
        offered_by: OfferedBy,
        page: PageRequest,
    ) -> StoreResult<Page<Offer>> {
        let s = self.lock();
        let rows: Vec<Offer> = s
            .offers
            .values()
            .filter(|o| o.user_id == user_id && o.offered_by == offered_by)
            .cloned()
            .collect();
        Ok(keyset(rows, &page, |o| (o.created_at, o.id)))
    }

    async fn list_team_offers(
        &self,
        team_id: Uuid,
        position: Option<Position>,
        offered_by: OfferedBy,
        page: PageRequest,
    ) -> StoreResult<Page<Offer>> {
        let s = self.lock();
        let rows: Vec<Offer> = s
            .offers
            .values()
            .filter(|o| o.team_id == team_id && o.offered_by == offered_by)
            .filter(|o| position.map_or(true, |p| o.position == p))
            .cloned()
            .collect();
        Ok(keyset(rows, &page, |o| (o.created_at, o.id)))
    }

    async fn accept_offer(&self, offer_id: Uuid, cascade: CascadeScope) -> StoreResult<Acceptance> {
        let mut s = self.lock();

        let offer = match s.offers.get(&offer_id) {
            Some(o) if o.is_pending() => o.clone(),
            _ => return Err(RepositoryError::NotFound),
        };
        if s.active_member_by_user.contains_key(&offer.user_id) {
            return Err(RepositoryError::AlreadyExists);
        }
        let mut team = match s.teams.get(&offer.team_id) {
            Some(t) if !t.is_deleted => t.clone(),
            _ => return Err(RepositoryError::NotFound),
        };

        if team.reserve_slot(offer.position).is_err() {
            return Ok(Acceptance::PositionFull);
        }

        let member = TeamMember::admit(offer.user_id, offer.team_id, offer.position);
        let mut accepted = offer.clone();
        accepted.accept().map_err(|_| RepositoryError::NotFound)?;

        s.offers.insert(offer_id, accepted);
        s.teams.insert(team.id, team.clone());
        s.members.insert(member.id, member.clone());
        s.active_member_by_user.insert(member.user_id, member.id);

        // Cascade over the user's other pending offers
        let pending = s
            .pending_offers_by_user
            .remove(&offer.user_id)
            .unwrap_or_default();
        let mut cascaded = Vec::new();
        let mut kept = BTreeSet::new();
        for other_id in pending {
            if other_id == offer_id {
                continue;
            }
            let keep = match cascade {
                CascadeScope::AllPositions => false,
                CascadeScope::SamePosition => s
                    .offers
                    .get(&other_id)
                    .map(|o| o.position != offer.position)
                    .unwrap_or(false),
            };
            if keep {
                kept.insert(other_id);
                continue;
            }
            if let Some(other) = s.offers.get_mut(&other_id) {
                if other.cancel().is_ok() {
                    cascaded.push(other_id);
                }
            }
        }
        if !kept.is_empty() {
            s.pending_offers_by_user.insert(offer.user_id, kept);
        }

        Ok(Acceptance::Admitted {
            member,
            team,
            cascaded,
        })
    }

    async fn decline_offer(&self, offer_id: Uuid) -> StoreResult<()> {
        let mut s = self.lock();
        let offer = s.offers.get_mut(&offer_id).ok_or(RepositoryError::NotFound)?;
        offer.decline().map_err(|_| RepositoryError::NotFound)?;
        let user_id = offer.user_id;
        if let Some(set) = s.pending_offers_by_user.get_mut(&user_id) {
            set.remove(&offer_id);
        }
        Ok(())
    }

    async fn cancel_offer(&self, offer_id: Uuid) -> StoreResult<()> {
        let mut s = self.lock();
        let offer = s.offers.get_mut(&offer_id).ok_or(RepositoryError::NotFound)?;
        offer.cancel().map_err(|_| RepositoryError::NotFound)?;
        let user_id = offer.user_id;
        if let Some(set) = s.pending_offers_by_user.get_mut(&user_id) {
            set.remove(&offer_id);
        }
        Ok(())
    }

    async fn commit_departure(&self, member: &TeamMember) -> StoreResult<()> {
        let mut s = self.lock();
        if !s.members.contains_key(&member.id) {
            return Err(RepositoryError::NotFound);
        }
        s.members.insert(member.id, member.clone());
        if s.active_member_by_user.get(&member.user_id) == Some(&member.id) {
            s.active_member_by_user.remove(&member.user_id);
        }
        if let Some(team) = s.teams.get_mut(&member.team_id) {
            team.release_slot(member.position);
        }
        Ok(())
    }

    async fn commit_project_end(&self, team: &Team, members: &[TeamMember]) -> StoreResult<()> {
        let mut s = self.lock();
        if !s.teams.contains_key(&team.id) {
            return Err(RepositoryError::NotFound);
        }
        s.teams.insert(team.id, team.clone());
        for member in members {
            s.members.insert(member.id, member.clone());
            if s.active_member_by_user.get(&member.user_id) == Some(&member.id) {
                s.active_member_by_user.remove(&member.user_id);
            }
        }

        // Nothing left to decide once the team is resolved
        let stale: Vec<(Uuid, Uuid)> = s
            .offers
            .values()
            .filter(|o| o.team_id == team.id && o.is_pending())
            .map(|o| (o.id, o.user_id))
            .collect();
        for (offer_id, user_id) in stale {
            if let Some(offer) = s.offers.get_mut(&offer_id) {
                let _ = offer.cancel();
            }
            if let Some(set) = s.pending_offers_by_user.get_mut(&user_id) {
                set.remove(&offer_id);
            }
        }
        s.pending_offers_by_user.retain(|_, set| !set.is_empty());
        Ok(())
    }
}
