//! Offer service: proposals in both directions, decisions, withdrawals,
//! and the acceptance cascade

use std::sync::Arc;

use uuid::Uuid;

use crewup_common::{Page, PageRequest, RepositoryError};
use crewup_notify::{Notifier, OfferSide, TeamEvent};

use crate::domain::entities::{Offer, OfferedBy, Position, Team, TeamMember};
use crate::error::{Result, TeamsError};
use crate::repository::{Acceptance, CascadeScope, Store};
use crate::service::dispatch;

#[derive(Clone)]
pub struct OfferService {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    cascade: CascadeScope,
}

impl OfferService {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>, cascade: CascadeScope) -> Self {
        Self {
            store,
            notifier,
            cascade,
        }
    }

    // ------------------------------------------------------------------
    // Proposals
    // ------------------------------------------------------------------

    /// A user asks to join a team for a position
    pub async fn offer_by_user(
        &self,
        user_id: Uuid,
        team_id: Uuid,
        position: Position,
    ) -> Result<Offer> {
        self.user(user_id).await?;
        let team = self.team(team_id).await?;
        if team.is_position_full(position) {
            return Err(TeamsError::TeamPositionUnavailable);
        }

        let offer = Offer::new(user_id, team.id, position, OfferedBy::User);
        self.store.insert_offer(&offer).await?;

        tracing::info!(offer_id = %offer.id, team_id = %team.id, "offer sent to team");
        self.announce(&offer).await;
        Ok(offer)
    }

    /// A team leader invites a user for a position. The target must not
    /// already be on a team in progress.
    pub async fn offer_by_team(
        &self,
        user_id: Uuid,
        target_user_id: Uuid,
        position: Position,
    ) -> Result<Offer> {
        let leader = self.current_leader(user_id).await?;
        let team = self.team(leader.team_id).await?;
        if team.is_position_full(position) {
            return Err(TeamsError::TeamPositionUnavailable);
        }

        self.user(target_user_id).await?;
        if self.store.find_current_member(target_user_id).await?.is_some() {
            return Err(TeamsError::ExistingCurrentTeam);
        }

        let offer = Offer::new(target_user_id, team.id, position, OfferedBy::Leader);
        self.store.insert_offer(&offer).await?;

        tracing::info!(offer_id = %offer.id, user_id = %target_user_id, "offer sent to user");
        self.announce(&offer).await;
        Ok(offer)
    }

    // ------------------------------------------------------------------
    // Decisions
    // ------------------------------------------------------------------

    /// A user decides a leader-sent invitation addressed to them
    pub async fn user_decide(
        &self,
        user_id: Uuid,
        offer_id: Uuid,
        accepted: bool,
    ) -> Result<Option<TeamMember>> {
        self.user(user_id).await?;
        let offer = self.pending_offer(offer_id).await?;
        if offer.offered_by != OfferedBy::Leader || offer.user_id != user_id {
            return Err(TeamsError::RequestForbidden);
        }
        self.decide(&offer, accepted).await
    }

    /// A leader decides a user-sent request addressed to their team
    pub async fn team_decide(
        &self,
        user_id: Uuid,
        offer_id: Uuid,
        accepted: bool,
    ) -> Result<Option<TeamMember>> {
        let leader = self.current_leader(user_id).await?;
        let offer = self.pending_offer(offer_id).await?;
        if offer.offered_by != OfferedBy::User || offer.team_id != leader.team_id {
            return Err(TeamsError::RequestForbidden);
        }
        self.decide(&offer, accepted).await
    }

    async fn decide(&self, offer: &Offer, accepted: bool) -> Result<Option<TeamMember>> {
        if !accepted {
            self.store
                .decline_offer(offer.id)
                .await
                .map_err(Self::gone)?;
            tracing::info!(offer_id = %offer.id, "offer declined");
            return Ok(None);
        }

        match self.store.accept_offer(offer.id, self.cascade).await {
            Ok(Acceptance::Admitted {
                member,
                team,
                cascaded,
            }) => {
                tracing::info!(
                    offer_id = %offer.id,
                    team_id = %team.id,
                    cascaded = cascaded.len(),
                    "offer accepted"
                );
                dispatch(
                    self.notifier.as_ref(),
                    TeamEvent::MemberJoined {
                        user_id: member.user_id,
                        team_id: member.team_id,
                    },
                )
                .await;
                Ok(Some(member))
            }
            Ok(Acceptance::PositionFull) => Err(TeamsError::TeamPositionUnavailable),
            Err(RepositoryError::NotFound) => Err(TeamsError::OfferNotFound),
            Err(RepositoryError::AlreadyExists) => Err(TeamsError::ExistingCurrentTeam),
            Err(other) => Err(other.into()),
        }
    }

    // ------------------------------------------------------------------
    // Withdrawals
    // ------------------------------------------------------------------

    /// A user withdraws a request they sent to a team
    pub async fn cancel_by_user(&self, user_id: Uuid, offer_id: Uuid) -> Result<()> {
        self.user(user_id).await?;
        let offer = self.pending_offer(offer_id).await?;
        if offer.offered_by != OfferedBy::User || offer.user_id != user_id {
            return Err(TeamsError::RequestForbidden);
        }
        self.store.cancel_offer(offer.id).await.map_err(Self::gone)?;
        tracing::info!(offer_id = %offer.id, "offer cancelled by user");
        Ok(())
    }

    /// A leader withdraws an invitation their team sent
    pub async fn cancel_by_team(&self, user_id: Uuid, offer_id: Uuid) -> Result<()> {
        let leader = self.current_leader(user_id).await?;
        let offer = self.pending_offer(offer_id).await?;
        if offer.offered_by != OfferedBy::Leader || offer.team_id != leader.team_id {
            return Err(TeamsError::RequestForbidden);
        }
        self.store.cancel_offer(offer.id).await.map_err(Self::gone)?;
        tracing::info!(offer_id = %offer.id, "offer cancelled by team");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Listings
    // ------------------------------------------------------------------

    /// Offers involving the caller, narrowed by proposing side
    pub async fn list_user_offers(
        &self,
        user_id: Uuid,
        offered_by: OfferedBy,
        page: PageRequest,
    ) -> Result<Page<Offer>> {
        self.user(user_id).await?;
        Ok(self.store.list_user_offers(user_id, offered_by, page).await?)
    }

    /// Offers involving the caller's team, leader only
    pub async fn list_team_offers(
        &self,
        user_id: Uuid,
        position: Option<Position>,
        offered_by: OfferedBy,
        page: PageRequest,
    ) -> Result<Page<Offer>> {
        let leader = self.current_leader(user_id).await?;
        Ok(self
            .store
            .list_team_offers(leader.team_id, position, offered_by, page)
            .await?)
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    async fn user(&self, user_id: Uuid) -> Result<()> {
        self.store
            .find_user(user_id)
            .await?
            .map(|_| ())
            .ok_or(TeamsError::UserNotFound)
    }

    async fn team(&self, team_id: Uuid) -> Result<Team> {
        self.store
            .find_team(team_id)
            .await?
            .filter(|t| !t.is_deleted)
            .ok_or(TeamsError::TeamNotFound)
    }

    async fn current_leader(&self, user_id: Uuid) -> Result<TeamMember> {
        self.user(user_id).await?;
        let member = self
            .store
            .find_current_member(user_id)
            .await?
            .ok_or(TeamsError::CurrentTeamNotFound)?;
        if !member.is_leader {
            return Err(TeamsError::RequestForbidden);
        }
        Ok(member)
    }

    /// Settled or missing offers read the same to callers
    async fn pending_offer(&self, offer_id: Uuid) -> Result<Offer> {
        self.store
            .find_offer(offer_id)
            .await?
            .filter(Offer::is_pending)
            .ok_or(TeamsError::OfferNotFound)
    }

    fn gone(err: RepositoryError) -> TeamsError {
        match err {
            RepositoryError::NotFound => TeamsError::OfferNotFound,
            other => other.into(),
        }
    }

    async fn announce(&self, offer: &Offer) {
        let offered_by = match offer.offered_by {
            OfferedBy::User => OfferSide::User,
            OfferedBy::Leader => OfferSide::Leader,
        };
        dispatch(
            self.notifier.as_ref(),
            TeamEvent::OfferReceived {
                offer_id: offer.id,
                user_id: offer.user_id,
                team_id: offer.team_id,
                offered_by,
            },
        )
        .await;
    }
}
