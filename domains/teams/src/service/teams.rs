//! Team lifecycle service: creation, profile edits, membership changes,
//! and project resolution

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crewup_common::{Page, PageRequest, RepositoryError};
use crewup_notify::{Notifier, TeamEvent};

use crate::domain::entities::{Capacities, Position, Team, TeamMember, TeamProfile, User};
use crate::error::{Result, TeamsError};
use crate::repository::Store;
use crate::service::dispatch;

#[derive(Debug, Clone)]
pub struct CreateTeamCommand {
    pub profile: TeamProfile,
    pub leader_position: Position,
    pub max: Capacities,
}

#[derive(Debug, Clone)]
pub struct UpdateTeamCommand {
    pub profile: TeamProfile,
    pub max: Capacities,
}

#[derive(Clone)]
pub struct TeamService {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
}

impl TeamService {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub async fn register_user(&self, username: String) -> Result<User> {
        let user = User::new(username)?;
        self.store.insert_user(&user).await?;
        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    // ------------------------------------------------------------------
    // Teams
    // ------------------------------------------------------------------

    /// Create a team with the caller as leader. A user with an active
    /// membership cannot found another team.
    pub async fn create_team(
        &self,
        user_id: Uuid,
        command: CreateTeamCommand,
    ) -> Result<(Team, TeamMember)> {
        let user = self.user(user_id).await?;
        if self.store.find_current_member(user.id).await?.is_some() {
            return Err(TeamsError::ExistingCurrentTeam);
        }

        let team = Team::new(command.profile, command.leader_position, command.max)?;
        let leader = TeamMember::leader(user.id, team.id, command.leader_position);
        self.store
            .insert_team(&team, &leader)
            .await
            .map_err(|err| match err {
                crewup_common::RepositoryError::AlreadyExists => TeamsError::ExistingCurrentTeam,
                other => other.into(),
            })?;

        tracing::info!(team_id = %team.id, leader_id = %user.id, "team created");
        Ok((team, leader))
    }

    /// Fetch a team with its active roster. A view by a non-member
    /// counts as a visit.
    pub async fn find_team(&self, viewer_id: Uuid, team_id: Uuid) -> Result<(Team, Vec<TeamMember>)> {
        self.user(viewer_id).await?;
        let mut team = self.team(team_id).await?;
        let members = self.store.list_active_members(team.id).await?;

        let is_member = self
            .store
            .find_current_member_of_team(viewer_id, team.id)
            .await?
            .is_some();
        if !is_member {
            self.store.record_visit(team.id).await?;
            team.visit();
        }
        Ok((team, members))
    }

    /// The caller's team in progress with its active roster
    pub async fn current_team(&self, user_id: Uuid) -> Result<(Team, Vec<TeamMember>)> {
        self.user(user_id).await?;
        let member = self.current_member(user_id).await?;
        let team = self.team(member.team_id).await?;
        let members = self.store.list_active_members(team.id).await?;
        Ok((team, members))
    }

    pub async fn list_teams(
        &self,
        position: Option<Position>,
        page: PageRequest,
    ) -> Result<Page<Team>> {
        Ok(self.store.list_recruiting_teams(position, page).await?)
    }

    /// Leader-only profile edit. Capacity maximums may not shrink below
    /// current occupancy; current counters are never written here.
    pub async fn update_team(&self, user_id: Uuid, command: UpdateTeamCommand) -> Result<Team> {
        let leader = self.current_leader(user_id).await?;
        let mut team = self.team(leader.team_id).await?;
        team.update_profile(command.profile, command.max)?;
        if let Err(err) = self.store.update_team(&team).await {
            return Err(match err {
                // An admission committed after the load can push the
                // occupancy past the requested max; the store rejects
                // the write and the conflict is reported per position.
                RepositoryError::InvalidData(msg) => {
                    let live = self.team(team.id).await?;
                    Position::ALL
                        .into_iter()
                        .find(|p| team.max.get(*p) < live.current.get(*p))
                        .map(TeamsError::CapacityUpdateUnavailable)
                        .unwrap_or(TeamsError::Validation(msg))
                }
                other => other.into(),
            });
        }
        Ok(team)
    }

    /// Leader-only manual recruiting toggle
    pub async fn set_recruiting(&self, user_id: Uuid, is_recruiting: bool) -> Result<Team> {
        let leader = self.current_leader(user_id).await?;
        let mut team = self.team(leader.team_id).await?;
        team.set_recruiting(is_recruiting);
        self.store.update_team(&team).await?;
        Ok(team)
    }

    /// Leader-only project resolution. An empty project URL means the
    /// team disbanded; anything else means it delivered.
    pub async fn end_project(
        &self,
        user_id: Uuid,
        project_url: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<Team> {
        let leader = self.current_leader(user_id).await?;
        let mut team = self.team(leader.team_id).await?;
        let mut members = self.store.list_active_members(team.id).await?;

        let event = if project_url.trim().is_empty() {
            team.disband();
            for member in &mut members {
                member.disband()?;
            }
            TeamEvent::TeamDisbanded { team_id: team.id }
        } else {
            let url = project_url.trim().to_string();
            team.complete(url.clone(), completed_at);
            for member in &mut members {
                member.complete()?;
            }
            TeamEvent::ProjectCompleted {
                team_id: team.id,
                project_url: url,
                completed_at,
            }
        };

        self.store.commit_project_end(&team, &members).await?;
        tracing::info!(team_id = %team.id, delivered = team.completed_at.is_some(), "project ended");
        dispatch(self.notifier.as_ref(), event).await;
        Ok(team)
    }

    /// Voluntary departure. The leader cannot leave; they end the
    /// project instead.
    pub async fn leave_team(&self, user_id: Uuid) -> Result<()> {
        self.user(user_id).await?;
        let mut member = self.current_member(user_id).await?;
        member.quit()?;
        self.store.commit_departure(&member).await?;

        tracing::info!(team_id = %member.team_id, user_id = %user_id, "member left");
        dispatch(
            self.notifier.as_ref(),
            TeamEvent::MemberLeft {
                user_id,
                team_id: member.team_id,
            },
        )
        .await;
        Ok(())
    }

    /// Leader-only removal of a member from the team in progress
    pub async fn fire_member(&self, user_id: Uuid, target_user_id: Uuid) -> Result<()> {
        let leader = self.current_leader(user_id).await?;
        let mut target = self
            .store
            .find_current_member_of_team(target_user_id, leader.team_id)
            .await?
            .ok_or(TeamsError::CurrentTeamNotFound)?;
        target.fire()?;
        self.store.commit_departure(&target).await?;

        tracing::info!(team_id = %leader.team_id, user_id = %target_user_id, "member fired");
        dispatch(
            self.notifier.as_ref(),
            TeamEvent::MemberFired {
                user_id: target_user_id,
                team_id: leader.team_id,
            },
        )
        .await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    pub(crate) async fn user(&self, user_id: Uuid) -> Result<User> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or(TeamsError::UserNotFound)
    }

    pub(crate) async fn team(&self, team_id: Uuid) -> Result<Team> {
        self.store
            .find_team(team_id)
            .await?
            .filter(|t| !t.is_deleted)
            .ok_or(TeamsError::TeamNotFound)
    }

    pub(crate) async fn current_member(&self, user_id: Uuid) -> Result<TeamMember> {
        self.store
            .find_current_member(user_id)
            .await?
            .ok_or(TeamsError::CurrentTeamNotFound)
    }

    /// The caller's active membership, which must be the leadership
    pub(crate) async fn current_leader(&self, user_id: Uuid) -> Result<TeamMember> {
        self.user(user_id).await?;
        let member = self.current_member(user_id).await?;
        if !member.is_leader {
            return Err(TeamsError::RequestForbidden);
        }
        Ok(member)
    }
}
