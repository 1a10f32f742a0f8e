//! Team lifecycle handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crewup_common::{Page, Pagination, ValidatedJson};

use crate::api::{AuthUser, TeamsState};
use crate::domain::entities::{Capacities, Position, Team, TeamMember, TeamProfile};
use crate::domain::state::TeamMemberStatus;
use crate::error::Result;
use crate::service::{CreateTeamCommand, UpdateTeamCommand};

// ============================================================================
// Request/response types
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTeamRequest {
    #[validate(length(min = 1, max = 20))]
    pub project_name: String,
    #[validate(length(min = 1, max = 500))]
    pub project_description: String,
    #[validate(length(min = 1, max = 200))]
    pub expectation: String,
    #[validate(length(min = 1, max = 100))]
    pub open_chat_url: String,
    pub leader_position: Position,
    pub designer_max_cnt: u8,
    pub backend_max_cnt: u8,
    pub frontend_max_cnt: u8,
    pub manager_max_cnt: u8,
}

impl CreateTeamRequest {
    fn into_command(self) -> CreateTeamCommand {
        CreateTeamCommand {
            profile: TeamProfile {
                project_name: self.project_name,
                project_description: self.project_description,
                expectation: self.expectation,
                open_chat_url: self.open_chat_url,
            },
            leader_position: self.leader_position,
            max: Capacities::new(
                self.designer_max_cnt,
                self.backend_max_cnt,
                self.frontend_max_cnt,
                self.manager_max_cnt,
            ),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTeamRequest {
    #[validate(length(min = 1, max = 20))]
    pub project_name: String,
    #[validate(length(min = 1, max = 500))]
    pub project_description: String,
    #[validate(length(min = 1, max = 200))]
    pub expectation: String,
    #[validate(length(min = 1, max = 100))]
    pub open_chat_url: String,
    pub designer_max_cnt: u8,
    pub backend_max_cnt: u8,
    pub frontend_max_cnt: u8,
    pub manager_max_cnt: u8,
}

impl UpdateTeamRequest {
    fn into_command(self) -> UpdateTeamCommand {
        UpdateTeamCommand {
            profile: TeamProfile {
                project_name: self.project_name,
                project_description: self.project_description,
                expectation: self.expectation,
                open_chat_url: self.open_chat_url,
            },
            max: Capacities::new(
                self.designer_max_cnt,
                self.backend_max_cnt,
                self.frontend_max_cnt,
                self.manager_max_cnt,
            ),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecruitingRequest {
    pub is_recruiting: bool,
}

#[derive(Debug, Deserialize)]
pub struct EndProjectRequest {
    /// Empty means the team disbanded without delivering
    #[serde(default)]
    pub project_url: String,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ListTeamsQuery {
    pub position: Option<Position>,
}

#[derive(Debug, Serialize)]
pub struct TeamResponse {
    pub id: Uuid,
    pub project_name: String,
    pub project_description: String,
    pub expectation: String,
    pub open_chat_url: String,
    pub project_url: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub designer_max_cnt: u8,
    pub backend_max_cnt: u8,
    pub frontend_max_cnt: u8,
    pub manager_max_cnt: u8,
    pub designer_current_cnt: u8,
    pub backend_current_cnt: u8,
    pub frontend_current_cnt: u8,
    pub manager_current_cnt: u8,
    pub visited_cnt: i64,
    pub is_recruiting: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Team> for TeamResponse {
    fn from(team: Team) -> Self {
        Self {
            id: team.id,
            project_name: team.project_name,
            project_description: team.project_description,
            expectation: team.expectation,
            open_chat_url: team.open_chat_url,
            project_url: team.project_url,
            completed_at: team.completed_at,
            designer_max_cnt: team.max.designer,
            backend_max_cnt: team.max.backend,
            frontend_max_cnt: team.max.frontend,
            manager_max_cnt: team.max.manager,
            designer_current_cnt: team.current.designer,
            backend_current_cnt: team.current.backend,
            frontend_current_cnt: team.current.frontend,
            manager_current_cnt: team.current.manager,
            visited_cnt: team.visited_cnt,
            is_recruiting: team.is_recruiting,
            created_at: team.created_at,
            updated_at: team.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub user_id: Uuid,
    pub position: Position,
    pub is_leader: bool,
    pub status: TeamMemberStatus,
    pub joined_at: DateTime<Utc>,
}

impl From<TeamMember> for MemberResponse {
    fn from(member: TeamMember) -> Self {
        Self {
            user_id: member.user_id,
            position: member.position,
            is_leader: member.is_leader,
            status: member.status,
            joined_at: member.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TeamDetailResponse {
    #[serde(flatten)]
    pub team: TeamResponse,
    pub members: Vec<MemberResponse>,
}

impl TeamDetailResponse {
    fn new(team: Team, members: Vec<TeamMember>) -> Self {
        Self {
            team: team.into(),
            members: members.into_iter().map(MemberResponse::from).collect(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/teams
pub async fn create_team(
    State(state): State<TeamsState>,
    AuthUser(user_id): AuthUser,
    ValidatedJson(request): ValidatedJson<CreateTeamRequest>,
) -> Result<(StatusCode, Json<TeamDetailResponse>)> {
    let (team, leader) = state.teams.create_team(user_id, request.into_command()).await?;
    Ok((
        StatusCode::CREATED,
        Json(TeamDetailResponse::new(team, vec![leader])),
    ))
}

/// GET /v1/teams
pub async fn list_teams(
    State(state): State<TeamsState>,
    Query(query): Query<ListTeamsQuery>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<TeamResponse>>> {
    let teams = state
        .teams
        .list_teams(query.position, pagination.request())
        .await?;
    Ok(Json(teams.map(TeamResponse::from)))
}

/// GET /v1/teams/{team_id}
pub async fn get_team(
    State(state): State<TeamsState>,
    AuthUser(user_id): AuthUser,
    Path(team_id): Path<Uuid>,
) -> Result<Json<TeamDetailResponse>> {
    let (team, members) = state.teams.find_team(user_id, team_id).await?;
    Ok(Json(TeamDetailResponse::new(team, members)))
}

/// GET /v1/teams/current
pub async fn current_team(
    State(state): State<TeamsState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<TeamDetailResponse>> {
    let (team, members) = state.teams.current_team(user_id).await?;
    Ok(Json(TeamDetailResponse::new(team, members)))
}

/// PATCH /v1/teams/current
pub async fn update_team(
    State(state): State<TeamsState>,
    AuthUser(user_id): AuthUser,
    ValidatedJson(request): ValidatedJson<UpdateTeamRequest>,
) -> Result<Json<TeamResponse>> {
    let team = state.teams.update_team(user_id, request.into_command()).await?;
    Ok(Json(team.into()))
}

/// PATCH /v1/teams/current/recruiting
pub async fn set_recruiting(
    State(state): State<TeamsState>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<RecruitingRequest>,
) -> Result<Json<TeamResponse>> {
    let team = state.teams.set_recruiting(user_id, request.is_recruiting).await?;
    Ok(Json(team.into()))
}

/// POST /v1/teams/current/complete
pub async fn end_project(
    State(state): State<TeamsState>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<EndProjectRequest>,
) -> Result<Json<TeamResponse>> {
    let completed_at = request.completed_at.unwrap_or_else(Utc::now);
    let team = state
        .teams
        .end_project(user_id, &request.project_url, completed_at)
        .await?;
    Ok(Json(team.into()))
}

/// POST /v1/teams/current/leave
pub async fn leave_team(
    State(state): State<TeamsState>,
    AuthUser(user_id): AuthUser,
) -> Result<StatusCode> {
    state.teams.leave_team(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /v1/teams/current/members/{user_id}
pub async fn fire_member(
    State(state): State<TeamsState>,
    AuthUser(user_id): AuthUser,
    Path(target_user_id): Path<Uuid>,
) -> Result<StatusCode> {
    state.teams.fire_member(user_id, target_user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
