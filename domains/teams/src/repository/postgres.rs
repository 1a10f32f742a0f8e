//! Postgres store backend
//!
//! Multi-row operations run inside a transaction. Slot accounting never
//! round-trips a counter through the application: admission is a
//! conditional `current < max` increment checked via `rows_affected`,
//! and departure is a relative decrement, so concurrent admissions
//! against the same position serialize on the row instead of losing
//! updates. The one-active-membership rule is additionally backed by a
//! partial unique index (see migrations).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crewup_common::{Page, PageRequest, RepositoryError};

use crate::domain::entities::{Capacities, Offer, OfferedBy, Position, Team, TeamMember, User};
use crate::repository::{Acceptance, CascadeScope, Store, StoreResult};

const TEAM_COLUMNS: &str = "id, project_name, project_description, expectation, open_chat_url, \
     project_url, completed_at, \
     designer_max_cnt, backend_max_cnt, frontend_max_cnt, manager_max_cnt, \
     designer_current_cnt, backend_current_cnt, frontend_current_cnt, manager_current_cnt, \
     visited_cnt, is_recruiting, is_deleted, created_at, updated_at";

const MEMBER_COLUMNS: &str =
    "id, user_id, team_id, position, is_leader, status, is_deleted, created_at, updated_at";

const OFFER_COLUMNS: &str =
    "id, user_id, team_id, position, offered_by, is_accepted, is_deleted, created_at, updated_at";

const ACTIVE_MEMBER: &str = "is_deleted = FALSE AND status IN ('LEADER', 'PROGRESS')";

/// Counter column pair for a position
fn cnt_columns(position: Position) -> (&'static str, &'static str) {
    match position {
        Position::Designer => ("designer_current_cnt", "designer_max_cnt"),
        Position::Backend => ("backend_current_cnt", "backend_max_cnt"),
        Position::Frontend => ("frontend_current_cnt", "frontend_max_cnt"),
        Position::Manager => ("manager_current_cnt", "manager_max_cnt"),
    }
}

/// Flat row shape for `teams`; the entity nests its counters
#[derive(sqlx::FromRow)]
struct TeamRow {
    id: Uuid,
    project_name: String,
    project_description: String,
    expectation: String,
    open_chat_url: String,
    project_url: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    designer_max_cnt: i16,
    backend_max_cnt: i16,
    frontend_max_cnt: i16,
    manager_max_cnt: i16,
    designer_current_cnt: i16,
    backend_current_cnt: i16,
    frontend_current_cnt: i16,
    manager_current_cnt: i16,
    visited_cnt: i64,
    is_recruiting: bool,
    is_deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn cnt(value: i16) -> u8 {
    value.clamp(0, u8::MAX as i16) as u8
}

impl From<TeamRow> for Team {
    fn from(row: TeamRow) -> Self {
        Team {
            id: row.id,
            project_name: row.project_name,
            project_description: row.project_description,
            expectation: row.expectation,
            open_chat_url: row.open_chat_url,
            project_url: row.project_url,
            completed_at: row.completed_at,
            max: Capacities::new(
                cnt(row.designer_max_cnt),
                cnt(row.backend_max_cnt),
                cnt(row.frontend_max_cnt),
                cnt(row.manager_max_cnt),
            ),
            current: Capacities::new(
                cnt(row.designer_current_cnt),
                cnt(row.backend_current_cnt),
                cnt(row.frontend_current_cnt),
                cnt(row.manager_current_cnt),
            ),
            visited_cnt: row.visited_cnt,
            is_recruiting: row.is_recruiting,
            is_deleted: row.is_deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert_member_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    member: &TeamMember,
) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO team_members \
         (id, user_id, team_id, position, is_leader, status, is_deleted, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(member.id)
    .bind(member.user_id)
    .bind(member.team_id)
    .bind(member.position)
    .bind(member.is_leader)
    .bind(member.status)
    .bind(member.is_deleted)
    .bind(member.created_at)
    .bind(member.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        // The partial unique index catches a second active membership
        // racing past the SELECT guard.
        let duplicate_active = e
            .as_database_error()
            .and_then(|d| d.constraint())
            .is_some_and(|name| name == "team_members_one_active_per_user");
        if duplicate_active {
            RepositoryError::AlreadyExists
        } else {
            RepositoryError::Connection(e)
        }
    })?;
    Ok(())
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query("INSERT INTO users (id, username, created_at, updated_at) VALUES ($1, $2, $3, $4)")
            .bind(user.id)
            .bind(&user.username)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert_team(&self, team: &Team, leader: &TeamMember) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT id FROM team_members WHERE user_id = $1 AND {ACTIVE_MEMBER} LIMIT 1");
        let existing = sqlx::query_scalar::<_, Uuid>(&sql)
            .bind(leader.user_id)
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_some() {
            return Err(RepositoryError::AlreadyExists);
        }

        sqlx::query(
            "INSERT INTO teams \
             (id, project_name, project_description, expectation, open_chat_url, \
              project_url, completed_at, \
              designer_max_cnt, backend_max_cnt, frontend_max_cnt, manager_max_cnt, \
              designer_current_cnt, backend_current_cnt, frontend_current_cnt, manager_current_cnt, \
              visited_cnt, is_recruiting, is_deleted, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)",
        )
        .bind(team.id)
        .bind(&team.project_name)
        .bind(&team.project_description)
        .bind(&team.expectation)
        .bind(&team.open_chat_url)
        .bind(&team.project_url)
        .bind(team.completed_at)
        .bind(team.max.designer as i16)
        .bind(team.max.backend as i16)
        .bind(team.max.frontend as i16)
        .bind(team.max.manager as i16)
        .bind(team.current.designer as i16)
        .bind(team.current.backend as i16)
        .bind(team.current.frontend as i16)
        .bind(team.current.manager as i16)
        .bind(team.visited_cnt)
        .bind(team.is_recruiting)
        .bind(team.is_deleted)
        .bind(team.created_at)
        .bind(team.updated_at)
        .execute(&mut *tx)
        .await?;

        insert_member_tx(&mut tx, leader).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_team(&self, team_id: Uuid) -> StoreResult<Option<Team>> {
        let sql = format!("SELECT {TEAM_COLUMNS} FROM teams WHERE id = $1");
        let row = sqlx::query_as::<_, TeamRow>(&sql)
            .bind(team_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Team::from))
    }

    async fn update_team(&self, team: &Team) -> StoreResult<()> {
        // Occupancy counters and the visit counter are deliberately
        // absent from the column list.
        let result = sqlx::query(
            "UPDATE teams SET \
             project_name = $2, project_description = $3, expectation = $4, open_chat_url = $5, \
             project_url = $6, completed_at = $7, \
             designer_max_cnt = $8, backend_max_cnt = $9, frontend_max_cnt = $10, manager_max_cnt = $11, \
             is_recruiting = $12, is_deleted = $13, updated_at = $14 \
             WHERE id = $1",
        )
        .bind(team.id)
        .bind(&team.project_name)
        .bind(&team.project_description)
        .bind(&team.expectation)
        .bind(&team.open_chat_url)
        .bind(&team.project_url)
        .bind(team.completed_at)
        .bind(team.max.designer as i16)
        .bind(team.max.backend as i16)
        .bind(team.max.frontend as i16)
        .bind(team.max.manager as i16)
        .bind(team.is_recruiting)
        .bind(team.is_deleted)
        .bind(team.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            // teams_{position}_capacity rejects a max shrunk below the
            // live occupancy.
            let capacity_check = e
                .as_database_error()
                .and_then(|d| d.constraint())
                .is_some_and(|name| name.ends_with("_capacity"));
            if capacity_check {
                RepositoryError::InvalidData("capacity below occupancy".to_string())
            } else {
                RepositoryError::Connection(e)
            }
        })?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn record_visit(&self, team_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("UPDATE teams SET visited_cnt = visited_cnt + 1 WHERE id = $1")
            .bind(team_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_recruiting_teams(
        &self,
        position: Option<Position>,
        page: PageRequest,
    ) -> StoreResult<Page<Team>> {
        let open_slot = position
            .map(|p| {
                let (cur, max) = cnt_columns(p);
                format!(" AND {cur} < {max}")
            })
            .unwrap_or_default();

        let sql = format!(
            "SELECT {TEAM_COLUMNS} FROM teams \
             WHERE is_deleted = FALSE AND is_recruiting = TRUE{open_slot} \
             AND ($1::uuid IS NULL OR (created_at, id) < \
                  (SELECT created_at, id FROM teams WHERE id = $1)) \
             ORDER BY created_at DESC, id DESC LIMIT $2"
        );
        let rows = sqlx::query_as::<_, TeamRow>(&sql)
            .bind(page.after)
            .bind(page.size)
            .fetch_all(&self.pool)
            .await?;

        let count_sql = format!(
            "SELECT COUNT(*) FROM teams \
             WHERE is_deleted = FALSE AND is_recruiting = TRUE{open_slot}"
        );
        let total = sqlx::query_scalar::<_, i64>(&count_sql)
            .fetch_one(&self.pool)
            .await?;

        Ok(Page::new(rows.into_iter().map(Team::from).collect(), total))
    }

    async fn find_current_member(&self, user_id: Uuid) -> StoreResult<Option<TeamMember>> {
        let sql = format!(
            "SELECT {MEMBER_COLUMNS} FROM team_members WHERE user_id = $1 AND {ACTIVE_MEMBER} LIMIT 1"
        );
        let member = sqlx::query_as::<_, TeamMember>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(member)
    }

    async fn find_current_member_of_team(
        &self,
        user_id: Uuid,
        team_id: Uuid,
    ) -> StoreResult<Option<TeamMember>> {
        let sql = format!(
            "SELECT {MEMBER_COLUMNS} FROM team_members \
             WHERE user_id = $1 AND team_id = $2 AND {ACTIVE_MEMBER} LIMIT 1"
        );
        let member = sqlx::query_as::<_, TeamMember>(&sql)
            .bind(user_id)
            .bind(team_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(member)
    }

    async fn list_active_members(&self, team_id: Uuid) -> StoreResult<Vec<TeamMember>> {
        let sql = format!(
            "SELECT {MEMBER_COLUMNS} FROM team_members \
             WHERE team_id = $1 AND {ACTIVE_MEMBER} ORDER BY created_at ASC, id ASC"
        );
        let members = sqlx::query_as::<_, TeamMember>(&sql)
            .bind(team_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(members)
    }

    async fn insert_offer(&self, offer: &Offer) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO offers \
             (id, user_id, team_id, position, offered_by, is_accepted, is_deleted, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(offer.id)
        .bind(offer.user_id)
        .bind(offer.team_id)
        .bind(offer.position)
        .bind(offer.offered_by)
        .bind(offer.is_accepted)
        .bind(offer.is_deleted)
        .bind(offer.created_at)
        .bind(offer.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_offer(&self, offer_id: Uuid) -> StoreResult<Option<Offer>> {
        let sql = format!("SELECT {OFFER_COLUMNS} FROM offers WHERE id = $1");
        let offer = sqlx::query_as::<_, Offer>(&sql)
            .bind(offer_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(offer)
    }

    async fn list_user_offers(
        &self,
        user_id: Uuid,
        offered_by: OfferedBy,
        page: PageRequest,
    ) -> StoreResult<Page<Offer>> {
        let sql = format!(
            "SELECT {OFFER_COLUMNS} FROM offers \
             WHERE user_id = $1 AND offered_by = $2 \
             AND ($3::uuid IS NULL OR (created_at, id) < \
                  (SELECT created_at, id FROM offers WHERE id = $3)) \
             ORDER BY created_at DESC, id DESC LIMIT $4"
        );
        let rows = sqlx::query_as::<_, Offer>(&sql)
            .bind(user_id)
            .bind(offered_by)
            .bind(page.after)
            .bind(page.size)
            .fetch_all(&self.pool)
            .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM offers WHERE user_id = $1 AND offered_by = $2",
        )
        .bind(user_id)
        .bind(offered_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(Page::new(rows, total))
    }

    async fn list_team_offers(
        &self,
        team_id: Uuid,
        position: Option<Position>,
        offered_by: OfferedBy,
        page: PageRequest,
    ) -> StoreResult<Page<Offer>> {
        let sql = format!(
            "SELECT {OFFER_COLUMNS} FROM offers \
             WHERE team_id = $1 AND offered_by = $2 \
             AND ($3::position IS NULL OR position = $3) \
             AND ($4::uuid IS NULL OR (created_at, id) < \
                  (SELECT created_at, id FROM offers WHERE id = $4)) \
             ORDER BY created_at DESC, id DESC LIMIT $5"
        );
        let rows = sqlx::query_as::<_, Offer>(&sql)
            .bind(team_id)
            .bind(offered_by)
            .bind(position)
            .bind(page.after)
            .bind(page.size)
            .fetch_all(&self.pool)
            .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM offers \
             WHERE team_id = $1 AND offered_by = $2 \
             AND ($3::position IS NULL OR position = $3)",
        )
        .bind(team_id)
        .bind(offered_by)
        .bind(position)
        .fetch_one(&self.pool)
        .await?;

        Ok(Page::new(rows, total))
    }

    async fn accept_offer(&self, offer_id: Uuid, cascade: CascadeScope) -> StoreResult<Acceptance> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "SELECT {OFFER_COLUMNS} FROM offers \
             WHERE id = $1 AND is_accepted IS NULL AND is_deleted = FALSE FOR UPDATE"
        );
        let offer = sqlx::query_as::<_, Offer>(&sql)
            .bind(offer_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let sql = format!("SELECT id FROM team_members WHERE user_id = $1 AND {ACTIVE_MEMBER} LIMIT 1");
        let existing = sqlx::query_scalar::<_, Uuid>(&sql)
            .bind(offer.user_id)
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_some() {
            return Err(RepositoryError::AlreadyExists);
        }

        // Conditional increment; zero rows means the position filled up
        // first and the whole transaction rolls back untouched.
        let (cur, max) = cnt_columns(offer.position);
        let sql = format!(
            "UPDATE teams SET {cur} = {cur} + 1, updated_at = NOW() \
             WHERE id = $1 AND is_deleted = FALSE AND {cur} < {max}"
        );
        let claimed = sqlx::query(&sql)
            .bind(offer.team_id)
            .execute(&mut *tx)
            .await?;
        if claimed.rows_affected() == 0 {
            return Ok(Acceptance::PositionFull);
        }

        sqlx::query(
            "UPDATE teams SET is_recruiting = FALSE WHERE id = $1 \
             AND designer_current_cnt >= designer_max_cnt \
             AND backend_current_cnt >= backend_max_cnt \
             AND frontend_current_cnt >= frontend_max_cnt \
             AND manager_current_cnt >= manager_max_cnt",
        )
        .bind(offer.team_id)
        .execute(&mut *tx)
        .await?;

        let member = TeamMember::admit(offer.user_id, offer.team_id, offer.position);
        insert_member_tx(&mut tx, &member).await?;

        sqlx::query(
            "UPDATE offers SET is_accepted = TRUE, is_deleted = TRUE, updated_at = NOW() WHERE id = $1",
        )
        .bind(offer_id)
        .execute(&mut *tx)
        .await?;

        let cascade_sql = match cascade {
            CascadeScope::AllPositions => {
                "UPDATE offers SET is_deleted = TRUE, updated_at = NOW() \
                 WHERE user_id = $1 AND id <> $2 AND is_accepted IS NULL AND is_deleted = FALSE \
                 RETURNING id"
            }
            CascadeScope::SamePosition => {
                "UPDATE offers SET is_deleted = TRUE, updated_at = NOW() \
                 WHERE user_id = $1 AND id <> $2 AND position = $3 \
                 AND is_accepted IS NULL AND is_deleted = FALSE \
                 RETURNING id"
            }
        };
        let mut cascade_query = sqlx::query_scalar::<_, Uuid>(cascade_sql)
            .bind(offer.user_id)
            .bind(offer_id);
        if cascade == CascadeScope::SamePosition {
            cascade_query = cascade_query.bind(offer.position);
        }
        let cascaded = cascade_query.fetch_all(&mut *tx).await?;

        let sql = format!("SELECT {TEAM_COLUMNS} FROM teams WHERE id = $1");
        let team = sqlx::query_as::<_, TeamRow>(&sql)
            .bind(offer.team_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Acceptance::Admitted {
            member,
            team: team.into(),
            cascaded,
        })
    }

    async fn decline_offer(&self, offer_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE offers SET is_accepted = FALSE, is_deleted = TRUE, updated_at = NOW() \
             WHERE id = $1 AND is_accepted IS NULL AND is_deleted = FALSE",
        )
        .bind(offer_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn cancel_offer(&self, offer_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE offers SET is_deleted = TRUE, updated_at = NOW() \
             WHERE id = $1 AND is_accepted IS NULL AND is_deleted = FALSE",
        )
        .bind(offer_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn commit_departure(&self, member: &TeamMember) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE team_members SET status = $2, is_deleted = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(member.id)
        .bind(member.status)
        .bind(member.is_deleted)
        .bind(member.updated_at)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        // Relative decrement; a concurrent admission is never overwritten
        let (cur, _) = cnt_columns(member.position);
        let sql = format!(
            "UPDATE teams SET {cur} = GREATEST({cur} - 1, 0), is_recruiting = TRUE, \
             updated_at = NOW() WHERE id = $1"
        );
        sqlx::query(&sql).bind(member.team_id).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn commit_project_end(&self, team: &Team, members: &[TeamMember]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE teams SET project_url = $2, completed_at = $3, is_recruiting = FALSE, \
             is_deleted = $4, updated_at = $5 WHERE id = $1",
        )
        .bind(team.id)
        .bind(&team.project_url)
        .bind(team.completed_at)
        .bind(team.is_deleted)
        .bind(team.updated_at)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        for member in members {
            sqlx::query(
                "UPDATE team_members SET status = $2, is_deleted = $3, updated_at = $4 WHERE id = $1",
            )
            .bind(member.id)
            .bind(member.status)
            .bind(member.is_deleted)
            .bind(member.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "UPDATE offers SET is_deleted = TRUE, updated_at = NOW() \
             WHERE team_id = $1 AND is_accepted IS NULL AND is_deleted = FALSE",
        )
        .bind(team.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
