//! Team persistence operations.

use sqlx::PgPool;
use uuid::Uuid;

use revas_core::{Team, TeamMember, TeamName, UserId};

/// Create `team` and upsert its members, in one transaction.
///
/// Returns `false`, with nothing written, when the team name is taken.
pub async fn insert_with_members(pool: &PgPool, team: &Team) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let created = sqlx::query(
        "INSERT INTO teams (team_name) VALUES ($1) ON CONFLICT (team_name) DO NOTHING",
    )
    .bind(team.name.as_str())
    .execute(&mut *tx)
    .await?;
    if created.rows_affected() == 0 {
        return Ok(false);
    }

    for member in &team.members {
        sqlx::query(
            "INSERT INTO users (user_id, username, team_name, is_active) VALUES ($1, $2, $3, $4)
             ON CONFLICT (user_id) DO UPDATE
             SET username = EXCLUDED.username, team_name = EXCLUDED.team_name, is_active = EXCLUDED.is_active",
        )
        .bind(member.id.0)
        .bind(&member.username)
        .bind(team.name.as_str())
        .bind(member.is_active)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(true)
}

/// Fetch a team with all its members, ordered by username.
pub async fn get_by_name(pool: &PgPool, name: &TeamName) -> Result<Option<Team>, sqlx::Error> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM teams WHERE team_name = $1)")
        .bind(name.as_str())
        .fetch_one(pool)
        .await?;
    if !exists {
        return Ok(None);
    }

    let rows = sqlx::query_as::<_, MemberRow>(
        "SELECT user_id, username, is_active FROM users WHERE team_name = $1 ORDER BY username, user_id",
    )
    .bind(name.as_str())
    .fetch_all(pool)
    .await?;

    Ok(Some(Team {
        name: name.clone(),
        members: rows.into_iter().map(MemberRow::into_record).collect(),
    }))
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct MemberRow {
    user_id: Uuid,
    username: String,
    is_active: bool,
}

impl MemberRow {
    fn into_record(self) -> TeamMember {
        TeamMember {
            id: UserId(self.user_id),
            username: self.username,
            is_active: self.is_active,
        }
    }
}
