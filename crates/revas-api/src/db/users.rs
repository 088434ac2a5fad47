//! User persistence operations.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use revas_core::{TeamName, User, UserId};

/// Fetch a user by ID.
pub async fn get_by_id(pool: &PgPool, id: &UserId) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT user_id, username, team_name, is_active FROM users WHERE user_id = $1",
    )
    .bind(id.0)
    .fetch_optional(pool)
    .await?;
    row.map(UserRow::into_record).transpose()
}

/// Set a user's activity flag, returning the updated row.
pub async fn set_is_active(
    pool: &PgPool,
    id: &UserId,
    is_active: bool,
) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query_as::<_, UserRow>(
        "UPDATE users SET is_active = $2 WHERE user_id = $1
         RETURNING user_id, username, team_name, is_active",
    )
    .bind(id.0)
    .bind(is_active)
    .fetch_optional(pool)
    .await?;
    row.map(UserRow::into_record).transpose()
}

/// Deactivate those of `users` that are still active members of `team`.
///
/// Returns the ids actually deactivated.
pub async fn deactivate(
    conn: &mut PgConnection,
    team: &TeamName,
    users: &[UserId],
) -> Result<Vec<UserId>, sqlx::Error> {
    let ids: Vec<Uuid> = users.iter().map(|u| u.0).collect();
    let changed: Vec<Uuid> = sqlx::query_scalar(
        "UPDATE users SET is_active = FALSE
         WHERE team_name = $1 AND is_active AND user_id = ANY($2)
         RETURNING user_id",
    )
    .bind(team.as_str())
    .bind(&ids)
    .fetch_all(conn)
    .await?;

    // Report in the caller's order.
    Ok(users
        .iter()
        .filter(|u| changed.contains(&u.0))
        .copied()
        .collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: Uuid,
    username: String,
    team_name: String,
    is_active: bool,
}

impl UserRow {
    fn into_record(self) -> Result<User, sqlx::Error> {
        Ok(User {
            id: UserId(self.user_id),
            username: self.username,
            team_name: TeamName::new(&self.team_name).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            is_active: self.is_active,
        })
    }
}
