//! Aggregate queries for `/statistics`.

use sqlx::PgPool;
use uuid::Uuid;

use revas_core::UserId;
use revas_engine::{PullRequestStats, UserAssignmentStat};

/// Reviewer slot count per user, most assigned first, then by username.
pub async fn user_assignments(pool: &PgPool) -> Result<Vec<UserAssignmentStat>, sqlx::Error> {
    let rows = sqlx::query_as::<_, AssignmentRow>(
        "SELECT u.user_id, u.username, COUNT(r.reviewer_id) AS assignment_count
         FROM users u LEFT JOIN pr_reviewers r ON r.reviewer_id = u.user_id
         GROUP BY u.user_id, u.username
         ORDER BY assignment_count DESC, u.username",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(AssignmentRow::into_record).collect())
}

/// Pull request totals by status, and total reviewer slots.
pub async fn pull_request_totals(pool: &PgPool) -> Result<PullRequestStats, sqlx::Error> {
    let row = sqlx::query_as::<_, TotalsRow>(
        "SELECT COUNT(*) AS total_prs,
                COUNT(*) FILTER (WHERE status = 'OPEN') AS open_prs,
                COUNT(*) FILTER (WHERE status = 'MERGED') AS merged_prs,
                (SELECT COUNT(*) FROM pr_reviewers) AS total_assignments
         FROM pull_requests",
    )
    .fetch_one(pool)
    .await?;
    Ok(row.into_record())
}

fn count(raw: i64) -> u64 {
    u64::try_from(raw).unwrap_or(0)
}

#[derive(sqlx::FromRow)]
struct AssignmentRow {
    user_id: Uuid,
    username: String,
    assignment_count: i64,
}

impl AssignmentRow {
    fn into_record(self) -> UserAssignmentStat {
        UserAssignmentStat {
            user_id: UserId(self.user_id),
            username: self.username,
            assignment_count: count(self.assignment_count),
        }
    }
}

#[derive(sqlx::FromRow)]
struct TotalsRow {
    total_prs: i64,
    open_prs: i64,
    merged_prs: i64,
    total_assignments: i64,
}

impl TotalsRow {
    fn into_record(self) -> PullRequestStats {
        PullRequestStats {
            total: count(self.total_prs),
            open: count(self.open_prs),
            merged: count(self.merged_prs),
            total_assignments: count(self.total_assignments),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_row_converts() {
        let stats = TotalsRow {
            total_prs: 3,
            open_prs: 2,
            merged_prs: 1,
            total_assignments: 5,
        }
        .into_record();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.open + stats.merged, stats.total);
        assert_eq!(stats.total_assignments, 5);
    }

    #[test]
    fn negative_counts_clamp_to_zero() {
        assert_eq!(count(-1), 0);
    }
}
