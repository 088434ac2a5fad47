//! Pull request and reviewer slot persistence.
//!
//! Every write that touches `pr_reviewers` first locks the owning
//! `pull_requests` row with `SELECT ... FOR UPDATE`, so concurrent writers
//! on one pull request are serialized. Batches lock their rows in id
//! order.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use revas_core::{PullRequestId, ReviewerReassignment, UserId};
use revas_engine::ReplaceOutcome;
use revas_state::{LifecycleError, PullRequest, PullRequestStatus};

const PR_COLUMNS: &str =
    "p.pull_request_id, p.pull_request_name, p.author_id, p.status, p.created_at, p.merged_at";

/// Result of [`assign_reviewers`].
#[derive(Debug)]
pub enum AssignOutcome {
    Assigned,
    Missing,
    Rejected(LifecycleError),
}

/// Result of [`apply_batch`].
#[derive(Debug)]
pub enum BatchOutcome {
    Applied,
    /// The first command that no longer matched stored state.
    Stale(ReviewerReassignment),
}

/// Insert a pull request without reviewers.
pub async fn insert(pool: &PgPool, pr: &PullRequest) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO pull_requests (pull_request_id, pull_request_name, author_id, status, created_at, merged_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(pr.id.as_str())
    .bind(&pr.name)
    .bind(pr.author_id.0)
    .bind(pr.status.as_str())
    .bind(pr.created_at)
    .bind(pr.merged_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Fetch a pull request with its reviewers in slot order.
pub async fn get_by_id(pool: &PgPool, id: &PullRequestId) -> Result<Option<PullRequest>, sqlx::Error> {
    let row = sqlx::query_as::<_, PullRequestRow>(&format!(
        "SELECT {PR_COLUMNS} FROM pull_requests p WHERE p.pull_request_id = $1"
    ))
    .bind(id.as_str())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(with_reviewers(pool, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

/// Append reviewers to the next free slots of an open pull request.
pub async fn assign_reviewers(
    pool: &PgPool,
    id: &PullRequestId,
    reviewers: &[UserId],
) -> Result<AssignOutcome, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let Some(row) = lock_one(&mut *tx, id).await? else {
        return Ok(AssignOutcome::Missing);
    };
    let current = reviewers_of(&mut *tx, id).await?;
    let mut pr = row.into_record(current)?;
    let first_new = pr.reviewers.len();
    if let Err(err) = pr.attach_reviewers(reviewers) {
        return Ok(AssignOutcome::Rejected(err));
    }

    for slot in pr.assignments().into_iter().skip(first_new) {
        sqlx::query(
            "INSERT INTO pr_reviewers (pull_request_id, reviewer_id, order_index) VALUES ($1, $2, $3)",
        )
        .bind(slot.pull_request_id.as_str())
        .bind(slot.reviewer_id.0)
        .bind(slot.order_index as i32)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(AssignOutcome::Assigned)
}

/// Mark a pull request merged, keeping an existing merge timestamp.
pub async fn mark_merged(
    pool: &PgPool,
    id: &PullRequestId,
    at: DateTime<Utc>,
) -> Result<Option<PullRequest>, sqlx::Error> {
    let row = sqlx::query_as::<_, PullRequestRow>(
        "UPDATE pull_requests p SET status = 'MERGED', merged_at = COALESCE(p.merged_at, $2)
         WHERE p.pull_request_id = $1
         RETURNING p.pull_request_id, p.pull_request_name, p.author_id, p.status, p.created_at, p.merged_at",
    )
    .bind(id.as_str())
    .bind(at)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(with_reviewers(pool, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

/// Replace one reviewer under a row lock, keeping the slot.
pub async fn replace_reviewer(
    pool: &PgPool,
    reassignment: &ReviewerReassignment,
) -> Result<ReplaceOutcome, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let Some(row) = lock_one(&mut *tx, &reassignment.pull_request_id).await? else {
        return Ok(ReplaceOutcome::Missing);
    };
    if row.status != PullRequestStatus::Merged.as_str() {
        if !swap_slot(&mut *tx, reassignment).await? {
            return Ok(ReplaceOutcome::Stale);
        }
        tx.commit().await?;
        return Ok(ReplaceOutcome::Replaced);
    }
    Ok(ReplaceOutcome::Merged)
}

/// Apply every command in `batch` inside the caller's transaction.
///
/// On [`BatchOutcome::Stale`] the caller must roll back.
pub async fn apply_batch(
    conn: &mut PgConnection,
    batch: &[ReviewerReassignment],
) -> Result<BatchOutcome, sqlx::Error> {
    if batch.is_empty() {
        return Ok(BatchOutcome::Applied);
    }
    let mut ids: Vec<String> = batch
        .iter()
        .map(|c| c.pull_request_id.as_str().to_string())
        .collect();
    ids.sort();
    ids.dedup();

    let locked: Vec<(String, String)> = sqlx::query_as(
        "SELECT pull_request_id, status FROM pull_requests
         WHERE pull_request_id = ANY($1) ORDER BY pull_request_id FOR UPDATE",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;
    let status: HashMap<String, String> = locked.into_iter().collect();

    for command in batch {
        let open = status
            .get(command.pull_request_id.as_str())
            .is_some_and(|s| s == PullRequestStatus::Open.as_str());
        if !open || !swap_slot(conn, command).await? {
            return Ok(BatchOutcome::Stale(command.clone()));
        }
    }
    Ok(BatchOutcome::Applied)
}

/// Open pull requests with a reviewer in `reviewers`, newest first.
pub async fn open_with_reviewers_in(
    pool: &PgPool,
    reviewers: &[UserId],
) -> Result<Vec<PullRequest>, sqlx::Error> {
    let ids: Vec<Uuid> = reviewers.iter().map(|r| r.0).collect();
    let rows = sqlx::query_as::<_, PullRequestRow>(&format!(
        "SELECT {PR_COLUMNS} FROM pull_requests p
         WHERE p.status = 'OPEN' AND EXISTS (
             SELECT 1 FROM pr_reviewers r
             WHERE r.pull_request_id = p.pull_request_id AND r.reviewer_id = ANY($1))
         ORDER BY p.created_at DESC, p.pull_request_id"
    ))
    .bind(&ids)
    .fetch_all(pool)
    .await?;
    with_reviewers(pool, rows).await
}

/// Pull requests on which `reviewer` holds a slot, newest first.
pub async fn reviewed_by(pool: &PgPool, reviewer: &UserId) -> Result<Vec<PullRequest>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PullRequestRow>(&format!(
        "SELECT {PR_COLUMNS} FROM pull_requests p
         JOIN pr_reviewers r ON r.pull_request_id = p.pull_request_id
         WHERE r.reviewer_id = $1
         ORDER BY p.created_at DESC, p.pull_request_id"
    ))
    .bind(reviewer.0)
    .fetch_all(pool)
    .await?;
    with_reviewers(pool, rows).await
}

async fn lock_one(
    conn: &mut PgConnection,
    id: &PullRequestId,
) -> Result<Option<PullRequestRow>, sqlx::Error> {
    sqlx::query_as::<_, PullRequestRow>(&format!(
        "SELECT {PR_COLUMNS} FROM pull_requests p WHERE p.pull_request_id = $1 FOR UPDATE"
    ))
    .bind(id.as_str())
    .fetch_optional(conn)
    .await
}

async fn reviewers_of(conn: &mut PgConnection, id: &PullRequestId) -> Result<Vec<UserId>, sqlx::Error> {
    let ids: Vec<Uuid> = sqlx::query_scalar(
        "SELECT reviewer_id FROM pr_reviewers WHERE pull_request_id = $1 ORDER BY order_index",
    )
    .bind(id.as_str())
    .fetch_all(conn)
    .await?;
    Ok(ids.into_iter().map(UserId).collect())
}

/// Move `old`'s slot to `new`. False when `old` holds no slot or `new`
/// already holds one.
async fn swap_slot(
    conn: &mut PgConnection,
    command: &ReviewerReassignment,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE pr_reviewers SET reviewer_id = $3
         WHERE pull_request_id = $1 AND reviewer_id = $2
           AND NOT EXISTS (
               SELECT 1 FROM pr_reviewers WHERE pull_request_id = $1 AND reviewer_id = $3)",
    )
    .bind(command.pull_request_id.as_str())
    .bind(command.old_reviewer_id.0)
    .bind(command.new_reviewer_id.0)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

async fn with_reviewers(
    pool: &PgPool,
    rows: Vec<PullRequestRow>,
) -> Result<Vec<PullRequest>, sqlx::Error> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<String> = rows.iter().map(|r| r.pull_request_id.clone()).collect();
    let slots = sqlx::query_as::<_, ReviewerRow>(
        "SELECT pull_request_id, reviewer_id, order_index FROM pr_reviewers
         WHERE pull_request_id = ANY($1) ORDER BY pull_request_id, order_index",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let mut by_pr = group_slots(slots);
    rows.into_iter()
        .map(|row| {
            let reviewers = by_pr.remove(&row.pull_request_id).unwrap_or_default();
            row.into_record(reviewers)
        })
        .collect()
}

fn group_slots(slots: Vec<ReviewerRow>) -> HashMap<String, Vec<UserId>> {
    let mut by_pr: HashMap<String, Vec<(i32, UserId)>> = HashMap::new();
    for slot in slots {
        by_pr
            .entry(slot.pull_request_id)
            .or_default()
            .push((slot.order_index, UserId(slot.reviewer_id)));
    }
    by_pr
        .into_iter()
        .map(|(id, mut slots)| {
            slots.sort_by_key(|(index, _)| *index);
            (id, slots.into_iter().map(|(_, r)| r).collect())
        })
        .collect()
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct PullRequestRow {
    pull_request_id: String,
    pull_request_name: String,
    author_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
    merged_at: Option<DateTime<Utc>>,
}

impl PullRequestRow {
    fn into_record(self, reviewers: Vec<UserId>) -> Result<PullRequest, sqlx::Error> {
        let id = PullRequestId::new(&self.pull_request_id)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        let status: PullRequestStatus = self
            .status
            .parse()
            .map_err(|e: LifecycleError| sqlx::Error::Decode(Box::new(e)))?;
        Ok(PullRequest {
            id,
            name: self.pull_request_name,
            author_id: UserId(self.author_id),
            status,
            created_at: self.created_at,
            merged_at: self.merged_at,
            reviewers,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReviewerRow {
    pull_request_id: String,
    reviewer_id: Uuid,
    order_index: i32,
}
