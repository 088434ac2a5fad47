//! # Database Persistence Layer
//!
//! Postgres persistence for teams, users, pull requests and reviewer slots
//! via SQLx.
//!
//! The database layer is **optional**. When a database is configured the
//! service stores everything in PostgreSQL through [`PgStore`]. Otherwise
//! it runs on the in-memory store, which is lost on restart.

pub mod pull_requests;
pub mod statistics;
pub mod teams;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

use revas_core::{PullRequestId, ReviewerReassignment, Team, TeamName, User, UserId};
use revas_engine::{
    Directory, PullRequestStats, PullRequestStore, ReplaceOutcome, ReviewStore,
    StatisticsSource, StoreError, UserAssignmentStat, UserLookup,
};
use revas_state::PullRequest;

use self::pull_requests::{AssignOutcome, BatchOutcome};

/// Connect the pool and run migrations.
///
/// Returns `None` when no database is configured (in-memory mode).
/// Returns `Err` if the connection or migration fails.
pub async fn init_pool(
    options: Option<PgConnectOptions>,
    max_connections: u32,
) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(options) = options else {
        tracing::warn!(
            "no database configured, running in-memory only mode. \
             State will not survive restarts."
        );
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

/// [`ReviewStore`] backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserLookup for PgStore {
    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        users::get_by_id(&self.pool, id).await.map_err(backend)
    }

    async fn get_team(&self, name: &TeamName) -> Result<Option<Team>, StoreError> {
        teams::get_by_name(&self.pool, name).await.map_err(backend)
    }
}

#[async_trait]
impl Directory for PgStore {
    async fn add_team(&self, team: &Team) -> Result<(), StoreError> {
        match teams::insert_with_members(&self.pool, team).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(StoreError::TeamExists(team.name.clone())),
            // Lost a race with a concurrent insert of the same name.
            Err(err) if is_unique_violation(&err) => Err(StoreError::TeamExists(team.name.clone())),
            Err(err) => Err(backend(err)),
        }
    }

    async fn set_is_active(
        &self,
        id: &UserId,
        is_active: bool,
    ) -> Result<Option<User>, StoreError> {
        users::set_is_active(&self.pool, id, is_active)
            .await
            .map_err(backend)
    }
}

#[async_trait]
impl PullRequestStore for PgStore {
    async fn create_pull_request(&self, pr: &PullRequest) -> Result<(), StoreError> {
        pull_requests::insert(&self.pool, pr).await.map_err(|err| {
            if is_unique_violation(&err) {
                StoreError::DuplicatePullRequest(pr.id.clone())
            } else {
                backend(err)
            }
        })
    }

    async fn get_pull_request(
        &self,
        id: &PullRequestId,
    ) -> Result<Option<PullRequest>, StoreError> {
        pull_requests::get_by_id(&self.pool, id)
            .await
            .map_err(backend)
    }

    async fn assign_reviewers(
        &self,
        id: &PullRequestId,
        reviewers: &[UserId],
    ) -> Result<(), StoreError> {
        match pull_requests::assign_reviewers(&self.pool, id, reviewers)
            .await
            .map_err(backend)?
        {
            AssignOutcome::Assigned => Ok(()),
            AssignOutcome::Missing => Err(StoreError::Backend(format!(
                "pull request {id} not found"
            ))),
            AssignOutcome::Rejected(err) => Err(StoreError::Backend(err.to_string())),
        }
    }

    async fn mark_merged(
        &self,
        id: &PullRequestId,
        at: DateTime<Utc>,
    ) -> Result<Option<PullRequest>, StoreError> {
        pull_requests::mark_merged(&self.pool, id, at)
            .await
            .map_err(backend)
    }

    async fn replace_reviewer(
        &self,
        reassignment: &ReviewerReassignment,
    ) -> Result<ReplaceOutcome, StoreError> {
        pull_requests::replace_reviewer(&self.pool, reassignment)
            .await
            .map_err(backend)
    }

    async fn open_with_reviewers_in(
        &self,
        reviewers: &[UserId],
    ) -> Result<Vec<PullRequest>, StoreError> {
        pull_requests::open_with_reviewers_in(&self.pool, reviewers)
            .await
            .map_err(backend)
    }

    async fn apply_reassignments(
        &self,
        batch: &[ReviewerReassignment],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        match pull_requests::apply_batch(&mut *tx, batch)
            .await
            .map_err(backend)?
        {
            BatchOutcome::Applied => tx.commit().await.map_err(backend),
            BatchOutcome::Stale(command) => Err(stale(command)),
        }
    }

    async fn reviewed_by(&self, reviewer: &UserId) -> Result<Vec<PullRequest>, StoreError> {
        pull_requests::reviewed_by(&self.pool, reviewer)
            .await
            .map_err(backend)
    }
}

#[async_trait]
impl StatisticsSource for PgStore {
    async fn user_assignment_stats(&self) -> Result<Vec<UserAssignmentStat>, StoreError> {
        statistics::user_assignments(&self.pool)
            .await
            .map_err(backend)
    }

    async fn pull_request_stats(&self) -> Result<PullRequestStats, StoreError> {
        statistics::pull_request_totals(&self.pool)
            .await
            .map_err(backend)
    }
}

#[async_trait]
impl ReviewStore for PgStore {
    async fn commit_team_deactivation(
        &self,
        team: &TeamName,
        users: &[UserId],
        batch: &[ReviewerReassignment],
    ) -> Result<Vec<UserId>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        if let BatchOutcome::Stale(command) = pull_requests::apply_batch(&mut *tx, batch)
            .await
            .map_err(backend)?
        {
            return Err(stale(command));
        }
        let deactivated = users::deactivate(&mut *tx, team, users)
            .await
            .map_err(backend)?;
        tx.commit().await.map_err(backend)?;
        Ok(deactivated)
    }
}

fn stale(command: ReviewerReassignment) -> StoreError {
    StoreError::Stale {
        pull_request_id: command.pull_request_id,
        old_reviewer_id: command.old_reviewer_id,
    }
}
