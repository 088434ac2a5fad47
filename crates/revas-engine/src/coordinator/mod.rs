//! # Review Coordinator
//!
//! Orchestrates pull request creation, merging, single reviewer
//! reassignment ([`reassign`]) and the team deactivation cascade
//! ([`bulk`]). Each operation consults the directory, then the lifecycle
//! guards, then the selector, then persists, failing fast at the first
//! unmet precondition.

mod bulk;
mod reassign;

pub use bulk::{BulkDeactivation, PullRequestReassignment, ReviewerSwap};
pub use reassign::ReassignOutcome;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use revas_core::{PullRequestId, Team, UserId};
use revas_state::{MergeOutcome, PullRequest, MAX_REVIEWERS};

use crate::error::EngineError;
use crate::ports::{PullRequestStore, UserLookup};
use crate::selector::ReviewerSelector;

/// Input for [`ReviewCoordinator::create_pull_request`].
#[derive(Debug, Clone)]
pub struct CreatePullRequest {
    /// Caller-chosen id; generated when absent.
    pub id: Option<PullRequestId>,
    pub name: String,
    pub author_id: UserId,
}

/// Coordinates reviewer assignment against a storage backend `S`.
///
/// Holds no per-request state; the selector's random source is the only
/// thing shared between calls.
pub struct ReviewCoordinator<S: ?Sized> {
    store: Arc<S>,
    selector: Arc<ReviewerSelector>,
}

impl<S: ?Sized> Clone for ReviewCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            selector: Arc::clone(&self.selector),
        }
    }
}

impl<S: ?Sized> ReviewCoordinator<S> {
    pub fn new(store: Arc<S>, selector: ReviewerSelector) -> Self {
        Self {
            store,
            selector: Arc::new(selector),
        }
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

impl<S> ReviewCoordinator<S>
where
    S: UserLookup + PullRequestStore + ?Sized,
{
    /// Create an OPEN pull request and assign up to two reviewers from the
    /// author's team.
    ///
    /// Reviewer assignment is best effort: if it fails the pull request is
    /// still created and returned, possibly with no reviewers.
    pub async fn create_pull_request(
        &self,
        request: CreatePullRequest,
    ) -> Result<PullRequest, EngineError> {
        let id = request.id.unwrap_or_else(PullRequestId::generate);
        let pr = PullRequest::open(id, &request.name, request.author_id, Utc::now())?;

        let author = self
            .store
            .get_user(&request.author_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("author not found".into()))?;
        let team = self
            .store
            .get_team(&author.team_name)
            .await?
            .ok_or_else(|| EngineError::NotFound("team not found".into()))?;

        self.store.create_pull_request(&pr).await?;
        tracing::info!(pr_id = %pr.id, author = %pr.author_id, team = %team.name, "pull request created");

        if let Err(err) = self.assign_initial_reviewers(&pr, &team).await {
            tracing::warn!(pr_id = %pr.id, error = %err, "initial reviewer assignment failed");
        }

        let stored = self.store.get_pull_request(&pr.id).await?;
        Ok(stored.unwrap_or(pr))
    }

    /// Attach up to [`MAX_REVIEWERS`] active members of `team` to a freshly
    /// created pull request, excluding its author.
    pub async fn assign_initial_reviewers(
        &self,
        pr: &PullRequest,
        team: &Team,
    ) -> Result<Vec<UserId>, EngineError> {
        let exclude: HashSet<UserId> = [pr.author_id].into_iter().collect();
        let picked = self.selector.pick_from_team(team, &exclude, MAX_REVIEWERS);
        if picked.is_empty() {
            tracing::debug!(pr_id = %pr.id, "no reviewer candidates");
            return Ok(picked);
        }

        let mut staged = pr.clone();
        staged.attach_reviewers(&picked)?;
        self.store.assign_reviewers(&pr.id, &picked).await?;
        tracing::info!(pr_id = %pr.id, reviewers = picked.len(), "initial reviewers assigned");
        Ok(picked)
    }

    /// Merge a pull request. Merging a merged pull request returns it
    /// unchanged.
    pub async fn merge(&self, id: &PullRequestId) -> Result<PullRequest, EngineError> {
        let mut pr = self
            .store
            .get_pull_request(id)
            .await?
            .ok_or_else(|| EngineError::NotFound("PR not found".into()))?;

        let now = Utc::now();
        if pr.merge(now) == MergeOutcome::AlreadyMerged {
            return Ok(pr);
        }

        let merged = self
            .store
            .mark_merged(id, now)
            .await?
            .ok_or_else(|| EngineError::NotFound("PR not found".into()))?;
        tracing::info!(pr_id = %id, "pull request merged");
        Ok(merged)
    }

    /// Pull requests `reviewer` is assigned to, newest first.
    pub async fn reviews_of(&self, reviewer: &UserId) -> Result<Vec<PullRequest>, EngineError> {
        self.store
            .get_user(reviewer)
            .await?
            .ok_or_else(|| EngineError::NotFound("user not found".into()))?;
        Ok(self.store.reviewed_by(reviewer).await?)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::error::ConflictKind;
    use crate::memory::InMemoryStore;
    use crate::ports::Directory;
    use revas_state::PullRequestStatus;

    fn request(id: &str, author: UserId) -> CreatePullRequest {
        CreatePullRequest {
            id: Some(PullRequestId::new(id).unwrap()),
            name: "Add search".into(),
            author_id: author,
        }
    }

    #[tokio::test]
    async fn create_assigns_two_reviewers_from_team_excluding_author() {
        let store = Arc::new(InMemoryStore::new());
        let team = seed_team(&store, "t", 4).await;
        let coordinator = coordinator(store, 11);

        let pr = coordinator.create_pull_request(request("pr-1", team[0])).await.unwrap();

        assert_eq!(pr.status, PullRequestStatus::Open);
        assert_eq!(pr.reviewers.len(), 2);
        assert!(!pr.reviewers.contains(&team[0]));
        assert_ne!(pr.reviewers[0], pr.reviewers[1]);
        assert!(pr.reviewers.iter().all(|r| team[1..].contains(r)));
    }

    #[tokio::test]
    async fn create_generates_id_when_absent() {
        let store = Arc::new(InMemoryStore::new());
        let team = seed_team(&store, "t", 2).await;
        let coordinator = coordinator(store, 1);

        let pr = coordinator
            .create_pull_request(CreatePullRequest {
                id: None,
                name: "Untitled".into(),
                author_id: team[0],
            })
            .await
            .unwrap();
        assert!(!pr.id.as_str().is_empty());
        assert_eq!(pr.reviewers, vec![team[1]]);
    }

    #[tokio::test]
    async fn create_without_candidates_succeeds_with_no_reviewers() {
        let store = Arc::new(InMemoryStore::new());
        let team = seed_team(&store, "solo", 1).await;
        let coordinator = coordinator(store, 1);

        let pr = coordinator.create_pull_request(request("pr-1", team[0])).await.unwrap();
        assert!(pr.reviewers.is_empty());
    }

    #[tokio::test]
    async fn create_ignores_inactive_members() {
        let store = Arc::new(InMemoryStore::new());
        let team = seed_team(&store, "t", 3).await;
        store.set_is_active(&team[1], false).await.unwrap();
        let coordinator = coordinator(store, 5);

        let pr = coordinator.create_pull_request(request("pr-1", team[0])).await.unwrap();
        assert_eq!(pr.reviewers, vec![team[2]]);
    }

    #[tokio::test]
    async fn create_duplicate_id_is_pr_exists() {
        let store = Arc::new(InMemoryStore::new());
        let team = seed_team(&store, "t", 3).await;
        let coordinator = coordinator(store, 1);

        coordinator.create_pull_request(request("pr-1", team[0])).await.unwrap();
        let err = coordinator
            .create_pull_request(request("pr-1", team[1]))
            .await
            .unwrap_err();
        assert_eq!(err.conflict_kind(), Some(ConflictKind::PrExists));
    }

    #[tokio::test]
    async fn create_with_unknown_author_is_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let coordinator = coordinator(store, 1);

        let err = coordinator
            .create_pull_request(request("pr-1", UserId::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn create_rejects_blank_name() {
        let store = Arc::new(InMemoryStore::new());
        let team = seed_team(&store, "t", 2).await;
        let coordinator = coordinator(store, 1);

        let mut req = request("pr-1", team[0]);
        req.name = "   ".into();
        let err = coordinator.create_pull_request(req).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn create_survives_reviewer_assignment_failure() {
        let store = Arc::new(InMemoryStore::new());
        let team = seed_team(&store, "t", 3).await;
        store.fail_next_write();
        let coordinator = coordinator(Arc::clone(&store), 1);

        let err = coordinator.create_pull_request(request("pr-1", team[0])).await;
        assert!(matches!(err, Err(EngineError::Internal(_))));

        // Let the insert through and fail the reviewer write.
        store.fail_write_after(1);
        let pr = coordinator.create_pull_request(request("pr-2", team[0])).await.unwrap();
        assert!(pr.reviewers.is_empty());
        assert_eq!(pr.status, PullRequestStatus::Open);
    }

    #[tokio::test]
    async fn merge_twice_keeps_timestamp() {
        let store = Arc::new(InMemoryStore::new());
        let team = seed_team(&store, "t", 3).await;
        let coordinator = coordinator(store, 1);
        let pr = coordinator.create_pull_request(request("pr-1", team[0])).await.unwrap();

        let first = coordinator.merge(&pr.id).await.unwrap();
        let second = coordinator.merge(&pr.id).await.unwrap();

        assert_eq!(first.status, PullRequestStatus::Merged);
        assert!(first.merged_at.is_some());
        assert_eq!(first.merged_at, second.merged_at);
    }

    #[tokio::test]
    async fn merge_unknown_is_not_found() {
        let coordinator = coordinator(Arc::new(InMemoryStore::new()), 1);
        let err = coordinator
            .merge(&PullRequestId::new("missing").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn reviews_of_lists_assigned_prs() {
        let store = Arc::new(InMemoryStore::new());
        let team = seed_team(&store, "t", 3).await;
        seed_pr(&store, "pr-1", team[0], &[team[1]]).await;
        seed_pr(&store, "pr-2", team[0], &[team[2]]).await;
        let coordinator = coordinator(store, 1);

        let prs = coordinator.reviews_of(&team[1]).await.unwrap();
        assert_eq!(prs.len(), 1);
        assert_eq!(prs[0].id.as_str(), "pr-1");
        assert!(matches!(
            coordinator.reviews_of(&UserId::new()).await,
            Err(EngineError::NotFound(_))
        ));
    }
}

#[cfg(test)]
mod proptests {
    use super::testing::*;
    use super::*;
    use crate::memory::InMemoryStore;
    use proptest::prelude::*;

    proptest! {
        /// Initial reviewers are a duplicate-free subset of the author's
        /// teammates, at most two of them.
        #[test]
        fn initial_reviewers_are_teammates(size in 1usize..7, author_index in 0usize..7, seed in any::<u64>()) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            runtime.block_on(async {
                let store = Arc::new(InMemoryStore::new());
                let team = seed_team(&store, "t", size).await;
                let author = team[author_index % size];
                let coordinator = coordinator(store, seed);

                let pr = coordinator
                    .create_pull_request(CreatePullRequest {
                        id: None,
                        name: "prop".into(),
                        author_id: author,
                    })
                    .await
                    .unwrap();

                assert!(pr.reviewers.len() <= MAX_REVIEWERS);
                assert_eq!(pr.reviewers.len(), (size - 1).min(MAX_REVIEWERS));
                assert!(!pr.reviewers.contains(&author));
                let unique: HashSet<&UserId> = pr.reviewers.iter().collect();
                assert_eq!(unique.len(), pr.reviewers.len());
                assert!(pr.reviewers.iter().all(|r| team.contains(r)));
            });
        }
    }
}
