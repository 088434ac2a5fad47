//! Single reviewer reassignment.

use std::collections::HashSet;

use revas_core::{PullRequestId, ReviewerReassignment, UserId};
use revas_state::PullRequest;

use super::ReviewCoordinator;
use crate::error::{ConflictKind, EngineError};
use crate::ports::{PullRequestStore, ReplaceOutcome, UserLookup};

/// Result of [`ReviewCoordinator::reassign_reviewer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReassignOutcome {
    /// The pull request after replacement.
    pub pull_request: PullRequest,
    /// The reviewer who took over the slot.
    pub replaced_by: UserId,
}

impl<S> ReviewCoordinator<S>
where
    S: UserLookup + PullRequestStore + ?Sized,
{
    /// Replace `old_reviewer` on an open pull request with a random active
    /// member of `old_reviewer`'s team.
    ///
    /// Preconditions are checked in order, each with its own failure: the
    /// pull request exists, is OPEN, has `old_reviewer` assigned; the old
    /// reviewer and their team resolve; a candidate exists.
    pub async fn reassign_reviewer(
        &self,
        pr_id: &PullRequestId,
        old_reviewer: &UserId,
    ) -> Result<ReassignOutcome, EngineError> {
        let mut pr = self
            .store
            .get_pull_request(pr_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("PR not found".into()))?;
        pr.ensure_open()?;
        if !pr.has_reviewer(old_reviewer) {
            return Err(EngineError::conflict(
                ConflictKind::NotAssigned,
                "reviewer is not assigned to this PR",
            ));
        }

        let user = self
            .store
            .get_user(old_reviewer)
            .await?
            .ok_or_else(|| EngineError::NotFound("user not found".into()))?;
        let team = self
            .store
            .get_team(&user.team_name)
            .await?
            .ok_or_else(|| EngineError::NotFound("team not found".into()))?;

        let mut exclude: HashSet<UserId> = pr.reviewers.iter().copied().collect();
        exclude.insert(*old_reviewer);
        exclude.insert(pr.author_id);
        let new_reviewer = self
            .selector
            .pick_from_team(&team, &exclude, 1)
            .first()
            .copied()
            .ok_or_else(|| {
                EngineError::conflict(
                    ConflictKind::NoCandidate,
                    "no active replacement candidate in team",
                )
            })?;

        pr.replace_reviewer(old_reviewer, &new_reviewer)?;
        let command = ReviewerReassignment {
            pull_request_id: pr.id.clone(),
            old_reviewer_id: *old_reviewer,
            new_reviewer_id: new_reviewer,
        };
        match self.store.replace_reviewer(&command).await? {
            ReplaceOutcome::Replaced => {}
            ReplaceOutcome::Merged => {
                return Err(EngineError::conflict(
                    ConflictKind::PrMerged,
                    "cannot reassign on merged PR",
                ))
            }
            ReplaceOutcome::Stale => {
                return Err(EngineError::conflict(
                    ConflictKind::NotAssigned,
                    "reviewer is not assigned to this PR",
                ))
            }
            ReplaceOutcome::Missing => return Err(EngineError::NotFound("PR not found".into())),
        }
        tracing::info!(
            pr_id = %pr.id,
            old_reviewer = %old_reviewer,
            new_reviewer = %new_reviewer,
            "reviewer reassigned"
        );

        let mut pull_request = self.store.get_pull_request(pr_id).await?.unwrap_or(pr);
        let author = pull_request.author_id;
        pull_request.reviewers.retain(|r| *r != author);
        Ok(ReassignOutcome {
            pull_request,
            replaced_by: new_reviewer,
        })
    }

    /// [`reassign_reviewer`](Self::reassign_reviewer) with the old reviewer
    /// id as sent by the client.
    ///
    /// The pull request checks run first, so a missing or merged pull
    /// request is reported as such whatever `old_reviewer` holds. An id
    /// that is not a UUID can never hold a slot and fails with
    /// `NOT_ASSIGNED`.
    pub async fn reassign_reviewer_raw(
        &self,
        pr_id: &PullRequestId,
        old_reviewer: &str,
    ) -> Result<ReassignOutcome, EngineError> {
        if let Ok(id) = UserId::parse("old_user_id", old_reviewer) {
            return self.reassign_reviewer(pr_id, &id).await;
        }
        self.store
            .get_pull_request(pr_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("PR not found".into()))?
            .ensure_open()?;
        Err(EngineError::conflict(
            ConflictKind::NotAssigned,
            "reviewer is not assigned to this PR",
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::testing::*;
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::ports::Directory;

    #[tokio::test]
    async fn reassign_takes_only_free_teammate_and_keeps_slot() {
        // Team {A, B, C, D}; PR by A reviewed by B, C. Reassigning B must pick D.
        let store = Arc::new(InMemoryStore::new());
        let t = seed_team(&store, "t", 4).await;
        let (a, b, c, d) = (t[0], t[1], t[2], t[3]);
        let pr_id = seed_pr(&store, "pr-1", a, &[b, c]).await;
        let coordinator = coordinator(store, 3);

        let outcome = coordinator.reassign_reviewer(&pr_id, &b).await.unwrap();

        assert_eq!(outcome.replaced_by, d);
        assert_eq!(outcome.pull_request.reviewers, vec![d, c]);
        assert_eq!(outcome.pull_request.order_index_of(&c), Some(2));
    }

    #[tokio::test]
    async fn reassign_on_merged_is_pr_merged() {
        let store = Arc::new(InMemoryStore::new());
        let t = seed_team(&store, "t", 4).await;
        let pr_id = seed_pr(&store, "pr-1", t[0], &[t[1], t[2]]).await;
        let coordinator = coordinator(store, 1);
        coordinator.merge(&pr_id).await.unwrap();

        // Valid and invalid reviewers alike.
        for reviewer in [t[1], UserId::new()] {
            let err = coordinator.reassign_reviewer(&pr_id, &reviewer).await.unwrap_err();
            assert_eq!(err.conflict_kind(), Some(ConflictKind::PrMerged));
        }
    }

    #[tokio::test]
    async fn reassign_unassigned_reviewer_is_not_assigned() {
        let store = Arc::new(InMemoryStore::new());
        let t = seed_team(&store, "t", 4).await;
        let pr_id = seed_pr(&store, "pr-1", t[0], &[t[1]]).await;
        let coordinator = coordinator(store, 1);

        let err = coordinator.reassign_reviewer(&pr_id, &t[3]).await.unwrap_err();
        assert_eq!(err.conflict_kind(), Some(ConflictKind::NotAssigned));
    }

    #[tokio::test]
    async fn reassign_unknown_pr_is_not_found() {
        let coordinator = coordinator(Arc::new(InMemoryStore::new()), 1);
        let err = coordinator
            .reassign_reviewer(&PullRequestId::new("nope").unwrap(), &UserId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn reassign_without_candidate_leaves_reviewers_unchanged() {
        let store = Arc::new(InMemoryStore::new());
        let t = seed_team(&store, "t", 4).await;
        store.set_is_active(&t[3], false).await.unwrap();
        let pr_id = seed_pr(&store, "pr-1", t[0], &[t[1], t[2]]).await;
        let coordinator = coordinator(Arc::clone(&store), 1);

        let err = coordinator.reassign_reviewer(&pr_id, &t[1]).await.unwrap_err();
        assert_eq!(err.conflict_kind(), Some(ConflictKind::NoCandidate));

        let pr = store.get_pull_request(&pr_id).await.unwrap().unwrap();
        assert_eq!(pr.reviewers, vec![t[1], t[2]]);
    }

    #[tokio::test]
    async fn reassign_draws_from_old_reviewers_team() {
        // Author in "authors", reviewer in "reviewers": the pool is the
        // reviewer's team.
        let store = Arc::new(InMemoryStore::new());
        let authors = seed_team(&store, "authors", 3).await;
        let reviewers = seed_team(&store, "reviewers", 2).await;
        let pr_id = seed_pr(&store, "pr-1", authors[0], &[reviewers[0]]).await;
        let coordinator = coordinator(store, 1);

        let outcome = coordinator.reassign_reviewer(&pr_id, &reviewers[0]).await.unwrap();
        assert_eq!(outcome.replaced_by, reviewers[1]);
    }

    #[tokio::test]
    async fn reassign_never_picks_author_or_existing_reviewer() {
        for seed in 0..32 {
            let store = Arc::new(InMemoryStore::new());
            let t = seed_team(&store, "t", 6).await;
            let pr_id = seed_pr(&store, "pr-1", t[0], &[t[1], t[2]]).await;
            let coordinator = coordinator(store, seed);

            let outcome = coordinator.reassign_reviewer(&pr_id, &t[1]).await.unwrap();
            assert!(![t[0], t[1], t[2]].contains(&outcome.replaced_by));
            assert_eq!(outcome.pull_request.reviewers[1], t[2]);
        }
    }

    #[tokio::test]
    async fn raw_reviewer_id_checks_pull_request_first() {
        let store = Arc::new(InMemoryStore::new());
        let t = seed_team(&store, "t", 4).await;
        let pr_id = seed_pr(&store, "pr-1", t[0], &[t[1], t[2]]).await;
        let coordinator = coordinator(Arc::clone(&store), 1);

        let err = coordinator
            .reassign_reviewer_raw(&PullRequestId::new("pr-missing").unwrap(), "bob")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));

        let err = coordinator.reassign_reviewer_raw(&pr_id, "bob").await.unwrap_err();
        assert_eq!(err.conflict_kind(), Some(ConflictKind::NotAssigned));

        coordinator.merge(&pr_id).await.unwrap();
        let err = coordinator.reassign_reviewer_raw(&pr_id, "bob").await.unwrap_err();
        assert_eq!(err.conflict_kind(), Some(ConflictKind::PrMerged));
    }

    #[tokio::test]
    async fn raw_reviewer_id_delegates_when_it_parses() {
        let store = Arc::new(InMemoryStore::new());
        let t = seed_team(&store, "t", 4).await;
        let pr_id = seed_pr(&store, "pr-1", t[0], &[t[1], t[2]]).await;
        let coordinator = coordinator(Arc::clone(&store), 1);

        let outcome = coordinator
            .reassign_reviewer_raw(&pr_id, &t[1].to_string())
            .await
            .unwrap();
        assert_eq!(outcome.replaced_by, t[3]);
        assert_eq!(outcome.pull_request.reviewers, vec![t[3], t[2]]);
    }

    #[tokio::test]
    async fn concurrent_reassignments_of_same_slot_land_once() {
        let store = Arc::new(InMemoryStore::new());
        let t = seed_team(&store, "t", 6).await;
        let pr_id = seed_pr(&store, "pr-1", t[0], &[t[1], t[2]]).await;
        let coordinator = coordinator(Arc::clone(&store), 1);

        let (first, second) = tokio::join!(
            coordinator.reassign_reviewer(&pr_id, &t[1]),
            coordinator.reassign_reviewer(&pr_id, &t[1]),
        );
        let successes = [first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(successes, 1);

        let pr = store.get_pull_request(&pr_id).await.unwrap().unwrap();
        assert!(!pr.has_reviewer(&t[1]));
        assert_eq!(pr.reviewers.len(), 2);
    }
}
