//! # Team Deactivation Cascade
//!
//! Deactivating a team first moves every open review held by its active
//! members to someone in the pull request author's team, then flips those
//! members to inactive. Both steps commit in one store transaction, so no
//! open pull request is left holding a reviewer who is about to go
//! inactive, and a failed batch leaves the team active for a retry.

use std::collections::HashSet;
use std::time::Instant;

use serde::Serialize;

use revas_core::{PullRequestId, ReviewerReassignment, TeamName, UserId};
use revas_state::PullRequest;

use super::ReviewCoordinator;
use crate::error::EngineError;
use crate::ports::{ReviewStore, StoreError};

/// One old → new reviewer pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReviewerSwap {
    pub old_reviewer_id: UserId,
    pub new_reviewer_id: UserId,
}

/// What the cascade did to one pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestReassignment {
    pub pull_request_id: PullRequestId,
    /// Pairings applied, in the old reviewers' slot order.
    pub swaps: Vec<ReviewerSwap>,
    /// Reviewers left in place for lack of candidates.
    pub unreplaced: Vec<UserId>,
}

/// Result of [`ReviewCoordinator::bulk_deactivate_team`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkDeactivation {
    pub team_name: TeamName,
    pub deactivated: Vec<UserId>,
    pub reassigned: Vec<PullRequestReassignment>,
    /// Pull requests skipped because their author or the author's team
    /// could not be resolved.
    pub skipped: Vec<PullRequestId>,
    pub duration_ms: u64,
}

impl<S> ReviewCoordinator<S>
where
    S: ReviewStore + ?Sized,
{
    /// Deactivate every active member of `team_name`, reassigning their
    /// open reviews first.
    pub async fn bulk_deactivate_team(
        &self,
        team_name: &TeamName,
    ) -> Result<BulkDeactivation, EngineError> {
        let started = Instant::now();
        let team = self
            .store
            .get_team(team_name)
            .await?
            .ok_or_else(|| EngineError::NotFound("team not found".into()))?;

        let leaving: Vec<UserId> = team.active_members().map(|m| m.id).collect();
        if leaving.is_empty() {
            tracing::info!(team = %team_name, "no active members to deactivate");
            return Ok(BulkDeactivation {
                team_name: team.name,
                deactivated: Vec::new(),
                reassigned: Vec::new(),
                skipped: Vec::new(),
                duration_ms: elapsed_ms(started),
            });
        }
        let leaving_set: HashSet<UserId> = leaving.iter().copied().collect();

        let open = self.store.open_with_reviewers_in(&leaving).await?;
        let mut batch = Vec::new();
        let mut reassigned = Vec::new();
        let mut skipped = Vec::new();

        for pr in open {
            match self.plan_pull_request(&pr, &leaving_set).await? {
                Some(plan) => {
                    batch.extend(plan.swaps.iter().map(|swap| ReviewerReassignment {
                        pull_request_id: pr.id.clone(),
                        old_reviewer_id: swap.old_reviewer_id,
                        new_reviewer_id: swap.new_reviewer_id,
                    }));
                    if !plan.swaps.is_empty() || !plan.unreplaced.is_empty() {
                        reassigned.push(plan);
                    }
                }
                None => skipped.push(pr.id),
            }
        }

        let deactivated = self
            .store
            .commit_team_deactivation(team_name, &leaving, &batch)
            .await
            .map_err(|err| {
                tracing::error!(team = %team_name, error = %err, "deactivation batch rolled back");
                match err {
                    StoreError::Stale { .. } => EngineError::Internal(err.to_string()),
                    other => EngineError::from(other),
                }
            })?;

        let shortfall: usize = reassigned.iter().map(|r| r.unreplaced.len()).sum();
        tracing::info!(
            team = %team_name,
            deactivated = deactivated.len(),
            reassignments = batch.len(),
            shortfall,
            skipped = skipped.len(),
            "team deactivated"
        );

        Ok(BulkDeactivation {
            team_name: team.name,
            deactivated,
            reassigned,
            skipped,
            duration_ms: elapsed_ms(started),
        })
    }

    /// Pair each reviewer of `pr` in `leaving` with a fresh candidate from
    /// the author's team. `None` when the author or their team is unknown.
    async fn plan_pull_request(
        &self,
        pr: &PullRequest,
        leaving: &HashSet<UserId>,
    ) -> Result<Option<PullRequestReassignment>, EngineError> {
        let Some(author) = self.store.get_user(&pr.author_id).await? else {
            tracing::warn!(pr_id = %pr.id, author = %pr.author_id, "author not found, skipping");
            return Ok(None);
        };
        let Some(author_team) = self.store.get_team(&author.team_name).await? else {
            tracing::warn!(pr_id = %pr.id, team = %author.team_name, "author team not found, skipping");
            return Ok(None);
        };

        let to_replace: Vec<UserId> = pr
            .reviewers
            .iter()
            .filter(|r| leaving.contains(*r))
            .copied()
            .collect();

        // Members about to go inactive are never candidates.
        let mut exclude: HashSet<UserId> = pr.reviewers.iter().copied().collect();
        exclude.insert(pr.author_id);
        exclude.extend(leaving.iter().copied());
        let candidates = self
            .selector
            .pick_from_team(&author_team, &exclude, to_replace.len());

        let mut staged = pr.clone();
        let mut swaps = Vec::with_capacity(candidates.len());
        for (old, new) in to_replace.iter().zip(&candidates) {
            staged.replace_reviewer(old, new)?;
            swaps.push(ReviewerSwap {
                old_reviewer_id: *old,
                new_reviewer_id: *new,
            });
        }
        let unreplaced = to_replace[swaps.len()..].to_vec();
        if !unreplaced.is_empty() {
            tracing::warn!(pr_id = %pr.id, unreplaced = unreplaced.len(), "not enough replacement candidates");
        }

        Ok(Some(PullRequestReassignment {
            pull_request_id: pr.id.clone(),
            swaps,
            unreplaced,
        }))
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::testing::*;
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::ports::{Directory, PullRequestStore, UserLookup};

    fn team(name: &str) -> TeamName {
        TeamName::new(name).unwrap()
    }

    #[tokio::test]
    async fn cross_team_reviewers_replaced_from_author_team() {
        // T = {A, B, C}; B and C review PRs authored in team "authors".
        let store = Arc::new(InMemoryStore::new());
        let t = seed_team(&store, "t", 3).await;
        let authors = seed_team(&store, "authors", 4).await;
        let pr1 = seed_pr(&store, "pr-1", authors[0], &[t[1]]).await;
        let pr2 = seed_pr(&store, "pr-2", authors[1], &[t[2], authors[2]]).await;
        let coordinator = coordinator(Arc::clone(&store), 8);

        let result = coordinator.bulk_deactivate_team(&team("t")).await.unwrap();

        let mut deactivated = result.deactivated.clone();
        deactivated.sort();
        let mut expected = t.clone();
        expected.sort();
        assert_eq!(deactivated, expected);
        assert_eq!(result.reassigned.len(), 2);

        for pr_id in [&pr1, &pr2] {
            let pr = store.get_pull_request(pr_id).await.unwrap().unwrap();
            for reviewer in &pr.reviewers {
                assert!(authors.contains(reviewer));
                assert_ne!(*reviewer, pr.author_id);
                let user = store.get_user(reviewer).await.unwrap().unwrap();
                assert!(user.is_active);
            }
        }
        let pr2_now = store.get_pull_request(&pr2).await.unwrap().unwrap();
        assert_eq!(pr2_now.reviewers[1], authors[2]);
        assert_ne!(pr2_now.reviewers[0], authors[2]);

        for id in &t {
            assert!(!store.get_user(id).await.unwrap().unwrap().is_active);
        }
    }

    #[tokio::test]
    async fn no_active_members_is_a_no_op() {
        let store = Arc::new(InMemoryStore::new());
        let t = seed_team(&store, "t", 2).await;
        let authors = seed_team(&store, "authors", 3).await;
        for id in &t {
            store.set_is_active(id, false).await.unwrap();
        }
        let pr_id = seed_pr(&store, "pr-1", authors[0], &[t[0]]).await;
        let writes_before = store.write_count();
        let coordinator = coordinator(Arc::clone(&store), 1);

        let result = coordinator.bulk_deactivate_team(&team("t")).await.unwrap();

        assert!(result.deactivated.is_empty());
        assert!(result.reassigned.is_empty());
        assert_eq!(store.write_count(), writes_before);
        let pr = store.get_pull_request(&pr_id).await.unwrap().unwrap();
        assert_eq!(pr.reviewers, vec![t[0]]);
    }

    #[tokio::test]
    async fn unknown_team_is_not_found() {
        let coordinator = coordinator(Arc::new(InMemoryStore::new()), 1);
        let err = coordinator.bulk_deactivate_team(&team("ghost")).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn shortfall_is_reported_and_reviewer_kept() {
        // Author's team has nobody else: the reviewer cannot be replaced.
        let store = Arc::new(InMemoryStore::new());
        let t = seed_team(&store, "t", 1).await;
        let authors = seed_team(&store, "authors", 1).await;
        let pr_id = seed_pr(&store, "pr-1", authors[0], &[t[0]]).await;
        let coordinator = coordinator(Arc::clone(&store), 1);

        let result = coordinator.bulk_deactivate_team(&team("t")).await.unwrap();

        assert_eq!(result.deactivated, vec![t[0]]);
        assert_eq!(result.reassigned.len(), 1);
        assert!(result.reassigned[0].swaps.is_empty());
        assert_eq!(result.reassigned[0].unreplaced, vec![t[0]]);
        let pr = store.get_pull_request(&pr_id).await.unwrap().unwrap();
        assert_eq!(pr.reviewers, vec![t[0]]);
    }

    #[tokio::test]
    async fn same_team_authors_never_get_leaving_members() {
        // Author belongs to the team being deactivated: nobody in it may
        // take over, since they all go inactive.
        let store = Arc::new(InMemoryStore::new());
        let t = seed_team(&store, "t", 4).await;
        let pr_id = seed_pr(&store, "pr-1", t[0], &[t[1]]).await;
        let coordinator = coordinator(Arc::clone(&store), 1);

        let result = coordinator.bulk_deactivate_team(&team("t")).await.unwrap();

        assert_eq!(result.reassigned[0].unreplaced, vec![t[1]]);
        let pr = store.get_pull_request(&pr_id).await.unwrap().unwrap();
        assert_eq!(pr.reviewers, vec![t[1]]);
    }

    #[tokio::test]
    async fn merged_prs_are_left_alone() {
        let store = Arc::new(InMemoryStore::new());
        let t = seed_team(&store, "t", 1).await;
        let authors = seed_team(&store, "authors", 3).await;
        let pr_id = seed_pr(&store, "pr-1", authors[0], &[t[0]]).await;
        let coordinator = coordinator(Arc::clone(&store), 1);
        coordinator.merge(&pr_id).await.unwrap();

        let result = coordinator.bulk_deactivate_team(&team("t")).await.unwrap();

        assert!(result.reassigned.is_empty());
        let pr = store.get_pull_request(&pr_id).await.unwrap().unwrap();
        assert_eq!(pr.reviewers, vec![t[0]]);
    }

    #[tokio::test]
    async fn unresolvable_author_is_skipped() {
        let store = Arc::new(InMemoryStore::new());
        let t = seed_team(&store, "t", 1).await;
        let authors = seed_team(&store, "authors", 2).await;
        let orphan = seed_pr(&store, "pr-orphan", UserId::new(), &[t[0]]).await;
        let fine = seed_pr(&store, "pr-fine", authors[0], &[t[0]]).await;
        let coordinator = coordinator(Arc::clone(&store), 1);

        let result = coordinator.bulk_deactivate_team(&team("t")).await.unwrap();

        assert_eq!(result.skipped, vec![orphan]);
        assert_eq!(result.reassigned.len(), 1);
        assert_eq!(result.reassigned[0].pull_request_id, fine);
        assert_eq!(result.reassigned[0].swaps[0].new_reviewer_id, authors[1]);
    }

    #[tokio::test]
    async fn failed_batch_rolls_back_everything() {
        let store = Arc::new(InMemoryStore::new());
        let t = seed_team(&store, "t", 2).await;
        let authors = seed_team(&store, "authors", 4).await;
        let pr1 = seed_pr(&store, "pr-1", authors[0], &[t[0]]).await;
        let pr2 = seed_pr(&store, "pr-2", authors[1], &[t[1]]).await;
        store.fail_next_write();
        let coordinator = coordinator(Arc::clone(&store), 1);

        let err = coordinator.bulk_deactivate_team(&team("t")).await.unwrap_err();
        assert!(matches!(err, EngineError::Internal(_)));

        assert_eq!(store.get_pull_request(&pr1).await.unwrap().unwrap().reviewers, vec![t[0]]);
        assert_eq!(store.get_pull_request(&pr2).await.unwrap().unwrap().reviewers, vec![t[1]]);
        for id in &t {
            assert!(store.get_user(id).await.unwrap().unwrap().is_active);
        }
    }

    #[tokio::test]
    async fn bulk_replacements_respect_invariants_across_seeds() {
        for seed in 0..16 {
            let store = Arc::new(InMemoryStore::new());
            let t = seed_team(&store, "t", 3).await;
            let authors = seed_team(&store, "authors", 5).await;
            let ids = [
                seed_pr(&store, "pr-1", authors[0], &[t[0], t[1]]).await,
                seed_pr(&store, "pr-2", authors[1], &[authors[2], t[2]]).await,
                seed_pr(&store, "pr-3", authors[3], &[t[1]]).await,
            ];
            let coordinator = coordinator(Arc::clone(&store), seed);

            let result = coordinator.bulk_deactivate_team(&team("t")).await.unwrap();

            for entry in &result.reassigned {
                let pr = store.get_pull_request(&entry.pull_request_id).await.unwrap().unwrap();
                for swap in &entry.swaps {
                    assert_ne!(swap.new_reviewer_id, pr.author_id);
                    let user = store.get_user(&swap.new_reviewer_id).await.unwrap().unwrap();
                    assert!(user.is_active);
                }
                let unique: HashSet<&UserId> = pr.reviewers.iter().collect();
                assert_eq!(unique.len(), pr.reviewers.len());
            }
            for id in &ids {
                let pr = store.get_pull_request(id).await.unwrap().unwrap();
                assert!(pr.reviewers.iter().all(|r| !t.contains(r)));
            }
        }
    }
}
