//! In-memory implementation of every storage port.
//!
//! All state lives behind one `parking_lot::RwLock` and is lost on restart.
//! Locks are taken inside synchronous helpers and never held across an
//! await point. Batches are applied to a copy of the pull request table
//! which replaces the original only when every command succeeded.
//!
//! Used by tests and by the HTTP service when no database is configured.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};

use revas_core::{PullRequestId, ReviewerReassignment, Team, TeamMember, TeamName, User, UserId};
use revas_state::{LifecycleError, PullRequest, PullRequestStatus};

use crate::ports::{
    Directory, PullRequestStats, PullRequestStore, ReplaceOutcome, ReviewStore,
    StatisticsSource, StoreError, UserAssignmentStat, UserLookup,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    teams: HashSet<TeamName>,
    users: HashMap<UserId, User>,
    /// Insertion order; newest last.
    pull_requests: Vec<PullRequest>,
}

impl Tables {
    fn position(&self, id: &PullRequestId) -> Option<usize> {
        self.pull_requests.iter().position(|pr| pr.id == *id)
    }

    fn pull_request_mut(&mut self, id: &PullRequestId) -> Option<&mut PullRequest> {
        self.pull_requests.iter_mut().find(|pr| pr.id == *id)
    }

    /// Newest first, ties broken by insertion order.
    fn newest_first(&self, keep: impl Fn(&PullRequest) -> bool) -> Vec<PullRequest> {
        let mut prs: Vec<PullRequest> = self
            .pull_requests
            .iter()
            .rev()
            .filter(|pr| keep(pr))
            .cloned()
            .collect();
        prs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        prs
    }
}

/// Apply `batch` to `prs` in order, failing on the first stale command.
fn apply_batch(
    prs: &mut [PullRequest],
    batch: &[ReviewerReassignment],
) -> Result<(), StoreError> {
    for command in batch {
        let stale = || StoreError::Stale {
            pull_request_id: command.pull_request_id.clone(),
            old_reviewer_id: command.old_reviewer_id,
        };
        let pr = prs
            .iter_mut()
            .find(|pr| pr.id == command.pull_request_id)
            .ok_or_else(stale)?;
        pr.replace_reviewer(&command.old_reviewer_id, &command.new_reviewer_id)
            .map_err(|_| stale())?;
    }
    Ok(())
}

/// In-memory review store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    /// Writes to let through before the next one fails.
    fail_after: Mutex<Option<usize>>,
    writes: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next write operation fail with a backend error.
    pub fn fail_next_write(&self) {
        self.fail_write_after(0);
    }

    /// Let `n` writes succeed, then fail the one after.
    pub fn fail_write_after(&self, n: usize) {
        *self.fail_after.lock() = Some(n);
    }

    /// Number of write operations committed so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn begin_write(&self) -> Result<(), StoreError> {
        let mut fault = self.fail_after.lock();
        match *fault {
            Some(0) => {
                *fault = None;
                Err(StoreError::Backend("injected write failure".into()))
            }
            Some(n) => {
                *fault = Some(n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Run `f` under the write lock and count it if it succeeds.
    fn write<T>(
        &self,
        f: impl FnOnce(&mut Tables) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        self.begin_write()?;
        let result = f(&mut self.tables.write());
        if result.is_ok() {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        result
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        f(&self.tables.read())
    }
}

#[async_trait]
impl UserLookup for InMemoryStore {
    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read(|t| t.users.get(id).cloned()))
    }

    async fn get_team(&self, name: &TeamName) -> Result<Option<Team>, StoreError> {
        Ok(self.read(|t| {
            if !t.teams.contains(name) {
                return None;
            }
            let mut members: Vec<TeamMember> = t
                .users
                .values()
                .filter(|u| u.team_name == *name)
                .cloned()
                .map(TeamMember::from)
                .collect();
            members.sort_by(|a, b| a.username.cmp(&b.username).then(a.id.cmp(&b.id)));
            Some(Team {
                name: name.clone(),
                members,
            })
        }))
    }
}

#[async_trait]
impl Directory for InMemoryStore {
    async fn add_team(&self, team: &Team) -> Result<(), StoreError> {
        self.write(|t| {
            if !t.teams.insert(team.name.clone()) {
                return Err(StoreError::TeamExists(team.name.clone()));
            }
            for member in &team.members {
                t.users
                    .insert(member.id, member.clone().into_user(&team.name));
            }
            Ok(())
        })
    }

    async fn set_is_active(
        &self,
        id: &UserId,
        is_active: bool,
    ) -> Result<Option<User>, StoreError> {
        self.write(|t| {
            Ok(t.users.get_mut(id).map(|user| {
                user.is_active = is_active;
                user.clone()
            }))
        })
    }
}

#[async_trait]
impl PullRequestStore for InMemoryStore {
    async fn create_pull_request(&self, pr: &PullRequest) -> Result<(), StoreError> {
        self.write(|t| {
            if t.position(&pr.id).is_some() {
                return Err(StoreError::DuplicatePullRequest(pr.id.clone()));
            }
            t.pull_requests.push(pr.clone());
            Ok(())
        })
    }

    async fn get_pull_request(
        &self,
        id: &PullRequestId,
    ) -> Result<Option<PullRequest>, StoreError> {
        Ok(self.read(|t| t.position(id).map(|i| t.pull_requests[i].clone())))
    }

    async fn assign_reviewers(
        &self,
        id: &PullRequestId,
        reviewers: &[UserId],
    ) -> Result<(), StoreError> {
        self.write(|t| {
            let pr = t
                .pull_request_mut(id)
                .ok_or_else(|| StoreError::Backend(format!("pull request {id} not found")))?;
            pr.attach_reviewers(reviewers)
                .map_err(|err| StoreError::Backend(err.to_string()))
        })
    }

    async fn mark_merged(
        &self,
        id: &PullRequestId,
        at: DateTime<Utc>,
    ) -> Result<Option<PullRequest>, StoreError> {
        self.write(|t| {
            Ok(t.pull_request_mut(id).map(|pr| {
                pr.merge(at);
                pr.clone()
            }))
        })
    }

    async fn replace_reviewer(
        &self,
        reassignment: &ReviewerReassignment,
    ) -> Result<ReplaceOutcome, StoreError> {
        self.write(|t| {
            let Some(pr) = t.pull_request_mut(&reassignment.pull_request_id) else {
                return Ok(ReplaceOutcome::Missing);
            };
            let outcome = match pr.replace_reviewer(
                &reassignment.old_reviewer_id,
                &reassignment.new_reviewer_id,
            ) {
                Ok(_) => ReplaceOutcome::Replaced,
                Err(LifecycleError::Merged { .. }) => ReplaceOutcome::Merged,
                Err(_) => ReplaceOutcome::Stale,
            };
            Ok(outcome)
        })
    }

    async fn open_with_reviewers_in(
        &self,
        reviewers: &[UserId],
    ) -> Result<Vec<PullRequest>, StoreError> {
        let wanted: HashSet<&UserId> = reviewers.iter().collect();
        Ok(self.read(|t| {
            t.newest_first(|pr| pr.is_open() && pr.reviewers.iter().any(|r| wanted.contains(r)))
        }))
    }

    async fn apply_reassignments(
        &self,
        batch: &[ReviewerReassignment],
    ) -> Result<(), StoreError> {
        self.write(|t| {
            let mut staged = t.pull_requests.clone();
            apply_batch(&mut staged, batch)?;
            t.pull_requests = staged;
            Ok(())
        })
    }

    async fn reviewed_by(&self, reviewer: &UserId) -> Result<Vec<PullRequest>, StoreError> {
        Ok(self.read(|t| t.newest_first(|pr| pr.has_reviewer(reviewer))))
    }
}

#[async_trait]
impl StatisticsSource for InMemoryStore {
    async fn user_assignment_stats(&self) -> Result<Vec<UserAssignmentStat>, StoreError> {
        Ok(self.read(|t| {
            let mut counts: HashMap<UserId, u64> = HashMap::new();
            for reviewer in t.pull_requests.iter().flat_map(|pr| pr.reviewers.iter()) {
                *counts.entry(*reviewer).or_default() += 1;
            }
            let mut stats: Vec<UserAssignmentStat> = t
                .users
                .values()
                .map(|u| UserAssignmentStat {
                    user_id: u.id,
                    username: u.username.clone(),
                    assignment_count: counts.get(&u.id).copied().unwrap_or(0),
                })
                .collect();
            stats.sort_by(|a, b| {
                b.assignment_count
                    .cmp(&a.assignment_count)
                    .then_with(|| a.username.cmp(&b.username))
            });
            stats
        }))
    }

    async fn pull_request_stats(&self) -> Result<PullRequestStats, StoreError> {
        Ok(self.read(|t| {
            let mut stats = PullRequestStats::default();
            for pr in &t.pull_requests {
                stats.total += 1;
                match pr.status {
                    PullRequestStatus::Open => stats.open += 1,
                    PullRequestStatus::Merged => stats.merged += 1,
                }
                stats.total_assignments += pr.reviewers.len() as u64;
            }
            stats
        }))
    }
}

#[async_trait]
impl ReviewStore for InMemoryStore {
    async fn commit_team_deactivation(
        &self,
        team: &TeamName,
        users: &[UserId],
        batch: &[ReviewerReassignment],
    ) -> Result<Vec<UserId>, StoreError> {
        self.write(|t| {
            let mut staged = t.pull_requests.clone();
            apply_batch(&mut staged, batch)?;
            t.pull_requests = staged;

            let mut deactivated = Vec::new();
            for id in users {
                if let Some(user) = t.users.get_mut(id) {
                    if user.team_name == *team && user.is_active {
                        user.is_active = false;
                        deactivated.push(*id);
                    }
                }
            }
            Ok(deactivated)
        })
    }
}
