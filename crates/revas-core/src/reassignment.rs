//! Reviewer substitution command.

use serde::{Deserialize, Serialize};

use crate::identity::{PullRequestId, UserId};

/// One reviewer substitution on one pull request.
///
/// The new reviewer takes over the old reviewer's order index. Batches of
/// these are applied atomically by the pull request store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerReassignment {
    pub pull_request_id: PullRequestId,
    pub old_reviewer_id: UserId,
    pub new_reviewer_id: UserId,
}
