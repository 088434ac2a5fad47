//! # revas-state: Pull Request Lifecycle
//!
//! The pull request state machine and the reviewer-list invariants that
//! every mutation must respect.
//!
//! ```text
//! OPEN ──merge──▶ MERGED (terminal, merge is idempotent)
//! ```
//!
//! There is no reopen transition. Reviewer mutations (initial attachment,
//! replacement) are only accepted while the pull request is OPEN, never
//! admit the author, never duplicate a reviewer and never exceed
//! [`MAX_REVIEWERS`].

pub mod pull_request;

pub use pull_request::{
    LifecycleError, MergeOutcome, PullRequest, PullRequestStatus, ReviewerAssignment,
    MAX_REVIEWERS,
};
