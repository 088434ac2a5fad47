//! # revas-engine: Reviewer Assignment Engine
//!
//! Assigns reviewers to pull requests and rebalances those assignments when
//! reviewers become unavailable, either one at a time or through a
//! team-wide deactivation cascade.
//!
//! ## Architecture
//!
//! ```text
//! ReviewCoordinator ──▶ UserLookup        (who is on which team, who is active)
//!        │          ──▶ PullRequestStore  (pull requests and reviewer slots)
//!        │          ──▶ ReviewerSelector  (unbiased random choice, CPU only)
//!        └──────────▶ revas-state          (OPEN/MERGED guards)
//! ```
//!
//! Storage is reached only through the traits in [`ports`]. The
//! coordinator keeps no state across calls apart from the injected random
//! source; every operation re-reads current truth from the store.
//!
//! [`InMemoryStore`] implements every port and backs tests and the
//! database-less development mode of the HTTP service.

pub mod coordinator;
pub mod error;
pub mod memory;
pub mod ports;
pub mod selector;

pub use coordinator::{
    BulkDeactivation, CreatePullRequest, PullRequestReassignment, ReassignOutcome,
    ReviewCoordinator, ReviewerSwap,
};
pub use error::{ConflictKind, EngineError};
pub use memory::InMemoryStore;
pub use ports::{
    Directory, PullRequestStats, PullRequestStore, ReplaceOutcome, ReviewStore,
    StatisticsSource, StoreError, UserAssignmentStat, UserLookup,
};
pub use selector::{select, ReviewerSelector};
