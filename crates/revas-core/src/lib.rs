//! # revas-core: Foundational Types for the Reviewer Service
//!
//! Defines the identifier newtypes and directory records shared by every
//! other crate in the workspace. It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `UserId`, `TeamName` and
//!    `PullRequestId` are distinct types with validated constructors. A
//!    team name can never be passed where a pull request id is expected.
//!
//! 2. **Validation at the edge.** Every constructor that accepts caller
//!    input returns `Result<_, ValidationError>`; once a value exists it is
//!    known to be well-formed.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `revas-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod directory;
pub mod error;
pub mod identity;
pub mod reassignment;

pub use directory::{Team, TeamMember, User};
pub use error::ValidationError;
pub use identity::{PullRequestId, TeamName, UserId, MAX_IDENTIFIER_LEN};
pub use reassignment::ReviewerReassignment;
