//! Governance Errors
//!
//! The allocation engine itself never fails; these errors only arise when a
//! snapshot or vote payload is rebuilt from untrusted parts or bytes.

use thiserror::Error;
use lib_types::{Points, ProjectId};

/// Error during snapshot or vote payload construction or decoding
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    #[error("Payload length mismatch: {project_ids} project ids, {points} point values")]
    LengthMismatch { project_ids: usize, points: usize },

    #[error("Project ids not strictly ascending at {0}")]
    UnsortedProjects(ProjectId),

    #[error("Zero allocation for project {0}")]
    ZeroAllocation(ProjectId),

    #[error("Allocations total {total} points, budget is {budget}")]
    OverBudget { total: u64, budget: Points },

    #[error("Payload encoding error: {0}")]
    Encoding(String),
}

/// Result type for governance operations
pub type GovernanceResult<T> = Result<T, GovernanceError>;
