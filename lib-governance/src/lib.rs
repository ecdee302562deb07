//! Impact Fund Governance - Fixed-Budget Vote Allocation
//!
//! This crate holds the client-side rules for distributing a voter's point
//! budget across impactor projects, and the canonical payload the governance
//! contract receives.
//!
//! # Key Principles
//!
//! 1. **Budget is never exceeded**: every adjustment is clamped so the total
//!    allocation stays within the budget at every observable point
//! 2. **Clamp, don't reject**: out-of-range requests are normalized silently;
//!    the engine has no error path
//! 3. **No proactive redistribution**: freeing points on one project never
//!    moves them to another
//! 4. **Canonical payloads**: equal allocations always serialize to identical
//!    bytes, with ids and points in matching ascending-id order
//!
//! # Usage
//!
//! ```ignore
//! use lib_governance::{AllocationEngine, VotePayload};
//! use lib_types::ProjectId;
//!
//! let mut engine = AllocationEngine::new(100);
//! engine.set_allocation(ProjectId(1), 40);
//! let granted = engine.set_allocation(ProjectId(2), 90); // clamped to 60
//! assert_eq!(engine.remaining_budget(), 0);
//!
//! let payload = VotePayload::from_snapshot(&engine.snapshot());
//! ```

pub mod allocation;
pub mod payload;
pub mod errors;

pub use allocation::{AllocationEngine, AllocationSnapshot, DEFAULT_BUDGET};
pub use payload::VotePayload;
pub use errors::{GovernanceError, GovernanceResult};
