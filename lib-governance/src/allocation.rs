//! Fixed-Budget Allocation Engine
//!
//! Tracks how many points a voter has assigned to each project. A single
//! mutation, [`AllocationEngine::set_allocation`], clamps every request so the
//! total never exceeds the budget. Excess points are dropped, never moved to
//! another project.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use lib_types::{Points, ProjectId};

use crate::errors::{GovernanceError, GovernanceResult};
use crate::payload::VotePayload;

/// Default voting budget for one round
pub const DEFAULT_BUDGET: Points = 100;

/// Allocation state for one voting session
///
/// Zero allocations are not stored: a project at 0 points is
/// indistinguishable from one that was never touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationEngine {
    /// Total points the voter may distribute
    budget: Points,
    /// Non-zero allocations, ordered by project id
    allocations: BTreeMap<ProjectId, Points>,
    /// Running sum of `allocations`, kept in step with every mutation
    allocated: Points,
}

impl Default for AllocationEngine {
    fn default() -> Self {
        Self::new(DEFAULT_BUDGET)
    }
}

impl AllocationEngine {
    /// Create an empty engine with the given budget
    pub fn new(budget: Points) -> Self {
        Self {
            budget,
            allocations: BTreeMap::new(),
            allocated: 0,
        }
    }

    /// Set the allocation for a project, clamped to what the budget allows
    ///
    /// The stored value is `min(max(requested, 0), budget - others)` where
    /// `others` is the sum of every other project's allocation. Negative
    /// requests clamp to 0. The return value is the stored allocation and is
    /// what a caller should display, not its own request.
    ///
    /// Never fails. Calling again with the returned value is a no-op.
    pub fn set_allocation(&mut self, project: ProjectId, requested: i64) -> Points {
        let current = self.allocation(project);
        let others = self.allocated - current;
        let max_allowed = self.budget - others;

        let requested = requested.clamp(0, Points::MAX as i64) as Points;
        let granted = requested.min(max_allowed);

        if granted < requested {
            tracing::debug!(
                "Allocation for project {} clamped: requested {}, granted {} (others hold {})",
                project,
                requested,
                granted,
                others
            );
        }

        if granted == 0 {
            self.allocations.remove(&project);
        } else {
            self.allocations.insert(project, granted);
        }
        self.allocated = others + granted;

        granted
    }

    /// Current allocation for a project (0 if never set)
    pub fn allocation(&self, project: ProjectId) -> Points {
        self.allocations.get(&project).copied().unwrap_or(0)
    }

    /// Points not yet allocated, always within `[0, budget]`
    pub fn remaining_budget(&self) -> Points {
        self.budget - self.allocated
    }

    /// Clear all allocations for a new voting session
    pub fn reset(&mut self) {
        self.allocations.clear();
        self.allocated = 0;
    }

    /// Total budget for this session
    pub fn budget(&self) -> Points {
        self.budget
    }

    /// Sum of all allocations
    pub fn total_allocated(&self) -> Points {
        self.allocated
    }

    /// Whether the entire budget has been allocated
    pub fn is_complete(&self) -> bool {
        self.remaining_budget() == 0
    }

    /// Number of projects holding a non-zero allocation
    pub fn project_count(&self) -> usize {
        self.allocations.len()
    }

    /// Non-zero allocations in ascending project order
    pub fn iter(&self) -> impl Iterator<Item = (ProjectId, Points)> + '_ {
        self.allocations.iter().map(|(id, points)| (*id, *points))
    }

    /// Take an immutable copy of the current allocations
    pub fn snapshot(&self) -> AllocationSnapshot {
        AllocationSnapshot {
            budget: self.budget,
            allocations: self.allocations.clone(),
        }
    }
}

/// Point-in-time copy of an engine's allocations
///
/// This is what the submission side reads; it never holds a reference back
/// into the engine. Deserialization enforces the engine's invariants: no
/// zero entries and a total within the budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSnapshot")]
pub struct AllocationSnapshot {
    budget: Points,
    allocations: BTreeMap<ProjectId, Points>,
}

/// Unchecked wire form of [`AllocationSnapshot`]
#[derive(Deserialize)]
struct RawSnapshot {
    budget: Points,
    allocations: BTreeMap<ProjectId, Points>,
}

impl TryFrom<RawSnapshot> for AllocationSnapshot {
    type Error = GovernanceError;

    fn try_from(raw: RawSnapshot) -> GovernanceResult<Self> {
        Self::from_parts(raw.budget, raw.allocations)
    }
}

impl AllocationSnapshot {
    /// Rebuild a snapshot from untrusted parts
    pub fn from_parts(
        budget: Points,
        allocations: BTreeMap<ProjectId, Points>,
    ) -> GovernanceResult<Self> {
        let snapshot = Self { budget, allocations };
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Check for zero entries and a total above the budget
    pub fn validate(&self) -> GovernanceResult<()> {
        if let Some((id, _)) = self.iter().find(|(_, points)| *points == 0) {
            return Err(GovernanceError::ZeroAllocation(id));
        }

        let total = self.total_points();
        if total > u64::from(self.budget) {
            return Err(GovernanceError::OverBudget {
                total,
                budget: self.budget,
            });
        }
        Ok(())
    }

    /// Budget the snapshot was taken under
    pub fn budget(&self) -> Points {
        self.budget
    }

    /// Sum of all allocations (never above the budget)
    pub fn total(&self) -> Points {
        Points::try_from(self.total_points()).unwrap_or(Points::MAX)
    }

    /// Sum of all allocations, widened
    pub fn total_points(&self) -> u64 {
        self.allocations.values().map(|p| u64::from(*p)).sum()
    }

    /// Points not yet allocated
    pub fn remaining(&self) -> Points {
        self.budget.saturating_sub(self.total())
    }

    /// Whether the allocations add up to exactly the budget
    pub fn is_complete(&self) -> bool {
        self.total_points() == u64::from(self.budget)
    }

    /// Allocation for a project (0 if absent)
    pub fn get(&self, project: ProjectId) -> Points {
        self.allocations.get(&project).copied().unwrap_or(0)
    }

    /// Non-zero allocations in ascending project order
    pub fn iter(&self) -> impl Iterator<Item = (ProjectId, Points)> + '_ {
        self.allocations.iter().map(|(id, points)| (*id, *points))
    }

    pub fn len(&self) -> usize {
        self.allocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }

    /// Borrow the underlying map
    pub fn as_map(&self) -> &BTreeMap<ProjectId, Points> {
        &self.allocations
    }

    /// Build the canonical contract payload for this snapshot
    pub fn to_payload(&self) -> VotePayload {
        VotePayload::from_snapshot(self)
    }
}
