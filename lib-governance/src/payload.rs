//! Canonical Vote Payload
//!
//! The governance contract takes `vote(uint256[] impactorIds, uint256[] points)`.
//! The two sequences are positional: entry `i` of `points` belongs to entry `i`
//! of `project_ids`. Any drift between them corrupts the recorded vote, so the
//! payload is only ever built in ascending project-id order and re-validated
//! whenever it is rebuilt from parts or bytes.

use serde::{Deserialize, Serialize};

use lib_types::{Points, ProjectId};

use crate::allocation::AllocationSnapshot;
use crate::errors::{GovernanceError, GovernanceResult};

/// Domain separator for payload digests
const PAYLOAD_DIGEST_DOMAIN: &[u8] = b"IMPACT_FUND_VOTE_PAYLOAD_V1";

/// Two parallel, equal-length sequences in matching ascending-id order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotePayload {
    project_ids: Vec<ProjectId>,
    points: Vec<Points>,
}

impl VotePayload {
    /// Build from a snapshot
    ///
    /// Snapshots store only non-zero allocations in a `BTreeMap`, so the
    /// iteration order is already the canonical order.
    pub fn from_snapshot(snapshot: &AllocationSnapshot) -> Self {
        let (project_ids, points) = snapshot.iter().unzip();
        Self { project_ids, points }
    }

    /// Rebuild from raw parts, enforcing the payload contract
    pub fn from_parts(project_ids: Vec<ProjectId>, points: Vec<Points>) -> GovernanceResult<Self> {
        let payload = Self { project_ids, points };
        payload.validate()?;
        Ok(payload)
    }

    /// Check equal lengths, strictly ascending ids and non-zero points
    pub fn validate(&self) -> GovernanceResult<()> {
        if self.project_ids.len() != self.points.len() {
            return Err(GovernanceError::LengthMismatch {
                project_ids: self.project_ids.len(),
                points: self.points.len(),
            });
        }

        for pair in self.project_ids.windows(2) {
            if pair[0] >= pair[1] {
                return Err(GovernanceError::UnsortedProjects(pair[1]));
            }
        }

        if let Some((id, _)) = self.entries().find(|(_, points)| *points == 0) {
            return Err(GovernanceError::ZeroAllocation(id));
        }

        Ok(())
    }

    /// Project identifiers, ascending
    pub fn project_ids(&self) -> &[ProjectId] {
        &self.project_ids
    }

    /// Point values, positionally matching `project_ids`
    pub fn points(&self) -> &[Points] {
        &self.points
    }

    /// `(project, points)` pairs in payload order
    pub fn entries(&self) -> impl Iterator<Item = (ProjectId, Points)> + '_ {
        self.project_ids.iter().copied().zip(self.points.iter().copied())
    }

    /// Sum of all points (widened so a malformed payload cannot overflow)
    pub fn total_points(&self) -> u64 {
        self.points.iter().map(|p| u64::from(*p)).sum()
    }

    pub fn len(&self) -> usize {
        self.project_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.project_ids.is_empty()
    }

    /// Deterministic byte encoding
    pub fn to_bytes(&self) -> GovernanceResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| GovernanceError::Encoding(e.to_string()))
    }

    /// Decode and validate bytes produced by [`VotePayload::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> GovernanceResult<Self> {
        let payload: Self =
            bincode::deserialize(bytes).map_err(|e| GovernanceError::Encoding(e.to_string()))?;
        payload.validate()?;
        Ok(payload)
    }

    /// Blake3 digest of the canonical encoding
    ///
    /// Equal allocations always produce the same digest, which makes it a
    /// stable key for audit records and logs.
    pub fn digest(&self) -> GovernanceResult<[u8; 32]> {
        let bytes = self.to_bytes()?;

        let mut hasher = blake3::Hasher::new();
        hasher.update(PAYLOAD_DIGEST_DOMAIN);
        hasher.update(&bytes);
        Ok(*hasher.finalize().as_bytes())
    }
}

impl From<&AllocationSnapshot> for VotePayload {
    fn from(snapshot: &AllocationSnapshot) -> Self {
        Self::from_snapshot(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::AllocationEngine;

    fn engine_with(entries: &[(u64, i64)]) -> AllocationEngine {
        let mut engine = AllocationEngine::new(100);
        for (id, points) in entries {
            engine.set_allocation(ProjectId(*id), *points);
        }
        engine
    }

    #[test]
    fn test_payload_sorted_by_project_id() {
        // C:10, A:50, B:40 inserted out of order
        let engine = engine_with(&[(3, 10), (1, 50), (2, 40)]);
        let payload = VotePayload::from_snapshot(&engine.snapshot());

        assert_eq!(payload.project_ids(), &[ProjectId(1), ProjectId(2), ProjectId(3)]);
        assert_eq!(payload.points(), &[50, 40, 10]);
        assert_eq!(payload.total_points(), 100);
    }

    #[test]
    fn test_payload_bytes_decode_and_resum() {
        let engine = engine_with(&[(3, 10), (1, 50), (2, 40)]);
        let payload = engine.snapshot().to_payload();

        let bytes = payload.to_bytes().unwrap();
        let decoded = VotePayload::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, payload);
        assert_eq!(decoded.total_points(), 100);
        assert_eq!(
            decoded.entries().collect::<Vec<_>>(),
            vec![(ProjectId(1), 50), (ProjectId(2), 40), (ProjectId(3), 10)]
        );
    }

    #[test]
    fn test_insertion_order_does_not_change_bytes() {
        let first = engine_with(&[(3, 10), (1, 50), (2, 40)]).snapshot().to_payload();
        let second = engine_with(&[(2, 40), (3, 10), (1, 50)]).snapshot().to_payload();

        assert_eq!(first.to_bytes().unwrap(), second.to_bytes().unwrap());
        assert_eq!(first.digest().unwrap(), second.digest().unwrap());
    }

    #[test]
    fn test_zeroed_projects_are_omitted() {
        let engine = engine_with(&[(1, 60), (2, 40), (5, 0)]);
        let payload = VotePayload::from(&engine.snapshot());
        assert_eq!(payload.len(), 2);
        assert!(!payload.project_ids().contains(&ProjectId(5)));
    }

    #[test]
    fn test_from_parts_rejects_mismatched_lengths() {
        let result = VotePayload::from_parts(vec![ProjectId(1), ProjectId(2)], vec![100]);
        assert_eq!(
            result,
            Err(GovernanceError::LengthMismatch { project_ids: 2, points: 1 })
        );
    }

    #[test]
    fn test_from_parts_rejects_unsorted_or_duplicate_ids() {
        let unsorted = VotePayload::from_parts(vec![ProjectId(2), ProjectId(1)], vec![50, 50]);
        assert_eq!(unsorted, Err(GovernanceError::UnsortedProjects(ProjectId(1))));

        let duplicate = VotePayload::from_parts(vec![ProjectId(4), ProjectId(4)], vec![50, 50]);
        assert_eq!(duplicate, Err(GovernanceError::UnsortedProjects(ProjectId(4))));
    }

    #[test]
    fn test_from_parts_rejects_zero_points() {
        let result = VotePayload::from_parts(vec![ProjectId(1), ProjectId(2)], vec![100, 0]);
        assert_eq!(result, Err(GovernanceError::ZeroAllocation(ProjectId(2))));
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(matches!(
            VotePayload::from_bytes(&[0xff, 0x01]),
            Err(GovernanceError::Encoding(_))
        ));
    }

    #[test]
    fn test_empty_payload() {
        let payload = AllocationEngine::new(100).snapshot().to_payload();
        assert!(payload.is_empty());
        assert_eq!(payload.total_points(), 0);
        assert!(payload.validate().is_ok());
    }
}
