//! Vote record audit log
//!
//! One record per submission attempt that obtained a transaction hash.
//! Records are appended when the vote is broadcast and updated in place
//! (keyed by transaction hash) as confirmation resolves. Nothing is ever
//! removed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use lib_governance::AllocationSnapshot;
use lib_types::{Address, Epoch, Points, ProjectId, TxHash};

use crate::error::{ClientError, Result};
use crate::store::RecordStore;

/// Store key holding the serialized log
pub const RECORD_LOG_KEY: &str = "vote_records";

/// Confirmation state of a recorded vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Pending,
    Confirmed,
    Failed,
}

/// Audit entry for one broadcast vote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    /// Voting account
    pub voter: Address,
    /// Allocations exactly as submitted
    pub allocations: BTreeMap<ProjectId, Points>,
    /// Broadcast time (Unix seconds)
    pub timestamp: u64,
    /// Transaction carrying the vote
    pub tx_hash: TxHash,
    pub status: RecordStatus,
    /// Voting round, when the contract reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch: Option<Epoch>,
    /// Blake3 digest of the submitted payload bytes
    pub payload_digest: [u8; 32],
}

impl VoteRecord {
    /// New `pending` record stamped with the current time
    pub fn pending(
        voter: Address,
        snapshot: &AllocationSnapshot,
        tx_hash: TxHash,
        epoch: Option<Epoch>,
        payload_digest: [u8; 32],
    ) -> Self {
        Self {
            voter,
            allocations: snapshot.as_map().clone(),
            timestamp: current_timestamp(),
            tx_hash,
            status: RecordStatus::Pending,
            epoch,
            payload_digest,
        }
    }

    /// Sum of recorded allocations, widened so a tampered log cannot overflow
    pub fn total_points(&self) -> u64 {
        self.allocations.values().map(|p| u64::from(*p)).sum()
    }
}

/// In-memory log mirrored to a [`RecordStore`] after every change
pub struct VoteRecordLog {
    store: Arc<dyn RecordStore>,
    records: Vec<VoteRecord>,
}

impl VoteRecordLog {
    /// Read the log from `store` (empty if never written)
    pub fn load(store: Arc<dyn RecordStore>) -> Result<Self> {
        let records = match store.get(RECORD_LOG_KEY)? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => Vec::new(),
        };
        Ok(Self { store, records })
    }

    /// Append a record and write the log back
    ///
    /// A second record for the same transaction hash is refused. On a store
    /// failure the record stays in memory and the error is returned.
    pub fn append(&mut self, record: VoteRecord) -> Result<()> {
        if self.get(&record.tx_hash).is_some() {
            return Err(ClientError::StorageError(format!(
                "Vote record for {} already exists",
                record.tx_hash
            )));
        }
        self.records.push(record);
        self.persist()
    }

    /// Set the status of the record for `tx_hash` and write the log back
    ///
    /// Returns `Ok(false)` when no such record exists.
    pub fn update_status(&mut self, tx_hash: &TxHash, status: RecordStatus) -> Result<bool> {
        let Some(record) = self.records.iter_mut().find(|r| &r.tx_hash == tx_hash) else {
            return Ok(false);
        };
        if record.status == status {
            return Ok(true);
        }
        record.status = status;
        self.persist()?;
        Ok(true)
    }

    pub fn get(&self, tx_hash: &TxHash) -> Option<&VoteRecord> {
        self.records.iter().find(|r| &r.tx_hash == tx_hash)
    }

    /// All records in submission order
    pub fn records(&self) -> &[VoteRecord] {
        &self.records
    }

    /// Records still awaiting confirmation
    pub fn pending(&self) -> impl Iterator<Item = &VoteRecord> {
        self.records
            .iter()
            .filter(|r| r.status == RecordStatus::Pending)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn persist(&self) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&self.records)?;
        self.store.put(RECORD_LOG_KEY, &bytes)
    }
}

/// Current Unix timestamp in seconds
fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
