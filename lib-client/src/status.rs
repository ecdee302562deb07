//! Submission phases and results exposed to the UI

use serde::{Deserialize, Serialize};

use lib_governance::VotePayload;
use lib_types::{Address, Epoch, TxHash};

use crate::error::VoteFailure;

/// Progress of the active submission attempt
///
/// ```text
/// Idle -> Preparing -> CheckingNetwork -> AwaitingSignature -> Broadcasting
///      -> Confirming -> Confirmed
///                    -> PendingConfirmation (polling exhausted, re-pollable)
/// any phase -> Failed(reason)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionPhase {
    Idle,
    /// Checking the allocation and wallet, building the payload
    Preparing,
    /// Verifying or switching the wallet's chain, obtaining a signer
    CheckingNetwork,
    /// Wallet prompt open
    AwaitingSignature,
    /// Transaction accepted, recording it locally
    Broadcasting,
    /// Polling for inclusion
    Confirming { tx_hash: TxHash },
    /// Polling ran out without a result; check back later
    PendingConfirmation { tx_hash: TxHash },
    Confirmed { tx_hash: TxHash },
    Failed(VoteFailure),
}

impl SubmissionPhase {
    /// Short label for progress displays and logs
    pub fn label(&self) -> &'static str {
        match self {
            SubmissionPhase::Idle => "idle",
            SubmissionPhase::Preparing => "preparing",
            SubmissionPhase::CheckingNetwork => "checking_network",
            SubmissionPhase::AwaitingSignature => "awaiting_signature",
            SubmissionPhase::Broadcasting => "broadcasting",
            SubmissionPhase::Confirming { .. } => "confirming",
            SubmissionPhase::PendingConfirmation { .. } => "pending_confirmation",
            SubmissionPhase::Confirmed { .. } => "confirmed",
            SubmissionPhase::Failed(_) => "failed",
        }
    }

    /// Transaction this phase refers to, once one exists
    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            SubmissionPhase::Confirming { tx_hash }
            | SubmissionPhase::PendingConfirmation { tx_hash }
            | SubmissionPhase::Confirmed { tx_hash } => Some(*tx_hash),
            _ => None,
        }
    }

    /// Success or failure; nothing further will happen for this attempt
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmissionPhase::Confirmed { .. } | SubmissionPhase::Failed(_)
        )
    }
}

/// Result of waiting for (or re-checking) a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmationStatus {
    Confirmed { tx_hash: TxHash },
    /// Not resolved yet; not an error
    StillPending { tx_hash: TxHash, attempts: u32 },
    /// Local polling abandoned; the transaction is unaffected
    Cancelled { tx_hash: TxHash },
}

impl ConfirmationStatus {
    pub fn tx_hash(&self) -> TxHash {
        match self {
            ConfirmationStatus::Confirmed { tx_hash }
            | ConfirmationStatus::StillPending { tx_hash, .. }
            | ConfirmationStatus::Cancelled { tx_hash } => *tx_hash,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, ConfirmationStatus::Confirmed { .. })
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            ConfirmationStatus::Confirmed { .. } => "Your vote has been recorded on the blockchain.",
            ConfirmationStatus::StillPending { .. } => {
                "Your vote is still pending. Check back later using the transaction link."
            }
            ConfirmationStatus::Cancelled { .. } => {
                "Stopped watching your vote. It stays valid on-chain; check its status from your history."
            }
        }
    }
}

/// Returned by a submission as soon as the network accepts the transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub tx_hash: TxHash,
    pub voter: Address,
    /// Payload exactly as sent
    pub payload: VotePayload,
    pub epoch: Option<Epoch>,
    /// Block explorer link for the transaction
    pub explorer_url: String,
}
