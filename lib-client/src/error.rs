//! Error types for the vote submission client
//!
//! Three layers:
//! - [`WalletError`] and [`ChainError`] are what collaborators return. They
//!   are tagged at the boundary so nothing downstream inspects message text.
//! - [`VoteFailure`] is the classified reason a submission ended. Callers
//!   branch on it.
//! - [`ClientError`] covers local plumbing: configuration and the record store.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lib_governance::GovernanceError;
use lib_types::{ChainId, Points};

/// Error reported by the wallet identity provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// No account is connected
    #[error("Wallet not connected")]
    NotConnected,

    /// The user dismissed the wallet prompt
    #[error("Request rejected by user")]
    UserRejected,

    /// The wallet does not know the requested chain
    #[error("Chain {0} not supported by wallet")]
    UnsupportedChain(ChainId),

    /// No signing credential could be derived
    #[error("Signer unavailable: {0}")]
    SignerUnavailable(String),

    #[error("Wallet error: {0}")]
    Other(String),
}

/// Error reported by the governance contract collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// The user rejected the signature prompt
    #[error("Transaction rejected by user")]
    UserRejected,

    /// The contract refused the voter
    #[error("Voter is not allowlisted")]
    NotAllowlisted,

    /// Execution reverted (during estimation or on-chain)
    #[error("Execution reverted: {0}")]
    Reverted(String),

    /// Transport-level failure talking to the node
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Contract error: {0}")]
    Other(String),
}

/// Classified reason a vote submission did not succeed
///
/// Every non-success exit of the submission controller carries exactly one
/// of these.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteFailure {
    #[error("All points must be allocated before submitting ({remaining} remaining)")]
    IncompleteAllocation { remaining: Points },

    /// Allocations break the budget or payload rules (over budget, zero entries)
    #[error("Invalid allocation: {0}")]
    InvalidAllocation(String),

    #[error("Wallet not connected")]
    WalletNotConnected,

    #[error("Wrong network: expected chain {expected}, wallet is on {actual}")]
    WrongNetwork { expected: ChainId, actual: ChainId },

    #[error("Signer unavailable")]
    SignerUnavailable,

    #[error("Voter is not allowlisted")]
    NotAllowlisted,

    #[error("Signature rejected by user")]
    UserRejected,

    #[error("Transaction reverted")]
    TransactionReverted,

    /// Another submission from this controller is still being signed or sent
    #[error("A vote submission is already in progress")]
    SubmissionInProgress,

    /// Unrecognised failure; keeps the underlying diagnostic text
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl VoteFailure {
    /// Stable tag for logs and metrics labels
    pub fn kind(&self) -> &'static str {
        match self {
            VoteFailure::IncompleteAllocation { .. } => "incomplete_allocation",
            VoteFailure::InvalidAllocation(_) => "invalid_allocation",
            VoteFailure::WalletNotConnected => "wallet_not_connected",
            VoteFailure::WrongNetwork { .. } => "wrong_network",
            VoteFailure::SignerUnavailable => "signer_unavailable",
            VoteFailure::NotAllowlisted => "not_allowlisted",
            VoteFailure::UserRejected => "user_rejected",
            VoteFailure::TransactionReverted => "transaction_reverted",
            VoteFailure::SubmissionInProgress => "submission_in_progress",
            VoteFailure::Unknown(_) => "unknown",
        }
    }

    /// Actionable message for the voter
    pub fn user_message(&self) -> &'static str {
        match self {
            VoteFailure::IncompleteAllocation { .. } => {
                "Allocate all of your points across the projects before submitting your vote."
            }
            VoteFailure::InvalidAllocation(_) => {
                "Your allocation is not valid for this round. Reset your points and allocate them again."
            }
            VoteFailure::WalletNotConnected => "Connect your wallet to vote.",
            VoteFailure::WrongNetwork { .. } => {
                "Your wallet is on a different network. Switch to the voting network and try again."
            }
            VoteFailure::SignerUnavailable => {
                "Your wallet could not provide a signer. Unlock your wallet or reconnect it, then try again."
            }
            VoteFailure::NotAllowlisted => {
                "Your wallet is not allowlisted for this vote. Apply for allowlisting on the registration page."
            }
            VoteFailure::UserRejected => {
                "You rejected the signature request. Your allocations are unchanged; submit again when ready."
            }
            VoteFailure::TransactionReverted => {
                "The vote transaction was reverted on-chain. Check your eligibility for this round and submit again."
            }
            VoteFailure::SubmissionInProgress => {
                "A vote is already being submitted. Wait for your wallet to finish before trying again."
            }
            VoteFailure::Unknown(_) => "Something went wrong while submitting your vote. Please try again.",
        }
    }
}

impl From<ChainError> for VoteFailure {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::UserRejected => VoteFailure::UserRejected,
            ChainError::NotAllowlisted => VoteFailure::NotAllowlisted,
            ChainError::Reverted(_) => VoteFailure::TransactionReverted,
            other => VoteFailure::Unknown(other.to_string()),
        }
    }
}

impl From<GovernanceError> for VoteFailure {
    fn from(err: GovernanceError) -> Self {
        VoteFailure::InvalidAllocation(err.to_string())
    }
}

/// Local client error (configuration and persistence)
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::SerializationError(err.to_string())
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        ClientError::ConfigError(err.to_string())
    }
}
