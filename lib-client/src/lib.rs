//! Impact Fund Vote Client
//!
//! Client-side submission of fixed-budget votes to the governance contract.
//!
//! # Features
//!
//! - **Submission protocol**: ordered precondition checks, an observable
//!   phase machine and a typed failure taxonomy
//! - **Injected collaborators**: the wallet ([`WalletSession`]) and the chain
//!   ([`GovernanceContract`]) are traits passed in at construction
//! - **Confirmation polling**: bounded and cancellable, separate from
//!   submission so the UI stays responsive
//! - **Audit trail**: every broadcast vote is kept in a persisted record log
//!
//! # Example
//!
//! ```ignore
//! use lib_client::{CancellationToken, VoteSubmissionController, VotingConfig};
//! use lib_governance::AllocationEngine;
//!
//! let config = VotingConfig::default();
//! let controller = VoteSubmissionController::from_config(config, wallet, contract)?;
//!
//! let mut engine = AllocationEngine::new(resolve_budget(controller.config(), &*contract).await);
//! engine.set_allocation(ProjectId(1), 30);
//! engine.set_allocation(ProjectId(2), 70);
//!
//! let receipt = controller.submit_vote(&engine).await?;
//! let status = controller
//!     .await_confirmation(receipt.tx_hash, &CancellationToken::new())
//!     .await?;
//! ```

pub mod config;
pub mod contract;
pub mod controller;
pub mod error;
pub mod poller;
pub mod record;
pub mod session;
pub mod status;
pub mod store;
pub mod testing;

// Re-exports for convenience
pub use config::{ChainConfig, VotingConfig};
pub use contract::{resolve_budget, GovernanceContract, OnChainVote, TxStatus};
pub use controller::VoteSubmissionController;
pub use error::{ChainError, ClientError, Result, VoteFailure, WalletError};
pub use poller::{CancellationToken, ConfirmationPoller, PollOutcome};
pub use record::{RecordStatus, VoteRecord, VoteRecordLog};
pub use session::{Signer, WalletSession};
pub use status::{ConfirmationStatus, SubmissionPhase, SubmissionReceipt};
pub use store::{FileRecordStore, MemoryRecordStore, RecordStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
