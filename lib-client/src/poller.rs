//! Confirmation polling
//!
//! A bounded, cancellable loop over `transaction_status`. Cancelling only
//! stops local polling; the broadcast transaction stays valid on-chain.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use lib_types::TxHash;

use crate::contract::{GovernanceContract, TxStatus};

/// Cooperative cancellation signal shared between a poll and its owner
///
/// Clones observe the same signal.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Signal cancellation; idempotent
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once [`CancellationToken::cancel`] has been called
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        while !*receiver.borrow_and_update() {
            if receiver.changed().await.is_err() {
                // Sender lives as long as `self`, so this cannot resolve
                std::future::pending::<()>().await;
            }
        }
    }
}

/// How a polling run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Transaction executed successfully
    Confirmed { attempts: u32 },
    /// Transaction was included and reverted
    Reverted { attempts: u32 },
    /// Every attempt came back unresolved
    Exhausted { attempts: u32 },
    /// Stopped by the caller
    Cancelled { attempts: u32 },
}

/// Polls a transaction at a fixed interval, up to a bounded number of attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPoller {
    interval: Duration,
    max_attempts: u32,
}

impl ConfirmationPoller {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Poll until the transaction resolves, attempts run out, or `cancel` fires
    ///
    /// Each attempt waits one interval and then queries the status. Query
    /// errors are treated as "not resolved yet" and consume the attempt.
    pub async fn poll(
        &self,
        contract: &dyn GovernanceContract,
        tx_hash: TxHash,
        cancel: &CancellationToken,
    ) -> PollOutcome {
        for attempt in 1..=self.max_attempts {
            let completed = attempt - 1;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return PollOutcome::Cancelled { attempts: completed },
                _ = tokio::time::sleep(self.interval) => {}
            }

            let status = tokio::select! {
                biased;
                _ = cancel.cancelled() => return PollOutcome::Cancelled { attempts: completed },
                status = contract.transaction_status(tx_hash) => status,
            };

            match status {
                Ok(TxStatus::Success) => return PollOutcome::Confirmed { attempts: attempt },
                Ok(TxStatus::Failure) => return PollOutcome::Reverted { attempts: attempt },
                Ok(TxStatus::Pending) => {
                    debug!(
                        "Transaction {} still pending (attempt {}/{})",
                        tx_hash, attempt, self.max_attempts
                    );
                }
                Err(e) => {
                    warn!(
                        "Status query for {} failed (attempt {}/{}): {}",
                        tx_hash, attempt, self.max_attempts, e
                    );
                }
            }
        }

        PollOutcome::Exhausted {
            attempts: self.max_attempts,
        }
    }
}
