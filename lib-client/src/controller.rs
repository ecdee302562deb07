//! Vote Submission Controller
//!
//! Turns a completed allocation into one governance transaction.
//!
//! # Protocol
//!
//! 1. **Preparing**: the allocations must be valid and add up to exactly the
//!    budget, and a wallet account must be present. Checked before any collaborator is touched beyond the wallet.
//! 2. **CheckingNetwork**: the wallet must be on the required chain (a switch
//!    is requested if not), a signer must be obtainable, and the voter must
//!    pass the pre-flight allowlist check when the contract supports it.
//! 3. **AwaitingSignature**: the contract collaborator signs and broadcasts.
//! 4. **Broadcasting**: the transaction hash is recorded as a `pending` vote
//!    record and [`VoteSubmissionController::submit_vote`] returns.
//! 5. **Confirming**: [`VoteSubmissionController::await_confirmation`] polls
//!    until the transaction resolves or the attempts run out.
//!
//! Nothing is retried automatically. Only one attempt may be between
//! Preparing and Broadcasting at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use lib_governance::{AllocationEngine, AllocationSnapshot};
use lib_types::{Address, Epoch, ProjectId, TxHash};

use crate::config::VotingConfig;
use crate::contract::{GovernanceContract, OnChainVote, TxStatus};
use crate::error::{ChainError, Result, VoteFailure};
use crate::poller::{CancellationToken, ConfirmationPoller, PollOutcome};
use crate::record::{RecordStatus, VoteRecord, VoteRecordLog};
use crate::session::{Signer, WalletSession};
use crate::status::{ConfirmationStatus, SubmissionPhase, SubmissionReceipt};
use crate::store::RecordStore;

/// Clears the in-flight flag however the submission future ends
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Final on-chain outcome of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Confirmed,
    Reverted,
}

/// Drives vote submissions for one wallet session
pub struct VoteSubmissionController {
    config: VotingConfig,
    wallet: Arc<dyn WalletSession>,
    contract: Arc<dyn GovernanceContract>,
    poller: ConfirmationPoller,
    records: Mutex<VoteRecordLog>,
    phase: watch::Sender<SubmissionPhase>,
    in_flight: AtomicBool,
}

impl VoteSubmissionController {
    /// Create a controller, loading the existing vote record log from `store`
    pub fn new(
        config: VotingConfig,
        wallet: Arc<dyn WalletSession>,
        contract: Arc<dyn GovernanceContract>,
        store: Arc<dyn RecordStore>,
    ) -> Result<Self> {
        config.validate()?;
        let records = VoteRecordLog::load(store)?;
        let (phase, _) = watch::channel(SubmissionPhase::Idle);

        info!(
            "Vote submission controller ready: chain {} ({}), {} existing vote records",
            config.chain.name,
            config.required_chain(),
            records.len()
        );

        Ok(Self {
            poller: config.poller(),
            config,
            wallet,
            contract,
            records: Mutex::new(records),
            phase,
            in_flight: AtomicBool::new(false),
        })
    }

    /// Create a controller using the store named by the configuration
    pub fn from_config(
        config: VotingConfig,
        wallet: Arc<dyn WalletSession>,
        contract: Arc<dyn GovernanceContract>,
    ) -> Result<Self> {
        let store = config.record_store();
        Self::new(config, wallet, contract, store)
    }

    pub fn config(&self) -> &VotingConfig {
        &self.config
    }

    /// Phase of the most recent attempt
    pub fn phase(&self) -> SubmissionPhase {
        self.phase.borrow().clone()
    }

    /// Watch phase changes
    pub fn subscribe(&self) -> watch::Receiver<SubmissionPhase> {
        self.phase.subscribe()
    }

    /// Whether an attempt is between Preparing and Broadcasting
    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Submit the engine's current allocation
    ///
    /// Reads a snapshot; the engine is never modified, so a rejected or failed
    /// attempt leaves the allocation ready for another try. Returns once the
    /// transaction is broadcast and recorded.
    pub async fn submit_vote(
        &self,
        engine: &AllocationEngine,
    ) -> std::result::Result<SubmissionReceipt, VoteFailure> {
        self.submit_snapshot(engine.snapshot()).await
    }

    /// Submit a previously taken snapshot
    pub async fn submit_snapshot(
        &self,
        snapshot: AllocationSnapshot,
    ) -> std::result::Result<SubmissionReceipt, VoteFailure> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            warn!("Vote submission refused: another submission is in flight");
            return Err(VoteFailure::SubmissionInProgress);
        };

        let result = self.run_submission(snapshot).await;

        if let Err(failure) = &result {
            warn!("Vote submission failed ({}): {}", failure.kind(), failure);
            self.set_phase(SubmissionPhase::Failed(failure.clone()));
        }
        result
    }

    /// Submit, then wait for confirmation
    pub async fn submit_and_confirm(
        &self,
        engine: &AllocationEngine,
        cancel: &CancellationToken,
    ) -> std::result::Result<(SubmissionReceipt, ConfirmationStatus), VoteFailure> {
        let receipt = self.submit_vote(engine).await?;
        let status = self.await_confirmation(receipt.tx_hash, cancel).await?;
        Ok((receipt, status))
    }

    async fn run_submission(
        &self,
        snapshot: AllocationSnapshot,
    ) -> std::result::Result<SubmissionReceipt, VoteFailure> {
        // ---------------------------------------------------------------------
        // Preparing
        // ---------------------------------------------------------------------
        self.set_phase(SubmissionPhase::Preparing);

        snapshot.validate()?;
        if !snapshot.is_complete() || snapshot.is_empty() {
            return Err(VoteFailure::IncompleteAllocation {
                remaining: snapshot.remaining(),
            });
        }

        if !self.wallet.is_connected().await {
            return Err(VoteFailure::WalletNotConnected);
        }
        let voter = self
            .wallet
            .address()
            .await
            .ok_or(VoteFailure::WalletNotConnected)?;

        let payload = snapshot.to_payload();
        payload.validate()?;
        let digest = payload
            .digest()
            .map_err(|e| VoteFailure::Unknown(e.to_string()))?;
        debug!(
            "Prepared vote payload for {}: {} projects, {} points",
            voter,
            payload.len(),
            payload.total_points()
        );

        // ---------------------------------------------------------------------
        // CheckingNetwork
        // ---------------------------------------------------------------------
        self.set_phase(SubmissionPhase::CheckingNetwork);

        self.ensure_network().await?;
        let signer = self.obtain_signer().await?;
        if self.config.preflight_allowlist {
            self.check_allowlist(voter).await?;
        }
        let epoch = self.current_epoch().await;

        // ---------------------------------------------------------------------
        // AwaitingSignature
        // ---------------------------------------------------------------------
        self.set_phase(SubmissionPhase::AwaitingSignature);

        let tx_hash = self
            .contract
            .vote(&signer, &payload)
            .await
            .map_err(VoteFailure::from)?;

        // ---------------------------------------------------------------------
        // Broadcasting
        // ---------------------------------------------------------------------
        self.set_phase(SubmissionPhase::Broadcasting);
        info!("Vote broadcast by {}: tx {}", voter, tx_hash);

        let record = VoteRecord::pending(voter, &snapshot, tx_hash, epoch, digest);
        {
            let mut records = self.records.lock().await;
            if let Err(e) = records.append(record) {
                // The vote is already on its way; losing the local copy must not hide the hash
                error!("Failed to persist vote record for {}: {}", tx_hash, e);
            }
        }

        self.set_phase(SubmissionPhase::Confirming { tx_hash });

        Ok(SubmissionReceipt {
            tx_hash,
            voter,
            payload,
            epoch,
            explorer_url: self.config.explorer_tx_url(&tx_hash),
        })
    }

    async fn ensure_network(&self) -> std::result::Result<(), VoteFailure> {
        let expected = self.config.required_chain();
        let actual = self.wallet.chain_id().await;
        if actual == expected {
            return Ok(());
        }

        info!("Wallet on chain {}, requesting switch to {}", actual, expected);
        match self.wallet.switch_chain(expected).await {
            Ok(()) => {
                let now = self.wallet.chain_id().await;
                if now == expected {
                    Ok(())
                } else {
                    warn!("Wallet reported a successful switch but is still on chain {}", now);
                    Err(VoteFailure::WrongNetwork { expected, actual: now })
                }
            }
            Err(e) => {
                warn!("Network switch to {} failed: {}", expected, e);
                Err(VoteFailure::WrongNetwork { expected, actual })
            }
        }
    }

    async fn obtain_signer(&self) -> std::result::Result<Signer, VoteFailure> {
        self.wallet.signer().await.map_err(|e| {
            warn!("Could not obtain signer: {}", e);
            VoteFailure::SignerUnavailable
        })
    }

    /// Pre-flight eligibility read, so an ineligible voter never sees a
    /// signature prompt that is bound to revert
    async fn check_allowlist(&self, voter: Address) -> std::result::Result<(), VoteFailure> {
        match self.contract.is_allowlisted(voter).await {
            Ok(Some(true)) => Ok(()),
            Ok(Some(false)) | Err(ChainError::NotAllowlisted) => {
                info!("Voter {} is not allowlisted", voter);
                Err(VoteFailure::NotAllowlisted)
            }
            Ok(None) => {
                debug!("Contract does not expose an allowlist view; skipping pre-flight check");
                Ok(())
            }
            Err(e) => {
                warn!("Allowlist pre-flight for {} failed, continuing: {}", voter, e);
                Ok(())
            }
        }
    }

    async fn current_epoch(&self) -> Option<Epoch> {
        match self.contract.current_epoch().await {
            Ok(epoch) => epoch,
            Err(e) => {
                debug!("currentEpoch unavailable: {}", e);
                None
            }
        }
    }

    // =========================================================================
    // Confirmation
    // =========================================================================

    /// Poll a broadcast transaction until it resolves
    ///
    /// - success: record `confirmed`, `Ok(Confirmed)`
    /// - revert: record `failed`, `Err(TransactionReverted)`
    /// - attempts exhausted: record stays `pending`, `Ok(StillPending)`
    /// - cancelled: nothing changes, `Ok(Cancelled)`
    ///
    /// Works for any recorded transaction, so a caller can re-poll later from
    /// the stored hash. The controller's phase only follows the transaction of
    /// the latest attempt.
    pub async fn await_confirmation(
        &self,
        tx_hash: TxHash,
        cancel: &CancellationToken,
    ) -> std::result::Result<ConfirmationStatus, VoteFailure> {
        self.set_phase_for(tx_hash, SubmissionPhase::Confirming { tx_hash });

        match self.poller.poll(self.contract.as_ref(), tx_hash, cancel).await {
            PollOutcome::Confirmed { attempts } => {
                info!("Vote {} confirmed after {} polls", tx_hash, attempts);
                self.resolve(tx_hash, Resolution::Confirmed).await
            }
            PollOutcome::Reverted { attempts } => {
                warn!("Vote {} reverted (observed after {} polls)", tx_hash, attempts);
                self.resolve(tx_hash, Resolution::Reverted).await
            }
            PollOutcome::Exhausted { attempts } => {
                info!("Vote {} still pending after {} polls", tx_hash, attempts);
                self.set_phase_for(tx_hash, SubmissionPhase::PendingConfirmation { tx_hash });
                Ok(ConfirmationStatus::StillPending { tx_hash, attempts })
            }
            PollOutcome::Cancelled { attempts } => {
                debug!("Stopped polling {} after {} polls", tx_hash, attempts);
                Ok(ConfirmationStatus::Cancelled { tx_hash })
            }
        }
    }

    /// Query a transaction once and update its record
    pub async fn refresh_status(
        &self,
        tx_hash: TxHash,
    ) -> std::result::Result<ConfirmationStatus, VoteFailure> {
        let status = self
            .contract
            .transaction_status(tx_hash)
            .await
            .map_err(|e| VoteFailure::Unknown(e.to_string()))?;

        match status {
            TxStatus::Success => self.resolve(tx_hash, Resolution::Confirmed).await,
            TxStatus::Failure => self.resolve(tx_hash, Resolution::Reverted).await,
            TxStatus::Pending => Ok(ConfirmationStatus::StillPending { tx_hash, attempts: 1 }),
        }
    }

    async fn resolve(
        &self,
        tx_hash: TxHash,
        resolution: Resolution,
    ) -> std::result::Result<ConfirmationStatus, VoteFailure> {
        let (record_status, phase, result) = match resolution {
            Resolution::Confirmed => (
                RecordStatus::Confirmed,
                SubmissionPhase::Confirmed { tx_hash },
                Ok(ConfirmationStatus::Confirmed { tx_hash }),
            ),
            Resolution::Reverted => (
                RecordStatus::Failed,
                SubmissionPhase::Failed(VoteFailure::TransactionReverted),
                Err(VoteFailure::TransactionReverted),
            ),
        };

        {
            let mut records = self.records.lock().await;
            match records.update_status(&tx_hash, record_status) {
                Ok(true) => {}
                Ok(false) => warn!("No vote record for {}; status not stored", tx_hash),
                Err(e) => error!("Failed to persist status of {}: {}", tx_hash, e),
            }
        }

        self.set_phase_for(tx_hash, phase);
        result
    }

    // =========================================================================
    // Records
    // =========================================================================

    /// All vote records in submission order
    pub async fn records(&self) -> Vec<VoteRecord> {
        self.records.lock().await.records().to_vec()
    }

    pub async fn record(&self, tx_hash: &TxHash) -> Option<VoteRecord> {
        self.records.lock().await.get(tx_hash).cloned()
    }

    /// Records whose confirmation is still unknown
    pub async fn pending_records(&self) -> Vec<VoteRecord> {
        self.records.lock().await.pending().cloned().collect()
    }

    /// Votes the contract holds for the connected account
    ///
    /// `Ok(None)` when the contract does not expose the view.
    pub async fn on_chain_votes(
        &self,
    ) -> std::result::Result<Option<Vec<OnChainVote>>, VoteFailure> {
        let voter = self
            .wallet
            .address()
            .await
            .ok_or(VoteFailure::WalletNotConnected)?;
        self.contract
            .votes_by_user(voter)
            .await
            .map_err(VoteFailure::from)
    }

    /// Weighted tally for one project, when the contract exposes it
    pub async fn project_total_votes(
        &self,
        project: ProjectId,
    ) -> std::result::Result<Option<u64>, VoteFailure> {
        self.contract
            .total_votes(project)
            .await
            .map_err(VoteFailure::from)
    }

    // =========================================================================
    // Phase bookkeeping
    // =========================================================================

    fn set_phase(&self, phase: SubmissionPhase) {
        debug!("Submission phase -> {}", phase.label());
        self.phase.send_replace(phase);
    }

    /// Publish `phase` only if the current phase belongs to `tx_hash`
    ///
    /// Keeps late polling of an older transaction from overwriting the
    /// progress of a newer attempt.
    fn set_phase_for(&self, tx_hash: TxHash, phase: SubmissionPhase) {
        self.phase.send_if_modified(|current| {
            if current.tx_hash() == Some(tx_hash) && *current != phase {
                debug!("Submission phase -> {} ({})", phase.label(), tx_hash);
                *current = phase;
                true
            } else {
                false
            }
        });
    }
}
