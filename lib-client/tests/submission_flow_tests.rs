//! Integration tests for vote submission
//!
//! These tests drive the controller end to end against the in-process wallet
//! and contract doubles: precondition ordering, failure classification,
//! record side effects and the duplicate-submission guard.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;

use lib_client::testing::{test_address, tx_hash_from_u64, MockContract, MockWallet, SwitchBehavior};
use lib_client::{
    CancellationToken, ChainError, ConfirmationStatus, GovernanceContract, MemoryRecordStore,
    RecordStatus, Signer, SubmissionPhase, TxStatus, VoteFailure, VoteSubmissionController,
    VotingConfig,
};
use lib_governance::{AllocationEngine, AllocationSnapshot, VotePayload};
use lib_types::{Address, ChainId, ProjectId, TxHash};

const A: ProjectId = ProjectId(1);
const B: ProjectId = ProjectId(2);
const C: ProjectId = ProjectId(3);

/// Helper to build an engine with A:30, B:70
fn complete_engine() -> AllocationEngine {
    let mut engine = AllocationEngine::new(100);
    engine.set_allocation(A, 30);
    engine.set_allocation(B, 70);
    engine
}

fn voter() -> Address {
    test_address(0x11)
}

fn gnosis_wallet() -> Arc<MockWallet> {
    Arc::new(MockWallet::connected(voter(), ChainId::GNOSIS))
}

fn allowlisted_contract() -> MockContract {
    MockContract::new().with_allowlist([voter()])
}

fn controller_with(
    config: VotingConfig,
    wallet: Arc<MockWallet>,
    contract: Arc<dyn GovernanceContract>,
) -> VoteSubmissionController {
    VoteSubmissionController::new(config, wallet, contract, Arc::new(MemoryRecordStore::new()))
        .expect("valid test config")
}

fn controller(wallet: Arc<MockWallet>, contract: Arc<MockContract>) -> VoteSubmissionController {
    controller_with(VotingConfig::for_testing(), wallet, contract)
}

#[tokio::test]
async fn happy_path_records_pending_then_confirmed() {
    let tx = tx_hash_from_u64(0xabc);
    let wallet = gnosis_wallet();
    let contract = Arc::new(
        allowlisted_contract()
            .with_tx_hash(tx)
            .with_statuses(vec![Ok(TxStatus::Success)]),
    );
    let controller = controller(wallet, contract.clone());
    let engine = complete_engine();
    assert_eq!(engine.remaining_budget(), 0);

    let receipt = controller.submit_vote(&engine).await.unwrap();
    assert_eq!(receipt.tx_hash, tx);
    assert_eq!(receipt.voter, voter());
    assert!(receipt.explorer_url.ends_with(&tx.to_string()));

    // Returned right after broadcast: record is pending, nothing polled yet
    let record = controller.record(&tx).await.unwrap();
    assert_eq!(record.status, RecordStatus::Pending);
    assert_eq!(record.voter, voter());
    assert_eq!(record.allocations.get(&A), Some(&30));
    assert_eq!(record.allocations.get(&B), Some(&70));
    assert_eq!(controller.phase(), SubmissionPhase::Confirming { tx_hash: tx });
    assert_eq!(contract.status_calls(), 0);

    let status = controller
        .await_confirmation(tx, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(status, ConfirmationStatus::Confirmed { tx_hash: tx });
    assert_eq!(controller.record(&tx).await.unwrap().status, RecordStatus::Confirmed);
    assert_eq!(controller.phase(), SubmissionPhase::Confirmed { tx_hash: tx });
    assert_eq!(controller.records().await.len(), 1);
}

#[tokio::test]
async fn incomplete_allocation_makes_no_calls() {
    let wallet = gnosis_wallet();
    let contract = Arc::new(allowlisted_contract());
    let controller = controller(wallet.clone(), contract.clone());

    let mut engine = AllocationEngine::new(100);
    engine.set_allocation(A, 30);

    let result = controller.submit_vote(&engine).await;
    assert_eq!(result, Err(VoteFailure::IncompleteAllocation { remaining: 70 }));
    assert_eq!(wallet.calls(), 0);
    assert_eq!(contract.total_calls(), 0);
    assert!(controller.records().await.is_empty());
    assert_eq!(
        controller.phase(),
        SubmissionPhase::Failed(VoteFailure::IncompleteAllocation { remaining: 70 })
    );
}

#[tokio::test]
async fn empty_allocation_is_incomplete() {
    let controller = controller(gnosis_wallet(), Arc::new(allowlisted_contract()));
    let result = controller.submit_vote(&AllocationEngine::new(100)).await;
    assert_eq!(result, Err(VoteFailure::IncompleteAllocation { remaining: 100 }));
}

#[tokio::test]
async fn disconnected_wallet_fails_before_network() {
    let wallet = Arc::new(MockWallet::disconnected());
    let contract = Arc::new(allowlisted_contract());
    let controller = controller(wallet.clone(), contract.clone());

    let result = controller.submit_vote(&complete_engine()).await;
    assert_eq!(result, Err(VoteFailure::WalletNotConnected));
    assert_eq!(wallet.switch_calls(), 0);
    assert_eq!(contract.total_calls(), 0);
}

#[tokio::test]
async fn wrong_chain_is_switched_then_submitted() {
    let wallet = Arc::new(MockWallet::connected(voter(), ChainId::ETHEREUM));
    let contract = Arc::new(allowlisted_contract());
    let controller = controller(wallet.clone(), contract.clone());

    let receipt = controller.submit_vote(&complete_engine()).await.unwrap();
    assert_eq!(wallet.switch_calls(), 1);
    assert_eq!(contract.vote_calls(), 1);
    assert_eq!(receipt.tx_hash, tx_hash_from_u64(1));
}

#[tokio::test]
async fn rejected_switch_is_wrong_network() {
    let wallet = Arc::new(
        MockWallet::connected(voter(), ChainId::ETHEREUM).with_switch(SwitchBehavior::Reject),
    );
    let contract = Arc::new(allowlisted_contract());
    let controller = controller(wallet.clone(), contract.clone());

    let result = controller.submit_vote(&complete_engine()).await;
    assert_eq!(
        result,
        Err(VoteFailure::WrongNetwork { expected: ChainId::GNOSIS, actual: ChainId::ETHEREUM })
    );
    assert_eq!(contract.total_calls(), 0);
}

#[tokio::test]
async fn switch_that_does_not_move_the_wallet_is_wrong_network() {
    let wallet = Arc::new(
        MockWallet::connected(voter(), ChainId::ETHEREUM).with_switch(SwitchBehavior::Ignore),
    );
    let contract = Arc::new(allowlisted_contract());
    let controller = controller(wallet, contract.clone());

    let result = controller.submit_vote(&complete_engine()).await;
    assert!(matches!(result, Err(VoteFailure::WrongNetwork { .. })));
    assert_eq!(contract.vote_calls(), 0);
}

#[tokio::test]
async fn missing_signer_is_signer_unavailable() {
    let wallet = Arc::new(MockWallet::connected(voter(), ChainId::GNOSIS).without_signer());
    let contract = Arc::new(allowlisted_contract());
    let controller = controller(wallet, contract.clone());

    let result = controller.submit_vote(&complete_engine()).await;
    assert_eq!(result, Err(VoteFailure::SignerUnavailable));
    assert_eq!(contract.vote_calls(), 0);
}

#[tokio::test]
async fn not_allowlisted_fails_before_signature_prompt() {
    let wallet = gnosis_wallet();
    let contract = Arc::new(MockContract::new().with_allowlist([test_address(0x99)]));
    let controller = controller(wallet, contract.clone());

    let result = controller.submit_vote(&complete_engine()).await;
    assert_eq!(result, Err(VoteFailure::NotAllowlisted));
    assert_eq!(contract.allowlist_calls(), 1);
    assert_eq!(contract.vote_calls(), 0);
    assert!(controller.records().await.is_empty());
    assert_eq!(controller.phase(), SubmissionPhase::Failed(VoteFailure::NotAllowlisted));
}

#[tokio::test]
async fn contract_side_allowlist_rejection_is_classified() {
    // No allowlist view: the check is skipped and the contract refuses at send time
    let contract = Arc::new(MockContract::new().with_vote_error(ChainError::NotAllowlisted));
    let controller = controller(gnosis_wallet(), contract.clone());

    let result = controller.submit_vote(&complete_engine()).await;
    assert_eq!(result, Err(VoteFailure::NotAllowlisted));
    assert_eq!(contract.vote_calls(), 1);
    assert!(controller.records().await.is_empty());
}

#[tokio::test]
async fn preflight_can_be_disabled() {
    let config = VotingConfig {
        preflight_allowlist: false,
        ..VotingConfig::for_testing()
    };
    let contract = Arc::new(MockContract::new().with_allowlist(Vec::<Address>::new()));
    let controller = controller_with(config, gnosis_wallet(), contract.clone());

    controller.submit_vote(&complete_engine()).await.unwrap();
    assert_eq!(contract.allowlist_calls(), 0);
}

#[tokio::test]
async fn user_rejection_leaves_allocation_for_retry() {
    let tx = tx_hash_from_u64(0xdef);
    let contract = Arc::new(
        allowlisted_contract().with_vote_results(vec![Err(ChainError::UserRejected), Ok(tx)]),
    );
    let controller = controller(gnosis_wallet(), contract.clone());
    let engine = complete_engine();
    let before = engine.clone();

    let result = controller.submit_vote(&engine).await;
    assert_eq!(result, Err(VoteFailure::UserRejected));
    assert!(controller.records().await.is_empty());
    assert_eq!(engine, before);
    // Not retried automatically
    assert_eq!(contract.vote_calls(), 1);

    // Caller-initiated retry starts a fresh attempt
    let receipt = controller.submit_vote(&engine).await.unwrap();
    assert_eq!(receipt.tx_hash, tx);
    assert_eq!(contract.vote_calls(), 2);
    assert_eq!(controller.records().await.len(), 1);
}

#[tokio::test]
async fn unrecognised_errors_keep_their_detail() {
    let contract = Arc::new(
        allowlisted_contract().with_vote_error(ChainError::Rpc("nonce too low".into())),
    );
    let controller = controller(gnosis_wallet(), contract);

    match controller.submit_vote(&complete_engine()).await {
        Err(VoteFailure::Unknown(detail)) => assert!(detail.contains("nonce too low")),
        other => panic!("expected Unknown, got {:?}", other),
    }
}

#[tokio::test]
async fn payload_is_sent_in_ascending_project_order() {
    let contract = Arc::new(allowlisted_contract());
    let controller = controller(gnosis_wallet(), contract.clone());

    let mut engine = AllocationEngine::new(100);
    engine.set_allocation(C, 10);
    engine.set_allocation(A, 50);
    engine.set_allocation(B, 40);

    let receipt = controller.submit_vote(&engine).await.unwrap();

    let sent = contract.payloads();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].project_ids(), &[A, B, C]);
    assert_eq!(sent[0].points(), &[50, 40, 10]);
    assert_eq!(sent[0], receipt.payload);

    let decoded = VotePayload::from_bytes(&sent[0].to_bytes().unwrap()).unwrap();
    assert_eq!(decoded.total_points(), 100);
}

#[tokio::test]
async fn epoch_is_recorded_when_available() {
    let contract = Arc::new(allowlisted_contract().with_epoch(Some(7)));
    let controller = controller(gnosis_wallet(), contract);

    let receipt = controller.submit_vote(&complete_engine()).await.unwrap();
    assert_eq!(receipt.epoch, Some(7));
    assert_eq!(controller.record(&receipt.tx_hash).await.unwrap().epoch, Some(7));
}

/// Contract whose `vote` blocks until released
struct GatedContract {
    inner: MockContract,
    gate: Notify,
}

#[async_trait]
impl GovernanceContract for GatedContract {
    async fn vote(&self, signer: &Signer, payload: &VotePayload) -> Result<TxHash, ChainError> {
        self.gate.notified().await;
        self.inner.vote(signer, payload).await
    }

    async fn transaction_status(&self, tx_hash: TxHash) -> Result<TxStatus, ChainError> {
        self.inner.transaction_status(tx_hash).await
    }
}

#[tokio::test]
async fn second_submission_refused_while_awaiting_signature() {
    let gated = Arc::new(GatedContract {
        inner: allowlisted_contract().with_tx_hash(tx_hash_from_u64(0xabc)),
        gate: Notify::new(),
    });
    let controller = Arc::new(controller_with(
        VotingConfig::for_testing(),
        gnosis_wallet(),
        gated.clone(),
    ));

    let mut phases = controller.subscribe();
    let first = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.submit_vote(&complete_engine()).await })
    };

    phases
        .wait_for(|phase| *phase == SubmissionPhase::AwaitingSignature)
        .await
        .unwrap();
    assert!(controller.is_submitting());

    let second = controller.submit_vote(&complete_engine()).await;
    assert_eq!(second, Err(VoteFailure::SubmissionInProgress));
    // The in-flight attempt is untouched
    assert_eq!(controller.phase(), SubmissionPhase::AwaitingSignature);

    gated.gate.notify_one();
    let receipt = first.await.unwrap().unwrap();
    assert_eq!(receipt.tx_hash, tx_hash_from_u64(0xabc));
    assert!(!controller.is_submitting());
    assert_eq!(gated.inner.vote_calls(), 1);
    assert_eq!(controller.records().await.len(), 1);
}

#[tokio::test]
async fn new_submission_allowed_while_previous_still_polling() {
    let first_tx = tx_hash_from_u64(0x1);
    let second_tx = tx_hash_from_u64(0x2);
    let contract = Arc::new(
        allowlisted_contract().with_vote_results(vec![Ok(first_tx), Ok(second_tx)]),
    );
    let controller = controller(gnosis_wallet(), contract);

    let first = controller.submit_vote(&complete_engine()).await.unwrap();
    let second = controller.submit_vote(&complete_engine()).await.unwrap();
    assert_eq!(controller.phase(), SubmissionPhase::Confirming { tx_hash: second_tx });

    // Polling the older transaction runs out but must not clobber the newer attempt
    let status = controller
        .await_confirmation(first.tx_hash, &CancellationToken::new())
        .await
        .unwrap();
    assert!(matches!(status, ConfirmationStatus::StillPending { .. }));
    assert_eq!(controller.phase(), SubmissionPhase::Confirming { tx_hash: second.tx_hash });

    let records = controller.records().await;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].tx_hash, first_tx);
    assert_eq!(records[1].tx_hash, second_tx);
}

#[tokio::test]
async fn snapshot_from_json_is_submitted_as_is() {
    let contract = Arc::new(allowlisted_contract());
    let controller = controller(gnosis_wallet(), contract.clone());

    let snapshot: AllocationSnapshot =
        serde_json::from_str(r#"{"budget":100,"allocations":{"3":10,"1":50,"2":40}}"#).unwrap();
    let receipt = controller.submit_snapshot(snapshot).await.unwrap();

    assert_eq!(receipt.payload.project_ids(), &[A, B, C]);
    assert_eq!(receipt.payload.points(), &[50, 40, 10]);
    assert_eq!(contract.vote_calls(), 1);
}

#[test]
fn malformed_snapshots_never_deserialize() {
    // Over budget, and a zero entry
    let over_budget = r#"{"budget":100,"allocations":{"1":90,"2":90,"3":0}}"#;
    assert!(serde_json::from_str::<AllocationSnapshot>(over_budget).is_err());

    let zero_entry = r#"{"budget":100,"allocations":{"1":60,"2":40,"3":0}}"#;
    assert!(serde_json::from_str::<AllocationSnapshot>(zero_entry).is_err());

    let overflowing = r#"{"budget":100,"allocations":{"1":4294967295,"2":4294967295}}"#;
    assert!(serde_json::from_str::<AllocationSnapshot>(overflowing).is_err());
}

#[tokio::test]
async fn under_budget_snapshot_is_refused_without_calls() {
    let wallet = gnosis_wallet();
    let contract = Arc::new(allowlisted_contract());
    let controller = controller(wallet.clone(), contract.clone());

    let snapshot: AllocationSnapshot =
        serde_json::from_str(r#"{"budget":100,"allocations":{"1":90}}"#).unwrap();
    let result = controller.submit_snapshot(snapshot).await;

    assert_eq!(result, Err(VoteFailure::IncompleteAllocation { remaining: 10 }));
    assert_eq!(wallet.calls(), 0);
    assert_eq!(contract.total_calls(), 0);
    assert!(contract.payloads().is_empty());
    assert!(controller.records().await.is_empty());
}
