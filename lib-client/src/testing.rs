//! In-process wallet and contract doubles
//!
//! Used by the unit and integration tests and by the `vote_smoke` binary.
//! Behaviour is scripted up front; every collaborator call is counted so
//! tests can assert which calls did (or did not) happen.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use lib_governance::VotePayload;
use lib_types::{Address, ChainId, Epoch, Points, ProjectId, TxHash};

use crate::contract::{GovernanceContract, OnChainVote, TxStatus};
use crate::error::{ChainError, WalletError};
use crate::session::{Signer, WalletSession};

/// Transaction hash whose last eight bytes hold `value` (big-endian)
///
/// `tx_hash_from_u64(0xabc)` displays as `0x000…0abc`.
pub fn tx_hash_from_u64(value: u64) -> TxHash {
    let mut bytes = [0u8; 32];
    bytes[24..].copy_from_slice(&value.to_be_bytes());
    TxHash::new(bytes)
}

/// Address filled with one repeated byte
pub fn test_address(byte: u8) -> Address {
    Address::new([byte; 20])
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// Wallet
// =============================================================================

/// How the mock wallet answers a chain switch request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchBehavior {
    /// Switch and report success
    Accept,
    /// User dismisses the prompt
    Reject,
    /// Report success without actually switching
    Ignore,
}

#[derive(Debug)]
struct WalletState {
    address: Option<Address>,
    connected: bool,
    chain_id: ChainId,
    switch: SwitchBehavior,
    signer_available: bool,
}

/// Scriptable [`WalletSession`]
#[derive(Debug)]
pub struct MockWallet {
    state: Mutex<WalletState>,
    calls: AtomicUsize,
    switch_calls: AtomicUsize,
}

impl MockWallet {
    /// Connected wallet on `chain_id`
    pub fn connected(address: Address, chain_id: ChainId) -> Self {
        Self {
            state: Mutex::new(WalletState {
                address: Some(address),
                connected: true,
                chain_id,
                switch: SwitchBehavior::Accept,
                signer_available: true,
            }),
            calls: AtomicUsize::new(0),
            switch_calls: AtomicUsize::new(0),
        }
    }

    /// No wallet connected
    pub fn disconnected() -> Self {
        let wallet = Self::connected(Address::zero(), ChainId::GNOSIS);
        {
            let mut state = lock(&wallet.state);
            state.address = None;
            state.connected = false;
        }
        wallet
    }

    pub fn with_switch(self, switch: SwitchBehavior) -> Self {
        lock(&self.state).switch = switch;
        self
    }

    pub fn without_signer(self) -> Self {
        lock(&self.state).signer_available = false;
        self
    }

    /// Move the wallet to another chain (as if the user switched manually)
    pub fn set_chain(&self, chain_id: ChainId) {
        lock(&self.state).chain_id = chain_id;
    }

    /// Total calls into this wallet
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn switch_calls(&self) -> usize {
        self.switch_calls.load(Ordering::SeqCst)
    }

    fn count(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl WalletSession for MockWallet {
    async fn address(&self) -> Option<Address> {
        self.count();
        lock(&self.state).address
    }

    async fn is_connected(&self) -> bool {
        self.count();
        lock(&self.state).connected
    }

    async fn chain_id(&self) -> ChainId {
        self.count();
        lock(&self.state).chain_id
    }

    async fn switch_chain(&self, chain: ChainId) -> Result<(), WalletError> {
        self.count();
        self.switch_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = lock(&self.state);
        match state.switch {
            SwitchBehavior::Accept => {
                state.chain_id = chain;
                Ok(())
            }
            SwitchBehavior::Reject => Err(WalletError::UserRejected),
            SwitchBehavior::Ignore => Ok(()),
        }
    }

    async fn signer(&self) -> Result<Signer, WalletError> {
        self.count();
        let state = lock(&self.state);
        match (state.connected, state.address, state.signer_available) {
            (true, Some(address), true) => Ok(Signer::new(address, state.chain_id)),
            (false, _, _) | (_, None, _) => Err(WalletError::NotConnected),
            _ => Err(WalletError::SignerUnavailable("wallet locked".into())),
        }
    }
}

// =============================================================================
// Contract
// =============================================================================

#[derive(Debug)]
struct ContractState {
    /// `None`: allowlist view unsupported
    allowlist: Option<HashSet<Address>>,
    /// Result of the next `vote` calls; the last entry repeats
    vote_results: VecDeque<Result<TxHash, ChainError>>,
    /// Scripted status answers; `Pending` once exhausted
    statuses: VecDeque<Result<TxStatus, ChainError>>,
    max_points: Option<Points>,
    epoch: Option<Epoch>,
    /// `None`: `getVotesByUser` unsupported
    votes_by_user: Option<HashMap<Address, Vec<OnChainVote>>>,
    /// `None`: `getTotalVotes` unsupported
    total_votes: Option<HashMap<ProjectId, u64>>,
    payloads: Vec<VotePayload>,
}

/// Scriptable [`GovernanceContract`]
#[derive(Debug)]
pub struct MockContract {
    state: Mutex<ContractState>,
    vote_calls: AtomicUsize,
    status_calls: AtomicUsize,
    allowlist_calls: AtomicUsize,
    view_calls: AtomicUsize,
}

impl Default for MockContract {
    fn default() -> Self {
        Self::new()
    }
}

impl MockContract {
    /// Accepts every vote with `tx_hash_from_u64(1)`, reports `Pending` forever
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ContractState {
                allowlist: None,
                vote_results: VecDeque::from([Ok(tx_hash_from_u64(1))]),
                statuses: VecDeque::new(),
                max_points: None,
                epoch: None,
                votes_by_user: None,
                total_votes: None,
                payloads: Vec::new(),
            }),
            vote_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            allowlist_calls: AtomicUsize::new(0),
            view_calls: AtomicUsize::new(0),
        }
    }

    /// Enable the allowlist view with the given members
    pub fn with_allowlist(self, members: impl IntoIterator<Item = Address>) -> Self {
        lock(&self.state).allowlist = Some(members.into_iter().collect());
        self
    }

    /// Every vote is broadcast with `tx_hash`
    pub fn with_tx_hash(self, tx_hash: TxHash) -> Self {
        self.with_vote_results(vec![Ok(tx_hash)])
    }

    /// Every vote fails with `error`
    pub fn with_vote_error(self, error: ChainError) -> Self {
        self.with_vote_results(vec![Err(error)])
    }

    /// Script successive `vote` results; the last one repeats
    pub fn with_vote_results(self, results: Vec<Result<TxHash, ChainError>>) -> Self {
        lock(&self.state).vote_results = results.into();
        self
    }

    /// Script successive `transaction_status` answers
    pub fn with_statuses(self, statuses: Vec<Result<TxStatus, ChainError>>) -> Self {
        lock(&self.state).statuses = statuses.into();
        self
    }

    pub fn with_max_points(self, max_points: Option<Points>) -> Self {
        lock(&self.state).max_points = max_points;
        self
    }

    pub fn with_epoch(self, epoch: Option<Epoch>) -> Self {
        lock(&self.state).epoch = epoch;
        self
    }

    /// Enable `votes_by_user` and store `votes` for `voter`
    pub fn with_votes_by_user(self, voter: Address, votes: Vec<OnChainVote>) -> Self {
        lock(&self.state)
            .votes_by_user
            .get_or_insert_with(HashMap::new)
            .insert(voter, votes);
        self
    }

    /// Enable `total_votes` and set the tally for `project`
    pub fn with_total_votes(self, project: ProjectId, total: u64) -> Self {
        lock(&self.state)
            .total_votes
            .get_or_insert_with(HashMap::new)
            .insert(project, total);
        self
    }

    /// Queue more status answers after construction
    pub fn push_status(&self, status: Result<TxStatus, ChainError>) {
        lock(&self.state).statuses.push_back(status);
    }

    /// Payloads received by `vote`, in call order
    pub fn payloads(&self) -> Vec<VotePayload> {
        lock(&self.state).payloads.clone()
    }

    pub fn vote_calls(&self) -> usize {
        self.vote_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn allowlist_calls(&self) -> usize {
        self.allowlist_calls.load(Ordering::SeqCst)
    }

    /// Every call of any kind
    pub fn total_calls(&self) -> usize {
        self.vote_calls()
            + self.status_calls()
            + self.allowlist_calls()
            + self.view_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GovernanceContract for MockContract {
    async fn vote(&self, _signer: &Signer, payload: &VotePayload) -> Result<TxHash, ChainError> {
        self.vote_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = lock(&self.state);
        state.payloads.push(payload.clone());

        let result = if state.vote_results.len() > 1 {
            state.vote_results.pop_front()
        } else {
            state.vote_results.front().cloned()
        };
        result.unwrap_or_else(|| Err(ChainError::Other("no scripted vote result".into())))
    }

    async fn transaction_status(&self, _tx_hash: TxHash) -> Result<TxStatus, ChainError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.state)
            .statuses
            .pop_front()
            .unwrap_or(Ok(TxStatus::Pending))
    }

    async fn is_allowlisted(&self, voter: Address) -> Result<Option<bool>, ChainError> {
        self.allowlist_calls.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.state)
            .allowlist
            .as_ref()
            .map(|members| members.contains(&voter)))
    }

    async fn max_points(&self) -> Result<Option<Points>, ChainError> {
        self.view_calls.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.state).max_points)
    }

    async fn current_epoch(&self) -> Result<Option<Epoch>, ChainError> {
        self.view_calls.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.state).epoch)
    }

    async fn votes_by_user(&self, voter: Address) -> Result<Option<Vec<OnChainVote>>, ChainError> {
        self.view_calls.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.state)
            .votes_by_user
            .as_ref()
            .map(|votes| votes.get(&voter).cloned().unwrap_or_default()))
    }

    async fn total_votes(&self, project: ProjectId) -> Result<Option<u64>, ChainError> {
        self.view_calls.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.state)
            .total_votes
            .as_ref()
            .map(|totals| totals.get(&project).copied().unwrap_or(0)))
    }
}
