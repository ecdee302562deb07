//! Wallet session abstraction
//!
//! The submission controller never reads ambient wallet state. The UI layer
//! implements [`WalletSession`] over whatever wallet connector is in use and
//! injects it at construction.

use async_trait::async_trait;

use lib_types::{Address, ChainId};

use crate::error::WalletError;

/// Signing credential derived from the connected wallet
///
/// Opaque to the controller; it is obtained from the wallet and handed
/// unchanged to the contract collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signer {
    address: Address,
    chain_id: ChainId,
}

impl Signer {
    pub fn new(address: Address, chain_id: ChainId) -> Self {
        Self { address, chain_id }
    }

    /// Account that will sign
    pub fn address(&self) -> Address {
        self.address
    }

    /// Chain the credential was derived on
    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }
}

/// Connected wallet identity provider
#[async_trait]
pub trait WalletSession: Send + Sync {
    /// Current account, `None` when no account is exposed
    async fn address(&self) -> Option<Address>;

    /// Whether a wallet connection is established
    async fn is_connected(&self) -> bool;

    /// Chain the wallet is currently on
    async fn chain_id(&self) -> ChainId;

    /// Ask the wallet to switch chains
    ///
    /// May prompt the user; a dismissal is `WalletError::UserRejected`.
    async fn switch_chain(&self, chain: ChainId) -> Result<(), WalletError>;

    /// Obtain a signing credential for the current account
    async fn signer(&self) -> Result<Signer, WalletError>;
}
