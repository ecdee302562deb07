//! Voting client configuration
//!
//! Loaded from a TOML file; every field has a production default so an empty
//! file (or no file) yields a working Gnosis Chain setup.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use lib_governance::DEFAULT_BUDGET;
use lib_types::{Address, ChainId, Points, TxHash};

use crate::error::{ClientError, Result};
use crate::poller::ConfirmationPoller;
use crate::store::{FileRecordStore, MemoryRecordStore, RecordStore};

/// Default config filename
pub const DEFAULT_CONFIG_FILENAME: &str = "voting.toml";

/// Deployed governance contract on Gnosis Chain
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x97259aA76332A3919d0a39aaDFE9231c257779E1";

/// Network the vote transaction must be sent to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// EVM chain id
    pub chain_id: u64,
    /// Display name
    pub name: String,
    /// JSON-RPC endpoint
    pub rpc_url: String,
    /// Block explorer base URL
    pub explorer_url: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: ChainId::GNOSIS.value(),
            name: "Gnosis Chain".into(),
            rpc_url: "https://rpc.gnosischain.com".into(),
            explorer_url: "https://gnosisscan.io".into(),
        }
    }
}

impl ChainConfig {
    pub fn chain_id(&self) -> ChainId {
        ChainId::new(self.chain_id)
    }
}

/// Configuration for allocation and vote submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VotingConfig {
    // =========================================================================
    // Allocation
    // =========================================================================
    /// Points per voter when the contract does not report `maxPoints`
    pub budget: Points,

    // =========================================================================
    // Network
    // =========================================================================
    /// Required chain
    pub chain: ChainConfig,
    /// Governance contract address (hex)
    pub contract_address: String,

    // =========================================================================
    // Submission
    // =========================================================================
    /// Check the allowlist before prompting for a signature
    pub preflight_allowlist: bool,
    /// Delay between confirmation polls, in milliseconds
    pub poll_interval_ms: u64,
    /// Polls before reporting "still pending"
    pub max_poll_attempts: u32,

    // =========================================================================
    // Persistence
    // =========================================================================
    /// Directory for the vote record log; in-memory when unset
    pub records_dir: Option<PathBuf>,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            budget: DEFAULT_BUDGET,
            chain: ChainConfig::default(),
            contract_address: DEFAULT_CONTRACT_ADDRESS.into(),
            preflight_allowlist: true,
            poll_interval_ms: 10_000, // 10 s
            max_poll_attempts: 30,    // ~5 minutes
            records_dir: None,
        }
    }
}

impl VotingConfig {
    /// Fast-polling config for tests
    pub fn for_testing() -> Self {
        Self {
            poll_interval_ms: 5,
            max_poll_attempts: 5,
            ..Self::default()
        }
    }

    /// Parse a TOML document and validate it
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            ClientError::ConfigError(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Load from `path` if given, else from `./voting.toml` if present, else defaults
    ///
    /// An explicitly named file that does not exist is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILENAME);
                if default_path.exists() {
                    Self::load(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Reject values the controller cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.budget == 0 {
            return Err(ClientError::ConfigError("budget must be greater than 0".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ClientError::ConfigError(
                "poll_interval_ms must be greater than 0".into(),
            ));
        }
        if self.max_poll_attempts == 0 {
            return Err(ClientError::ConfigError(
                "max_poll_attempts must be greater than 0".into(),
            ));
        }
        self.contract_address()?;
        Ok(())
    }

    /// Chain the vote must be sent on
    pub fn required_chain(&self) -> ChainId {
        self.chain.chain_id()
    }

    /// Parsed governance contract address
    pub fn contract_address(&self) -> Result<Address> {
        self.contract_address.parse().map_err(|e| {
            ClientError::ConfigError(format!(
                "Invalid contract_address {:?}: {}",
                self.contract_address, e
            ))
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Poller built from the polling settings
    pub fn poller(&self) -> ConfirmationPoller {
        ConfirmationPoller::new(self.poll_interval(), self.max_poll_attempts)
    }

    /// Explorer link for a transaction
    pub fn explorer_tx_url(&self, tx_hash: &TxHash) -> String {
        format!("{}/tx/{}", self.chain.explorer_url.trim_end_matches('/'), tx_hash)
    }

    /// Store for the vote record log
    pub fn record_store(&self) -> Arc<dyn RecordStore> {
        match &self.records_dir {
            Some(dir) => Arc::new(FileRecordStore::new(dir.clone())),
            None => Arc::new(MemoryRecordStore::new()),
        }
    }
}
