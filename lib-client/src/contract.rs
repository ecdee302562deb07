//! Governance contract collaborator
//!
//! Mirrors the on-chain interface the client depends on:
//!
//! ```text
//! function vote(uint256[] _impactorIds, uint256[] _points) external
//! function getVotesByUser(address _voter) external view
//!     returns (tuple(uint256 impactorId, uint256 points, uint256 weight, uint256 epoch)[])
//! function getTotalVotes(uint256 _impactorId) external view returns (uint256)
//! function maxPoints() external view returns (uint256)
//! function currentEpoch() external view returns (uint256)
//! ```
//!
//! plus a transaction-status query and an optional allowlist view. ABI
//! encoding and RPC transport live in the implementation, not here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use lib_governance::VotePayload;
use lib_types::{Address, Epoch, Points, ProjectId, TxHash};

use crate::config::VotingConfig;
use crate::error::ChainError;
use crate::session::Signer;

/// On-chain status of a broadcast transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    /// Included and executed successfully
    Success,
    /// Included but reverted
    Failure,
    /// Not yet included
    Pending,
}

/// One allocation of a vote as stored by the contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnChainVote {
    pub project_id: ProjectId,
    pub points: u64,
    /// Voting power applied to `points`
    pub weight: u64,
    pub epoch: Epoch,
}

/// Chain/contract collaborator for vote submission
///
/// The optional views default to "unsupported" (`Ok(None)`), so a minimal
/// implementation only needs `vote` and `transaction_status`.
#[async_trait]
pub trait GovernanceContract: Send + Sync {
    /// Sign and broadcast a vote
    ///
    /// Returns as soon as the network accepts the transaction; inclusion is
    /// observed separately through [`GovernanceContract::transaction_status`].
    async fn vote(&self, signer: &Signer, payload: &VotePayload) -> Result<TxHash, ChainError>;

    /// Current status of a broadcast transaction
    async fn transaction_status(&self, tx_hash: TxHash) -> Result<TxStatus, ChainError>;

    /// Read-only allowlist check
    async fn is_allowlisted(&self, _voter: Address) -> Result<Option<bool>, ChainError> {
        Ok(None)
    }

    /// Per-voter budget enforced by the contract
    async fn max_points(&self) -> Result<Option<Points>, ChainError> {
        Ok(None)
    }

    /// Voting round currently open
    async fn current_epoch(&self) -> Result<Option<Epoch>, ChainError> {
        Ok(None)
    }

    /// Every allocation the contract holds for `voter`, across epochs
    async fn votes_by_user(&self, _voter: Address) -> Result<Option<Vec<OnChainVote>>, ChainError> {
        Ok(None)
    }

    /// Weighted points a project has received
    async fn total_votes(&self, _project: ProjectId) -> Result<Option<u64>, ChainError> {
        Ok(None)
    }
}

/// Budget for a new voting session
///
/// The contract's `maxPoints` wins when it is available and non-zero, since
/// a payload summing to anything else would revert. Otherwise the configured
/// budget is used.
pub async fn resolve_budget(config: &VotingConfig, contract: &dyn GovernanceContract) -> Points {
    match contract.max_points().await {
        Ok(Some(points)) if points > 0 => {
            if points != config.budget {
                info!(
                    "Using on-chain budget of {} points (configured: {})",
                    points, config.budget
                );
            }
            points
        }
        Ok(_) => config.budget,
        Err(e) => {
            warn!("Failed to read maxPoints, using configured budget {}: {}", config.budget, e);
            config.budget
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockContract;

    #[tokio::test]
    async fn test_resolve_budget_prefers_chain_value() {
        let config = VotingConfig::default();
        let contract = MockContract::new().with_max_points(Some(250));
        assert_eq!(resolve_budget(&config, &contract).await, 250);
    }

    #[tokio::test]
    async fn test_resolve_budget_falls_back_to_config() {
        let config = VotingConfig { budget: 80, ..VotingConfig::default() };

        let unsupported = MockContract::new();
        assert_eq!(resolve_budget(&config, &unsupported).await, 80);

        let zero = MockContract::new().with_max_points(Some(0));
        assert_eq!(resolve_budget(&config, &zero).await, 80);
    }

    struct MinimalContract;

    #[async_trait]
    impl GovernanceContract for MinimalContract {
        async fn vote(&self, _signer: &Signer, _payload: &VotePayload) -> Result<TxHash, ChainError> {
            Err(ChainError::Other("unused".into()))
        }

        async fn transaction_status(&self, _tx_hash: TxHash) -> Result<TxStatus, ChainError> {
            Ok(TxStatus::Pending)
        }
    }

    #[tokio::test]
    async fn test_optional_views_default_to_unsupported() {
        let contract = MinimalContract;
        assert_eq!(contract.is_allowlisted(Address::zero()).await, Ok(None));
        assert_eq!(contract.max_points().await, Ok(None));
        assert_eq!(contract.current_epoch().await, Ok(None));
        assert_eq!(contract.votes_by_user(Address::zero()).await, Ok(None));
        assert_eq!(contract.total_votes(ProjectId(1)).await, Ok(None));
    }
}
