use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use lib_client::testing::{test_address, tx_hash_from_u64, MockContract, MockWallet};
use lib_client::{
    resolve_budget, CancellationToken, TxStatus, VoteSubmissionController, VotingConfig,
};
use lib_governance::AllocationEngine;
use lib_types::{ChainId, ProjectId};

fn parse_allocations(pairs: &str) -> anyhow::Result<Vec<(ProjectId, i64)>> {
    pairs.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| -> anyhow::Result<(ProjectId, i64)> {
            let (id, points) = part
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("Expected PROJECT=POINTS, got {:?}", part))?;
            Ok((id.parse()?, points.trim().parse()?))
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Usage:
    //   cargo run -p lib-client --bin vote_smoke -- --allocations 1=30,2=70
    //
    // Runs one full submission against the in-process wallet and contract
    // doubles. The wallet starts on Ethereum mainnet so the network switch
    // path is exercised too.

    let filter = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config_path: Option<PathBuf> = None;
    let mut allocations = "1=30,2=70".to_string();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                config_path = Some(
                    args.next()
                        .ok_or_else(|| anyhow::anyhow!("--config requires a value"))?
                        .into(),
                );
            }
            "--allocations" => {
                allocations = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--allocations requires a value"))?;
            }
            "--help" | "-h" => {
                eprintln!(
                    "vote_smoke\n\n\
Submits a vote through the simulated wallet and governance contract.\n\n\
Options:\n\
  --config PATH          voting.toml to load (default: ./voting.toml or built-in defaults)\n\
  --allocations PAIRS    Comma-separated PROJECT=POINTS pairs (default: 1=30,2=70)\n"
                );
                return Ok(());
            }
            other => anyhow::bail!("Unknown arg: {}", other),
        }
    }

    let mut config = VotingConfig::load_or_default(config_path.as_deref())?;
    // Simulated chain confirms quickly; keep the smoke run short
    config.poll_interval_ms = config.poll_interval_ms.min(200);

    let voter = test_address(0x42);
    let wallet = Arc::new(MockWallet::connected(voter, ChainId::ETHEREUM));
    let contract = Arc::new(
        MockContract::new()
            .with_allowlist([voter])
            .with_tx_hash(tx_hash_from_u64(0xabc))
            .with_statuses(vec![Ok(TxStatus::Pending), Ok(TxStatus::Success)])
            .with_epoch(Some(1)),
    );

    let budget = resolve_budget(&config, contract.as_ref()).await;
    let mut engine = AllocationEngine::new(budget);
    for (project, requested) in parse_allocations(&allocations)? {
        let granted = engine.set_allocation(project, requested);
        println!("project={} requested={} granted={}", project, requested, granted);
    }
    println!("remaining={}", engine.remaining_budget());

    let controller = VoteSubmissionController::from_config(config, wallet, contract)?;

    match controller
        .submit_and_confirm(&engine, &CancellationToken::new())
        .await
    {
        Ok((receipt, status)) => {
            println!("tx={}", receipt.tx_hash);
            println!("explorer={}", receipt.explorer_url);
            println!("status={}", status.user_message());
        }
        Err(failure) => {
            println!("failed={} message={}", failure.kind(), failure.user_message());
        }
    }

    for record in controller.records().await {
        println!(
            "record tx={} status={:?} points={}",
            record.tx_hash,
            record.status,
            record.total_points()
        );
    }

    Ok(())
}
