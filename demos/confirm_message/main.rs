//! Confirms that a range of messages from one source chain has been committed and executed on
//! an EVM destination chain.
//!
//! ```sh
//! RPC_URL=http://localhost:8545 OFF_RAMP=0x... SOURCE_CHAIN=1 DEST_CHAIN=2 \
//!     SEQ_NUMS=100-105 RUST_LOG=event_confirmer=info cargo run --example confirm_message
//! ```

use std::{env, time::Duration};

use alloy::{network::Ethereum, primitives::Address, transports::http::reqwest::Url};
use anyhow::Context;
use event_confirmer::{
    ChainSelector, ConfirmerBuilder, EvmLedger, SeqNumRange,
    robust_provider::RobustProviderBuilder,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn var<T: std::str::FromStr>(name: &str) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(name)
        .with_context(|| format!("{name} is not set"))?
        .parse()
        .with_context(|| format!("invalid {name}"))
}

fn seq_nums() -> anyhow::Result<SeqNumRange> {
    let raw = env::var("SEQ_NUMS").context("SEQ_NUMS is not set")?;
    let (start, end) = raw.split_once('-').unwrap_or((raw.as_str(), raw.as_str()));
    Ok(SeqNumRange::new(start.trim().parse()?, end.trim().parse()?))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).try_init();

    let url: Url = var("RPC_URL")?;
    let off_ramp: Address = var("OFF_RAMP")?;
    let source_chain: ChainSelector = var("SOURCE_CHAIN")?;
    let dest_chain: ChainSelector = var("DEST_CHAIN")?;
    let expected = seq_nums()?;

    let provider = RobustProviderBuilder::<Ethereum, _>::new(url)
        .call_timeout(Duration::from_secs(30))
        .max_retries(5)
        .min_delay(Duration::from_millis(500))
        .build()
        .await?;
    let confirmer =
        ConfirmerBuilder::new().dest_chain(dest_chain).connect(EvmLedger::new(provider))?;

    let (commit, states) = confirmer
        .confirm_commit_and_execution(
            source_chain,
            off_ramp,
            None,
            expected,
            Duration::from_secs(600),
        )
        .await?;

    info!(
        reports = commit.reports_processed,
        coverage = ?commit.coverage,
        elapsed = ?commit.elapsed,
        "Committed"
    );
    for (seq_num, state) in states {
        info!(seq_num, state = ?state, "Executed");
    }

    Ok(())
}
