//! Retrying wrapper around Alloy providers.
//!
//! [`RobustProvider`] wraps an Alloy [`RootProvider`](alloy::providers::RootProvider) and adds:
//! * a bounded per-call timeout
//! * exponential backoff retries
//! * failover to one or more fallback providers, tried in the order they were added
//!
//! It is the retrying RPC client behind [`EvmLedger`](crate::ledger::evm::EvmLedger). The
//! confirmation engine never retries on its own: whatever this layer gives up on is surfaced
//! to the caller as a terminal error.
//!
//! # Examples
//!
//! ```rust,no_run
//! use alloy::{eips::BlockNumberOrTag, providers::ProviderBuilder};
//! use event_confirmer::robust_provider::RobustProviderBuilder;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let primary = ProviderBuilder::new().connect("http://localhost:8545").await?;
//! let fallback = ProviderBuilder::new().connect("http://localhost:8546").await?;
//!
//! let robust = RobustProviderBuilder::new(primary)
//!     .fallback(fallback)
//!     .max_retries(3)
//!     .call_timeout(Duration::from_secs(10))
//!     .build()
//!     .await?;
//!
//! let head = robust.get_block_by_number(BlockNumberOrTag::Latest).await?;
//! println!("head: {}", head.header.number);
//! # Ok(()) }
//! ```

pub mod builder;
pub mod provider;
pub mod provider_conversion;

pub use builder::*;
pub use provider::{Error, RobustProvider};
pub use provider_conversion::{IntoRobustProvider, IntoRootProvider};
