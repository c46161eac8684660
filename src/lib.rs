//! Event-Confirmer decides whether cross-chain messages have been committed and executed on a
//! destination ledger.
//!
//! The ledger is only reachable through block-range polling. An [`EventSubscriber`] polls it for
//! new blocks, loads the transactions that touched a contract, decodes one event kind out of their
//! logs, and streams the events to [`wait_until`], which feeds them to a completion predicate
//! until it is satisfied, an error occurs, or a deadline passes.
//!
//! Two predicates are provided:
//!
//! * [`CommitCoverageTracker`] accepts once commit reports cover an expected sequence-number
//!   range, whether in one report or across several overlapping ones.
//! * [`ExecutionPendingTracker`] accepts once every expected sequence number has executed
//!   successfully, and fails on the first failed execution.
//!
//! Most callers go through [`Confirmer`], built with [`ConfirmerBuilder`]:
//!
//! ```no_run
//! # use std::time::Duration;
//! # use alloy::primitives::address;
//! # use event_confirmer::{ConfirmerBuilder, EvmLedger, SeqNumRange};
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let ledger: EvmLedger = EvmLedger::connect("http://localhost:8545").await?;
//! let confirmer = ConfirmerBuilder::new().dest_chain(2).connect(ledger)?;
//! let off_ramp = address!("0x00000000000000000000000000000000000c0ffe");
//!
//! let commit = confirmer
//!     .confirm_commit(1, off_ramp, SeqNumRange::new(100, 105), Duration::from_secs(300))
//!     .await?;
//! let states = confirmer
//!     .confirm_execution(1, off_ramp, None, &[100, 101, 102], Duration::from_secs(300))
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Errors
//!
//! Every confirmation returns exactly one [`ConfirmError`]. Ledger failures are not retried by
//! the engine: retries and failover belong to the client (see [`robust_provider`]). Payloads that
//! fail to decode are logged and skipped.
//!
//! # Duplicates
//!
//! Events are never deduplicated. A subscriber starting from a lookback window may re-read
//! history another subscriber already saw; both trackers tolerate replays.
//!
//! # Deadlines
//!
//! A deadline bounds how long the consumer waits, not the RPC calls already in flight. Treat it
//! as a lower bound on the wait.

#[macro_use]
mod logging;

pub mod block_range;
pub mod confirm;
pub mod decoder;
pub mod events;
pub mod ledger;
pub mod loader;
pub mod range_iterator;
pub mod robust_provider;
pub mod subscriber;
pub mod tracker;
pub mod wait;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

mod error;

pub use block_range::{DEFAULT_LOOKBACK_BLOCKS, resolve_next_range, start_block_with_lookback};
pub use confirm::{CommitConfirmation, Confirmer, ConfirmerBuilder, MAX_EXPECTED_SEQ_NUMS};
pub use decoder::{DecodeError, LedgerEvent, extract, topic_hash};
pub use error::{ConfirmError, LedgerError};
pub use events::{
    ChainSelector, CommitReportAccepted, ExecState, ExecutionStateChanged, SeqNum, SeqNumRange,
};
pub use ledger::{
    BlockHandle, BlockRange, LedgerClient, MessageKind, OutMessage, Transaction, evm::EvmLedger,
};
pub use loader::{DEFAULT_TX_BATCH_SIZE, TransactionLoader};
pub use robust_provider::DEFAULT_CLIENT_RETRIES;
pub use subscriber::{DEFAULT_POLL_INTERVAL, EventStream, EventSubscriber};
pub use tracker::{CommitCoverageTracker, Coverage, ExecutionPendingTracker};
pub use wait::{DEFAULT_PROGRESS_INTERVAL, Progress, WaitSummary, wait_until};
