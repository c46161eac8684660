use std::{collections::BTreeMap, time::Duration};

use alloy::primitives::{B256, BlockNumber};
use thiserror::Error;

use crate::{
    events::{ChainSelector, ExecState, SeqNum, SeqNumRange},
    robust_provider::Error as RobustProviderError,
};

/// Errors reported by a [`LedgerClient`](crate::ledger::LedgerClient).
///
/// The engine never retries these; any retry policy lives inside the client.
#[derive(Error, Debug, Clone)]
pub enum LedgerError {
    #[error(transparent)]
    Rpc(#[from] RobustProviderError),

    #[error("block {0} not found")]
    BlockNotFound(BlockNumber),

    /// A client-specific failure that does not map onto an RPC error.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// The single error a confirmation call reports.
///
/// Exactly one kind is returned per call: an RPC failure while polling, an on-chain execution
/// failure, a timeout, or a configuration problem.
#[derive(Error, Debug, Clone)]
pub enum ConfirmError {
    #[error("failed to get current head height: {0}")]
    HeadHeight(#[source] LedgerError),

    #[error("failed to lookup block {number}: {source}")]
    LookupBlock {
        number: BlockNumber,
        #[source]
        source: LedgerError,
    },

    #[error("failed to load transactions in blocks [{from_block}, {to_block}]: {source}")]
    LoadTransactions {
        from_block: BlockNumber,
        to_block: BlockNumber,
        #[source]
        source: LedgerError,
    },

    #[error(
        "execution failed for sequence number {sequence_number} from source chain {source_chain}, message ID: {message_id}"
    )]
    ExecutionFailed { source_chain: ChainSelector, sequence_number: SeqNum, message_id: B256 },

    #[error("timed out waiting for events: after {elapsed:?}")]
    Timeout { elapsed: Duration },

    #[error(
        "timed out after {elapsed:?} waiting for commit report on chain {dest_chain} from source chain {source_chain} expected seq nums {expected} (processed {reports_processed} reports)"
    )]
    CommitTimeout {
        dest_chain: ChainSelector,
        source_chain: ChainSelector,
        expected: SeqNumRange,
        reports_processed: usize,
        elapsed: Duration,
    },

    #[error(
        "timed out after {elapsed:?} waiting for execution on chain {dest_chain} from source chain {source_chain}, missing seq nums: {missing:?} (processed {events_processed} events, {successful} successful)",
        successful = .resolved.len()
    )]
    ExecutionTimeout {
        dest_chain: ChainSelector,
        source_chain: ChainSelector,
        missing: Vec<SeqNum>,
        events_processed: usize,
        /// Final states of the sequence numbers that did execute before the deadline.
        resolved: BTreeMap<SeqNum, ExecState>,
        elapsed: Duration,
    },

    /// The event stream ended without delivering a terminal error.
    #[error("event stream closed before the expectation was met")]
    StreamClosed,

    #[error("no expected sequence numbers provided")]
    NoExpectedSeqNums,

    #[error(
        "expected range {expected} holds {count} sequence numbers, more than the {max} allowed"
    )]
    ExpectationTooLarge { expected: SeqNumRange, count: u64, max: u64 },

    #[error("poll interval must be greater than 0")]
    InvalidPollInterval,

    #[error("progress interval must be greater than 0")]
    InvalidProgressInterval,

    #[error("transaction batch size must be greater than 0")]
    InvalidBatchSize,
}

impl ConfirmError {
    /// Returns `true` for every timeout flavour, annotated or not.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ConfirmError::Timeout { .. }
                | ConfirmError::CommitTimeout { .. }
                | ConfirmError::ExecutionTimeout { .. }
        )
    }
}
