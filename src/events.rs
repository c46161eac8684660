//! Commit and execution events emitted by a destination-chain off-ramp.
//!
//! Both events travel as ABI-encoded, non-indexed log data. Their topic is the keccak256 hash of
//! the event signature, see [`topic_hash`](crate::topic_hash).

use std::fmt;

use alloy::{
    primitives::{B256, Bytes},
    sol_types::SolEvent,
};

use crate::decoder::{DecodeError, LedgerEvent};

/// Identifies a chain in the cross-chain messaging protocol.
pub type ChainSelector = u64;

/// Per-source-chain, monotonically increasing message identifier.
pub type SeqNum = u64;

mod wire {
    alloy::sol! {
        event CommitReportAccepted(
            uint64 sourceChainSelector,
            uint64 minSeqNr,
            uint64 maxSeqNr,
            bytes32 merkleRoot
        );

        event ExecutionStateChanged(
            uint64 sourceChainSelector,
            uint64 sequenceNumber,
            bytes32 messageId,
            uint8 state
        );
    }
}

/// Inclusive range of sequence numbers, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeqNumRange {
    start: SeqNum,
    end: SeqNum,
}

impl SeqNumRange {
    /// Creates a range; the bounds are reordered if given backwards.
    #[must_use]
    pub const fn new(start: SeqNum, end: SeqNum) -> Self {
        if start <= end { Self { start, end } } else { Self { start: end, end: start } }
    }

    #[must_use]
    pub const fn start(&self) -> SeqNum {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> SeqNum {
        self.end
    }

    /// Number of sequence numbers in the range, saturating at `u64::MAX`.
    #[must_use]
    pub const fn count(&self) -> u64 {
        (self.end - self.start).saturating_add(1)
    }

    /// Returns `true` if `other` lies entirely within `self`.
    #[must_use]
    pub const fn covers(&self, other: &SeqNumRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for SeqNumRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// A destination chain attests that `[min_seq_nr, max_seq_nr]` from `source_chain_selector` has
/// been committed.
///
/// A report without a merkle root only carries metadata (e.g. a price update) and says nothing
/// about sequence numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitReportAccepted {
    pub source_chain_selector: ChainSelector,
    pub min_seq_nr: SeqNum,
    pub max_seq_nr: SeqNum,
    pub merkle_root: Option<B256>,
}

impl CommitReportAccepted {
    #[must_use]
    pub const fn has_merkle_root(&self) -> bool {
        self.merkle_root.is_some()
    }

    /// The committed range, or `None` for a metadata-only report.
    #[must_use]
    pub const fn seq_num_range(&self) -> Option<SeqNumRange> {
        if self.merkle_root.is_some() {
            Some(SeqNumRange::new(self.min_seq_nr, self.max_seq_nr))
        } else {
            None
        }
    }
}

impl LedgerEvent for CommitReportAccepted {
    const NAME: &'static str = wire::CommitReportAccepted::SIGNATURE;

    fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let raw = wire::CommitReportAccepted::decode_raw_log(
            [wire::CommitReportAccepted::SIGNATURE_HASH],
            payload,
        )?;
        Ok(Self {
            source_chain_selector: raw.sourceChainSelector,
            min_seq_nr: raw.minSeqNr,
            max_seq_nr: raw.maxSeqNr,
            merkle_root: (raw.merkleRoot != B256::ZERO).then_some(raw.merkleRoot),
        })
    }

    fn encode(&self) -> Bytes {
        wire::CommitReportAccepted {
            sourceChainSelector: self.source_chain_selector,
            minSeqNr: self.min_seq_nr,
            maxSeqNr: self.max_seq_nr,
            merkleRoot: self.merkle_root.unwrap_or(B256::ZERO),
        }
        .encode_data()
        .into()
    }
}

/// Outcome of delivering one message on the destination chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExecState {
    Untouched = 0,
    InProgress = 1,
    Success = 2,
    Failure = 3,
}

impl TryFrom<u8> for ExecState {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ExecState::Untouched),
            1 => Ok(ExecState::InProgress),
            2 => Ok(ExecState::Success),
            3 => Ok(ExecState::Failure),
            other => Err(DecodeError::UnknownExecState(other)),
        }
    }
}

/// The destination chain reports a new execution state for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionStateChanged {
    pub source_chain_selector: ChainSelector,
    pub sequence_number: SeqNum,
    pub message_id: B256,
    pub state: ExecState,
}

impl LedgerEvent for ExecutionStateChanged {
    const NAME: &'static str = wire::ExecutionStateChanged::SIGNATURE;

    fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let raw = wire::ExecutionStateChanged::decode_raw_log(
            [wire::ExecutionStateChanged::SIGNATURE_HASH],
            payload,
        )?;
        Ok(Self {
            source_chain_selector: raw.sourceChainSelector,
            sequence_number: raw.sequenceNumber,
            message_id: raw.messageId,
            state: ExecState::try_from(raw.state)?,
        })
    }

    fn encode(&self) -> Bytes {
        wire::ExecutionStateChanged {
            sourceChainSelector: self.source_chain_selector,
            sequenceNumber: self.sequence_number,
            messageId: self.message_id,
            state: self.state as u8,
        }
        .encode_data()
        .into()
    }
}
