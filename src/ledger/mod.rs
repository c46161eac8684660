//! The ledger as seen by the confirmation engine.
//!
//! A [`LedgerClient`] answers three questions: where is the head, what is the handle of block
//! `n`, and which transactions touched a contract within a block span. Retries and backoff are
//! the client's business; the engine treats every call as a black box that either succeeds or
//! fails for good.

pub mod evm;

use std::ops::RangeInclusive;

use alloy::primitives::{Address, B256, BlockHash, BlockNumber, Bytes, TxHash};

use crate::error::LedgerError;

/// Identifies a block: its height plus the hash needed to address it unambiguously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockHandle {
    pub number: BlockNumber,
    pub hash: BlockHash,
}

impl BlockHandle {
    #[must_use]
    pub const fn new(number: BlockNumber, hash: BlockHash) -> Self {
        Self { number, hash }
    }
}

/// The span `(previous, to]` still to be scanned.
///
/// Without a `previous` handle the span starts at genesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub previous: Option<BlockHandle>,
    pub to: BlockHandle,
}

impl BlockRange {
    /// First block number inside the range.
    #[must_use]
    pub fn first_block(&self) -> BlockNumber {
        self.previous.map_or(0, |prev| prev.number + 1)
    }

    /// The range as inclusive block numbers.
    #[must_use]
    pub fn blocks(&self) -> RangeInclusive<BlockNumber> {
        self.first_block()..=self.to.number
    }
}

/// Whether a message leaves the ledger (a log) or stays inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Externally observable; the only kind that can carry events.
    ExternalOut,
    Internal,
}

/// A message emitted by a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutMessage {
    pub kind: MessageKind,
    /// The event topic the ledger reports for the message, if any.
    pub topic: Option<B256>,
    pub payload: Bytes,
}

impl OutMessage {
    /// An externally observable log message.
    #[must_use]
    pub fn log(topic: B256, payload: impl Into<Bytes>) -> Self {
        Self { kind: MessageKind::ExternalOut, topic: Some(topic), payload: payload.into() }
    }
}

/// A transaction that touched the watched contract, with its outbound messages in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub hash: TxHash,
    pub block_number: BlockNumber,
    pub messages: Vec<OutMessage>,
}

/// Read-only access to a ledger.
///
/// Implementations must be cheap to clone; a single client is shared by every subscriber
/// confirming against the same ledger.
pub trait LedgerClient: Clone + Send + Sync + 'static {
    /// The current head block.
    fn head(&self) -> impl Future<Output = Result<BlockHandle, LedgerError>> + Send;

    /// The handle of the block at `number`.
    fn block(
        &self,
        number: BlockNumber,
    ) -> impl Future<Output = Result<BlockHandle, LedgerError>> + Send;

    /// Every transaction within `blocks` that touched `contract`, ordered by block and then by
    /// position within the block.
    ///
    /// Ledgers without a log index reconstruct this by scanning each block in the span.
    fn transactions(
        &self,
        contract: Address,
        blocks: RangeInclusive<BlockNumber>,
    ) -> impl Future<Output = Result<Vec<Transaction>, LedgerError>> + Send;
}
