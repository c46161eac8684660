//! Topic filtering and payload decoding of transaction messages.
//!
//! Decoding is lenient: a message whose topic matches but whose payload cannot be decoded is
//! logged and skipped, so one malformed message never hides the valid events around it.

use std::fmt::Debug;

use alloy::primitives::{B256, Bytes, keccak256};
use thiserror::Error;

use crate::ledger::{MessageKind, OutMessage, Transaction};

/// Topic of the event named `name`.
///
/// For EVM ledgers the name is the full event signature, e.g.
/// `"ExecutionStateChanged(uint64,uint64,bytes32,uint8)"`.
#[must_use]
pub fn topic_hash(name: &str) -> B256 {
    keccak256(name.as_bytes())
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("abi decoding failed: {0}")]
    Abi(#[from] alloy::sol_types::Error),

    #[error("unknown execution state {0}")]
    UnknownExecState(u8),
}

/// An event that can be carried in a message payload.
pub trait LedgerEvent: Sized + Send + Debug + Clone + 'static {
    /// Name the topic is derived from.
    const NAME: &'static str;

    /// Decodes a message payload.
    ///
    /// # Errors
    ///
    /// Returns an error if `payload` is not a valid encoding of `Self`.
    fn decode(payload: &[u8]) -> Result<Self, DecodeError>;

    /// Encodes `self` into the payload form [`LedgerEvent::decode`] accepts.
    fn encode(&self) -> Bytes;

    #[must_use]
    fn topic() -> B256 {
        topic_hash(Self::NAME)
    }
}

/// Decodes `message` as `T` if it is an external log carrying `event_name`'s topic.
///
/// Returns `None` for internal messages, topic mismatches and malformed payloads.
#[must_use]
pub fn decode_message<T: LedgerEvent>(message: &OutMessage, event_name: &str) -> Option<T> {
    if message.kind != MessageKind::ExternalOut {
        return None;
    }
    let expected = topic_hash(event_name);
    if message.topic != Some(expected) {
        return None;
    }

    match T::decode(&message.payload) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(
                event = event_name,
                topic = %expected,
                error = %e,
                "Failed to decode event, skipping"
            );
            None
        }
    }
}

/// The first `T` carried by `tx`, if any.
#[must_use]
pub fn decode<T: LedgerEvent>(tx: &Transaction, event_name: &str) -> Option<T> {
    tx.messages.iter().find_map(|message| decode_message(message, event_name))
}

/// Every `T` carried by `txs`, in transaction order and then message order.
#[must_use]
pub fn extract<T: LedgerEvent>(txs: &[Transaction], event_name: &str) -> Vec<T> {
    txs.iter()
        .flat_map(|tx| &tx.messages)
        .filter_map(|message| decode_message(message, event_name))
        .collect()
}
