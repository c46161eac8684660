#![allow(dead_code)]

use std::time::Duration;

use alloy::primitives::B256;
use event_confirmer::{
    ChainSelector, CommitReportAccepted, Confirmer, ConfirmerBuilder, ExecState,
    ExecutionStateChanged, SeqNum, test_utils::MockLedger,
};

pub(crate) const SOURCE: ChainSelector = 1;
pub(crate) const DEST: ChainSelector = 2;
pub(crate) const DEADLINE: Duration = Duration::from_secs(120);

pub(crate) fn confirmer(ledger: &MockLedger) -> anyhow::Result<Confirmer<MockLedger>> {
    Ok(ConfirmerBuilder::new().dest_chain(DEST).connect(ledger.clone())?)
}

pub(crate) fn commit(min: SeqNum, max: SeqNum) -> CommitReportAccepted {
    CommitReportAccepted {
        source_chain_selector: SOURCE,
        min_seq_nr: min,
        max_seq_nr: max,
        merkle_root: Some(B256::repeat_byte(0x42)),
    }
}

/// A report carrying only price updates.
pub(crate) fn price_update() -> CommitReportAccepted {
    CommitReportAccepted { merkle_root: None, ..commit(0, 0) }
}

pub(crate) fn exec(seq: SeqNum, state: ExecState) -> ExecutionStateChanged {
    ExecutionStateChanged {
        source_chain_selector: SOURCE,
        sequence_number: seq,
        message_id: B256::repeat_byte(seq as u8),
        state,
    }
}

/// Runs `action` against `ledger` once `delay` has passed.
pub(crate) fn after(
    delay: Duration,
    ledger: &MockLedger,
    action: impl FnOnce(&MockLedger) + Send + 'static,
) {
    let ledger = ledger.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        action(&ledger);
    });
}
