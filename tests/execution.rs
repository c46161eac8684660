mod common;

use std::{collections::BTreeMap, time::Duration};

use alloy::primitives::{B256, Bytes};
use event_confirmer::{
    ConfirmError, Coverage, ExecState, ExecutionStateChanged, LedgerEvent, MessageKind,
    OutMessage, SeqNumRange,
    test_utils::{CONTRACT, MockLedger},
};

use crate::common::{DEADLINE, DEST, SOURCE, after, commit, confirmer, exec};

#[tokio::test(start_paused = true)]
async fn completes_once_every_number_succeeded_in_any_order() -> anyhow::Result<()> {
    let ledger = MockLedger::new();
    ledger.emit(CONTRACT, &[exec(8, ExecState::Success)]);
    after(Duration::from_secs(5), &ledger, |ledger| {
        ledger.emit_each(CONTRACT, &[exec(7, ExecState::Success), exec(9, ExecState::Success)]);
    });

    let states = confirmer(&ledger)?
        .confirm_execution(SOURCE, CONTRACT, None, &[7, 8, 9], DEADLINE)
        .await?;

    let expected: BTreeMap<_, _> = [7, 8, 9].map(|seq| (seq, ExecState::Success)).into();
    assert_eq!(states, expected);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn first_failure_ends_the_wait() -> anyhow::Result<()> {
    let ledger = MockLedger::new();
    ledger.emit(CONTRACT, &[exec(7, ExecState::InProgress), exec(8, ExecState::Failure)]);
    ledger.emit(CONTRACT, &[exec(7, ExecState::Success), exec(9, ExecState::Success)]);

    let result = confirmer(&ledger)?
        .confirm_execution(SOURCE, CONTRACT, None, &[7, 8, 9], DEADLINE)
        .await;

    match result {
        Err(ConfirmError::ExecutionFailed { source_chain, sequence_number, message_id }) => {
            assert_eq!(source_chain, SOURCE);
            assert_eq!(sequence_number, 8);
            assert_eq!(message_id, B256::repeat_byte(8));
        }
        other => panic!("expected an execution failure, got {other:?}"),
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn timeout_reports_the_missing_numbers() -> anyhow::Result<()> {
    let ledger = MockLedger::new();
    ledger.emit(CONTRACT, &[exec(8, ExecState::Success), exec(9, ExecState::InProgress)]);
    let deadline = Duration::from_secs(30);

    let result = confirmer(&ledger)?
        .confirm_execution(SOURCE, CONTRACT, None, &[9, 7, 8], deadline)
        .await;

    match result {
        Err(ConfirmError::ExecutionTimeout {
            dest_chain,
            source_chain,
            missing,
            events_processed,
            resolved,
            elapsed,
        }) => {
            assert_eq!(dest_chain, DEST);
            assert_eq!(source_chain, SOURCE);
            assert_eq!(missing, vec![7, 9]);
            assert_eq!(events_processed, 2);
            assert_eq!(resolved, BTreeMap::from([(8, ExecState::Success)]));
            assert!(elapsed >= deadline);
        }
        other => panic!("expected an execution timeout, got {other:?}"),
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn timeout_without_events_reports_every_number_missing() -> anyhow::Result<()> {
    let ledger = MockLedger::new();
    ledger.mine_empty(5);

    let result = confirmer(&ledger)?
        .confirm_execution(SOURCE, CONTRACT, None, &[7, 8, 9], Duration::from_secs(30))
        .await;

    match result {
        Err(ConfirmError::ExecutionTimeout { missing, events_processed, resolved, .. }) => {
            assert_eq!(missing, vec![7, 8, 9]);
            assert_eq!(events_processed, 0);
            assert!(resolved.is_empty());
        }
        other => panic!("expected an execution timeout, got {other:?}"),
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn start_block_excludes_itself_and_earlier_blocks() -> anyhow::Result<()> {
    let ledger = MockLedger::new();
    ledger.emit(CONTRACT, &[exec(7, ExecState::Success)]);
    let start = ledger.emit(CONTRACT, &[exec(8, ExecState::Success)]);
    ledger.emit(CONTRACT, &[exec(9, ExecState::Success)]);

    let result = confirmer(&ledger)?
        .confirm_execution(SOURCE, CONTRACT, Some(start), &[7, 8, 9], Duration::from_secs(20))
        .await;

    assert!(matches!(
        result,
        Err(ConfirmError::ExecutionTimeout { ref missing, events_processed: 1, .. })
            if *missing == vec![7, 8]
    ));
    assert_eq!(ledger.transaction_calls().first(), Some(&(start + 1..=start + 1)));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn duplicates_and_unrelated_traffic_are_ignored() -> anyhow::Result<()> {
    let ledger = MockLedger::new();
    let foreign =
        ExecutionStateChanged { source_chain_selector: 77, ..exec(7, ExecState::Failure) };
    let internal = OutMessage {
        kind: MessageKind::Internal,
        topic: Some(ExecutionStateChanged::topic()),
        payload: exec(7, ExecState::Failure).encode(),
    };
    ledger.emit(CONTRACT, &[foreign, exec(100, ExecState::Failure), exec(7, ExecState::Success)]);
    ledger.mine(CONTRACT, vec![internal]);
    ledger.emit(CONTRACT, &[exec(7, ExecState::Failure)]);
    ledger.emit(CONTRACT, &[exec(8, ExecState::Success)]);

    let states = confirmer(&ledger)?
        .confirm_execution(SOURCE, CONTRACT, None, &[7, 8], DEADLINE)
        .await?;

    assert_eq!(states.len(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn unknown_state_is_skipped() -> anyhow::Result<()> {
    let ledger = MockLedger::new();
    let mut payload = exec(7, ExecState::Success).encode().to_vec();
    // `state` is the last ABI word.
    if let Some(state) = payload.last_mut() {
        *state = 9;
    }
    ledger.mine(CONTRACT, vec![OutMessage::log(ExecutionStateChanged::topic(), payload)]);
    ledger.mine(
        CONTRACT,
        vec![OutMessage::log(ExecutionStateChanged::topic(), Bytes::from_static(b"garbage"))],
    );

    let result = confirmer(&ledger)?
        .confirm_execution(SOURCE, CONTRACT, None, &[7], Duration::from_secs(20))
        .await;

    assert!(matches!(result, Err(ConfirmError::ExecutionTimeout { events_processed: 0, .. })));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn commit_and_execution_confirmed_together() -> anyhow::Result<()> {
    let ledger = MockLedger::new();
    ledger.emit(CONTRACT, &[commit(1, 3)]);
    after(Duration::from_secs(10), &ledger, |ledger| {
        ledger.emit_each(CONTRACT, &[1, 2, 3].map(|seq| exec(seq, ExecState::Success)));
    });

    let (committed, states) = confirmer(&ledger)?
        .confirm_commit_and_execution(SOURCE, CONTRACT, None, SeqNumRange::new(1, 3), DEADLINE)
        .await?;

    assert_eq!(committed.coverage, Coverage::SingleReport);
    assert_eq!(states.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn execution_failure_ends_the_combined_wait() -> anyhow::Result<()> {
    let ledger = MockLedger::new();
    ledger.emit(CONTRACT, &[exec(2, ExecState::Failure)]);

    let result = confirmer(&ledger)?
        .confirm_commit_and_execution(SOURCE, CONTRACT, None, SeqNumRange::new(1, 3), DEADLINE)
        .await;

    assert!(matches!(result, Err(ConfirmError::ExecutionFailed { sequence_number: 2, .. })));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn unbounded_range_is_refused_without_polling() -> anyhow::Result<()> {
    let ledger = MockLedger::new();

    let result = confirmer(&ledger)?
        .confirm_commit_and_execution(
            SOURCE,
            CONTRACT,
            None,
            SeqNumRange::new(0, u64::MAX),
            Duration::from_secs(5),
        )
        .await;

    assert!(matches!(result, Err(ConfirmError::ExpectationTooLarge { .. })));
    assert!(ledger.transaction_calls().is_empty());
    Ok(())
}
