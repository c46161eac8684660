//! The polling producer.
//!
//! An [`EventSubscriber`] describes what to watch. [`EventSubscriber::stream`] spawns the poll
//! loop and hands back the two receiving ends it feeds:
//!
//! * `events` yields every decoded `T`, in ledger order. The channel holds a single event, so
//!   the loop cannot run ahead of its consumer.
//! * `errors` yields at most one [`ConfirmError`]. After sending it the loop exits for good.
//!
//! Both channels close when the loop exits, whether through an error, cancellation, or every
//! receiver being dropped.

use std::{marker::PhantomData, time::Duration};

use alloy::primitives::{Address, BlockNumber};
use tokio::{
    sync::mpsc,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::{
    block_range::{DEFAULT_LOOKBACK_BLOCKS, resolve_next_range, start_block_with_lookback},
    decoder::{LedgerEvent, extract},
    error::ConfirmError,
    ledger::LedgerClient,
    loader::{DEFAULT_TX_BATCH_SIZE, TransactionLoader},
    wait::DEFAULT_PROGRESS_INTERVAL,
};

/// Time between two polls of the ledger head.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2500);

/// Receiving ends of a running subscription.
#[derive(Debug)]
pub struct EventStream<T> {
    pub events: ReceiverStream<T>,
    pub errors: ReceiverStream<ConfirmError>,
}

/// Watches one contract for one event kind.
#[derive(Debug, Clone)]
pub struct EventSubscriber<C, T> {
    client: C,
    contract: Address,
    event_name: &'static str,
    start_block: Option<BlockNumber>,
    lookback: u64,
    poll_interval: Duration,
    batch_size: u64,
    pub(crate) progress_interval: Duration,
    _event: PhantomData<fn() -> T>,
}

impl<C: LedgerClient, T: LedgerEvent> EventSubscriber<C, T> {
    /// Subscribes to `T` emitted by `contract`, matching on [`LedgerEvent::NAME`].
    #[must_use]
    pub fn new(client: C, contract: Address) -> Self {
        Self {
            client,
            contract,
            event_name: T::NAME,
            start_block: None,
            lookback: DEFAULT_LOOKBACK_BLOCKS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            batch_size: DEFAULT_TX_BATCH_SIZE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            _event: PhantomData,
        }
    }

    /// Matches messages on `name`'s topic instead of [`LedgerEvent::NAME`].
    #[must_use]
    pub fn event_name(mut self, name: &'static str) -> Self {
        self.event_name = name;
        self
    }

    /// Scans blocks after `block`. `None` or `Some(0)` starts `lookback` blocks behind the head.
    #[must_use]
    pub fn start_block(mut self, block: Option<BlockNumber>) -> Self {
        self.start_block = block;
        self
    }

    #[must_use]
    pub fn lookback(mut self, blocks: u64) -> Self {
        self.lookback = blocks;
        self
    }

    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Blocks requested per transaction-load call.
    #[must_use]
    pub fn batch_size(mut self, blocks: u64) -> Self {
        self.batch_size = blocks;
        self
    }

    /// How often [`wait_until`](crate::wait_until) logs that it is still waiting.
    #[must_use]
    pub fn progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    #[must_use]
    pub fn client(&self) -> &C {
        &self.client
    }

    #[must_use]
    pub fn contract(&self) -> Address {
        self.contract
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.event_name
    }

    pub(crate) fn validate(&self) -> Result<(), ConfirmError> {
        if self.poll_interval.is_zero() {
            return Err(ConfirmError::InvalidPollInterval);
        }
        if self.progress_interval.is_zero() {
            return Err(ConfirmError::InvalidProgressInterval);
        }
        if self.batch_size == 0 {
            return Err(ConfirmError::InvalidBatchSize);
        }
        Ok(())
    }

    /// Spawns the poll loop. It runs until `cancel` fires, an error is reported, or both
    /// receivers are dropped.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if a zero poll interval, progress interval or batch size was configured.
    pub fn stream(&self, cancel: CancellationToken) -> Result<EventStream<T>, ConfirmError> {
        self.validate()?;

        let (event_tx, event_rx) = mpsc::channel(1);
        let (error_tx, error_rx) = mpsc::channel(1);

        let worker = self.clone();
        tokio::spawn(async move { worker.run(event_tx, error_tx, cancel).await });

        Ok(EventStream {
            events: ReceiverStream::new(event_rx),
            errors: ReceiverStream::new(error_rx),
        })
    }

    async fn run(
        self,
        events: mpsc::Sender<T>,
        errors: mpsc::Sender<ConfirmError>,
        cancel: CancellationToken,
    ) {
        let mut last_processed = match self.start_block {
            Some(block) if block > 0 => block,
            _ => start_block_with_lookback(&self.client, self.lookback).await,
        };
        info!(
            event = self.event_name,
            contract = %self.contract,
            start_block = last_processed,
            "Starting event subscription"
        );

        let loader = TransactionLoader::new(self.client.clone(), self.batch_size);
        let mut ticker = interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!(event = self.event_name, "Subscription cancelled");
                    return;
                }
                _ = ticker.tick() => {}
            }

            let batch = match self.poll(&loader, last_processed).await {
                Ok(Some(batch)) => batch,
                Ok(None) => continue,
                Err(err) => {
                    error!(event = self.event_name, error = %err, "Event subscription failed");
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => {}
                        _ = errors.send(err) => {}
                    }
                    return;
                }
            };

            for event in batch.events {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        debug!(event = self.event_name, "Subscription cancelled");
                        return;
                    }
                    sent = events.send(event) => {
                        if sent.is_err() {
                            debug!(event = self.event_name, "Event receiver dropped");
                            return;
                        }
                    }
                }
            }

            last_processed = batch.to_block;
        }
    }

    /// One poll cycle. `None` when the head has not moved.
    async fn poll(
        &self,
        loader: &TransactionLoader<C>,
        last_processed: BlockNumber,
    ) -> Result<Option<Batch<T>>, ConfirmError> {
        let (range, head) = resolve_next_range(&self.client, last_processed).await?;
        let Some(range) = range else {
            return Ok(None);
        };

        let txs = loader.load(&range, self.contract).await?;
        let events = extract::<T>(&txs, self.event_name);

        debug!(
            event = self.event_name,
            from_block = range.first_block(),
            to_block = head,
            tx_count = txs.len(),
            event_count = events.len(),
            "Scanned block range"
        );

        Ok(Some(Batch { events, to_block: head }))
    }
}

struct Batch<T> {
    events: Vec<T>,
    to_block: BlockNumber,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        events::{ExecState, ExecutionStateChanged},
        test_utils::{CONTRACT, MockLedger},
    };
    use alloy::primitives::B256;
    use tokio_stream::StreamExt;

    fn exec(seq: u64) -> ExecutionStateChanged {
        ExecutionStateChanged {
            source_chain_selector: 1,
            sequence_number: seq,
            message_id: B256::repeat_byte(seq as u8),
            state: ExecState::Success,
        }
    }

    #[test]
    fn rejects_zero_intervals_and_batch_size() {
        let ledger = MockLedger::new();
        let base = EventSubscriber::<_, ExecutionStateChanged>::new(ledger, CONTRACT);

        assert!(matches!(
            base.clone().poll_interval(Duration::ZERO).validate(),
            Err(ConfirmError::InvalidPollInterval)
        ));
        assert!(matches!(
            base.clone().progress_interval(Duration::ZERO).validate(),
            Err(ConfirmError::InvalidProgressInterval)
        ));
        assert!(matches!(
            base.clone().batch_size(0).validate(),
            Err(ConfirmError::InvalidBatchSize)
        ));
        assert!(base.validate().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn streams_events_after_the_start_block() -> anyhow::Result<()> {
        let ledger = MockLedger::new();
        ledger.emit(CONTRACT, &[exec(1)]);
        let start = ledger.emit(CONTRACT, &[exec(2)]);
        ledger.emit(CONTRACT, &[exec(3), exec(4)]);

        let subscriber = EventSubscriber::<_, ExecutionStateChanged>::new(ledger, CONTRACT)
            .start_block(Some(start));
        let mut stream = subscriber.stream(CancellationToken::new())?;

        assert_eq!(stream.events.next().await, Some(exec(3)));
        assert_eq!(stream.events.next().await, Some(exec(4)));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn picks_up_blocks_mined_while_polling() -> anyhow::Result<()> {
        let ledger = MockLedger::new();
        let start = ledger.mine_empty(5);
        let subscriber = EventSubscriber::<_, ExecutionStateChanged>::new(ledger.clone(), CONTRACT)
            .start_block(Some(start));
        let mut stream = subscriber.stream(CancellationToken::new())?;

        tokio::time::sleep(DEFAULT_POLL_INTERVAL * 3).await;
        ledger.emit(CONTRACT, &[exec(7)]);

        assert_eq!(stream.events.next().await, Some(exec(7)));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn reports_one_error_and_closes() -> anyhow::Result<()> {
        let ledger = MockLedger::new();
        ledger.mine_empty(3);
        ledger.fail_head(crate::error::LedgerError::Unavailable("down".into()));

        let subscriber = EventSubscriber::<_, ExecutionStateChanged>::new(ledger, CONTRACT)
            .start_block(Some(1));
        let mut stream = subscriber.stream(CancellationToken::new())?;

        assert!(matches!(stream.errors.next().await, Some(ConfirmError::HeadHeight(_))));
        assert!(stream.errors.next().await.is_none());
        assert!(stream.events.next().await.is_none());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_closes_both_channels_silently() -> anyhow::Result<()> {
        let ledger = MockLedger::new();
        let start = ledger.mine_empty(1);
        ledger.emit(CONTRACT, &[exec(1), exec(2)]);

        let cancel = CancellationToken::new();
        let subscriber = EventSubscriber::<_, ExecutionStateChanged>::new(ledger, CONTRACT)
            .start_block(Some(start));
        let mut stream = subscriber.stream(cancel.clone())?;

        assert_eq!(stream.events.next().await, Some(exec(1)));
        cancel.cancel();

        // `exec(2)` may already sit in the channel; nothing follows it.
        let rest: Vec<_> = (&mut stream.events).collect().await;
        assert!(rest.len() <= 1);
        assert!(stream.errors.next().await.is_none());
        Ok(())
    }
}
