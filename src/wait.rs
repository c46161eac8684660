//! The consumer driver.

use std::time::Duration;

use tokio::time::{Instant, interval_at, sleep};
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::{
    decoder::LedgerEvent, error::ConfirmError, ledger::LedgerClient, subscriber::EventSubscriber,
};

/// Interval of the "still waiting" heartbeat.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(15);

/// Verdict of a completion predicate on one event.
#[derive(Debug)]
pub enum Progress {
    /// Keep consuming.
    Pending,
    /// The expectation is met.
    Done,
    /// Stop and report this error.
    Failed(ConfirmError),
}

/// How a successful wait went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitSummary {
    /// Events handed to the predicate, the final one included.
    pub events_seen: usize,
    pub elapsed: Duration,
}

/// Feeds `subscriber`'s events to `on_event` until it returns [`Progress::Done`].
///
/// Exactly one outcome is returned: success, the predicate's error, the subscriber's error, or
/// [`ConfirmError::Timeout`] once `deadline` has passed. Whatever the outcome, the subscriber's
/// poll loop is cancelled before this returns.
///
/// The deadline is checked against the consumer's clock only. An RPC call already in flight is
/// not interrupted, so the poll loop may briefly outlive it.
///
/// # Errors
///
/// See above; also [`ConfirmError::StreamClosed`] if the poll loop stops without reporting why,
/// and the configuration errors of [`EventSubscriber::stream`].
#[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip_all))]
pub async fn wait_until<C, T, F>(
    subscriber: &EventSubscriber<C, T>,
    deadline: Duration,
    mut on_event: F,
) -> Result<WaitSummary, ConfirmError>
where
    C: LedgerClient,
    T: LedgerEvent,
    F: FnMut(T) -> Progress,
{
    let cancel = CancellationToken::new();
    let _cancel_on_exit = cancel.clone().drop_guard();
    let mut stream = subscriber.stream(cancel)?;

    let started = Instant::now();
    let progress = subscriber.progress_interval;
    let mut heartbeat = interval_at(started + progress, progress);
    let timer = sleep(deadline);
    tokio::pin!(timer);

    let mut events_seen = 0usize;

    loop {
        tokio::select! {
            biased;

            Some(err) = stream.errors.next() => return Err(err),

            next = stream.events.next() => {
                let Some(event) = next else {
                    // The loop has exited; an error it sent may still be queued.
                    return Err(stream.errors.next().await.unwrap_or(ConfirmError::StreamClosed));
                };
                events_seen += 1;
                match on_event(event) {
                    Progress::Pending => {}
                    Progress::Done => {
                        return Ok(WaitSummary { events_seen, elapsed: started.elapsed() });
                    }
                    Progress::Failed(err) => return Err(err),
                }
            }

            _ = heartbeat.tick() => {
                info!(
                    event = subscriber.name(),
                    elapsed_secs = started.elapsed().as_secs(),
                    events_seen = events_seen,
                    "Still waiting"
                );
            }

            () = &mut timer => {
                let elapsed = started.elapsed();
                error!(
                    event = subscriber.name(),
                    elapsed_secs = elapsed.as_secs(),
                    events_seen = events_seen,
                    "Timed out waiting for events"
                );
                return Err(ConfirmError::Timeout { elapsed });
            }
        }
    }
}
