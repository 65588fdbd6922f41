use super::clock::Clock;
use crate::batch::{next_flush_boundary, AddResult, HourlyAccumulator};
use crate::source::{FetchOutcome, RowSourceAdapter, TablePages};
use crate::sync::{ArtifactStore, ArtifactSyncClient, RemoteId};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Stopped,
    Running,
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Poll found no new rows and nothing was waiting to be synced.
    NoData,
    /// Flush found an empty bucket; no remote call was made.
    Empty,
    /// The row source failed; the watermark was left in place.
    FetchFailed,
    Synced {
        filename: String,
        remote_id: RemoteId,
        rows: usize,
    },
    /// The bucket is kept and the sync is retried on the next tick.
    SyncFailed { filename: String },
}

/// Runs the poll+sync and hour-flush ticks one at a time.
///
/// Every tick runs to completion, remote calls included, before the next one
/// is dispatched. The bucket, the filename cache and the watermark are only
/// touched through `&mut self`.
pub struct Driver<T, S, C> {
    source: RowSourceAdapter<T>,
    accumulator: HourlyAccumulator,
    sync: ArtifactSyncClient<S>,
    clock: C,
    poll_interval: Duration,
    state: DriverState,
    pending_sync: bool,
}

impl<T, S, C> Driver<T, S, C>
where
    T: TablePages,
    S: ArtifactStore,
    C: Clock,
{
    pub fn new(
        source: RowSourceAdapter<T>,
        accumulator: HourlyAccumulator,
        sync: ArtifactSyncClient<S>,
        clock: C,
        poll_interval: Duration,
    ) -> Self {
        Self {
            source,
            accumulator,
            sync,
            clock,
            poll_interval,
            state: DriverState::Stopped,
            pending_sync: false,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn source(&self) -> &RowSourceAdapter<T> {
        &self.source
    }

    pub fn accumulator(&self) -> &HourlyAccumulator {
        &self.accumulator
    }

    pub fn sync_client(&self) -> &ArtifactSyncClient<S> {
        &self.sync
    }

    /// Fetch new rows, add them to the current bucket and sync the rendered
    /// bucket. A bucket whose last sync failed is synced again even when no
    /// new rows arrived or the fetch failed.
    pub async fn poll_tick(&mut self) -> TickOutcome {
        info!("Reading new rows");
        let outcome = self.source.poll(self.clock.now()).await;

        if let FetchOutcome::Failed { .. } = outcome {
            if self.pending_sync {
                info!("Retrying the pending sync despite the failed fetch");
                return self.flush().await;
            }
            return TickOutcome::FetchFailed;
        }

        let (rows, _) = outcome.into_parts();
        if rows.is_empty() && !self.pending_sync {
            info!("No new data found");
            return TickOutcome::NoData;
        }

        if let AddResult::RolledOver {
            dropped: Some(previous),
            ..
        } = self.accumulator.add_rows(rows, self.clock.now())
        {
            if self.pending_sync {
                warn!(hour = %previous, "Previous hour was never synced successfully");
            }
            self.pending_sync = false;
        }

        self.flush().await
    }

    /// Sync whatever the current bucket holds. Fires at minute 0, before new
    /// rows roll the bucket over, so the previous hour's file gets its final
    /// contents.
    pub async fn hour_flush_tick(&mut self) -> TickOutcome {
        info!("Hour boundary reached, ensuring current CSV is uploaded");
        let outcome = self.flush().await;
        if outcome == TickOutcome::Empty {
            info!("No data for current hour to upload");
        }
        outcome
    }

    /// Final flush on the way to `Stopped`.
    pub async fn shutdown(&mut self) -> TickOutcome {
        info!("Stopping, uploading remaining data");
        let outcome = self.flush().await;
        self.state = DriverState::Stopped;
        info!("Driver stopped");
        outcome
    }

    async fn flush(&mut self) -> TickOutcome {
        let Some(content) = self.accumulator.render_current() else {
            self.pending_sync = false;
            return TickOutcome::Empty;
        };

        let filename = self.accumulator.current_filename(self.clock.now());
        let rows = self.accumulator.row_count();

        match self.sync.sync_artifact(&content, &filename).await {
            Ok(remote_id) => {
                self.pending_sync = false;
                TickOutcome::Synced {
                    filename,
                    remote_id,
                    rows,
                }
            }
            Err(_) => {
                self.pending_sync = true;
                warn!(filename = %filename, rows = rows, "Sync failed, will retry on next tick");
                TickOutcome::SyncFailed { filename }
            }
        }
    }

    fn next_flush_at(&self, last_flushed: Option<DateTime<Utc>>) -> DateTime<Utc> {
        next_flush_boundary(self.clock.now(), self.accumulator.zone(), last_flushed)
    }

    fn until(&self, instant: DateTime<Utc>) -> Duration {
        (instant - self.clock.now()).to_std().unwrap_or(Duration::ZERO)
    }

    /// Dispatch ticks until `shutdown` resolves, then flush once more.
    pub async fn run<F>(&mut self, shutdown: F) -> TickOutcome
    where
        F: Future<Output = ()>,
    {
        self.state = DriverState::Running;
        info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            "Driver started"
        );

        let mut poll = tokio::time::interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);
        let mut last_flushed = None;

        loop {
            let flush_at = self.next_flush_at(last_flushed);
            let hour_flush = tokio::time::sleep(self.until(flush_at));

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Received shutdown signal");
                    break;
                }
                _ = hour_flush => {
                    self.hour_flush_tick().await;
                    last_flushed = Some(flush_at);
                }
                _ = poll.tick() => {
                    self.poll_tick().await;
                }
            }
        }

        self.shutdown().await
    }
}
