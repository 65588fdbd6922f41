//! Driver behaviour against in-memory table and store fakes.

mod common;

use common::{ts, MemoryStore, MemoryTable, TokioClock};
use hourly_export::batch::HourlyAccumulator;
use hourly_export::config::LabelZone;
use hourly_export::scheduler::{Clock, Driver, DriverState, ManualClock, TickOutcome};
use hourly_export::source::{RowSourceAdapter, Watermark};
use hourly_export::sync::ArtifactSyncClient;
use std::sync::Arc;
use std::time::Duration;

type TestDriver<C = ManualClock> = Driver<Arc<MemoryTable>, Arc<MemoryStore>, C>;

fn setup<C: Clock + Clone>(clock: &C) -> (TestDriver<C>, Arc<MemoryTable>, Arc<MemoryStore>) {
    let table = Arc::new(MemoryTable::default());
    let store = Arc::new(MemoryStore::default());
    let driver = Driver::new(
        RowSourceAdapter::new(table.clone(), Duration::from_secs(3600)),
        HourlyAccumulator::new("locness_data", LabelZone::Utc),
        ArtifactSyncClient::new(store.clone()),
        clock.clone(),
        Duration::from_secs(60),
    );
    (driver, table, store)
}

fn synced_filename(outcome: &TickOutcome) -> &str {
    match outcome {
        TickOutcome::Synced { filename, .. } => filename,
        other => panic!("expected a sync, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_table_makes_no_remote_calls() {
    let clock = ManualClock::new(ts(10, 30));
    let (mut driver, table, store) = setup(&clock);

    assert_eq!(driver.poll_tick().await, TickOutcome::NoData);
    clock.advance(chrono::Duration::minutes(1));
    assert_eq!(driver.poll_tick().await, TickOutcome::NoData);
    assert_eq!(driver.hour_flush_tick().await, TickOutcome::Empty);

    assert_eq!(table.windows().len(), 2);
    assert_eq!(store.lookups(), 0);
    assert_eq!(store.creates(), 0);
    assert_eq!(store.replaces(), 0);
}

#[tokio::test]
async fn test_first_poll_creates_hourly_file() {
    let clock = ManualClock::new(ts(10, 30));
    let (mut driver, table, store) = setup(&clock);
    table.insert(ts(10, 10), 1);
    table.insert(ts(10, 20), 2);
    // Older than the initial lookback
    table.insert(ts(9, 0), 0);

    let outcome = driver.poll_tick().await;
    assert_eq!(
        outcome,
        TickOutcome::Synced {
            filename: "locness_data_20260309_10.csv".to_string(),
            remote_id: "file-1".to_string(),
            rows: 2,
        }
    );

    let object = store.object("locness_data_20260309_10.csv").unwrap();
    assert_eq!(
        object.content,
        "datetime_utc,temp\n2026-03-09T10:10:00Z,1\n2026-03-09T10:20:00Z,2\n"
    );
}

#[tokio::test]
async fn test_repeated_syncs_replace_one_object() {
    let clock = ManualClock::new(ts(10, 30));
    let (mut driver, table, store) = setup(&clock);

    table.insert(ts(10, 10), 1);
    driver.poll_tick().await;

    table.insert(ts(10, 30) + chrono::Duration::seconds(20), 2);
    clock.advance(chrono::Duration::minutes(1));
    let outcome = driver.poll_tick().await;
    assert_eq!(synced_filename(&outcome), "locness_data_20260309_10.csv");

    let objects = store.objects();
    assert_eq!(objects.len(), 1);
    assert_eq!(
        objects[0].content,
        "datetime_utc,temp\n2026-03-09T10:10:00Z,1\n2026-03-09T10:30:20Z,2\n"
    );
    assert_eq!(store.lookups(), 1);
    assert_eq!(store.creates(), 1);
    assert_eq!(store.replaces(), 1);
}

#[tokio::test]
async fn test_new_hour_starts_new_file() {
    let clock = ManualClock::new(ts(10, 30));
    let (mut driver, table, store) = setup(&clock);

    table.insert(ts(10, 10), 1);
    driver.poll_tick().await;

    table.insert(ts(11, 2), 2);
    clock.set(ts(11, 5));
    let outcome = driver.poll_tick().await;
    assert_eq!(synced_filename(&outcome), "locness_data_20260309_11.csv");

    assert_eq!(store.objects().len(), 2);
    assert_eq!(
        store.object("locness_data_20260309_11.csv").unwrap().content,
        "datetime_utc,temp\n2026-03-09T11:02:00Z,2\n"
    );
    // The previous hour's file keeps its last synced contents
    assert_eq!(
        store.object("locness_data_20260309_10.csv").unwrap().content,
        "datetime_utc,temp\n2026-03-09T10:10:00Z,1\n"
    );
    assert_eq!(driver.accumulator().row_count(), 1);
}

#[tokio::test]
async fn test_hour_flush_syncs_previous_hour_file() {
    let clock = ManualClock::new(ts(10, 30));
    let (mut driver, table, store) = setup(&clock);

    table.insert(ts(10, 10), 1);
    driver.poll_tick().await;

    clock.set(ts(11, 0));
    let outcome = driver.hour_flush_tick().await;
    assert_eq!(synced_filename(&outcome), "locness_data_20260309_10.csv");
    assert_eq!(store.objects().len(), 1);
    assert_eq!(store.replaces(), 1);
}

#[tokio::test]
async fn test_fetch_failure_keeps_watermark() {
    let clock = ManualClock::new(ts(10, 0));
    let (mut driver, table, store) = setup(&clock);

    table.insert(ts(9, 50), 1);
    driver.poll_tick().await;
    assert_eq!(driver.source().watermark(), Some(Watermark::at(ts(10, 0))));

    table.set_failing(true);
    table.insert(ts(10, 0) + chrono::Duration::seconds(30), 2);
    clock.set(ts(10, 1));
    assert_eq!(driver.poll_tick().await, TickOutcome::FetchFailed);
    assert_eq!(driver.source().watermark(), Some(Watermark::at(ts(10, 0))));
    assert_eq!(store.replaces(), 0);

    table.set_failing(false);
    clock.set(ts(10, 2));
    let outcome = driver.poll_tick().await;
    assert!(matches!(outcome, TickOutcome::Synced { rows: 2, .. }));

    let last = *table.windows().last().unwrap();
    assert_eq!(last.lower, Watermark::at(ts(10, 0)));
    assert_eq!(last.upper, Watermark::at(ts(10, 2)));
}

#[tokio::test]
async fn test_failed_sync_is_retried_without_new_rows() {
    let clock = ManualClock::new(ts(10, 30));
    let (mut driver, table, store) = setup(&clock);

    table.insert(ts(10, 10), 1);
    store.set_failing_writes(true);
    assert_eq!(
        driver.poll_tick().await,
        TickOutcome::SyncFailed {
            filename: "locness_data_20260309_10.csv".to_string()
        }
    );
    assert!(store.objects().is_empty());

    store.set_failing_writes(false);
    clock.advance(chrono::Duration::minutes(1));
    let outcome = driver.poll_tick().await;
    assert!(matches!(outcome, TickOutcome::Synced { rows: 1, .. }));
    assert_eq!(store.objects().len(), 1);

    // Nothing pending any more
    clock.advance(chrono::Duration::minutes(1));
    assert_eq!(driver.poll_tick().await, TickOutcome::NoData);
}

#[tokio::test]
async fn test_watermark_never_moves_backwards() {
    let clock = ManualClock::new(ts(10, 0));
    let (mut driver, table, _store) = setup(&clock);

    let mut previous = None;
    for minute in 0..3 {
        clock.set(ts(10, minute));
        driver.poll_tick().await;
        let current = driver.source().watermark();
        assert!(current >= previous);
        previous = current;
    }

    let windows = table.windows();
    assert_eq!(windows.len(), 3);
    for pair in windows.windows(2) {
        assert_eq!(pair[1].lower, pair[0].upper);
    }

    // Clock stepped back: no scan, watermark held
    clock.set(ts(10, 1));
    assert_eq!(driver.poll_tick().await, TickOutcome::NoData);
    assert_eq!(driver.source().watermark(), Some(Watermark::at(ts(10, 2))));
    assert_eq!(table.windows().len(), 3);
}

#[tokio::test]
async fn test_shutdown_flushes_unsynced_rows_once() {
    let clock = ManualClock::new(ts(10, 30));
    let (mut driver, table, store) = setup(&clock);

    table.insert(ts(10, 10), 1);
    store.set_failing_writes(true);
    driver.poll_tick().await;
    store.set_failing_writes(false);

    let outcome = driver.shutdown().await;
    assert_eq!(synced_filename(&outcome), "locness_data_20260309_10.csv");
    assert_eq!(driver.state(), DriverState::Stopped);
    assert_eq!(store.objects().len(), 1);
    assert_eq!(store.creates(), 2);
}

#[tokio::test]
async fn test_shutdown_with_empty_bucket_skips_upload() {
    let clock = ManualClock::new(ts(10, 30));
    let (mut driver, _table, store) = setup(&clock);

    assert_eq!(driver.shutdown().await, TickOutcome::Empty);
    assert_eq!(store.lookups(), 0);
}

#[tokio::test]
async fn test_run_stops_on_shutdown_signal() {
    let clock = ManualClock::new(ts(10, 30));
    let (mut driver, table, store) = setup(&clock);

    table.insert(ts(10, 10), 1);
    store.set_failing_writes(true);
    driver.poll_tick().await;
    store.set_failing_writes(false);

    let outcome = driver.run(async {}).await;
    assert!(matches!(outcome, TickOutcome::Synced { rows: 1, .. }));
    assert_eq!(driver.state(), DriverState::Stopped);
    assert_eq!(store.objects().len(), 1);
}

#[tokio::test]
async fn test_pending_sync_retried_when_fetch_fails() {
    let clock = ManualClock::new(ts(10, 30));
    let (mut driver, table, store) = setup(&clock);

    table.insert(ts(10, 10), 1);
    store.set_failing_writes(true);
    assert!(matches!(driver.poll_tick().await, TickOutcome::SyncFailed { .. }));

    store.set_failing_writes(false);
    table.set_failing(true);
    clock.advance(chrono::Duration::minutes(1));
    let outcome = driver.poll_tick().await;
    assert!(matches!(outcome, TickOutcome::Synced { rows: 1, .. }));
    assert_eq!(store.objects().len(), 1);
    assert_eq!(driver.source().watermark(), Some(Watermark::at(ts(10, 30))));

    // Nothing pending, so a failed fetch is just a failed fetch
    clock.advance(chrono::Duration::minutes(1));
    assert_eq!(driver.poll_tick().await, TickOutcome::FetchFailed);
}

#[tokio::test(start_paused = true)]
async fn test_run_dispatches_poll_and_hour_flush_ticks() {
    let clock = TokioClock::starting_at(ts(10, 58) + chrono::Duration::seconds(30));
    let (mut driver, table, store) = setup(&clock);
    table.insert(ts(10, 30), 1);

    // Polls at 10:58:30, 10:59:30 and 11:00:30; hour flush at 11:00:00
    let outcome = driver
        .run(tokio::time::sleep(Duration::from_secs(150)))
        .await;

    assert_eq!(driver.state(), DriverState::Stopped);
    assert_eq!(synced_filename(&outcome), "locness_data_20260309_10.csv");

    let windows = table.windows();
    assert_eq!(windows.len(), 3);
    for pair in windows.windows(2) {
        assert_eq!(pair[1].lower, pair[0].upper);
    }
    assert_eq!(
        windows[2].upper,
        Watermark::at(ts(11, 0) + chrono::Duration::seconds(30))
    );

    // Created by the first poll; replaced once by the hour flush and once by
    // the final flush. The later polls found nothing and made no call.
    assert_eq!(store.creates(), 1);
    assert_eq!(store.replaces(), 2);
    assert_eq!(store.objects().len(), 1);
    assert_eq!(
        store.object("locness_data_20260309_10.csv").unwrap().content,
        "datetime_utc,temp\n2026-03-09T10:30:00Z,1\n"
    );
}
