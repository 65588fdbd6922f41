use super::row::Row;
use super::watermark::{QueryWindow, Watermark, WatermarkTracker};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("scan of table '{table}' failed: {message}")]
    Scan { table: String, message: String },
}

/// One page of a range scan. `next` is the continuation cursor, if any.
#[derive(Debug)]
pub struct Page<C> {
    pub rows: Vec<Row>,
    pub next: Option<C>,
}

/// Page-level access to a table supporting a `(lower, upper]` range filter on
/// its timestamp field.
#[async_trait]
pub trait TablePages: Send + Sync {
    /// Opaque continuation token.
    type Cursor: Send;

    fn table_name(&self) -> &str;

    fn timestamp_field(&self) -> &str;

    async fn scan_page(
        &self,
        window: &QueryWindow,
        cursor: Option<Self::Cursor>,
    ) -> Result<Page<Self::Cursor>, SourceError>;
}

#[async_trait]
impl<T: TablePages> TablePages for Arc<T> {
    type Cursor = T::Cursor;

    fn table_name(&self) -> &str {
        (**self).table_name()
    }

    fn timestamp_field(&self) -> &str {
        (**self).timestamp_field()
    }

    async fn scan_page(
        &self,
        window: &QueryWindow,
        cursor: Option<Self::Cursor>,
    ) -> Result<Page<Self::Cursor>, SourceError> {
        (**self).scan_page(window, cursor).await
    }
}

/// Result of one fetch cycle.
#[derive(Debug)]
pub enum FetchOutcome {
    Fetched { rows: Vec<Row>, window: QueryWindow },
    /// Nothing was consumed; the watermark is the one the fetch started from.
    Failed { watermark: Watermark, error: SourceError },
}

impl FetchOutcome {
    pub fn watermark(&self) -> Watermark {
        match self {
            FetchOutcome::Fetched { window, .. } => window.upper,
            FetchOutcome::Failed { watermark, .. } => *watermark,
        }
    }

    pub fn rows(&self) -> &[Row] {
        match self {
            FetchOutcome::Fetched { rows, .. } => rows,
            FetchOutcome::Failed { .. } => &[],
        }
    }

    pub fn into_parts(self) -> (Vec<Row>, Watermark) {
        let watermark = self.watermark();
        match self {
            FetchOutcome::Fetched { rows, .. } => (rows, watermark),
            FetchOutcome::Failed { .. } => (Vec::new(), watermark),
        }
    }
}

/// Reads new rows from a table and owns the watermark between cycles.
///
/// The watermark advances to the time captured when a fetch starts, not to
/// the newest row seen. A row committed during a fetch with a timestamp at or
/// below that bound is not picked up by the next cycle.
pub struct RowSourceAdapter<T> {
    table: T,
    tracker: WatermarkTracker,
}

impl<T: TablePages> RowSourceAdapter<T> {
    pub fn new(table: T, initial_lookback: Duration) -> Self {
        Self {
            table,
            tracker: WatermarkTracker::new(initial_lookback),
        }
    }

    pub fn watermark(&self) -> Option<Watermark> {
        self.tracker.current()
    }

    pub fn table(&self) -> &T {
        &self.table
    }

    /// Fetch every row in `window`, following continuation cursors until the
    /// table reports no more pages. A failure on any page discards the pages
    /// already read.
    pub async fn fetch(&self, window: &QueryWindow) -> Result<Vec<Row>, SourceError> {
        let mut rows = Vec::new();
        let mut cursor = None;
        let mut pages = 0usize;

        loop {
            let page = self.table.scan_page(window, cursor).await?;
            pages += 1;
            rows.extend(page.rows);

            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        debug!(
            table = %self.table.table_name(),
            pages = pages,
            rows = rows.len(),
            "Scan complete"
        );

        Ok(rows)
    }

    /// Fetch rows in `(last, captured_at]`. On error no rows are returned and
    /// the watermark stays at `last`.
    pub async fn fetch_since(&self, last: Watermark, captured_at: DateTime<Utc>) -> FetchOutcome {
        let window = QueryWindow::since(last, captured_at);

        info!(
            table = %self.table.table_name(),
            lower = %window.lower,
            upper = %window.upper,
            "Searching for new rows"
        );

        if window.is_empty() {
            return FetchOutcome::Fetched {
                rows: Vec::new(),
                window,
            };
        }

        match self.fetch(&window).await {
            Ok(rows) => {
                info!(
                    table = %self.table.table_name(),
                    count = rows.len(),
                    "Retrieved new rows"
                );
                if !rows.is_empty() {
                    let field = self.table.timestamp_field();
                    let sample: Vec<String> = rows
                        .iter()
                        .take(3)
                        .map(|row| {
                            row.get(field)
                                .map(|v| v.to_string())
                                .unwrap_or_else(|| "N/A".to_string())
                        })
                        .collect();
                    info!(sample = ?sample, "Sample timestamps found");
                }
                FetchOutcome::Fetched { rows, window }
            }
            Err(e) => {
                error!(
                    table = %self.table.table_name(),
                    window = %window,
                    error = %e,
                    "Error reading rows, will retry the same window"
                );
                FetchOutcome::Failed {
                    watermark: last,
                    error: e,
                }
            }
        }
    }

    /// One fetch cycle against the tracked watermark, which is then advanced
    /// to the outcome's watermark.
    pub async fn poll(&mut self, captured_at: DateTime<Utc>) -> FetchOutcome {
        let last = self.tracker.current_or_initial(captured_at);
        let outcome = self.fetch_since(last, captured_at).await;
        self.tracker.advance(outcome.watermark());
        outcome
    }
}
