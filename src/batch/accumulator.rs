use super::hour::HourLabel;
use super::render::render_csv;
use crate::config::types::LabelZone;
use crate::source::row::Row;
use chrono::{DateTime, Utc};
use tracing::info;

/// Rows collected during one wall-clock hour.
#[derive(Debug)]
struct HourBucket {
    label: HourLabel,
    rows: Vec<Row>,
}

/// What `add_rows` did with the current bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddResult {
    /// Input was empty; nothing changed.
    Ignored,
    Appended { total: usize },
    /// A new hour started. `dropped` is the previous bucket's label, if any.
    RolledOver {
        dropped: Option<HourLabel>,
        total: usize,
    },
}

/// Accumulates rows for the current hour and renders them on demand.
///
/// When the hour changes the previous bucket is dropped from memory; its last
/// synced file stays wherever it was uploaded.
#[derive(Debug)]
pub struct HourlyAccumulator {
    name_prefix: String,
    zone: LabelZone,
    bucket: Option<HourBucket>,
}

impl HourlyAccumulator {
    pub fn new(name_prefix: impl Into<String>, zone: LabelZone) -> Self {
        Self {
            name_prefix: name_prefix.into(),
            zone,
            bucket: None,
        }
    }

    pub fn add_rows(&mut self, rows: Vec<Row>, now: DateTime<Utc>) -> AddResult {
        if rows.is_empty() {
            return AddResult::Ignored;
        }

        let label = HourLabel::at(now, self.zone);
        let incoming = rows.len();
        let mut rolled_over = None;

        let mut bucket = match self.bucket.take() {
            Some(bucket) if bucket.label == label => bucket,
            previous => {
                let dropped = previous.map(|b| b.label);
                info!(
                    hour = %label,
                    previous = ?dropped.as_ref().map(HourLabel::as_str),
                    "Starting new hourly bucket"
                );
                rolled_over = Some(dropped);
                HourBucket {
                    label,
                    rows: Vec::new(),
                }
            }
        };

        bucket.rows.extend(rows);
        let total = bucket.rows.len();

        info!(
            added = incoming,
            total = total,
            hour = %bucket.label,
            "Added rows to current hour"
        );

        self.bucket = Some(bucket);

        match rolled_over {
            Some(dropped) => AddResult::RolledOver { dropped, total },
            None => AddResult::Appended { total },
        }
    }

    /// CSV snapshot of the current bucket, or `None` when it holds no rows.
    /// Does not modify the bucket.
    pub fn render_current(&self) -> Option<String> {
        let bucket = self.bucket.as_ref().filter(|b| !b.rows.is_empty())?;
        let csv = render_csv(&bucket.rows);
        info!(
            rows = bucket.rows.len(),
            hour = %bucket.label,
            "Generated CSV"
        );
        Some(csv)
    }

    /// `{prefix}_{label}.csv` for the current bucket, or for the hour of `now`
    /// if no bucket exists yet.
    pub fn current_filename(&self, now: DateTime<Utc>) -> String {
        let label = match &self.bucket {
            Some(bucket) => bucket.label.clone(),
            None => HourLabel::at(now, self.zone),
        };
        format!("{}_{}.csv", self.name_prefix, label)
    }

    pub fn zone(&self) -> LabelZone {
        self.zone
    }

    pub fn hour_label(&self) -> Option<&HourLabel> {
        self.bucket.as_ref().map(|b| &b.label)
    }

    pub fn row_count(&self) -> usize {
        self.bucket.as_ref().map_or(0, |b| b.rows.len())
    }
}
