//! In-memory table and store shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use hourly_export::scheduler::Clock;
use hourly_export::source::{Page, QueryWindow, Row, SourceError, TablePages, Watermark, WATERMARK_FORMAT};
use hourly_export::sync::{ArtifactStore, RemoteId, StoreError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

pub const TIMESTAMP_FIELD: &str = "datetime_utc";

pub fn ts(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 9, h, m, 0).unwrap()
}

/// A reading stamped at `at` with a single integer value.
pub fn reading(at: DateTime<Utc>, value: i64) -> Row {
    Row::new()
        .with(TIMESTAMP_FIELD, at.format(WATERMARK_FORMAT).to_string())
        .with("temp", value)
}

/// Wall clock that moves with tokio's clock, so paused-time tests see both
/// timers and timestamps advance together.
#[derive(Debug, Clone)]
pub struct TokioClock {
    wall_start: DateTime<Utc>,
    started: tokio::time::Instant,
}

impl TokioClock {
    pub fn starting_at(wall_start: DateTime<Utc>) -> Self {
        Self {
            wall_start,
            started: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        self.wall_start + chrono::Duration::from_std(self.started.elapsed()).unwrap()
    }
}

/// Table that answers range scans from a row list in one page.
#[derive(Default)]
pub struct MemoryTable {
    rows: Mutex<Vec<(DateTime<Utc>, Row)>>,
    windows: Mutex<Vec<QueryWindow>>,
    failing: AtomicBool,
}

impl MemoryTable {
    pub fn insert(&self, at: DateTime<Utc>, value: i64) {
        self.rows.lock().unwrap().push((at, reading(at, value)));
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn windows(&self) -> Vec<QueryWindow> {
        self.windows.lock().unwrap().clone()
    }
}

#[async_trait]
impl TablePages for MemoryTable {
    type Cursor = ();

    fn table_name(&self) -> &str {
        "readings"
    }

    fn timestamp_field(&self) -> &str {
        TIMESTAMP_FIELD
    }

    async fn scan_page(
        &self,
        window: &QueryWindow,
        _cursor: Option<()>,
    ) -> Result<Page<()>, SourceError> {
        self.windows.lock().unwrap().push(*window);
        if self.failing.load(Ordering::SeqCst) {
            return Err(SourceError::Scan {
                table: "readings".to_string(),
                message: "ProvisionedThroughputExceededException".to_string(),
            });
        }

        let rows = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|(at, _)| {
                let mark = Watermark::at(*at);
                mark > window.lower && mark <= window.upper
            })
            .map(|(_, row)| row.clone())
            .collect();

        Ok(Page { rows, next: None })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub id: RemoteId,
    pub name: String,
    pub content: String,
}

/// Store keeping objects in a list. Writes can be made to fail.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<Vec<StoredObject>>,
    lookups: AtomicUsize,
    creates: AtomicUsize,
    replaces: AtomicUsize,
    failing_writes: AtomicBool,
}

impl MemoryStore {
    pub fn objects(&self) -> Vec<StoredObject> {
        self.objects.lock().unwrap().clone()
    }

    pub fn object(&self, name: &str) -> Option<StoredObject> {
        self.objects().into_iter().find(|o| o.name == name)
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn replaces(&self) -> usize {
        self.replaces.load(Ordering::SeqCst)
    }

    pub fn set_failing_writes(&self, failing: bool) {
        self.failing_writes.store(failing, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Status {
                status: 503,
                message: "backendError".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<RemoteId>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.object(name).map(|o| o.id))
    }

    async fn create(&self, name: &str, content: &str) -> Result<RemoteId, StoreError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;
        let mut objects = self.objects.lock().unwrap();
        let id = format!("file-{}", objects.len() + 1);
        objects.push(StoredObject {
            id: id.clone(),
            name: name.to_string(),
            content: content.to_string(),
        });
        Ok(id)
    }

    async fn replace(&self, id: &str, content: &str) -> Result<(), StoreError> {
        self.replaces.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;
        let mut objects = self.objects.lock().unwrap();
        match objects.iter_mut().find(|o| o.id == id) {
            Some(object) => {
                object.content = content.to_string();
                Ok(())
            }
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }
}
