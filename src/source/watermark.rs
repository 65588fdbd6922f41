use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Timestamp format shared by the watermark and the table's timestamp field.
/// Zero padded and UTC, so string order equals chronological order.
pub const WATERMARK_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Highest timestamp already consumed from the table, at second precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Watermark(DateTime<Utc>);

impl Watermark {
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self(instant.trunc_subsecs(0))
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(WATERMARK_FORMAT))
    }
}

impl FromStr for Watermark {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let naive = NaiveDateTime::parse_from_str(s, WATERMARK_FORMAT)?;
        Ok(Self(naive.and_utc()))
    }
}

/// Range `(lower, upper]` a single fetch covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    pub lower: Watermark,
    pub upper: Watermark,
}

impl QueryWindow {
    /// Window from `last` up to the captured fetch time. If the clock went
    /// backwards the window collapses to `(last, last]`.
    pub fn since(last: Watermark, captured_at: DateTime<Utc>) -> Self {
        let upper = Watermark::at(captured_at).max(last);
        Self { lower: last, upper }
    }

    pub fn is_empty(&self) -> bool {
        self.lower >= self.upper
    }
}

impl fmt::Display for QueryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}]", self.lower, self.upper)
    }
}

/// Tracks the watermark across fetch cycles. Only ever moves forward.
#[derive(Debug, Clone)]
pub struct WatermarkTracker {
    current: Option<Watermark>,
    lookback: chrono::Duration,
}

impl WatermarkTracker {
    pub fn new(lookback: Duration) -> Self {
        Self {
            current: None,
            lookback: chrono::Duration::from_std(lookback)
                .unwrap_or_else(|_| chrono::Duration::hours(1)),
        }
    }

    pub fn current(&self) -> Option<Watermark> {
        self.current
    }

    /// The stored watermark, or `now - lookback` before the first fetch.
    pub fn current_or_initial(&self, now: DateTime<Utc>) -> Watermark {
        self.current
            .unwrap_or_else(|| Watermark::at(now - self.lookback))
    }

    /// Returns false (and keeps the old value) if `to` would move backwards.
    pub fn advance(&mut self, to: Watermark) -> bool {
        match self.current {
            Some(current) if to < current => false,
            _ => {
                self.current = Some(to);
                true
            }
        }
    }
}
