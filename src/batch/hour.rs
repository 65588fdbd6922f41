use crate::config::types::LabelZone;
use chrono::{DateTime, Local, Timelike, Utc};
use std::fmt;

const LABEL_FORMAT: &str = "%Y%m%d_%H";

/// Wall-clock hour a bucket belongs to, e.g. `20260309_14`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HourLabel(String);

impl HourLabel {
    pub fn at(instant: DateTime<Utc>, zone: LabelZone) -> Self {
        let label = match zone {
            LabelZone::Local => instant.with_timezone(&Local).format(LABEL_FORMAT),
            LabelZone::Utc => instant.format(LABEL_FORMAT),
        };
        Self(label.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HourLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// First instant after `now` at minute 0 of an hour in `zone`.
pub fn next_hour_boundary(now: DateTime<Utc>, zone: LabelZone) -> DateTime<Utc> {
    let (minute, second, nanos) = match zone {
        LabelZone::Local => {
            let local = now.with_timezone(&Local);
            (local.minute(), local.second(), local.nanosecond())
        }
        LabelZone::Utc => (now.minute(), now.second(), now.nanosecond()),
    };

    let into_hour = chrono::Duration::seconds(i64::from(minute * 60 + second))
        + chrono::Duration::nanoseconds(i64::from(nanos.min(999_999_999)));

    now - into_hour + chrono::Duration::hours(1)
}

/// Next hour boundary to flush at. A timer that wakes just before the wall
/// clock reaches `last_flushed` would otherwise get the same boundary again.
pub fn next_flush_boundary(
    now: DateTime<Utc>,
    zone: LabelZone,
    last_flushed: Option<DateTime<Utc>>,
) -> DateTime<Utc> {
    let boundary = next_hour_boundary(now, zone);
    match last_flushed {
        Some(flushed) if boundary <= flushed => next_hour_boundary(flushed, zone),
        _ => boundary,
    }
}
