//! Time sources and duration helpers.

use anyhow::{anyhow, Result};
use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Timelike,
    Utc,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Wall-clock instant in milliseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn from_millis(millis: i64) -> Self {
        Timestamp(millis)
    }

    pub fn millis(&self) -> i64 {
        self.0
    }

    /// Milliseconds from `earlier` to `self`, zero if `earlier` is later.
    pub fn saturating_since(&self, earlier: Timestamp) -> u64 {
        u64::try_from(self.0.saturating_sub(earlier.0)).unwrap_or(0)
    }

    pub fn plus_millis(&self, millis: u64) -> Timestamp {
        Timestamp(self.0.saturating_add(i64::try_from(millis).unwrap_or(i64::MAX)))
    }
}

/// Source of "now" plus the local-calendar view of any instant.
///
/// Implementations must never report a time earlier than one already
/// returned; the ledger relies on non-decreasing timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;

    /// Local hour of day, 0..=23.
    fn local_hour(&self, at: Timestamp) -> u8;

    /// Local calendar date.
    fn local_date(&self, at: Timestamp) -> NaiveDate;

    /// First instant of `date` in local time (local midnight).
    fn local_day_start(&self, date: NaiveDate) -> Timestamp;
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// System wall clock in the host's local time zone.
///
/// Backwards steps of the host clock are absorbed: `now` holds at the last
/// reported value until the wall clock catches up.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicI64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }

    fn local(at: Timestamp) -> DateTime<Local> {
        match Local.timestamp_millis_opt(at.0).single() {
            Some(dt) => dt,
            None => DateTime::<Utc>::UNIX_EPOCH.with_timezone(&Local),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let wall = Utc::now().timestamp_millis();
        let prev = self.last.fetch_max(wall, Ordering::SeqCst);
        Timestamp(prev.max(wall))
    }

    fn local_hour(&self, at: Timestamp) -> u8 {
        Self::local(at).hour() as u8
    }

    fn local_date(&self, at: Timestamp) -> NaiveDate {
        Self::local(at).date_naive()
    }

    fn local_day_start(&self, date: NaiveDate) -> Timestamp {
        let start = midnight(date);
        // A DST jump can skip local midnight; the day then starts an hour on.
        let local = Local
            .from_local_datetime(&start)
            .earliest()
            .or_else(|| {
                Local
                    .from_local_datetime(&(start + chrono::Duration::hours(1)))
                    .earliest()
            });
        match local {
            Some(dt) => Timestamp(dt.timestamp_millis()),
            None => Timestamp(start.and_utc().timestamp_millis()),
        }
    }
}

/// Manually driven clock with a fixed UTC offset.
///
/// Shared between a session and its driver (tests, replay) behind an `Arc`.
#[derive(Debug)]
pub struct ManualClock {
    now_ms: AtomicI64,
    offset: FixedOffset,
}

impl ManualClock {
    /// Clock at `start_ms`, interpreting local time as UTC.
    pub fn new(start_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(start_ms),
            offset: Utc.fix(),
        }
    }

    /// Clock at `start_ms` with local time `offset_secs` east of UTC.
    pub fn with_offset(start_ms: i64, offset_secs: i32) -> Result<Self> {
        let offset = FixedOffset::east_opt(offset_secs)
            .ok_or_else(|| anyhow!("utc offset {}s out of range", offset_secs))?;
        Ok(Self {
            now_ms: AtomicI64::new(start_ms),
            offset,
        })
    }

    /// Clock at local `hour:00` on an arbitrary fixed day (2024-01-01 UTC).
    pub fn at_local_hour(hour: u8) -> Self {
        const DAY_START_MS: i64 = 1_704_067_200_000;
        Self::new(DAY_START_MS + i64::from(hour % 24) * 3_600_000)
    }

    /// Move to `at_ms`. Earlier values are ignored.
    pub fn set(&self, at_ms: i64) {
        self.now_ms.fetch_max(at_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        let by = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.now_ms.fetch_add(by, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, by: u64) {
        self.advance(Duration::from_millis(by));
    }

    fn local(&self, at: Timestamp) -> DateTime<FixedOffset> {
        match self.offset.timestamp_millis_opt(at.0).single() {
            Some(dt) => dt,
            None => DateTime::<Utc>::UNIX_EPOCH.with_timezone(&self.offset),
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.now_ms.load(Ordering::SeqCst))
    }

    fn local_hour(&self, at: Timestamp) -> u8 {
        self.local(at).hour() as u8
    }

    fn local_date(&self, at: Timestamp) -> NaiveDate {
        self.local(at).date_naive()
    }

    fn local_day_start(&self, date: NaiveDate) -> Timestamp {
        let start = midnight(date);
        match self.offset.from_local_datetime(&start).single() {
            Some(dt) => Timestamp(dt.timestamp_millis()),
            None => Timestamp(start.and_utc().timestamp_millis()),
        }
    }
}

/// Short human duration: "1h 5m", "3m 12s", "42s".
pub fn format_duration(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Hours and minutes only, e.g. "2h 5m".
pub fn format_hours_minutes(ms: u64) -> String {
    let total_minutes = ms / 60_000;
    format!("{}h {}m", total_minutes / 60, total_minutes % 60)
}

/// 12-hour label for an hour bucket: "0 AM", "9 AM", "12 PM", "3 PM".
pub fn hour_label(hour: u8) -> String {
    match hour {
        0..=11 => format!("{} AM", hour),
        12 => "12 PM".to_string(),
        _ => format!("{} PM", hour - 12),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_never_moves_backwards() {
        let clock = ManualClock::new(10_000);
        clock.set(5_000);
        assert_eq!(clock.now(), Timestamp(10_000));
        clock.advance_ms(250);
        assert_eq!(clock.now(), Timestamp(10_250));
        clock.set(20_000);
        assert_eq!(clock.now(), Timestamp(20_000));
    }

    #[test]
    fn manual_clock_local_calendar() -> Result<()> {
        let clock = ManualClock::at_local_hour(9);
        let now = clock.now();
        assert_eq!(clock.local_hour(now), 9);
        assert_eq!(
            clock.local_date(now),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );

        // 23:30 UTC is 01:30 next day at UTC+2.
        let shifted = ManualClock::with_offset(1_704_151_800_000, 2 * 3600)?;
        let at = shifted.now();
        assert_eq!(shifted.local_hour(at), 1);
        assert_eq!(
            shifted.local_date(at),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
        assert!(ManualClock::with_offset(0, 90_000).is_err());
        Ok(())
    }

    #[test]
    fn local_day_start_follows_offset() -> Result<()> {
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let utc = ManualClock::new(0);
        assert_eq!(utc.local_day_start(day), Timestamp(1_704_153_600_000));

        // Local midnight at UTC+2 is 22:00 UTC the evening before.
        let east = ManualClock::with_offset(0, 2 * 3600)?;
        let start = east.local_day_start(day);
        assert_eq!(start, Timestamp(1_704_153_600_000 - 2 * 3_600_000));
        assert_eq!(east.local_date(start), day);
        assert_eq!(east.local_date(Timestamp(start.0 - 1)), day.pred_opt().unwrap());
        Ok(())
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
        assert!(clock.local_hour(b) < 24);
    }

    #[test]
    fn timestamp_arithmetic_saturates() {
        assert_eq!(Timestamp(5_000).saturating_since(Timestamp(2_000)), 3_000);
        assert_eq!(Timestamp(2_000).saturating_since(Timestamp(5_000)), 0);
        assert_eq!(Timestamp(1).plus_millis(999), Timestamp(1_000));
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(42_000), "42s");
        assert_eq!(format_duration(192_000), "3m 12s");
        assert_eq!(format_duration(3_900_000), "1h 5m");
        assert_eq!(format_hours_minutes(7_500_000), "2h 5m");
    }

    #[test]
    fn hour_labels() {
        assert_eq!(hour_label(0), "0 AM");
        assert_eq!(hour_label(9), "9 AM");
        assert_eq!(hour_label(12), "12 PM");
        assert_eq!(hour_label(15), "3 PM");
    }
}
