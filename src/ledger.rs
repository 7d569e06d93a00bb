//! Productivity time accounting.
//!
//! The accumulator turns the stream of smoothed statuses into two views of
//! the same wall-clock time:
//!
//! - `TimeLedger`: working vs idle totals for the session. ABSENT folds into
//!   idle here, so at every instant exactly one of the two spans is open and
//!   `working + idle` grows by exactly the elapsed wall-clock time.
//! - `HourBucket`s: per local hour, working / idle / absent kept apart.
//!
//! Timestamps must be non-decreasing. A timestamp earlier than the previous
//! one contributes zero elapsed time.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::clock::Timestamp;
use crate::status::Status;

pub const HOURS_PER_DAY: usize = 24;

/// Samples kept per hour bucket.
pub const SAMPLE_CAPACITY: usize = 100;

/// Elapsed time credited to the very first observation, which has no
/// predecessor to measure from.
pub const FIRST_OBSERVATION_MS: u64 = 1000;

/// Session-level working/idle ledger. Durations in milliseconds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeLedger {
    pub total_working_time: u64,
    pub total_idle_time: u64,
    pub working_start_time: Option<Timestamp>,
    pub idle_start_time: Option<Timestamp>,
    pub last_transition_time: Option<Timestamp>,
}

impl TimeLedger {
    /// Fresh ledger with the idle span open at `at`.
    pub fn starting_idle(at: Timestamp) -> Self {
        Self {
            idle_start_time: Some(at),
            ..Self::default()
        }
    }

    fn close_working(&mut self, now: Timestamp) {
        if let Some(start) = self.working_start_time.take() {
            self.total_working_time += now.saturating_since(start);
        }
    }

    fn close_idle(&mut self, now: Timestamp) {
        if let Some(start) = self.idle_start_time.take() {
            self.total_idle_time += now.saturating_since(start);
        }
    }

    fn enter(&mut self, status: Status, now: Timestamp) {
        match status {
            Status::Working => {
                self.close_idle(now);
                self.working_start_time.get_or_insert(now);
            }
            Status::Idle => {
                self.close_working(now);
                self.idle_start_time.get_or_insert(now);
            }
            Status::Absent => {
                self.close_working(now);
                self.close_idle(now);
                self.idle_start_time = Some(now);
            }
        }
    }

    /// Working total including the open span up to `now`.
    pub fn working_at(&self, now: Timestamp) -> u64 {
        self.total_working_time
            + self
                .working_start_time
                .map_or(0, |start| now.saturating_since(start))
    }

    /// Idle total including the open span up to `now`.
    pub fn idle_at(&self, now: Timestamp) -> u64 {
        self.total_idle_time
            + self
                .idle_start_time
                .map_or(0, |start| now.saturating_since(start))
    }

    /// Fold open spans into the totals and reopen them at `now`.
    pub fn settle(&mut self, now: Timestamp) {
        if self.working_start_time.is_some() {
            self.close_working(now);
            self.working_start_time = Some(now);
        }
        if self.idle_start_time.is_some() {
            self.close_idle(now);
            self.idle_start_time = Some(now);
        }
    }

    /// working / (working + idle) in percent at `now`. ABSENT is not part of
    /// the ratio beyond what the ledger folds into idle.
    pub fn overall_productivity_at(&self, now: Timestamp) -> f64 {
        percentage(self.working_at(now), self.working_at(now) + self.idle_at(now))
    }
}

/// One per-frame entry in an hour's sample log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub timestamp: Timestamp,
    pub status: Status,
    pub duration: u64,
}

/// Coarse productivity band of an hour, as shown on the hourly grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductivityLevel {
    Productive,
    Moderate,
    Idle,
}

/// Time observed during one local hour of the day.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourBucket {
    pub hour: u8,
    pub working_time: u64,
    pub idle_time: u64,
    pub absent_time: u64,
    /// Smoothed status changes while this hour was current.
    #[serde(default)]
    pub status_changes: u32,
    pub productivity_score: f64,
    #[serde(default)]
    pub sample_log: VecDeque<Sample>,
}

impl HourBucket {
    pub fn new(hour: u8) -> Self {
        Self {
            hour,
            working_time: 0,
            idle_time: 0,
            absent_time: 0,
            status_changes: 0,
            productivity_score: 0.0,
            sample_log: VecDeque::new(),
        }
    }

    /// Credit `duration` ms of `status` to this hour.
    pub fn record(&mut self, status: Status, duration: u64, at: Timestamp) {
        match status {
            Status::Working => self.working_time += duration,
            Status::Idle => self.idle_time += duration,
            Status::Absent => self.absent_time += duration,
        }
        self.recompute_score();

        self.sample_log.push_back(Sample {
            timestamp: at,
            status,
            duration,
        });
        while self.sample_log.len() > SAMPLE_CAPACITY {
            self.sample_log.pop_front();
        }
    }

    pub fn total_time(&self) -> u64 {
        self.working_time + self.idle_time + self.absent_time
    }

    fn recompute_score(&mut self) {
        self.productivity_score = percentage(self.working_time, self.total_time());
    }

    pub fn level(&self) -> ProductivityLevel {
        if self.productivity_score >= 70.0 {
            ProductivityLevel::Productive
        } else if self.productivity_score >= 30.0 {
            ProductivityLevel::Moderate
        } else {
            ProductivityLevel::Idle
        }
    }
}

/// Share of observed time per status across all hours, in percent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Distribution {
    pub working: f64,
    pub idle: f64,
    pub absent: f64,
}

/// What one observation did to the accumulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Observation {
    pub previous: Option<Status>,
    pub changed: bool,
    /// Time credited to the hour bucket for this observation.
    pub elapsed: u64,
    pub hour: u8,
}

/// Stateful owner of the ledger and the 24 hour buckets.
#[derive(Clone, Debug)]
pub struct ProductivityAccumulator {
    ledger: TimeLedger,
    hours: Vec<HourBucket>,
    last_status: Option<Status>,
}

impl ProductivityAccumulator {
    /// Accumulator for a session starting at `start`, idle until told otherwise.
    pub fn new(start: Timestamp) -> Self {
        Self {
            ledger: TimeLedger::starting_idle(start),
            hours: empty_hours(),
            last_status: None,
        }
    }

    /// Resume from persisted totals and buckets.
    ///
    /// Open spans from the stored ledger are discarded: time between the save
    /// and `now` was not observed. The ledger reopens idle at `now`.
    pub fn restore(ledger: &TimeLedger, hours: &[HourBucket], now: Timestamp) -> Self {
        let mut restored = empty_hours();
        for bucket in hours {
            if let Some(slot) = restored.get_mut(bucket.hour as usize) {
                *slot = bucket.clone();
                slot.recompute_score();
                while slot.sample_log.len() > SAMPLE_CAPACITY {
                    slot.sample_log.pop_front();
                }
            }
        }
        Self {
            ledger: TimeLedger {
                total_working_time: ledger.total_working_time,
                total_idle_time: ledger.total_idle_time,
                ..TimeLedger::starting_idle(now)
            },
            hours: restored,
            last_status: None,
        }
    }

    /// Apply one smoothed status at `now`, crediting the elapsed time to `hour`.
    pub fn observe(&mut self, status: Status, now: Timestamp, hour: u8) -> Observation {
        let previous = self.last_status;
        let changed = previous != Some(status);
        let hour = hour % HOURS_PER_DAY as u8;

        if changed {
            self.ledger.enter(status, now);
            if previous.is_some() {
                self.hours[hour as usize].status_changes += 1;
            }
            self.last_status = Some(status);
        }

        let elapsed = self
            .ledger
            .last_transition_time
            .map_or(FIRST_OBSERVATION_MS, |last| now.saturating_since(last));
        self.hours[hour as usize].record(status, elapsed, now);
        self.ledger.last_transition_time = Some(now);

        Observation {
            previous,
            changed,
            elapsed,
            hour,
        }
    }

    /// Fold open ledger spans into the totals at `now`.
    pub fn settle(&mut self, now: Timestamp) {
        self.ledger.settle(now);
    }

    /// End the accounting period at `boundary`.
    ///
    /// Time since the last observation is credited to the held status in
    /// `hour`, and open spans are settled at `boundary`.
    pub fn close_period(&mut self, boundary: Timestamp, hour: u8) {
        if let (Some(status), Some(last)) = (self.last_status, self.ledger.last_transition_time) {
            let pending = boundary.saturating_since(last);
            if pending > 0 {
                self.hours[(hour as usize) % HOURS_PER_DAY].record(status, pending, boundary);
                self.ledger.last_transition_time = Some(boundary);
            }
        }
        self.ledger.settle(boundary);
    }

    /// Fresh period starting at `boundary` that keeps holding the current
    /// status, so the next observation is measured from `boundary`.
    pub fn carry_over(&self, boundary: Timestamp) -> Self {
        let Some(status) = self.last_status else {
            return Self::new(boundary);
        };
        let mut ledger = TimeLedger::default();
        ledger.enter(status, boundary);
        ledger.last_transition_time = Some(boundary);
        Self {
            ledger,
            hours: empty_hours(),
            last_status: Some(status),
        }
    }

    pub fn ledger(&self) -> &TimeLedger {
        &self.ledger
    }

    pub fn hours(&self) -> &[HourBucket] {
        &self.hours
    }

    pub fn hour(&self, hour: u8) -> Option<&HourBucket> {
        self.hours.get(hour as usize)
    }

    pub fn current_status(&self) -> Option<Status> {
        self.last_status
    }

    pub fn distribution(&self) -> Distribution {
        let (working, idle, absent) = self.hours.iter().fold((0u64, 0u64, 0u64), |acc, h| {
            (acc.0 + h.working_time, acc.1 + h.idle_time, acc.2 + h.absent_time)
        });
        let total = working + idle + absent;
        Distribution {
            working: percentage(working, total),
            idle: percentage(idle, total),
            absent: percentage(absent, total),
        }
    }
}

fn empty_hours() -> Vec<HourBucket> {
    (0..HOURS_PER_DAY as u8).map(HourBucket::new).collect()
}

pub(crate) fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
