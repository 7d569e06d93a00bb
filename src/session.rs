//! Monitoring session context.
//!
//! A `MonitorSession` owns everything that changes frame to frame: live
//! thresholds, the smoothing window, the productivity accumulator and the
//! activity log. It is driven one frame at a time by the caller and reports
//! through a `SessionSink`; it never touches UI or storage on its own.
//!
//! Per frame: detections -> associate -> classify -> smooth -> accumulate
//! -> insights -> sink.

use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

use crate::associate::{associate, partition_detections, Association, ConfidenceThresholds};
use crate::clock::{format_duration, Clock, Timestamp};
use crate::detect::{Detection, DetectorBackend};
use crate::frame::Frame;
use crate::insights::{self, Insights};
use crate::ledger::{Distribution, HourBucket, ProductivityAccumulator, TimeLedger};
use crate::smoothing::{StatusSmoother, TieBreak, DEFAULT_WINDOW};
use crate::status::{classify, Status};
use crate::storage::ProductivityStore;

/// Activity log entries kept per session.
pub const ACTIVITY_LOG_CAPACITY: usize = 500;

/// Inter-frame gaps averaged for the frame-rate readout.
pub const FPS_WINDOW: usize = 30;

// -------------------- Activity log --------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    Starting,
    Working,
    Idle,
    Absent,
    Paused,
    Resumed,
    DayClosed,
    Info,
}

impl From<Status> for ActivityKind {
    fn from(status: Status) -> Self {
        match status {
            Status::Working => ActivityKind::Working,
            Status::Idle => ActivityKind::Idle,
            Status::Absent => ActivityKind::Absent,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub time: Timestamp,
    pub kind: ActivityKind,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub start_time: Timestamp,
    #[serde(default)]
    pub status_changes: VecDeque<ActivityEntry>,
}

impl SessionData {
    fn starting(at: Timestamp) -> Self {
        let mut data = Self {
            start_time: at,
            status_changes: VecDeque::new(),
        };
        data.log(
            at,
            ActivityKind::Starting,
            "Productivity monitoring session started",
        );
        data
    }

    fn log(&mut self, time: Timestamp, kind: ActivityKind, message: &str) {
        self.status_changes.push_back(ActivityEntry {
            time,
            kind,
            message: message.to_string(),
        });
        while self.status_changes.len() > ACTIVITY_LOG_CAPACITY {
            self.status_changes.pop_front();
        }
    }
}

// -------------------- Snapshots --------------------

/// Session totals with open spans counted up to `as_of`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    pub total_working_time: u64,
    pub total_idle_time: u64,
    pub overall_productivity: f64,
    pub session_duration: u64,
    pub current_status: Option<Status>,
}

/// Everything needed to report on or resume a day.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub date: NaiveDate,
    /// Time of the last processed frame (or session start).
    pub as_of: Timestamp,
    pub hourly_data: Vec<HourBucket>,
    pub ledger: TimeLedger,
    pub summary: LedgerSummary,
    pub session_data: SessionData,
}

// -------------------- Sink --------------------

/// Published once per processed frame after classification and smoothing.
#[derive(Debug)]
pub struct StatusEvent<'a> {
    pub at: Timestamp,
    pub raw: Status,
    pub status: Status,
    pub previous: Option<Status>,
    /// False when `status` repeats the previous frame's value.
    pub changed: bool,
    /// Set on a change from a prior status while alerts are enabled.
    pub alert: bool,
    pub associations: &'a [Association],
    pub persons: usize,
    pub heads: usize,
}

/// Published once per processed frame after accumulation.
#[derive(Debug)]
pub struct MetricsUpdate<'a> {
    pub ledger: &'a LedgerSummary,
    pub hours: &'a [HourBucket],
    pub insights: &'a Insights,
    pub distribution: Distribution,
    /// WORKING share of the smoothing window, in percent.
    pub focus_score: f64,
    pub fps: f64,
}

/// Consumer of per-frame session output (drawing, alerting, charts).
pub trait SessionSink {
    fn on_smoothed_status(&mut self, _event: &StatusEvent<'_>) {}

    fn on_metrics_updated(&mut self, _update: &MetricsUpdate<'_>) {}
}

impl SessionSink for () {}

// -------------------- Options / stats --------------------

#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub thresholds: ConfidenceThresholds,
    pub window: usize,
    pub tie_break: TieBreak,
    pub alerts_enabled: bool,
    pub auto_save: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            thresholds: ConfidenceThresholds::default(),
            window: DEFAULT_WINDOW,
            tie_break: TieBreak::default(),
            alerts_enabled: false,
            auto_save: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames_processed: u64,
    pub oracle_failures: u64,
    pub current_persons: usize,
    pub current_heads: usize,
    pub total_persons: u64,
    pub total_heads: u64,
    pub last_inference_ms: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Session is paused; the frame was not looked at.
    Paused,
    /// Detector failed; nothing changed.
    Skipped,
    Processed { status: Status, changed: bool },
}

#[derive(Clone, Debug, Default)]
struct FpsMeter {
    gaps: VecDeque<u64>,
    last: Option<Timestamp>,
}

impl FpsMeter {
    fn tick(&mut self, now: Timestamp) {
        if let Some(last) = self.last {
            self.gaps.push_back(now.saturating_since(last));
            while self.gaps.len() > FPS_WINDOW {
                self.gaps.pop_front();
            }
        }
        self.last = Some(now);
    }

    fn fps(&self) -> f64 {
        let total: u64 = self.gaps.iter().sum();
        if total == 0 {
            return 0.0;
        }
        (1000.0 * self.gaps.len() as f64 / total as f64).round()
    }

    fn reset(&mut self) {
        self.gaps.clear();
        self.last = None;
    }
}

// -------------------- Session --------------------

pub struct MonitorSession {
    clock: Arc<dyn Clock>,
    date: NaiveDate,
    thresholds: ConfidenceThresholds,
    smoother: StatusSmoother,
    accumulator: ProductivityAccumulator,
    session_data: SessionData,
    alerts_enabled: bool,
    auto_save: bool,
    paused: bool,
    stats: SessionStats,
    fps: FpsMeter,
    insights: Insights,
    last_observed: Option<Timestamp>,
}

impl MonitorSession {
    pub fn new(options: SessionOptions, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        let accumulator = ProductivityAccumulator::new(now);
        let insights = insights::generate(accumulator.hours(), 0, 0);
        log::info!(
            "monitoring session started (window={}, person>={:.2}, head>={:.2})",
            options.window,
            options.thresholds.person(),
            options.thresholds.head()
        );
        Self {
            date: clock.local_date(now),
            thresholds: options.thresholds,
            smoother: StatusSmoother::new(options.window, options.tie_break),
            accumulator,
            session_data: SessionData::starting(now),
            alerts_enabled: options.alerts_enabled,
            auto_save: options.auto_save,
            paused: false,
            stats: SessionStats::default(),
            fps: FpsMeter::default(),
            insights,
            last_observed: None,
            clock,
        }
    }

    // ---- live tunables ----

    pub fn thresholds(&self) -> &ConfidenceThresholds {
        &self.thresholds
    }

    pub fn thresholds_mut(&mut self) -> &mut ConfidenceThresholds {
        &mut self.thresholds
    }

    pub fn set_smoothing_window(&mut self, window: usize) {
        self.smoother.set_capacity(window);
    }

    pub fn smoothing_window(&self) -> usize {
        self.smoother.capacity()
    }

    pub fn set_alerts_enabled(&mut self, enabled: bool) {
        self.alerts_enabled = enabled;
    }

    pub fn set_auto_save(&mut self, enabled: bool) {
        self.auto_save = enabled;
    }

    pub fn auto_save(&self) -> bool {
        self.auto_save
    }

    // ---- pause / resume ----

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            let now = self.clock.now();
            self.session_data
                .log(now, ActivityKind::Paused, "Detection paused");
            log::info!("monitoring paused");
        }
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            let now = self.clock.now();
            self.session_data
                .log(now, ActivityKind::Resumed, "Detection resumed");
            // Gap while paused should not drag the frame rate down.
            self.fps.reset();
            log::info!("monitoring resumed");
        }
    }

    // ---- frame processing ----

    /// Run the detector on `frame` and feed the result through the pipeline.
    ///
    /// A detector error skips the frame with no state change.
    pub fn process_frame<B, S>(
        &mut self,
        frame: &Frame,
        backend: &mut B,
        sink: &mut S,
    ) -> FrameOutcome
    where
        B: DetectorBackend + ?Sized,
        S: SessionSink + ?Sized,
    {
        if self.paused {
            return FrameOutcome::Paused;
        }
        match frame.run_detector(backend) {
            Ok(result) => {
                if result.inference_ms.is_some() {
                    self.stats.last_inference_ms = result.inference_ms;
                }
                self.process_detections(&result.detections, sink)
            }
            Err(e) => {
                self.stats.oracle_failures += 1;
                log::warn!(
                    "frame {} skipped: detector '{}' failed: {}",
                    frame.sequence,
                    backend.name(),
                    e
                );
                FrameOutcome::Skipped
            }
        }
    }

    /// Feed one frame's detector output through the pipeline at `clock.now()`.
    pub fn process_detections<S>(
        &mut self,
        detections: &[Detection],
        sink: &mut S,
    ) -> FrameOutcome
    where
        S: SessionSink + ?Sized,
    {
        if self.paused {
            return FrameOutcome::Paused;
        }
        let now = self.clock.now();
        self.fps.tick(now);

        let (persons, heads) = partition_detections(detections, &self.thresholds);
        self.stats.frames_processed += 1;
        self.stats.current_persons = persons.len();
        self.stats.current_heads = heads.len();
        self.stats.total_persons += persons.len() as u64;
        self.stats.total_heads += heads.len() as u64;

        let associations = associate(&persons, &heads);
        let raw = classify(&associations);
        let status = self.smoother.push(raw);

        let previous = self.accumulator.current_status();
        let changed = previous != Some(status);
        let alert = changed && previous.is_some() && self.alerts_enabled;

        if changed {
            self.session_data
                .log(now, ActivityKind::from(status), status.message());
            match previous {
                Some(prev) => log::info!("status {} -> {}", prev, status),
                None => log::info!("status {}", status),
            }
        }
        log::debug!(
            "frame persons={} heads={} raw={} smoothed={}",
            persons.len(),
            heads.len(),
            raw,
            status
        );

        sink.on_smoothed_status(&StatusEvent {
            at: now,
            raw,
            status,
            previous,
            changed,
            alert,
            associations: &associations,
            persons: persons.len(),
            heads: heads.len(),
        });

        let hour = self.clock.local_hour(now);
        self.accumulator.observe(status, now, hour);
        self.last_observed = Some(now);

        let ledger = self.accumulator.ledger();
        self.insights = insights::generate(
            self.accumulator.hours(),
            ledger.working_at(now),
            ledger.idle_at(now),
        );
        let summary = self.summary_at(now);
        sink.on_metrics_updated(&MetricsUpdate {
            ledger: &summary,
            hours: self.accumulator.hours(),
            insights: &self.insights,
            distribution: self.accumulator.distribution(),
            focus_score: self.smoother.working_share(),
            fps: self.fps.fps(),
        });

        FrameOutcome::Processed { status, changed }
    }

    // ---- reads ----

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn current_status(&self) -> Option<Status> {
        self.accumulator.current_status()
    }

    pub fn ledger(&self) -> &TimeLedger {
        self.accumulator.ledger()
    }

    pub fn hours(&self) -> &[HourBucket] {
        self.accumulator.hours()
    }

    pub fn insights(&self) -> &Insights {
        &self.insights
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn activity_log(&self) -> &VecDeque<ActivityEntry> {
        &self.session_data.status_changes
    }

    pub fn fps(&self) -> f64 {
        self.fps.fps()
    }

    /// WORKING share of the smoothing window, in percent.
    pub fn focus_score(&self) -> f64 {
        self.smoother.working_share()
    }

    pub fn distribution(&self) -> Distribution {
        self.accumulator.distribution()
    }

    fn as_of(&self) -> Timestamp {
        self.last_observed.unwrap_or(self.session_data.start_time)
    }

    fn summary_at(&self, at: Timestamp) -> LedgerSummary {
        let ledger = self.accumulator.ledger();
        LedgerSummary {
            total_working_time: ledger.working_at(at),
            total_idle_time: ledger.idle_at(at),
            overall_productivity: ledger.overall_productivity_at(at),
            session_duration: at.saturating_since(self.session_data.start_time),
            current_status: self.accumulator.current_status(),
        }
    }

    pub fn summary(&self) -> LedgerSummary {
        self.summary_at(self.as_of())
    }

    /// Read-only export of the day so far, as of the last processed frame.
    pub fn export_snapshot(&self) -> Snapshot {
        let as_of = self.as_of();
        Snapshot {
            date: self.date,
            as_of,
            hourly_data: self.accumulator.hours().to_vec(),
            ledger: self.accumulator.ledger().clone(),
            summary: self.summary_at(as_of),
            session_data: self.session_data.clone(),
        }
    }

    // ---- persistence / lifecycle ----

    /// Resume from a stored snapshot of the same calendar day.
    ///
    /// Returns false (and changes nothing) for a snapshot of another day.
    pub fn restore(&mut self, snapshot: &Snapshot) -> bool {
        if snapshot.date != self.date {
            log::info!(
                "ignoring stored data for {} (session date {})",
                snapshot.date,
                self.date
            );
            return false;
        }
        let now = self.clock.now();
        // Count open spans up to the last processed frame; nothing after it.
        let mut ledger = snapshot.ledger.clone();
        ledger.settle(snapshot.as_of);
        self.accumulator = ProductivityAccumulator::restore(&ledger, &snapshot.hourly_data, now);
        self.session_data = snapshot.session_data.clone();
        self.smoother.clear();
        self.last_observed = None;
        let ledger = self.accumulator.ledger();
        self.insights = insights::generate(
            self.accumulator.hours(),
            ledger.total_working_time,
            ledger.total_idle_time,
        );
        log::info!(
            "restored {}: working {}, idle {}",
            self.date,
            format_duration(ledger.total_working_time),
            format_duration(ledger.total_idle_time)
        );
        true
    }

    /// Load today's record from `store`. Store errors are logged and ignored.
    pub fn restore_from(&mut self, store: &mut dyn ProductivityStore) -> bool {
        match store.load(self.date) {
            Ok(Some(snapshot)) => self.restore(&snapshot),
            Ok(None) => false,
            Err(e) => {
                log::warn!("failed to load stored productivity data: {}", e);
                false
            }
        }
    }

    /// Persist the current snapshot. Store errors are logged and ignored;
    /// in-memory state stays authoritative.
    pub fn save_to(&self, store: &mut dyn ProductivityStore) -> bool {
        match self.try_save(store) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("failed to save productivity data: {}", e);
                false
            }
        }
    }

    fn try_save(&self, store: &mut dyn ProductivityStore) -> Result<()> {
        let snapshot = self.export_snapshot();
        store.save(&snapshot)?;
        log::debug!("saved productivity data for {}", snapshot.date);
        Ok(())
    }

    /// True once the local date has moved past the session's date.
    pub fn day_changed(&self) -> bool {
        self.clock.local_date(self.clock.now()) > self.date
    }

    /// Close the session's day at the following local midnight and start
    /// tracking the next date.
    ///
    /// Time from the last frame up to midnight is credited to the held
    /// status in the closing day; the held status carries into the new day
    /// from midnight. Each closed day's working + idle therefore equals the
    /// wall time it covered. Closes at most one day per call and returns
    /// `None` while the local date has not moved on, so drivers call it in a
    /// loop before handing the next frame over.
    pub fn close_day(&mut self) -> Option<Snapshot> {
        if !self.day_changed() {
            return None;
        }
        let next = self.date.succ_opt()?;
        let boundary = self
            .clock
            .local_day_start(next)
            .max(self.as_of())
            .min(self.clock.now());
        let last_hour = self
            .clock
            .local_hour(Timestamp(boundary.millis().saturating_sub(1)));

        self.accumulator.close_period(boundary, last_hour);
        self.last_observed = Some(boundary);
        self.session_data
            .log(boundary, ActivityKind::DayClosed, "Monitoring day closed");
        let closed = self.export_snapshot();

        self.date = next;
        self.accumulator = self.accumulator.carry_over(boundary);
        self.session_data = SessionData::starting(boundary);
        self.last_observed = None;
        self.insights = insights::generate(self.accumulator.hours(), 0, 0);
        log::info!(
            "closed {} (working {}, idle {}); now tracking {}",
            closed.date,
            format_duration(closed.summary.total_working_time),
            format_duration(closed.summary.total_idle_time),
            self.date
        );
        Some(closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::detect::ScriptedBackend;
    use crate::geometry::BoundingBox;
    use crate::storage::InMemoryProductivityStore;

    fn person() -> Detection {
        Detection::person(BoundingBox::from_corners(0.0, 0.0, 10.0, 10.0), 0.9)
    }

    fn head() -> Detection {
        Detection::head(BoundingBox::from_corners(0.0, 0.0, 10.0, 3.5), 0.8)
    }

    fn session_at(hour: u8, window: usize) -> (MonitorSession, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_local_hour(hour));
        let options = SessionOptions {
            window,
            ..SessionOptions::default()
        };
        (MonitorSession::new(options, clock.clone()), clock)
    }

    #[derive(Default)]
    struct Recorder {
        statuses: Vec<(Status, bool, bool)>,
        metrics: usize,
    }

    impl SessionSink for Recorder {
        fn on_smoothed_status(&mut self, event: &StatusEvent<'_>) {
            self.statuses.push((event.status, event.changed, event.alert));
        }

        fn on_metrics_updated(&mut self, _update: &MetricsUpdate<'_>) {
            self.metrics += 1;
        }
    }

    #[test]
    fn fires_both_callbacks_once_per_frame() {
        let (mut session, clock) = session_at(9, 1);
        let mut sink = Recorder::default();
        session.process_detections(&[person(), head()], &mut sink);
        clock.advance_ms(100);
        session.process_detections(&[person(), head()], &mut sink);
        clock.advance_ms(100);
        session.process_detections(&[], &mut sink);

        assert_eq!(sink.metrics, 3);
        assert_eq!(
            sink.statuses,
            vec![
                (Status::Working, true, false),
                (Status::Working, false, false),
                (Status::Absent, true, false),
            ]
        );
    }

    #[test]
    fn alerts_only_on_change_from_prior_status() {
        let (mut session, clock) = session_at(9, 1);
        session.set_alerts_enabled(true);
        let mut sink = Recorder::default();
        session.process_detections(&[person()], &mut sink);
        clock.advance_ms(100);
        session.process_detections(&[person(), head()], &mut sink);
        assert_eq!(sink.statuses[0], (Status::Idle, true, false));
        assert_eq!(sink.statuses[1], (Status::Working, true, true));
    }

    #[test]
    fn oracle_failure_skips_without_mutation() {
        let (mut session, clock) = session_at(9, 30);
        let mut backend = ScriptedBackend::new();
        backend.push_detections(vec![person(), head()]);
        backend.push_failure();

        let frame = Frame::empty(1);
        let outcome = session.process_frame(&frame, &mut backend, &mut ());
        assert_eq!(
            outcome,
            FrameOutcome::Processed {
                status: Status::Working,
                changed: true
            }
        );
        let before = session.export_snapshot();

        clock.advance_ms(500);
        let outcome = session.process_frame(&frame, &mut backend, &mut ());
        assert_eq!(outcome, FrameOutcome::Skipped);
        assert_eq!(session.export_snapshot(), before);
        assert_eq!(session.stats().oracle_failures, 1);
        assert_eq!(session.stats().frames_processed, 1);
    }

    #[test]
    fn paused_session_ignores_frames() {
        let (mut session, clock) = session_at(9, 30);
        session.pause();
        clock.advance_ms(1_000);
        let mut backend = ScriptedBackend::new();
        let outcome = session.process_frame(&Frame::empty(1), &mut backend, &mut ());
        assert_eq!(outcome, FrameOutcome::Paused);
        assert_eq!(backend.calls(), 0);
        session.resume();
        let kinds: Vec<ActivityKind> = session.activity_log().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ActivityKind::Starting,
                ActivityKind::Paused,
                ActivityKind::Resumed
            ]
        );
    }

    #[test]
    fn export_is_stable_without_frames() {
        let (mut session, clock) = session_at(10, 30);
        session.process_detections(&[person()], &mut ());
        clock.advance_ms(60_000);
        let a = session.export_snapshot();
        clock.advance_ms(60_000);
        let b = session.export_snapshot();
        assert_eq!(a, b);
    }

    #[test]
    fn status_changes_land_in_activity_log() {
        let (mut session, clock) = session_at(9, 1);
        session.process_detections(&[person(), head()], &mut ());
        clock.advance_ms(100);
        session.process_detections(&[person(), head()], &mut ());
        clock.advance_ms(100);
        session.process_detections(&[person()], &mut ());

        let log = session.activity_log();
        assert_eq!(log.len(), 3);
        assert_eq!(log[1].kind, ActivityKind::Working);
        assert_eq!(log[1].message, "Now working");
        assert_eq!(log[2].kind, ActivityKind::Idle);
    }

    #[test]
    fn restore_round_trips_through_store() {
        let (mut session, clock) = session_at(9, 1);
        session.process_detections(&[person()], &mut ());
        clock.advance_ms(4_000);
        session.process_detections(&[person(), head()], &mut ());
        clock.advance_ms(6_000);
        session.process_detections(&[person()], &mut ());

        let mut store = InMemoryProductivityStore::default();
        assert!(session.save_to(&mut store));

        clock.advance_ms(1_000);
        let mut resumed = MonitorSession::new(SessionOptions::default(), clock.clone());
        assert!(resumed.restore_from(&mut store));
        assert_eq!(resumed.ledger().total_working_time, 6_000);
        assert_eq!(resumed.hours(), session.hours());
        assert_eq!(resumed.activity_log(), session.activity_log());
    }

    #[test]
    fn restore_rejects_other_days() {
        let (session, _) = session_at(9, 1);
        let mut snapshot = session.export_snapshot();
        snapshot.date = snapshot.date.succ_opt().unwrap();
        let (mut other, _) = session_at(9, 1);
        assert!(!other.restore(&snapshot));
    }

    #[test]
    fn close_day_settles_and_carries_status() {
        let (mut session, clock) = session_at(23, 1);
        assert!(session.close_day().is_none());
        session.process_detections(&[person(), head()], &mut ());
        clock.advance_ms(3_600_000);
        assert!(session.day_changed());

        let closed = session.close_day().unwrap();
        assert_eq!(closed.ledger.working_start_time, Some(closed.as_of));
        assert_eq!(
            closed.summary.total_working_time + closed.summary.total_idle_time,
            3_600_000
        );
        assert!(!session.day_changed());
        assert!(session.close_day().is_none());
        assert_eq!(session.ledger().total_working_time, 0);
        assert_eq!(session.date(), closed.date.succ_opt().unwrap());
        assert_eq!(session.current_status(), Some(Status::Working));
    }

    #[test]
    fn close_day_catches_up_one_day_per_call() {
        let (mut session, clock) = session_at(20, 1);
        session.process_detections(&[person()], &mut ());
        clock.advance_ms(2 * 86_400_000);

        let mut closed = Vec::new();
        while let Some(day) = session.close_day() {
            closed.push(day);
        }
        assert_eq!(closed.len(), 2);
        // The skipped day is held idle from midnight to midnight.
        assert_eq!(closed[1].summary.total_idle_time, 86_400_000);
        let bucketed: u64 = closed[1].hourly_data.iter().map(HourBucket::total_time).sum();
        assert_eq!(bucketed, 86_400_000);
        assert_eq!(session.date(), clock.local_date(clock.now()));
    }

    #[test]
    fn paused_interval_is_credited_to_held_status() {
        let (mut session, clock) = session_at(9, 1);
        let t0 = clock.now();
        session.process_detections(&[person(), head()], &mut ());

        session.pause();
        clock.advance_ms(600_000);
        assert_eq!(
            session.process_detections(&[person()], &mut ()),
            FrameOutcome::Paused
        );
        session.resume();
        clock.advance_ms(1_000);
        session.process_detections(&[person(), head()], &mut ());

        let summary = session.summary();
        assert_eq!(summary.total_working_time, 601_000);
        assert_eq!(summary.total_idle_time, 0);
        assert_eq!(
            summary.total_working_time + summary.total_idle_time,
            clock.now().saturating_since(t0)
        );
        assert_eq!(session.hours()[9].working_time, 1_000 + 601_000);
        assert_eq!(session.hours()[9].total_time(), 1_000 + 601_000);
    }

    #[test]
    fn live_tunables_are_clamped() {
        let (mut session, _) = session_at(9, 30);
        session.set_smoothing_window(0);
        assert_eq!(session.smoothing_window(), 1);
        session.thresholds_mut().set_person(3.0);
        assert_eq!(session.thresholds().person(), 1.0);
    }
}
