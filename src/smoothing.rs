//! Majority-vote smoothing over recent raw statuses.
//!
//! The window is counted in frames, not time. Frame rate follows inference
//! latency, so the same window covers more wall-clock time when the detector
//! is slow and less when it is fast.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::status::Status;

pub const DEFAULT_WINDOW: usize = 30;
pub const MIN_WINDOW: usize = 1;
pub const MAX_WINDOW: usize = 300;

/// How to pick between statuses that share the highest count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The tied status seen most recently in the window wins.
    #[default]
    MostRecent,
    /// Fixed priority: WORKING over IDLE over ABSENT.
    Priority,
}

impl TieBreak {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "most_recent" | "most-recent" | "recent" => Some(TieBreak::MostRecent),
            "priority" => Some(TieBreak::Priority),
            _ => None,
        }
    }
}

fn priority(status: Status) -> u8 {
    match status {
        Status::Working => 2,
        Status::Idle => 1,
        Status::Absent => 0,
    }
}

/// Bounded FIFO of raw statuses with a mode readout.
#[derive(Clone, Debug)]
pub struct StatusSmoother {
    window: VecDeque<Status>,
    capacity: usize,
    tie_break: TieBreak,
}

impl StatusSmoother {
    pub fn new(capacity: usize, tie_break: TieBreak) -> Self {
        let capacity = clamp_window(capacity);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            tie_break,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    pub fn set_tie_break(&mut self, tie_break: TieBreak) {
        self.tie_break = tie_break;
    }

    /// Resize the window, clamped to `[MIN_WINDOW, MAX_WINDOW]`.
    /// Shrinking drops the oldest entries.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = clamp_window(capacity);
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }

    /// Push a raw status and return the smoothed status of the new window.
    pub fn push(&mut self, raw: Status) -> Status {
        while self.window.len() >= self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(raw);
        // Window is non-empty here.
        self.current().unwrap_or(raw)
    }

    /// Mode of the current window, `None` before the first push.
    pub fn current(&self) -> Option<Status> {
        let mut counts = [0usize; 3];
        // Position of the latest occurrence, 1-based so 0 means "never seen".
        let mut last_seen = [0usize; 3];
        for (pos, status) in self.window.iter().enumerate() {
            let slot = slot(*status);
            counts[slot] += 1;
            last_seen[slot] = pos + 1;
        }

        Status::ALL
            .into_iter()
            .filter(|status| counts[slot(*status)] > 0)
            .max_by_key(|status| {
                let tie = match self.tie_break {
                    TieBreak::MostRecent => last_seen[slot(*status)],
                    TieBreak::Priority => priority(*status) as usize,
                };
                (counts[slot(*status)], tie)
            })
    }

    /// Share of WORKING frames in the window, in percent.
    pub fn working_share(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        let working = self
            .window
            .iter()
            .filter(|s| **s == Status::Working)
            .count();
        working as f64 / self.window.len() as f64 * 100.0
    }
}

impl Default for StatusSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, TieBreak::default())
    }
}

fn slot(status: Status) -> usize {
    match status {
        Status::Working => 0,
        Status::Idle => 1,
        Status::Absent => 2,
    }
}

fn clamp_window(capacity: usize) -> usize {
    let clamped = capacity.clamp(MIN_WINDOW, MAX_WINDOW);
    if clamped != capacity {
        log::debug!("smoothing window {} clamped to {}", capacity, clamped);
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reference mode over the last `cap` entries, recomputed from scratch.
    fn reference_mode(history: &[Status], cap: usize, tie_break: TieBreak) -> Status {
        let start = history.len().saturating_sub(cap);
        let window = &history[start..];
        let mut best: Option<(usize, usize, Status)> = None;
        for status in Status::ALL {
            let count = window.iter().filter(|s| **s == status).count();
            if count == 0 {
                continue;
            }
            let tie = match tie_break {
                TieBreak::MostRecent => window.iter().rposition(|s| *s == status).unwrap_or(0),
                TieBreak::Priority => priority(status) as usize,
            };
            if best.map_or(true, |(c, t, _)| (count, tie) > (c, t)) {
                best = Some((count, tie, status));
            }
        }
        best.map(|(_, _, s)| s).unwrap()
    }

    #[test]
    fn majority_wins() {
        let mut smoother = StatusSmoother::default();
        let mut out = Status::Absent;
        for _ in 0..20 {
            out = smoother.push(Status::Working);
        }
        for _ in 0..10 {
            out = smoother.push(Status::Idle);
        }
        assert_eq!(out, Status::Working);
        assert_eq!(smoother.len(), 30);
    }

    #[test]
    fn window_evicts_oldest() {
        let mut smoother = StatusSmoother::new(3, TieBreak::MostRecent);
        smoother.push(Status::Working);
        smoother.push(Status::Working);
        smoother.push(Status::Idle);
        assert_eq!(smoother.current(), Some(Status::Working));
        smoother.push(Status::Idle);
        assert_eq!(smoother.current(), Some(Status::Idle));
        assert_eq!(smoother.len(), 3);
    }

    #[test]
    fn most_recent_breaks_ties() {
        let mut smoother = StatusSmoother::new(4, TieBreak::MostRecent);
        smoother.push(Status::Working);
        smoother.push(Status::Idle);
        assert_eq!(smoother.current(), Some(Status::Idle));
        smoother.push(Status::Working);
        assert_eq!(smoother.current(), Some(Status::Working));
        assert_eq!(smoother.push(Status::Idle), Status::Idle);
    }

    #[test]
    fn priority_breaks_ties() {
        let mut smoother = StatusSmoother::new(4, TieBreak::Priority);
        smoother.push(Status::Absent);
        assert_eq!(smoother.push(Status::Idle), Status::Idle);
        smoother.push(Status::Working);
        assert_eq!(smoother.push(Status::Absent), Status::Absent);
        smoother.set_capacity(3);
        // Window is now IDLE, WORKING, ABSENT: three-way tie.
        assert_eq!(smoother.current(), Some(Status::Working));
    }

    #[test]
    fn matches_reference_mode_for_every_prefix() {
        // Deterministic pseudo-random sequence covering ties and long runs.
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut history = Vec::new();
        for tie_break in [TieBreak::MostRecent, TieBreak::Priority] {
            for cap in [1usize, 2, 5, 30] {
                let mut smoother = StatusSmoother::new(cap, tie_break);
                history.clear();
                for _ in 0..200 {
                    seed ^= seed << 13;
                    seed ^= seed >> 7;
                    seed ^= seed << 17;
                    let raw = Status::ALL[(seed % 3) as usize];
                    history.push(raw);
                    let smoothed = smoother.push(raw);
                    assert_eq!(smoothed, reference_mode(&history, cap, tie_break));
                }
            }
        }
    }

    #[test]
    fn capacity_is_clamped() {
        let mut smoother = StatusSmoother::new(0, TieBreak::MostRecent);
        assert_eq!(smoother.capacity(), MIN_WINDOW);
        smoother.set_capacity(10_000);
        assert_eq!(smoother.capacity(), MAX_WINDOW);
    }

    #[test]
    fn working_share_tracks_window() {
        let mut smoother = StatusSmoother::new(4, TieBreak::MostRecent);
        assert_eq!(smoother.working_share(), 0.0);
        smoother.push(Status::Working);
        smoother.push(Status::Idle);
        assert_eq!(smoother.working_share(), 50.0);
    }

    #[test]
    fn tie_break_parses() {
        assert_eq!(TieBreak::parse("priority"), Some(TieBreak::Priority));
        assert_eq!(TieBreak::parse("Most-Recent"), Some(TieBreak::MostRecent));
        assert_eq!(TieBreak::parse("random"), None);
    }
}
