//! Desk Presence Monitor
//!
//! Turns a stream of per-frame person/head detections into a smoothed
//! presence status (WORKING, IDLE, ABSENT) and accumulates how long each
//! status lasted, overall and per local hour of day.
//!
//! # Pipeline
//!
//! ```text
//! detections -> associate -> classify -> smooth -> accumulate -> insights
//! ```
//!
//! A person whose box overlaps a detected head is WORKING (facing the desk);
//! a person without a matching head is IDLE; no person is ABSENT. Raw
//! per-frame statuses are majority-voted over a bounded window before they
//! reach the ledger, so a single missed head does not flip the status.
//!
//! # Module Structure
//!
//! - `geometry`: boxes and IoU
//! - `detect`: detector backends (the external oracle seam) and their registry
//! - `associate`: confidence prefilter and greedy person/head matching
//! - `status`, `smoothing`: per-frame classification and majority vote
//! - `ledger`, `insights`: time accounting and derived daily insights
//! - `session`: the per-session context driving the pipeline frame by frame
//! - `storage`, `config`, `clock`, `frame`: ambient plumbing

pub mod associate;
pub mod clock;
pub mod config;
pub mod detect;
pub mod frame;
pub mod geometry;
pub mod insights;
pub mod ledger;
pub mod session;
pub mod smoothing;
pub mod status;
pub mod storage;

pub use associate::{associate, partition_detections, Association, ConfidenceThresholds};
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use config::MonitorConfig;
pub use detect::{
    BackendRegistry, Detection, DetectionCapability, DetectionResult, DetectorBackend,
    ObjectClass, ScriptedBackend,
};
pub use frame::{Frame, FrameSource, SourceSettings, SyntheticSource};
pub use geometry::{iou, BoundingBox};
pub use insights::{Insights, RecommendationTier};
pub use ledger::{HourBucket, ProductivityAccumulator, TimeLedger};
pub use session::{
    FrameOutcome, MetricsUpdate, MonitorSession, SessionOptions, SessionSink, Snapshot,
    StatusEvent,
};
pub use smoothing::{StatusSmoother, TieBreak};
pub use status::{classify, Status};
pub use storage::{InMemoryProductivityStore, ProductivityStore, SqliteProductivityStore};
