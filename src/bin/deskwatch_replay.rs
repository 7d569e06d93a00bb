//! deskwatch_replay - run a detection script through the monitor pipeline
//!
//! Each script entry is one frame: `{"atMs": 1500, "detections": [...]}` or
//! `{"atMs": 1600, "fail": true}`. `atMs` is milliseconds since replay start;
//! entries without it follow the previous one after `--interval-ms`.
//! Days closed during the replay and the final day are printed as JSON.

use anyhow::{anyhow, Result};
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

use deskwatch::detect::parse_script;
use deskwatch::session::StatusEvent;
use deskwatch::{
    Clock, Frame, FrameOutcome, InMemoryProductivityStore, ManualClock, MonitorConfig,
    MonitorSession, ProductivityStore, ScriptedBackend, SessionSink, SqliteProductivityStore,
    TieBreak,
};

#[derive(Parser, Debug)]
#[command(
    name = "deskwatch_replay",
    about = "Replay a detection script and print the resulting daily records"
)]
struct Args {
    /// JSON script: an array of frames
    script: PathBuf,

    /// Replay start, epoch milliseconds (default 2024-01-01 09:00 local)
    #[arg(long)]
    start_ms: Option<i64>,

    /// Local time offset east of UTC, seconds
    #[arg(long, default_value_t = 0)]
    utc_offset: i32,

    /// Gap before frames that carry no atMs
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,

    /// Smoothing window in frames
    #[arg(long)]
    window: Option<usize>,

    /// Tie-break rule (most_recent|priority)
    #[arg(long, value_name = "RULE")]
    tie_break: Option<String>,

    /// Flag changes from a prior status as alerts
    #[arg(long)]
    alerts: bool,

    /// Print one JSON line per smoothed status change
    #[arg(short, long)]
    events: bool,

    /// Also write daily records to this SQLite DB
    #[arg(long)]
    db: Option<String>,
}

struct EventPrinter {
    enabled: bool,
}

impl SessionSink for EventPrinter {
    fn on_smoothed_status(&mut self, event: &StatusEvent<'_>) {
        if self.enabled && event.changed {
            let line = json!({
                "atMs": event.at,
                "status": event.status,
                "previous": event.previous,
                "raw": event.raw,
                "alert": event.alert,
                "persons": event.persons,
                "heads": event.heads,
            });
            println!("{}", line);
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let raw = std::fs::read_to_string(&args.script)
        .map_err(|e| anyhow!("failed to read script {}: {}", args.script.display(), e))?;
    let frames = parse_script(&raw)?;

    let mut options = MonitorConfig::default().session_options();
    if let Some(window) = args.window {
        options.window = window;
    }
    if let Some(rule) = args.tie_break.as_deref() {
        options.tie_break = TieBreak::parse(rule)
            .ok_or_else(|| anyhow!("unknown tie-break rule {:?}", rule))?;
    }
    options.alerts_enabled = args.alerts;

    let start = match args.start_ms {
        Some(ms) => ms,
        None => ManualClock::at_local_hour(9).now().millis(),
    };
    let clock = Arc::new(ManualClock::with_offset(start, args.utc_offset)?);
    let mut session = MonitorSession::new(options, clock.clone());

    let mut store: Box<dyn ProductivityStore> = match args.db.as_deref() {
        Some(path) => Box::new(SqliteProductivityStore::open(path)?),
        None => Box::new(InMemoryProductivityStore::default()),
    };

    let at_times: Vec<Option<i64>> = frames.iter().map(|f| f.at_ms).collect();
    let mut backend = ScriptedBackend::from_frames(frames);
    let mut printer = EventPrinter {
        enabled: args.events,
    };
    let mut skipped = 0u64;

    for (seq, at_ms) in at_times.into_iter().enumerate() {
        match at_ms {
            Some(offset) => clock.set(start.saturating_add(offset)),
            None if seq > 0 => clock.advance_ms(args.interval_ms),
            None => {}
        }
        while let Some(closed) = session.close_day() {
            store.save(&closed)?;
        }
        let frame = Frame::empty(seq as u64);
        if session.process_frame(&frame, &mut backend, &mut printer) == FrameOutcome::Skipped {
            skipped += 1;
        }
    }
    if skipped > 0 {
        log::warn!("{} frame(s) skipped on detector failure", skipped);
    }

    store.save(&session.export_snapshot())?;

    let mut days = Vec::new();
    for date in store.list_dates()? {
        if let Some(snapshot) = store.load(date)? {
            days.push(snapshot);
        }
    }
    let report = json!({
        "endMs": clock.now(),
        "framesSkipped": skipped,
        "insights": session.insights(),
        "days": days,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
