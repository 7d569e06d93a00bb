//! deskwatchd - desk presence monitor daemon
//!
//! This daemon:
//! 1. Loads configuration and today's stored record
//! 2. Pulls frames from the frame source at the configured rate
//! 3. Runs the detector and feeds the session pipeline
//! 4. Saves the day periodically and on shutdown
//! 5. Closes the day when the local date changes

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use deskwatch::clock::format_duration;
use deskwatch::detect::REQUIRED_CAPABILITIES;
use deskwatch::session::{MetricsUpdate, StatusEvent};
use deskwatch::{
    BackendRegistry, FrameSource, MonitorConfig, MonitorSession, ProductivityStore,
    ScriptedBackend, SessionSink, SqliteProductivityStore, SyntheticSource, SystemClock,
};

#[derive(Parser, Debug)]
#[command(name = "deskwatchd", about = "Desk presence monitor daemon")]
struct Args {
    /// Detection script replayed (cyclically) by the scripted backend
    #[arg(long, env = "DESKWATCH_SCRIPT", value_name = "PATH")]
    script: Option<PathBuf>,

    /// Seconds between health log lines
    #[arg(long, default_value_t = 60)]
    health_every: u64,
}

/// Logs status changes and alerts; keeps the latest metrics for health lines.
#[derive(Default)]
struct LogSink {
    focus_score: f64,
    fps: f64,
    productivity: f64,
}

impl SessionSink for LogSink {
    fn on_smoothed_status(&mut self, event: &StatusEvent<'_>) {
        if event.alert {
            if let Some(previous) = event.previous {
                log::warn!("alert: status changed {} -> {}", previous, event.status);
            }
        }
    }

    fn on_metrics_updated(&mut self, update: &MetricsUpdate<'_>) {
        self.focus_score = update.focus_score;
        self.fps = update.fps;
        self.productivity = update.ledger.overall_productivity;
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = MonitorConfig::load()?;

    let mut store = SqliteProductivityStore::open(&cfg.db_path)?;
    let clock = Arc::new(SystemClock::new());
    let mut session = MonitorSession::new(cfg.session_options(), clock);
    if session.restore_from(&mut store) {
        log::info!("resuming today's record from {}", cfg.db_path);
    }

    let mut registry = build_registry(&cfg, args.script.as_ref())?;
    registry.warm_up_all()?;
    let backend = registry.backend_for_capabilities(REQUIRED_CAPABILITIES)?;
    log::info!("detector backend: {}", backend.name());

    let mut source = SyntheticSource::new(cfg.source.clone())?;
    let frame_interval = Duration::from_millis(1000 / u64::from(cfg.source.target_fps));

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .expect("error setting Ctrl-C handler");

    let mut sink = LogSink::default();
    let mut last_save = Instant::now();
    let mut last_health_log = Instant::now();

    log::info!("deskwatchd running. writing to {}", cfg.db_path);
    log::info!(
        "smoothing window={} frames, save every {}s (auto_save={})",
        session.smoothing_window(),
        cfg.save_interval.as_secs(),
        session.auto_save()
    );

    loop {
        if rx.try_recv().is_ok() {
            log::info!("shutdown signal received");
            break;
        }
        let started = Instant::now();

        let frame = source.next_frame()?;

        // Close finished days before the frame is credited to any hour.
        while let Some(closed) = session.close_day() {
            if let Err(e) = store.save(&closed) {
                log::warn!("failed to save closed day {}: {}", closed.date, e);
            }
        }
        session.process_frame(&frame, &mut **backend, &mut sink);

        if session.auto_save() && last_save.elapsed() >= cfg.save_interval {
            session.save_to(&mut store);
            last_save = Instant::now();
        }

        if last_health_log.elapsed() >= Duration::from_secs(args.health_every) {
            let summary = session.summary();
            let stats = session.stats();
            log::info!(
                "source healthy={} frames={} fps={:.0} status={} working={} idle={} productivity={:.1}% focus={:.0}% oracle_failures={}",
                source.is_healthy(),
                source.frames_captured(),
                sink.fps,
                summary
                    .current_status
                    .map_or("-".to_string(), |s| s.to_string()),
                format_duration(summary.total_working_time),
                format_duration(summary.total_idle_time),
                sink.productivity,
                sink.focus_score,
                stats.oracle_failures
            );
            last_health_log = Instant::now();
        }

        if let Some(rest) = frame_interval.checked_sub(started.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    if session.save_to(&mut store) {
        log::info!("final save written for {}", session.date());
    }
    Ok(())
}

fn build_registry(cfg: &MonitorConfig, script: Option<&PathBuf>) -> Result<BackendRegistry> {
    let mut registry = BackendRegistry::new();
    match cfg.detector.backend.as_str() {
        "scripted" => {
            let backend = match script {
                Some(path) => ScriptedBackend::from_json_file(path)?.cycling(true),
                None => {
                    log::warn!("scripted backend without a script: every frame reads ABSENT");
                    ScriptedBackend::new()
                }
            };
            registry.register(backend);
        }
        "tract" => register_tract(&mut registry, cfg)?,
        other => return Err(anyhow!("unknown detector backend {:?}", other)),
    }
    Ok(registry)
}

#[cfg(feature = "backend-tract")]
fn register_tract(registry: &mut BackendRegistry, cfg: &MonitorConfig) -> Result<()> {
    let model_path = cfg
        .detector
        .model_path
        .as_ref()
        .ok_or_else(|| anyhow!("tract backend requires detector.model_path"))?;
    let backend = deskwatch::detect::TractBackend::new(
        model_path,
        cfg.detector.input_width,
        cfg.detector.input_height,
    )?
    .with_threshold(cfg.thresholds.detector());
    registry.register(backend);
    Ok(())
}

#[cfg(not(feature = "backend-tract"))]
fn register_tract(_registry: &mut BackendRegistry, _cfg: &MonitorConfig) -> Result<()> {
    Err(anyhow!(
        "tract backend requested but deskwatchd was built without the backend-tract feature"
    ))
}
