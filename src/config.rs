use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::associate::{
    ConfidenceThresholds, DEFAULT_DETECTOR_CONFIDENCE, DEFAULT_HEAD_CONFIDENCE,
    DEFAULT_PERSON_CONFIDENCE,
};
use crate::frame::SourceSettings;
use crate::session::SessionOptions;
use crate::smoothing::{TieBreak, DEFAULT_WINDOW, MAX_WINDOW, MIN_WINDOW};

const DEFAULT_DB_PATH: &str = "deskwatch.db";
const DEFAULT_BACKEND: &str = "scripted";
const DEFAULT_MODEL_INPUT: u32 = 640;
const DEFAULT_SAVE_INTERVAL_SECS: u64 = 30;
const DEFAULT_SOURCE_FPS: u32 = 10;
const DEFAULT_SOURCE_WIDTH: u32 = 640;
const DEFAULT_SOURCE_HEIGHT: u32 = 480;

#[derive(Debug, Deserialize, Default)]
struct MonitorConfigFile {
    db_path: Option<String>,
    detector: Option<DetectorConfigFile>,
    thresholds: Option<ThresholdsConfigFile>,
    smoothing: Option<SmoothingConfigFile>,
    persistence: Option<PersistenceConfigFile>,
    alerts: Option<AlertsConfigFile>,
    source: Option<SourceConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    input_width: Option<u32>,
    input_height: Option<u32>,
    confidence: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct ThresholdsConfigFile {
    person: Option<f32>,
    head: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct SmoothingConfigFile {
    window: Option<usize>,
    tie_break: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct PersistenceConfigFile {
    save_interval_secs: Option<u64>,
    auto_save: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct AlertsConfigFile {
    enabled: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub db_path: String,
    pub detector: DetectorSettings,
    pub thresholds: ConfidenceThresholds,
    pub smoothing_window: usize,
    pub tie_break: TieBreak,
    pub save_interval: Duration,
    pub auto_save: bool,
    pub alerts_enabled: bool,
    pub source: SourceSettings,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: String,
    pub model_path: Option<PathBuf>,
    pub input_width: u32,
    pub input_height: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            detector: DetectorSettings {
                backend: DEFAULT_BACKEND.to_string(),
                model_path: None,
                input_width: DEFAULT_MODEL_INPUT,
                input_height: DEFAULT_MODEL_INPUT,
            },
            thresholds: ConfidenceThresholds::default(),
            smoothing_window: DEFAULT_WINDOW,
            tie_break: TieBreak::default(),
            save_interval: Duration::from_secs(DEFAULT_SAVE_INTERVAL_SECS),
            auto_save: true,
            alerts_enabled: false,
            source: SourceSettings {
                target_fps: DEFAULT_SOURCE_FPS,
                width: DEFAULT_SOURCE_WIDTH,
                height: DEFAULT_SOURCE_HEIGHT,
            },
        }
    }
}

impl MonitorConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("DESKWATCH_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: MonitorConfigFile) -> Result<Self> {
        let db_path = file.db_path.unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let detector_file = file.detector.unwrap_or_default();
        let detector = DetectorSettings {
            backend: detector_file
                .backend
                .unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
            model_path: detector_file.model_path,
            input_width: detector_file.input_width.unwrap_or(DEFAULT_MODEL_INPUT),
            input_height: detector_file.input_height.unwrap_or(DEFAULT_MODEL_INPUT),
        };
        let thresholds = ConfidenceThresholds::new(
            detector_file
                .confidence
                .unwrap_or(DEFAULT_DETECTOR_CONFIDENCE),
            file.thresholds
                .as_ref()
                .and_then(|t| t.person)
                .unwrap_or(DEFAULT_PERSON_CONFIDENCE),
            file.thresholds
                .as_ref()
                .and_then(|t| t.head)
                .unwrap_or(DEFAULT_HEAD_CONFIDENCE),
        );
        let smoothing_window = file
            .smoothing
            .as_ref()
            .and_then(|s| s.window)
            .unwrap_or(DEFAULT_WINDOW);
        let tie_break = match file.smoothing.and_then(|s| s.tie_break) {
            Some(value) => parse_tie_break(&value)?,
            None => TieBreak::default(),
        };
        let save_interval = Duration::from_secs(
            file.persistence
                .as_ref()
                .and_then(|p| p.save_interval_secs)
                .unwrap_or(DEFAULT_SAVE_INTERVAL_SECS),
        );
        let auto_save = file
            .persistence
            .and_then(|p| p.auto_save)
            .unwrap_or(true);
        let alerts_enabled = file.alerts.and_then(|a| a.enabled).unwrap_or(false);
        let source = SourceSettings {
            target_fps: file
                .source
                .as_ref()
                .and_then(|s| s.target_fps)
                .unwrap_or(DEFAULT_SOURCE_FPS),
            width: file
                .source
                .as_ref()
                .and_then(|s| s.width)
                .unwrap_or(DEFAULT_SOURCE_WIDTH),
            height: file
                .source
                .as_ref()
                .and_then(|s| s.height)
                .unwrap_or(DEFAULT_SOURCE_HEIGHT),
        };
        Ok(Self {
            db_path,
            detector,
            thresholds,
            smoothing_window,
            tie_break,
            save_interval,
            auto_save,
            alerts_enabled,
            source,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(path) = env_nonempty("DESKWATCH_DB_PATH") {
            self.db_path = path;
        }
        if let Some(backend) = env_nonempty("DESKWATCH_BACKEND") {
            self.detector.backend = backend;
        }
        if let Some(path) = env_nonempty("DESKWATCH_MODEL_PATH") {
            self.detector.model_path = Some(PathBuf::from(path));
        }
        if let Some(value) = env_nonempty("DESKWATCH_PERSON_CONFIDENCE") {
            let person: f32 = value.parse().map_err(|_| {
                anyhow!("DESKWATCH_PERSON_CONFIDENCE must be a number between 0 and 1")
            })?;
            self.thresholds.set_person(person);
        }
        if let Some(value) = env_nonempty("DESKWATCH_HEAD_CONFIDENCE") {
            let head: f32 = value.parse().map_err(|_| {
                anyhow!("DESKWATCH_HEAD_CONFIDENCE must be a number between 0 and 1")
            })?;
            self.thresholds.set_head(head);
        }
        if let Some(value) = env_nonempty("DESKWATCH_SMOOTHING_WINDOW") {
            self.smoothing_window = value.parse().map_err(|_| {
                anyhow!("DESKWATCH_SMOOTHING_WINDOW must be an integer number of frames")
            })?;
        }
        if let Some(value) = env_nonempty("DESKWATCH_SAVE_INTERVAL_SECS") {
            let seconds: u64 = value.parse().map_err(|_| {
                anyhow!("DESKWATCH_SAVE_INTERVAL_SECS must be an integer number of seconds")
            })?;
            self.save_interval = Duration::from_secs(seconds);
        }
        if let Some(value) = env_nonempty("DESKWATCH_AUTO_SAVE") {
            self.auto_save = parse_bool("DESKWATCH_AUTO_SAVE", &value)?;
        }
        if let Some(value) = env_nonempty("DESKWATCH_ALERTS") {
            self.alerts_enabled = parse_bool("DESKWATCH_ALERTS", &value)?;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        let clamped = self.smoothing_window.clamp(MIN_WINDOW, MAX_WINDOW);
        if clamped != self.smoothing_window {
            log::warn!(
                "smoothing window {} out of range, using {}",
                self.smoothing_window,
                clamped
            );
            self.smoothing_window = clamped;
        }
        if self.save_interval.as_secs() == 0 {
            return Err(anyhow!("save interval must be greater than zero"));
        }
        if self.source.target_fps == 0 {
            return Err(anyhow!("source target_fps must be greater than zero"));
        }
        if self.detector.input_width == 0 || self.detector.input_height == 0 {
            return Err(anyhow!("detector input size must be non-zero"));
        }
        self.detector.backend = self.detector.backend.trim().to_lowercase();
        if self.detector.backend.is_empty() {
            return Err(anyhow!("detector backend must not be empty"));
        }
        // Model backends take frames as captured; there is no resize step.
        if self.detector.backend == "tract"
            && (self.source.width, self.source.height)
                != (self.detector.input_width, self.detector.input_height)
        {
            return Err(anyhow!(
                "source size {}x{} must match detector input {}x{}",
                self.source.width,
                self.source.height,
                self.detector.input_width,
                self.detector.input_height
            ));
        }
        Ok(())
    }

    /// Session tunables carried by this config.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            thresholds: self.thresholds,
            window: self.smoothing_window,
            tie_break: self.tie_break,
            alerts_enabled: self.alerts_enabled,
            auto_save: self.auto_save,
        }
    }
}

fn read_config_file(path: &Path) -> Result<MonitorConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow!("{} must be true or false", key)),
    }
}

fn parse_tie_break(value: &str) -> Result<TieBreak> {
    TieBreak::parse(value).ok_or_else(|| {
        anyhow!(
            "unknown smoothing tie_break {:?} (expected most_recent or priority)",
            value
        )
    })
}
