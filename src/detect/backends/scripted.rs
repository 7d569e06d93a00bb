use std::collections::VecDeque;
use std::path::Path;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::detect::backend::{DetectionCapability, DetectorBackend};
use crate::detect::result::{Detection, DetectionResult};

/// One scripted frame: either a detection list or a simulated oracle failure.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptFrame {
    /// Frame time in ms since the start of the script. Used by replay
    /// drivers; the backend itself ignores it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_ms: Option<i64>,
    #[serde(default)]
    pub detections: Vec<Detection>,
    #[serde(default)]
    pub fail: bool,
}

impl ScriptFrame {
    pub fn detections(detections: Vec<Detection>) -> Self {
        Self {
            at_ms: None,
            detections,
            fail: false,
        }
    }

    pub fn failure() -> Self {
        Self {
            at_ms: None,
            detections: Vec::new(),
            fail: true,
        }
    }

    pub fn at(mut self, at_ms: i64) -> Self {
        self.at_ms = Some(at_ms);
        self
    }
}

/// Parse a JSON array of script frames.
pub fn parse_script(json: &str) -> Result<Vec<ScriptFrame>> {
    serde_json::from_str(json).map_err(|e| anyhow!("invalid detection script: {}", e))
}

/// Backend that replays a fixed script instead of running a model.
///
/// Pixels are ignored. When the script runs out the backend either starts
/// over (cycling) or reports an empty scene.
#[derive(Default)]
pub struct ScriptedBackend {
    script: Vec<ScriptFrame>,
    pending: VecDeque<usize>,
    cycle: bool,
    calls: u64,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_frames(frames: Vec<ScriptFrame>) -> Self {
        let mut backend = Self::new();
        for frame in frames {
            backend.push(frame);
        }
        backend
    }

    /// Load a script from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read script {}: {}", path.display(), e))?;
        Ok(Self::from_frames(parse_script(&raw)?))
    }

    /// Restart the script from the top once it is exhausted.
    pub fn cycling(mut self, cycle: bool) -> Self {
        self.cycle = cycle;
        self
    }

    pub fn push(&mut self, frame: ScriptFrame) {
        self.pending.push_back(self.script.len());
        self.script.push(frame);
    }

    pub fn push_detections(&mut self, detections: Vec<Detection>) {
        self.push(ScriptFrame::detections(detections));
    }

    pub fn push_failure(&mut self) {
        self.push(ScriptFrame::failure());
    }

    /// Frames not yet served in the current pass.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }

    fn next_frame(&mut self) -> Option<&ScriptFrame> {
        if self.pending.is_empty() && self.cycle {
            self.pending.extend(0..self.script.len());
        }
        let idx = self.pending.pop_front()?;
        self.script.get(idx)
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn supports(&self, capability: DetectionCapability) -> bool {
        matches!(
            capability,
            DetectionCapability::PersonDetection | DetectionCapability::HeadDetection
        )
    }

    fn detect(&mut self, _pixels: &[u8], _width: u32, _height: u32) -> Result<DetectionResult> {
        self.calls += 1;
        let call = self.calls;
        match self.next_frame() {
            Some(frame) if frame.fail => Err(anyhow!("scripted oracle failure at call {}", call)),
            Some(frame) => Ok(DetectionResult::new(frame.detections.clone())),
            None => Ok(DetectionResult::default()),
        }
    }
}
