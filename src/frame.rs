//! Frame handoff between capture and detection.
//!
//! Video capture is owned by the embedding application. This module only
//! defines the container the detector reads from and the `FrameSource` seam
//! the frame loop pulls from, plus a synthetic source for headless runs.
//!
//! - `Frame`: pixel buffer for one capture. Bytes are handed to the detector
//!   and dropped with the frame.
//! - `FrameSource`: anything that yields frames on demand.
//! - `SyntheticSource`: flat gray frames at a fixed size, for demos and tests.

use anyhow::{anyhow, Result};

use crate::detect::{DetectionResult, DetectorBackend};

/// Pixel buffer for one captured frame (packed RGB, row-major).
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Capture sequence number, starting at 1 for each source.
    pub sequence: u64,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if data.len() != expected {
            return Err(anyhow!(
                "frame {}x{} needs {} RGB bytes, got {}",
                width,
                height,
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            sequence,
        })
    }

    /// Zero-sized frame for backends that ignore pixels.
    pub fn empty(sequence: u64) -> Self {
        Self {
            data: Vec::new(),
            width: 0,
            height: 0,
            sequence,
        }
    }

    /// Run a detector on this frame. The backend borrows the pixels for the call only.
    pub fn run_detector<B: DetectorBackend + ?Sized>(
        &self,
        backend: &mut B,
    ) -> Result<DetectionResult> {
        backend.detect(&self.data, self.width, self.height)
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }
}

/// Source of frames for the monitoring loop.
pub trait FrameSource {
    /// Capture the next frame. Blocks until one is available.
    fn next_frame(&mut self) -> Result<Frame>;

    fn is_healthy(&self) -> bool {
        true
    }
}

#[derive(Clone, Debug)]
pub struct SourceSettings {
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            target_fps: 10,
            width: 640,
            height: 480,
        }
    }
}

/// Synthetic source producing flat gray frames.
pub struct SyntheticSource {
    settings: SourceSettings,
    frames_captured: u64,
}

impl SyntheticSource {
    pub fn new(settings: SourceSettings) -> Result<Self> {
        if settings.target_fps == 0 {
            return Err(anyhow!("target_fps must be >= 1"));
        }
        Ok(Self {
            settings,
            frames_captured: 0,
        })
    }

    pub fn settings(&self) -> &SourceSettings {
        &self.settings
    }

    pub fn frames_captured(&self) -> u64 {
        self.frames_captured
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<Frame> {
        self.frames_captured += 1;
        let len = (self.settings.width as usize) * (self.settings.height as usize) * 3;
        // Slow brightness ramp so consecutive frames differ.
        let shade = (self.frames_captured % 64) as u8 + 96;
        Frame::new(
            vec![shade; len],
            self.settings.width,
            self.settings.height,
            self.frames_captured,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::ScriptedBackend;

    #[test]
    fn frame_rejects_wrong_buffer_size() {
        assert!(Frame::new(vec![0; 10], 2, 2, 1).is_err());
        assert!(Frame::new(vec![0; 12], 2, 2, 1).is_ok());
    }

    #[test]
    fn synthetic_source_produces_sized_frames() -> Result<()> {
        let mut source = SyntheticSource::new(SourceSettings {
            target_fps: 5,
            width: 8,
            height: 4,
        })?;
        let frame = source.next_frame()?;
        assert_eq!(frame.width, 8);
        assert_eq!(frame.height, 4);
        assert_eq!(frame.byte_len(), 8 * 4 * 3);
        assert_eq!(frame.sequence, 1);
        assert_eq!(source.next_frame()?.sequence, 2);
        assert_eq!(source.frames_captured(), 2);
        Ok(())
    }

    #[test]
    fn zero_fps_is_rejected() {
        let settings = SourceSettings {
            target_fps: 0,
            ..SourceSettings::default()
        };
        assert!(SyntheticSource::new(settings).is_err());
    }

    #[test]
    fn frame_runs_detector() -> Result<()> {
        let mut backend = ScriptedBackend::new();
        let frame = Frame::empty(1);
        let result = frame.run_detector(&mut backend)?;
        assert!(result.detections.is_empty());
        assert_eq!(backend.calls(), 1);
        Ok(())
    }
}
