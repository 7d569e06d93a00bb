use anyhow::Result;

use crate::detect::result::DetectionResult;

/// What a backend can find in a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectionCapability {
    PersonDetection,
    HeadDetection,
}

/// The pipeline needs both classes from a single backend.
pub const REQUIRED_CAPABILITIES: &[DetectionCapability] = &[
    DetectionCapability::PersonDetection,
    DetectionCapability::HeadDetection,
];

/// Detector backend trait.
///
/// The backend is an external oracle: it turns pixels into person and head
/// boxes with confidences. It may fail; a failed call skips the frame and
/// leaves all monitoring state untouched.
///
/// Calls are strictly sequential. The frame loop blocks on `detect` before
/// scheduling the next frame, so a slow backend lowers the frame rate
/// instead of queueing work.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Returns true when the backend supports a capability.
    fn supports(&self, capability: DetectionCapability) -> bool;

    /// Run detection on a frame.
    ///
    /// Implementations must treat the pixel slice as read-only and must not
    /// keep it past the call.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<DetectionResult>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
