mod backend;
mod backends;
mod registry;
mod result;

pub use backend::{DetectionCapability, DetectorBackend, REQUIRED_CAPABILITIES};
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use backends::{parse_script, ScriptFrame, ScriptedBackend};
pub use registry::BackendRegistry;
pub use result::{Detection, DetectionResult, ObjectClass};
