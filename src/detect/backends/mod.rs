pub mod scripted;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use scripted::{parse_script, ScriptFrame, ScriptedBackend};

#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;
