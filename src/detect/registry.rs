use std::collections::BTreeMap;

use anyhow::{anyhow, Result};

use super::backend::{DetectionCapability, DetectorBackend};

/// Registry of detector backends, keyed by backend name.
///
/// Frames are processed one at a time, so backends are owned directly and
/// handed out as `&mut` for the duration of a single `detect` call.
pub struct BackendRegistry {
    backends: BTreeMap<String, Box<dyn DetectorBackend>>,
    default_name: Option<String>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: BTreeMap::new(),
            default_name: None,
        }
    }

    /// Register a backend. The first registered backend becomes the default.
    pub fn register<B: DetectorBackend + 'static>(&mut self, backend: B) {
        let name = backend.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.backends.insert(name, Box::new(backend));
    }

    /// Set default backend by name.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.backends.contains_key(name) {
            return Err(anyhow!("backend '{}' not registered", name));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default_name.as_deref()
    }

    /// Get backend by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Box<dyn DetectorBackend>> {
        self.backends.get_mut(name)
    }

    /// List registered backends in name order.
    pub fn list(&self) -> Vec<String> {
        self.backends.keys().cloned().collect()
    }

    /// Select a backend that supports every requested capability.
    ///
    /// Prefers the default backend; otherwise the first match in name order.
    pub fn backend_for_capabilities(
        &mut self,
        required: &[DetectionCapability],
    ) -> Result<&mut Box<dyn DetectorBackend>> {
        let supports_all =
            |backend: &dyn DetectorBackend| required.iter().all(|cap| backend.supports(*cap));

        let default_fits = self
            .default_name
            .as_ref()
            .and_then(|name| self.backends.get(name))
            .is_some_and(|backend| supports_all(&**backend));

        let chosen = if default_fits {
            self.default_name.clone()
        } else {
            self.backends
                .iter()
                .find(|&(_, backend)| supports_all(&**backend))
                .map(|(name, _)| name.clone())
        };

        let name = chosen.ok_or_else(|| {
            anyhow!(
                "no registered backend supports capabilities {:?}",
                required
            )
        })?;
        self.backends
            .get_mut(&name)
            .ok_or_else(|| anyhow!("backend '{}' vanished from registry", name))
    }

    /// Warm up every registered backend.
    pub fn warm_up_all(&mut self) -> Result<()> {
        for (name, backend) in self.backends.iter_mut() {
            backend
                .warm_up()
                .map_err(|e| anyhow!("backend '{}' warm-up failed: {}", name, e))?;
        }
        Ok(())
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::result::DetectionResult;
    use crate::detect::ScriptedBackend;

    struct PersonOnly;

    impl DetectorBackend for PersonOnly {
        fn name(&self) -> &'static str {
            "person-only"
        }

        fn supports(&self, capability: DetectionCapability) -> bool {
            matches!(capability, DetectionCapability::PersonDetection)
        }

        fn detect(&mut self, _pixels: &[u8], _w: u32, _h: u32) -> Result<DetectionResult> {
            Ok(DetectionResult::default())
        }
    }

    #[test]
    fn first_registered_is_default() {
        let mut registry = BackendRegistry::new();
        registry.register(PersonOnly);
        registry.register(ScriptedBackend::new());
        assert_eq!(registry.default_name(), Some("person-only"));
        assert_eq!(registry.list(), vec!["person-only", "scripted"]);
    }

    #[test]
    fn capability_lookup_skips_default_without_head_support() {
        let mut registry = BackendRegistry::new();
        registry.register(PersonOnly);
        registry.register(ScriptedBackend::new());

        let backend = registry
            .backend_for_capabilities(crate::detect::REQUIRED_CAPABILITIES)
            .unwrap();
        assert_eq!(backend.name(), "scripted");
    }

    #[test]
    fn unknown_default_is_rejected() {
        let mut registry = BackendRegistry::new();
        registry.register(ScriptedBackend::new());
        assert!(registry.set_default("tract").is_err());
        assert!(registry.set_default("scripted").is_ok());
    }

    #[test]
    fn empty_registry_has_no_backend() {
        let mut registry = BackendRegistry::new();
        assert!(registry
            .backend_for_capabilities(&[DetectionCapability::HeadDetection])
            .is_err());
    }
}
