use crate::Backend;
use std::collections::HashMap;

pub struct BackendRegistry {
    backends: HashMap<String, Box<dyn Backend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    pub fn register(&mut self, backend: Box<dyn Backend>) {
        let name = backend.name().to_string();
        self.backends.insert(name, backend);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Backend> {
        self.backends.get(name).map(|b| &**b as &dyn Backend)
    }

    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.backends.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Backend for a model file: `.onnx` goes to the ONNX runtime, anything
    /// else to candle.
    pub fn for_model(&self, path: &std::path::Path) -> Option<&dyn Backend> {
        let name = match path.extension().and_then(|ext| ext.to_str()) {
            Some("onnx") => "onnx",
            _ => "candle",
        };
        self.get(name)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub fn create_registry() -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    registry.register(Box::new(crate::backends::CandleBackend));

    #[cfg(feature = "onnx")]
    registry.register(Box::new(crate::backends::OnnxBackend));

    registry
}
