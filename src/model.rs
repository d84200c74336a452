//! Engine model — the catalog of registered pipelines
//!
//! The model is data only: it names pipeline factories. Scheduler ownership
//! lives in the registry, which keeps the model free of back-references.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{EngineError, Result};
use crate::pipeline::Pipeline;

/// Name-keyed catalog of pipeline factories
#[derive(Default)]
pub struct Model {
    pipelines: RwLock<HashMap<String, Arc<dyn Pipeline>>>,
}

impl Model {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pipeline factory under its own name.
    /// Registering the same name twice is a configuration error.
    pub fn register(&self, pipeline: Arc<dyn Pipeline>) -> Result<()> {
        let name = pipeline.name().to_string();
        let mut pipelines = self.pipelines.write().unwrap();
        if pipelines.contains_key(&name) {
            return Err(EngineError::Config(format!(
                "Pipeline '{}' is already registered",
                name
            )));
        }
        pipelines.insert(name, pipeline);
        Ok(())
    }

    /// Look up a pipeline by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Pipeline>> {
        self.pipelines.read().unwrap().get(name).cloned()
    }

    /// Names of all registered pipelines
    pub fn names(&self) -> Vec<String> {
        self.pipelines.read().unwrap().keys().cloned().collect()
    }

    /// Number of registered pipelines
    pub fn len(&self) -> usize {
        self.pipelines.read().unwrap().len()
    }

    /// Whether no pipelines are registered
    pub fn is_empty(&self) -> bool {
        self.pipelines.read().unwrap().is_empty()
    }
}
