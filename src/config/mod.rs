//! Configuration types for the flowgate engine
//!
//! A configuration file declares named pipelines; each pipeline carries a
//! fixed parallelism (preallocated pool) or parallelism 0, which selects
//! dynamic scheduling governed by its scaling policy.

pub mod scaling;

pub use scaling::ScalingPolicy;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{EngineError, Result};

/// Top-level engine configuration
///
/// # TOML Example
///
/// ```toml
/// [pipelines.access]
/// parallelism = 0
///
/// [pipelines.access.scaling]
/// min_parallelism = 1
/// max_parallelism = 64
///
/// [pipelines.audit]
/// parallelism = 3
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Pipelines: named pipeline settings
    #[serde(default)]
    pub pipelines: HashMap<String, PipelineConfig>,
}

/// Per-pipeline settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Fixed worker count; 0 selects dynamic scheduling
    #[serde(default)]
    pub parallelism: u32,

    /// Autoscaling policy (used in dynamic mode; the cap and stop timeout
    /// also bound static pools)
    #[serde(default)]
    pub scaling: ScalingPolicy,
}

impl PipelineConfig {
    /// Fixed worker count; 0 selects dynamic scheduling
    pub fn parallelism(&self) -> u32 {
        self.parallelism
    }

    /// Whether this pipeline is dynamically scheduled
    pub fn is_dynamic(&self) -> bool {
        self.parallelism == 0
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            EngineError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| EngineError::Config(format!("Failed to parse TOML config: {}", e)))
    }

    /// Validate the configuration for consistency
    pub fn validate(&self) -> Result<()> {
        for (name, pipeline) in &self.pipelines {
            scaling::validate_scaling(name, &pipeline.scaling)?;

            if pipeline.parallelism > pipeline.scaling.max_parallelism {
                return Err(EngineError::Config(format!(
                    "Pipeline '{}': parallelism ({}) exceeds max_parallelism ({})",
                    name, pipeline.parallelism, pipeline.scaling.max_parallelism
                )));
            }
        }

        Ok(())
    }
}
