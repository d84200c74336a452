//! Scaling policy configuration for dynamic pipeline scheduling

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{EngineError, Result};

/// Autoscaling policy for a pipeline's worker pool.
///
/// Dynamic schedulers grow the pool toward the observed source queue length
/// and retire one worker per shrink tick once every probe reports empty.
/// The fast-scale knobs boost growth that closely follows a shrink, on the
/// assumption that the shrink cut below the real working parallelism.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalingPolicy {
    /// Worker count spawned when a dynamic scheduler starts (default: 1)
    #[serde(default = "default_init_parallelism")]
    pub init_parallelism: u32,

    /// Floor enforced by the shrinker (default: 1)
    #[serde(default = "default_min_parallelism")]
    pub min_parallelism: u32,

    /// Hard cap on pool size (default: 1024)
    #[serde(default = "default_max_parallelism")]
    pub max_parallelism: u32,

    /// Per-source debounce between accepted triggers, in ms (default: 500)
    #[serde(default = "default_spawn_min_interval_ms")]
    pub spawn_min_interval_ms: u64,

    /// Cap on workers added per launcher event (default: 500)
    #[serde(default = "default_spawn_max_in_each")]
    pub spawn_max_in_each: u32,

    /// Window after a shrink during which growth is boosted, in ms (default: 1000)
    #[serde(default = "default_fast_scale_interval_ms")]
    pub fast_scale_interval_ms: u64,

    /// Multiplier applied to the queue length inside the fast-scale window (default: 1.2)
    #[serde(default = "default_fast_scale_ratio")]
    pub fast_scale_ratio: f64,

    /// Floor for the boosted target inside the fast-scale window (default: 5)
    #[serde(default = "default_fast_scale_min_count")]
    pub fast_scale_min_count: u32,

    /// Cooldown after a launch before any shrink, in ms (default: 500)
    #[serde(default = "default_shrink_min_delay_ms")]
    pub shrink_min_delay_ms: u64,

    /// Upper bound on waiting for one worker's teardown, in seconds (default: 30)
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,

    /// Spawner sweep cadence, in ms (default: 1000)
    #[serde(default = "default_tick_ms")]
    pub spawn_tick_ms: u64,

    /// Shrinker cadence, in ms (default: 1000)
    #[serde(default = "default_tick_ms")]
    pub shrink_tick_ms: u64,
}

impl Default for ScalingPolicy {
    fn default() -> Self {
        Self {
            init_parallelism: default_init_parallelism(),
            min_parallelism: default_min_parallelism(),
            max_parallelism: default_max_parallelism(),
            spawn_min_interval_ms: default_spawn_min_interval_ms(),
            spawn_max_in_each: default_spawn_max_in_each(),
            fast_scale_interval_ms: default_fast_scale_interval_ms(),
            fast_scale_ratio: default_fast_scale_ratio(),
            fast_scale_min_count: default_fast_scale_min_count(),
            shrink_min_delay_ms: default_shrink_min_delay_ms(),
            stop_timeout_secs: default_stop_timeout_secs(),
            spawn_tick_ms: default_tick_ms(),
            shrink_tick_ms: default_tick_ms(),
        }
    }
}

impl ScalingPolicy {
    /// Per-source trigger debounce window
    pub fn spawn_min_interval(&self) -> Duration {
        Duration::from_millis(self.spawn_min_interval_ms)
    }

    /// Fast-scale window measured from the last shrink
    pub fn fast_scale_interval(&self) -> Duration {
        Duration::from_millis(self.fast_scale_interval_ms)
    }

    /// Post-launch shrink cooldown
    pub fn shrink_min_delay(&self) -> Duration {
        Duration::from_millis(self.shrink_min_delay_ms)
    }

    /// Per-worker teardown deadline
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    /// Spawner sweep cadence
    pub fn spawn_tick(&self) -> Duration {
        Duration::from_millis(self.spawn_tick_ms)
    }

    /// Shrinker cadence
    pub fn shrink_tick(&self) -> Duration {
        Duration::from_millis(self.shrink_tick_ms)
    }
}

fn default_init_parallelism() -> u32 {
    1
}

fn default_min_parallelism() -> u32 {
    1
}

fn default_max_parallelism() -> u32 {
    1024
}

fn default_spawn_min_interval_ms() -> u64 {
    500
}

fn default_spawn_max_in_each() -> u32 {
    500
}

fn default_fast_scale_interval_ms() -> u64 {
    1000
}

fn default_fast_scale_ratio() -> f64 {
    1.2
}

fn default_fast_scale_min_count() -> u32 {
    5
}

fn default_shrink_min_delay_ms() -> u64 {
    500
}

fn default_stop_timeout_secs() -> u64 {
    30
}

fn default_tick_ms() -> u64 {
    1000
}

/// Validate the scaling policy of a pipeline
pub fn validate_scaling(pipeline_name: &str, policy: &ScalingPolicy) -> Result<()> {
    if policy.max_parallelism == 0 {
        return Err(EngineError::Config(format!(
            "Pipeline '{}': max_parallelism must be at least 1",
            pipeline_name
        )));
    }
    if policy.min_parallelism > policy.max_parallelism {
        return Err(EngineError::Config(format!(
            "Pipeline '{}': min_parallelism ({}) must be <= max_parallelism ({})",
            pipeline_name, policy.min_parallelism, policy.max_parallelism
        )));
    }
    if policy.init_parallelism > policy.max_parallelism {
        return Err(EngineError::Config(format!(
            "Pipeline '{}': init_parallelism ({}) must be <= max_parallelism ({})",
            pipeline_name, policy.init_parallelism, policy.max_parallelism
        )));
    }
    if policy.fast_scale_ratio < 1.0 {
        return Err(EngineError::Config(format!(
            "Pipeline '{}': fast_scale_ratio ({}) must be >= 1.0",
            pipeline_name, policy.fast_scale_ratio
        )));
    }
    if policy.spawn_max_in_each == 0 {
        return Err(EngineError::Config(format!(
            "Pipeline '{}': spawn_max_in_each must be at least 1",
            pipeline_name
        )));
    }
    if policy.spawn_tick_ms == 0 || policy.shrink_tick_ms == 0 {
        return Err(EngineError::Config(format!(
            "Pipeline '{}': control loop tick intervals must be nonzero",
            pipeline_name
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaling_policy_defaults() {
        let policy = ScalingPolicy::default();
        assert_eq!(policy.init_parallelism, 1);
        assert_eq!(policy.min_parallelism, 1);
        assert_eq!(policy.max_parallelism, 1024);
        assert_eq!(policy.spawn_min_interval_ms, 500);
        assert_eq!(policy.spawn_max_in_each, 500);
        assert_eq!(policy.fast_scale_interval_ms, 1000);
        assert!((policy.fast_scale_ratio - 1.2).abs() < f64::EPSILON);
        assert_eq!(policy.fast_scale_min_count, 5);
        assert_eq!(policy.shrink_min_delay_ms, 500);
        assert_eq!(policy.stop_timeout_secs, 30);
        assert_eq!(policy.spawn_tick_ms, 1000);
        assert_eq!(policy.shrink_tick_ms, 1000);
    }

    #[test]
    fn test_scaling_policy_parse_toml() {
        let toml = r#"
            init_parallelism = 4
            min_parallelism = 2
            max_parallelism = 64
            spawn_min_interval_ms = 250
            spawn_max_in_each = 100
            fast_scale_interval_ms = 2000
            fast_scale_ratio = 1.5
            fast_scale_min_count = 8
            shrink_min_delay_ms = 750
            stop_timeout_secs = 10
        "#;
        let policy: ScalingPolicy = toml::from_str(toml).unwrap();
        assert_eq!(policy.init_parallelism, 4);
        assert_eq!(policy.min_parallelism, 2);
        assert_eq!(policy.max_parallelism, 64);
        assert_eq!(policy.spawn_min_interval_ms, 250);
        assert_eq!(policy.spawn_max_in_each, 100);
        assert_eq!(policy.fast_scale_interval_ms, 2000);
        assert!((policy.fast_scale_ratio - 1.5).abs() < f64::EPSILON);
        assert_eq!(policy.fast_scale_min_count, 8);
        assert_eq!(policy.shrink_min_delay_ms, 750);
        assert_eq!(policy.stop_timeout_secs, 10);
    }

    #[test]
    fn test_scaling_policy_parse_empty_toml() {
        let policy: ScalingPolicy = toml::from_str("").unwrap();
        assert_eq!(policy.max_parallelism, 1024);
        assert_eq!(policy.spawn_tick_ms, 1000);
    }

    #[test]
    fn test_duration_accessors() {
        let policy = ScalingPolicy::default();
        assert_eq!(policy.spawn_min_interval(), Duration::from_millis(500));
        assert_eq!(policy.fast_scale_interval(), Duration::from_millis(1000));
        assert_eq!(policy.shrink_min_delay(), Duration::from_millis(500));
        assert_eq!(policy.stop_timeout(), Duration::from_secs(30));
        assert_eq!(policy.spawn_tick(), Duration::from_millis(1000));
        assert_eq!(policy.shrink_tick(), Duration::from_millis(1000));
    }

    #[test]
    fn test_validate_zero_max() {
        let policy = ScalingPolicy {
            max_parallelism: 0,
            ..ScalingPolicy::default()
        };
        let err = validate_scaling("access", &policy).unwrap_err();
        assert!(err.to_string().contains("max_parallelism"));
    }

    #[test]
    fn test_validate_min_greater_than_max() {
        let policy = ScalingPolicy {
            min_parallelism: 10,
            max_parallelism: 5,
            ..ScalingPolicy::default()
        };
        let err = validate_scaling("access", &policy).unwrap_err();
        assert!(err.to_string().contains("min_parallelism"));
    }

    #[test]
    fn test_validate_init_greater_than_max() {
        let policy = ScalingPolicy {
            init_parallelism: 2048,
            ..ScalingPolicy::default()
        };
        let err = validate_scaling("access", &policy).unwrap_err();
        assert!(err.to_string().contains("init_parallelism"));
    }

    #[test]
    fn test_validate_ratio_below_one() {
        let policy = ScalingPolicy {
            fast_scale_ratio: 0.5,
            ..ScalingPolicy::default()
        };
        let err = validate_scaling("access", &policy).unwrap_err();
        assert!(err.to_string().contains("fast_scale_ratio"));
    }

    #[test]
    fn test_validate_zero_spawn_max() {
        let policy = ScalingPolicy {
            spawn_max_in_each: 0,
            ..ScalingPolicy::default()
        };
        assert!(validate_scaling("access", &policy).is_err());
    }

    #[test]
    fn test_validate_zero_tick() {
        let policy = ScalingPolicy {
            shrink_tick_ms: 0,
            ..ScalingPolicy::default()
        };
        let err = validate_scaling("access", &policy).unwrap_err();
        assert!(err.to_string().contains("tick"));
    }

    #[test]
    fn test_validate_defaults_ok() {
        assert!(validate_scaling("access", &ScalingPolicy::default()).is_ok());
    }

    #[test]
    fn test_scaling_policy_serialization_roundtrip() {
        let policy = ScalingPolicy {
            init_parallelism: 3,
            max_parallelism: 128,
            ..ScalingPolicy::default()
        };
        let json = serde_json::to_string(&policy).unwrap();
        let parsed: ScalingPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.init_parallelism, 3);
        assert_eq!(parsed.max_parallelism, 128);
    }
}
