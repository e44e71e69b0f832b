use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_log_file")]
    pub log_file: String,
    #[serde(default)]
    pub use_json: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub random_scenario: RandomScenarioConfig,
    #[serde(default)]
    pub encoder_scenario: EncoderScenarioConfig,
    /// Write the JSON run report here when set
    #[serde(default)]
    pub report_path: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "./logs".to_string()
}

fn default_log_file() -> String {
    "roundtrip_bench.log".to_string()
}

fn default_rotation() -> String {
    "never".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            log_file: default_log_file(),
            use_json: false,
            rotation: default_rotation(),
            persistence: PersistenceConfig::default(),
            random_scenario: RandomScenarioConfig::default(),
            encoder_scenario: EncoderScenarioConfig::default(),
            report_path: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    File,
    Memory,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PersistenceConfig {
    pub backend: StoreBackend,
    /// Scratch directory for the file backend
    pub dir: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::File,
            dir: "./data/roundtrip".to_string(),
        }
    }
}

/// Random stream round-trip benchmark (both codecs)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RandomScenarioConfig {
    pub seed: u64,
    pub iterations: usize,
    pub draws_per_check: usize,
}

impl Default for RandomScenarioConfig {
    fn default() -> Self {
        Self {
            seed: 7,
            iterations: 1000,
            draws_per_check: 5,
        }
    }
}

/// Sparse encoder equivalence + performance benchmark
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EncoderScenarioConfig {
    pub input_size: u32,
    pub column_count: u32,
    pub active_count: u32,
    /// Set bits in every generated input
    pub input_active_bits: usize,
    pub warmup_iterations: usize,
    pub trials: usize,
    /// Seeds the stream that shuffles inputs
    pub driver_seed: u64,
    /// Seeds encoder initialization
    pub encoder_seed: u64,
    pub boost_strength: f32,
    pub learn_during_trials: bool,
}

impl Default for EncoderScenarioConfig {
    fn default() -> Self {
        Self {
            input_size: 500,
            column_count: 500,
            active_count: 50,
            input_active_bits: 50,
            warmup_iterations: 10_000,
            trials: 100,
            driver_seed: 10,
            encoder_seed: 1,
            boost_strength: 0.0,
            learn_during_trials: false,
        }
    }
}

impl AppConfig {
    /// Load `config/<env>.yaml`.
    pub fn load(env: &str) -> Result<Self> {
        Self::load_from(format!("config/{}.yaml", env))
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = AppConfig::parse("log_level: debug\nencoder_scenario:\n  trials: 5\n").unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.rotation, "never");
        assert_eq!(config.encoder_scenario.trials, 5);
        assert_eq!(config.encoder_scenario.input_size, 500);
        assert_eq!(config.random_scenario, RandomScenarioConfig::default());
        assert_eq!(config.persistence.backend, StoreBackend::File);
        assert!(config.report_path.is_none());
    }

    #[test]
    fn test_backend_names() {
        let config = AppConfig::parse("persistence:\n  backend: memory\n").unwrap();
        assert_eq!(config.persistence.backend, StoreBackend::Memory);
        assert!(AppConfig::parse("persistence:\n  backend: tape\n").is_err());
    }

    #[test]
    fn test_shipped_configs_parse() {
        let dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
        for env in ["dev", "ci"] {
            let path = Path::new(&dir).join("config").join(format!("{}.yaml", env));
            let config = AppConfig::load_from(&path).unwrap();
            assert!(config.random_scenario.iterations > 0, "{env}");
        }
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = AppConfig::load("does-not-exist").unwrap_err();
        assert!(err.to_string().contains("does-not-exist"));
    }
}
