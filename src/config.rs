//! Runner configuration loaded from TOML.
//!
//! Reads `config.toml` (or the path in `PRICECHECK_CONFIG`) and
//! deserializes it into strongly-typed structs. The `[step]` table is
//! passed to the step untouched on every run.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

use crate::step::validate_url;
use crate::types::StepConfig;

/// Default config file path.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Env var overriding the config file path.
pub const CONFIG_PATH_ENV: &str = "PRICECHECK_CONFIG";

/// Top-level runner configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub task: TaskConfig,
    pub step: StepConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TaskConfig {
    pub name: String,
    /// Seconds between runs. Absent or zero runs the step once.
    #[serde(default)]
    pub interval_secs: u64,
    #[serde(default = "default_state_file")]
    pub state_file: String,
    /// Optional transport timeout for the runner's HTTP client.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_state_file() -> String {
    "pricecheck_state.json".to_string()
}

impl TaskConfig {
    pub fn is_one_shot(&self) -> bool {
        self.interval_secs == 0
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse and validate configuration text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the config path from the environment, falling back to the default.
    pub fn resolve_path() -> String {
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string())
    }

    fn validate(&self) -> Result<()> {
        if self.task.name.trim().is_empty() {
            anyhow::bail!("task.name must not be empty");
        }
        validate_url(&self.step.url)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [task]
        name = "kindle"
        interval_secs = 3600

        [step]
        url = "https://www.amazon.de/dp/B00TEST"
    "#;

    #[test]
    fn test_parse_sample() {
        let cfg = AppConfig::parse(SAMPLE).unwrap();
        assert_eq!(cfg.task.name, "kindle");
        assert_eq!(cfg.task.interval_secs, 3600);
        assert_eq!(cfg.task.state_file, "pricecheck_state.json");
        assert!(cfg.task.timeout_secs.is_none());
        assert!(!cfg.task.is_one_shot());
        assert_eq!(cfg.step.currency, "EUR");
    }

    #[test]
    fn test_interval_defaults_to_one_shot() {
        let cfg = AppConfig::parse(
            r#"
            [task]
            name = "t"
            state_file = "/tmp/x.json"

            [step]
            url = "https://example.com/p"
            currency = "USD"
            "#,
        )
        .unwrap();
        assert!(cfg.task.is_one_shot());
        assert_eq!(cfg.step.currency, "USD");
        assert_eq!(cfg.task.state_file, "/tmp/x.json");
    }

    #[test]
    fn test_invalid_url_rejected() {
        let err = AppConfig::parse(
            r#"
            [task]
            name = "t"
            [step]
            url = "not-a-url"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("not a valid url"));
    }

    #[test]
    fn test_empty_task_name_rejected() {
        let text = SAMPLE.replace("\"kindle\"", "\"  \"");
        assert!(AppConfig::parse(&text).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = AppConfig::load("/tmp/pricecheck_no_such_config.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
