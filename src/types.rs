//! Shared types for the PRICECHECK step.
//!
//! These types form the contract between the step and its host:
//! configuration in, persisted step state in/out, a result or an error
//! out, plus the static descriptor the host reads once at registration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Currency assumed when the configuration does not name one.
pub const DEFAULT_CURRENCY: &str = "EUR";

/// Two-line description shown by the host next to the step.
pub const DESCRIPTION: &str = "amazon product\nprice changed";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Per-invocation configuration supplied by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepConfig {
    /// Product page to scrape. Must be an absolute http(s) URL.
    pub url: String,
    /// ISO currency code, drives separator handling when parsing the price.
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

impl StepConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            currency: default_currency(),
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }
}

// ---------------------------------------------------------------------------
// Step state
// ---------------------------------------------------------------------------

/// Persistent step data owned by the host.
///
/// The step reads `prev_price` at call start and overwrites it only on a
/// fully successful run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepState {
    #[serde(default)]
    pub prev_price: f64,
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Outcome of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceCheck {
    pub price: f64,
    /// True iff `price` differs from the previous price seen at call start.
    pub price_changed: bool,
}

impl fmt::Display for PriceCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.price_changed {
            write!(f, "{:.2} (changed)", self.price)
        } else {
            write!(f, "{:.2} (unchanged)", self.price)
        }
    }
}

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// Configuration defaults advertised to the host. `url` has no default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigDefaults {
    pub currency: String,
}

/// Static defaults the host queries once when registering the step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDescriptor {
    pub config: ConfigDefaults,
    pub data: StepState,
    pub description: String,
}

impl Default for StepDescriptor {
    fn default() -> Self {
        Self {
            config: ConfigDefaults {
                currency: default_currency(),
            },
            data: StepState::default(),
            description: DESCRIPTION.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Task record (runner persistence)
// ---------------------------------------------------------------------------

/// What the reference host keeps on disk for its single task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub name: String,
    pub data: StepState,
    /// Number of successful runs.
    #[serde(default)]
    pub runs: u64,
    #[serde(default)]
    pub last_checked: Option<DateTime<Utc>>,
}

impl TaskRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: StepState::default(),
            runs: 0,
            last_checked: None,
        }
    }

    /// Stamp a completed run.
    pub fn record_run(&mut self) {
        self.runs += 1;
        self.last_checked = Some(Utc::now());
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Everything a price check can fail with.
///
/// `InvalidConfig` is returned synchronously from `PriceCheckStep::run`;
/// every other variant arrives through the returned future.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("not a valid url: {0}")]
    InvalidConfig(String),

    #[error("request failed: {0:#}")]
    Transport(anyhow::Error),

    #[error("scraping failed")]
    ScrapeFailed,

    #[error("selection is empty")]
    EmptySelection,

    #[error("could not parse price: {0}")]
    Parse(String),
}

impl StepError {
    /// Whether the error was raised before any network activity.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::InvalidConfig(_))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_currency_defaults_to_eur() {
        let cfg: StepConfig =
            serde_json::from_str(r#"{"url": "https://www.amazon.de/dp/B0000"}"#).unwrap();
        assert_eq!(cfg.currency, "EUR");
    }

    #[test]
    fn test_config_explicit_currency() {
        let cfg: StepConfig =
            serde_json::from_str(r#"{"url": "https://www.amazon.com/dp/B0000", "currency": "USD"}"#)
                .unwrap();
        assert_eq!(cfg.currency, "USD");
        assert_eq!(StepConfig::new("x").with_currency("GBP").currency, "GBP");
    }

    #[test]
    fn test_state_serialises_camel_case() {
        let json = serde_json::to_value(StepState { prev_price: 12.5 }).unwrap();
        assert_eq!(json, serde_json::json!({"prevPrice": 12.5}));

        let empty: StepState = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.prev_price, 0.0);
    }

    #[test]
    fn test_descriptor_defaults() {
        let d = StepDescriptor::default();
        assert_eq!(d.config.currency, "EUR");
        assert_eq!(d.data.prev_price, 0.0);
        assert_eq!(d.description.lines().count(), 2);
        assert!(d.description.starts_with("amazon product"));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            StepError::InvalidConfig("not-a-url".into()).to_string(),
            "not a valid url: not-a-url"
        );
        assert_eq!(StepError::ScrapeFailed.to_string(), "scraping failed");
        assert_eq!(StepError::EmptySelection.to_string(), "selection is empty");
        assert_eq!(
            StepError::Parse("Unavailable".into()).to_string(),
            "could not parse price: Unavailable"
        );
        assert!(StepError::InvalidConfig(String::new()).is_config());
        assert!(!StepError::EmptySelection.is_config());
    }

    #[test]
    fn test_task_record_run_stamp() {
        let mut rec = TaskRecord::new("kindle");
        assert!(rec.last_checked.is_none());
        rec.record_run();
        assert_eq!(rec.runs, 1);
        assert!(rec.last_checked.is_some());
    }

    #[test]
    fn test_price_check_display() {
        let pc = PriceCheck { price: 24.95, price_changed: true };
        assert_eq!(pc.to_string(), "24.95 (changed)");
    }
}
