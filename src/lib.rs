//! PRICECHECK — product-page price watcher step
//!
//! Library crate exposing the step, its host contract and the helpers it
//! is built from, for use by task hosts, integration tests and the
//! reference runner binary.

pub mod config;
pub mod context;
pub mod formatting;
pub mod scraping;
pub mod step;
pub mod storage;
pub mod types;

pub use context::{HostContext, StepContext};
pub use step::PriceCheckStep;
pub use types::{PriceCheck, StepConfig, StepDescriptor, StepError, StepState};
