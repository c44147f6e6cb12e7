//! The price-check step.
//!
//! One invocation is one unit of work:
//! validate → fetch → extract → parse → compare → persist.
//!
//! URL validation happens synchronously in `PriceCheckStep::run` and is the
//! only failure that never reaches the returned future. Every later failure
//! resolves the future with an error after logging through the host
//! context, and leaves the step state untouched.

use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::context::StepContext;
use crate::formatting;
use crate::scraping::{self, HttpFetcher, PageFetcher, PageRequest};
use crate::types::{PriceCheck, StepConfig, StepDescriptor, StepError, StepState};

/// Node holding the price on the product page.
pub const PRICE_SELECTOR: &str = "#priceblock_ourprice";

const MULTIPLE_MATCHES: &str = "more than one element selected — only using first one";

/// Accept only absolute http(s) URLs with a host.
pub fn validate_url(raw: &str) -> Result<Url, StepError> {
    let invalid = || StepError::InvalidConfig(raw.to_string());

    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    let has_host = url.host_str().is_some_and(|h| !h.is_empty());
    if !matches!(url.scheme(), "http" | "https") || !has_host {
        return Err(invalid());
    }
    Ok(url)
}

/// Log a failure against the task and hand it back for propagation.
fn fail(ctx: &dyn StepContext, err: StepError) -> StepError {
    ctx.error(&formatting::task_msg(ctx.task_name(), &err.to_string()));
    err
}

/// Pull the price out of a product page body.
fn extract_price(body: &str, currency: &str, ctx: &dyn StepContext) -> Result<f64, StepError> {
    let Some(selection) = scraping::query(PRICE_SELECTOR, body) else {
        return Err(fail(ctx, StepError::ScrapeFailed));
    };

    if selection.is_empty() {
        return Err(fail(ctx, StepError::EmptySelection));
    }

    if selection.len() > 1 {
        ctx.warn(&formatting::task_msg(ctx.task_name(), MULTIPLE_MATCHES));
        debug!(task = ctx.task_name(), matches = ?selection.texts(), "Ignoring extra price nodes");
    }

    let text = selection.first_text().unwrap_or_default();
    let price_str = formatting::price(text, currency);

    match price_str.parse::<f64>() {
        Ok(price) if price.is_finite() => Ok(price),
        _ => Err(fail(ctx, StepError::Parse(price_str))),
    }
}

/// Fetches a product page and tracks its price across runs.
pub struct PriceCheckStep {
    fetcher: Arc<dyn PageFetcher>,
}

impl PriceCheckStep {
    /// Step backed by a default reqwest client.
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self::with_fetcher(Arc::new(HttpFetcher::new()?)))
    }

    pub fn with_fetcher(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    /// Defaults the host reads once at registration.
    pub fn descriptor() -> StepDescriptor {
        StepDescriptor::default()
    }

    /// Start one price check.
    ///
    /// Returns `Err(StepError::InvalidConfig)` immediately for a bad URL,
    /// before any request is made. Otherwise returns a future that resolves
    /// exactly once with the outcome. `input` is part of the host's step
    /// contract; this step does not consume upstream output.
    pub fn run<'a>(
        &'a self,
        state: &'a mut StepState,
        ctx: &'a dyn StepContext,
        config: &'a StepConfig,
        _input: &serde_json::Value,
    ) -> Result<BoxFuture<'a, Result<PriceCheck, StepError>>, StepError> {
        let url = validate_url(&config.url)?;
        let request = PageRequest::browser_like(url);

        Ok(async move {
            let page = self
                .fetcher
                .fetch(&request)
                .await
                .map_err(StepError::Transport)?;

            if !page.is_success() {
                debug!(
                    task = ctx.task_name(),
                    status = page.status,
                    "Non-success status, scraping body anyway"
                );
            }

            let price = extract_price(&page.body, &config.currency, ctx)?;

            let prev_price = state.prev_price;
            let price_changed = prev_price != price;
            if price_changed {
                ctx.info(&formatting::price_delta(
                    price,
                    prev_price,
                    &config.currency,
                    ctx.task_name(),
                ));
            }

            state.prev_price = price;
            ctx.save_task();

            Ok(PriceCheck { price, price_changed })
        }
        .boxed())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
