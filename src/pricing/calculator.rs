//! Batch-scoped cost calculation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};
use tracing::warn;

use super::{estimate_price, provider_for, ModelPrice, PriceLookup, PriceSource};

/// A price together with whether it came from the fallback tiers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPrice {
    pub price: ModelPrice,
    pub estimated: bool,
}

/// Cost of a single call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostQuote {
    pub cost_usd: f64,
    pub estimated: bool,
}

/// Turns token counts into USD, caching one price per model.
///
/// Create one per replay batch; the cache is dropped with it.
///
/// # Thread Safety
/// Each model gets its own `OnceCell`, so concurrent first lookups for the
/// same model wait on a single external request instead of racing.
pub struct CostCalculator {
    source: Arc<dyn PriceSource>,
    cache: Mutex<HashMap<String, Arc<OnceCell<ResolvedPrice>>>>,
    lookups: AtomicUsize,
}

impl CostCalculator {
    pub fn new(source: Arc<dyn PriceSource>) -> Self {
        Self {
            source,
            cache: Mutex::new(HashMap::new()),
            lookups: AtomicUsize::new(0),
        }
    }

    /// Resolve the price of `model`, hitting the price source at most once.
    pub async fn price_for(&self, model: &str) -> ResolvedPrice {
        let cell = {
            let mut cache = self.cache.lock().await;
            Arc::clone(cache.entry(model.to_string()).or_default())
        };

        *cell.get_or_init(|| self.resolve(model)).await
    }

    async fn resolve(&self, model: &str) -> ResolvedPrice {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let provider = provider_for(model);

        match self.source.lookup(provider, model).await {
            PriceLookup::Known(price) => ResolvedPrice {
                price,
                estimated: false,
            },
            PriceLookup::Unknown => {
                let price = estimate_price(model);
                warn!(
                    "No price for {}/{}, using estimate ({}/{} per 1M tokens)",
                    provider, model, price.input_per_million, price.output_per_million
                );
                ResolvedPrice {
                    price,
                    estimated: true,
                }
            }
        }
    }

    /// Cost of a call with the given token counts.
    pub async fn quote(&self, model: &str, prompt_tokens: u64, completion_tokens: u64) -> CostQuote {
        let resolved = self.price_for(model).await;
        CostQuote {
            cost_usd: resolved.price.cost_usd(prompt_tokens, completion_tokens),
            estimated: resolved.estimated,
        }
    }

    /// Number of external lookups performed so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}
