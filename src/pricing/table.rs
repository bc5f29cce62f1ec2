//! In-memory price table and fallback estimate tiers.

use std::collections::HashMap;

use async_trait::async_trait;

use super::{ModelPrice, PriceLookup, PriceSource};

/// Conservative tier applied to models nothing else knows about.
pub const DEFAULT_PRICE: ModelPrice = ModelPrice::new(2.0, 8.0);

/// Rough published prices ($/1M tokens), most specific family first so that
/// `gpt-4o-mini` is not priced as `gpt-4o`.
const ESTIMATES: &[(&str, ModelPrice)] = &[
    ("gpt-4o-mini", ModelPrice::new(0.15, 0.60)),
    ("gpt-4o", ModelPrice::new(2.50, 10.00)),
    ("gpt-4-turbo", ModelPrice::new(10.00, 30.00)),
    ("gpt-4", ModelPrice::new(30.00, 60.00)),
    ("gpt-3.5-turbo", ModelPrice::new(0.50, 1.50)),
    ("claude-3-5-sonnet", ModelPrice::new(3.00, 15.00)),
    ("claude-3-5-haiku", ModelPrice::new(0.80, 4.00)),
    ("claude-3-opus", ModelPrice::new(15.00, 75.00)),
    ("gemini-2.5-pro", ModelPrice::new(1.25, 5.00)),
    ("gemini-2.5-flash", ModelPrice::new(0.075, 0.30)),
];

/// Estimate a price for a model the price source does not know.
///
/// Returns the matching family estimate, or [`DEFAULT_PRICE`].
pub fn estimate_price(model: &str) -> ModelPrice {
    let lower = model.to_lowercase();
    ESTIMATES
        .iter()
        .find(|(family, _)| lower.contains(family))
        .map(|(_, price)| *price)
        .unwrap_or(DEFAULT_PRICE)
}

/// Fixed price table keyed by model id.
#[derive(Debug, Clone, Default)]
pub struct StaticPriceTable {
    prices: HashMap<String, ModelPrice>,
}

impl StaticPriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, model: impl Into<String>, price: ModelPrice) -> Self {
        self.prices.insert(model.into(), price);
        self
    }

    pub fn insert(&mut self, model: impl Into<String>, price: ModelPrice) {
        self.prices.insert(model.into(), price);
    }
}

#[async_trait]
impl PriceSource for StaticPriceTable {
    async fn lookup(&self, _provider: &str, model: &str) -> PriceLookup {
        self.prices
            .get(model)
            .copied()
            .map(PriceLookup::Known)
            .unwrap_or(PriceLookup::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_prefers_specific_family() {
        assert_eq!(estimate_price("gpt-4o-mini-2024-07-18"), ModelPrice::new(0.15, 0.60));
        assert_eq!(estimate_price("gpt-4o"), ModelPrice::new(2.50, 10.00));
        assert_eq!(estimate_price("GPT-4"), ModelPrice::new(30.00, 60.00));
        assert_eq!(estimate_price("brand-new-model"), DEFAULT_PRICE);
    }

    #[tokio::test]
    async fn test_static_lookup() {
        let table = StaticPriceTable::new().with_price("m", ModelPrice::new(1.0, 2.0));
        assert_eq!(
            table.lookup("openai", "m").await,
            PriceLookup::Known(ModelPrice::new(1.0, 2.0))
        );
        assert_eq!(table.lookup("openai", "x").await, PriceLookup::Unknown);
    }
}
