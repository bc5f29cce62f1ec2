//! Pricing module - model prices and per-call cost calculation.
//!
//! # Key Concepts
//! - PriceSource: external price lookup, never fails (unknown models are a value)
//! - PriceTable: in-memory prices plus the fallback estimate tiers
//! - Portkey: HTTP price source backed by the Portkey pricing API
//! - CostCalculator: batch-scoped cache turning token counts into USD

mod calculator;
mod portkey;
mod source;
mod table;

pub use calculator::{CostCalculator, CostQuote, ResolvedPrice};
pub use portkey::{PortkeyPricing, DEFAULT_PORTKEY_URL};
pub use source::{provider_for, ModelPrice, PriceLookup, PriceSource};
pub use table::{estimate_price, StaticPriceTable, DEFAULT_PRICE};
