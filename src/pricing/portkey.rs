//! Portkey pricing API client.
//!
//! `GET {base}/{provider}/{model}` returns prices in US cents per token:
//!
//! ```text
//! {"pay_as_you_go": {"request_token": {"price": 0.00025},
//!                    "response_token": {"price": 0.001}},
//!  "currency": "USD"}
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{info, warn};

use super::{ModelPrice, PriceLookup, PriceSource};

pub const DEFAULT_PORTKEY_URL: &str = "https://api.portkey.ai/model-configs/pricing";

/// HTTP price source backed by Portkey.
#[derive(Debug, Clone)]
pub struct PortkeyPricing {
    client: Client,
    base_url: String,
}

impl PortkeyPricing {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for PortkeyPricing {
    fn default() -> Self {
        Self::new(DEFAULT_PORTKEY_URL)
    }
}

#[derive(Debug, Deserialize)]
struct PricingBody {
    #[serde(default)]
    pay_as_you_go: Option<PayAsYouGo>,
    #[serde(default)]
    pricing_config: Option<Box<PricingBody>>,
}

#[derive(Debug, Deserialize)]
struct PayAsYouGo {
    request_token: Option<TokenPrice>,
    response_token: Option<TokenPrice>,
}

#[derive(Debug, Deserialize)]
struct TokenPrice {
    #[serde(default)]
    price: f64,
}

/// Cents per token -> USD per million tokens.
const CENTS_PER_TOKEN_TO_USD_PER_MILLION: f64 = 1_000_000.0 / 100.0;

/// Extract prices from a Portkey pricing body.
///
/// Accepts the config either at the top level or nested under
/// `pricing_config`. Returns `None` when no token price is present.
fn parse_pricing(body: &str) -> Option<ModelPrice> {
    let parsed: PricingBody = serde_json::from_str(body).ok()?;
    let payg = match parsed.pay_as_you_go {
        Some(payg) => payg,
        None => parsed.pricing_config?.pay_as_you_go?,
    };
    if payg.request_token.is_none() && payg.response_token.is_none() {
        return None;
    }
    let input = payg.request_token.map(|p| p.price).unwrap_or(0.0);
    let output = payg.response_token.map(|p| p.price).unwrap_or(0.0);
    Some(ModelPrice::new(
        input * CENTS_PER_TOKEN_TO_USD_PER_MILLION,
        output * CENTS_PER_TOKEN_TO_USD_PER_MILLION,
    ))
}

#[async_trait]
impl PriceSource for PortkeyPricing {
    async fn lookup(&self, provider: &str, model: &str) -> PriceLookup {
        let url = format!("{}/{}/{}", self.base_url, provider, model);

        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Pricing lookup for {}/{} failed: {}", provider, model, e);
                return PriceLookup::Unknown;
            }
        };

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                warn!("Pricing not found for {}/{}", provider, model);
                return PriceLookup::Unknown;
            }
            status => {
                warn!("Pricing lookup for {}/{} returned {}", provider, model, status);
                return PriceLookup::Unknown;
            }
        }

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                warn!("Failed to read pricing body for {}/{}: {}", provider, model, e);
                return PriceLookup::Unknown;
            }
        };

        match parse_pricing(&body) {
            Some(price) => {
                info!("Fetched pricing for {}/{}", provider, model);
                PriceLookup::Known(price)
            }
            None => {
                warn!("Malformed pricing body for {}/{}", provider, model);
                PriceLookup::Unknown
            }
        }
    }
}
