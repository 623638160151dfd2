//! Hosted payment page hand-off.
//!
//! Checkout creates a fixed-price charge on the commerce API and sends the
//! buyer to its hosted payment page. The charge is created after the stock
//! commit; payment reconciliation happens out of band on the provider side.

use cardvault_core::Price;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::config::PaymentConfig;

/// Commerce API version date.
const API_VERSION: &str = "2018-03-22";

/// Charge creation endpoint.
const CHARGES_URL: &str = "https://api.commerce.coinbase.com/charges";

/// Metadata `source` tag on every charge.
const CHARGE_SOURCE: &str = "CardVault Web";

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("commerce API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("commerce API returned an invalid hosted URL: {0}")]
    BadHostedUrl(String),

    #[error("invalid API key format: {0}")]
    BadKey(String),
}

#[derive(Serialize)]
struct ChargeRequest<'a> {
    name: &'a str,
    description: &'a str,
    pricing_type: &'static str,
    local_price: LocalPrice,
    metadata: ChargeMetadata,
    redirect_url: &'a str,
    cancel_url: &'a str,
}

#[derive(Serialize)]
struct LocalPrice {
    /// The commerce API wants a decimal string, not a JSON number.
    amount: String,
    currency: &'static str,
}

impl From<Price> for LocalPrice {
    fn from(price: Price) -> Self {
        Self {
            amount: format!("{:.2}", price.amount),
            currency: price.currency_code.code(),
        }
    }
}

/// Reconciliation tags stored on the charge.
#[derive(Serialize)]
struct ChargeMetadata {
    source: &'static str,
    total: String,
}

#[derive(Deserialize)]
struct ChargeResponse {
    data: ChargeData,
}

#[derive(Deserialize)]
struct ChargeData {
    hosted_url: String,
}

/// Client for the hosted commerce API.
#[derive(Debug, Clone)]
pub struct PaymentClient {
    client: reqwest::Client,
    redirect_url: Url,
}

impl PaymentClient {
    /// Build a client with the API key baked into default headers.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError` if the key is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(config: &PaymentConfig) -> Result<Self, PaymentError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(config.api_key.expose_secret())
            .map_err(|e| PaymentError::BadKey(e.to_string()))?;
        headers.insert("X-CC-Api-Key", key);
        headers.insert("X-CC-Version", HeaderValue::from_static(API_VERSION));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            redirect_url: config.redirect_url.clone(),
        })
    }

    /// Create a fixed-price charge and return its hosted payment URL.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError` if the request fails or the response carries
    /// no usable hosted URL.
    #[instrument(skip(self, description))]
    pub async fn create_charge(
        &self,
        name: &str,
        description: &str,
        price: Price,
    ) -> Result<Url, PaymentError> {
        let request = ChargeRequest {
            name,
            description,
            pricing_type: "fixed_price",
            metadata: ChargeMetadata {
                source: CHARGE_SOURCE,
                total: format!("{:.2}", price.amount),
            },
            local_price: price.into(),
            redirect_url: self.redirect_url.as_str(),
            cancel_url: self.redirect_url.as_str(),
        };

        let response = self
            .client
            .post(CHARGES_URL)
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let charge: ChargeResponse = response.json().await?;
        Url::parse(&charge.data.hosted_url)
            .map_err(|_| PaymentError::BadHostedUrl(charge.data.hosted_url))
    }
}
