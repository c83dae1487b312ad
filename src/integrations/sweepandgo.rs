//! Sweep&Go field-service API client: price estimates, client onboarding,
//! and inbound webhook event types.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::info;

use crate::config::SweepAndGoConfig;
use crate::error::IntegrationError;
use crate::pricing::{QuoteRequest, RemotePricing};
use crate::store::model::OnboardingSubmission;

const SERVICE: &str = "sweepandgo";

/// Budget for a single Sweep&Go round-trip.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(6);

/// Sweep&Go API client.
pub struct SweepAndGoClient {
    config: SweepAndGoConfig,
    client: reqwest::Client,
}

impl SweepAndGoClient {
    pub fn new(config: SweepAndGoConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/organizations/{}/{path}",
            self.config.base_url, self.config.organization_slug
        )
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.config.api_token.expose_secret())
    }

    /// Connectivity probe for the admin diagnostics endpoint.
    pub async fn probe(&self) -> Result<serde_json::Value, IntegrationError> {
        let resp = self
            .client
            .get(format!(
                "{}/organizations/{}",
                self.config.base_url, self.config.organization_slug
            ))
            .header(AUTHORIZATION, self.bearer())
            .send()
            .await
            .map_err(|e| request_failed(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(IntegrationError::AuthFailed {
                service: SERVICE.into(),
            });
        }
        if !resp.status().is_success() {
            return Err(request_failed(format!("status {}", resp.status())));
        }

        resp.json()
            .await
            .map_err(|e| invalid_response(e.to_string()))
    }

    /// Submit a converting customer to Sweep&Go. Returns the created client
    /// id plus the raw payload (kept on the submission for diagnostics).
    pub async fn onboard_client(
        &self,
        submission: &OnboardingSubmission,
    ) -> Result<OnboardedClient, IntegrationError> {
        let body = serde_json::json!({
            "first_name": submission.first_name,
            "last_name": submission.last_name,
            "email": submission.email,
            "phone": submission.phone,
            "address": submission.address,
            "city": submission.city,
            "zip_code": submission.zip_code,
            "number_of_dogs": submission.dog_count.as_str(),
            "frequency": submission.service_frequency.as_str(),
            "last_cleaned": submission.last_cleaned.map(|l| l.as_str()),
            "gate_code": submission.gate_code,
            "community_access_notes": submission.community_access_notes,
            "dog_names": submission.dog_names,
            "notify_on_the_way": submission.notify_on_the_way,
            "notify_on_completion": submission.notify_on_completion,
        });

        let resp = self
            .client
            .post(self.api_url("clients"))
            .header(AUTHORIZATION, self.bearer())
            .json(&body)
            .send()
            .await
            .map_err(|e| request_failed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(request_failed(format!("status {status}: {detail}")));
        }

        let payload: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| invalid_response(e.to_string()))?;
        let client_id = payload
            .get("client_id")
            .or_else(|| payload.get("id"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| invalid_response("missing client id".into()))?;

        info!(client_id = %client_id, email = %submission.email, "Sweep&Go client onboarded");
        Ok(OnboardedClient { client_id, payload })
    }
}

/// Result of onboarding a client into Sweep&Go.
#[derive(Debug, Clone)]
pub struct OnboardedClient {
    pub client_id: String,
    pub payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct PriceEstimateResponse {
    /// Monthly estimate as a string, e.g. "110.00" or "$110.00".
    estimated_price: Option<String>,
}

#[async_trait]
impl RemotePricing for SweepAndGoClient {
    async fn monthly_estimate(
        &self,
        request: &QuoteRequest,
    ) -> Result<Option<Decimal>, IntegrationError> {
        let body = serde_json::json!({
            "zip_code": request.zip_code,
            "number_of_dogs": request.dog_count.as_str(),
            "frequency": request.service_frequency.as_str(),
            "last_cleaned": request.last_cleaned.map(|l| l.as_str()),
        });

        let resp = self
            .client
            .post(self.api_url("price_estimate"))
            .header(AUTHORIZATION, self.bearer())
            .json(&body)
            .send()
            .await
            .map_err(|e| request_failed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(request_failed(format!("status {}", resp.status())));
        }

        let estimate: PriceEstimateResponse = resp
            .json()
            .await
            .map_err(|e| invalid_response(e.to_string()))?;

        match estimate.estimated_price {
            Some(raw) => parse_price(&raw).map(Some),
            None => Ok(None),
        }
    }
}

/// Parse a price string off the wire, tolerating a leading "$".
fn parse_price(raw: &str) -> Result<Decimal, IntegrationError> {
    raw.trim()
        .trim_start_matches('$')
        .parse::<Decimal>()
        .map_err(|_| invalid_response(format!("unparseable price {raw:?}")))
}

fn request_failed(reason: String) -> IntegrationError {
    IntegrationError::RequestFailed {
        service: SERVICE.into(),
        reason,
    }
}

fn invalid_response(reason: String) -> IntegrationError {
    IntegrationError::InvalidResponse {
        service: SERVICE.into(),
        reason,
    }
}

// ── Inbound webhook events ──────────────────────────────────────────

/// An event POSTed to `/api/webhooks/sweepandgo` by the SaaS (trusted
/// network assumption; no signature verification on this hook).
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// Event name, e.g. "client.activated", "client.rejected",
    /// "charge.succeeded".
    pub event: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn price_parsing_tolerates_dollar_sign() {
        assert_eq!(parse_price("110.00").unwrap(), dec!(110.00));
        assert_eq!(parse_price(" $136.50 ").unwrap(), dec!(136.50));
        assert!(parse_price("tbd").is_err());
    }

    #[test]
    fn webhook_event_deserializes_sparse_payloads() {
        let event: WebhookEvent =
            serde_json::from_str(r#"{"event":"client.activated","client_id":"cl_9"}"#).unwrap();
        assert_eq!(event.event, "client.activated");
        assert_eq!(event.client_id.as_deref(), Some("cl_9"));
        assert!(event.amount.is_none());
    }
}
