//! Stripe client: hosted checkout-session creation.
//!
//! The session amount is always the server-recomputed one handed over by
//! the orchestrator; this client never sees client-supplied totals.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::info;

use crate::config::StripeConfig;
use crate::error::IntegrationError;
use crate::onboarding::{CheckoutProvider, CheckoutSession, CheckoutSessionRequest};

const SERVICE: &str = "stripe";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Stripe API client.
pub struct StripeClient {
    config: StripeConfig,
    client: reqwest::Client,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { config, client }
    }
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: String,
}

/// Convert a dollar amount to Stripe's integer cents.
fn to_cents(amount: Decimal) -> Result<i64, IntegrationError> {
    (amount * dec!(100))
        .round()
        .to_i64()
        .ok_or_else(|| IntegrationError::InvalidResponse {
            service: SERVICE.into(),
            reason: format!("amount {amount} out of range"),
        })
}

#[async_trait]
impl CheckoutProvider for StripeClient {
    async fn create_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, IntegrationError> {
        let cents = to_cents(request.monthly_amount)?;
        let submission_id = request.submission_id.to_string();

        // Stripe's API is form-encoded with bracketed nested keys.
        let form: Vec<(&str, String)> = vec![
            ("mode", "subscription".into()),
            ("customer_email", request.email.clone()),
            ("success_url", self.config.success_url.clone()),
            ("cancel_url", self.config.cancel_url.clone()),
            ("client_reference_id", submission_id),
            ("line_items[0][quantity]", "1".into()),
            ("line_items[0][price_data][currency]", "usd".into()),
            (
                "line_items[0][price_data][unit_amount]",
                cents.to_string(),
            ),
            (
                "line_items[0][price_data][recurring][interval]",
                "month".into(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                request.description.clone(),
            ),
            (
                "metadata[payment_method_token]",
                request.payment_method_token.clone(),
            ),
        ];

        let resp = self
            .client
            .post(format!("{}/checkout/sessions", self.config.base_url))
            .basic_auth(self.config.secret_key.expose_secret(), None::<&str>)
            .form(&form)
            .send()
            .await
            .map_err(|e| IntegrationError::RequestFailed {
                service: SERVICE.into(),
                reason: e.to_string(),
            })?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(IntegrationError::AuthFailed {
                service: SERVICE.into(),
            });
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(IntegrationError::RequestFailed {
                service: SERVICE.into(),
                reason: format!("status {status}: {detail}"),
            });
        }

        let session: SessionResponse =
            resp.json()
                .await
                .map_err(|e| IntegrationError::InvalidResponse {
                    service: SERVICE.into(),
                    reason: e.to_string(),
                })?;

        info!(session_id = %session.id, "Stripe checkout session created");
        Ok(CheckoutSession {
            id: session.id,
            url: session.url,
        })
    }
}

/// Stand-in used when `STRIPE_SECRET_KEY` is absent: every attempt reports a
/// structured not-configured failure instead of reaching the network.
pub struct UnconfiguredCheckout;

#[async_trait]
impl CheckoutProvider for UnconfiguredCheckout {
    async fn create_session(
        &self,
        _request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, IntegrationError> {
        Err(IntegrationError::NotConfigured {
            service: SERVICE.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cents_conversion_rounds_to_whole_cents() {
        assert_eq!(to_cents(dec!(110)).unwrap(), 11000);
        assert_eq!(to_cents(dec!(99.005)).unwrap(), 9900);
        assert_eq!(to_cents(dec!(0)).unwrap(), 0);
    }

    #[tokio::test]
    async fn unconfigured_checkout_is_a_structured_failure() {
        let err = UnconfiguredCheckout
            .create_session(&CheckoutSessionRequest {
                submission_id: uuid::Uuid::new_v4(),
                email: "x@example.com".into(),
                monthly_amount: dec!(110),
                description: "weekly".into(),
                payment_method_token: "pm".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, IntegrationError::NotConfigured { .. }));
    }
}
