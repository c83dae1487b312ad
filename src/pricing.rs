//! Quote Calculator: one authoritative pricing policy, reconciled with the
//! remote Sweep&Go estimate when that integration is configured.
//!
//! The remote value is preferred when present; any remote failure (error,
//! timeout, missing credentials) falls back to the local flat-rate table.
//! A quote request never hard-fails on pricing-service unavailability.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::IntegrationError;
use crate::store::model::{DogCount, LastCleaned, ServiceFrequency};

/// Shown when no price could be resolved at all.
pub const PRICE_TBD: &str = "Price TBD";

/// The single authoritative price table. Every quote path references this;
/// landing-page variants must not carry their own numbers.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PricingPolicy {
    pub version: u32,
    pub weekly_monthly: Decimal,
    pub biweekly_monthly: Decimal,
    pub twice_weekly_monthly: Decimal,
    /// Flat monthly charge per dog beyond the first.
    pub extra_dog_monthly: Decimal,
}

/// Policy v1: monthly bases weekly $110 / bi-weekly $90 / twice-weekly $136,
/// extra dogs $20/month each.
pub const CURRENT_POLICY: PricingPolicy = PricingPolicy {
    version: 1,
    weekly_monthly: dec!(110),
    biweekly_monthly: dec!(90),
    twice_weekly_monthly: dec!(136),
    extra_dog_monthly: dec!(20),
};

impl PricingPolicy {
    /// Base monthly price for a single dog on the given plan.
    pub fn monthly_base(&self, frequency: ServiceFrequency) -> Decimal {
        match frequency {
            ServiceFrequency::Weekly => self.weekly_monthly,
            ServiceFrequency::BiWeekly => self.biweekly_monthly,
            ServiceFrequency::TwiceWeekly => self.twice_weekly_monthly,
        }
    }

    /// Local fallback price: `base + (dogs - 1) * extra_dog_monthly`.
    ///
    /// Pure and deterministic; usable whenever remote pricing is down.
    pub fn monthly_price(&self, frequency: ServiceFrequency, dogs: DogCount) -> Decimal {
        let extra = Decimal::from(dogs.count().saturating_sub(1)) * self.extra_dog_monthly;
        self.monthly_base(frequency) + extra
    }

    /// Derive a per-visit price from a monthly figure by the plan's assumed
    /// visit count.
    pub fn per_visit(&self, frequency: ServiceFrequency, monthly: Decimal) -> Decimal {
        (monthly / Decimal::from(frequency.visits_per_month())).round_dp(2)
    }
}

/// What a prospect asks to have priced.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteRequest {
    pub zip_code: String,
    pub dog_count: DogCount,
    pub service_frequency: ServiceFrequency,
    #[serde(default)]
    pub last_cleaned: Option<LastCleaned>,
}

/// Which pricing path produced the displayed number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteSource {
    Remote,
    LocalFallback,
}

/// A resolved price estimate.
#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_visit: Option<Decimal>,
    pub display: String,
    pub source: QuoteSource,
    pub policy_version: u32,
}

impl Quote {
    fn from_monthly(
        monthly: Decimal,
        frequency: ServiceFrequency,
        source: QuoteSource,
        policy: &PricingPolicy,
    ) -> Self {
        let monthly = monthly.round_dp(2);
        Self {
            monthly: Some(monthly),
            per_visit: Some(policy.per_visit(frequency, monthly)),
            display: format_monthly(Some(monthly)),
            source,
            policy_version: policy.version,
        }
    }
}

/// Format a monthly price for display, or `PRICE_TBD` when unresolved.
pub fn format_monthly(monthly: Option<Decimal>) -> String {
    match monthly {
        Some(m) => format!("${:.2}/month", m.round_dp(2)),
        None => PRICE_TBD.to_string(),
    }
}

/// Remote price lookup seam. Implemented by the Sweep&Go client; stubbed in
/// tests.
#[async_trait]
pub trait RemotePricing: Send + Sync {
    /// Monthly estimate for the request, or `None` when the remote side has
    /// no price for this combination.
    async fn monthly_estimate(
        &self,
        request: &QuoteRequest,
    ) -> Result<Option<Decimal>, IntegrationError>;
}

/// Combines the local policy with the optional remote lookup.
pub struct QuoteCalculator {
    policy: PricingPolicy,
    remote: Option<Arc<dyn RemotePricing>>,
}

impl QuoteCalculator {
    pub fn new(policy: PricingPolicy, remote: Option<Arc<dyn RemotePricing>>) -> Self {
        Self { policy, remote }
    }

    pub fn policy(&self) -> &PricingPolicy {
        &self.policy
    }

    /// Resolve a quote. Remote preferred; local table on any remote miss.
    pub async fn quote(&self, request: &QuoteRequest) -> Quote {
        if let Some(remote) = &self.remote {
            match remote.monthly_estimate(request).await {
                Ok(Some(monthly)) => {
                    return Quote::from_monthly(
                        monthly,
                        request.service_frequency,
                        QuoteSource::Remote,
                        &self.policy,
                    );
                }
                Ok(None) => {
                    warn!(zip = %request.zip_code, "Remote pricing returned no estimate, using local table");
                }
                Err(e) => {
                    warn!(error = %e, zip = %request.zip_code, "Remote pricing failed, using local table");
                }
            }
        }

        let monthly = self
            .policy
            .monthly_price(request.service_frequency, request.dog_count);
        Quote::from_monthly(
            monthly,
            request.service_frequency,
            QuoteSource::LocalFallback,
            &self.policy,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(dogs: DogCount, frequency: ServiceFrequency) -> QuoteRequest {
        QuoteRequest {
            zip_code: "32097".into(),
            dog_count: dogs,
            service_frequency: frequency,
            last_cleaned: None,
        }
    }

    struct FixedRemote(Decimal);

    #[async_trait]
    impl RemotePricing for FixedRemote {
        async fn monthly_estimate(
            &self,
            _request: &QuoteRequest,
        ) -> Result<Option<Decimal>, IntegrationError> {
            Ok(Some(self.0))
        }
    }

    struct FailingRemote;

    #[async_trait]
    impl RemotePricing for FailingRemote {
        async fn monthly_estimate(
            &self,
            _request: &QuoteRequest,
        ) -> Result<Option<Decimal>, IntegrationError> {
            Err(IntegrationError::RequestFailed {
                service: "sweepandgo".into(),
                reason: "connection refused".into(),
            })
        }
    }

    #[test]
    fn local_table_matches_policy() {
        let p = CURRENT_POLICY;
        assert_eq!(p.monthly_price(ServiceFrequency::Weekly, DogCount::One), dec!(110));
        assert_eq!(p.monthly_price(ServiceFrequency::BiWeekly, DogCount::One), dec!(90));
        assert_eq!(
            p.monthly_price(ServiceFrequency::TwiceWeekly, DogCount::One),
            dec!(136)
        );
    }

    #[test]
    fn extra_dogs_add_twenty_per_month() {
        let p = CURRENT_POLICY;
        assert_eq!(p.monthly_price(ServiceFrequency::Weekly, DogCount::Two), dec!(130));
        assert_eq!(p.monthly_price(ServiceFrequency::Weekly, DogCount::Three), dec!(150));
        assert_eq!(
            p.monthly_price(ServiceFrequency::Weekly, DogCount::FourPlus),
            dec!(170)
        );
    }

    #[test]
    fn per_visit_derivation_uses_assumed_visit_counts() {
        let p = CURRENT_POLICY;
        assert_eq!(p.per_visit(ServiceFrequency::Weekly, dec!(110)), dec!(27.50));
        assert_eq!(p.per_visit(ServiceFrequency::TwiceWeekly, dec!(136)), dec!(17));
        assert_eq!(p.per_visit(ServiceFrequency::BiWeekly, dec!(90)), dec!(45));
    }

    #[test]
    fn display_formats_or_tbd() {
        assert_eq!(format_monthly(Some(dec!(110))), "$110.00/month");
        assert_eq!(format_monthly(None), PRICE_TBD);
    }

    #[tokio::test]
    async fn remote_value_preferred_when_present() {
        let calc = QuoteCalculator::new(
            CURRENT_POLICY,
            Some(Arc::new(FixedRemote(dec!(123.45)))),
        );
        let quote = calc.quote(&request(DogCount::One, ServiceFrequency::Weekly)).await;
        assert_eq!(quote.source, QuoteSource::Remote);
        assert_eq!(quote.monthly, Some(dec!(123.45)));
        assert_eq!(quote.per_visit, Some(dec!(30.86)));
    }

    #[tokio::test]
    async fn remote_failure_falls_back_to_local() {
        let calc = QuoteCalculator::new(CURRENT_POLICY, Some(Arc::new(FailingRemote)));
        let quote = calc.quote(&request(DogCount::Two, ServiceFrequency::BiWeekly)).await;
        assert_eq!(quote.source, QuoteSource::LocalFallback);
        assert_eq!(quote.monthly, Some(dec!(110)));
        assert_eq!(quote.policy_version, 1);
    }

    #[tokio::test]
    async fn unconfigured_remote_uses_local() {
        let calc = QuoteCalculator::new(CURRENT_POLICY, None);
        let quote = calc.quote(&request(DogCount::One, ServiceFrequency::Weekly)).await;
        assert_eq!(quote.source, QuoteSource::LocalFallback);
        assert!(quote.monthly.unwrap() > Decimal::ZERO);
        assert_eq!(quote.display, "$110.00/month");
    }
}
