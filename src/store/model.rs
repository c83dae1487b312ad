//! Persistent data model: waitlist, service areas, onboarding submissions,
//! and the post-conversion CRM skeleton.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Shared value types ──────────────────────────────────────────────

/// Service cadence tier. Maps to a base monthly price in the pricing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceFrequency {
    Weekly,
    BiWeekly,
    TwiceWeekly,
}

impl ServiceFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::BiWeekly => "bi-weekly",
            Self::TwiceWeekly => "twice-weekly",
        }
    }

    /// Parse a wire/DB string. Accepts both "biweekly" and "bi-weekly"
    /// (existing client forms use both spellings).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "weekly" | "once-weekly" => Some(Self::Weekly),
            "bi-weekly" | "biweekly" | "every-other-week" => Some(Self::BiWeekly),
            "twice-weekly" | "twice-a-week" => Some(Self::TwiceWeekly),
            _ => None,
        }
    }

    /// Assumed visits per month, used to derive a per-visit price from a
    /// monthly figure.
    pub fn visits_per_month(&self) -> u32 {
        match self {
            Self::Weekly => 4,
            Self::BiWeekly => 2,
            Self::TwiceWeekly => 8,
        }
    }
}

impl std::fmt::Display for ServiceFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of dogs on the property. The wire form is a string including
/// "4+", so this is a closed enum rather than an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DogCount {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4+")]
    FourPlus,
}

impl DogCount {
    /// Numeric count used for pricing. "4+" prices as four dogs.
    pub fn count(&self) -> u32 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
            Self::FourPlus => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::One => "1",
            Self::Two => "2",
            Self::Three => "3",
            Self::FourPlus => "4+",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "1" => Some(Self::One),
            "2" => Some(Self::Two),
            "3" => Some(Self::Three),
            "4+" | "4" => Some(Self::FourPlus),
            _ => None,
        }
    }
}

impl std::fmt::Display for DogCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How long since the yard was last cleaned. Feeds the remote price lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LastCleaned {
    OneWeek,
    TwoWeeks,
    OneMonth,
    OverAMonth,
    Never,
}

impl LastCleaned {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneWeek => "one-week",
            Self::TwoWeeks => "two-weeks",
            Self::OneMonth => "one-month",
            Self::OverAMonth => "over-a-month",
            Self::Never => "never",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "one-week" | "1-week" => Some(Self::OneWeek),
            "two-weeks" | "2-weeks" => Some(Self::TwoWeeks),
            "one-month" | "1-month" => Some(Self::OneMonth),
            "over-a-month" | "longer" => Some(Self::OverAMonth),
            "never" => Some(Self::Never),
            _ => None,
        }
    }
}

// ── Waitlist ────────────────────────────────────────────────────────

/// Lifecycle status of a waitlist entry. Only admins transition it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitlistStatus {
    Active,
    Archived,
    Deleted,
}

/// A lead captured before service is available in their area.
///
/// Created once on form submit; mutated only by admin archive/delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitlistSubmission {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub address: String,
    pub zip_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub dog_count: DogCount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral_source: Option<String>,
    /// How urgently the prospect wants service ("asap", "this-month", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_cleaned: Option<LastCleaned>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_plan: Option<ServiceFrequency>,
    pub sms_opt_in: bool,
    pub status: WaitlistStatus,
    pub created_at: DateTime<Utc>,
}

/// Fields accepted from the public waitlist form.
#[derive(Debug, Clone, Deserialize)]
pub struct NewWaitlistSubmission {
    pub name: String,
    pub email: String,
    pub address: String,
    pub zip_code: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub dog_count: DogCount,
    #[serde(default)]
    pub referral_source: Option<String>,
    #[serde(default)]
    pub urgency: Option<String>,
    #[serde(default)]
    pub last_cleaned: Option<LastCleaned>,
    #[serde(default)]
    pub preferred_plan: Option<ServiceFrequency>,
    #[serde(default)]
    pub sms_opt_in: bool,
}

impl WaitlistSubmission {
    pub fn new(form: NewWaitlistSubmission) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: form.name,
            email: form.email,
            address: form.address,
            zip_code: form.zip_code,
            phone: form.phone,
            dog_count: form.dog_count,
            referral_source: form.referral_source,
            urgency: form.urgency,
            last_cleaned: form.last_cleaned,
            preferred_plan: form.preferred_plan,
            sms_opt_in: form.sms_opt_in,
            status: WaitlistStatus::Active,
            created_at: Utc::now(),
        }
    }
}

// ── Service locations ───────────────────────────────────────────────

/// An admin-defined geography determining whether the business currently
/// serves an address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceLocation {
    pub id: Uuid,
    pub city: String,
    pub state: String,
    pub zip_codes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_date: Option<NaiveDate>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields accepted from the admin location form.
#[derive(Debug, Clone, Deserialize)]
pub struct NewServiceLocation {
    pub city: String,
    pub state: String,
    pub zip_codes: Vec<String>,
    #[serde(default)]
    pub launch_date: Option<NaiveDate>,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl ServiceLocation {
    pub fn new(form: NewServiceLocation) -> Self {
        Self {
            id: Uuid::new_v4(),
            city: form.city,
            state: form.state,
            zip_codes: form.zip_codes,
            launch_date: form.launch_date,
            active: form.active,
            created_at: Utc::now(),
        }
    }
}

// ── Onboarding submissions ──────────────────────────────────────────

/// Lifecycle of an onboarding submission. Never deleted, only transitioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Created at quote time, nothing external has run yet.
    New,
    /// Orchestration succeeded up to the hosted-checkout redirect; awaiting
    /// the out-of-band webhook confirmation.
    Pending,
    Completed,
    Failed,
}

/// Full intake record for a prospective or converting customer, including
/// linkage fields to Sweep&Go and Stripe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingSubmission {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub zip_code: String,
    pub dog_count: DogCount,
    pub service_frequency: ServiceFrequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_cleaned: Option<LastCleaned>,
    /// Text the customer on the way to a visit.
    pub notify_on_the_way: bool,
    /// Text the customer when a visit is completed.
    pub notify_on_completion: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community_access_notes: Option<String>,
    #[serde(default)]
    pub dog_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    /// Server-computed monthly price at quote time, if resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoted_monthly: Option<Decimal>,
    /// Sweep&Go client id once onboarded there.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sweepandgo_client_id: Option<String>,
    /// Raw Sweep&Go response payload, kept for admin diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sweepandgo_payload: Option<serde_json::Value>,
    /// Auth account id created (or found) during orchestration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe_session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
    pub status: SubmissionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ── CRM skeleton ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Paused,
    Canceled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    Scheduled,
    Completed,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeStatus {
    Pending,
    Succeeded,
    Failed,
}

/// A converted customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe_customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A customer's recurring service plan. A customer has zero or one active
/// subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub frequency: ServiceFrequency,
    pub dog_count: DogCount,
    pub status: SubscriptionStatus,
    pub created_at: DateTime<Utc>,
}

/// A single scheduled yard visit under a subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Visit {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub scheduled_for: NaiveDate,
    pub status: VisitStatus,
}

/// A billing event mirrored from the payment processor.
///
/// Consistency with the processor is eventual: charges are written by the
/// inbound webhook and the admin migration path, never reconciled by a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Charge {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub status: ChargeStatus,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_parses_both_biweekly_spellings() {
        assert_eq!(
            ServiceFrequency::parse("biweekly"),
            Some(ServiceFrequency::BiWeekly)
        );
        assert_eq!(
            ServiceFrequency::parse("bi-weekly"),
            Some(ServiceFrequency::BiWeekly)
        );
        assert_eq!(ServiceFrequency::parse("monthly"), None);
    }

    #[test]
    fn frequency_display_matches_serde() {
        for freq in [
            ServiceFrequency::Weekly,
            ServiceFrequency::BiWeekly,
            ServiceFrequency::TwiceWeekly,
        ] {
            let json = serde_json::to_string(&freq).unwrap();
            assert_eq!(json, format!("\"{freq}\""));
            assert_eq!(ServiceFrequency::parse(freq.as_str()), Some(freq));
        }
    }

    #[test]
    fn dog_count_keeps_four_plus_wire_form() {
        let json = serde_json::to_string(&DogCount::FourPlus).unwrap();
        assert_eq!(json, "\"4+\"");
        let parsed: DogCount = serde_json::from_str("\"4+\"").unwrap();
        assert_eq!(parsed, DogCount::FourPlus);
        assert_eq!(parsed.count(), 4);
    }

    #[test]
    fn dog_count_rejects_garbage() {
        assert_eq!(DogCount::parse("five"), None);
        assert_eq!(DogCount::parse(""), None);
    }

    #[test]
    fn visits_per_month() {
        assert_eq!(ServiceFrequency::Weekly.visits_per_month(), 4);
        assert_eq!(ServiceFrequency::TwiceWeekly.visits_per_month(), 8);
        assert_eq!(ServiceFrequency::BiWeekly.visits_per_month(), 2);
    }
}
