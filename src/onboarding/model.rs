//! Onboarding request payloads.

use chrono::Utc;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::OnboardingError;
use crate::locations;
use crate::store::model::{
    DogCount, LastCleaned, OnboardingSubmission, ServiceFrequency, SubmissionStatus,
};

/// Minimum cardholder-name length before submission is allowed.
const MIN_CARDHOLDER_NAME: usize = 2;

/// The combined customer + plan + payment payload POSTed to create a hosted
/// checkout session.
#[derive(Clone, Deserialize)]
pub struct OnboardingRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Password for the auth account. Never logged.
    pub password: SecretString,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub zip_code: String,
    pub dog_count: DogCount,
    pub service_frequency: ServiceFrequency,
    #[serde(default)]
    pub last_cleaned: Option<LastCleaned>,
    #[serde(default)]
    pub notify_on_the_way: bool,
    #[serde(default)]
    pub notify_on_completion: bool,
    #[serde(default)]
    pub gate_code: Option<String>,
    #[serde(default)]
    pub community_access_notes: Option<String>,
    #[serde(default)]
    pub dog_names: Vec<String>,
    #[serde(default)]
    pub coupon_code: Option<String>,
    /// Opaque payment-method token captured client-side. Its presence is the
    /// completed-capture guard for entering Processing.
    pub payment_method_token: String,
    pub cardholder_name: String,
}

impl OnboardingRequest {
    /// Field-level validation. Runs before any external call is made.
    pub fn validate(&self) -> Result<(), OnboardingError> {
        let mut problems = Vec::new();

        if self.first_name.trim().is_empty() {
            problems.push("first_name is required");
        }
        if self.last_name.trim().is_empty() {
            problems.push("last_name is required");
        }
        if self.email.trim().is_empty() || !self.email.contains('@') {
            problems.push("a valid email is required");
        }
        if self.phone.trim().is_empty() {
            problems.push("phone is required");
        }
        if self.address.trim().is_empty() {
            problems.push("address is required");
        }
        if !locations::is_well_formed(self.zip_code.trim()) {
            problems.push("zip_code must be 5 digits");
        }
        if self.payment_method_token.trim().is_empty() {
            problems.push("payment method is incomplete");
        }
        if self.cardholder_name.trim().len() < MIN_CARDHOLDER_NAME {
            problems.push("cardholder_name is too short");
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(OnboardingError::Validation(problems.join("; ")))
        }
    }

    /// Build the persistent submission record, status `new`.
    pub fn into_submission(&self, quoted_monthly: Option<Decimal>) -> OnboardingSubmission {
        let now = Utc::now();
        OnboardingSubmission {
            id: Uuid::new_v4(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_ascii_lowercase(),
            phone: self.phone.trim().to_string(),
            address: self.address.trim().to_string(),
            city: self.city.trim().to_string(),
            zip_code: self.zip_code.trim().to_string(),
            dog_count: self.dog_count,
            service_frequency: self.service_frequency,
            last_cleaned: self.last_cleaned,
            notify_on_the_way: self.notify_on_the_way,
            notify_on_completion: self.notify_on_completion,
            gate_code: self.gate_code.clone(),
            community_access_notes: self.community_access_notes.clone(),
            dog_names: self.dog_names.clone(),
            coupon_code: self
                .coupon_code
                .as_ref()
                .map(|c| c.trim().to_ascii_uppercase()),
            quoted_monthly,
            sweepandgo_client_id: None,
            sweepandgo_payload: None,
            auth_account_id: None,
            stripe_session_id: None,
            checkout_url: None,
            status: SubmissionStatus::New,
            created_at: now,
            updated_at: now,
        }
    }
}

impl std::fmt::Debug for OnboardingRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnboardingRequest")
            .field("email", &self.email)
            .field("zip_code", &self.zip_code)
            .field("dog_count", &self.dog_count)
            .field("service_frequency", &self.service_frequency)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub fn sample_request_for_tests() -> OnboardingRequest {
    OnboardingRequest {
        first_name: "Jordan".into(),
        last_name: "Reyes".into(),
        email: "jordan@example.com".into(),
        password: SecretString::from("hunter2hunter2"),
        phone: "904-555-0101".into(),
        address: "12 Fernandina Ct".into(),
        city: "Yulee".into(),
        zip_code: "32097".into(),
        dog_count: DogCount::One,
        service_frequency: ServiceFrequency::Weekly,
        last_cleaned: Some(LastCleaned::OneMonth),
        notify_on_the_way: true,
        notify_on_completion: true,
        gate_code: Some("1234".into()),
        community_access_notes: None,
        dog_names: vec!["Biscuit".into()],
        coupon_code: None,
        payment_method_token: "pm_test_token".into(),
        cardholder_name: "Jordan Reyes".into(),
    }
}

#[cfg(test)]
pub fn sample_submission_for_tests() -> OnboardingSubmission {
    sample_request_for_tests().into_submission(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_request_passes() {
        assert!(sample_request_for_tests().validate().is_ok());
    }

    #[test]
    fn missing_payment_token_blocks_submission() {
        let mut req = sample_request_for_tests();
        req.payment_method_token = "  ".into();
        let err = req.validate().unwrap_err();
        assert!(err.to_string().contains("payment method"));
    }

    #[test]
    fn short_cardholder_name_blocks_submission() {
        let mut req = sample_request_for_tests();
        req.cardholder_name = "J".into();
        assert!(req.validate().is_err());
    }

    #[test]
    fn bad_zip_is_a_field_error() {
        let mut req = sample_request_for_tests();
        req.zip_code = "3209".into();
        let err = req.validate().unwrap_err();
        assert!(err.to_string().contains("zip_code"));
    }

    #[test]
    fn submission_normalizes_email_and_coupon() {
        let mut req = sample_request_for_tests();
        req.email = " Jordan@Example.COM ".into();
        req.coupon_code = Some("save10".into());
        let submission = req.into_submission(None);
        assert_eq!(submission.email, "jordan@example.com");
        assert_eq!(submission.coupon_code.as_deref(), Some("SAVE10"));
        assert_eq!(submission.status, SubmissionStatus::New);
    }

    #[test]
    fn debug_omits_password_and_payment_token() {
        let req = sample_request_for_tests();
        let debug = format!("{req:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("pm_test_token"));
    }
}
