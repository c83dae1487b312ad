//! Account/Payment Orchestrator: sequences the external calls behind
//! checkout-session creation.
//!
//! Three independently failing systems are chained with no shared
//! transaction: auth account creation, payment-method capture (client-side;
//! represented here by the opaque token), and hosted-checkout-session
//! creation. Account creation is at-least-once and idempotent by email; a
//! checkout failure leaves the account in place and the submission
//! retryable. Every external call carries an explicit timeout budget.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::coupons;
use crate::error::{IntegrationError, OnboardingError};
use crate::onboarding::model::OnboardingRequest;
use crate::pricing::PricingPolicy;
use crate::store::Store;
use crate::store::model::{OnboardingSubmission, SubmissionStatus};

/// An auth account, created or found.
#[derive(Debug, Clone)]
pub struct AccountRef {
    pub id: String,
    /// True when the email was already registered and the account was
    /// looked up rather than created.
    pub existing: bool,
}

/// Auth-account seam. Implemented by the Supabase client; stubbed in tests.
///
/// `ensure_account` must be idempotent by email: if the address is already
/// registered, return the existing account instead of erroring.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn ensure_account(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AccountRef, IntegrationError>;
}

/// What a hosted checkout session is created from. The amount here is the
/// server-recomputed one; nothing client-supplied reaches it.
#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    pub submission_id: Uuid,
    pub email: String,
    pub monthly_amount: Decimal,
    pub description: String,
    pub payment_method_token: String,
}

/// A created hosted checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Hosted-checkout seam. Implemented by the Stripe client; stubbed in tests.
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    async fn create_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, IntegrationError>;
}

/// Per-call timeout budgets. A hung provider surfaces as a structured
/// failure instead of a hung request.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutBudgets {
    pub auth: Duration,
    pub checkout: Duration,
}

impl Default for TimeoutBudgets {
    fn default() -> Self {
        Self {
            auth: Duration::from_secs(8),
            checkout: Duration::from_secs(10),
        }
    }
}

/// Successful orchestration result: where to redirect the customer.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutOutcome {
    pub submission_id: Uuid,
    pub checkout_url: String,
    /// The amount the customer will actually be charged monthly.
    pub monthly_amount: Decimal,
}

/// Sequences account creation and checkout-session creation for a validated
/// onboarding request.
pub struct Orchestrator {
    store: Arc<dyn Store>,
    auth: Arc<dyn AuthProvider>,
    checkout: Arc<dyn CheckoutProvider>,
    policy: PricingPolicy,
    budgets: TimeoutBudgets,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn Store>,
        auth: Arc<dyn AuthProvider>,
        checkout: Arc<dyn CheckoutProvider>,
        policy: PricingPolicy,
        budgets: TimeoutBudgets,
    ) -> Self {
        Self {
            store,
            auth,
            checkout,
            policy,
            budgets,
        }
    }

    /// Run the Processing sequence for a request.
    ///
    /// Order is strict: (1) ensure the auth account, (2) create the checkout
    /// session with the server-recomputed amount. A failure at either step
    /// marks the submission failed and aborts the remainder. Step 2 failures
    /// leave the account in place; a retry with the same email reuses the
    /// failed submission and skips straight to session creation.
    pub async fn process(
        &self,
        request: &OnboardingRequest,
    ) -> Result<CheckoutOutcome, OnboardingError> {
        request.validate()?;

        // Server-authoritative amount: policy price with the coupon
        // re-derived from its code. Client-side math is display-only.
        let base = self
            .policy
            .monthly_price(request.service_frequency, request.dog_count);
        let monthly_amount = coupons::final_price(base, request.coupon_code.as_deref());

        let submission = self.find_or_create_submission(request, base).await?;
        let submission_id = submission.id;

        // Step 1: auth account, skipped when a prior attempt already has one.
        let account_id = match &submission.auth_account_id {
            Some(id) => {
                info!(submission_id = %submission_id, "Reusing auth account from prior attempt");
                id.clone()
            }
            None => {
                let account = match self
                    .with_budget("supabase", self.budgets.auth, self.auth.ensure_account(
                        &submission.email,
                        &request.password,
                    ))
                    .await
                {
                    Ok(account) => account,
                    Err(e) => {
                        // Mark the record failed so a retry reuses it instead
                        // of inserting a duplicate for the same email.
                        self.store
                            .update_submission_status(submission_id, SubmissionStatus::Failed)
                            .await
                            .map_err(db_error)?;
                        warn!(error = %e, submission_id = %submission_id, "Account step failed");
                        return Err(OnboardingError::Account(e));
                    }
                };

                if account.existing {
                    info!(submission_id = %submission_id, "Email already registered, reusing account");
                }
                self.store
                    .update_submission_links(submission_id, Some(&account.id), None, None, None)
                    .await
                    .map_err(db_error)?;
                account.id
            }
        };

        // Step 2: hosted checkout session.
        let session_request = CheckoutSessionRequest {
            submission_id,
            email: submission.email.clone(),
            monthly_amount,
            // From the request, not the stored record: a reused failed
            // submission may carry an earlier attempt's plan, and the
            // description must agree with the recomputed amount.
            description: format!(
                "{} yard cleanup, {} dog(s)",
                request.service_frequency,
                request.dog_count.count()
            ),
            payment_method_token: request.payment_method_token.clone(),
        };

        let session = match self
            .with_budget(
                "stripe",
                self.budgets.checkout,
                self.checkout.create_session(&session_request),
            )
            .await
        {
            Ok(session) => session,
            Err(e) => {
                // Account stays; the submission is retryable as-is.
                self.store
                    .update_submission_status(submission_id, SubmissionStatus::Failed)
                    .await
                    .map_err(db_error)?;
                warn!(error = %e, submission_id = %submission_id, "Checkout step failed");
                return Err(OnboardingError::Checkout(e));
            }
        };

        self.store
            .update_submission_links(
                submission_id,
                None,
                Some(&session.id),
                Some(&session.url),
                None,
            )
            .await
            .map_err(db_error)?;
        self.store
            .update_submission_status(submission_id, SubmissionStatus::Pending)
            .await
            .map_err(db_error)?;

        info!(
            submission_id = %submission_id,
            account_id = %account_id,
            session_id = %session.id,
            amount = %monthly_amount,
            "Checkout session created"
        );

        Ok(CheckoutOutcome {
            submission_id,
            checkout_url: session.url,
            monthly_amount,
        })
    }

    /// Reuse the latest failed submission for this email, or create a new
    /// record. The reuse path is what makes retries idempotent end to end.
    async fn find_or_create_submission(
        &self,
        request: &OnboardingRequest,
        quoted_monthly: Decimal,
    ) -> Result<OnboardingSubmission, OnboardingError> {
        let email = request.email.trim().to_ascii_lowercase();
        if let Some(previous) = self
            .store
            .get_submission_by_email(&email)
            .await
            .map_err(db_error)?
            && previous.status == SubmissionStatus::Failed
        {
            return Ok(previous);
        }

        let submission = request.into_submission(Some(quoted_monthly));
        self.store
            .insert_submission(&submission)
            .await
            .map_err(db_error)?;
        Ok(submission)
    }

    /// Wrap an integration future in its timeout budget.
    async fn with_budget<T>(
        &self,
        service: &str,
        budget: Duration,
        fut: impl Future<Output = Result<T, IntegrationError>>,
    ) -> Result<T, IntegrationError> {
        match tokio::time::timeout(budget, fut).await {
            Ok(result) => result,
            Err(_) => Err(IntegrationError::Timeout {
                service: service.to_string(),
                budget,
            }),
        }
    }
}

fn db_error(e: crate::error::DatabaseError) -> OnboardingError {
    OnboardingError::Storage(e)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rust_decimal_macros::dec;

    use super::*;
    use crate::onboarding::model::sample_request_for_tests;
    use crate::pricing::CURRENT_POLICY;
    use crate::store::LibSqlStore;
    use crate::store::model::{DogCount, ServiceFrequency};

    struct CountingAuth {
        calls: AtomicUsize,
        fail_first: AtomicUsize,
        report_existing: bool,
    }

    impl CountingAuth {
        fn new() -> Self {
            Self::failing(0)
        }

        fn failing(failures: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first: AtomicUsize::new(failures),
                report_existing: false,
            }
        }
    }

    #[async_trait]
    impl AuthProvider for CountingAuth {
        async fn ensure_account(
            &self,
            email: &str,
            _password: &SecretString,
        ) -> Result<AccountRef, IntegrationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self
                .fail_first
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(IntegrationError::RequestFailed {
                    service: "supabase".into(),
                    reason: "boom".into(),
                });
            }
            Ok(AccountRef {
                id: format!("acct_{email}"),
                existing: self.report_existing,
            })
        }
    }

    struct CountingCheckout {
        calls: AtomicUsize,
        fail_first: AtomicUsize,
        descriptions: Mutex<Vec<String>>,
    }

    impl CountingCheckout {
        fn new(failures: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first: AtomicUsize::new(failures),
                descriptions: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CheckoutProvider for CountingCheckout {
        async fn create_session(
            &self,
            request: &CheckoutSessionRequest,
        ) -> Result<CheckoutSession, IntegrationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.descriptions
                .lock()
                .unwrap()
                .push(request.description.clone());
            if self
                .fail_first
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(IntegrationError::RequestFailed {
                    service: "stripe".into(),
                    reason: "card declined upstream".into(),
                });
            }
            Ok(CheckoutSession {
                id: format!("cs_{}", request.submission_id),
                url: "https://checkout.example/session".into(),
            })
        }
    }

    struct HangingCheckout;

    #[async_trait]
    impl CheckoutProvider for HangingCheckout {
        async fn create_session(
            &self,
            _request: &CheckoutSessionRequest,
        ) -> Result<CheckoutSession, IntegrationError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            unreachable!("the budget should fire first")
        }
    }

    async fn orchestrator(
        auth: Arc<CountingAuth>,
        checkout: Arc<dyn CheckoutProvider>,
    ) -> (Orchestrator, Arc<LibSqlStore>) {
        let store = Arc::new(LibSqlStore::new_memory().await.unwrap());
        let orch = Orchestrator::new(
            Arc::clone(&store) as Arc<dyn Store>,
            auth,
            checkout,
            CURRENT_POLICY,
            TimeoutBudgets::default(),
        );
        (orch, store)
    }

    #[tokio::test]
    async fn happy_path_creates_account_then_session() {
        let auth = Arc::new(CountingAuth::new());
        let checkout = Arc::new(CountingCheckout::new(0));
        let (orch, store) = orchestrator(Arc::clone(&auth), Arc::clone(&checkout) as _).await;

        let outcome = orch.process(&sample_request_for_tests()).await.unwrap();
        assert_eq!(outcome.monthly_amount, dec!(110.00));
        assert!(outcome.checkout_url.starts_with("https://"));
        assert_eq!(auth.calls.load(Ordering::SeqCst), 1);
        assert_eq!(checkout.calls.load(Ordering::SeqCst), 1);

        let stored = store.get_submission(outcome.submission_id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubmissionStatus::Pending);
        assert!(stored.auth_account_id.is_some());
        assert!(stored.stripe_session_id.is_some());
    }

    #[tokio::test]
    async fn coupon_is_recomputed_server_side() {
        let auth = Arc::new(CountingAuth::new());
        let checkout = Arc::new(CountingCheckout::new(0));
        let (orch, _store) = orchestrator(Arc::clone(&auth), checkout as _).await;

        let mut request = sample_request_for_tests();
        request.coupon_code = Some("save10".into());
        let outcome = orch.process(&request).await.unwrap();
        assert_eq!(outcome.monthly_amount, dec!(99.00));
    }

    #[tokio::test]
    async fn auth_failure_aborts_before_checkout() {
        let auth = Arc::new(CountingAuth::failing(usize::MAX));
        let checkout = Arc::new(CountingCheckout::new(0));
        let (orch, _store) = orchestrator(Arc::clone(&auth), Arc::clone(&checkout) as _).await;

        let err = orch.process(&sample_request_for_tests()).await.unwrap_err();
        assert!(matches!(err, OnboardingError::Account(_)));
        assert_eq!(checkout.calls.load(Ordering::SeqCst), 0, "no checkout call after auth failure");
    }

    #[tokio::test]
    async fn retry_after_checkout_failure_skips_account_creation() {
        let auth = Arc::new(CountingAuth::new());
        let checkout = Arc::new(CountingCheckout::new(1));
        let (orch, store) = orchestrator(Arc::clone(&auth), Arc::clone(&checkout) as _).await;

        let request = sample_request_for_tests();
        let err = orch.process(&request).await.unwrap_err();
        assert!(matches!(err, OnboardingError::Checkout(_)));

        let failed = store
            .get_submission_by_email("jordan@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(failed.status, SubmissionStatus::Failed);

        // Same email retries: no duplicate account, same submission record.
        let outcome = orch.process(&request).await.unwrap();
        assert_eq!(outcome.submission_id, failed.id);
        assert_eq!(auth.calls.load(Ordering::SeqCst), 1, "account created exactly once");
        assert_eq!(checkout.calls.load(Ordering::SeqCst), 2);

        let recovered = store.get_submission(failed.id).await.unwrap().unwrap();
        assert_eq!(recovered.status, SubmissionStatus::Pending);
    }

    #[tokio::test]
    async fn auth_failure_marks_submission_failed_and_retry_reuses_it() {
        let auth = Arc::new(CountingAuth::failing(1));
        let checkout = Arc::new(CountingCheckout::new(0));
        let (orch, store) = orchestrator(Arc::clone(&auth), Arc::clone(&checkout) as _).await;

        let request = sample_request_for_tests();
        let err = orch.process(&request).await.unwrap_err();
        assert!(matches!(err, OnboardingError::Account(_)));

        let failed = store
            .get_submission_by_email("jordan@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(failed.status, SubmissionStatus::Failed);

        // Same email retries: the failed record is reused, not duplicated.
        let outcome = orch.process(&request).await.unwrap();
        assert_eq!(outcome.submission_id, failed.id);
        assert_eq!(store.list_submissions(None).await.unwrap().len(), 1);
        assert_eq!(auth.calls.load(Ordering::SeqCst), 2);
        assert_eq!(checkout.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retry_with_changed_plan_describes_the_new_plan() {
        let auth = Arc::new(CountingAuth::new());
        let checkout = Arc::new(CountingCheckout::new(1));
        let (orch, _store) = orchestrator(Arc::clone(&auth), Arc::clone(&checkout) as _).await;

        let mut request = sample_request_for_tests();
        assert!(orch.process(&request).await.is_err());

        // The customer changes plan and dog count before retrying. The
        // session must describe what the recomputed amount charges for.
        request.service_frequency = ServiceFrequency::BiWeekly;
        request.dog_count = DogCount::Two;
        let outcome = orch.process(&request).await.unwrap();
        assert_eq!(outcome.monthly_amount, dec!(110.00));

        let descriptions = checkout.descriptions.lock().unwrap();
        let latest = descriptions.last().unwrap();
        assert_eq!(latest, "bi-weekly yard cleanup, 2 dog(s)");
    }

    #[test]
    fn storage_failures_keep_their_own_error_class() {
        let err = db_error(crate::error::DatabaseError::Query("disk full".into()));
        assert!(matches!(err, OnboardingError::Storage(_)));
    }

    #[tokio::test]
    async fn existing_email_is_not_a_failure() {
        let mut auth = CountingAuth::new();
        auth.report_existing = true;
        let auth = Arc::new(auth);
        let checkout = Arc::new(CountingCheckout::new(0));
        let (orch, _store) = orchestrator(auth, checkout as _).await;

        assert!(orch.process(&sample_request_for_tests()).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn hung_checkout_surfaces_as_timeout() {
        let auth = Arc::new(CountingAuth::new());
        let store = Arc::new(LibSqlStore::new_memory().await.unwrap());
        let orch = Orchestrator::new(
            Arc::clone(&store) as Arc<dyn Store>,
            auth,
            Arc::new(HangingCheckout),
            CURRENT_POLICY,
            TimeoutBudgets {
                auth: Duration::from_millis(100),
                checkout: Duration::from_millis(100),
            },
        );

        let err = orch.process(&sample_request_for_tests()).await.unwrap_err();
        match err {
            OnboardingError::Checkout(IntegrationError::Timeout { service, .. }) => {
                assert_eq!(service, "stripe");
            }
            other => panic!("expected checkout timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_request_makes_no_external_calls() {
        let auth = Arc::new(CountingAuth::new());
        let checkout = Arc::new(CountingCheckout::new(0));
        let (orch, _store) = orchestrator(Arc::clone(&auth), Arc::clone(&checkout) as _).await;

        let mut request = sample_request_for_tests();
        request.payment_method_token = String::new();
        assert!(orch.process(&request).await.is_err());
        assert_eq!(auth.calls.load(Ordering::SeqCst), 0);
        assert_eq!(checkout.calls.load(Ordering::SeqCst), 0);
    }
}
