//! Backend-agnostic `Store` trait: single async interface for all
//! persistence.
//!
//! Records are created exactly once and mutated only through status
//! transitions; there is no update-in-place for business fields.
//! Corrections are handled by delete + recreate.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::store::model::{
    Charge, Customer, OnboardingSubmission, ServiceLocation, SubmissionStatus, Subscription,
    WaitlistStatus, WaitlistSubmission,
};

/// Repository interface over the relational store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Waitlist ────────────────────────────────────────────────────

    /// Insert a new waitlist submission.
    async fn insert_waitlist(&self, entry: &WaitlistSubmission) -> Result<(), DatabaseError>;

    /// List waitlist submissions, optionally filtered by status,
    /// newest first.
    async fn list_waitlist(
        &self,
        status: Option<WaitlistStatus>,
    ) -> Result<Vec<WaitlistSubmission>, DatabaseError>;

    /// Transition a waitlist entry's status. Errors with `NotFound` if the
    /// id does not exist.
    async fn update_waitlist_status(
        &self,
        id: Uuid,
        status: WaitlistStatus,
    ) -> Result<(), DatabaseError>;

    /// Hard-delete a waitlist entry.
    async fn delete_waitlist(&self, id: Uuid) -> Result<(), DatabaseError>;

    // ── Service locations ───────────────────────────────────────────

    /// Insert a new service location.
    async fn insert_location(&self, location: &ServiceLocation) -> Result<(), DatabaseError>;

    /// List all service locations (active and pending).
    async fn list_locations(&self) -> Result<Vec<ServiceLocation>, DatabaseError>;

    /// Delete a service location.
    async fn delete_location(&self, id: Uuid) -> Result<(), DatabaseError>;

    // ── Onboarding submissions ──────────────────────────────────────

    /// Insert a new onboarding submission.
    async fn insert_submission(
        &self,
        submission: &OnboardingSubmission,
    ) -> Result<(), DatabaseError>;

    /// Get a submission by id.
    async fn get_submission(
        &self,
        id: Uuid,
    ) -> Result<Option<OnboardingSubmission>, DatabaseError>;

    /// Look up the most recent submission for an email address. Used by the
    /// retry-safe orchestration path.
    async fn get_submission_by_email(
        &self,
        email: &str,
    ) -> Result<Option<OnboardingSubmission>, DatabaseError>;

    /// List submissions, optionally filtered by status, newest first.
    async fn list_submissions(
        &self,
        status: Option<SubmissionStatus>,
    ) -> Result<Vec<OnboardingSubmission>, DatabaseError>;

    /// Transition a submission's status.
    async fn update_submission_status(
        &self,
        id: Uuid,
        status: SubmissionStatus,
    ) -> Result<(), DatabaseError>;

    /// Record external linkage on a submission (auth account, checkout
    /// session, Sweep&Go client). `None` fields are left untouched.
    async fn update_submission_links(
        &self,
        id: Uuid,
        auth_account_id: Option<&str>,
        stripe_session_id: Option<&str>,
        checkout_url: Option<&str>,
        sweepandgo_client_id: Option<&str>,
    ) -> Result<(), DatabaseError>;

    // ── CRM ─────────────────────────────────────────────────────────

    /// Insert a customer record.
    async fn insert_customer(&self, customer: &Customer) -> Result<(), DatabaseError>;

    /// Look up a customer by email.
    async fn get_customer_by_email(&self, email: &str) -> Result<Option<Customer>, DatabaseError>;

    /// Insert a subscription for a customer.
    async fn insert_subscription(&self, subscription: &Subscription) -> Result<(), DatabaseError>;

    /// Record a charge mirrored from the payment processor.
    async fn insert_charge(&self, charge: &Charge) -> Result<(), DatabaseError>;

    /// Sum of succeeded charges for a customer. Admin dashboard figure.
    async fn total_charged(&self, customer_id: Uuid) -> Result<Decimal, DatabaseError>;
}
