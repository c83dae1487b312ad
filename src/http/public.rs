//! Public JSON API: waitlist capture, zip validation, quoting, coupons,
//! checkout-session creation, legacy onboarding, and inbound webhooks.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::coupons;
use crate::error::{IntegrationError, OnboardingError};
use crate::integrations::sweepandgo::WebhookEvent;
use crate::locations;
use crate::onboarding::OnboardingRequest;
use crate::pricing::QuoteRequest;
use crate::store::model::{
    Charge, ChargeStatus, Customer, DogCount, LastCleaned, NewWaitlistSubmission,
    OnboardingSubmission, ServiceFrequency, SubmissionStatus, WaitlistSubmission,
};

use super::AppState;

/// Build the public routes.
pub fn public_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/waitlist", post(create_waitlist))
        .route("/api/locations", get(list_locations))
        .route("/api/validate-zip", post(validate_zip))
        .route("/api/quote", post(quote))
        .route("/api/validate-coupon", post(validate_coupon))
        .route(
            "/api/stripe/create-checkout-session",
            post(create_checkout_session),
        )
        .route("/api/onboard", post(onboard))
        .route("/api/webhooks/sweepandgo", post(sweepandgo_webhook))
        .with_state(state)
}

fn bad_request(message: impl Into<String>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({"success": false, "error": message.into()})),
    )
}

fn internal_error(context: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"success": false, "error": context})),
    )
}

// ── Health ──────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "scooped"
    }))
}

// ── Waitlist ────────────────────────────────────────────────────────

async fn create_waitlist(
    State(state): State<AppState>,
    Json(form): Json<NewWaitlistSubmission>,
) -> impl IntoResponse {
    if form.name.trim().is_empty() || form.email.trim().is_empty() {
        return bad_request("name and email are required");
    }
    if !locations::is_well_formed(form.zip_code.trim()) {
        return bad_request("zip_code must be 5 digits");
    }

    let entry = WaitlistSubmission::new(form);
    if let Err(e) = state.store.insert_waitlist(&entry).await {
        warn!(error = %e, "Failed to persist waitlist entry");
        return internal_error("could not save your signup, please try again");
    }

    // Delivery is best-effort and must never fail the signup. SMTP is
    // blocking, so it runs off the async runtime.
    let notifier = state.notifier.clone();
    let for_notify = entry.clone();
    tokio::task::spawn_blocking(move || notifier.notify(&for_notify));

    info!(id = %entry.id, zip = %entry.zip_code, "Waitlist signup");
    (
        StatusCode::CREATED,
        Json(serde_json::json!({"success": true, "id": entry.id})),
    )
}

// ── Locations & zip validation ──────────────────────────────────────

async fn list_locations(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list_locations().await {
        Ok(locations) => Json(serde_json::json!({"success": true, "locations": locations}))
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to list locations");
            internal_error("could not load service areas").into_response()
        }
    }
}

#[derive(Deserialize)]
struct ZipPayload {
    zip_code: String,
}

async fn validate_zip(
    State(state): State<AppState>,
    Json(payload): Json<ZipPayload>,
) -> impl IntoResponse {
    let all = match state.store.list_locations().await {
        Ok(locations) => locations,
        Err(e) => {
            warn!(error = %e, "Failed to load locations for zip check");
            return internal_error("could not check your zip code").into_response();
        }
    };

    let check = locations::validate_zip(&payload.zip_code, &all);
    Json(serde_json::json!({
        "isValid": check.is_valid,
        "message": check.message,
    }))
    .into_response()
}

// ── Quote & coupons ─────────────────────────────────────────────────

async fn quote(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> impl IntoResponse {
    if !locations::is_well_formed(request.zip_code.trim()) {
        return bad_request("zip_code must be 5 digits").into_response();
    }

    let quote = state.calculator.quote(&request).await;
    Json(serde_json::json!({"success": true, "quote": quote})).into_response()
}

#[derive(Deserialize)]
struct CouponPayload {
    code: String,
}

async fn validate_coupon(Json(payload): Json<CouponPayload>) -> impl IntoResponse {
    Json(coupons::validate_coupon(&payload.code))
}

// ── Checkout session ────────────────────────────────────────────────

async fn create_checkout_session(
    State(state): State<AppState>,
    Json(request): Json<OnboardingRequest>,
) -> impl IntoResponse {
    match state.orchestrator.process(&request).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "submission_id": outcome.submission_id,
                "checkout_url": outcome.checkout_url,
                "monthly_amount": outcome.monthly_amount,
            })),
        ),
        Err(OnboardingError::Validation(message)) => bad_request(message),
        Err(e @ (OnboardingError::Account(_) | OnboardingError::Checkout(_))) => {
            warn!(error = %e, "Checkout orchestration failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({
                    "success": false,
                    "error": e.to_string(),
                    // The client returns to the Payment step with its state
                    // intact and may resubmit.
                    "retryable": true,
                })),
            )
        }
        Err(e @ OnboardingError::Storage(_)) => {
            // A storage fault is ours, not the client's.
            warn!(error = %e, "Checkout orchestration hit a storage failure");
            internal_error("checkout failed, please try again")
        }
        Err(e) => {
            warn!(error = %e, "Unexpected orchestration failure");
            internal_error("checkout failed, please try again")
        }
    }
}

// ── Legacy single-shot onboarding ───────────────────────────────────

/// Intake accepted by the legacy `/api/onboard` endpoint: no payment or
/// password, just the full customer record forwarded to Sweep&Go.
#[derive(Deserialize)]
struct LegacyOnboardRequest {
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    address: String,
    city: String,
    zip_code: String,
    dog_count: DogCount,
    service_frequency: ServiceFrequency,
    #[serde(default)]
    last_cleaned: Option<LastCleaned>,
    #[serde(default)]
    notify_on_the_way: bool,
    #[serde(default)]
    notify_on_completion: bool,
    #[serde(default)]
    gate_code: Option<String>,
    #[serde(default)]
    community_access_notes: Option<String>,
    #[serde(default)]
    dog_names: Vec<String>,
    #[serde(default)]
    coupon_code: Option<String>,
}

async fn onboard(
    State(state): State<AppState>,
    Json(request): Json<LegacyOnboardRequest>,
) -> impl IntoResponse {
    if request.email.trim().is_empty() || !request.email.contains('@') {
        return bad_request("a valid email is required");
    }
    if !locations::is_well_formed(request.zip_code.trim()) {
        return bad_request("zip_code must be 5 digits");
    }

    let now = Utc::now();
    let mut submission = OnboardingSubmission {
        id: Uuid::new_v4(),
        first_name: request.first_name,
        last_name: request.last_name,
        email: request.email.trim().to_ascii_lowercase(),
        phone: request.phone,
        address: request.address,
        city: request.city,
        zip_code: request.zip_code,
        dog_count: request.dog_count,
        service_frequency: request.service_frequency,
        last_cleaned: request.last_cleaned,
        notify_on_the_way: request.notify_on_the_way,
        notify_on_completion: request.notify_on_completion,
        gate_code: request.gate_code,
        community_access_notes: request.community_access_notes,
        dog_names: request.dog_names,
        coupon_code: request.coupon_code,
        quoted_monthly: None,
        sweepandgo_client_id: None,
        sweepandgo_payload: None,
        auth_account_id: None,
        stripe_session_id: None,
        checkout_url: None,
        status: SubmissionStatus::New,
        created_at: now,
        updated_at: now,
    };

    // Forward to Sweep&Go when configured; a failure degrades to a recorded
    // submission rather than a hard error.
    if let Some(client) = &state.sweepandgo {
        match client.onboard_client(&submission).await {
            Ok(onboarded) => {
                submission.sweepandgo_client_id = Some(onboarded.client_id);
                submission.sweepandgo_payload = Some(onboarded.payload);
                submission.status = SubmissionStatus::Pending;
            }
            Err(e) => {
                warn!(error = %e, email = %submission.email, "Sweep&Go onboarding failed");
            }
        }
    }

    if let Err(e) = state.store.insert_submission(&submission).await {
        warn!(error = %e, "Failed to persist onboarding submission");
        return internal_error("could not save your signup, please try again");
    }

    info!(id = %submission.id, email = %submission.email, "Legacy onboarding submission");
    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "id": submission.id,
            "status": submission.status,
        })),
    )
}

// ── Sweep&Go webhook ────────────────────────────────────────────────

async fn sweepandgo_webhook(
    State(state): State<AppState>,
    Json(event): Json<WebhookEvent>,
) -> impl IntoResponse {
    info!(event = %event.event, "Sweep&Go webhook received");

    let outcome = match event.event.as_str() {
        "client.activated" => transition_by_email(&state, &event, SubmissionStatus::Completed).await,
        "client.rejected" => transition_by_email(&state, &event, SubmissionStatus::Failed).await,
        "charge.succeeded" => mirror_charge(&state, &event, ChargeStatus::Succeeded).await,
        "charge.failed" => mirror_charge(&state, &event, ChargeStatus::Failed).await,
        other => {
            info!(event = %other, "Ignoring unhandled webhook event");
            Ok(())
        }
    };

    match outcome {
        Ok(()) => Json(serde_json::json!({"received": true})).into_response(),
        Err(e) => {
            warn!(error = %e, event = %event.event, "Webhook handling failed");
            internal_error("webhook processing failed").into_response()
        }
    }
}

async fn transition_by_email(
    state: &AppState,
    event: &WebhookEvent,
    status: SubmissionStatus,
) -> Result<(), IntegrationError> {
    let Some(email) = event.client_email.as_deref() else {
        warn!(event = %event.event, "Webhook event without client_email");
        return Ok(());
    };

    let submission = state
        .store
        .get_submission_by_email(&email.to_ascii_lowercase())
        .await
        .map_err(webhook_db_error)?;

    match submission {
        Some(submission) => {
            state
                .store
                .update_submission_status(submission.id, status)
                .await
                .map_err(webhook_db_error)?;
            if let Some(client_id) = event.client_id.as_deref() {
                state
                    .store
                    .update_submission_links(submission.id, None, None, None, Some(client_id))
                    .await
                    .map_err(webhook_db_error)?;
            }
            info!(submission_id = %submission.id, status = ?status, "Submission transitioned by webhook");
        }
        None => {
            warn!(email = %email, "Webhook for unknown submission email");
        }
    }
    Ok(())
}

async fn mirror_charge(
    state: &AppState,
    event: &WebhookEvent,
    status: ChargeStatus,
) -> Result<(), IntegrationError> {
    let (Some(email), Some(amount)) = (event.client_email.as_deref(), event.amount) else {
        warn!(event = %event.event, "Charge webhook missing email or amount");
        return Ok(());
    };

    let email = email.to_ascii_lowercase();
    let customer = match state
        .store
        .get_customer_by_email(&email)
        .await
        .map_err(webhook_db_error)?
    {
        Some(customer) => customer,
        None => {
            // First charge for a customer we haven't migrated yet.
            let submission = state
                .store
                .get_submission_by_email(&email)
                .await
                .map_err(webhook_db_error)?;
            let name = submission
                .map(|s| format!("{} {}", s.first_name, s.last_name))
                .unwrap_or_else(|| email.clone());
            let customer = Customer {
                id: Uuid::new_v4(),
                name,
                email: email.clone(),
                phone: None,
                stripe_customer_id: None,
                created_at: Utc::now(),
            };
            state
                .store
                .insert_customer(&customer)
                .await
                .map_err(webhook_db_error)?;
            customer
        }
    };

    state
        .store
        .insert_charge(&Charge {
            id: Uuid::new_v4(),
            customer_id: customer.id,
            amount,
            currency: event.currency.clone().unwrap_or_else(|| "usd".into()),
            external_id: event.external_id.clone(),
            status,
            created_at: Utc::now(),
        })
        .await
        .map_err(webhook_db_error)?;

    info!(customer_id = %customer.id, %amount, status = ?status, "Charge mirrored");
    Ok(())
}

fn webhook_db_error(e: crate::error::DatabaseError) -> IntegrationError {
    IntegrationError::RequestFailed {
        service: "store".into(),
        reason: e.to_string(),
    }
}
