//! Admin API: bearer-token-guarded CRUD over service areas, waitlist,
//! and onboarding submissions, plus integration diagnostics.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::store::model::{
    Customer, NewServiceLocation, ServiceLocation, SubmissionStatus, Subscription,
    SubscriptionStatus, WaitlistStatus,
};

use super::AppState;

pub fn admin_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/admin/locations",
            get(list_locations).post(create_location),
        )
        .route("/api/admin/locations/{id}", delete(delete_location))
        .route("/api/admin/waitlist", get(list_waitlist))
        .route("/api/admin/waitlist/archived", get(list_archived_waitlist))
        .route("/api/admin/waitlist/{id}/archive", patch(archive_waitlist))
        .route("/api/admin/waitlist/{id}", delete(delete_waitlist))
        .route("/api/admin/submissions", get(list_submissions))
        .route("/api/admin/sweepandgo/test", get(sweepandgo_test))
        .route("/api/admin/sweepandgo/pricing", get(sweepandgo_pricing))
        .route("/api/admin/migrate/{submission_id}", post(migrate_submission))
        .with_state(state)
}

fn db_response(e: DatabaseError, context: &str) -> (StatusCode, Json<serde_json::Value>) {
    let status = match &e {
        DatabaseError::NotFound { .. } => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        warn!(error = %e, "{context}");
    }
    (
        status,
        Json(serde_json::json!({"success": false, "error": e.to_string()})),
    )
}

// ── Service locations ───────────────────────────────────────────────

async fn list_locations(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list_locations().await {
        Ok(locations) => (
            StatusCode::OK,
            Json(serde_json::json!({"success": true, "locations": locations})),
        ),
        Err(e) => db_response(e, "Failed to list locations"),
    }
}

async fn create_location(
    State(state): State<AppState>,
    Json(form): Json<NewServiceLocation>,
) -> impl IntoResponse {
    if form.city.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"success": false, "error": "city is required"})),
        );
    }
    let malformed: Vec<&String> = form
        .zip_codes
        .iter()
        .filter(|z| !crate::locations::is_well_formed(z.trim()))
        .collect();
    if !malformed.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "success": false,
                "error": format!("invalid zip codes: {malformed:?}"),
            })),
        );
    }

    let location = ServiceLocation::new(form);
    match state.store.insert_location(&location).await {
        Ok(()) => {
            info!(id = %location.id, city = %location.city, "Service location created");
            (
                StatusCode::CREATED,
                Json(serde_json::json!({"success": true, "location": location})),
            )
        }
        Err(e) => db_response(e, "Failed to create location"),
    }
}

async fn delete_location(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.store.delete_location(id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({"success": true})),
        ),
        Err(e) => db_response(e, "Failed to delete location"),
    }
}

// ── Waitlist ────────────────────────────────────────────────────────

async fn list_waitlist(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list_waitlist(Some(WaitlistStatus::Active)).await {
        Ok(entries) => (
            StatusCode::OK,
            Json(serde_json::json!({"success": true, "entries": entries})),
        ),
        Err(e) => db_response(e, "Failed to list waitlist"),
    }
}

async fn list_archived_waitlist(State(state): State<AppState>) -> impl IntoResponse {
    match state
        .store
        .list_waitlist(Some(WaitlistStatus::Archived))
        .await
    {
        Ok(entries) => (
            StatusCode::OK,
            Json(serde_json::json!({"success": true, "entries": entries})),
        ),
        Err(e) => db_response(e, "Failed to list archived waitlist"),
    }
}

async fn archive_waitlist(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state
        .store
        .update_waitlist_status(id, WaitlistStatus::Archived)
        .await
    {
        Ok(()) => {
            info!(%id, "Waitlist entry archived");
            (StatusCode::OK, Json(serde_json::json!({"success": true})))
        }
        Err(e) => db_response(e, "Failed to archive waitlist entry"),
    }
}

async fn delete_waitlist(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.store.delete_waitlist(id).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"success": true}))),
        Err(e) => db_response(e, "Failed to delete waitlist entry"),
    }
}

// ── Onboarding submissions ──────────────────────────────────────────

#[derive(Deserialize)]
struct SubmissionFilter {
    status: Option<SubmissionStatus>,
}

async fn list_submissions(
    State(state): State<AppState>,
    Query(filter): Query<SubmissionFilter>,
) -> impl IntoResponse {
    match state.store.list_submissions(filter.status).await {
        Ok(submissions) => (
            StatusCode::OK,
            Json(serde_json::json!({"success": true, "submissions": submissions})),
        ),
        Err(e) => db_response(e, "Failed to list submissions"),
    }
}

// ── Sweep&Go diagnostics ────────────────────────────────────────────

async fn sweepandgo_test(State(state): State<AppState>) -> impl IntoResponse {
    let Some(client) = &state.sweepandgo else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"success": false, "error": "sweepandgo is not configured"})),
        );
    };

    match client.probe().await {
        Ok(body) => (
            StatusCode::OK,
            Json(serde_json::json!({"success": true, "organization": body})),
        ),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({"success": false, "error": e.to_string()})),
        ),
    }
}

#[derive(Deserialize)]
struct PricingProbe {
    zip_code: String,
    dog_count: crate::store::model::DogCount,
    service_frequency: crate::store::model::ServiceFrequency,
}

/// Fetch the remote price for a given combination, side by side with the
/// local policy price, so pricing drift is visible without digging through
/// logs.
async fn sweepandgo_pricing(
    State(state): State<AppState>,
    Query(probe): Query<PricingProbe>,
) -> impl IntoResponse {
    let request = crate::pricing::QuoteRequest {
        zip_code: probe.zip_code,
        dog_count: probe.dog_count,
        service_frequency: probe.service_frequency,
        last_cleaned: None,
    };
    let quote = state.calculator.quote(&request).await;
    let local = state
        .calculator
        .policy()
        .monthly_price(request.service_frequency, request.dog_count);

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "success": true,
            "quote": quote,
            "local_monthly": local,
        })),
    )
}

// ── CRM migration ───────────────────────────────────────────────────

/// Promote a completed onboarding submission into the CRM: create the
/// customer (idempotent by email) and an active subscription.
async fn migrate_submission(
    State(state): State<AppState>,
    Path(submission_id): Path<Uuid>,
) -> impl IntoResponse {
    let submission = match state.store.get_submission(submission_id).await {
        Ok(Some(submission)) => submission,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({
                    "success": false,
                    "error": format!("submission {submission_id} not found"),
                })),
            );
        }
        Err(e) => return db_response(e, "Failed to load submission"),
    };

    if submission.status != SubmissionStatus::Completed {
        return (
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "success": false,
                "error": "only completed submissions can be migrated",
            })),
        );
    }

    let customer = match state.store.get_customer_by_email(&submission.email).await {
        Ok(Some(existing)) => existing,
        Ok(None) => {
            let customer = Customer {
                id: Uuid::new_v4(),
                name: format!("{} {}", submission.first_name, submission.last_name),
                email: submission.email.clone(),
                phone: Some(submission.phone.clone()),
                stripe_customer_id: None,
                created_at: Utc::now(),
            };
            if let Err(e) = state.store.insert_customer(&customer).await {
                return db_response(e, "Failed to create customer");
            }
            customer
        }
        Err(e) => return db_response(e, "Failed to look up customer"),
    };

    let subscription = Subscription {
        id: Uuid::new_v4(),
        customer_id: customer.id,
        frequency: submission.service_frequency,
        dog_count: submission.dog_count,
        status: SubscriptionStatus::Active,
        created_at: Utc::now(),
    };
    if let Err(e) = state.store.insert_subscription(&subscription).await {
        return db_response(e, "Failed to create subscription");
    }

    info!(
        submission_id = %submission.id,
        customer_id = %customer.id,
        subscription_id = %subscription.id,
        "Submission migrated to CRM"
    );
    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "customer": customer,
            "subscription": subscription,
        })),
    )
}
