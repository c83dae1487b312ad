//! libSQL backend: async `Store` trait implementation.
//!
//! Supports local file and in-memory databases. Enum-valued columns are
//! stored as their wire strings; timestamps as RFC 3339 text.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::model::{
    Charge, ChargeStatus, Customer, DogCount, LastCleaned, OnboardingSubmission, ServiceFrequency,
    ServiceLocation, SubmissionStatus, Subscription, SubscriptionStatus, WaitlistStatus,
    WaitlistSubmission,
};
use crate::store::traits::Store;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Connection(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Connection(format!("Failed to open database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Connection(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(store.conn()).await?;
        info!(path = %path.display(), "Database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Connection(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Connection(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(store.conn()).await?;
        Ok(store)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn parse_uuid(s: &str) -> Uuid {
    Uuid::parse_str(s).unwrap_or_else(|_| Uuid::nil())
}

fn opt_text(s: Option<String>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s),
        None => libsql::Value::Null,
    }
}

fn waitlist_status_to_str(status: WaitlistStatus) -> &'static str {
    match status {
        WaitlistStatus::Active => "active",
        WaitlistStatus::Archived => "archived",
        WaitlistStatus::Deleted => "deleted",
    }
}

fn str_to_waitlist_status(s: &str) -> WaitlistStatus {
    match s {
        "archived" => WaitlistStatus::Archived,
        "deleted" => WaitlistStatus::Deleted,
        _ => WaitlistStatus::Active,
    }
}

fn submission_status_to_str(status: SubmissionStatus) -> &'static str {
    match status {
        SubmissionStatus::New => "new",
        SubmissionStatus::Pending => "pending",
        SubmissionStatus::Completed => "completed",
        SubmissionStatus::Failed => "failed",
    }
}

fn str_to_submission_status(s: &str) -> SubmissionStatus {
    match s {
        "pending" => SubmissionStatus::Pending,
        "completed" => SubmissionStatus::Completed,
        "failed" => SubmissionStatus::Failed,
        _ => SubmissionStatus::New,
    }
}

fn subscription_status_to_str(status: SubscriptionStatus) -> &'static str {
    match status {
        SubscriptionStatus::Active => "active",
        SubscriptionStatus::Paused => "paused",
        SubscriptionStatus::Canceled => "canceled",
    }
}

fn charge_status_to_str(status: ChargeStatus) -> &'static str {
    match status {
        ChargeStatus::Pending => "pending",
        ChargeStatus::Succeeded => "succeeded",
        ChargeStatus::Failed => "failed",
    }
}

// ── Row mappers ─────────────────────────────────────────────────────

const WAITLIST_COLUMNS: &str = "id, name, email, address, zip_code, phone, dog_count, \
     referral_source, urgency, last_cleaned, preferred_plan, sms_opt_in, status, created_at";

fn row_to_waitlist(row: &libsql::Row) -> Result<WaitlistSubmission, libsql::Error> {
    let id: String = row.get(0)?;
    let dog_count: String = row.get(6)?;
    let last_cleaned: Option<String> = row.get(9).ok();
    let preferred_plan: Option<String> = row.get(10).ok();
    let sms_opt_in: i64 = row.get(11)?;
    let status: String = row.get(12)?;
    let created: String = row.get(13)?;

    Ok(WaitlistSubmission {
        id: parse_uuid(&id),
        name: row.get(1)?,
        email: row.get(2)?,
        address: row.get(3)?,
        zip_code: row.get(4)?,
        phone: row.get(5).ok(),
        dog_count: DogCount::parse(&dog_count).unwrap_or(DogCount::One),
        referral_source: row.get(7).ok(),
        urgency: row.get(8).ok(),
        last_cleaned: last_cleaned.as_deref().and_then(LastCleaned::parse),
        preferred_plan: preferred_plan.as_deref().and_then(ServiceFrequency::parse),
        sms_opt_in: sms_opt_in != 0,
        status: str_to_waitlist_status(&status),
        created_at: parse_datetime(&created),
    })
}

const LOCATION_COLUMNS: &str = "id, city, state, zip_codes, launch_date, active, created_at";

fn row_to_location(row: &libsql::Row) -> Result<ServiceLocation, libsql::Error> {
    let id: String = row.get(0)?;
    let zip_json: String = row.get(3)?;
    let launch: Option<String> = row.get(4).ok();
    let active: i64 = row.get(5)?;
    let created: String = row.get(6)?;

    Ok(ServiceLocation {
        id: parse_uuid(&id),
        city: row.get(1)?,
        state: row.get(2)?,
        zip_codes: serde_json::from_str(&zip_json).unwrap_or_default(),
        launch_date: launch
            .as_deref()
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()),
        active: active != 0,
        created_at: parse_datetime(&created),
    })
}

const SUBMISSION_COLUMNS: &str = "id, first_name, last_name, email, phone, address, city, \
     zip_code, dog_count, service_frequency, last_cleaned, notify_on_the_way, \
     notify_on_completion, gate_code, community_access_notes, dog_names, coupon_code, \
     quoted_monthly, sweepandgo_client_id, sweepandgo_payload, auth_account_id, \
     stripe_session_id, checkout_url, status, created_at, updated_at";

fn row_to_submission(row: &libsql::Row) -> Result<OnboardingSubmission, libsql::Error> {
    let id: String = row.get(0)?;
    let dog_count: String = row.get(8)?;
    let frequency: String = row.get(9)?;
    let last_cleaned: Option<String> = row.get(10).ok();
    let on_the_way: i64 = row.get(11)?;
    let on_completion: i64 = row.get(12)?;
    let dog_names: String = row.get(15)?;
    let quoted: Option<String> = row.get(17).ok();
    let payload: Option<String> = row.get(19).ok();
    let status: String = row.get(23)?;
    let created: String = row.get(24)?;
    let updated: String = row.get(25)?;

    Ok(OnboardingSubmission {
        id: parse_uuid(&id),
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        address: row.get(5)?,
        city: row.get(6)?,
        zip_code: row.get(7)?,
        dog_count: DogCount::parse(&dog_count).unwrap_or(DogCount::One),
        service_frequency: ServiceFrequency::parse(&frequency).unwrap_or(ServiceFrequency::Weekly),
        last_cleaned: last_cleaned.as_deref().and_then(LastCleaned::parse),
        notify_on_the_way: on_the_way != 0,
        notify_on_completion: on_completion != 0,
        gate_code: row.get(13).ok(),
        community_access_notes: row.get(14).ok(),
        dog_names: serde_json::from_str(&dog_names).unwrap_or_default(),
        coupon_code: row.get(16).ok(),
        quoted_monthly: quoted.as_deref().and_then(|s| s.parse::<Decimal>().ok()),
        sweepandgo_client_id: row.get(18).ok(),
        sweepandgo_payload: payload.as_deref().and_then(|s| serde_json::from_str(s).ok()),
        auth_account_id: row.get(20).ok(),
        stripe_session_id: row.get(21).ok(),
        checkout_url: row.get(22).ok(),
        status: str_to_submission_status(&status),
        created_at: parse_datetime(&created),
        updated_at: parse_datetime(&updated),
    })
}

fn row_to_customer(row: &libsql::Row) -> Result<Customer, libsql::Error> {
    let id: String = row.get(0)?;
    let created: String = row.get(5)?;
    Ok(Customer {
        id: parse_uuid(&id),
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3).ok(),
        stripe_customer_id: row.get(4).ok(),
        created_at: parse_datetime(&created),
    })
}

// ── Store impl ──────────────────────────────────────────────────────

#[async_trait]
impl Store for LibSqlStore {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    async fn insert_waitlist(&self, entry: &WaitlistSubmission) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                &format!(
                    "INSERT INTO waitlist ({WAITLIST_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
                ),
                params![
                    entry.id.to_string(),
                    entry.name.clone(),
                    entry.email.clone(),
                    entry.address.clone(),
                    entry.zip_code.clone(),
                    opt_text(entry.phone.clone()),
                    entry.dog_count.as_str(),
                    opt_text(entry.referral_source.clone()),
                    opt_text(entry.urgency.clone()),
                    opt_text(entry.last_cleaned.map(|l| l.as_str().to_string())),
                    opt_text(entry.preferred_plan.map(|p| p.as_str().to_string())),
                    entry.sms_opt_in as i64,
                    waitlist_status_to_str(entry.status),
                    entry.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_waitlist: {e}")))?;

        debug!(id = %entry.id, zip = %entry.zip_code, "Waitlist entry inserted");
        Ok(())
    }

    async fn list_waitlist(
        &self,
        status: Option<WaitlistStatus>,
    ) -> Result<Vec<WaitlistSubmission>, DatabaseError> {
        let mut rows = match status {
            Some(status) => self
                .conn()
                .query(
                    &format!(
                        "SELECT {WAITLIST_COLUMNS} FROM waitlist WHERE status = ?1 \
                         ORDER BY created_at DESC"
                    ),
                    params![waitlist_status_to_str(status)],
                )
                .await,
            None => self
                .conn()
                .query(
                    &format!(
                        "SELECT {WAITLIST_COLUMNS} FROM waitlist ORDER BY created_at DESC"
                    ),
                    (),
                )
                .await,
        }
        .map_err(|e| DatabaseError::Query(format!("list_waitlist: {e}")))?;

        let mut entries = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_waitlist(&row) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!("Skipping waitlist row: {e}"),
            }
        }
        Ok(entries)
    }

    async fn update_waitlist_status(
        &self,
        id: Uuid,
        status: WaitlistStatus,
    ) -> Result<(), DatabaseError> {
        let affected = self
            .conn()
            .execute(
                "UPDATE waitlist SET status = ?1 WHERE id = ?2",
                params![waitlist_status_to_str(status), id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_waitlist_status: {e}")))?;

        if affected == 0 {
            return Err(DatabaseError::NotFound {
                entity: "waitlist".into(),
                id: id.to_string(),
            });
        }
        debug!(id = %id, status = ?status, "Waitlist status updated");
        Ok(())
    }

    async fn delete_waitlist(&self, id: Uuid) -> Result<(), DatabaseError> {
        let affected = self
            .conn()
            .execute("DELETE FROM waitlist WHERE id = ?1", params![id.to_string()])
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_waitlist: {e}")))?;

        if affected == 0 {
            return Err(DatabaseError::NotFound {
                entity: "waitlist".into(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn insert_location(&self, location: &ServiceLocation) -> Result<(), DatabaseError> {
        let zip_json = serde_json::to_string(&location.zip_codes)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        self.conn()
            .execute(
                &format!(
                    "INSERT INTO service_locations ({LOCATION_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
                ),
                params![
                    location.id.to_string(),
                    location.city.clone(),
                    location.state.clone(),
                    zip_json,
                    opt_text(location.launch_date.map(|d| d.to_string())),
                    location.active as i64,
                    location.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_location: {e}")))?;

        debug!(id = %location.id, city = %location.city, "Service location inserted");
        Ok(())
    }

    async fn list_locations(&self) -> Result<Vec<ServiceLocation>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {LOCATION_COLUMNS} FROM service_locations ORDER BY city ASC"
                ),
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_locations: {e}")))?;

        let mut locations = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_location(&row) {
                Ok(location) => locations.push(location),
                Err(e) => tracing::warn!("Skipping location row: {e}"),
            }
        }
        Ok(locations)
    }

    async fn delete_location(&self, id: Uuid) -> Result<(), DatabaseError> {
        let affected = self
            .conn()
            .execute(
                "DELETE FROM service_locations WHERE id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_location: {e}")))?;

        if affected == 0 {
            return Err(DatabaseError::NotFound {
                entity: "service_location".into(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn insert_submission(
        &self,
        submission: &OnboardingSubmission,
    ) -> Result<(), DatabaseError> {
        let dog_names = serde_json::to_string(&submission.dog_names)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        let payload = submission
            .sweepandgo_payload
            .as_ref()
            .and_then(|v| serde_json::to_string(v).ok());

        self.conn()
            .execute(
                &format!(
                    "INSERT INTO onboarding_submissions ({SUBMISSION_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, \
                             ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26)"
                ),
                params![
                    submission.id.to_string(),
                    submission.first_name.clone(),
                    submission.last_name.clone(),
                    submission.email.clone(),
                    submission.phone.clone(),
                    submission.address.clone(),
                    submission.city.clone(),
                    submission.zip_code.clone(),
                    submission.dog_count.as_str(),
                    submission.service_frequency.as_str(),
                    opt_text(submission.last_cleaned.map(|l| l.as_str().to_string())),
                    submission.notify_on_the_way as i64,
                    submission.notify_on_completion as i64,
                    opt_text(submission.gate_code.clone()),
                    opt_text(submission.community_access_notes.clone()),
                    dog_names,
                    opt_text(submission.coupon_code.clone()),
                    opt_text(submission.quoted_monthly.map(|d| d.to_string())),
                    opt_text(submission.sweepandgo_client_id.clone()),
                    opt_text(payload),
                    opt_text(submission.auth_account_id.clone()),
                    opt_text(submission.stripe_session_id.clone()),
                    opt_text(submission.checkout_url.clone()),
                    submission_status_to_str(submission.status),
                    submission.created_at.to_rfc3339(),
                    submission.updated_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_submission: {e}")))?;

        debug!(id = %submission.id, email = %submission.email, "Onboarding submission inserted");
        Ok(())
    }

    async fn get_submission(
        &self,
        id: Uuid,
    ) -> Result<Option<OnboardingSubmission>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {SUBMISSION_COLUMNS} FROM onboarding_submissions WHERE id = ?1"
                ),
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_submission: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            Some(row) => Ok(Some(row_to_submission(&row).map_err(|e| {
                DatabaseError::Serialization(e.to_string())
            })?)),
            None => Ok(None),
        }
    }

    async fn get_submission_by_email(
        &self,
        email: &str,
    ) -> Result<Option<OnboardingSubmission>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {SUBMISSION_COLUMNS} FROM onboarding_submissions \
                     WHERE email = ?1 ORDER BY created_at DESC LIMIT 1"
                ),
                params![email],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_submission_by_email: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            Some(row) => Ok(Some(row_to_submission(&row).map_err(|e| {
                DatabaseError::Serialization(e.to_string())
            })?)),
            None => Ok(None),
        }
    }

    async fn list_submissions(
        &self,
        status: Option<SubmissionStatus>,
    ) -> Result<Vec<OnboardingSubmission>, DatabaseError> {
        let mut rows = match status {
            Some(status) => self
                .conn()
                .query(
                    &format!(
                        "SELECT {SUBMISSION_COLUMNS} FROM onboarding_submissions \
                         WHERE status = ?1 ORDER BY created_at DESC"
                    ),
                    params![submission_status_to_str(status)],
                )
                .await,
            None => self
                .conn()
                .query(
                    &format!(
                        "SELECT {SUBMISSION_COLUMNS} FROM onboarding_submissions \
                         ORDER BY created_at DESC"
                    ),
                    (),
                )
                .await,
        }
        .map_err(|e| DatabaseError::Query(format!("list_submissions: {e}")))?;

        let mut submissions = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_submission(&row) {
                Ok(submission) => submissions.push(submission),
                Err(e) => tracing::warn!("Skipping submission row: {e}"),
            }
        }
        Ok(submissions)
    }

    async fn update_submission_status(
        &self,
        id: Uuid,
        status: SubmissionStatus,
    ) -> Result<(), DatabaseError> {
        let affected = self
            .conn()
            .execute(
                "UPDATE onboarding_submissions SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![
                    submission_status_to_str(status),
                    Utc::now().to_rfc3339(),
                    id.to_string()
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_submission_status: {e}")))?;

        if affected == 0 {
            return Err(DatabaseError::NotFound {
                entity: "onboarding_submission".into(),
                id: id.to_string(),
            });
        }
        debug!(id = %id, status = ?status, "Submission status updated");
        Ok(())
    }

    async fn update_submission_links(
        &self,
        id: Uuid,
        auth_account_id: Option<&str>,
        stripe_session_id: Option<&str>,
        checkout_url: Option<&str>,
        sweepandgo_client_id: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let affected = self
            .conn()
            .execute(
                "UPDATE onboarding_submissions SET \
                     auth_account_id = COALESCE(?1, auth_account_id), \
                     stripe_session_id = COALESCE(?2, stripe_session_id), \
                     checkout_url = COALESCE(?3, checkout_url), \
                     sweepandgo_client_id = COALESCE(?4, sweepandgo_client_id), \
                     updated_at = ?5 \
                 WHERE id = ?6",
                params![
                    opt_text(auth_account_id.map(str::to_string)),
                    opt_text(stripe_session_id.map(str::to_string)),
                    opt_text(checkout_url.map(str::to_string)),
                    opt_text(sweepandgo_client_id.map(str::to_string)),
                    Utc::now().to_rfc3339(),
                    id.to_string()
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_submission_links: {e}")))?;

        if affected == 0 {
            return Err(DatabaseError::NotFound {
                entity: "onboarding_submission".into(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO customers (id, name, email, phone, stripe_customer_id, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    customer.id.to_string(),
                    customer.name.clone(),
                    customer.email.clone(),
                    opt_text(customer.phone.clone()),
                    opt_text(customer.stripe_customer_id.clone()),
                    customer.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_customer: {e}")))?;
        Ok(())
    }

    async fn get_customer_by_email(&self, email: &str) -> Result<Option<Customer>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, name, email, phone, stripe_customer_id, created_at \
                 FROM customers WHERE email = ?1",
                params![email],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_customer_by_email: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            Some(row) => Ok(Some(row_to_customer(&row).map_err(|e| {
                DatabaseError::Serialization(e.to_string())
            })?)),
            None => Ok(None),
        }
    }

    async fn insert_subscription(&self, subscription: &Subscription) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO subscriptions (id, customer_id, frequency, dog_count, status, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    subscription.id.to_string(),
                    subscription.customer_id.to_string(),
                    subscription.frequency.as_str(),
                    subscription.dog_count.as_str(),
                    subscription_status_to_str(subscription.status),
                    subscription.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_subscription: {e}")))?;
        Ok(())
    }

    async fn insert_charge(&self, charge: &Charge) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO charges (id, customer_id, amount, currency, external_id, status, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    charge.id.to_string(),
                    charge.customer_id.to_string(),
                    charge.amount.to_string(),
                    charge.currency.clone(),
                    opt_text(charge.external_id.clone()),
                    charge_status_to_str(charge.status),
                    charge.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_charge: {e}")))?;
        Ok(())
    }

    async fn total_charged(&self, customer_id: Uuid) -> Result<Decimal, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT amount FROM charges WHERE customer_id = ?1 AND status = 'succeeded'",
                params![customer_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("total_charged: {e}")))?;

        let mut total = Decimal::ZERO;
        while let Ok(Some(row)) = rows.next().await {
            let amount: String = row.get(0).unwrap_or_default();
            total += amount.parse::<Decimal>().unwrap_or(Decimal::ZERO);
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::model::NewWaitlistSubmission;

    fn sample_waitlist() -> WaitlistSubmission {
        WaitlistSubmission::new(NewWaitlistSubmission {
            name: "Jordan Reyes".into(),
            email: "jordan@example.com".into(),
            address: "12 Fernandina Ct".into(),
            zip_code: "32097".into(),
            phone: Some("904-555-0101".into()),
            dog_count: DogCount::Two,
            referral_source: Some("google".into()),
            urgency: Some("asap".into()),
            last_cleaned: Some(LastCleaned::OneMonth),
            preferred_plan: Some(ServiceFrequency::Weekly),
            sms_opt_in: true,
        })
    }

    #[tokio::test]
    async fn waitlist_roundtrip() {
        let store = LibSqlStore::new_memory().await.unwrap();
        let entry = sample_waitlist();
        store.insert_waitlist(&entry).await.unwrap();

        let listed = store.list_waitlist(Some(WaitlistStatus::Active)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, entry.id);
        assert_eq!(listed[0].dog_count, DogCount::Two);
        assert_eq!(listed[0].preferred_plan, Some(ServiceFrequency::Weekly));
        assert!(listed[0].sms_opt_in);
    }

    #[tokio::test]
    async fn waitlist_archive_filters() {
        let store = LibSqlStore::new_memory().await.unwrap();
        let entry = sample_waitlist();
        store.insert_waitlist(&entry).await.unwrap();

        store
            .update_waitlist_status(entry.id, WaitlistStatus::Archived)
            .await
            .unwrap();

        assert!(store
            .list_waitlist(Some(WaitlistStatus::Active))
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            store
                .list_waitlist(Some(WaitlistStatus::Archived))
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn waitlist_status_update_unknown_id_is_not_found() {
        let store = LibSqlStore::new_memory().await.unwrap();
        let err = store
            .update_waitlist_status(Uuid::new_v4(), WaitlistStatus::Archived)
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[tokio::test]
    async fn location_roundtrip_preserves_zip_list() {
        let store = LibSqlStore::new_memory().await.unwrap();
        let location = ServiceLocation::new(crate::store::model::NewServiceLocation {
            city: "Yulee".into(),
            state: "FL".into(),
            zip_codes: vec!["32097".into(), "32034".into()],
            launch_date: None,
            active: true,
        });
        store.insert_location(&location).await.unwrap();

        let listed = store.list_locations().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].zip_codes, vec!["32097", "32034"]);
        assert!(listed[0].active);

        store.delete_location(location.id).await.unwrap();
        assert!(store.list_locations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn submission_links_coalesce() {
        let store = LibSqlStore::new_memory().await.unwrap();
        let submission = crate::onboarding::model::sample_submission_for_tests();
        store.insert_submission(&submission).await.unwrap();

        store
            .update_submission_links(submission.id, Some("acct_1"), None, None, None)
            .await
            .unwrap();
        store
            .update_submission_links(submission.id, None, Some("cs_1"), Some("https://pay"), None)
            .await
            .unwrap();

        let loaded = store.get_submission(submission.id).await.unwrap().unwrap();
        // First write must survive the second partial update.
        assert_eq!(loaded.auth_account_id.as_deref(), Some("acct_1"));
        assert_eq!(loaded.stripe_session_id.as_deref(), Some("cs_1"));
        assert_eq!(loaded.checkout_url.as_deref(), Some("https://pay"));
    }

    #[tokio::test]
    async fn submission_lookup_by_email_returns_latest() {
        let store = LibSqlStore::new_memory().await.unwrap();
        let mut first = crate::onboarding::model::sample_submission_for_tests();
        first.created_at = Utc::now() - chrono::Duration::minutes(5);
        store.insert_submission(&first).await.unwrap();

        let second = crate::onboarding::model::sample_submission_for_tests();
        store.insert_submission(&second).await.unwrap();

        let found = store
            .get_submission_by_email(&second.email)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, second.id);
    }

    #[tokio::test]
    async fn charges_sum_only_succeeded() {
        let store = LibSqlStore::new_memory().await.unwrap();
        let customer = Customer {
            id: Uuid::new_v4(),
            name: "Jordan Reyes".into(),
            email: "jordan@example.com".into(),
            phone: None,
            stripe_customer_id: None,
            created_at: Utc::now(),
        };
        store.insert_customer(&customer).await.unwrap();

        for (amount, status) in [
            ("110.00", ChargeStatus::Succeeded),
            ("110.00", ChargeStatus::Succeeded),
            ("90.00", ChargeStatus::Failed),
        ] {
            store
                .insert_charge(&Charge {
                    id: Uuid::new_v4(),
                    customer_id: customer.id,
                    amount: amount.parse().unwrap(),
                    currency: "usd".into(),
                    external_id: None,
                    status,
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }

        let total = store.total_charged(customer.id).await.unwrap();
        assert_eq!(total, "220.00".parse::<Decimal>().unwrap());
    }
}
