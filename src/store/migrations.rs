//! Version-tracked database migrations for the libSQL backend.
//!
//! Each migration has a version number and SQL. `run_migrations()` checks
//! the current version and applies only the new ones sequentially.

use libsql::Connection;

use crate::error::DatabaseError;

/// A single migration step.
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. Add new versions to the end.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: r#"
            CREATE TABLE IF NOT EXISTS waitlist (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                address TEXT NOT NULL,
                zip_code TEXT NOT NULL,
                phone TEXT,
                dog_count TEXT NOT NULL,
                referral_source TEXT,
                urgency TEXT,
                last_cleaned TEXT,
                preferred_plan TEXT,
                sms_opt_in INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'active',
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_waitlist_status ON waitlist(status);
            CREATE INDEX IF NOT EXISTS idx_waitlist_zip ON waitlist(zip_code);

            CREATE TABLE IF NOT EXISTS service_locations (
                id TEXT PRIMARY KEY,
                city TEXT NOT NULL,
                state TEXT NOT NULL,
                zip_codes TEXT NOT NULL,
                launch_date TEXT,
                active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_locations_active ON service_locations(active);

            CREATE TABLE IF NOT EXISTS onboarding_submissions (
                id TEXT PRIMARY KEY,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                email TEXT NOT NULL,
                phone TEXT NOT NULL,
                address TEXT NOT NULL,
                city TEXT NOT NULL,
                zip_code TEXT NOT NULL,
                dog_count TEXT NOT NULL,
                service_frequency TEXT NOT NULL,
                last_cleaned TEXT,
                notify_on_the_way INTEGER NOT NULL DEFAULT 0,
                notify_on_completion INTEGER NOT NULL DEFAULT 0,
                gate_code TEXT,
                community_access_notes TEXT,
                dog_names TEXT NOT NULL DEFAULT '[]',
                coupon_code TEXT,
                quoted_monthly TEXT,
                sweepandgo_client_id TEXT,
                sweepandgo_payload TEXT,
                auth_account_id TEXT,
                stripe_session_id TEXT,
                checkout_url TEXT,
                status TEXT NOT NULL DEFAULT 'new',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_submissions_status ON onboarding_submissions(status);
            CREATE INDEX IF NOT EXISTS idx_submissions_email ON onboarding_submissions(email);
        "#,
    },
    Migration {
        version: 2,
        name: "crm_skeleton",
        sql: r#"
            CREATE TABLE IF NOT EXISTS customers (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                phone TEXT,
                stripe_customer_id TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_customers_email ON customers(email);

            CREATE TABLE IF NOT EXISTS subscriptions (
                id TEXT PRIMARY KEY,
                customer_id TEXT NOT NULL REFERENCES customers(id) ON DELETE CASCADE,
                frequency TEXT NOT NULL,
                dog_count TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'active',
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_subscriptions_customer ON subscriptions(customer_id);

            CREATE TABLE IF NOT EXISTS visits (
                id TEXT PRIMARY KEY,
                subscription_id TEXT NOT NULL REFERENCES subscriptions(id) ON DELETE CASCADE,
                scheduled_for TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'scheduled'
            );
            CREATE INDEX IF NOT EXISTS idx_visits_subscription ON visits(subscription_id);

            CREATE TABLE IF NOT EXISTS charges (
                id TEXT PRIMARY KEY,
                customer_id TEXT NOT NULL REFERENCES customers(id) ON DELETE CASCADE,
                amount TEXT NOT NULL,
                currency TEXT NOT NULL DEFAULT 'usd',
                external_id TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_charges_customer ON charges(customer_id);
            CREATE INDEX IF NOT EXISTS idx_charges_status ON charges(status);
        "#,
    },
];

/// Run all pending migrations against the given connection.
///
/// Creates the `_migrations` table if it doesn't exist.
pub async fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        (),
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("Failed to create _migrations table: {e}")))?;

    let current_version = get_current_version(conn).await?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current_version) {
        conn.execute_batch(migration.sql)
            .await
            .map_err(|e| {
                DatabaseError::Migration(format!(
                    "Migration v{} ({}) failed: {e}",
                    migration.version, migration.name
                ))
            })?;

        conn.execute(
            "INSERT INTO _migrations (version, name) VALUES (?1, ?2)",
            libsql::params![migration.version, migration.name],
        )
        .await
        .map_err(|e| {
            DatabaseError::Migration(format!(
                "Failed to record migration v{}: {e}",
                migration.version
            ))
        })?;

        tracing::info!(
            version = migration.version,
            name = migration.name,
            "Applied migration"
        );
    }

    Ok(())
}

/// Highest applied migration version, or 0 for a fresh database.
async fn get_current_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to read migration state: {e}")))?;

    match rows
        .next()
        .await
        .map_err(|e| DatabaseError::Migration(e.to_string()))?
    {
        Some(row) => Ok(row.get::<i64>(0).unwrap_or(0)),
        None => Ok(0),
    }
}
