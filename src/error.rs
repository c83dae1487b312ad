//! Error types for the Scooped backend.

use std::time::Duration;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Integration error: {0}")]
    Integration(#[from] IntegrationError),

    #[error("Onboarding error: {0}")]
    Onboarding(#[from] OnboardingError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors from external SaaS integrations (Sweep&Go, Stripe, Supabase).
#[derive(Debug, thiserror::Error)]
pub enum IntegrationError {
    #[error("{service} is not configured")]
    NotConfigured { service: String },

    #[error("{service} request failed: {reason}")]
    RequestFailed { service: String, reason: String },

    #[error("{service} returned an invalid response: {reason}")]
    InvalidResponse { service: String, reason: String },

    #[error("{service} authentication failed")]
    AuthFailed { service: String },

    #[error("{service} call timed out after {budget:?}")]
    Timeout { service: String, budget: Duration },
}

impl IntegrationError {
    /// Name of the integration this error came from.
    pub fn service(&self) -> &str {
        match self {
            Self::NotConfigured { service }
            | Self::RequestFailed { service, .. }
            | Self::InvalidResponse { service, .. }
            | Self::AuthFailed { service }
            | Self::Timeout { service, .. } => service,
        }
    }
}

/// Orchestration errors from the multi-step onboarding flow.
#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    #[error("Cannot transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Account step failed: {0}")]
    Account(#[source] IntegrationError),

    #[error("Checkout step failed: {0}")]
    Checkout(#[source] IntegrationError),

    #[error("Submission {id} not found")]
    SubmissionNotFound { id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage failure: {0}")]
    Storage(#[source] DatabaseError),
}

/// Notification delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("SMTP send failed: {0}")]
    Smtp(String),

    #[error("Invalid address: {0}")]
    Address(String),

    #[error("Fallback log write failed: {0}")]
    FallbackLog(#[from] std::io::Error),
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
