//! Environment-driven configuration.
//!
//! Each integration has its own config struct with a `from_env()` that
//! returns `None` when the integration's key variable is absent. A missing
//! credential disables that integration; callers degrade to a fallback
//! instead of failing hard.

use secrecy::SecretString;

/// Core server configuration (always present, with defaults).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Path to the libSQL database file.
    pub db_path: String,
    /// Path of the waitlist notification fallback log.
    pub fallback_log_path: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let db_path =
            std::env::var("SCOOPED_DB_PATH").unwrap_or_else(|_| "./data/scooped.db".to_string());

        let fallback_log_path = std::env::var("WAITLIST_FALLBACK_LOG")
            .unwrap_or_else(|_| "./waitlist-notifications.json".to_string());

        Self {
            port,
            db_path,
            fallback_log_path,
        }
    }
}

/// Admin bearer-token verification config.
#[derive(Clone)]
pub struct AdminAuthConfig {
    /// HS256 secret for verifying admin JWTs.
    pub jwt_secret: SecretString,
}

impl AdminAuthConfig {
    /// Returns `None` if `JWT_SECRET` is not set (admin API disabled).
    pub fn from_env() -> Option<Self> {
        let secret = std::env::var("JWT_SECRET").ok()?;
        Some(Self {
            jwt_secret: SecretString::from(secret),
        })
    }
}

/// Sweep&Go field-service API config.
#[derive(Clone)]
pub struct SweepAndGoConfig {
    pub api_token: SecretString,
    /// Organization slug used in pricing/onboarding URLs.
    pub organization_slug: String,
    pub base_url: String,
}

impl SweepAndGoConfig {
    /// Returns `None` if `SWEEPANDGO_API_TOKEN` is not set.
    pub fn from_env() -> Option<Self> {
        let api_token = std::env::var("SWEEPANDGO_API_TOKEN").ok()?;
        let organization_slug = std::env::var("SWEEPANDGO_ORGANIZATION_SLUG")
            .or_else(|_| std::env::var("SWEEPANDGO_ORGANIZATION_ID"))
            .unwrap_or_default();
        let base_url = std::env::var("SWEEPANDGO_BASE_URL")
            .unwrap_or_else(|_| "https://api.sweepandgo.com/api/v2".to_string());

        Some(Self {
            api_token: SecretString::from(api_token),
            organization_slug,
            base_url,
        })
    }
}

/// Stripe checkout config.
#[derive(Clone)]
pub struct StripeConfig {
    pub secret_key: SecretString,
    pub base_url: String,
    /// Where the hosted checkout sends the customer afterwards.
    pub success_url: String,
    pub cancel_url: String,
}

impl StripeConfig {
    /// Returns `None` if `STRIPE_SECRET_KEY` is not set.
    pub fn from_env() -> Option<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY").ok()?;
        let base_url = std::env::var("STRIPE_BASE_URL")
            .unwrap_or_else(|_| "https://api.stripe.com/v1".to_string());
        let site = std::env::var("SITE_URL").unwrap_or_else(|_| "http://localhost:3000".into());

        Some(Self {
            secret_key: SecretString::from(secret_key),
            base_url,
            success_url: format!("{site}/onboarding/success"),
            cancel_url: format!("{site}/onboarding"),
        })
    }
}

/// Supabase auth (account creation) config.
#[derive(Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub service_role_key: SecretString,
}

impl SupabaseConfig {
    /// Returns `None` unless both `SUPABASE_URL` and
    /// `SUPABASE_SERVICE_ROLE_KEY` are set.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("SUPABASE_URL").ok()?;
        let key = std::env::var("SUPABASE_SERVICE_ROLE_KEY").ok()?;
        Some(Self {
            url,
            service_role_key: SecretString::from(key),
        })
    }
}

/// SMTP config for waitlist notification email (MailerSend relay).
#[derive(Debug, Clone)]
pub struct MailerConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    /// Where waitlist notifications are delivered.
    pub notify_address: String,
}

impl MailerConfig {
    /// Returns `None` if `MAILERSEND_SMTP_USER` is not set (email disabled,
    /// fallback log only).
    pub fn from_env() -> Option<Self> {
        let username = std::env::var("MAILERSEND_SMTP_USER").ok()?;
        let password = std::env::var("MAILERSEND_SMTP_PASS").unwrap_or_default();

        let smtp_host = std::env::var("MAILERSEND_SMTP_HOST")
            .unwrap_or_else(|_| "smtp.mailersend.net".to_string());
        let smtp_port: u16 = std::env::var("MAILERSEND_SMTP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(587);

        let from_address =
            std::env::var("MAILERSEND_FROM_ADDRESS").unwrap_or_else(|_| username.clone());
        let notify_address =
            std::env::var("WAITLIST_NOTIFY_ADDRESS").unwrap_or_else(|_| from_address.clone());

        Some(Self {
            smtp_host,
            smtp_port,
            username,
            password,
            from_address,
            notify_address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_defaults() {
        // No PORT/SCOOPED_DB_PATH set in the test environment.
        let cfg = ServerConfig::from_env();
        assert_eq!(cfg.port, 3000);
        assert!(cfg.db_path.ends_with("scooped.db"));
    }
}
