//! Supabase auth client: admin-API account creation with the
//! idempotent-by-email lookup that makes onboarding retries safe.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::config::SupabaseConfig;
use crate::error::IntegrationError;
use crate::onboarding::{AccountRef, AuthProvider};

const SERVICE: &str = "supabase";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

/// Supabase admin-API client.
pub struct SupabaseClient {
    config: SupabaseConfig,
    client: reqwest::Client,
}

impl SupabaseClient {
    pub fn new(config: SupabaseConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    fn admin_users_url(&self) -> String {
        format!("{}/auth/v1/admin/users", self.config.url)
    }

    fn auth_headers(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", self.config.service_role_key.expose_secret())
            .bearer_auth(self.config.service_role_key.expose_secret())
    }

    /// Look up an existing account by email.
    async fn find_by_email(&self, email: &str) -> Result<Option<String>, IntegrationError> {
        #[derive(Deserialize)]
        struct UsersPage {
            users: Vec<UserRecord>,
        }
        #[derive(Deserialize)]
        struct UserRecord {
            id: String,
            email: Option<String>,
        }

        let resp = self
            .auth_headers(self.client.get(self.admin_users_url()))
            .query(&[("email", email)])
            .send()
            .await
            .map_err(|e| request_failed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(request_failed(format!("status {}", resp.status())));
        }

        let page: UsersPage = resp
            .json()
            .await
            .map_err(|e| invalid_response(e.to_string()))?;

        Ok(page
            .users
            .into_iter()
            .find(|u| u.email.as_deref() == Some(email))
            .map(|u| u.id))
    }
}

fn request_failed(reason: String) -> IntegrationError {
    IntegrationError::RequestFailed {
        service: SERVICE.into(),
        reason,
    }
}

fn invalid_response(reason: String) -> IntegrationError {
    IntegrationError::InvalidResponse {
        service: SERVICE.into(),
        reason,
    }
}

#[async_trait]
impl AuthProvider for SupabaseClient {
    async fn ensure_account(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AccountRef, IntegrationError> {
        #[derive(Deserialize)]
        struct CreatedUser {
            id: String,
        }

        let body = serde_json::json!({
            "email": email,
            "password": password.expose_secret(),
            "email_confirm": true,
        });

        let resp = self
            .auth_headers(self.client.post(self.admin_users_url()))
            .json(&body)
            .send()
            .await
            .map_err(|e| request_failed(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            let created: CreatedUser = resp
                .json()
                .await
                .map_err(|e| invalid_response(e.to_string()))?;
            info!(account_id = %created.id, "Auth account created");
            return Ok(AccountRef {
                id: created.id,
                existing: false,
            });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(IntegrationError::AuthFailed {
                service: SERVICE.into(),
            });
        }

        // 422 is how Supabase reports an already-registered email. Honor the
        // idempotency contract by finding and reusing the account.
        if status == reqwest::StatusCode::UNPROCESSABLE_ENTITY {
            if let Some(id) = self.find_by_email(email).await? {
                info!(account_id = %id, "Auth account already existed, reusing");
                return Ok(AccountRef { id, existing: true });
            }
        }

        let detail = resp.text().await.unwrap_or_default();
        Err(request_failed(format!("status {status}: {detail}")))
    }
}

/// Stand-in used when Supabase credentials are absent: generates a local
/// account id so the rest of the funnel keeps working in development.
pub struct OfflineAuth;

#[async_trait]
impl AuthProvider for OfflineAuth {
    async fn ensure_account(
        &self,
        email: &str,
        _password: &SecretString,
    ) -> Result<AccountRef, IntegrationError> {
        info!(email = %email, "Supabase not configured, issuing local account id");
        Ok(AccountRef {
            id: format!("local_{}", Uuid::new_v4()),
            existing: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offline_auth_issues_unique_local_ids() {
        let password = SecretString::from("pw");
        let a = OfflineAuth
            .ensure_account("a@example.com", &password)
            .await
            .unwrap();
        let b = OfflineAuth
            .ensure_account("a@example.com", &password)
            .await
            .unwrap();
        assert!(a.id.starts_with("local_"));
        assert_ne!(a.id, b.id);
        assert!(!a.existing);
    }
}
