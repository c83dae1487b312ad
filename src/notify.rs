//! Waitlist signup notifications: SMTP via lettre, with a flat JSON file
//! as an at-least-once durable fallback log.
//!
//! The fallback file is a backup channel, not a primary store: every signup
//! already lives in the database by the time a notification is attempted.

use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{info, warn};

use crate::config::MailerConfig;
use crate::error::NotifyError;
use crate::store::model::WaitlistSubmission;

/// Notifier for new waitlist signups.
pub struct WaitlistNotifier {
    mailer: Option<MailerConfig>,
    fallback_path: PathBuf,
}

impl WaitlistNotifier {
    pub fn new(mailer: Option<MailerConfig>, fallback_path: impl Into<PathBuf>) -> Self {
        Self {
            mailer,
            fallback_path: fallback_path.into(),
        }
    }

    /// Notify about a new signup. Tries SMTP first; on any failure (or when
    /// SMTP is unconfigured) appends to the fallback log. Never propagates
    /// a delivery failure to the signup request itself.
    pub fn notify(&self, entry: &WaitlistSubmission) {
        if let Some(config) = &self.mailer {
            match send_email(config, entry) {
                Ok(()) => {
                    info!(id = %entry.id, "Waitlist notification email sent");
                    return;
                }
                Err(e) => {
                    warn!(error = %e, id = %entry.id, "Notification email failed, using fallback log");
                }
            }
        }

        if let Err(e) = append_fallback(&self.fallback_path, entry) {
            warn!(error = %e, id = %entry.id, "Fallback log write failed");
        }
    }
}

/// Build and send the notification email over SMTP.
fn send_email(config: &MailerConfig, entry: &WaitlistSubmission) -> Result<(), NotifyError> {
    let creds = Credentials::new(config.username.clone(), config.password.clone());

    let transport = SmtpTransport::relay(&config.smtp_host)
        .map_err(|e| NotifyError::Smtp(format!("SMTP relay error: {e}")))?
        .port(config.smtp_port)
        .credentials(creds)
        .build();

    let body = format!(
        "New waitlist signup\n\n\
         Name: {}\nEmail: {}\nPhone: {}\nAddress: {}\nZip: {}\nDogs: {}\n\
         Urgency: {}\nReferral: {}\n",
        entry.name,
        entry.email,
        entry.phone.as_deref().unwrap_or("-"),
        entry.address,
        entry.zip_code,
        entry.dog_count,
        entry.urgency.as_deref().unwrap_or("-"),
        entry.referral_source.as_deref().unwrap_or("-"),
    );

    let email = Message::builder()
        .from(
            config
                .from_address
                .parse()
                .map_err(|e| NotifyError::Address(format!("from address: {e}")))?,
        )
        .to(config
            .notify_address
            .parse()
            .map_err(|e| NotifyError::Address(format!("notify address: {e}")))?)
        .subject(format!("Waitlist signup: {} ({})", entry.name, entry.zip_code))
        .body(body)
        .map_err(|e| NotifyError::Smtp(format!("Failed to build email: {e}")))?;

    transport
        .send(&email)
        .map_err(|e| NotifyError::Smtp(format!("SMTP send failed: {e}")))?;

    Ok(())
}

/// Append the signup to the fallback log, one JSON record per line.
fn append_fallback(path: &Path, entry: &WaitlistSubmission) -> Result<(), NotifyError> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    let line = serde_json::to_string(entry)
        .map_err(|e| NotifyError::Smtp(format!("serialize: {e}")))?;
    writeln!(file, "{line}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::model::{DogCount, NewWaitlistSubmission};

    fn sample() -> WaitlistSubmission {
        WaitlistSubmission::new(NewWaitlistSubmission {
            name: "Jordan Reyes".into(),
            email: "jordan@example.com".into(),
            address: "12 Fernandina Ct".into(),
            zip_code: "32097".into(),
            phone: None,
            dog_count: DogCount::One,
            referral_source: None,
            urgency: None,
            last_cleaned: None,
            preferred_plan: None,
            sms_opt_in: false,
        })
    }

    #[test]
    fn unconfigured_mailer_appends_to_fallback_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("waitlist-notifications.json");
        let notifier = WaitlistNotifier::new(None, &path);

        notifier.notify(&sample());
        notifier.notify(&sample());

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: WaitlistSubmission = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.zip_code, "32097");
    }

    #[test]
    fn fallback_log_failure_does_not_panic() {
        // Directory path can't be opened for append; notify must swallow it.
        let dir = tempfile::tempdir().unwrap();
        let notifier = WaitlistNotifier::new(None, dir.path());
        notifier.notify(&sample());
    }
}
