//! SMTP email delivery for notification messages.
//!
//! Settings come from the tenant's `tenant_email_settings` row, not the
//! environment — each tenant configures its own relay. A tenant with no
//! row, or with a blank host, has email delivery unconfigured.

use stateline_db::models::tenant::EmailSettingsRow;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// TenantEmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS) when the stored port is unusable.
const DEFAULT_SMTP_PORT: u16 = 587;

/// Validated SMTP configuration for one tenant.
#[derive(Debug, Clone)]
pub struct TenantEmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl TenantEmailConfig {
    /// Build from a settings row. Returns `None` when the host is empty or
    /// whitespace — the tenant has not configured email delivery.
    pub fn from_settings(row: &EmailSettingsRow) -> Option<Self> {
        let smtp_host = row.smtp_host.trim();
        if smtp_host.is_empty() {
            return None;
        }
        Some(Self {
            smtp_host: smtp_host.to_string(),
            smtp_port: u16::try_from(row.smtp_port).unwrap_or(DEFAULT_SMTP_PORT),
            from_address: row.from_address.clone(),
            smtp_user: row.smtp_user.clone(),
            smtp_password: row.smtp_password.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// EmailDelivery
// ---------------------------------------------------------------------------

/// Sends plain-text notification emails via the tenant's SMTP relay.
pub struct EmailDelivery {
    config: TenantEmailConfig,
}

impl EmailDelivery {
    pub fn new(config: TenantEmailConfig) -> Self {
        Self { config }
    }

    /// Send one email to one recipient.
    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError> {
        use lettre::{
            message::header::ContentType, transport::smtp::authentication::Credentials,
            AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
        };

        let email = Message::builder()
            .from(self.config.from_address.parse()?)
            .to(to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| EmailError::Build(e.to_string()))?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)?
                .port(self.config.smtp_port);

        if let (Some(user), Some(pass)) = (&self.config.smtp_user, &self.config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let mailer = transport_builder.build();
        mailer.send(email).await?;

        tracing::info!(to, "Notification email sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(host: &str) -> EmailSettingsRow {
        EmailSettingsRow {
            tenant_id: "acme".to_string(),
            smtp_host: host.to_string(),
            smtp_port: 587,
            from_address: "noreply@acme.example".to_string(),
            smtp_user: None,
            smtp_password: None,
        }
    }

    #[test]
    fn blank_host_means_unconfigured() {
        assert!(TenantEmailConfig::from_settings(&settings("")).is_none());
        assert!(TenantEmailConfig::from_settings(&settings("   ")).is_none());
        assert!(TenantEmailConfig::from_settings(&settings("\t\n")).is_none());
    }

    #[test]
    fn host_is_trimmed() {
        let config = TenantEmailConfig::from_settings(&settings(" smtp.acme.example "))
            .expect("host is configured");
        assert_eq!(config.smtp_host, "smtp.acme.example");
        assert_eq!(config.smtp_port, 587);
    }

    #[test]
    fn out_of_range_port_falls_back_to_default() {
        let mut row = settings("smtp.acme.example");
        row.smtp_port = -1;
        let config = TenantEmailConfig::from_settings(&row).expect("host is configured");
        assert_eq!(config.smtp_port, DEFAULT_SMTP_PORT);
    }

    #[test]
    fn email_error_display_build() {
        let err = EmailError::Build("missing body".to_string());
        assert_eq!(err.to_string(), "Email build error: missing body");
    }
}
