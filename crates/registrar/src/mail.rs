//! Outbound email.
//!
//! Registrations are confirmed by email with the QR code attached. Sending
//! goes through the [`Notifier`] trait so handlers can be exercised without
//! a real provider; [`SendGridNotifier`] talks to the `SendGrid` v3 API.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::MailConfig;
use crate::error::{Error, Result};

/// An email address with a display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    /// Email address.
    pub email: String,
    /// Display name.
    pub name: String,
}

impl Recipient {
    /// Create a recipient.
    #[must_use]
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
        }
    }

    /// Build an optional recipient from form fields.
    ///
    /// Returns `None` unless both fields are non-blank.
    #[must_use]
    pub fn optional(email: Option<&str>, name: Option<&str>) -> Option<Self> {
        let email = email.map(str::trim).filter(|s| !s.is_empty())?;
        let name = name.map(str::trim).filter(|s| !s.is_empty())?;
        Some(Self::new(email, name))
    }
}

/// A binary file attached to an email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name shown to the recipient.
    pub filename: String,
    /// MIME type.
    pub mime_type: String,
    /// Raw contents.
    pub content: Vec<u8>,
}

/// A single email ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    /// Primary recipient.
    pub to: Recipient,
    /// Optional second recipient, delivered as its own personalization.
    pub secondary: Option<Recipient>,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html_body: String,
    /// The single attachment.
    pub attachment: Attachment,
}

impl OutgoingMail {
    /// Names of every recipient joined as `"primary, secondary"`.
    #[must_use]
    pub fn display_names(&self) -> String {
        match &self.secondary {
            Some(secondary) => format!("{}, {}", self.to.name, secondary.name),
            None => self.to.name.clone(),
        }
    }
}

/// What the provider answered for an accepted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// HTTP status code.
    pub status: u16,
    /// Provider message ID, when one was returned.
    pub message_id: Option<String>,
}

/// Sends registration emails.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug {
    /// Send one email.
    ///
    /// # Errors
    ///
    /// Returns an error if the message could not be handed to the provider.
    /// No retry is attempted.
    async fn send(&self, mail: &OutgoingMail) -> Result<Delivery>;
}

/// [`Notifier`] backed by the `SendGrid` v3 mail send API.
#[derive(Debug, Clone)]
pub struct SendGridNotifier {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from_email: String,
}

impl SendGridNotifier {
    /// Create a notifier from explicit settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        api_base_url: &str,
        api_key: impl Into<String>,
        from_email: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/v3/mail/send", api_base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            from_email: from_email.into(),
        })
    }

    /// Create a notifier from the mail section of the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the sender or API key is missing, or the HTTP
    /// client cannot be built.
    pub fn from_config(config: &MailConfig) -> Result<Self> {
        let (from_email, api_key) = config.credentials()?;
        Self::new(&config.api_base_url, api_key, from_email, config.timeout())
    }

    /// The URL messages are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body<'a>(&'a self, mail: &'a OutgoingMail) -> SendRequest<'a> {
        let mut personalizations = vec![Personalization {
            to: vec![Address::from(&mail.to)],
        }];
        if let Some(secondary) = &mail.secondary {
            personalizations.push(Personalization {
                to: vec![Address::from(secondary)],
            });
        }

        SendRequest {
            personalizations,
            from: Address {
                email: &self.from_email,
                name: None,
            },
            subject: &mail.subject,
            content: vec![Content {
                kind: "text/html",
                value: &mail.html_body,
            }],
            attachments: vec![AttachmentBody {
                content: STANDARD.encode(&mail.attachment.content),
                kind: &mail.attachment.mime_type,
                filename: &mail.attachment.filename,
            }],
        }
    }
}

#[async_trait::async_trait]
impl Notifier for SendGridNotifier {
    async fn send(&self, mail: &OutgoingMail) -> Result<Delivery> {
        debug!("Sending \"{}\" to {}", mail.subject, mail.to.email);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(mail))
            .send()
            .await?;

        let status = response.status();
        let message_id = response
            .headers()
            .get("x-message-id")
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let body = response.text().await?;

        if !status.is_success() {
            warn!("Mail provider returned {}: {}", status, body);
            return Err(Error::MailRejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(
            "Mail to {} accepted with status {} (message id {:?})",
            mail.to.email,
            status.as_u16(),
            message_id
        );
        if !body.is_empty() {
            debug!("Mail provider response body: {}", body);
        }

        Ok(Delivery {
            status: status.as_u16(),
            message_id,
        })
    }
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    subject: &'a str,
    content: Vec<Content<'a>>,
    attachments: Vec<AttachmentBody<'a>>,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

impl<'a> From<&'a Recipient> for Address<'a> {
    fn from(recipient: &'a Recipient) -> Self {
        Self {
            email: &recipient.email,
            name: Some(&recipient.name),
        }
    }
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct AttachmentBody<'a> {
    content: String,
    #[serde(rename = "type")]
    kind: &'a str,
    filename: &'a str,
}
