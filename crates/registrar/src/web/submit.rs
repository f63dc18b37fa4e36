//! `POST /submit`: register, render the QR code, send the confirmation.

use axum::{
    extract::{Form, State},
    response::Html,
};
use serde::Deserialize;
use tracing::info;

use super::{pages::escape_html, AppState};
use crate::config::EventConfig;
use crate::error::{Error, Result, UniqueField};
use crate::mail::{Attachment, OutgoingMail, Recipient};
use crate::qr::{self, QrImage, PNG_MIME_TYPE};
use crate::registrant::{NewRegistrant, Registrant};

/// Fields posted by the registration form.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionForm {
    /// Registrant name.
    pub name: String,
    /// Registrant email.
    pub email: String,
    /// Phone number as typed.
    pub phone_number: String,
    /// Department code.
    pub department: String,
    /// Optional partner's name.
    #[serde(default)]
    pub name_second_person: Option<String>,
    /// Optional partner's email.
    #[serde(default)]
    pub email_second_person: Option<String>,
}

/// Handle a registration.
///
/// The record is committed before the email goes out; a delivery failure
/// produces a 500 but leaves the registration in place.
///
/// # Errors
///
/// Rejected input and duplicates map to 4xx responses; QR or mail failures
/// map to an opaque 500.
pub async fn submit(
    State(state): State<AppState>,
    Form(form): Form<SubmissionForm>,
) -> Result<Html<String>> {
    let phone_text = form.phone_number.trim().to_string();
    let new = match NewRegistrant::from_form(
        &form.name,
        &form.email,
        &form.phone_number,
        &form.department,
    ) {
        Ok(new) => new,
        Err(err) => {
            // A known email is reported ahead of malformed fields.
            let email = form.email.clone();
            if state.storage.run(move |s| s.email_registered(&email)).await? {
                return Err(Error::duplicate(UniqueField::Email, form.email));
            }
            return Err(err);
        }
    };
    let registrant = match state.storage.run(move |s| s.register(new)).await {
        Ok(registrant) => registrant,
        Err(Error::Duplicate {
            field: UniqueField::Phone,
            ..
        }) => return Err(Error::duplicate(UniqueField::Phone, phone_text)),
        Err(err) => return Err(err),
    };
    info!(
        id = registrant.id,
        department = registrant.department.code(),
        "Registered {}",
        registrant.email
    );

    let qr = qr::generate(
        &registrant.name,
        &registrant.email,
        registrant.id,
        &phone_text,
    )?;

    let secondary = Recipient::optional(
        form.email_second_person.as_deref(),
        form.name_second_person.as_deref(),
    );
    let mail = confirmation_mail(&state.event, &registrant, secondary, &qr);
    let delivery = state.notifier.send(&mail).await?;
    info!(
        id = registrant.id,
        status = delivery.status,
        message_id = delivery.message_id.as_deref().unwrap_or("-"),
        "Confirmation sent"
    );

    Ok(Html(success_page(&qr)))
}

/// Subject line of the confirmation email.
#[must_use]
pub fn subject(event: &EventConfig, id: i64) -> String {
    format!("Registration for {} - ID {id}", event.name)
}

/// HTML body of the confirmation email.
#[must_use]
pub fn html_body(event: &EventConfig, names: &str) -> String {
    format!(
        "<img src='{}'>\n<hr>\n{}, your registration is done!\n<br/>\nA QR code has been attached below!\n<br/>\nYou're <b>required</b> to present this on the day of the event.",
        escape_html(&event.banner_url),
        escape_html(names),
    )
}

/// Build the confirmation email for a fresh registration.
#[must_use]
pub fn confirmation_mail(
    event: &EventConfig,
    registrant: &Registrant,
    secondary: Option<Recipient>,
    qr: &QrImage,
) -> OutgoingMail {
    let mut mail = OutgoingMail {
        to: Recipient::new(&registrant.email, &registrant.name),
        secondary,
        subject: subject(event, registrant.id),
        html_body: String::new(),
        attachment: Attachment {
            filename: event.attachment_name.clone(),
            mime_type: PNG_MIME_TYPE.to_string(),
            content: qr.png().to_vec(),
        },
    };
    mail.html_body = html_body(event, &mail.display_names());
    mail
}

fn success_page(qr: &QrImage) -> String {
    format!(
        "Please save this QR Code. It has also been emailed to you.<br><img src=\"{}\"/>",
        qr.data_uri()
    )
}
