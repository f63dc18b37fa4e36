//! QR code tickets.
//!
//! Each registrant gets a QR code whose text lists their name, email,
//! registration ID and phone number. The image is rendered straight into
//! memory as PNG.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, Luma};
use qrcode::QrCode;

use crate::error::Result;

/// MIME type of every generated image.
pub const PNG_MIME_TYPE: &str = "image/png";

/// Build the text encoded in a registrant's QR code.
#[must_use]
pub fn payload(name: &str, email: &str, id: i64, phone: &str) -> String {
    format!("\nName: {name}\nEmail: {email}\nCodeX ID: {id}\nPhone Number: {phone}")
}

/// A rendered QR code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrImage {
    png: Vec<u8>,
}

impl QrImage {
    /// The PNG-encoded image.
    #[must_use]
    pub fn png(&self) -> &[u8] {
        &self.png
    }

    /// Consume the image, returning the PNG bytes.
    #[must_use]
    pub fn into_png(self) -> Vec<u8> {
        self.png
    }

    /// The PNG bytes, base64-encoded with the standard alphabet.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.png)
    }

    /// A `data:` URI suitable for an `<img src>` attribute.
    #[must_use]
    pub fn data_uri(&self) -> String {
        format!("data:{PNG_MIME_TYPE};base64,{}", self.to_base64())
    }
}

/// Render the QR code for a registrant.
///
/// # Errors
///
/// Returns an error if the payload does not fit in a QR code or the image
/// cannot be encoded.
pub fn generate(name: &str, email: &str, id: i64, phone: &str) -> Result<QrImage> {
    encode(&payload(name, email, id, phone))
}

/// Render arbitrary text as a PNG QR code.
///
/// # Errors
///
/// Returns an error if the text does not fit in a QR code or the image
/// cannot be encoded.
pub fn encode(text: &str) -> Result<QrImage> {
    let code = QrCode::new(text.as_bytes())?;
    let image = code.render::<Luma<u8>>().module_dimensions(10, 10).build();

    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(QrImage { png })
}
