//! Item image references.
//!
//! An image is stored as an opaque string: either a direct `http(s)` URL or
//! an embedded `data:image/<subtype>;base64,<payload>` URL produced from an
//! upload by `encode_image`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, ValueObject};

/// Largest raw upload accepted by `encode_image`.
pub const MAX_IMAGE_INPUT_BYTES: usize = 5 * 1024 * 1024;

/// Largest embedded data URL (after base64 encoding) accepted anywhere.
pub const MAX_ENCODED_IMAGE_BYTES: usize = 900 * 1024;

const MAX_URL_BYTES: usize = 2048;
const DATA_PREFIX: &str = "data:image/";
const BASE64_MARKER: &str = ";base64,";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageRef(String);

impl ValueObject for ImageRef {}

impl ImageRef {
    pub fn parse(raw: impl AsRef<str>) -> DomainResult<Self> {
        let raw = raw.as_ref().trim();
        if raw.starts_with(DATA_PREFIX) {
            validate_data_url(raw)?;
        } else if raw.starts_with("https://") || raw.starts_with("http://") {
            validate_url(raw)?;
        } else {
            return Err(DomainError::validation(
                "image must be an http(s) URL or an embedded data:image URL",
            ));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_embedded(&self) -> bool {
        self.0.starts_with(DATA_PREFIX)
    }
}

impl TryFrom<String> for ImageRef {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ImageRef> for String {
    fn from(value: ImageRef) -> Self {
        value.0
    }
}

/// Convert an uploaded image into an embedded data URL.
///
/// `content_type` must be `image/*` (parameters after `;` are ignored). The
/// upload is capped at `MAX_IMAGE_INPUT_BYTES` and the encoded result at
/// `MAX_ENCODED_IMAGE_BYTES`.
pub fn encode_image(bytes: &[u8], content_type: &str) -> DomainResult<ImageRef> {
    if bytes.is_empty() {
        return Err(DomainError::validation("image upload is empty"));
    }
    if bytes.len() > MAX_IMAGE_INPUT_BYTES {
        return Err(DomainError::validation(format!(
            "image upload is {} bytes, limit is {MAX_IMAGE_INPUT_BYTES}",
            bytes.len()
        )));
    }

    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let subtype = mime
        .strip_prefix("image/")
        .filter(|s| is_mime_token(s))
        .ok_or_else(|| {
            DomainError::validation(format!("content type {content_type:?} is not an image"))
        })?;

    let encoded = format!("{DATA_PREFIX}{subtype}{BASE64_MARKER}{}", STANDARD.encode(bytes));
    if encoded.len() > MAX_ENCODED_IMAGE_BYTES {
        return Err(DomainError::validation(format!(
            "encoded image is {} bytes, limit is {MAX_ENCODED_IMAGE_BYTES}; upload a smaller image",
            encoded.len()
        )));
    }
    Ok(ImageRef(encoded))
}

fn validate_url(raw: &str) -> DomainResult<()> {
    if raw.len() > MAX_URL_BYTES {
        return Err(DomainError::validation(format!(
            "image URL must be at most {MAX_URL_BYTES} bytes"
        )));
    }
    let host = raw.split_once("://").map(|(_, rest)| rest).unwrap_or_default();
    if host.is_empty() || raw.chars().any(char::is_whitespace) {
        return Err(DomainError::validation("image URL is malformed"));
    }
    Ok(())
}

fn validate_data_url(raw: &str) -> DomainResult<()> {
    if raw.len() > MAX_ENCODED_IMAGE_BYTES {
        return Err(DomainError::validation(format!(
            "embedded image is {} bytes, limit is {MAX_ENCODED_IMAGE_BYTES}",
            raw.len()
        )));
    }
    let rest = &raw[DATA_PREFIX.len()..];
    let (subtype, payload) = rest
        .split_once(BASE64_MARKER)
        .ok_or_else(|| DomainError::validation("embedded image must be base64 encoded"))?;
    if !is_mime_token(subtype) {
        return Err(DomainError::validation("embedded image has an invalid media type"));
    }
    if payload.is_empty() || STANDARD.decode(payload).is_err() {
        return Err(DomainError::validation("embedded image payload is not valid base64"));
    }
    Ok(())
}

fn is_mime_token(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-'))
}
