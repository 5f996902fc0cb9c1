//! Payload extraction and HMAC signature verification.

use bytes::Bytes;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
use tracing::{debug, instrument};

use super::{CONTENT_TYPE_HEADER, SIGNATURE_256_HEADER, SIGNATURE_HEADER};
use crate::request::BufferedRequest;

const JSON_CONTENT_TYPE: &str = "application/json";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const FORM_PAYLOAD_FIELD: &str = "payload";

/// Reasons a delivery fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing signature header")]
    MissingSignature,

    #[error("malformed signature: {message}")]
    MalformedSignature { message: String },

    #[error("payload signature check failed")]
    SignatureMismatch,

    #[error("unsupported content type {content_type:?}")]
    UnsupportedContentType { content_type: String },

    #[error("form payload is missing the \"payload\" field")]
    MissingFormPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignatureAlgorithm {
    Sha256,
    Sha1,
}

impl SignatureAlgorithm {
    fn prefix(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha1 => "sha1",
        }
    }
}

/// Extracts webhook payload bytes from a delivery.
///
/// Two regimes exist. With a non-empty secret the body must carry a valid
/// HMAC signature. With an empty secret nothing is authenticated and the
/// payload is recovered purely from the content type; that mode is only safe
/// when the operator has explicitly opted into it.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadValidator;

impl PayloadValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate `request` and return its payload.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::MissingSignature`], [`ValidationError::MalformedSignature`]
    ///   or [`ValidationError::SignatureMismatch`] when a secret is configured and
    ///   the signature does not verify
    /// - [`ValidationError::UnsupportedContentType`] for anything other than JSON
    ///   or form-encoded bodies
    /// - [`ValidationError::MissingFormPayload`] for a form body without `payload`
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bytes::Bytes;
    /// use gitops_gateway_core::{webhook::PayloadValidator, BufferedRequest};
    ///
    /// let request = http::Request::builder()
    ///     .header("Content-Type", "application/json")
    ///     .body(Bytes::from_static(b"{}"))
    ///     .unwrap();
    ///
    /// let payload = PayloadValidator::new()
    ///     .validate(&BufferedRequest::new(request), b"")
    ///     .unwrap();
    /// assert_eq!(&payload[..], b"{}");
    /// ```
    #[instrument(skip(self, request, secret), fields(signed = !secret.is_empty()))]
    pub fn validate(
        &self,
        request: &BufferedRequest,
        secret: &[u8],
    ) -> Result<Bytes, ValidationError> {
        if !secret.is_empty() {
            verify_signature(request, secret)?;
        } else {
            debug!("No webhook secret configured, skipping signature verification");
        }

        extract_payload(request)
    }
}

fn verify_signature(request: &BufferedRequest, secret: &[u8]) -> Result<(), ValidationError> {
    let (algorithm, header_value) = match request.header(SIGNATURE_256_HEADER) {
        "" => match request.header(SIGNATURE_HEADER) {
            "" => return Err(ValidationError::MissingSignature),
            value => (SignatureAlgorithm::Sha1, value),
        },
        value => (SignatureAlgorithm::Sha256, value),
    };

    let signature = parse_signature(header_value, algorithm)?;
    let body = request.body();

    let verified = match algorithm {
        SignatureAlgorithm::Sha256 => {
            let mut mac = Hmac::<Sha256>::new_from_slice(secret).map_err(|e| {
                ValidationError::MalformedSignature {
                    message: e.to_string(),
                }
            })?;
            mac.update(body);
            mac.verify_slice(&signature).is_ok()
        }
        SignatureAlgorithm::Sha1 => {
            let mut mac = Hmac::<Sha1>::new_from_slice(secret).map_err(|e| {
                ValidationError::MalformedSignature {
                    message: e.to_string(),
                }
            })?;
            mac.update(body);
            mac.verify_slice(&signature).is_ok()
        }
    };

    if verified {
        Ok(())
    } else {
        Err(ValidationError::SignatureMismatch)
    }
}

fn parse_signature(value: &str, algorithm: SignatureAlgorithm) -> Result<Vec<u8>, ValidationError> {
    let (prefix, hex_digest) =
        value
            .split_once('=')
            .ok_or_else(|| ValidationError::MalformedSignature {
                message: "expected <algorithm>=<hex digest>".to_string(),
            })?;

    if prefix != algorithm.prefix() {
        return Err(ValidationError::MalformedSignature {
            message: format!("unexpected algorithm {prefix:?}"),
        });
    }

    hex::decode(hex_digest).map_err(|e| ValidationError::MalformedSignature {
        message: e.to_string(),
    })
}

fn extract_payload(request: &BufferedRequest) -> Result<Bytes, ValidationError> {
    let content_type = media_type(request.header(CONTENT_TYPE_HEADER));

    match content_type.as_str() {
        JSON_CONTENT_TYPE => Ok(request.body().clone()),
        FORM_CONTENT_TYPE => url::form_urlencoded::parse(request.body())
            .find(|(key, _)| key == FORM_PAYLOAD_FIELD)
            .map(|(_, value)| Bytes::from(value.into_owned()))
            .ok_or(ValidationError::MissingFormPayload),
        _ => Err(ValidationError::UnsupportedContentType { content_type }),
    }
}

/// Lower-cased media type with any parameters removed.
fn media_type(header: &str) -> String {
    header
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod tests;
