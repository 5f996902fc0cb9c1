//! # Webhook Processing
//!
//! Turns a buffered delivery into an internal event in three steps:
//!
//! 1. [`PayloadValidator`] recovers the payload bytes, verifying the HMAC
//!    signature when a secret is configured
//! 2. [`WebhookParser`] reads the event type header and decodes the payload
//!    into a provider structure from [`github`]
//! 3. The converters in [`converter`] map provider structures onto the
//!    internal vocabulary in [`crate::events`]
//!
//! Each step has its own error type; [`crate::GatewayError`] wraps them so
//! the HTTP layer can tell them apart.

pub mod converter;
pub mod github;
pub mod parser;
pub mod validation;

pub use converter::{ConversionError, EventConverter, RepoConverter};
pub use parser::{GithubEvent, ParseError, WebhookParser};
pub use validation::{PayloadValidator, ValidationError};

/// Header naming the event type of a GitHub delivery.
pub const EVENT_TYPE_HEADER: &str = "X-Github-Event";

/// Header carrying the GitHub delivery id.
pub const DELIVERY_ID_HEADER: &str = "X-Github-Delivery";

/// HMAC-SHA256 signature header, value `sha256=<hex>`.
pub const SIGNATURE_256_HEADER: &str = "X-Hub-Signature-256";

/// Legacy HMAC-SHA1 signature header, value `sha1=<hex>`.
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature";

pub const CONTENT_TYPE_HEADER: &str = "Content-Type";
