//! Tests for [`GatewayError`].

use super::*;

#[test]
fn test_every_kind_has_a_distinct_tag() {
    let errors = [
        GatewayError::RequestValidation(ValidationError::MissingSignature),
        GatewayError::WebhookParsing(ParseError::MissingEventType),
        GatewayError::EventConversion(ConversionError::MissingField {
            path: "sender.login".to_string(),
        }),
        GatewayError::unsupported("pull_request/other"),
        GatewayError::not_allowlisted("acme/infra"),
        GatewayError::downstream("clean up pull", anyhow::anyhow!("boom")),
        GatewayError::NoResolver,
    ];

    let mut kinds: Vec<&str> = errors.iter().map(GatewayError::kind).collect();
    kinds.sort_unstable();
    kinds.dedup();

    assert_eq!(kinds.len(), errors.len());
}

#[test]
fn test_messages_name_the_offending_value() {
    assert_eq!(
        GatewayError::not_allowlisted("acme/infra").to_string(),
        "repository acme/infra is not allowlisted"
    );
    assert_eq!(
        GatewayError::downstream("clean up pull", anyhow::anyhow!("lock store down")).to_string(),
        "clean up pull failed: lock store down"
    );
}

#[test]
fn test_component_errors_convert_with_question_mark() {
    fn validate() -> Result<(), GatewayError> {
        Err(ValidationError::SignatureMismatch)?
    }

    assert_eq!(validate().unwrap_err().kind(), "request_validation");
}
