use super::*;

#[test]
fn error_codes_are_stable() {
    assert_eq!(ClientError::Config("x".into()).error_code(), "E_CONFIG");
    assert_eq!(ClientError::DuplicateTopic { topic: "t".into() }.error_code(), "E_DUPLICATE_TOPIC");
    assert_eq!(ClientError::Auth("x".into()).error_code(), "E_AUTH");
    assert_eq!(ClientError::Negotiation("x".into()).error_code(), "E_NEGOTIATION");
    assert_eq!(ClientError::Protocol("x".into()).error_code(), "E_PROTOCOL");
    assert_eq!(ClientError::Transport("x".into()).error_code(), "E_TRANSPORT");
}

#[test]
fn only_connection_level_failures_are_retryable() {
    assert!(ClientError::Negotiation("x".into()).retryable());
    assert!(ClientError::Transport("x".into()).retryable());
    assert!(!ClientError::Auth("x".into()).retryable());
    assert!(!ClientError::Config("x".into()).retryable());
    assert!(!ClientError::Protocol("x".into()).retryable());
}

#[test]
fn codec_errors_become_protocol_errors() {
    let codec = envelope::decode_envelope("nope").expect_err("malformed");
    let err = ClientError::from(codec);
    assert!(matches!(err, ClientError::Protocol(_)));
}
