use voxnav_api::ApiError;
use voxnav_sdk::SdkError;

#[test]
fn response_integrity_violations_surface_as_security_failures() {
    for error in [
        ApiError::MissingResponseSignature,
        ApiError::InvalidContentType("text/html".to_owned()),
        ApiError::StaleResponseTimestamp { skew_ms: 600_000 },
    ] {
        assert!(matches!(
            SdkError::from(error),
            SdkError::SecurityFailure { .. }
        ));
    }
}

#[test]
fn missing_session_token_maps_to_not_initialized() {
    assert!(matches!(
        SdkError::from(ApiError::MissingSessionToken),
        SdkError::NotInitialized
    ));
}

#[test]
fn exhausted_retries_surface_as_network_failure_with_the_last_error() {
    let error = SdkError::from(ApiError::RetryExhausted {
        status: None,
        last_error: Some("connection refused".to_owned()),
    });
    let SdkError::NetworkFailure { last_error } = error else {
        panic!("expected NetworkFailure");
    };
    assert!(last_error.contains("connection refused"));
}
