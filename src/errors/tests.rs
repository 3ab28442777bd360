use super::*;

#[test]
fn config_error_message() {
    let err = RangekitError::Config("server.transport must be stdio or http".into());
    assert_eq!(
        err.to_string(),
        "Configuration error: server.transport must be stdio or http"
    );
}

#[test]
fn internal_wraps_anyhow() {
    fn inner() -> Result<(), RangekitError> {
        let e: anyhow::Result<()> = Err(anyhow::anyhow!("bind refused"));
        e?;
        Ok(())
    }
    let err = inner().unwrap_err();
    assert!(matches!(err, RangekitError::Internal(_)));
    assert_eq!(err.to_string(), "bind refused");
}
