//! Unit tests for error display and conversions.

use incident_relay::AppError;

#[test]
fn display_includes_variant_prefix() {
    assert_eq!(
        AppError::Validation("bad status".into()).to_string(),
        "validation: bad status"
    );
    assert_eq!(
        AppError::NotFound("incident 9".into()).to_string(),
        "not found: incident 9"
    );
    assert_eq!(
        AppError::Signature("mismatch".into()).to_string(),
        "signature: mismatch"
    );
    assert_eq!(
        AppError::Unauthorized("private".into()).to_string(),
        "unauthorized: private"
    );
}

#[test]
fn sqlx_errors_map_to_db() {
    let err: AppError = sqlx::Error::RowNotFound.into();
    assert!(matches!(err, AppError::Db(_)));
}

#[test]
fn toml_errors_map_to_config() {
    let parse_err = toml::from_str::<toml::Value>("= broken").expect_err("invalid toml");
    let err: AppError = parse_err.into();
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn errors_implement_std_error() {
    fn takes_error(_: &dyn std::error::Error) {}
    takes_error(&AppError::Db("oops".into()));
}
