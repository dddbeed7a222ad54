use std::collections::HashMap;
use std::fs;

use thirdweb_wallet_core::{AuthFamily, WalletConfig, WalletError, DEFAULT_OAUTH_REDIRECT_PORT};
use thirdweb_wallet_adapters::{from_json_file, from_vars, ConfigError};

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}

#[test]
fn json_file_fills_missing_fields_with_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("wallet.json");
    fs::write(
        &path,
        r#"{"client_id":"client-123","ecosystem_id":"ecosystem.example","partner_id":"partner-1"}"#,
    )
    .expect("write config");

    let config = from_json_file(&path).expect("load");
    assert_eq!(config.client_id, "client-123");
    assert_eq!(config.auth_family(), AuthFamily::Ecosystem);
    assert!(config.send_analytics);
    assert_eq!(config.oauth_redirect_port, DEFAULT_OAUTH_REDIRECT_PORT);
    assert_eq!(config.redirect_url(), "http://localhost:8789/callback");
}

#[test]
fn malformed_json_is_reported_with_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("broken.json");
    fs::write(&path, "{not json").expect("write config");

    let err = from_json_file(&path).expect_err("must fail");
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("broken.json"));

    let missing = from_json_file(dir.path().join("absent.json")).expect_err("must fail");
    assert!(matches!(missing, ConfigError::Io { .. }));
}

#[test]
fn environment_overrides_defaults() {
    let env = vars(&[
        ("THIRDWEB_CLIENT_ID", " client-123 "),
        ("THIRDWEB_ENCRYPTION_KEY", "enc-key"),
        ("THIRDWEB_SEND_ANALYTICS", "false"),
        ("THIRDWEB_OAUTH_REDIRECT_PORT", "9001"),
    ]);
    let config = from_vars(|name| env.get(name).cloned()).expect("load");
    assert_eq!(
        config,
        WalletConfig {
            client_id: "client-123".to_owned(),
            encryption_key: "enc-key".to_owned(),
            send_analytics: false,
            oauth_redirect_port: 9001,
            ..WalletConfig::default()
        }
    );
    assert_eq!(config.auth_family(), AuthFamily::InApp);
}

#[test]
fn invalid_environment_values_are_rejected() {
    let env = vars(&[("THIRDWEB_OAUTH_REDIRECT_PORT", "eighty")]);
    let err = from_vars(|name| env.get(name).cloned()).expect_err("must fail");
    assert!(matches!(
        err,
        ConfigError::InvalidVar {
            name: "THIRDWEB_OAUTH_REDIRECT_PORT",
            ..
        }
    ));

    let env = vars(&[("THIRDWEB_SEND_ANALYTICS", "maybe")]);
    let err = from_vars(|name| env.get(name).cloned()).expect_err("must fail");
    let wallet_err: WalletError = err.into();
    assert!(matches!(wallet_err, WalletError::Validation(_)));
    assert!(!wallet_err.retryable());
}
