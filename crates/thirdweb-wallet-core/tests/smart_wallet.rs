mod common;

use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::{Address, B256};
use thirdweb_wallet_core::{
    CoreCall, HandleId, InAppSource, RawOutcome, SessionKeyRequest, SmartWalletOptions,
    WalletError, WalletKind,
};

use common::{in_app, new_engine, smart, test_config};

fn signer() -> Address {
    "0x2000000000000000000000000000000000000002"
        .parse()
        .expect("valid signer address")
}

#[test]
fn invalid_personal_wallet_is_rejected_without_core_call() {
    let (engine, core, analytics) = new_engine(test_config());
    let options = SmartWalletOptions {
        chain_id: 1,
        gasless: true,
        factory: String::new(),
        account_override: String::new(),
    };
    let err = engine
        .create_smart_wallet(&in_app(0, InAppSource::Email), &options)
        .expect_err("must fail");
    assert_eq!(err, WalletError::InvalidPersonalWallet);
    assert_eq!(err.to_string(), "Invalid InApp wallet");

    let err = engine
        .create_smart_wallet(&smart(5, 1), &options)
        .expect_err("smart wallets cannot sign for smart wallets");
    assert_eq!(err, WalletError::InvalidPersonalWallet);
    assert!(core.calls().is_empty());
    assert!(analytics.events().is_empty());
}

#[test]
fn create_smart_wallet_wraps_personal_wallet() {
    let (engine, core, analytics) = new_engine(test_config());
    let personal = in_app(42, InAppSource::Guest);
    let mut options = SmartWalletOptions::new(137);
    options.factory = "0x3000000000000000000000000000000000000003".to_owned();
    let wallet = engine
        .create_smart_wallet(&personal, &options)
        .expect("create smart wallet");

    let smart = wallet.as_smart().expect("smart handle");
    assert_eq!(smart.id, HandleId(99));
    assert_eq!(smart.signer.id, HandleId(42));
    match &core.calls()[0] {
        CoreCall::CreateSmartWallet(args) => {
            assert_eq!(args.personal_wallet, HandleId(42));
            assert_eq!(args.chain_id, 137);
            assert!(args.gasless);
            assert_eq!(args.account_override, "");
        }
        other => panic!("unexpected call {other:?}"),
    }
    let events = analytics.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].wallet_type, WalletKind::Smart);
}

#[test]
fn create_smart_wallet_failure_is_propagated() {
    let (engine, core, _) = new_engine(test_config());
    core.respond("create_smart_wallet", RawOutcome::err("factory not deployed"));
    let err = engine
        .create_smart_wallet(&in_app(42, InAppSource::Guest), &SmartWalletOptions::new(1))
        .expect_err("must fail");
    assert_eq!(err.to_string(), "factory not deployed");
}

#[test]
fn smart_only_operations_reject_other_kinds() {
    let (engine, core, _) = new_engine(test_config());
    let wallet = in_app(42, InAppSource::Email);
    let request = SessionKeyRequest {
        signer: signer(),
        approved_targets: vec![],
        native_token_limit_per_transaction_in_wei: "0".to_owned(),
        permission_start: 0,
        permission_end: 0,
        request_validity_start: 0,
        request_validity_end: 0,
    };

    assert_eq!(engine.is_deployed(&wallet), Err(WalletError::NotSmartWallet));
    assert_eq!(engine.get_admins(&wallet), Err(WalletError::NotSmartWallet));
    assert_eq!(
        engine.get_active_signers(&wallet),
        Err(WalletError::NotSmartWallet)
    );
    assert_eq!(
        engine.add_admin(&wallet, signer()),
        Err(WalletError::NotSmartWallet)
    );
    assert_eq!(
        engine.remove_admin(&wallet, signer()),
        Err(WalletError::NotSmartWallet)
    );
    assert_eq!(
        engine.create_session_key(&wallet, &request),
        Err(WalletError::NotSmartWallet)
    );
    assert_eq!(
        engine.revoke_session_key(&wallet, signer()),
        Err(WalletError::NotSmartWallet)
    );
    assert!(core.calls().is_empty());
}

#[test]
fn admins_and_signers_are_parsed() {
    let (engine, core, _) = new_engine(test_config());
    let wallet = smart(9, 1);
    core.respond(
        "smart_wallet_get_all_admins",
        RawOutcome::ok(r#"["0x2000000000000000000000000000000000000002"]"#),
    );
    assert_eq!(engine.get_admins(&wallet).expect("admins"), vec![signer()]);

    core.respond(
        "smart_wallet_get_all_active_signers",
        RawOutcome::ok(
            r#"[{"signer":"0x2000000000000000000000000000000000000002","approvedTargets":[],"nativeTokenLimitPerTransaction":"0","startTimestamp":"1700000000","endTimestamp":"2000000000"}]"#,
        ),
    );
    let signers = engine.get_active_signers(&wallet).expect("signers");
    assert_eq!(signers.len(), 1);
    assert_eq!(signers[0].signer, signer());
    assert_eq!(signers[0].end_timestamp, 2_000_000_000);

    assert!(engine.is_deployed(&wallet).expect("is deployed"));
}

#[test]
fn session_key_defaults_end_and_returns_hash() {
    let (engine, core, _) = new_engine(test_config());
    let hash = B256::repeat_byte(0xab);
    core.respond(
        "smart_wallet_create_session_key",
        RawOutcome::ok(format!(r#"{{"transactionHash":"{hash}"}}"#)),
    );
    let request = SessionKeyRequest {
        signer: signer(),
        approved_targets: vec![Address::ZERO],
        native_token_limit_per_transaction_in_wei: "1000".to_owned(),
        permission_start: 0,
        permission_end: 0,
        request_validity_start: 0,
        request_validity_end: 0,
    };
    let receipt = engine
        .create_session_key(&smart(9, 1), &request)
        .expect("session key");
    assert_eq!(receipt.transaction_hash, Some(hash));

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_secs();
    match &core.calls()[0] {
        CoreCall::SmartCreateSessionKey { request, .. } => {
            assert!(request.permission_end > now + 9 * 365 * 24 * 60 * 60);
            assert_eq!(request.permission_start, 0);
        }
        other => panic!("unexpected call {other:?}"),
    }
}

#[test]
fn admin_changes_reach_core() {
    let (engine, core, _) = new_engine(test_config());
    let wallet = smart(9, 1);
    engine.add_admin(&wallet, signer()).expect("add admin");
    engine.revoke_session_key(&wallet, signer()).expect("revoke");
    assert_eq!(
        core.call_names(),
        vec!["smart_wallet_add_admin", "smart_wallet_revoke_session_key"]
    );
}

#[test]
fn active_signer_lookup_ignores_address_case() {
    let (engine, core, _) = new_engine(test_config());
    core.respond(
        "smart_wallet_get_all_active_signers",
        RawOutcome::ok(
            r#"[{"signer":"0x00000000000000000000000000000000000000AB","approvedTargets":[],"nativeTokenLimitPerTransaction":"0","startTimestamp":0,"endTimestamp":10}]"#,
        ),
    );
    let wallet = smart(99, 42);
    let backend: Address = "0x00000000000000000000000000000000000000ab"
        .parse()
        .expect("backend address");

    assert!(engine.is_active_signer(&wallet, backend).expect("lookup"));
    assert!(!engine.is_active_signer(&wallet, signer()).expect("lookup"));
    assert_eq!(
        core.call_names()[..2],
        [
            "smart_wallet_is_deployed".to_owned(),
            "smart_wallet_get_all_active_signers".to_owned()
        ]
    );
}

#[test]
fn undeployed_account_has_no_active_signers() {
    let (engine, core, _) = new_engine(test_config());
    core.respond("smart_wallet_is_deployed", RawOutcome::ok("false"));
    assert!(!engine.is_active_signer(&smart(99, 42), signer()).expect("lookup"));
    assert_eq!(core.call_names(), vec!["smart_wallet_is_deployed".to_owned()]);

    assert_eq!(
        engine.is_active_signer(&in_app(42, InAppSource::Guest), signer()),
        Err(WalletError::NotSmartWallet)
    );
}
