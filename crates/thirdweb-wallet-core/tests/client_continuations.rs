mod common;

use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use alloy::primitives::Address;
use thirdweb_wallet_core::{
    AuthInput, HandleId, InAppSource, RawOutcome, SmartWalletOptions, TaskLauncher, WalletClient,
    WalletError, WalletHandle,
};

use common::{
    eventually, in_app, new_engine, smart, test_config, FakeBrowser, FakeCallbackServer,
    FixedDevice, MockCore, RecordingAnalytics, WALLET_ADDRESS,
};

type TestClient = WalletClient<MockCore, RecordingAnalytics, FixedDevice>;

/// Records every continuation invocation together with the thread it ran on.
struct Tally<T> {
    successes: Arc<Mutex<Vec<(T, ThreadId)>>>,
    failures: Arc<Mutex<Vec<(WalletError, ThreadId)>>>,
}

impl<T: Send + 'static> Tally<T> {
    fn new() -> Self {
        Self {
            successes: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn continuations(
        &self,
    ) -> (
        impl FnOnce(T) + Send + 'static,
        impl FnOnce(WalletError) + Send + 'static,
    ) {
        let ok = Arc::clone(&self.successes);
        let err = Arc::clone(&self.failures);
        (
            move |value: T| ok.lock().expect("lock").push((value, thread::current().id())),
            move |e: WalletError| err.lock().expect("lock").push((e, thread::current().id())),
        )
    }

    fn settled(&self) -> usize {
        self.successes.lock().expect("lock").len() + self.failures.lock().expect("lock").len()
    }

    fn successes(&self) -> Vec<(T, ThreadId)>
    where
        T: Clone,
    {
        self.successes.lock().expect("lock").clone()
    }

    fn failures(&self) -> Vec<(WalletError, ThreadId)> {
        self.failures.lock().expect("lock").clone()
    }
}

fn client(runtime: &tokio::runtime::Runtime) -> (TestClient, MockCore) {
    let (engine, core, _) = new_engine(test_config());
    let client = WalletClient::new(
        engine,
        TaskLauncher::new(runtime.handle().clone()),
        Arc::new(FakeCallbackServer::default()),
        Arc::new(FakeBrowser::default()),
    );
    (client, core)
}

/// Ticks until `tally` settles, then once more so a duplicate delivery would show up.
fn settle<T: Send + 'static>(client: &mut TestClient, tally: &Tally<T>) {
    assert!(eventually(|| {
        client.tick();
        tally.settled() > 0
    }));
    client.tick();
    assert_eq!(tally.settled(), 1);
}

#[test]
fn invalid_personal_wallet_is_rejected_on_primary_without_core_call() {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let (mut client, core) = client(&runtime);
    let primary = thread::current().id();

    let tally: Tally<WalletHandle> = Tally::new();
    let (ok, err) = tally.continuations();
    let mut options = SmartWalletOptions::new(1);
    options.gasless = true;
    client.create_smart_wallet(in_app(0, InAppSource::Email), options, ok, err);

    assert_eq!(tally.settled(), 1);
    client.tick();
    assert_eq!(tally.settled(), 1);
    let failures = tally.failures();
    assert_eq!(failures[0].0, WalletError::InvalidPersonalWallet);
    assert_eq!(failures[0].1, primary);
    assert!(core.calls().is_empty());
}

#[test]
fn smart_wallet_creation_runs_in_background_and_delivers_on_primary() {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let (mut client, core) = client(&runtime);
    let primary = thread::current().id();

    let tally: Tally<WalletHandle> = Tally::new();
    let (ok, err) = tally.continuations();
    client.create_smart_wallet(
        in_app(42, InAppSource::Guest),
        SmartWalletOptions::new(137),
        ok,
        err,
    );
    settle(&mut client, &tally);

    let successes = tally.successes();
    assert_eq!(successes[0].0.id(), HandleId(99));
    assert_eq!(successes[0].1, primary);
    assert_eq!(core.call_names(), vec!["create_smart_wallet".to_owned()]);
}

#[test]
fn sign_in_source_mismatch_never_reaches_core() {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let (mut client, core) = client(&runtime);

    let tally: Tally<()> = Tally::new();
    let (ok, err) = tally.continuations();
    client.sign_in(
        in_app(42, InAppSource::Guest),
        AuthInput::Otp("123456".to_owned()),
        ok,
        err,
    );
    client.tick();

    assert_eq!(tally.settled(), 1);
    assert!(tally.failures()[0].0.is_precondition());
    assert!(core.calls().is_empty());
}

#[test]
fn recoverable_sign_in_failure_reaches_error_continuation_once() {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let (mut client, core) = client(&runtime);
    let primary = thread::current().id();
    core.respond(
        "in_app_wallet_sign_in_with_otp_email",
        RawOutcome::ok("RecoverableError: wrong code"),
    );

    let tally: Tally<()> = Tally::new();
    let (ok, err) = tally.continuations();
    client.sign_in(
        in_app(42, InAppSource::Email),
        AuthInput::Otp("000000".to_owned()),
        ok,
        err,
    );
    settle(&mut client, &tally);

    let failures = tally.failures();
    assert_eq!(failures[0].1, primary);
    assert_eq!(failures[0].0, WalletError::Recoverable("wrong code".to_owned()));
    assert!(failures[0].0.retryable());
    assert_eq!(core.calls().len(), 1);
}

#[test]
fn send_otp_delivers_success_on_primary() {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let (mut client, core) = client(&runtime);
    let primary = thread::current().id();

    let tally: Tally<()> = Tally::new();
    let (ok, err) = tally.continuations();
    client.send_otp(in_app(42, InAppSource::Phone), ok, err);
    settle(&mut client, &tally);

    assert_eq!(tally.successes()[0].1, primary);
    assert_eq!(core.calls().len(), 1);
}

#[test]
fn smart_operations_check_kind_before_scheduling() {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let (mut client, core) = client(&runtime);
    let primary = thread::current().id();

    let rejected: Tally<bool> = Tally::new();
    let (ok, err) = rejected.continuations();
    client.smart(
        in_app(42, InAppSource::Guest),
        |engine, handle| engine.is_deployed(handle),
        ok,
        err,
    );
    assert_eq!(rejected.settled(), 1);
    assert_eq!(rejected.failures()[0].0, WalletError::NotSmartWallet);
    assert!(core.calls().is_empty());

    let deployed: Tally<bool> = Tally::new();
    let (ok, err) = deployed.continuations();
    client.smart(
        smart(99, 42),
        |engine, handle| engine.is_deployed(handle),
        ok,
        err,
    );
    settle(&mut client, &deployed);
    assert_eq!(deployed.successes(), vec![(true, primary)]);
    assert_eq!(core.call_names(), vec!["smart_wallet_is_deployed".to_owned()]);
}

#[test]
fn wallet_lifecycle_runs_through_continuations() {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let (mut client, core) = client(&runtime);

    let created: Tally<WalletHandle> = Tally::new();
    let (ok, err) = created.continuations();
    client.create_custom_auth_wallet(InAppSource::Guest, ok, err);
    settle(&mut client, &created);
    let wallet = created.successes()[0].0.clone();
    assert_eq!(wallet.id(), HandleId(42));

    let address: Tally<Address> = Tally::new();
    let (ok, err) = address.continuations();
    client.try_to_address(wallet.clone(), ok, err);
    settle(&mut client, &address);
    let expected: Address = WALLET_ADDRESS.parse().expect("address");
    assert_eq!(address.successes()[0].0, expected);

    let disconnected: Tally<WalletHandle> = Tally::new();
    let (ok, err) = disconnected.continuations();
    client.disconnect(wallet.clone(), ok, err);
    settle(&mut client, &disconnected);
    assert!(!disconnected.successes()[0].0.is_valid());

    let freed: Tally<()> = Tally::new();
    let (ok, err) = freed.continuations();
    client.free(wallet, ok, err);
    settle(&mut client, &freed);
    assert_eq!(core.freed(), vec![HandleId(42)]);
    assert_eq!(
        core.call_names(),
        vec![
            "create_in_app_wallet".to_owned(),
            "get_wallet_address".to_owned(),
            "disconnect".to_owned(),
        ]
    );
}

#[test]
fn address_lookup_failure_falls_back_to_zero_or_errors() {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let (mut client, core) = client(&runtime);
    core.respond("get_wallet_address", RawOutcome::err("not connected"));
    let wallet = in_app(42, InAppSource::Guest);

    let sentinel: Tally<Address> = Tally::new();
    let (ok, err) = sentinel.continuations();
    client.to_address(wallet.clone(), ok, err);
    settle(&mut client, &sentinel);
    assert_eq!(sentinel.successes()[0].0, Address::ZERO);

    let strict: Tally<Address> = Tally::new();
    let (ok, err) = strict.continuations();
    client.try_to_address(wallet, ok, err);
    settle(&mut client, &strict);
    assert_eq!(strict.failures()[0].0.to_string(), "not connected");
}

#[test]
fn creation_preconditions_are_rejected_inline() {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let (client, core) = client(&runtime);

    let custom: Tally<WalletHandle> = Tally::new();
    let (ok, err) = custom.continuations();
    client.create_custom_auth_wallet(InAppSource::Email, ok, err);
    assert_eq!(custom.failures()[0].0, WalletError::InvalidCustomAuthSource);

    let ecosystem: Tally<WalletHandle> = Tally::new();
    let (ok, err) = ecosystem.continuations();
    client.create_ecosystem_wallet(
        "partner-1".to_owned(),
        InAppSource::Guest,
        String::new(),
        ok,
        err,
    );
    assert_eq!(ecosystem.failures()[0].0, WalletError::EcosystemNotConfigured);
    assert!(core.calls().is_empty());
}
