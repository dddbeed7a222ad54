//! thirdweb-wallet: sign in to an in-app wallet from the terminal.

use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use alloy::primitives::Address;
use eyre::{eyre, Result, WrapErr};
use tracing::info;

use thirdweb_wallet_adapters::{
    from_env, from_json_file, FileDeviceId, HttpAnalytics, NativeCore, SystemBrowser,
    TinyHttpCallbackServer,
};
use thirdweb_wallet_core::{
    config, AuthInput, SmartWalletOptions, TaskLauncher, WalletClient, WalletConfig,
    WalletEngine, WalletError, WalletHandle,
};

mod cli;

use cli::Login;

type Client = WalletClient<NativeCore, HttpAnalytics, FileDeviceId>;
type Slot<T> = Arc<Mutex<Option<Result<T, WalletError>>>>;

const TICK: Duration = Duration::from_millis(16);

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args = cli::parse(&args)?;
    let wallet_config = load_config()?;
    config::init_global(wallet_config.clone())?;

    info!(
        ecosystem = wallet_config.is_ecosystem(),
        source = args.login.source().as_str(),
        "Starting thirdweb-wallet"
    );

    let runtime = tokio::runtime::Runtime::new().wrap_err("failed to start runtime")?;
    let engine = WalletEngine::new(
        NativeCore,
        HttpAnalytics::new(&wallet_config)?,
        FileDeviceId::from_config(&wallet_config),
        wallet_config,
    );
    let mut client: Client = WalletClient::new(
        engine,
        TaskLauncher::new(runtime.handle().clone()),
        Arc::new(TinyHttpCallbackServer::default()),
        Arc::new(SystemBrowser),
    );

    let personal = create_wallet(&mut client, &args.login)?;
    info!(wallet = %personal.display_name(), "wallet created");
    let personal = sign_in(&mut client, personal, args.login)?;

    let wallet = match args.smart_chain_id {
        Some(chain_id) => {
            let slot: Slot<WalletHandle> = new_slot();
            let (ok, err) = settle(&slot);
            client.create_smart_wallet(
                personal.clone(),
                SmartWalletOptions::new(chain_id),
                ok,
                err,
            );
            run_until(&mut client, &slot)?
        }
        None => personal.clone(),
    };

    let slot: Slot<Address> = new_slot();
    let (ok, err) = settle(&slot);
    client.try_to_address(wallet.clone(), ok, err);
    let address = run_until(&mut client, &slot)?;
    println!("{} {address}", wallet.display_name());

    let separate_signer = personal.id() != wallet.id();
    free(&mut client, wallet)?;
    if separate_signer {
        free(&mut client, personal)?;
    }
    Ok(())
}

fn load_config() -> Result<WalletConfig> {
    match std::env::var("THIRDWEB_CONFIG") {
        Ok(path) => Ok(from_json_file(&path)?),
        Err(_) => Ok(from_env()?),
    }
}

fn create_wallet(client: &mut Client, login: &Login) -> Result<WalletHandle, WalletError> {
    let slot: Slot<WalletHandle> = new_slot();
    let (ok, err) = settle(&slot);
    let source = login.source();
    let identifier = login.identifier().to_owned();
    let config = &client.engine().config;
    match login {
        Login::Guest | Login::Jwt(_) | Login::AuthEndpoint(_) => {
            client.create_custom_auth_wallet(source, ok, err)
        }
        _ if config.is_ecosystem() => {
            let partner_id = config.partner_id.clone();
            client.create_ecosystem_wallet(partner_id, source, identifier, ok, err)
        }
        _ => client.create_in_app_wallet(source, identifier, ok, err),
    }
    run_until(client, &slot)
}

fn free(client: &mut Client, wallet: WalletHandle) -> Result<(), WalletError> {
    let slot: Slot<()> = new_slot();
    let (ok, err) = settle(&slot);
    client.free(wallet, ok, err);
    run_until(client, &slot)
}

fn sign_in(client: &mut Client, wallet: WalletHandle, login: Login) -> Result<WalletHandle> {
    if let Some(kind) = login.loopback() {
        let slot: Slot<WalletHandle> = new_slot();
        let (ok, err) = settle(&slot);
        client.login_with_browser(wallet, kind, ok, err);
        return Ok(run_until(client, &slot)?);
    }

    let input = match login {
        Login::Email(_) | Login::Phone(_) => {
            let slot: Slot<()> = new_slot();
            let (ok, err) = settle(&slot);
            client.send_otp(wallet.clone(), ok, err);
            run_until(client, &slot)?;
            AuthInput::Otp(prompt("Enter the code you received: ")?)
        }
        Login::Guest => AuthInput::Guest,
        Login::Jwt(jwt) => AuthInput::Jwt(jwt),
        Login::AuthEndpoint(payload) => AuthInput::AuthEndpoint(payload),
        Login::OAuth(_) | Login::Siwe => return Err(eyre!("browser login without loopback")),
    };

    let slot: Slot<()> = new_slot();
    let (ok, err) = settle(&slot);
    client.sign_in(wallet.clone(), input, ok, err);
    run_until(client, &slot)?;
    Ok(wallet)
}

fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_owned())
}

fn new_slot<T>() -> Slot<T> {
    Arc::new(Mutex::new(None))
}

fn settle<T: Send + 'static>(
    slot: &Slot<T>,
) -> (
    impl FnOnce(T) + Send + 'static,
    impl FnOnce(WalletError) + Send + 'static,
) {
    let ok = Arc::clone(slot);
    let err = Arc::clone(slot);
    (
        move |value: T| store(&ok, Ok(value)),
        move |e: WalletError| store(&err, Err(e)),
    )
}

fn store<T>(slot: &Slot<T>, result: Result<T, WalletError>) {
    if let Ok(mut g) = slot.lock() {
        *g = Some(result);
    }
}

/// Ticks the client on this thread until the continuation fills `slot`.
fn run_until<T>(client: &mut Client, slot: &Slot<T>) -> Result<T, WalletError> {
    loop {
        client.tick();
        let settled = slot
            .lock()
            .map_err(|e| WalletError::Transport(format!("result lock poisoned: {e}")))?
            .take();
        if let Some(result) = settled {
            return result;
        }
        thread::sleep(TICK);
    }
}
