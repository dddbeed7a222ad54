use eyre::{bail, eyre, Result};

use thirdweb_wallet_core::{InAppSource, LoopbackKind, OAuthProvider};

pub const USAGE: &str = "usage: thirdweb-wallet <email ADDRESS | phone NUMBER | oauth PROVIDER | siwe | guest | jwt TOKEN | auth-endpoint PAYLOAD> [--smart CHAIN_ID]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Login {
    Email(String),
    Phone(String),
    OAuth(OAuthProvider),
    Siwe,
    Guest,
    Jwt(String),
    AuthEndpoint(String),
}

impl Login {
    pub fn source(&self) -> InAppSource {
        match self {
            Login::Email(_) => InAppSource::Email,
            Login::Phone(_) => InAppSource::Phone,
            Login::OAuth(provider) => InAppSource::OAuthProvider(*provider),
            Login::Siwe => InAppSource::Siwe,
            Login::Guest => InAppSource::Guest,
            Login::Jwt(_) => InAppSource::Jwt,
            Login::AuthEndpoint(_) => InAppSource::AuthEndpoint,
        }
    }

    /// Email address or phone number handed to wallet creation.
    pub fn identifier(&self) -> &str {
        match self {
            Login::Email(value) | Login::Phone(value) => value,
            _ => "",
        }
    }

    pub fn loopback(&self) -> Option<LoopbackKind> {
        match self {
            Login::OAuth(_) => Some(LoopbackKind::OAuth),
            Login::Siwe => Some(LoopbackKind::Siwe),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub login: Login,
    pub smart_chain_id: Option<u64>,
}

pub fn parse(args: &[String]) -> Result<Args> {
    let mut rest = args.iter().map(String::as_str);
    let mut value = |what: &str| {
        rest.next()
            .map(str::to_owned)
            .ok_or_else(|| eyre!("missing {what}\n{USAGE}"))
    };

    let login = match value("login method")?.as_str() {
        "email" => Login::Email(value("email address")?),
        "phone" => Login::Phone(value("phone number")?),
        "oauth" => Login::OAuth(value("provider")?.parse()?),
        "siwe" => Login::Siwe,
        "guest" => Login::Guest,
        "jwt" => Login::Jwt(value("token")?),
        "auth-endpoint" => Login::AuthEndpoint(value("payload")?),
        other => bail!("unknown login method {other:?}\n{USAGE}"),
    };

    let smart_chain_id = match value("option").ok().as_deref() {
        None => None,
        Some("--smart") => Some(
            value("chain id")?
                .parse()
                .map_err(|e| eyre!("invalid chain id: {e}"))?,
        ),
        Some(other) => bail!("unexpected argument {other:?}\n{USAGE}"),
    };

    Ok(Args {
        login,
        smart_chain_id,
    })
}
