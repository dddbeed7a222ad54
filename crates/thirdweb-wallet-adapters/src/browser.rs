use thirdweb_wallet_core::{BrowserPort, WalletError};

/// Opens URLs in the user's default browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl BrowserPort for SystemBrowser {
    fn open_url(&self, url: &str) -> Result<(), WalletError> {
        open::that(url).map_err(|e| WalletError::Transport(format!("failed to open browser: {e}")))
    }
}
