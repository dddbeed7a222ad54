use tracing::{debug, warn};

use crate::config::WalletConfig;
use crate::domain::{ConnectEvent, HandleId, SmartWallet, WalletHandle};
use crate::ports::{AnalyticsPort, DeviceIdPort, WalletCorePort, WalletError};

/// Synchronous wallet services over the wallet core.
///
/// Every method blocks on the foreign core; `WalletClient` moves them onto the
/// background pool and routes results back to the primary thread.
pub struct WalletEngine<C, A, D>
where
    C: WalletCorePort,
    A: AnalyticsPort,
    D: DeviceIdPort,
{
    pub core: C,
    pub analytics: A,
    pub device: D,
    pub config: WalletConfig,
}

impl<C, A, D> WalletEngine<C, A, D>
where
    C: WalletCorePort,
    A: AnalyticsPort,
    D: DeviceIdPort,
{
    pub fn new(core: C, analytics: A, device: D, config: WalletConfig) -> Self {
        Self {
            core,
            analytics,
            device,
            config,
        }
    }

    pub fn require_valid(handle: &WalletHandle) -> Result<HandleId, WalletError> {
        if handle.is_valid() {
            Ok(handle.id())
        } else {
            Err(WalletError::InvalidHandle)
        }
    }

    pub fn require_smart(handle: &WalletHandle) -> Result<&SmartWallet, WalletError> {
        match handle {
            WalletHandle::Smart(w) if w.is_valid() => Ok(w),
            WalletHandle::Smart(_) => Err(WalletError::InvalidHandle),
            _ => Err(WalletError::NotSmartWallet),
        }
    }

    pub(crate) fn require_ecosystem(&self) -> Result<(), WalletError> {
        if self.config.is_ecosystem() {
            Ok(())
        } else {
            Err(WalletError::EcosystemNotConfigured)
        }
    }

    /// Best-effort "wallet connected" event. Never fails the caller.
    pub(crate) fn emit_connect(&self, handle: &WalletHandle) {
        if !self.config.send_analytics || !self.config.has_credentials() {
            debug!("analytics disabled, skipping connect event");
            return;
        }
        let wallet_address = match self.try_to_address(handle) {
            Ok(address) => address,
            Err(e) => {
                warn!(error = %e, "skipping connect event, address lookup failed");
                return;
            }
        };
        let event = ConnectEvent {
            wallet_address,
            wallet_type: handle.kind(),
        };
        if let Err(e) = self.analytics.track_connect(&event) {
            warn!(error = %e, "failed to send connect event");
        }
    }
}
