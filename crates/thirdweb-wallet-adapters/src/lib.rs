pub mod analytics;
pub mod browser;
pub mod config;
pub mod device;
#[cfg(feature = "native-core")]
pub mod ffi;
pub mod loopback;

pub use analytics::{HttpAnalytics, ANALYTICS_ENDPOINT};
pub use browser::SystemBrowser;
pub use config::{from_env, from_json_file, from_vars, ConfigError};
pub use device::{FileDeviceId, DEVICE_ID_FILE};
#[cfg(feature = "native-core")]
pub use ffi::NativeCore;
pub use loopback::TinyHttpCallbackServer;
