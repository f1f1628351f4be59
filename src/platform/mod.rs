// ABOUTME: Platform abstraction for power-source reading and login-item registration
// ABOUTME: Selects the macOS or sysfs-backed implementation behind small traits

use crate::battery::{BatteryInfo, PowerError};
use anyhow::Result;

#[cfg(target_os = "macos")]
pub mod macos;
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub mod parse;
#[cfg(not(target_os = "macos"))]
pub mod unix;

/// Reads the current power-source state. One synchronous call per poll;
/// failures are the five `PowerError` kinds and abort only that poll.
pub trait PowerReader {
    fn read(&self) -> Result<BatteryInfo, PowerError>;
}

/// Registers or unregisters the application for launch at login.
pub trait LoginItems {
    fn set_enabled(&self, enabled: bool) -> Result<()>;
}

/// Platform factory for the OS-specific implementations.
pub struct Platform;

impl Platform {
    #[cfg(target_os = "macos")]
    pub fn power_reader() -> Box<dyn PowerReader> {
        Box::new(macos::MacPowerReader::new())
    }

    #[cfg(not(target_os = "macos"))]
    pub fn power_reader() -> Box<dyn PowerReader> {
        Box::new(unix::SysfsPowerReader::new())
    }

    #[cfg(target_os = "macos")]
    pub fn login_items() -> Result<Box<dyn LoginItems>> {
        Ok(Box::new(macos::LaunchAgentLoginItems::new()?))
    }

    #[cfg(not(target_os = "macos"))]
    pub fn login_items() -> Result<Box<dyn LoginItems>> {
        Ok(Box::new(unix::AutostartLoginItems::new()?))
    }

    /// Start a background watcher that invokes `wake` whenever the OS
    /// reports a power-source change. The watcher only wakes the main loop;
    /// all polling stays serialized there.
    #[cfg(target_os = "macos")]
    pub fn spawn_power_change_watcher(wake: impl Fn() + Send + 'static) {
        macos::spawn_power_change_watcher(wake);
    }

    #[cfg(not(target_os = "macos"))]
    pub fn spawn_power_change_watcher(_wake: impl Fn() + Send + 'static) {
        // No change events here; the 30s timer is the only wakeup source.
    }
}
