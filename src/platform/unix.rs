// ABOUTME: sysfs-backed power reader and XDG autostart login item for non-macOS hosts
// ABOUTME: Mirrors the macOS error mapping so the monitor behaves identically

use super::{LoginItems, PowerReader};
use crate::battery::{BatteryHealth, BatteryInfo, PowerError};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct SysfsPowerReader {
    base: PathBuf,
}

impl SysfsPowerReader {
    pub fn new() -> Self {
        Self {
            base: PathBuf::from("/sys/class/power_supply"),
        }
    }

    #[cfg(test)]
    fn with_base(base: PathBuf) -> Self {
        Self { base }
    }

    fn find_battery(&self) -> Result<PathBuf, PowerError> {
        let entries =
            std::fs::read_dir(&self.base).map_err(|_| PowerError::SourceUnavailable)?;
        for entry in entries.flatten() {
            if entry.file_name().to_string_lossy().starts_with("BAT") {
                return Ok(entry.path());
            }
        }
        Err(PowerError::NoSources)
    }

    fn read_health(battery: &Path) -> BatteryHealth {
        BatteryHealth {
            cycle_count: read_sysfs_u32(battery, "cycle_count"),
            condition: None,
            health_percentage: None,
            max_capacity: read_sysfs_u32(battery, "charge_full")
                .or_else(|| read_sysfs_u32(battery, "energy_full")),
            design_capacity: read_sysfs_u32(battery, "charge_full_design")
                .or_else(|| read_sysfs_u32(battery, "energy_full_design")),
        }
        .with_derived_percentage()
    }
}

impl Default for SysfsPowerReader {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerReader for SysfsPowerReader {
    fn read(&self) -> Result<BatteryInfo, PowerError> {
        let battery = self.find_battery()?;

        let capacity = std::fs::read_to_string(battery.join("capacity"))
            .map_err(|_| PowerError::DescriptionUnavailable)?;
        let percentage: u8 = capacity
            .trim()
            .parse()
            .map_err(|_| PowerError::DataFieldsMissing)?;
        if percentage > 100 {
            return Err(PowerError::DataFieldsMissing);
        }

        let status = std::fs::read_to_string(battery.join("status")).unwrap_or_default();
        let is_charging = matches!(status.trim(), "Charging" | "Full");
        debug!(percentage, is_charging, "sysfs battery read");

        Ok(BatteryInfo::new(
            percentage,
            is_charging,
            Self::read_health(&battery),
        ))
    }
}

fn read_sysfs_u32(battery: &Path, name: &str) -> Option<u32> {
    std::fs::read_to_string(battery.join(name))
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Login item backed by an XDG autostart desktop entry.
pub struct AutostartLoginItems {
    autostart_dir: PathBuf,
}

impl AutostartLoginItems {
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir().context("Failed to determine config directory")?;
        Ok(Self {
            autostart_dir: config_dir.join("autostart"),
        })
    }

    #[cfg(test)]
    fn with_dir(autostart_dir: PathBuf) -> Self {
        Self { autostart_dir }
    }

    fn entry_path(&self) -> PathBuf {
        self.autostart_dir.join("batwatch.desktop")
    }

    fn entry_content(program: &str) -> String {
        format!(
            "[Desktop Entry]\nType=Application\nName=Batwatch\nExec={program}\nX-GNOME-Autostart-enabled=true\n"
        )
    }
}

impl LoginItems for AutostartLoginItems {
    fn set_enabled(&self, enabled: bool) -> Result<()> {
        let path = self.entry_path();
        if enabled {
            let exe = std::env::current_exe().context("Failed to locate executable")?;
            std::fs::create_dir_all(&self.autostart_dir).with_context(|| {
                format!(
                    "Failed to create autostart directory: {}",
                    self.autostart_dir.display()
                )
            })?;
            std::fs::write(&path, Self::entry_content(&exe.to_string_lossy()))
                .with_context(|| format!("Failed to write login item: {}", path.display()))?;
        } else if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove login item: {}", path.display()))?;
        }
        Ok(())
    }
}
