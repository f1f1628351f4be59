// ABOUTME: macOS power reading via pmset/ioreg, power-change watcher and LaunchAgent login item
// ABOUTME: Health queries degrade to unknown fields instead of failing the poll

use super::{LoginItems, PowerReader, parse};
use crate::battery::{BatteryHealth, BatteryInfo, PowerError};
use anyhow::{Context, Result};
use std::io::BufRead;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

const LAUNCH_AGENT_LABEL: &str = "com.batwatch.monitor";

pub struct MacPowerReader;

impl MacPowerReader {
    pub fn new() -> Self {
        Self
    }

    fn read_health() -> BatteryHealth {
        let output = match Command::new("ioreg")
            .args(["-rn", "AppleSmartBattery"])
            .output()
        {
            Ok(output) if output.status.success() => output,
            Ok(_) | Err(_) => {
                debug!("Battery service query failed, health unknown");
                return BatteryHealth::default();
            }
        };
        parse::parse_ioreg_health(&String::from_utf8_lossy(&output.stdout))
    }
}

impl Default for MacPowerReader {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerReader for MacPowerReader {
    fn read(&self) -> Result<BatteryInfo, PowerError> {
        let output = Command::new("pmset")
            .args(["-g", "batt"])
            .output()
            .map_err(|_| PowerError::SourceUnavailable)?;
        if !output.status.success() {
            return Err(PowerError::SourceListUnavailable);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let (percentage, is_charging) = parse::parse_pmset_batt(&stdout)?;

        Ok(BatteryInfo::new(
            percentage,
            is_charging,
            Self::read_health(),
        ))
    }
}

/// Follow `pmset -g pslog`, which prints a line whenever the power source
/// changes, and wake the main loop on each one. Exits quietly if pmset is
/// unavailable; the 30s timer still covers polling.
pub fn spawn_power_change_watcher(wake: impl Fn() + Send + 'static) {
    std::thread::spawn(move || {
        let child = Command::new("pmset")
            .args(["-g", "pslog"])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn();

        let mut child = match child {
            Ok(child) => child,
            Err(e) => {
                warn!("Power-change watcher unavailable: {e}");
                return;
            }
        };

        let Some(stdout) = child.stdout.take() else {
            return;
        };
        for line in std::io::BufReader::new(stdout).lines() {
            match line {
                Ok(line) => {
                    debug!("Power source change: {line}");
                    wake();
                }
                Err(_) => break,
            }
        }
        let _ = child.kill();
    });
}

/// Login item backed by a per-user LaunchAgent plist. Registration failures
/// are reported to the caller, which logs them without surfacing to the user.
pub struct LaunchAgentLoginItems {
    agents_dir: PathBuf,
}

impl LaunchAgentLoginItems {
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir().context("Failed to determine home directory")?;
        Ok(Self {
            agents_dir: home.join("Library").join("LaunchAgents"),
        })
    }

    #[cfg(test)]
    fn with_dir(agents_dir: PathBuf) -> Self {
        Self { agents_dir }
    }

    fn plist_path(&self) -> PathBuf {
        self.agents_dir.join(format!("{LAUNCH_AGENT_LABEL}.plist"))
    }

    fn plist_content(program: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{LAUNCH_AGENT_LABEL}</string>
    <key>ProgramArguments</key>
    <array>
        <string>{program}</string>
    </array>
    <key>RunAtLoad</key>
    <true/>
</dict>
</plist>
"#
        )
    }
}

impl LoginItems for LaunchAgentLoginItems {
    fn set_enabled(&self, enabled: bool) -> Result<()> {
        let path = self.plist_path();
        if enabled {
            let exe = std::env::current_exe().context("Failed to locate executable")?;
            std::fs::create_dir_all(&self.agents_dir).with_context(|| {
                format!(
                    "Failed to create LaunchAgents directory: {}",
                    self.agents_dir.display()
                )
            })?;
            std::fs::write(&path, Self::plist_content(&exe.to_string_lossy()))
                .with_context(|| format!("Failed to write login item: {}", path.display()))?;
        } else if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove login item: {}", path.display()))?;
        }
        Ok(())
    }
}
