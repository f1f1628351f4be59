// ABOUTME: Battery data model shared by the poller, tray menu and notifier
// ABOUTME: Holds per-poll snapshots, health readings and the power-read error kinds

use chrono::{DateTime, Local};
use thiserror::Error;

/// One snapshot of battery state, recreated on every poll.
#[derive(Debug, Clone, PartialEq)]
pub struct BatteryInfo {
    pub percentage: u8,
    pub is_charging: bool,
    pub timestamp: DateTime<Local>,
    pub health: BatteryHealth,
}

impl BatteryInfo {
    pub fn new(percentage: u8, is_charging: bool, health: BatteryHealth) -> Self {
        Self {
            percentage,
            is_charging,
            timestamp: Local::now(),
            health,
        }
    }

    /// Status line shown in the tray menu, e.g. "87% - Charging (updated 14:02)".
    pub fn display_string(&self) -> String {
        let status = if self.is_charging {
            "Charging"
        } else {
            "Discharging"
        };
        format!(
            "{}% - {} (updated {})",
            self.percentage,
            status,
            self.timestamp.format("%H:%M")
        )
    }
}

/// Battery-service health readings. Fields the service does not report are
/// `None` rather than negative sentinels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatteryHealth {
    pub cycle_count: Option<u32>,
    pub condition: Option<String>,
    pub health_percentage: Option<u8>,
    pub max_capacity: Option<u32>,
    pub design_capacity: Option<u32>,
}

impl BatteryHealth {
    /// Health line shown in the tray menu; degrades to "Battery health: unknown"
    /// when the service reported nothing usable.
    pub fn display_string(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        if let Some(cycles) = self.cycle_count {
            parts.push(format!("Cycles: {cycles}"));
        }

        if let Some(condition) = &self.condition
            && !condition.is_empty()
            && condition != "Unknown"
        {
            parts.push(format!("Condition: {condition}"));
        }

        if let Some(health) = self.health_percentage {
            parts.push(format!("Health: {health}%"));
        } else if let (Some(max), Some(design)) = (self.max_capacity, self.design_capacity) {
            parts.push(format!("Capacity: {max}/{design} mAh"));
        }

        if parts.is_empty() {
            return "Battery health: unknown".to_string();
        }

        parts.join(" | ")
    }

    /// Derive the health percentage from capacities when the service did not
    /// report one directly.
    pub fn with_derived_percentage(mut self) -> Self {
        if self.health_percentage.is_none()
            && let (Some(max), Some(design)) = (self.max_capacity, self.design_capacity)
            && design > 0
        {
            self.health_percentage = Some((max as u64 * 100 / design as u64).min(100) as u8);
        }
        self
    }
}

/// Failure modes of the power-state reader. Each one aborts the current poll;
/// the next scheduled poll retries naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PowerError {
    #[error("Unable to read battery")]
    SourceUnavailable,
    #[error("Unable to read battery")]
    SourceListUnavailable,
    #[error("No battery found")]
    NoSources,
    #[error("Unable to read battery")]
    DescriptionUnavailable,
    #[error("Battery data unavailable")]
    DataFieldsMissing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_string_charging() {
        let info = BatteryInfo::new(87, true, BatteryHealth::default());
        let display = info.display_string();
        assert!(display.starts_with("87% - Charging (updated "));
    }

    #[test]
    fn test_display_string_discharging() {
        let info = BatteryInfo::new(42, false, BatteryHealth::default());
        assert!(info.display_string().starts_with("42% - Discharging"));
    }

    #[test]
    fn test_health_display_all_fields() {
        let health = BatteryHealth {
            cycle_count: Some(285),
            condition: Some("Normal".to_string()),
            health_percentage: Some(91),
            max_capacity: Some(4208),
            design_capacity: Some(4610),
        };
        assert_eq!(
            health.display_string(),
            "Cycles: 285 | Condition: Normal | Health: 91%"
        );
    }

    #[test]
    fn test_health_display_capacity_fallback() {
        let health = BatteryHealth {
            cycle_count: None,
            condition: None,
            health_percentage: None,
            max_capacity: Some(4208),
            design_capacity: Some(4610),
        };
        assert_eq!(health.display_string(), "Capacity: 4208/4610 mAh");
    }

    #[test]
    fn test_health_display_unknown() {
        assert_eq!(
            BatteryHealth::default().display_string(),
            "Battery health: unknown"
        );
    }

    #[test]
    fn test_health_display_skips_unknown_condition() {
        let health = BatteryHealth {
            condition: Some("Unknown".to_string()),
            cycle_count: Some(10),
            ..Default::default()
        };
        assert_eq!(health.display_string(), "Cycles: 10");
    }

    #[test]
    fn test_derived_health_percentage() {
        let health = BatteryHealth {
            max_capacity: Some(4208),
            design_capacity: Some(4610),
            ..Default::default()
        }
        .with_derived_percentage();
        assert_eq!(health.health_percentage, Some(91));
    }

    #[test]
    fn test_derived_percentage_keeps_reported_value() {
        let health = BatteryHealth {
            health_percentage: Some(80),
            max_capacity: Some(100),
            design_capacity: Some(100),
            ..Default::default()
        }
        .with_derived_percentage();
        assert_eq!(health.health_percentage, Some(80));
    }

    #[test]
    fn test_derived_percentage_ignores_zero_design_capacity() {
        let health = BatteryHealth {
            max_capacity: Some(4208),
            design_capacity: Some(0),
            ..Default::default()
        }
        .with_derived_percentage();
        assert_eq!(health.health_percentage, None);
    }

    #[test]
    fn test_power_error_messages() {
        assert_eq!(
            PowerError::SourceUnavailable.to_string(),
            "Unable to read battery"
        );
        assert_eq!(PowerError::NoSources.to_string(), "No battery found");
        assert_eq!(
            PowerError::DataFieldsMissing.to_string(),
            "Battery data unavailable"
        );
    }
}
