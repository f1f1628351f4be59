// ABOUTME: Pure parsers for pmset and ioreg output used by the macOS power reader
// ABOUTME: Kept free of platform calls so the parsing is unit-testable anywhere

use crate::battery::{BatteryHealth, PowerError};

/// Extract `(percentage, is_charging)` from `pmset -g batt` output.
///
/// Typical line:
/// ` -InternalBattery-0 (id=12582979)	85%; charging; 0:56 remaining present: true`
pub fn parse_pmset_batt(output: &str) -> Result<(u8, bool), PowerError> {
    let line = output
        .lines()
        .find(|line| line.contains("InternalBattery"))
        .ok_or(PowerError::NoSources)?;

    let pct_idx = line.find('%').ok_or(PowerError::DescriptionUnavailable)?;
    let before = &line[..pct_idx];
    let digits_start = before
        .rfind(|c: char| !c.is_ascii_digit())
        .map(|i| i + 1)
        .unwrap_or(0);
    let percentage: u8 = before[digits_start..]
        .parse()
        .map_err(|_| PowerError::DataFieldsMissing)?;
    if percentage > 100 {
        return Err(PowerError::DataFieldsMissing);
    }

    // The field after the percentage is the charge state; "charged" and
    // "AC attached; not charging" are not charging.
    let state = line[pct_idx + 1..]
        .trim_start_matches(';')
        .split(';')
        .next()
        .unwrap_or("")
        .trim();
    let is_charging = state == "charging";

    Ok((percentage, is_charging))
}

/// Extract health readings from `ioreg -rn AppleSmartBattery` output.
/// Anything the service does not report stays `None`; a condition string is
/// derived with the same fallback chain the battery service uses.
pub fn parse_ioreg_health(output: &str) -> BatteryHealth {
    let mut cycle_count = None;
    let mut health_condition = None;
    let mut condition = None;
    let mut permanent_failure = None;
    let mut battery_installed = None;
    let mut raw_max_capacity = None;
    let mut max_capacity = None;
    let mut design_capacity = None;

    for line in output.lines() {
        let Some((key, value)) = split_ioreg_line(line) else {
            continue;
        };
        match key {
            "CycleCount" => cycle_count = value.parse::<u32>().ok(),
            "BatteryHealthCondition" => health_condition = parse_ioreg_string(value),
            "Condition" => condition = parse_ioreg_string(value),
            "PermanentFailureStatus" => permanent_failure = value.parse::<i64>().ok(),
            "BatteryInstalled" => battery_installed = parse_ioreg_bool(value),
            "AppleRawMaxCapacity" => raw_max_capacity = value.parse::<u32>().ok(),
            "MaxCapacity" => max_capacity = value.parse::<u32>().ok(),
            "DesignCapacity" => design_capacity = value.parse::<u32>().ok(),
            _ => {}
        }
    }

    let resolved_condition = health_condition
        .or(condition)
        .or_else(|| {
            permanent_failure.map(|status| {
                if status == 0 {
                    "Normal".to_string()
                } else {
                    "Service Battery".to_string()
                }
            })
        })
        .or_else(|| {
            battery_installed.map(|installed| {
                if installed {
                    "Installed".to_string()
                } else {
                    "Not Installed".to_string()
                }
            })
        });

    BatteryHealth {
        cycle_count,
        condition: resolved_condition,
        health_percentage: None,
        max_capacity: raw_max_capacity.or(max_capacity),
        design_capacity,
    }
    .with_derived_percentage()
}

/// Split an ioreg property line of the form `"Key" = value`.
fn split_ioreg_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    let rest = line.strip_prefix('"')?;
    let (key, rest) = rest.split_once('"')?;
    let value = rest.trim().strip_prefix('=')?.trim();
    Some((key, value))
}

fn parse_ioreg_string(value: &str) -> Option<String> {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .map(|v| v.to_string())
}

fn parse_ioreg_bool(value: &str) -> Option<bool> {
    match value {
        "Yes" => Some(true),
        "No" => Some(false),
        _ => None,
    }
}
