// ABOUTME: Battery poller and the per-direction notification edge-detector
// ABOUTME: Fires one alert per threshold crossing rather than one per poll cycle

use crate::battery::BatteryInfo;
use crate::notify::Notifier;
use crate::platform::PowerReader;
use crate::settings::Settings;
use tracing::{debug, info, warn};

/// Alert configuration read fresh from the settings store on each poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertConfig {
    pub high_enabled: bool,
    pub low_enabled: bool,
    pub high_threshold: u8,
    pub low_threshold: u8,
}

impl AlertConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        let n = &settings.notifications;
        Self {
            high_enabled: n.notify_on_high,
            low_enabled: n.notify_on_low,
            high_threshold: n.high_threshold,
            low_threshold: n.low_threshold,
        }
    }
}

/// One direction of the edge-detector. A trigger fires exactly once when its
/// condition becomes true while enabled, then stays quiet until the condition
/// has been false again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Armed,
    Fired,
}

impl Trigger {
    /// Advance the state machine for one sample. Returns true only on the
    /// Armed -> Fired transition.
    fn update(&mut self, condition: bool, enabled: bool) -> bool {
        match self {
            Trigger::Armed if condition && enabled => {
                *self = Trigger::Fired;
                true
            }
            Trigger::Fired if !condition => {
                *self = Trigger::Armed;
                false
            }
            _ => false,
        }
    }
}

/// Session-scoped notification state, one trigger per direction. Created at
/// monitor start, discarded at process exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TriggerState {
    high: Trigger,
    low: Trigger,
}

impl TriggerState {
    fn new() -> Self {
        Self {
            high: Trigger::Armed,
            low: Trigger::Armed,
        }
    }
}

/// Polls the power reader and runs the edge-detector over each snapshot.
/// All calls happen on the main event loop; the reader and notifier are
/// injected so the logic is testable without the OS.
pub struct BatteryMonitor {
    reader: Box<dyn PowerReader>,
    notifier: Box<dyn Notifier>,
    triggers: TriggerState,
    last_info: Option<BatteryInfo>,
    last_error: Option<String>,
}

impl BatteryMonitor {
    pub fn new(reader: Box<dyn PowerReader>, notifier: Box<dyn Notifier>) -> Self {
        Self {
            reader,
            notifier,
            triggers: TriggerState::new(),
            last_info: None,
            last_error: None,
        }
    }

    /// Run one poll cycle: read the power source, evaluate triggers on
    /// success, publish the snapshot. A failed read records the error string
    /// and leaves the previous snapshot and trigger state untouched.
    pub fn poll(&mut self, alerts: &AlertConfig) {
        match self.reader.read() {
            Ok(info) => {
                debug!(
                    percentage = info.percentage,
                    charging = info.is_charging,
                    "battery poll"
                );
                self.evaluate_triggers(&info, alerts);
                self.last_info = Some(info);
                self.last_error = None;
            }
            Err(e) => {
                warn!("Battery read failed: {e}");
                self.last_error = Some(e.to_string());
            }
        }
    }

    fn evaluate_triggers(&mut self, info: &BatteryInfo, alerts: &AlertConfig) {
        let high_condition = info.is_charging && info.percentage >= alerts.high_threshold;
        if self.triggers.high.update(high_condition, alerts.high_enabled) {
            info!(percentage = info.percentage, "high battery alert");
            self.notifier.notify(
                &format!(
                    "Battery is at {}%. You can unplug the charger.",
                    info.percentage
                ),
                true,
            );
        }

        let low_condition = !info.is_charging && info.percentage <= alerts.low_threshold;
        if self.triggers.low.update(low_condition, alerts.low_enabled) {
            info!(percentage = info.percentage, "low battery alert");
            self.notifier.notify(
                &format!("Battery is low ({}%). Plug in the charger.", info.percentage),
                true,
            );
        }
    }

    /// The most recent successful snapshot, kept across failed polls.
    pub fn last_info(&self) -> Option<&BatteryInfo> {
        self.last_info.as_ref()
    }

    /// The user-visible error string from the most recent poll, if it failed.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn notifier_mut(&mut self) -> &mut dyn Notifier {
        self.notifier.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battery::{BatteryHealth, BatteryInfo, PowerError};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    struct ScriptedReader {
        samples: RefCell<VecDeque<Result<BatteryInfo, PowerError>>>,
    }

    impl ScriptedReader {
        fn new(samples: Vec<Result<BatteryInfo, PowerError>>) -> Self {
            Self {
                samples: RefCell::new(samples.into()),
            }
        }
    }

    impl PowerReader for ScriptedReader {
        fn read(&self) -> Result<BatteryInfo, PowerError> {
            self.samples
                .borrow_mut()
                .pop_front()
                .unwrap_or(Err(PowerError::SourceUnavailable))
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        messages: Rc<RefCell<Vec<String>>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&mut self, message: &str, _important: bool) {
            self.messages.borrow_mut().push(message.to_string());
        }
    }

    fn sample(percentage: u8, is_charging: bool) -> Result<BatteryInfo, PowerError> {
        Ok(BatteryInfo::new(
            percentage,
            is_charging,
            BatteryHealth::default(),
        ))
    }

    fn monitor_over(
        samples: Vec<Result<BatteryInfo, PowerError>>,
    ) -> (BatteryMonitor, Rc<RefCell<Vec<String>>>) {
        let messages = Rc::new(RefCell::new(Vec::new()));
        let notifier = RecordingNotifier {
            messages: messages.clone(),
        };
        let monitor = BatteryMonitor::new(
            Box::new(ScriptedReader::new(samples)),
            Box::new(notifier),
        );
        (monitor, messages)
    }

    fn defaults() -> AlertConfig {
        AlertConfig::from_settings(&Settings::default())
    }

    fn run(monitor: &mut BatteryMonitor, alerts: &AlertConfig, polls: usize) {
        for _ in 0..polls {
            monitor.poll(alerts);
        }
    }

    #[test]
    fn test_high_alert_fires_once_per_crossing() {
        let (mut monitor, messages) = monitor_over(vec![
            sample(75, true),
            sample(80, true),
            sample(85, true),
            sample(85, true),
        ]);
        run(&mut monitor, &defaults(), 4);

        let messages = messages.borrow();
        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0],
            "Battery is at 80%. You can unplug the charger."
        );
    }

    #[test]
    fn test_high_alert_rearms_after_dropping_below_threshold() {
        let (mut monitor, messages) = monitor_over(vec![
            sample(85, true),
            sample(79, true),
            sample(82, true),
        ]);
        run(&mut monitor, &defaults(), 3);

        let messages = messages.borrow();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("85%"));
        assert!(messages[1].contains("82%"));
    }

    #[test]
    fn test_high_alert_rearms_on_unplug() {
        let (mut monitor, messages) = monitor_over(vec![
            sample(90, true),
            sample(90, false),
            sample(90, true),
        ]);
        run(&mut monitor, &defaults(), 3);
        assert_eq!(messages.borrow().len(), 2);
    }

    #[test]
    fn test_no_high_alert_while_discharging() {
        let (mut monitor, messages) = monitor_over(vec![sample(95, false), sample(100, false)]);
        run(&mut monitor, &defaults(), 2);
        assert!(messages.borrow().is_empty());
    }

    #[test]
    fn test_low_alert_fires_once_per_crossing() {
        let (mut monitor, messages) = monitor_over(vec![
            sample(25, false),
            sample(20, false),
            sample(15, false),
            sample(12, false),
        ]);
        run(&mut monitor, &defaults(), 4);

        let messages = messages.borrow();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0], "Battery is low (20%). Plug in the charger.");
    }

    #[test]
    fn test_low_alert_rearms_when_charging_resumes() {
        let (mut monitor, messages) = monitor_over(vec![
            sample(18, false),
            sample(19, true),
            sample(18, false),
        ]);
        run(&mut monitor, &defaults(), 3);
        assert_eq!(messages.borrow().len(), 2);
    }

    #[test]
    fn test_no_low_alert_while_charging() {
        let (mut monitor, messages) = monitor_over(vec![sample(5, true), sample(10, true)]);
        run(&mut monitor, &defaults(), 2);
        assert!(messages.borrow().is_empty());
    }

    #[test]
    fn test_disabled_high_direction_never_fires() {
        let mut alerts = defaults();
        alerts.high_enabled = false;

        let (mut monitor, messages) = monitor_over(vec![
            sample(85, true),
            sample(90, true),
            sample(100, true),
        ]);
        run(&mut monitor, &alerts, 3);
        assert!(messages.borrow().is_empty());
    }

    #[test]
    fn test_disabled_low_direction_never_fires() {
        let mut alerts = defaults();
        alerts.low_enabled = false;

        let (mut monitor, messages) = monitor_over(vec![sample(10, false), sample(5, false)]);
        run(&mut monitor, &alerts, 2);
        assert!(messages.borrow().is_empty());
    }

    #[test]
    fn test_custom_thresholds() {
        let alerts = AlertConfig {
            high_enabled: true,
            low_enabled: true,
            high_threshold: 90,
            low_threshold: 30,
        };

        let (mut monitor, messages) = monitor_over(vec![
            sample(85, true),
            sample(90, true),
            sample(35, false),
            sample(30, false),
        ]);
        run(&mut monitor, &alerts, 4);

        let messages = messages.borrow();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("90%"));
        assert!(messages[1].contains("30%"));
    }

    #[test]
    fn test_both_directions_are_independent() {
        // Charge up past the high threshold, then drain past the low one.
        let (mut monitor, messages) = monitor_over(vec![
            sample(82, true),
            sample(85, true),
            sample(50, false),
            sample(18, false),
            sample(15, false),
        ]);
        run(&mut monitor, &defaults(), 5);

        let messages = messages.borrow();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("unplug"));
        assert!(messages[1].contains("Plug in"));
    }

    #[test]
    fn test_failed_poll_records_error_and_keeps_snapshot() {
        let (mut monitor, messages) = monitor_over(vec![
            sample(50, false),
            Err(PowerError::NoSources),
        ]);
        let alerts = defaults();

        monitor.poll(&alerts);
        assert_eq!(monitor.last_info().unwrap().percentage, 50);
        assert!(monitor.last_error().is_none());

        monitor.poll(&alerts);
        assert_eq!(monitor.last_error(), Some("No battery found"));
        // Last successful snapshot is still available for display
        assert_eq!(monitor.last_info().unwrap().percentage, 50);
        assert!(messages.borrow().is_empty());
    }

    #[test]
    fn test_failed_poll_does_not_mutate_trigger_state() {
        // Fire the high trigger, fail a poll, then keep qualifying: the
        // trigger must still be in its fired state, so no second alert.
        let (mut monitor, messages) = monitor_over(vec![
            sample(85, true),
            Err(PowerError::SourceUnavailable),
            sample(86, true),
        ]);
        run(&mut monitor, &defaults(), 3);
        assert_eq!(messages.borrow().len(), 1);
    }

    #[test]
    fn test_failed_poll_never_notifies() {
        let (mut monitor, messages) = monitor_over(vec![
            Err(PowerError::DataFieldsMissing),
            Err(PowerError::DescriptionUnavailable),
        ]);
        run(&mut monitor, &defaults(), 2);
        assert!(messages.borrow().is_empty());
        assert!(monitor.last_info().is_none());
    }

    #[test]
    fn test_recovery_after_failed_poll() {
        let (mut monitor, _) = monitor_over(vec![
            Err(PowerError::SourceUnavailable),
            sample(60, true),
        ]);
        let alerts = defaults();

        monitor.poll(&alerts);
        assert!(monitor.last_error().is_some());

        monitor.poll(&alerts);
        assert!(monitor.last_error().is_none());
        assert_eq!(monitor.last_info().unwrap().percentage, 60);
    }

    #[test]
    fn test_exactly_one_alert_per_qualifying_run() {
        // Property check over a longer mixed sequence: three maximal
        // qualifying high runs, so exactly three high alerts.
        let samples = vec![
            sample(70, true),
            sample(80, true), // run 1 starts
            sample(90, true),
            sample(90, false), // run 1 ends
            sample(90, true),  // run 2
            sample(75, true),  // run 2 ends
            sample(80, true),  // run 3
            sample(81, true),
        ];
        let (mut monitor, messages) = monitor_over(samples);
        run(&mut monitor, &defaults(), 8);
        assert_eq!(messages.borrow().len(), 3);
    }

    #[test]
    fn test_enabling_mid_run_fires_for_held_condition() {
        // The trigger stays armed while disabled, so enabling the direction
        // during a qualifying run fires on the next sample.
        let mut alerts = defaults();
        alerts.high_enabled = false;

        let (mut monitor, messages) = monitor_over(vec![sample(85, true), sample(86, true)]);
        monitor.poll(&alerts);
        assert!(messages.borrow().is_empty());

        alerts.high_enabled = true;
        monitor.poll(&alerts);
        assert_eq!(messages.borrow().len(), 1);
    }
}
