// ABOUTME: User-facing alert delivery behind an injected Notifier trait
// ABOUTME: Desktop notifications via notify-rust with a log-only fallback when delivery is refused

use crate::settings::NotificationSound;
use std::cell::Cell;
use std::rc::Rc;
use tracing::{info, warn};

/// Alert presentation contract. Called by the poller at most once per
/// trigger transition; implementations must not block the poll cycle.
pub trait Notifier {
    fn notify(&mut self, message: &str, important: bool);
}

/// Notification permission as the platform reports it. Not-yet-determined
/// means delivery is attempted and the outcome decides the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    Authorized,
    NotDetermined,
    Denied,
}

/// Sends desktop notifications carrying the configured system sound. A
/// refused delivery demotes the notifier to log-only so the poller never
/// retries presentation within a cycle.
pub struct DesktopNotifier {
    auth: AuthorizationStatus,
    sound: Rc<Cell<NotificationSound>>,
}

impl DesktopNotifier {
    pub fn new(sound: Rc<Cell<NotificationSound>>) -> Self {
        Self {
            auth: AuthorizationStatus::NotDetermined,
            sound,
        }
    }

    pub fn authorization_status(&self) -> AuthorizationStatus {
        self.auth
    }

    fn deliver(&self, message: &str, important: bool) -> notify_rust::error::Result<()> {
        let mut notification = notify_rust::Notification::new();
        notification
            .appname("Batwatch")
            .summary("Battery Alert")
            .body(message)
            .sound_name(self.sound.get().system_name());
        if important {
            // Keep important alerts on screen until dismissed
            notification.timeout(notify_rust::Timeout::Never);
        }
        notification.show()?;
        Ok(())
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&mut self, message: &str, important: bool) {
        if self.auth == AuthorizationStatus::Denied {
            info!("Notification suppressed (not authorized): {message}");
            return;
        }

        match self.deliver(message, important) {
            Ok(()) => {
                self.auth = AuthorizationStatus::Authorized;
                info!("Notification sent: {message}");
            }
            Err(e) => {
                warn!("Notification delivery refused, falling back to log-only: {e}");
                self.auth = AuthorizationStatus::Denied;
                info!("Notification (log-only): {message}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_not_determined() {
        let sound = Rc::new(Cell::new(NotificationSound::Ping));
        let notifier = DesktopNotifier::new(sound);
        assert_eq!(
            notifier.authorization_status(),
            AuthorizationStatus::NotDetermined
        );
    }

    #[test]
    fn test_denied_notifier_stays_quiet() {
        let sound = Rc::new(Cell::new(NotificationSound::Ping));
        let mut notifier = DesktopNotifier::new(sound);
        notifier.auth = AuthorizationStatus::Denied;

        // Must not attempt delivery or change status
        notifier.notify("test", true);
        assert_eq!(notifier.authorization_status(), AuthorizationStatus::Denied);
    }

    #[test]
    fn test_sound_handle_is_shared() {
        let sound = Rc::new(Cell::new(NotificationSound::Ping));
        let notifier = DesktopNotifier::new(sound.clone());

        sound.set(NotificationSound::Glass);
        assert_eq!(notifier.sound.get(), NotificationSound::Glass);
    }
}
