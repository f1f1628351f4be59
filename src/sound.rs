// ABOUTME: Plays named system sounds, used to preview a sound picked in the menu
// ABOUTME: NSSound on macOS with a Ping fallback, a no-op elsewhere

use crate::settings::NotificationSound;

pub struct SoundPlayer;

impl SoundPlayer {
    pub fn new() -> Self {
        Self
    }

    #[cfg(target_os = "macos")]
    pub fn play(&self, sound: NotificationSound) {
        use objc2_app_kit::NSSound;
        use objc2_foundation::NSString;

        let name = NSString::from_str(sound.system_name());
        let played = unsafe { NSSound::soundNamed(&name) }.is_some_and(|s| s.play());
        if played {
            tracing::debug!("Playing system sound: {sound}");
        } else {
            // Unknown sound name, fall back to the default
            let fallback = NSString::from_str(NotificationSound::Ping.system_name());
            if let Some(s) = unsafe { NSSound::soundNamed(&fallback) } {
                s.play();
            }
            tracing::debug!("Fell back to default system sound: Ping");
        }
    }

    #[cfg(not(target_os = "macos"))]
    pub fn play(&self, sound: NotificationSound) {
        tracing::debug!("System sound playback not supported here, skipping {sound}");
    }
}

impl Default for SoundPlayer {
    fn default() -> Self {
        Self::new()
    }
}
