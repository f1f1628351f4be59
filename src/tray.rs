// ABOUTME: Status-bar icon and menu built with the tray-icon crate
// ABOUTME: The menu doubles as the settings form and shows live battery status

use crate::settings::{ColorScheme, NotificationSound, Settings};
use anyhow::Result;
use tray_icon::{
    TrayIcon, TrayIconBuilder,
    menu::{CheckMenuItem, Menu, MenuId, MenuItem, PredefinedMenuItem, Submenu},
};

// Menu item IDs - created at runtime
fn notify_high_id() -> MenuId {
    MenuId::new("notify_high")
}
fn notify_low_id() -> MenuId {
    MenuId::new("notify_low")
}
fn launch_at_login_id() -> MenuId {
    MenuId::new("launch_at_login")
}
fn test_notification_id() -> MenuId {
    MenuId::new("test_notification")
}
fn quit_id() -> MenuId {
    MenuId::new("quit_batwatch")
}
fn sound_id(sound: NotificationSound) -> MenuId {
    MenuId::new(format!("sound_{}", sound.system_name().to_lowercase()))
}
fn scheme_id(scheme: ColorScheme) -> MenuId {
    MenuId::new(format!("scheme_{}", scheme.label().to_lowercase()))
}

/// User actions coming out of the tray menu, handled on the main loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayAction {
    ToggleNotifyHigh,
    ToggleNotifyLow,
    ToggleLaunchAtLogin,
    SetSound(NotificationSound),
    SetColorScheme(ColorScheme),
    TestNotification,
    Quit,
}

pub struct BatwatchTray {
    _tray_icon: TrayIcon,
    status_item: MenuItem,
    health_item: MenuItem,
    notify_high_item: CheckMenuItem,
    notify_low_item: CheckMenuItem,
    login_item: CheckMenuItem,
    sound_items: Vec<(NotificationSound, CheckMenuItem)>,
    scheme_items: Vec<(ColorScheme, CheckMenuItem)>,
}

impl BatwatchTray {
    pub fn new(settings: &Settings) -> Result<Self> {
        let menu = Menu::new();

        // Live status lines, updated after every poll
        let status_item = MenuItem::new("Battery: loading...", false, None);
        let health_item = MenuItem::new("Battery health: unknown", false, None);
        menu.append(&status_item)?;
        menu.append(&health_item)?;
        menu.append(&PredefinedMenuItem::separator())?;

        let n = &settings.notifications;
        let notify_high_item = CheckMenuItem::with_id(
            notify_high_id(),
            format!("Notify at \u{2265} {}%", n.high_threshold),
            true,
            n.notify_on_high,
            None,
        );
        let notify_low_item = CheckMenuItem::with_id(
            notify_low_id(),
            format!("Notify at \u{2264} {}%", n.low_threshold),
            true,
            n.notify_on_low,
            None,
        );
        menu.append(&notify_high_item)?;
        menu.append(&notify_low_item)?;

        let sound_menu = Submenu::new("Sound", true);
        let mut sound_items = Vec::new();
        for sound in NotificationSound::ALL {
            let item = CheckMenuItem::with_id(
                sound_id(sound),
                sound.system_name(),
                true,
                sound == n.sound,
                None,
            );
            sound_menu.append(&item)?;
            sound_items.push((sound, item));
        }
        menu.append(&sound_menu)?;

        let scheme_menu = Submenu::new("Theme", true);
        let mut scheme_items = Vec::new();
        for scheme in ColorScheme::ALL {
            let item = CheckMenuItem::with_id(
                scheme_id(scheme),
                scheme.label(),
                true,
                scheme == settings.appearance.color_scheme,
                None,
            );
            scheme_menu.append(&item)?;
            scheme_items.push((scheme, item));
        }
        menu.append(&scheme_menu)?;

        let login_item = CheckMenuItem::with_id(
            launch_at_login_id(),
            "Launch at Login",
            true,
            settings.startup.launch_at_login,
            None,
        );
        menu.append(&login_item)?;
        menu.append(&PredefinedMenuItem::separator())?;

        let test_item = MenuItem::with_id(test_notification_id(), "Test Notification", true, None);
        menu.append(&test_item)?;
        menu.append(&PredefinedMenuItem::separator())?;
        menu.append(&MenuItem::with_id(quit_id(), "Quit Batwatch", true, None))?;

        let icon = battery_icon()?;
        let mut tray_builder = TrayIconBuilder::new()
            .with_menu(Box::new(menu))
            .with_tooltip("Batwatch")
            .with_icon(icon);

        // Template mode on macOS for automatic dark mode adaptation
        #[cfg(target_os = "macos")]
        {
            tray_builder = tray_builder.with_icon_as_template(true);
        }

        let tray_icon = tray_builder.build()?;

        Ok(Self {
            _tray_icon: tray_icon,
            status_item,
            health_item,
            notify_high_item,
            notify_low_item,
            login_item,
            sound_items,
            scheme_items,
        })
    }

    pub fn set_status(&self, status: &str) {
        self.status_item.set_text(format!("Battery: {status}"));
    }

    pub fn set_health(&self, health: &str) {
        self.health_item.set_text(health);
    }

    /// Re-derive every check mark from the settings, which also keeps the
    /// sound and theme submenus single-selection.
    pub fn sync_settings(&self, settings: &Settings) {
        let n = &settings.notifications;
        self.notify_high_item.set_checked(n.notify_on_high);
        self.notify_high_item
            .set_text(format!("Notify at \u{2265} {}%", n.high_threshold));
        self.notify_low_item.set_checked(n.notify_on_low);
        self.notify_low_item
            .set_text(format!("Notify at \u{2264} {}%", n.low_threshold));
        self.login_item.set_checked(settings.startup.launch_at_login);

        for (sound, item) in &self.sound_items {
            item.set_checked(*sound == n.sound);
        }
        for (scheme, item) in &self.scheme_items {
            item.set_checked(*scheme == settings.appearance.color_scheme);
        }
    }

}

/// Map a menu item id to the action it stands for. Ids belonging to the
/// read-only status lines map to nothing.
pub fn action_for(id: &MenuId) -> Option<TrayAction> {
    if *id == notify_high_id() {
        return Some(TrayAction::ToggleNotifyHigh);
    }
    if *id == notify_low_id() {
        return Some(TrayAction::ToggleNotifyLow);
    }
    if *id == launch_at_login_id() {
        return Some(TrayAction::ToggleLaunchAtLogin);
    }
    if *id == test_notification_id() {
        return Some(TrayAction::TestNotification);
    }
    if *id == quit_id() {
        return Some(TrayAction::Quit);
    }
    for sound in NotificationSound::ALL {
        if *id == sound_id(sound) {
            return Some(TrayAction::SetSound(sound));
        }
    }
    for scheme in ColorScheme::ALL {
        if *id == scheme_id(scheme) {
            return Some(TrayAction::SetColorScheme(scheme));
        }
    }
    None
}

/// Draw the menubar battery glyph: a 32x32 template image (black + alpha)
/// with a body outline, charge bar and terminal nub.
fn battery_icon() -> Result<tray_icon::Icon> {
    const SIZE: u32 = 32;
    let mut img = image::RgbaImage::new(SIZE, SIZE);

    let body_left = 3;
    let body_right = 26;
    let body_top = 10;
    let body_bottom = 22;

    for y in body_top..=body_bottom {
        for x in body_left..=body_right {
            let on_border =
                y == body_top || y == body_bottom || x == body_left || x == body_right;
            // Roughly two-thirds charged
            let in_fill = x > body_left + 1 && x < body_left + 16 && y > body_top + 1 && y < body_bottom - 1;
            if on_border || in_fill {
                img.put_pixel(x, y, image::Rgba([0, 0, 0, 255]));
            }
        }
    }
    // Terminal nub
    for y in 13..=19 {
        for x in 27..=29 {
            img.put_pixel(x, y, image::Rgba([0, 0, 0, 255]));
        }
    }

    let icon = tray_icon::Icon::from_rgba(img.into_raw(), SIZE, SIZE)?;
    Ok(icon)
}
