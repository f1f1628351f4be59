// ABOUTME: Process entry and the tao event loop driving the monitor
// ABOUTME: Timer ticks, power-change wakeups and menu events all serialize here

mod battery;
mod monitor;
mod notify;
mod platform;
mod settings;
mod sound;
mod tray;

use anyhow::Result;
use monitor::{AlertConfig, BatteryMonitor};
use notify::DesktopNotifier;
use platform::{LoginItems, Platform};
use settings::{NotificationSound, Settings};
use sound::SoundPlayer;
use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;
use tao::event::{Event, StartCause};
use tao::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy};
use tracing::{debug, error, info, warn};
use tray::{BatwatchTray, TrayAction};
use tray_icon::menu::MenuEvent;

const POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Events delivered to the main loop. Ticks and power changes converge on
/// the same poll; menu events carry interactions with the settings form.
#[derive(Debug)]
enum AppEvent {
    Tick,
    PowerChanged,
    Menu(MenuEvent),
}

struct App {
    settings: Settings,
    settings_path: PathBuf,
    monitor: BatteryMonitor,
    // Created inside the event loop once it has started
    tray: Option<BatwatchTray>,
    sound: Rc<Cell<NotificationSound>>,
    sound_player: SoundPlayer,
    login_items: Option<Box<dyn LoginItems>>,
}

impl App {
    fn new() -> Result<Self> {
        let settings_path = Settings::default_settings_path()?;
        let settings = Settings::load_or_default(&settings_path);

        let sound = Rc::new(Cell::new(settings.notifications.sound));
        let notifier = DesktopNotifier::new(sound.clone());
        let monitor = BatteryMonitor::new(Platform::power_reader(), Box::new(notifier));

        let login_items = match Platform::login_items() {
            Ok(items) => Some(items),
            Err(e) => {
                warn!("Login item management unavailable: {e:#}");
                None
            }
        };

        Ok(Self {
            settings,
            settings_path,
            monitor,
            tray: None,
            sound,
            sound_player: SoundPlayer::new(),
            login_items,
        })
    }

    fn poll(&mut self) {
        let alerts = AlertConfig::from_settings(&self.settings);
        self.monitor.poll(&alerts);
        self.refresh_display();
    }

    fn refresh_display(&self) {
        let Some(tray) = &self.tray else {
            return;
        };
        if let Some(error) = self.monitor.last_error() {
            tray.set_status(error);
        } else if let Some(info) = self.monitor.last_info() {
            tray.set_status(&info.display_string());
        }
        if let Some(info) = self.monitor.last_info() {
            tray.set_health(&info.health.display_string());
        }
    }

    /// Apply a menu action. Returns true when the app should quit.
    fn handle_action(&mut self, action: TrayAction) -> bool {
        debug!(?action, "tray action");
        match action {
            TrayAction::ToggleNotifyHigh => {
                let n = &mut self.settings.notifications;
                n.notify_on_high = !n.notify_on_high;
                self.persist_settings();
            }
            TrayAction::ToggleNotifyLow => {
                let n = &mut self.settings.notifications;
                n.notify_on_low = !n.notify_on_low;
                self.persist_settings();
            }
            TrayAction::SetSound(sound) => {
                self.settings.notifications.sound = sound;
                self.sound.set(sound);
                // Preview the newly picked sound
                self.sound_player.play(sound);
                self.persist_settings();
            }
            TrayAction::SetColorScheme(scheme) => {
                self.settings.appearance.color_scheme = scheme;
                self.persist_settings();
            }
            TrayAction::ToggleLaunchAtLogin => {
                let enabled = !self.settings.startup.launch_at_login;
                self.settings.startup.launch_at_login = enabled;
                self.persist_settings();
                self.sync_login_item(enabled);
            }
            TrayAction::TestNotification => {
                self.monitor
                    .notifier_mut()
                    .notify("This is a manual test alert from Batwatch.", false);
            }
            TrayAction::Quit => {
                info!("Quit requested");
                return true;
            }
        }
        false
    }

    fn persist_settings(&self) {
        if let Err(e) = self.settings.save(&self.settings_path) {
            warn!("Failed to persist settings: {e:#}");
        }
        if let Some(tray) = &self.tray {
            tray.sync_settings(&self.settings);
        }
    }

    /// Registration errors are logged only, never surfaced to the user.
    fn sync_login_item(&self, enabled: bool) {
        let Some(items) = &self.login_items else {
            return;
        };
        if let Err(e) = items.set_enabled(enabled) {
            warn!("Failed to update login item: {e:#}");
        } else {
            info!(enabled, "login item updated");
        }
    }
}

fn spawn_poll_timer(proxy: EventLoopProxy<AppEvent>) {
    std::thread::spawn(move || {
        loop {
            std::thread::sleep(POLL_INTERVAL);
            if proxy.send_event(AppEvent::Tick).is_err() {
                return;
            }
        }
    });
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "batwatch=info".into()),
        )
        .init();

    #[cfg_attr(not(target_os = "macos"), allow(unused_mut))]
    let mut event_loop = EventLoopBuilder::<AppEvent>::with_user_event().build();

    // Menubar only, no Dock icon
    #[cfg(target_os = "macos")]
    {
        use tao::platform::macos::{ActivationPolicy, EventLoopExtMacOS};
        event_loop.set_activation_policy(ActivationPolicy::Accessory);
    }

    // Menu events arrive on the platform's menu thread; forward them into
    // the loop so all state changes happen in one place
    let menu_proxy = event_loop.create_proxy();
    MenuEvent::set_event_handler(Some(move |event| {
        let _ = menu_proxy.send_event(AppEvent::Menu(event));
    }));

    spawn_poll_timer(event_loop.create_proxy());

    let watcher_proxy = event_loop.create_proxy();
    Platform::spawn_power_change_watcher(move || {
        let _ = watcher_proxy.send_event(AppEvent::PowerChanged);
    });

    let mut app = App::new()?;

    info!("Batwatch running");
    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        match event {
            // The tray icon has to be created after the loop has started
            Event::NewEvents(StartCause::Init) => {
                match BatwatchTray::new(&app.settings) {
                    Ok(tray) => app.tray = Some(tray),
                    Err(e) => {
                        error!("Failed to create tray icon: {e:#}");
                        *control_flow = ControlFlow::Exit;
                        return;
                    }
                }

                // First reading before the timer fires
                app.poll();

                // Nudge the run loop so the status item shows up right away
                #[cfg(target_os = "macos")]
                if let Some(run_loop) = objc2_core_foundation::CFRunLoop::main() {
                    run_loop.wake_up();
                }
            }
            Event::UserEvent(AppEvent::Tick) => {
                debug!("poll timer tick");
                app.poll();
            }
            Event::UserEvent(AppEvent::PowerChanged) => {
                debug!("power source changed");
                app.poll();
            }
            Event::UserEvent(AppEvent::Menu(menu_event)) => {
                if let Some(action) = tray::action_for(&menu_event.id)
                    && app.handle_action(action)
                {
                    app.tray.take();
                    *control_flow = ControlFlow::Exit;
                }
            }
            _ => {}
        }
    })
}
