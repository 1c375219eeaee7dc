// dhcpcd-tray - Tray Status Service
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Tray status service on the session bus.
//!
//! The engine's [`Presenter`] calls land here. State is published as
//! properties of a D-Bus object so a panel applet or status notifier can
//! render it, and the object's methods send commands back to the main
//! loop through a channel.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};

use tokio::runtime::{Handle, Runtime};
use tracing::{debug, info};
use zbus::{interface, Connection};

use crate::engine::{Notification, Presenter, StatusUpdate};
use crate::models::{AppConfig, Classification, Result, ScanRecord, DBUS_OBJECT_PATH, DBUS_SERVICE_NAME};
use crate::services::{DesktopNotifier, IconAnimation};
use crate::APP_NAME;

/// Commands sent from the bus to the main loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrayCommand {
    /// Ask every wireless interface for a fresh scan
    Rescan,
    /// Quit the application
    Quit,
}

/// One visible access point: interface, SSID, signal level, secured.
pub type AccessPoint = (String, String, i32, bool);

/// What the tray currently shows.
#[derive(Debug, Clone, Default)]
pub struct TrayState {
    pub tooltip: String,
    pub status: Classification,
    pub icon_name: String,
    pub access_points: Vec<AccessPoint>,
}

impl TrayState {
    /// Replace the access points listed for `interface`.
    pub fn set_access_points(&mut self, interface: &str, scans: &[ScanRecord]) {
        self.access_points.retain(|(iface, ..)| iface != interface);
        self.access_points.extend(
            scans
                .iter()
                .map(|r| (interface.to_string(), r.ssid.clone(), r.strength, r.is_secure())),
        );
    }
}

/// D-Bus object exposing the tray state.
pub struct StatusInterface {
    state: Arc<Mutex<TrayState>>,
    command_tx: Sender<TrayCommand>,
}

impl StatusInterface {
    fn snapshot(&self) -> TrayState {
        self.state.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[interface(name = "com.chrisdaggas.DhcpcdTray.Status")]
impl StatusInterface {
    /// Request a wireless rescan.
    async fn rescan(&self) {
        let _ = self.command_tx.send(TrayCommand::Rescan);
    }

    /// Quit the application.
    async fn quit(&self) {
        let _ = self.command_tx.send(TrayCommand::Quit);
    }

    #[zbus(property)]
    async fn tooltip(&self) -> String {
        self.snapshot().tooltip
    }

    /// One of `online`, `carrier` or `offline`.
    #[zbus(property)]
    async fn status(&self) -> String {
        self.snapshot().status.as_str().to_string()
    }

    #[zbus(property)]
    async fn icon_name(&self) -> String {
        self.snapshot().icon_name
    }

    #[zbus(property)]
    async fn access_points(&self) -> Vec<AccessPoint> {
        self.snapshot().access_points
    }
}

/// Emit `PropertiesChanged` for every property of the status object.
fn publish(connection: &Connection, runtime: &Handle) {
    let connection = connection.clone();
    runtime.spawn(async move {
        let iface = match connection
            .object_server()
            .interface::<_, StatusInterface>(DBUS_OBJECT_PATH)
            .await
        {
            Ok(iface) => iface,
            Err(e) => {
                debug!("Status object not available: {}", e);
                return;
            }
        };
        let ctxt = iface.signal_context();
        let object = iface.get().await;
        let results = [
            object.tooltip_changed(ctxt).await,
            object.status_changed(ctxt).await,
            object.icon_name_changed(ctxt).await,
            object.access_points_changed(ctxt).await,
        ];
        for result in results {
            if let Err(e) = result {
                debug!("Failed to emit property change: {}", e);
            }
        }
    });
}

/// Presenter backed by the session bus status object.
pub struct TrayHandle {
    connection: Connection,
    runtime: Handle,
    state: Arc<Mutex<TrayState>>,
    animation: Rc<RefCell<IconAnimation>>,
    animation_timer: Rc<RefCell<Option<glib::SourceId>>>,
    notifier: DesktopNotifier,
}

impl TrayHandle {
    fn update_state(&self, update: impl FnOnce(&mut TrayState)) {
        if let Ok(mut state) = self.state.lock() {
            update(&mut state);
        }
        publish(&self.connection, &self.runtime);
    }

    fn stop_animation(&self) {
        if let Some(source) = self.animation_timer.borrow_mut().take() {
            source.remove();
        }
    }

    /// Restart the icon animation for `mode`.
    fn animate(&self, mode: Classification) {
        self.stop_animation();
        let period = self.animation.borrow_mut().start(mode);
        let icon = self.animation.borrow().icon();
        self.update_state(|s| s.icon_name = icon.to_string());

        let Some(period) = period else {
            return;
        };
        let animation = Rc::clone(&self.animation);
        let timer = Rc::clone(&self.animation_timer);
        let state = Arc::clone(&self.state);
        let connection = self.connection.clone();
        let runtime = self.runtime.clone();
        let source = glib::timeout_add_local(period, move || {
            let mut animation = animation.borrow_mut();
            if !animation.tick() {
                // The source is dropped by returning Break; forget it first
                timer.borrow_mut().take();
                return glib::ControlFlow::Break;
            }
            if let Ok(mut state) = state.lock() {
                state.icon_name = animation.icon().to_string();
            }
            publish(&connection, &runtime);
            glib::ControlFlow::Continue
        });
        *self.animation_timer.borrow_mut() = Some(source);
    }

    pub fn close(&mut self) {
        self.stop_animation();
        self.notifier.close();
    }
}

impl Presenter for TrayHandle {
    fn status_changed(&mut self, update: &StatusUpdate) {
        let tooltip = update.tooltip.clone();
        let classification = update.classification;
        self.update_state(|s| {
            s.tooltip = tooltip;
            s.status = classification;
        });
        if update.changed {
            self.animate(classification);
        }
    }

    fn scan_updated(&mut self, interface: &str, scans: &[ScanRecord]) {
        self.update_state(|s| s.set_access_points(interface, scans));
    }

    fn connection_lost(&mut self) {
        self.animate(Classification::Offline);
        self.update_state(|s| s.access_points.clear());
    }

    fn connection_restored(&mut self) {
        debug!("Tray: dhcpcd connection restored");
    }

    fn show_notification(&mut self, notification: &Notification) {
        self.notifier.show(notification);
    }

    fn close_notification(&mut self) {
        self.notifier.close();
    }
}

/// Register the status object on the session bus.
///
/// Returns the presenter and the receiver for commands from the bus.
pub fn start_tray(runtime: &Runtime, config: &AppConfig) -> Result<(TrayHandle, Receiver<TrayCommand>)> {
    let (tx, rx) = channel();
    let state = Arc::new(Mutex::new(TrayState {
        icon_name: crate::services::animation::ICON_OFFLINE.to_string(),
        ..Default::default()
    }));
    let interface = StatusInterface {
        state: Arc::clone(&state),
        command_tx: tx,
    };

    let connection = runtime.block_on(async {
        let connection = Connection::session().await?;
        if let Err(e) = connection.request_name(DBUS_SERVICE_NAME).await {
            // Another instance may own the name; the object is still served
            debug!("Could not own {}: {}", DBUS_SERVICE_NAME, e);
        }
        connection.object_server().at(DBUS_OBJECT_PATH, interface).await?;
        Ok::<_, zbus::Error>(connection)
    })?;
    info!("Tray status service started");

    let notifier = DesktopNotifier::new(
        connection.clone(),
        runtime.handle().clone(),
        APP_NAME,
        config.notification_timeout_ms,
    );
    let handle = TrayHandle {
        connection,
        runtime: runtime.handle().clone(),
        state,
        animation: Rc::new(RefCell::new(IconAnimation::new())),
        animation_timer: Rc::new(RefCell::new(None)),
        notifier,
    };
    Ok((handle, rx))
}
