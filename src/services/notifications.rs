// dhcpcd-tray - Desktop Notifications
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Desktop notifications through `org.freedesktop.Notifications`.
//!
//! Requests are queued to a single task on the shared tokio runtime, so
//! the main loop never waits for the notification server and every close
//! sees the id of the notification shown before it.

use std::collections::HashMap;
use std::future::Future;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};
use zbus::zvariant::Value;
use zbus::Connection;

use crate::engine::Notification;

const NOTIFICATIONS_NAME: &str = "org.freedesktop.Notifications";
const NOTIFICATIONS_PATH: &str = "/org/freedesktop/Notifications";
const NOTIFICATIONS_INTERFACE: &str = "org.freedesktop.Notifications";

#[derive(Debug)]
enum Request {
    Show(Notification),
    Close,
}

/// The calls made on a notification server.
trait NotificationServer: Send + Sync + 'static {
    /// Show `notification` in place of `replaces_id` (0 for none); returns its id.
    fn notify(
        &self,
        replaces_id: u32,
        notification: Notification,
    ) -> impl Future<Output = zbus::Result<u32>> + Send;

    fn close(&self, id: u32) -> impl Future<Output = zbus::Result<()>> + Send;
}

/// The session bus notification server.
struct BusNotifications {
    connection: Connection,
    app_name: String,
    timeout_ms: i32,
}

impl NotificationServer for BusNotifications {
    async fn notify(&self, replaces_id: u32, notification: Notification) -> zbus::Result<u32> {
        let actions: Vec<&str> = Vec::new();
        let reply = self
            .connection
            .call_method(
                Some(NOTIFICATIONS_NAME),
                NOTIFICATIONS_PATH,
                Some(NOTIFICATIONS_INTERFACE),
                "Notify",
                &(
                    self.app_name.as_str(),
                    replaces_id,
                    notification.icon.icon_name(),
                    notification.title.as_str(),
                    notification.body.as_str(),
                    actions,
                    transient_hints(),
                    self.timeout_ms,
                ),
            )
            .await?;
        reply.body().deserialize::<u32>()
    }

    async fn close(&self, id: u32) -> zbus::Result<()> {
        self.connection
            .call_method(
                Some(NOTIFICATIONS_NAME),
                NOTIFICATIONS_PATH,
                Some(NOTIFICATIONS_INTERFACE),
                "CloseNotification",
                &(id,),
            )
            .await?;
        Ok(())
    }
}

/// Handle requests in order, remembering the notification on screen.
async fn serve<S: NotificationServer>(server: S, mut requests: UnboundedReceiver<Request>) {
    let mut current: Option<u32> = None;
    while let Some(request) = requests.recv().await {
        match request {
            Request::Show(notification) => {
                let title = notification.title.clone();
                match server.notify(current.unwrap_or(0), notification).await {
                    Ok(id) => {
                        debug!("Notification {} shown: {}", id, title);
                        current = Some(id);
                    }
                    Err(e) => warn!("Failed to show notification: {}", e),
                }
            }
            Request::Close => {
                let Some(id) = current.take() else {
                    continue;
                };
                if let Err(e) = server.close(id).await {
                    debug!("Failed to close notification {}: {}", id, e);
                }
            }
        }
    }
    debug!("Notification queue closed");
}

/// Sends notifications and closes the one on screen.
pub struct DesktopNotifier {
    requests: UnboundedSender<Request>,
}

impl DesktopNotifier {
    pub fn new(connection: Connection, runtime: Handle, app_name: &str, timeout_ms: i32) -> Self {
        let (tx, rx) = unbounded_channel();
        let server = BusNotifications {
            connection,
            app_name: app_name.to_string(),
            timeout_ms,
        };
        runtime.spawn(serve(server, rx));
        Self { requests: tx }
    }

    fn send(&self, request: Request) {
        if let Err(e) = self.requests.send(request) {
            debug!("Notification queue gone, dropping {:?}", e.0);
        }
    }

    /// Show `notification`, replacing the one on screen.
    pub fn show(&self, notification: &Notification) {
        self.send(Request::Show(notification.clone()));
    }

    /// Close the last notification shown, if any.
    pub fn close(&self) {
        self.send(Request::Close);
    }
}

/// Hints marking a notification as not worth keeping in history.
fn transient_hints() -> HashMap<&'static str, Value<'static>> {
    let mut hints = HashMap::new();
    hints.insert("transient", Value::from(true));
    hints.insert("category", Value::from("network"));
    hints
}
