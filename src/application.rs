// dhcpcd-tray - Application
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Main loop wiring: engine, tray service and command handling.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use glib::ControlFlow;
use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::control::DhcpcdClient;
use crate::engine::{Engine, GlibMultiplexer, LoopEvent};
use crate::models::{AppConfig, Result};
use crate::tray::{self, TrayCommand, TrayHandle};
use crate::{APP_NAME, VERSION};

type AppEngine = Engine<GlibMultiplexer, DhcpcdClient, TrayHandle>;

/// How often commands from the bus are picked up.
const COMMAND_POLL: Duration = Duration::from_millis(100);

const SIGINT: i32 = 2;
const SIGTERM: i32 = 15;

/// Global Tokio runtime for D-Bus traffic.
static TOKIO_RUNTIME: OnceCell<tokio::runtime::Runtime> = OnceCell::new();

/// Get the global Tokio runtime, creating it on first use.
pub fn tokio_runtime() -> Result<&'static tokio::runtime::Runtime> {
    let runtime = TOKIO_RUNTIME.get_or_try_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
    })?;
    Ok(runtime)
}

/// Hand `event` to `target`.
///
/// While `target` is borrowed the event is queued on the thread's main
/// context and retried on a later iteration.
fn deliver<T, F>(target: Weak<RefCell<T>>, event: LoopEvent, handle: F)
where
    T: 'static,
    F: Fn(&mut T, LoopEvent) + Copy + 'static,
{
    let Some(strong) = target.upgrade() else {
        return;
    };
    let busy = match strong.try_borrow_mut() {
        Ok(mut inner) => {
            handle(&mut *inner, event);
            return;
        }
        Err(_) => event,
    };
    debug!("Engine busy, deferring {:?}", busy);
    glib::MainContext::ref_thread_default().spawn_local(async move {
        deliver(target, busy, handle);
    });
}

pub struct Application {
    config: AppConfig,
    main_loop: glib::MainLoop,
}

impl Application {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            main_loop: glib::MainLoop::new(None, false),
        }
    }

    /// Run until asked to quit.
    pub fn run(&self) -> Result<()> {
        info!("{} {} starting up", APP_NAME, VERSION);
        let runtime = tokio_runtime()?;
        let (presenter, commands) = tray::start_tray(runtime, &self.config)?;

        let config = &self.config;
        let engine: Rc<RefCell<AppEngine>> = Rc::new_cyclic(|weak: &Weak<RefCell<AppEngine>>| {
            let weak = weak.clone();
            let mux = GlibMultiplexer::new(move |event| deliver(weak.clone(), event, AppEngine::handle_event));
            RefCell::new(Engine::new(mux, DhcpcdClient::new(config), presenter, config))
        });

        engine.borrow_mut().start();
        self.watch_commands(&engine, commands);

        for signum in [SIGINT, SIGTERM] {
            let main_loop = self.main_loop.clone();
            glib::unix_signal_add_local(signum, move || {
                info!("Received signal {}, quitting", signum);
                main_loop.quit();
                ControlFlow::Continue
            });
        }

        self.main_loop.run();

        let mut engine = engine.borrow_mut();
        engine.shutdown();
        engine.presenter_mut().close();
        info!("{} stopped", APP_NAME);
        Ok(())
    }

    /// Process tray commands on the main thread.
    fn watch_commands(&self, engine: &Rc<RefCell<AppEngine>>, commands: std::sync::mpsc::Receiver<TrayCommand>) {
        let engine = Rc::downgrade(engine);
        let main_loop = self.main_loop.clone();
        glib::timeout_add_local(COMMAND_POLL, move || {
            let Some(engine) = engine.upgrade() else {
                return ControlFlow::Break;
            };
            while let Ok(cmd) = commands.try_recv() {
                debug!("Tray command: {:?}", cmd);
                match cmd {
                    TrayCommand::Rescan => engine.borrow_mut().rescan(),
                    TrayCommand::Quit => main_loop.quit(),
                }
            }
            ControlFlow::Continue
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ConnectionId, TimerKind};

    #[test]
    fn test_busy_target_receives_event_later() {
        let context = glib::MainContext::new();
        context
            .with_thread_default(|| {
                let seen: Rc<RefCell<Vec<LoopEvent>>> = Rc::default();
                let record = |events: &mut Vec<LoopEvent>, event| events.push(event);

                let guard = seen.borrow_mut();
                deliver(Rc::downgrade(&seen), LoopEvent::Timer(TimerKind::Rescan), record);
                drop(guard);
                assert!(seen.borrow().is_empty());

                deliver(Rc::downgrade(&seen), LoopEvent::Ready(ConnectionId::Daemon), record);
                while context.iteration(false) {}
                assert_eq!(
                    *seen.borrow(),
                    vec![
                        LoopEvent::Ready(ConnectionId::Daemon),
                        LoopEvent::Timer(TimerKind::Rescan)
                    ]
                );
            })
            .unwrap();
    }

    #[test]
    fn test_dropped_target_ignores_event() {
        let seen: Rc<RefCell<Vec<LoopEvent>>> = Rc::default();
        let weak = Rc::downgrade(&seen);
        drop(seen);
        deliver(weak, LoopEvent::Timer(TimerKind::Rescan), |events: &mut Vec<LoopEvent>, event| {
            events.push(event)
        });
    }
}
