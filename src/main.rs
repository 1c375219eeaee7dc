// dhcpcd-tray - Main Entry Point
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! # dhcpcd-tray
//!
//! A tray monitor for dhcpcd and wpa_supplicant.
//!
//! It follows the daemons' control sockets, shows whether the machine is
//! online, announces interface changes and new access points, and keeps
//! reconnecting for as long as it runs.

use std::env;
use tracing_subscriber::EnvFilter;

mod application;
mod control;
mod engine;
mod models;
mod services;
mod tray;

use application::Application;
use models::AppConfig;

/// Human-readable application name.
pub const APP_NAME: &str = "dhcpcd-tray";

/// Application version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Gettext domain for translations.
pub const GETTEXT_DOMAIN: &str = "dhcpcd-tray";

/// Print version information and exit.
fn print_version() {
    println!("{} {}", APP_NAME, VERSION);
    println!("Copyright (C) 2026 Christos A. Daggas");
    println!("License: MIT");
}

/// Print help information and exit.
fn print_help() {
    println!("Usage: {} [OPTIONS]", env::args().next().unwrap_or_else(|| APP_NAME.to_string()));
    println!();
    println!("Tray monitor for dhcpcd and wpa_supplicant.");
    println!();
    println!("Options:");
    println!("  -h, --help       Show this help message and exit");
    println!("  -v, --version    Show version information and exit");
    println!("  -d, --debug      Enable debug logging");
    println!();
    println!("Environment variables:");
    println!("  RUST_LOG         Set log level (trace, debug, info, warn, error)");
    println!();
    if let Some(path) = AppConfig::default_path() {
        println!("Configuration is read from {}", path.display());
    }
}

/// Initialize internationalization (gettext).
fn setup_i18n() {
    use gettextrs::{bindtextdomain, setlocale, textdomain, LocaleCategory};

    setlocale(LocaleCategory::LcAll, "");

    let locale_dirs = ["/usr/share/locale", "/usr/local/share/locale"];
    for dir in &locale_dirs {
        if std::path::Path::new(dir).exists() {
            if let Err(e) = bindtextdomain(GETTEXT_DOMAIN, *dir) {
                tracing::warn!("Failed to bind textdomain to {}: {}", dir, e);
            } else {
                tracing::debug!("Bound textdomain to {}", dir);
                break;
            }
        }
    }

    if let Err(e) = textdomain(GETTEXT_DOMAIN) {
        tracing::warn!("Failed to set textdomain: {}", e);
    }
}

fn main() -> glib::ExitCode {
    let args: Vec<String> = env::args().collect();
    let mut debug_mode = false;

    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                return glib::ExitCode::SUCCESS;
            }
            "-v" | "--version" => {
                print_version();
                return glib::ExitCode::SUCCESS;
            }
            "-d" | "--debug" => {
                debug_mode = true;
            }
            _ => {
                eprintln!("Unknown option: {}", arg);
                eprintln!("Try '--help' for more information.");
                return glib::ExitCode::FAILURE;
            }
        }
    }

    glib::set_prgname(Some(APP_NAME));
    glib::set_application_name("dhcpcd Monitor");

    // The config file may set the log level, so it is read first and any
    // problem with it is reported once logging is up.
    let loaded = AppConfig::try_load();
    let filter = if debug_mode {
        EnvFilter::new("debug")
    } else {
        let level = loaded.as_ref().map(|c| c.log_level.as_str()).unwrap_or("info");
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Ignoring configuration: {}", e);
        AppConfig::default()
    });
    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    setup_i18n();

    let app = Application::new(config);
    match app.run() {
        Ok(()) => glib::ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            glib::ExitCode::FAILURE
        }
    }
}

/// Helper macro for gettext translations.
#[macro_export]
macro_rules! i18n {
    ($s:expr) => {
        gettextrs::gettext($s)
    };
}

/// Helper macro for ngettext (plurals).
#[macro_export]
macro_rules! ni18n {
    ($singular:expr, $plural:expr, $n:expr) => {
        gettextrs::ngettext($singular, $plural, $n as u32)
    };
}
