//! Logging backend for the adapter.
//!
//! The crate itself only emits through the `log` macros. This module wires
//! those macros to log4rs: a console default installed by [`init_logging`], a
//! YAML file loader, and [`builder::LoggingBuilder`] for programmatic setups
//! applied with [`reconfigure_logging`].

use log::LevelFilter;
use log4rs::config::{Appender, Config, Root};
use log4rs::filter::threshold::ThresholdFilter;
use log4rs::Handle;
use once_cell::sync::OnceCell;
use std::sync::Once;

pub use log::{debug, error, info, trace, warn, Level};

pub mod builder;
pub mod sinks;

static INIT: Once = Once::new();
static HANDLE: OnceCell<Handle> = OnceCell::new();

fn install(config: Config) -> Result<(), String> {
    let handle = log4rs::init_config(config).map_err(|e| e.to_string())?;
    let _ = HANDLE.set(handle);
    Ok(())
}

fn default_config() -> Result<Config, String> {
    let stdout = sinks::create_console_appender();

    Config::builder()
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Info)))
                .build("stdout", Box::new(stdout)),
        )
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))
        .map_err(|e| e.to_string())
}

/// Installs the default console logger at `Info`.
///
/// Only the first call across the process has an effect. Later calls, and calls
/// made after another logger was installed, are no-ops.
pub fn init_logging() {
    INIT.call_once(|| match default_config().and_then(install) {
        Ok(()) => log::info!("RL4Net logging initialized with default configuration"),
        Err(e) => eprintln!("Failed to initialize RL4Net logging: {}", e),
    });
}

/// Installs logging from a log4rs YAML file.
///
/// Consumes the same one-shot guard as [`init_logging`]: if logging was already
/// initialized this returns `Ok(())` without reading the file. Use
/// [`reconfigure_logging`] to replace an installed configuration.
pub fn init_logging_from_file(config_path: &str) -> Result<(), String> {
    let mut result = Ok(());
    INIT.call_once(|| {
        result = log4rs::config::load_config_file(config_path, Default::default())
            .map_err(|e| e.to_string())
            .and_then(install)
            .map_err(|e| format!("Failed to initialize logging: {}", e));
        if result.is_ok() {
            log::info!(
                "RL4Net logging initialized from config file: {}",
                config_path
            );
        }
    });
    result
}

/// Replaces the active logging configuration with `config`.
///
/// Installs `config` directly when nothing was initialized yet. Fails only if
/// a logger from outside this module owns the `log` facade.
pub fn reconfigure_logging(config: Config) -> Result<(), String> {
    if let Some(handle) = HANDLE.get() {
        handle.set_config(config);
        log::info!("RL4Net logging reconfigured");
        return Ok(());
    }

    let mut pending = Some(config);
    let mut result = Err("Logging is owned by another logger".to_string());
    INIT.call_once(|| {
        if let Some(config) = pending.take() {
            result = install(config).map_err(|e| format!("Failed to configure logging: {}", e));
        }
    });

    // Another thread may have installed the handle while we waited on the guard.
    if let (Some(config), Some(handle)) = (pending, HANDLE.get()) {
        handle.set_config(config);
        result = Ok(());
    }

    if result.is_ok() {
        log::info!("RL4Net logging configured");
    }
    result
}
