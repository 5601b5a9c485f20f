//! Fluent construction of log4rs configurations for the adapter.

use super::sinks::{
    console::{create_colored_console_appender, create_console_appender},
    file::{create_file_appender, create_size_rotating_appender},
};
use log::LevelFilter;
use log4rs::config::runtime::{ConfigBuilder, RootBuilder};
use log4rs::{
    append::Append,
    config::{Appender, Config, Logger, Root},
    filter::threshold::ThresholdFilter,
};
use std::path::Path;

/// Builds a [`Config`] out of named appenders and per-module levels.
///
/// Appender construction errors are collected and reported by [`build`](Self::build),
/// so a chain of `with_*` calls never panics halfway through.
pub struct LoggingBuilder {
    config_builder: ConfigBuilder,
    root_builder: RootBuilder,
    root_level: LevelFilter,
    appenders: Vec<String>,
    errors: Vec<String>,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self {
            config_builder: Config::builder(),
            root_builder: Root::builder(),
            root_level: LevelFilter::Info,
            appenders: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn with_appender(mut self, name: &str, level: LevelFilter, append: Box<dyn Append>) -> Self {
        let appender = Appender::builder()
            .filter(Box::new(ThresholdFilter::new(level)))
            .build(name, append);

        self.config_builder = self.config_builder.appender(appender);
        self.root_builder = self.root_builder.appender(name);
        self.appenders.push(name.to_string());

        self
    }

    /// Adds a plain stdout appender.
    pub fn with_console(self, name: &str, level: LevelFilter) -> Self {
        self.with_appender(name, level, Box::new(create_console_appender()))
    }

    /// Adds a highlighted stderr appender.
    pub fn with_colored_console(self, name: &str, level: LevelFilter) -> Self {
        self.with_appender(name, level, Box::new(create_colored_console_appender()))
    }

    /// Adds a non-rotating file appender at `path`.
    pub fn with_file(mut self, name: &str, path: &Path, level: LevelFilter) -> Self {
        match create_file_appender(path) {
            Ok(file) => self.with_appender(name, level, Box::new(file)),
            Err(e) => {
                self.errors.push(e);
                self
            }
        }
    }

    /// Adds a size-rotating file appender at `path`.
    pub fn with_rolling_file(
        mut self,
        name: &str,
        path: &Path,
        file_size_mb: u64,
        rotation_count: u32,
        level: LevelFilter,
    ) -> Self {
        match create_size_rotating_appender(path, file_size_mb, rotation_count) {
            Ok(file) => self.with_appender(name, level, Box::new(file)),
            Err(e) => {
                self.errors.push(e);
                self
            }
        }
    }

    /// Sets the root logger level. Defaults to `Info`.
    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.root_level = level;
        self
    }

    /// Overrides the level of one module, e.g. `rl4net_framework::network`.
    pub fn with_module_level(mut self, module: &str, level: LevelFilter) -> Self {
        let logger = Logger::builder().build(module, level);
        self.config_builder = self.config_builder.logger(logger);
        self
    }

    pub fn build(self) -> Result<Config, String> {
        if !self.errors.is_empty() {
            return Err(self.errors.join("; "));
        }
        if self.appenders.is_empty() {
            return Err("At least one appender must be configured".to_string());
        }

        self.config_builder
            .build(self.root_builder.build(self.root_level))
            .map_err(|e| format!("Failed to build log configuration: {}", e))
    }
}
