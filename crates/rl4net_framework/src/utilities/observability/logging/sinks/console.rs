//! Console sinks.
//!
//! Training runs are usually watched from a terminal, so the default pattern
//! keeps the module path visible: supervisor and channel lines interleave
//! during a reset.

use log4rs::{
    append::console::{ConsoleAppender, Target},
    encode::pattern::PatternEncoder,
};

const CONSOLE_PATTERN: &str = "[{d(%Y-%m-%d %H:%M:%S%.3f)} {h({l})} {M}] {m}{n}";

/// Creates a stdout appender with the default pattern.
pub fn create_console_appender() -> ConsoleAppender {
    create_custom_console_appender(Target::Stdout, CONSOLE_PATTERN)
}

/// Creates a console appender writing to `target` with `pattern`.
pub fn create_custom_console_appender(target: Target, pattern: &str) -> ConsoleAppender {
    ConsoleAppender::builder()
        .target(target)
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build()
}

/// Creates a stderr appender with highlighted levels and the thread name.
///
/// Useful when stdout is reserved for the training loop's own progress output.
pub fn create_colored_console_appender() -> ConsoleAppender {
    let pattern = "{d(%H:%M:%S%.3f)} {h({l:<5})} {T} {M} - {m}{n}";
    create_custom_console_appender(Target::Stderr, pattern)
}
