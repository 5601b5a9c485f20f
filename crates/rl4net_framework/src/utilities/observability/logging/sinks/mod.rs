//! Log destinations used by the adapter: the terminal and files on disk.

pub mod console;
pub mod file;

pub use console::{create_colored_console_appender, create_console_appender};

pub use file::{create_file_appender, create_size_rotating_appender};
