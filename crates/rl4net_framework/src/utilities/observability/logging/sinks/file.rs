//! File sinks.
//!
//! Unlike the console sinks these touch the filesystem, so construction errors
//! are returned to the caller instead of being swallowed.

use log4rs::{
    append::file::FileAppender,
    append::rolling_file::{
        policy::compound::roll::fixed_window::FixedWindowRoller,
        policy::compound::trigger::size::SizeTrigger, policy::compound::CompoundPolicy,
        RollingFileAppender,
    },
    encode::pattern::PatternEncoder,
};
use std::path::Path;

const FILE_PATTERN: &str = "[{d(%Y-%m-%d %H:%M:%S%.3f)} {l} {M}] {m}{n}";

/// Creates an appending file sink without rotation.
pub fn create_file_appender(path: &Path) -> Result<FileAppender, String> {
    FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(FILE_PATTERN)))
        .build(path)
        .map_err(|e| format!("Failed to create file appender at {:?}: {}", path, e))
}

/// Creates a file sink that rolls over once the file exceeds `file_size_mb`.
///
/// # Arguments
///
/// * `base_path` - Active log file; archives are written next to it as `<base_path>.N`
/// * `file_size_mb` - Size in megabytes that triggers a roll
/// * `rotation_count` - Number of archives to keep
pub fn create_size_rotating_appender(
    base_path: &Path,
    file_size_mb: u64,
    rotation_count: u32,
) -> Result<RollingFileAppender, String> {
    let base_filename = base_path
        .to_str()
        .ok_or_else(|| format!("Log path {:?} is not valid UTF-8", base_path))?;

    let roller = FixedWindowRoller::builder()
        .build(&format!("{}.{{}}", base_filename), rotation_count)
        .map_err(|e| format!("Failed to create roller for {}: {}", base_filename, e))?;

    let trigger = SizeTrigger::new(file_size_mb * 1024 * 1024);
    let policy = CompoundPolicy::new(Box::new(trigger), Box::new(roller));

    RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(FILE_PATTERN)))
        .build(base_path, Box::new(policy))
        .map_err(|e| {
            format!(
                "Failed to create rolling file appender at {:?}: {}",
                base_path, e
            )
        })
}
