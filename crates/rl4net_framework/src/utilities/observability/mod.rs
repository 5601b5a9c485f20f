// RL4Net observability
//
// Log output only. Metrics exporters are not part of this crate.

#[cfg(feature = "logging")]
pub mod logging;

/// Initializes the observability components enabled at compile time.
pub fn init_observability() {
    #[cfg(feature = "logging")]
    logging::init_logging();
}
