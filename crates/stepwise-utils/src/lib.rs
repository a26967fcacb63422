//! # Stepwise Utilities
//!
//! Logging bootstrap shared by the `stepwise` binary and its observers.
//!
//! Library crates only emit `tracing` events; installing a subscriber is the
//! binary's job and happens once, through this crate.

pub mod logging;

pub use logging::{LogFormat, LogGuard, LogLevel, LoggingError, init_logging, init_logging_for_tui, tui_log_path};
pub use tracing::{debug, error, info, trace, warn};
