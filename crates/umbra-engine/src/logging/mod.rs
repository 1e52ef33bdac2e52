//! Logging facade for the engine.
//!
//! Thin wrapper around `log` + `env_logger`. Call [`init_logging`] once,
//! early in `main`; pass code logs through the `log` macros only.

mod init;

pub use init::{init_logging, LoggingConfig};
