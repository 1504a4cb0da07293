//! # Configuration Modules
//!
//! Resolved configuration values for the rotating writer and the capture loop.
//! Layering (defaults, config file, environment, command line) is done by the
//! binaries; this module only holds the values, their defaults and validation.

/// Writer and capture configuration with defaults and validation.
pub mod config_txtlog;
