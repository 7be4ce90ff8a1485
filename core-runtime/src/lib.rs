//! # Runtime Infrastructure
//!
//! Shared configuration and logging for the vidpub crates.
//!
//! ## Overview
//!
//! This crate owns the concerns that every other crate relies on but none
//! should implement itself:
//!
//! - [`config`] - account and upload settings, persisted as JSON
//! - [`logging`] - `tracing-subscriber` setup with pretty/compact/JSON output
//! - [`error`] - the runtime error type

pub mod config;
pub mod error;
pub mod logging;

pub use config::{AccountConfig, AppConfig, UploadSettings};
pub use error::{Error, Result};
pub use logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
