//! # Transfer Session Engine
//!
//! Drives a strictly sequential, throttled batch of upload jobs against
//! the platform client, persisting every job mutation as it happens.
//!
//! ## Overview
//!
//! A job's editable fields live in a per-file sidecar
//! (`<file>.vidpub.json`); its lifecycle lives in one volatile state file
//! per directory (`.vidpub_state.json`), keyed by path. The split keeps
//! re-scans from clobbering in-flight state. [`engine::SessionEngine`]
//! consumes a job list, uploads one file at a time with a fixed cooldown
//! between jobs, and honors a cancellation token at every sleep and
//! before every upload.

pub mod engine;
pub mod error;
pub mod job;
pub mod store;

pub use engine::{SessionConfig, SessionEngine, SessionReport, Uploader};
pub use error::{Result, SessionError};
pub use job::{Job, JobState, SidecarRecord, VolatileRecord};
pub use store::SessionStore;
