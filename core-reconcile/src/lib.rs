//! # Reconciliation State Machine
//!
//! Derives each media file's publish status from its embedded tags and an
//! optional remote-record lookup, then writes the derived state back into
//! the container.
//!
//! ## Overview
//!
//! Status derivation is a pure function ([`engine::evaluate`]) over a tag
//! snapshot and a lookup outcome; the [`engine::Reconciler`] wraps it with
//! the store reads, the remote lookup, and a single combined bookkeeping
//! write-back per file. A batch run never aborts: any per-file fault lands
//! that file in [`status::FileStatus::Hindered`] with the fault text
//! recorded, and the loop moves on.

pub mod engine;
pub mod error;
pub mod status;
pub mod summary;

pub use engine::{evaluate, Action, FileReport, Outcome, Reconciler, RemoteLookup, RemoteRecord, Snapshot};
pub use error::{ReconcileError, Result};
pub use status::FileStatus;
pub use summary::Summary;
