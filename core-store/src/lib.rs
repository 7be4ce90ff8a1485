//! # Metadata Store Adapter
//!
//! Reads and writes the flat tag map embedded in a media container through
//! an external probe/mux tool pair (ffprobe/ffmpeg shaped).
//!
//! ## Overview
//!
//! The mux tool cannot patch tags in place, so every mutation follows the
//! same contract: read the full current tag map, apply the change in
//! memory, rewrite the whole container (stream copy, no re-encode) into a
//! temporary file, then atomically rename it over the original. A failed
//! rewrite leaves the original untouched.
//!
//! Edit authorization is enforced before any rewrite is attempted:
//! unauthorized writes return `Ok(false)` with no side effects.

pub mod adapter;
pub mod delta;
pub mod error;
pub mod probe;

pub use adapter::{lookup, MetadataStore, READY_FLAG_KEY};
pub use delta::{DeltaOp, MetadataDelta};
pub use error::{Result, StoreError};
pub use probe::{Intrinsic, ProbeFormat, ProbeOutput, ProbeStream};
