//! # Metadata Schema
//!
//! Defines the closed set of metadata keys a media file can carry, the
//! role ladder that governs who may edit each key, and the fingerprint
//! used to detect local metadata drift.
//!
//! ## Overview
//!
//! Every tracked file carries a flat `key -> string` tag map inside its
//! container. Keys fall into three groups:
//! - **intrinsic** — derived from the file itself, never editable
//! - **core user** — title, description, tags and friends
//! - **bookkeeping** — sync state the engine maintains, carried under the
//!   `VP:` tag prefix to stay clear of user-facing tags
//!
//! A write by a role succeeds only if the role's level meets the key's
//! `editable_by` requirement. Keys outside the schema are always editable
//! (fail open).

pub mod error;
pub mod fingerprint;
pub mod key;
pub mod role;

pub use error::{Result, SchemaError};
pub use fingerprint::{file_uuid, fingerprint};
pub use key::{can_edit, editable_keys, blacklisted_keys, MetadataKey, TAG_PREFIX};
pub use role::Role;

use std::collections::BTreeMap;

/// Flat tag map read from / written to a media container.
///
/// `BTreeMap` keeps iteration deterministic, which the fingerprint relies
/// on.
pub type TagMap = BTreeMap<String, String>;
