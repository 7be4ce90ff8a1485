//! # Bridge Traits
//!
//! Narrow seams to the external collaborators vidpub depends on:
//! the remote platform's HTTP API ([`http::HttpClient`]) and the local
//! probe/mux tool used to read and rewrite embedded container metadata
//! ([`process::ProcessRunner`]).
//!
//! Production implementations live in `bridge-desktop`; tests mock these
//! traits with `mockall`.

pub mod error;
pub mod http;
pub mod process;

pub use error::{BridgeError, Result};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use process::{ProcessOutput, ProcessRunner};
