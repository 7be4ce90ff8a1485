//! # Desktop Bridge Implementations
//!
//! Production implementations of the `bridge-traits` seams for native
//! desktop targets: a reqwest-backed HTTP client and a tokio-backed
//! process runner.

pub mod http;
pub mod process;

pub use http::ReqwestHttpClient;
pub use process::TokioProcessRunner;
