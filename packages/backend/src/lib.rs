#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Client abstraction for the hosted raster-analysis backend.
//!
//! The backend evaluates map-algebra expressions over global raster
//! assets and reduces them inside a supplied region, synchronously and
//! with seconds-to-tens-of-seconds latency per call. This crate models
//! the expression language as a typed tree ([`expr::ImageExpr`]), the
//! reduction primitives as request/response structs, and the transport
//! as a [`RasterBackend`] trait with an HTTP implementation.
//!
//! Backend failure text is opaque: it is wrapped in
//! [`BackendError::Remote`] and never interpreted.

pub mod expr;
pub mod http;
pub mod reduce;

use async_trait::async_trait;
use thiserror::Error;

use crate::reduce::{
    BatchReduceRequest, ReduceOutput, ReduceRequest, SampleOutput, SampleRequest,
};

/// Errors from backend calls.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected or failed the operation. The message is the
    /// backend's own text, passed through untouched.
    #[error("Backend error: {message}")]
    Remote {
        /// Opaque failure text from the backend.
        message: String,
    },

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },
}

/// The remote raster-analysis engine.
///
/// All three primitives are synchronous remote calls with no ordering
/// dependency between them; callers may dispatch them concurrently.
#[async_trait]
pub trait RasterBackend: Send + Sync {
    /// Reduces an expression over one region.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the call fails; the backend's failure
    /// text is preserved verbatim.
    async fn reduce(&self, request: &ReduceRequest) -> Result<ReduceOutput, BackendError>;

    /// Reduces one expression over a whole collection of regions in a
    /// single call, aggregating server-side.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the call fails.
    async fn reduce_batch(&self, request: &BatchReduceRequest)
    -> Result<ReduceOutput, BackendError>;

    /// Samples random pixels of a mask expression within a region.
    ///
    /// The measured sample count may fall short of the requested count
    /// near region edges; both are reported.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the call fails.
    async fn sample(&self, request: &SampleRequest) -> Result<SampleOutput, BackendError>;
}
