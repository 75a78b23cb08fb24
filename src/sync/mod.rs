//! # Remote Sync
//!
//! The remote list is reached through two calls: read the count of records already
//! persisted for a session, and write one record at a computed position. The
//! [`RemoteSync`] trait is the contract; [`HttpRemoteSync`] speaks it over HTTP.

// External crate imports
use async_trait::async_trait;

// Internal module imports
use crate::config::session::SessionIdentity;
use crate::core::position::RemoteBaseline;
use crate::error::CaptureResult;

pub mod http;
pub mod schema;

pub use http::HttpRemoteSync;
pub use schema::{BaselineResponse, SubmitAck, SubmitRequest};

/// Abstract interface for the remote, append-only list.
#[async_trait]
pub trait RemoteSync: Send + Sync {
    /// Fetch the number of records already persisted for `session`.
    async fn fetch_baseline(&self, session: &SessionIdentity) -> CaptureResult<RemoteBaseline>;

    /// Write one record. Any non-success answer is an error for this call only.
    async fn submit(&self, request: &SubmitRequest) -> CaptureResult<SubmitAck>;
}
