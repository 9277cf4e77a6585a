//! Data center senders
//!
//! A sender issues `upload.getFile` against one data center. Failures are
//! classified once, here, so the fetch layer never inspects error text.

use crate::error::Result;
use crate::telegram::RemoteLocation;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Classified failure of a single file request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SenderError {
    /// Server asked us to wait before retrying (FLOOD_WAIT)
    #[error("rate limited, wait {wait_secs}s")]
    RateLimited { wait_secs: u64 },

    /// Network hiccup, timeout or retriable RPC error
    #[error("transient failure: {0}")]
    Transient(String),

    /// Response could never be a file chunk; retrying will not help
    #[error("fatal failure: {0}")]
    Fatal(String),
}

/// Connection able to download file chunks from one data center
#[async_trait]
pub trait DcSender: Send + Sync {
    /// Data center this sender is bound to
    fn dc_id(&self) -> i32;

    /// Fetch up to `limit` bytes at `offset`; both must be aligned.
    /// An empty vector means there is no data at `offset`.
    async fn get_file(
        &self,
        location: &RemoteLocation,
        offset: u64,
        limit: u32,
    ) -> std::result::Result<Vec<u8>, SenderError>;
}

/// Establishes senders for data centers other than the session's own
#[async_trait]
pub trait SenderConnector: Send + Sync {
    async fn connect(&self, dc_id: i32) -> Result<Arc<dyn DcSender>>;
}
