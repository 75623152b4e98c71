//! Record store port
//!
//! The hosted data service is reached through request/response calls only.
//! `RecordStore` is the seam: the REST adapter talks to the real service,
//! the in-memory adapter backs tests and local runs.

pub mod memory;
pub mod rest;

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Channel, NewViewer, Stream};

pub use memory::{InMemoryRecordStore, StoreOp};
pub use rest::RestRecordStore;

pub type StoreResult<T> = Result<T, StoreError>;

pub type SharedStore = Arc<dyn RecordStore>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("store returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode store response: {0}")]
    Decode(String),

    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Network-level or server-side failures that may clear up on retry
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Transport(_) | StoreError::Timeout(_) | StoreError::Unavailable(_) => true,
            StoreError::Status { status, .. } => *status >= 500,
            StoreError::Decode(_) | StoreError::NotFound(_) => false,
        }
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_channel_by_id(&self, id: Uuid) -> StoreResult<Option<Channel>>;

    /// Most recent `is_live = true` stream of the channel by creation time
    async fn get_latest_active_stream(&self, channel_id: Uuid) -> StoreResult<Option<Stream>>;

    async fn insert_viewer(&self, viewer: NewViewer) -> StoreResult<()>;

    async fn insert_chat_message(&self, stream_id: Uuid, text: &str) -> StoreResult<()>;

    /// Open a live stream row for the channel and mark the channel live
    async fn start_stream(&self, channel_id: Uuid) -> StoreResult<Stream>;

    /// Mark the stream and its channel offline
    async fn end_stream(&self, channel_id: Uuid, stream_id: Uuid) -> StoreResult<()>;
}

/// Bound a store call; an elapsed deadline becomes `StoreError::Timeout`.
pub async fn with_timeout<F, T>(duration: Duration, call: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(duration, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(duration)),
    }
}
