//! Port through which observers read engagement snapshots.

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::domain::engagement::EngagementSnapshot;

/// Failures reported by snapshot sources.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The server could not be reached or the connection dropped.
    #[error("snapshot source transport failed: {message}")]
    Transport { message: String },
    /// The server answered with an unexpected status.
    #[error("snapshot source answered with status {status}")]
    Status { status: u16 },
    /// A payload could not be decoded.
    #[error("snapshot payload could not be decoded: {message}")]
    Decode { message: String },
    /// The server sent an error frame.
    #[error("snapshot source reported {code}: {message}")]
    Remote { code: String, message: String },
}

/// Stream of snapshots; ends when the connection closes.
pub type SnapshotStream = BoxStream<'static, Result<EngagementSnapshot, SourceError>>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Open the push stream.
    async fn open_stream(&self) -> Result<SnapshotStream, SourceError>;

    /// Fetch the current snapshot once.
    async fn fetch(&self) -> Result<EngagementSnapshot, SourceError>;
}
