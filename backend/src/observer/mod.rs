//! Client-side engagement observer.
//!
//! Keeps the latest [`EngagementSnapshot`] for one user on a
//! `tokio::sync::watch` channel. Snapshots come from the server-sent event
//! stream while it is healthy and from polling the summary endpoint when it
//! is not; [`ObserverPolicy`] decides which. Each snapshot is complete, so
//! the newest one simply replaces the previous value.

mod http_source;
mod policy;
mod source;
mod sse;

pub use http_source::HttpSnapshotSource;
pub use policy::{ObserverAction, ObserverMode, ObserverPolicy, PolicyConfig};
#[cfg(test)]
pub use source::MockSnapshotSource;
pub use source::{SnapshotSource, SnapshotStream, SourceError};
pub use sse::{SseDecoder, SseEvent};

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::domain::engagement::EngagementSnapshot;

/// Drives a [`SnapshotSource`] according to an [`ObserverPolicy`].
pub struct SnapshotObserver<S: ?Sized> {
    source: Arc<S>,
    policy: ObserverPolicy,
    latest: watch::Sender<Option<EngagementSnapshot>>,
}

impl<S> SnapshotObserver<S>
where
    S: SnapshotSource + ?Sized,
{
    /// Create an observer and the receiver its snapshots are published on.
    pub fn new(
        source: Arc<S>,
        config: PolicyConfig,
    ) -> (Self, watch::Receiver<Option<EngagementSnapshot>>) {
        let (latest, receiver) = watch::channel(None);
        let observer = Self {
            source,
            policy: ObserverPolicy::new(config),
            latest,
        };
        (observer, receiver)
    }

    /// Run until every receiver has been dropped.
    pub async fn run(self) {
        let Self {
            source,
            mut policy,
            latest,
        } = self;
        let mut action = policy.start();
        loop {
            let after = match action {
                ObserverAction::OpenStream { after } | ObserverAction::Poll { after } => after,
            };
            tokio::select! {
                () = latest.closed() => break,
                () = sleep(after) => {}
            }
            let before = policy.mode();
            let current = action;
            action = tokio::select! {
                () = latest.closed() => break,
                next = async {
                    match current {
                        ObserverAction::OpenStream { .. } => {
                            stream_once(source.as_ref(), &mut policy, &latest).await
                        }
                        ObserverAction::Poll { .. } => {
                            poll_once(source.as_ref(), &mut policy, &latest).await
                        }
                    }
                } => next,
            };
            let now = policy.mode();
            if std::mem::discriminant(&before) != std::mem::discriminant(&now) {
                info!(from = ?before, to = ?now, "engagement observer changed mode");
            }
        }
        debug!("engagement observer stopped");
    }
}

/// Stream until the connection fails, then ask the policy what next.
async fn stream_once<S: SnapshotSource + ?Sized>(
    source: &S,
    policy: &mut ObserverPolicy,
    latest: &watch::Sender<Option<EngagementSnapshot>>,
) -> ObserverAction {
    let mut snapshots = match source.open_stream().await {
        Ok(stream) => stream,
        Err(err) => {
            warn!(error = %err, "failed to open engagement stream");
            return policy.on_stream_failure();
        }
    };
    while let Some(item) = snapshots.next().await {
        match item {
            Ok(snapshot) => {
                policy.on_stream_message();
                latest.send_replace(Some(snapshot));
            }
            Err(err) => {
                warn!(error = %err, "engagement stream failed");
                break;
            }
        }
    }
    debug!("engagement stream closed");
    policy.on_stream_failure()
}

async fn poll_once<S: SnapshotSource + ?Sized>(
    source: &S,
    policy: &mut ObserverPolicy,
    latest: &watch::Sender<Option<EngagementSnapshot>>,
) -> ObserverAction {
    match source.fetch().await {
        Ok(snapshot) => {
            latest.send_replace(Some(snapshot));
        }
        Err(err) => warn!(error = %err, "engagement poll failed"),
    }
    policy.on_poll_completed()
}
