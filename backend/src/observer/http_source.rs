//! `SnapshotSource` over the engagement HTTP API.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, Stream, StreamExt};
use reqwest::header::{ACCEPT, COOKIE};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::source::{SnapshotSource, SnapshotStream, SourceError};
use super::sse::{SseDecoder, SseEvent};
use crate::domain::engagement::EngagementSnapshot;

const STREAM_PATH: &str = "api/v1/engagement/stream";
const SUMMARY_PATH: &str = "api/v1/engagement/summary";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Deserialize)]
struct ErrorFrame {
    code: String,
    message: String,
}

fn transport(err: reqwest::Error) -> SourceError {
    SourceError::Transport {
        message: err.to_string(),
    }
}

fn decode_snapshot(data: &str) -> Result<EngagementSnapshot, SourceError> {
    serde_json::from_str(data).map_err(|err| SourceError::Decode {
        message: err.to_string(),
    })
}

fn decode_event(event: SseEvent) -> Option<Result<EngagementSnapshot, SourceError>> {
    match event.event.as_str() {
        "snapshot" => Some(decode_snapshot(&event.data)),
        "error" => Some(Err(match serde_json::from_str::<ErrorFrame>(&event.data) {
            Ok(frame) => SourceError::Remote {
                code: frame.code,
                message: frame.message,
            },
            Err(err) => SourceError::Decode {
                message: err.to_string(),
            },
        })),
        other => {
            debug!(event = other, "ignoring unknown engagement stream event");
            None
        }
    }
}

struct Frames<S> {
    body: S,
    decoder: SseDecoder,
    pending: VecDeque<Result<EngagementSnapshot, SourceError>>,
    done: bool,
}

impl<S, B> Frames<S>
where
    S: Stream<Item = reqwest::Result<B>> + Unpin,
    B: AsRef<[u8]>,
{
    fn new(body: S) -> Self {
        Self {
            body,
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            done: false,
        }
    }

    async fn next(mut self) -> Option<(Result<EngagementSnapshot, SourceError>, Self)> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some((item, self));
            }
            if self.done {
                return None;
            }
            match self.body.next().await {
                Some(Ok(chunk)) => {
                    let decoded = self.decoder.push(chunk.as_ref());
                    self.pending.extend(decoded.into_iter().filter_map(decode_event));
                }
                Some(Err(err)) => {
                    self.done = true;
                    return Some((Err(transport(err)), self));
                }
                None => return None,
            }
        }
    }
}

/// Reads snapshots from a running backend.
#[derive(Debug, Clone)]
pub struct HttpSnapshotSource {
    client: Client,
    base: Url,
    session_cookie: Option<String>,
}

impl HttpSnapshotSource {
    /// Use an existing client. `session_cookie` is sent verbatim as the
    /// `Cookie` header, for example `session=...`.
    pub fn new(client: Client, base: Url, session_cookie: Option<String>) -> Self {
        Self {
            client,
            base,
            session_cookie,
        }
    }

    /// Build a client with a connect timeout and no overall timeout, since
    /// streams stay open indefinitely.
    pub fn connect(base: Url, session_cookie: Option<String>) -> Result<Self, SourceError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(transport)?;
        Ok(Self::new(client, base, session_cookie))
    }

    fn get(&self, path: &str) -> Result<RequestBuilder, SourceError> {
        let url = self.base.join(path).map_err(|err| SourceError::Transport {
            message: format!("invalid endpoint url: {err}"),
        })?;
        let request = self.client.get(url);
        Ok(match &self.session_cookie {
            Some(cookie) => request.header(COOKIE, cookie),
            None => request,
        })
    }
}

fn check_status(status: StatusCode) -> Result<(), SourceError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(SourceError::Status {
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn open_stream(&self) -> Result<SnapshotStream, SourceError> {
        let response = self
            .get(STREAM_PATH)?
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(transport)?;
        check_status(response.status())?;
        let frames = Frames::new(Box::pin(response.bytes_stream()));
        Ok(stream::unfold(frames, Frames::next).boxed())
    }

    async fn fetch(&self) -> Result<EngagementSnapshot, SourceError> {
        let response = self
            .get(SUMMARY_PATH)?
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport)?;
        check_status(response.status())?;
        let body = response.text().await.map_err(transport)?;
        decode_snapshot(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;
    use chrono::Utc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn snapshot_json(balance: u64) -> String {
        serde_json::to_string(&EngagementSnapshot {
            user_id: UserId::random(),
            display_name: "Deputy Dana".to_owned(),
            balance,
            rank: Some(2),
            tier: None,
            next_tier: None,
            badges: Vec::new(),
            generated_at: Utc::now(),
        })
        .expect("snapshot json")
    }

    /// Serve one canned HTTP response and return the raw request.
    async fn serve_once(
        status: &'static str,
        content_type: &'static str,
        body: String,
    ) -> (Url, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut request = vec![0_u8; 4096];
            let read = socket.read(&mut request).await.expect("read");
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: {content_type}\r\nconnection: close\r\ncontent-length: {}\r\n\r\n{body}",
                body.len()
            );
            socket
                .write_all(response.as_bytes())
                .await
                .expect("write");
            socket.shutdown().await.expect("shutdown");
            String::from_utf8_lossy(&request[..read]).into_owned()
        });
        let base = Url::parse(&format!("http://{addr}/")).expect("base url");
        (base, handle)
    }

    #[tokio::test]
    async fn stream_yields_snapshots_then_the_error_frame() {
        let body = format!(
            "retry: 5000\n\nevent: snapshot\ndata: {}\n\n: ping\n\nevent: error\ndata: {{\"code\":\"not_found\",\"message\":\"account not found\"}}\n\n",
            snapshot_json(40)
        );
        let (base, server) = serve_once("200 OK", "text/event-stream", body).await;
        let source = HttpSnapshotSource::connect(base, Some("session=abc".to_owned()))
            .expect("client");

        let items: Vec<_> = source.open_stream().await.expect("stream").collect().await;
        let request = server.await.expect("server");

        assert!(request.starts_with("GET /api/v1/engagement/stream"));
        assert!(request.to_ascii_lowercase().contains("cookie: session=abc"));
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().map(|s| s.balance), Ok(40));
        assert_eq!(
            items[1],
            Err(SourceError::Remote {
                code: "not_found".to_owned(),
                message: "account not found".to_owned(),
            })
        );
    }

    #[tokio::test]
    async fn fetch_decodes_the_summary() {
        let (base, server) = serve_once("200 OK", "application/json", snapshot_json(75)).await;
        let source = HttpSnapshotSource::connect(base, None).expect("client");

        let snapshot = source.fetch().await.expect("snapshot");
        let request = server.await.expect("server");

        assert_eq!(snapshot.balance, 75);
        assert!(request.starts_with("GET /api/v1/engagement/summary"));
    }

    #[tokio::test]
    async fn error_statuses_are_reported() {
        let (base, _server) = serve_once(
            "401 Unauthorized",
            "application/json",
            String::from("{}"),
        )
        .await;
        let source = HttpSnapshotSource::connect(base, None).expect("client");

        let err = source.fetch().await.expect_err("unauthorised");
        assert_eq!(err, SourceError::Status { status: 401 });
    }
}
