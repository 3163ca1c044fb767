use futures_util::StreamExt;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};

/// Ring-buffer cap; oldest lines drop first.
pub const MAX_LOG_LINES: usize = 10_000;

/// How long the backend gets to accept the `/logs` upgrade.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(300);

/// Append-only event log fed by locally synthesized lines and backend
/// pushes. Cleared only by explicit user action or workflow reset.
#[derive(Debug, Default)]
pub struct LogStream {
    lines: VecDeque<String>,
}

impl LogStream {
    pub fn push(&mut self, line: impl Into<String>) {
        if self.lines.len() == MAX_LOG_LINES {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// A live `/logs` subscription for one running operation.
///
/// The connect is awaited before the operation's POST is issued so no line
/// pushed between subscription and operation start is lost. There is no
/// automatic reconnect: a failed or prematurely closed handshake is an error
/// and the caller aborts the operation instead of retrying silently.
pub struct LogSubscription {
    rx: mpsc::UnboundedReceiver<String>,
    task: JoinHandle<()>,
}

impl LogSubscription {
    pub async fn connect(url: &str) -> ApiResult<Self> {
        let connect = timeout(CONNECT_TIMEOUT, connect_async(url))
            .await
            .map_err(|_| ApiError::LogStream("timed out opening the log stream".to_string()))?;
        let (stream, _) = connect.map_err(|err| ApiError::LogStream(err.to_string()))?;
        debug!(%url, "log stream open");

        let (_, mut read) = stream.split();
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(async move {
            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Text(line)) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        warn!(%err, "log stream closed with error");
                        break;
                    }
                }
            }
        });

        Ok(Self { rx, task })
    }

    /// Move every line received so far into the stream. Called once the
    /// operation's POST resolves, before the subscription closes.
    pub fn drain_into(&mut self, logs: &mut LogStream) {
        while let Ok(line) = self.rx.try_recv() {
            logs.push(line);
        }
    }
}

impl Drop for LogSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
