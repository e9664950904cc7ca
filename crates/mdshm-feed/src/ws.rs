//! Feed WebSocket connection with auto-reconnect.
//!
//! [`FeedSocket`] runs one tokio task that connects, forwards every text frame
//! to a callback, answers server pings, and reconnects with exponential
//! backoff (100 ms doubling to 30 s) whenever the stream fails or closes.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// Callback invoked for each received text frame.
pub type OnTextCallback = Arc<dyn Fn(&str) + Send + Sync>;

const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Reconnect delay schedule.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    current: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self { current: INITIAL_BACKOFF }
    }
}

impl Backoff {
    /// Delay to wait now; doubles the next one up to the cap.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(MAX_BACKOFF);
        delay
    }

    pub fn reset(&mut self) {
        self.current = INITIAL_BACKOFF;
    }
}

#[derive(Debug, Clone)]
pub struct FeedSocketConfig {
    pub label: String,
    pub url: String,
    /// Client-initiated ping period. Binance pings the client, so this is
    /// usually `None`.
    pub ping_interval: Option<Duration>,
}

/// A WebSocket connection managed by a background tokio task.
pub struct FeedSocket {
    config: FeedSocketConfig,
    shutdown_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl FeedSocket {
    pub fn new(config: FeedSocketConfig) -> Self {
        Self { config, shutdown_tx: None, task: None }
    }

    /// Start the connection task. Frames go to `on_text` on the runtime.
    pub fn start(&mut self, on_text: OnTextCallback) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let config = self.config.clone();
        self.task = Some(tokio::spawn(connection_loop(config, on_text, shutdown_rx)));
        self.shutdown_tx = Some(shutdown_tx);
    }

    /// Close the connection and wait for the task to finish.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

/// Sleep for the next backoff delay. Returns `false` if shutdown arrived first.
async fn wait_before_retry(backoff: &mut Backoff, shutdown_rx: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(backoff.next_delay()) => true,
        _ = shutdown_rx.changed() => false,
    }
}

async fn connection_loop(
    config: FeedSocketConfig,
    on_text: OnTextCallback,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let label = &config.label;
    let mut backoff = Backoff::default();

    loop {
        if *shutdown_rx.borrow() {
            info!("[{label}] shutdown requested");
            return;
        }

        info!("[{label}] connecting to {}", config.url);
        let ws_stream = match tokio_tungstenite::connect_async(config.url.as_str()).await {
            Ok((stream, _response)) => {
                backoff.reset();
                info!("[{label}] connected");
                stream
            }
            Err(e) => {
                error!("[{label}] connection failed: {e}");
                if !wait_before_retry(&mut backoff, &mut shutdown_rx).await {
                    return;
                }
                continue;
            }
        };

        let (mut ws_write, mut ws_read) = ws_stream.split();
        let mut ping = config.ping_interval.map(tokio::time::interval);

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    info!("[{label}] closing connection");
                    let _ = ws_write.close().await;
                    return;
                }

                msg = ws_read.next() => match msg {
                    Some(Ok(Message::Text(text))) => on_text(&text),
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = ws_write.send(Message::Pong(data)).await {
                            error!("[{label}] pong send error: {e}");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        warn!("[{label}] received close frame: {frame:?}");
                        break;
                    }
                    Some(Ok(other)) => {
                        debug!("[{label}] ignoring {} byte non-text frame", other.len())
                    }
                    Some(Err(e)) => {
                        error!("[{label}] read error: {e}");
                        break;
                    }
                    None => {
                        warn!("[{label}] stream ended");
                        break;
                    }
                },

                _ = async {
                    match ping.as_mut() {
                        Some(interval) => { interval.tick().await; }
                        None => std::future::pending::<()>().await,
                    }
                } => {
                    if let Err(e) = ws_write.send(Message::Ping(Vec::new().into())).await {
                        error!("[{label}] ping send error: {e}");
                        break;
                    }
                }
            }
        }

        warn!("[{label}] disconnected, reconnecting");
        if !wait_before_retry(&mut backoff, &mut shutdown_rx).await {
            return;
        }
    }
}
