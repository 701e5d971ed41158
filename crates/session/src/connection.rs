//! WebSocket connection to the sidecar, with auto-reconnect and
//! request/response correlation for directory lookups.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use {
    chrono::{DateTime, Utc},
    futures::{SinkExt, StreamExt},
    tokio::{
        net::TcpStream,
        sync::{Mutex, RwLock, mpsc, oneshot},
    },
    tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message},
    tracing::{debug, info, warn},
};

use warelay_ingest::{Jid, MessageEvent};

use crate::{
    error::{Error, Result},
    wire::{GatewayCommand, SidecarEvent},
};

/// Default port of the sidecar WebSocket server.
pub const DEFAULT_SIDECAR_PORT: u16 = 3301;

/// Initial-connect retry budget while the sidecar process is still starting.
const CONNECT_ATTEMPTS: u32 = 10;
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Maximum reconnect backoff delay.
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// How long a directory lookup waits for its sidecar response.
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection lifecycle as reported by the sidecar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    WaitingForQr,
    QrReceived(String),
    Connected { phone_number: Option<String> },
}

/// Response to a pending directory lookup.
#[derive(Debug)]
pub(crate) enum LookupReply {
    Group {
        found: bool,
        name: String,
    },
    Contact {
        found: bool,
        full_name: String,
        push_name: String,
    },
}

type PendingLookups = Arc<Mutex<HashMap<String, oneshot::Sender<LookupReply>>>>;
type SharedState = Arc<RwLock<ConnectionState>>;

/// Handle to the sidecar connection. The connection itself runs in a
/// background task; the handle only pushes commands onto its write channel.
pub struct SidecarHandle {
    write_tx: mpsc::UnboundedSender<GatewayCommand>,
    pending: PendingLookups,
    state: SharedState,
}

impl SidecarHandle {
    /// Connect to the sidecar and resume (or start) the session stored under
    /// `auth_dir`. Retries the initial connect while the sidecar process is
    /// still coming up; exhausting the retry budget is fatal — the pipeline
    /// never starts without a session.
    ///
    /// Inbound chat messages are pushed onto `events`. After the initial
    /// connect, lost connections are re-established with exponential backoff
    /// and the login command is replayed.
    pub async fn connect(
        port: u16,
        auth_dir: PathBuf,
        events: mpsc::UnboundedSender<MessageEvent>,
    ) -> Result<Self> {
        let url = format!("ws://127.0.0.1:{port}");
        let stream = connect_with_retry(&url).await?;
        info!(url = %url, "connected to sidecar");

        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let pending: PendingLookups = Arc::new(Mutex::new(HashMap::new()));
        let state: SharedState = Arc::new(RwLock::new(ConnectionState::Disconnected));

        tokio::spawn(connection_loop(
            url,
            auth_dir,
            stream,
            write_rx,
            events,
            Arc::clone(&pending),
            Arc::clone(&state),
        ));

        Ok(Self {
            write_tx,
            pending,
            state,
        })
    }

    /// Queue a command for the sidecar.
    pub fn send(&self, command: GatewayCommand) -> Result<()> {
        self.write_tx
            .send(command)
            .map_err(|_| Error::Connection("sidecar connection closed".into()))
    }

    pub async fn state(&self) -> ConnectionState {
        self.state.read().await.clone()
    }

    /// Issue a lookup command and wait for the correlated response. Send
    /// failures, timeouts, and a torn-down connection all yield `None` — the
    /// resolver degrades instead of erroring.
    pub(crate) async fn lookup(
        &self,
        command: impl FnOnce(String) -> GatewayCommand,
    ) -> Option<LookupReply> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending
            .lock()
            .await
            .insert(request_id.clone(), reply_tx);

        if self.send(command(request_id.clone())).is_err() {
            self.pending.lock().await.remove(&request_id);
            return None;
        }

        match tokio::time::timeout(LOOKUP_TIMEOUT, reply_rx).await {
            Ok(Ok(reply)) => Some(reply),
            // Timed out or the connection dropped the pending map.
            _ => {
                self.pending.lock().await.remove(&request_id);
                None
            },
        }
    }
}

async fn connect_with_retry(url: &str) -> Result<WsStream> {
    let mut last_error = None;
    for attempt in 1..=CONNECT_ATTEMPTS {
        match connect_async(url).await {
            Ok((stream, _response)) => return Ok(stream),
            Err(error) => {
                debug!(attempt, error = %error, "sidecar not ready yet");
                last_error = Some(error);
            },
        }
        tokio::time::sleep(CONNECT_RETRY_DELAY).await;
    }
    Err(last_error
        .map(Error::from)
        .unwrap_or_else(|| Error::Connection("sidecar connect retries exhausted".into())))
}

/// Why a single connection attempt ended.
enum LoopExit {
    /// The handle was dropped; shut down for good.
    Shutdown,
    /// The sidecar went away; reconnect.
    ConnectionLost,
}

async fn connection_loop(
    url: String,
    auth_dir: PathBuf,
    initial: WsStream,
    mut write_rx: mpsc::UnboundedReceiver<GatewayCommand>,
    events: mpsc::UnboundedSender<MessageEvent>,
    pending: PendingLookups,
    state: SharedState,
) {
    let mut stream = Some(initial);
    let mut backoff = Duration::from_secs(1);

    loop {
        let ws = match stream.take() {
            Some(ws) => ws,
            None => match connect_async(&url).await {
                Ok((ws, _response)) => {
                    info!(url = %url, "reconnected to sidecar");
                    ws
                },
                Err(error) => {
                    warn!(error = %error, delay_ms = backoff.as_millis(), "sidecar reconnect failed");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    continue;
                },
            },
        };
        backoff = Duration::from_secs(1);

        let exit = run_connection(ws, &auth_dir, &mut write_rx, &events, &pending, &state).await;

        *state.write().await = ConnectionState::Disconnected;
        // Dropping the senders wakes every in-flight lookup with a miss.
        pending.lock().await.clear();

        match exit {
            Ok(LoopExit::Shutdown) => {
                debug!("sidecar connection shut down");
                return;
            },
            Ok(LoopExit::ConnectionLost) => {
                warn!("sidecar connection lost, reconnecting");
            },
            Err(error) => {
                warn!(error = %error, "sidecar connection error, reconnecting");
            },
        }
    }
}

/// Drive one established connection: replay the login, then forward frames
/// both ways until either side goes away.
async fn run_connection(
    ws: WsStream,
    auth_dir: &Path,
    write_rx: &mut mpsc::UnboundedReceiver<GatewayCommand>,
    events: &mpsc::UnboundedSender<MessageEvent>,
    pending: &PendingLookups,
    state: &SharedState,
) -> Result<LoopExit> {
    let (mut sink, mut reader) = ws.split();

    let login = GatewayCommand::Login {
        auth_dir: auth_dir.display().to_string(),
    };
    sink.send(Message::Text(serde_json::to_string(&login)?.into()))
        .await?;
    *state.write().await = ConnectionState::WaitingForQr;

    loop {
        tokio::select! {
            frame = reader.next() => match frame {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<SidecarEvent>(&text) {
                    Ok(event) => dispatch_event(event, events, pending, state).await,
                    Err(error) => warn!(error = %error, "undecodable sidecar frame"),
                },
                Some(Ok(Message::Ping(data))) => sink.send(Message::Pong(data)).await?,
                Some(Ok(Message::Close(_))) | None => return Ok(LoopExit::ConnectionLost),
                Some(Ok(_)) => {},
                Some(Err(error)) => return Err(error.into()),
            },
            command = write_rx.recv() => match command {
                Some(command) => {
                    let json = serde_json::to_string(&command)?;
                    sink.send(Message::Text(json.into())).await?;
                },
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    return Ok(LoopExit::Shutdown);
                },
            },
        }
    }
}

async fn dispatch_event(
    event: SidecarEvent,
    events: &mpsc::UnboundedSender<MessageEvent>,
    pending: &PendingLookups,
    state: &SharedState,
) {
    match event {
        SidecarEvent::Qr { code } => {
            info!(code = %code, "scan this QR code with WhatsApp on your phone");
            *state.write().await = ConnectionState::QrReceived(code);
        },
        SidecarEvent::Connected { phone_number } => {
            info!(?phone_number, "whatsapp session connected");
            *state.write().await = ConnectionState::Connected { phone_number };
        },
        SidecarEvent::Disconnected { reason } => {
            warn!(reason, "whatsapp session disconnected");
            *state.write().await = ConnectionState::Disconnected;
        },
        SidecarEvent::Message {
            id,
            chat_jid,
            sender_jid,
            is_from_me,
            push_name,
            timestamp,
            content,
        } => {
            let event = MessageEvent {
                id,
                chat: Jid::from(chat_jid),
                sender: Jid::from(sender_jid),
                is_from_me,
                push_name,
                timestamp: DateTime::from_timestamp(timestamp, 0).unwrap_or_else(Utc::now),
                content,
            };
            // Send failure means the pipeline is gone; nothing left to do.
            let _ = events.send(event);
        },
        SidecarEvent::GroupResult {
            request_id,
            found,
            name,
        } => {
            if let Some(reply_tx) = pending.lock().await.remove(&request_id) {
                let _ = reply_tx.send(LookupReply::Group { found, name });
            }
        },
        SidecarEvent::ContactResult {
            request_id,
            found,
            full_name,
            push_name,
        } => {
            if let Some(reply_tx) = pending.lock().await.remove(&request_id) {
                let _ = reply_tx.send(LookupReply::Contact {
                    found,
                    full_name,
                    push_name,
                });
            }
        },
        SidecarEvent::Error { message } => {
            warn!(message, "sidecar reported an error");
        },
    }
}
