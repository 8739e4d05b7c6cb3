//! Connection task: owns the transport and drives the lifecycle.
//!
//! DESIGN
//! ======
//! One spawned task per client. It owns the config, the dispatcher, the
//! heartbeat, and the current WebSocket; handles talk to it only through the
//! command queue and read state from a `watch` snapshot.
//!
//! LIFECYCLE
//! =========
//! 1. Negotiate (the first cycle is done by `connect()` before spawning)
//! 2. Open `endpoint?ticket=…`
//! 3. `select!` over commands, heartbeat ticks, and inbound frames
//! 4. On close, ask the lifecycle whether to reconnect; sleep, then go to 1
//!
//! Negotiation, the handshake, and the reconnect delay all race against a
//! disconnect command, so `disconnect()` takes effect at any point.

use std::sync::Arc;

use envelope::UpstreamEnvelope;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::Interval;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::dispatch::{Dispatched, Dispatcher, SystemSignal};
use crate::error::{ClientError, ErrorCode};
use crate::heartbeat::{Beat, Heartbeat};
use crate::negotiate::{Negotiate, Negotiated};
use crate::state::{CloseDecision, ConnectionStatus, Lifecycle};

type Transport = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Sink = SplitSink<Transport, Message>;
type Source = SplitStream<Transport>;

/// Requests from handles to the connection task.
#[derive(Debug)]
pub(crate) enum Command {
    /// Write an acknowledgment on the current transport.
    Send(UpstreamEnvelope),
    /// Close for good.
    Disconnect,
}

/// Why a transport session ended.
enum Exit {
    /// Closed by the peer, by an error, or by the heartbeat.
    Closed(Option<ClientError>),
    /// The user asked to disconnect.
    Disconnect,
}

pub(crate) struct ConnectionTask {
    config: ClientConfig,
    negotiator: Arc<dyn Negotiate>,
    dispatcher: Dispatcher,
    lifecycle: Lifecycle,
    commands: mpsc::UnboundedReceiver<Command>,
    status: watch::Sender<ConnectionStatus>,
}

impl ConnectionTask {
    pub(crate) fn new(
        config: ClientConfig,
        negotiator: Arc<dyn Negotiate>,
        dispatcher: Dispatcher,
        lifecycle: Lifecycle,
        commands: mpsc::UnboundedReceiver<Command>,
        status: watch::Sender<ConnectionStatus>,
    ) -> Self {
        Self { config, negotiator, dispatcher, lifecycle, commands, status }
    }

    /// Run until disconnected or closed without reconnect. `first` is the
    /// negotiation already performed by `connect()`.
    pub(crate) async fn run(mut self, first: Negotiated) {
        let mut pending = Some(first);

        loop {
            let negotiated = match pending.take() {
                Some(negotiated) => negotiated,
                None => match self.renegotiate().await {
                    Some(negotiated) => negotiated,
                    None => return,
                },
            };

            self.lifecycle.negotiated(&negotiated.access_token, &negotiated.endpoint);
            self.publish();

            let exit = match self.open(&negotiated.connect_url()).await {
                Ok(Some(ws)) => {
                    self.lifecycle.opened();
                    self.publish();
                    info!(endpoint = %negotiated.endpoint, "transport open");
                    self.drive(ws).await
                }
                Ok(None) => Exit::Disconnect,
                Err(e) => Exit::Closed(Some(e)),
            };

            let err = match exit {
                Exit::Disconnect => {
                    self.finish_disconnect();
                    return;
                }
                Exit::Closed(err) => err,
            };

            if let Some(e) = &err {
                warn!(error = %e, code = e.error_code(), "transport closed with error");
            } else {
                info!("transport closed");
            }

            match self.lifecycle.closed(err.as_ref()) {
                CloseDecision::Stop => {
                    self.publish();
                    info!("connection closed; reconnect disabled");
                    return;
                }
                CloseDecision::Reconnect { attempt } => {
                    self.publish();
                    let delay = self.config.reconnect.delay(attempt);
                    info!(attempt, ?delay, "reconnecting");
                    let interrupted = tokio::select! {
                        biased;
                        () = disconnect_requested(&mut self.commands) => true,
                        () = tokio::time::sleep(delay) => false,
                    };
                    if interrupted {
                        self.finish_disconnect();
                        return;
                    }
                }
            }
        }
    }

    /// Fresh token and ticket for a reconnect. `None` means the task is done.
    async fn renegotiate(&mut self) -> Option<Negotiated> {
        self.lifecycle.begin_negotiation();
        self.publish();

        let result = tokio::select! {
            biased;
            () = disconnect_requested(&mut self.commands) => {
                self.finish_disconnect();
                return None;
            }
            result = self.negotiator.negotiate(&mut self.config) => result,
        };

        match result {
            Ok(negotiated) => Some(negotiated),
            Err(e) => {
                error!(error = %e, code = e.error_code(), "renegotiation failed; giving up");
                self.lifecycle.negotiation_failed(&e);
                self.publish();
                None
            }
        }
    }

    /// WebSocket handshake. `Ok(None)` means a disconnect arrived first.
    async fn open(&mut self, url: &str) -> Result<Option<Transport>, ClientError> {
        debug!("opening transport");
        tokio::select! {
            biased;
            () = disconnect_requested(&mut self.commands) => Ok(None),
            result = tokio_tungstenite::connect_async(url) => {
                let (ws, _response) = result?;
                Ok(Some(ws))
            }
        }
    }

    async fn drive(&mut self, ws: Transport) -> Exit {
        let (mut sink, mut source): (Sink, Source) = ws.split();
        let mut heartbeat = Heartbeat::new(self.config.heartbeat_interval);
        let mut ticker = self.config.keep_alive.then(|| heartbeat.interval());

        loop {
            tokio::select! {
                biased;
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Send(reply)) => {
                        if let Err(e) = write(&mut sink, &reply).await {
                            return Exit::Closed(Some(e));
                        }
                    }
                    Some(Command::Disconnect) | None => {
                        close(&mut sink).await;
                        return Exit::Disconnect;
                    }
                },
                () = next_tick(&mut ticker) => match heartbeat.tick() {
                    Beat::Ping => {
                        if let Err(e) = sink.send(Message::Ping(Vec::<u8>::new().into())).await {
                            return Exit::Closed(Some(e.into()));
                        }
                    }
                    Beat::Stalled => {
                        error!(period = ?heartbeat.period(), "heartbeat unanswered; terminating transport");
                        return Exit::Closed(Some(ClientError::Transport("heartbeat timeout".into())));
                    }
                },
                msg = source.next() => {
                    let out = match msg {
                        Some(Ok(Message::Text(text))) => self.dispatcher.on_frame(text.as_str()).await,
                        Some(Ok(Message::Binary(bytes))) => self.dispatcher.on_binary(&bytes).await,
                        Some(Ok(Message::Pong(_))) => {
                            heartbeat.acknowledge();
                            continue;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            debug!(?frame, "close frame received");
                            return Exit::Closed(None);
                        }
                        Some(Ok(Message::Ping(_) | Message::Frame(_))) => continue,
                        Some(Err(e)) => return Exit::Closed(Some(e.into())),
                        None => return Exit::Closed(None),
                    };
                    if let Some(exit) = self.apply(out, &mut sink, &mut heartbeat).await {
                        return exit;
                    }
                }
            }
        }
    }

    /// Write automatic replies, then act on the control signal.
    async fn apply(&mut self, out: Dispatched, sink: &mut Sink, heartbeat: &mut Heartbeat) -> Option<Exit> {
        for reply in &out.replies {
            if let Err(e) = write(sink, reply).await {
                return Some(Exit::Closed(Some(e)));
            }
        }

        match out.signal? {
            SystemSignal::Connected => info!("gateway acknowledged connection"),
            SystemSignal::Registered => {
                self.lifecycle.registered();
                self.publish();
                info!("registered with gateway");
            }
            SystemSignal::KeepAlive => heartbeat.acknowledge(),
            SystemSignal::Disconnect => {
                self.lifecycle.server_disconnect();
                self.publish();
                close(sink).await;
                return Some(Exit::Closed(None));
            }
        }
        None
    }

    fn finish_disconnect(&mut self) {
        self.lifecycle.request_disconnect();
        self.publish();
        info!("disconnected");
    }

    fn publish(&self) {
        self.status.send_replace(self.lifecycle.status().clone());
    }
}

/// Resolves once a disconnect is requested. Replies queued meanwhile have no
/// transport to go to and are dropped.
async fn disconnect_requested(commands: &mut mpsc::UnboundedReceiver<Command>) {
    while let Some(cmd) = commands.recv().await {
        match cmd {
            Command::Disconnect => return,
            Command::Send(reply) => warn!(message_id = reply.message_id(), "no open transport; reply dropped"),
        }
    }
}

/// Next heartbeat tick, or never when keep-alive is off.
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn write(sink: &mut Sink, reply: &UpstreamEnvelope) -> Result<(), ClientError> {
    let text = match envelope::encode_upstream(reply) {
        Ok(text) => text,
        Err(e) => {
            warn!(message_id = reply.message_id(), error = %e, "reply could not be encoded");
            return Ok(());
        }
    };
    debug!(message_id = reply.message_id(), "writing reply");
    sink.send(Message::Text(text.into())).await?;
    Ok(())
}

async fn close(sink: &mut Sink) {
    if let Err(e) = sink.close().await {
        debug!(error = %e, "close handshake failed");
    }
}
