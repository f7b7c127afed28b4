//! Full-duplex recognition channel over the Watson WebSocket interface.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │    write()      │────▶│ audio_tx (mpsc)  │────▶│ Connection Task │
//! └─────────────────┘     └──────────────────┘     └────────┬────────┘
//!                                                           │
//! ┌─────────────────┐     ┌──────────────────┐              │
//! │  EventStream    │◀────│ events (mpsc)    │◀─────────────┘
//! └─────────────────┘     └──────────────────┘
//! ```
//!
//! Writes made while the channel is `Connecting` wait in the bounded audio
//! queue; the connection task only starts draining it after the service
//! reports `listening`, so audio always leaves in write order.
//!
//! `stop()` flushes queued audio, sends `{"action":"stop"}` and waits for the
//! service to finish (`listening` again or a close frame) before closing. If
//! the service stays silent, or stops reading, the connection is closed
//! `close_timeout` after the stop was observed.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tokio::time::{Instant, timeout, timeout_at};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{
    Connector, MaybeTlsStream, WebSocketStream, connect_async_tls_with_config,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use super::config::{AuthHeader, ChannelParams};
use super::events::{
    ChannelState, ErrorEvent, EventStream, Inbound, RecognitionEvent, classify_payload,
};
use super::messages::ControlMessage;
use super::tls;
use crate::errors::{ChannelError, ChannelResult};

// =============================================================================
// Type Aliases
// =============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

// =============================================================================
// Shared State
// =============================================================================

/// State cell shared by the handle and the connection task.
///
/// Every accepted transition emits a `StateChanged` event while the watch
/// lock is held, so events are observed in transition order.
#[derive(Clone)]
struct StateHandle {
    state: Arc<watch::Sender<ChannelState>>,
    events: mpsc::UnboundedSender<RecognitionEvent>,
}

impl StateHandle {
    fn current(&self) -> ChannelState {
        *self.state.borrow()
    }

    fn transition(&self, next: ChannelState) -> bool {
        let events = &self.events;
        let changed = self.state.send_if_modified(|current| {
            if !current.can_transition_to(next) {
                return false;
            }
            *current = next;
            let _ = events.send(RecognitionEvent::StateChanged(next));
            true
        });
        if changed {
            debug!("Recognition channel is now {}", next);
        }
        changed
    }

    fn emit(&self, event: RecognitionEvent) {
        if self.events.send(event).is_err() {
            debug!("Event stream dropped; discarding event");
        }
    }

    /// Report a transport failure and move to `Errored`.
    fn fail(&self, message: String) {
        if self.current().is_terminal() {
            return;
        }
        error!("Recognition channel failed: {}", message);
        self.emit(RecognitionEvent::Error(ErrorEvent::transport(message)));
        self.transition(ChannelState::Errored);
    }
}

// =============================================================================
// Channel Handle
// =============================================================================

/// Bidirectional streaming recognition session.
///
/// Created with [`DuplexRecognitionChannel::open`], which returns immediately
/// in the `Connecting` state. Audio can be written right away; results arrive
/// on the stream returned by [`DuplexRecognitionChannel::events`].
///
/// Dropping the handle behaves like [`DuplexRecognitionChannel::stop`].
pub struct DuplexRecognitionChannel {
    shared: StateHandle,
    state_rx: watch::Receiver<ChannelState>,
    audio_tx: mpsc::Sender<Bytes>,
    write_queue_capacity: usize,
    paused_tx: watch::Sender<bool>,
    stop_token: CancellationToken,
    events: Option<EventStream>,
}

impl DuplexRecognitionChannel {
    /// Validate `params` and start connecting in the background.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(params: ChannelParams) -> ChannelResult<Self> {
        let url = params.build_websocket_url()?;
        let auth = params.auth.as_ref().map(header_pair).transpose()?;
        let connector = tls::connector(params.disable_ssl_verification)?;
        let start_message = params.options.build_start_message().to_string();
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            ChannelError::Configuration(
                "A Tokio runtime is required to open a recognition channel".to_string(),
            )
        })?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ChannelState::Connecting);
        let shared = StateHandle {
            state: Arc::new(state_tx),
            events: events_tx,
        };
        shared.emit(RecognitionEvent::StateChanged(ChannelState::Connecting));

        let (audio_tx, audio_rx) = mpsc::channel::<Bytes>(params.write_queue_capacity);
        let (paused_tx, paused_rx) = watch::channel(false);
        let stop_token = CancellationToken::new();

        info!("Opening recognition channel to {}", url);

        let task = ConnectionTask {
            url,
            auth,
            connector,
            start_message,
            connect_timeout: params.connect_timeout,
            close_timeout: params.close_timeout,
            shared: shared.clone(),
            audio_rx,
            paused_rx,
            stop_token: stop_token.clone(),
        };
        runtime.spawn(task.run());

        Ok(Self {
            shared,
            state_rx,
            audio_tx,
            write_queue_capacity: params.write_queue_capacity,
            paused_tx,
            stop_token,
            events: Some(EventStream::new(events_rx)),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ChannelState {
        self.shared.current()
    }

    /// Take the event stream. Returns `None` after the first call.
    pub fn events(&mut self) -> Option<EventStream> {
        self.events.take()
    }

    /// Submit one chunk of audio.
    ///
    /// While `Connecting` (or paused) the chunk is queued; once `Open` it is
    /// sent in order behind anything already queued. Fails with
    /// [`ChannelError::Backpressure`] when the queue is full and with
    /// [`ChannelError::NotWritable`] once `stop()` was called or the channel
    /// ended.
    pub fn write(&self, audio: impl Into<Bytes>) -> ChannelResult<()> {
        let state = self.state();
        if !state.accepts_writes() {
            return Err(ChannelError::NotWritable(state));
        }

        self.audio_tx
            .try_send(audio.into())
            .map_err(|e| match e {
                TrySendError::Full(_) => {
                    warn!(
                        "Recognition write queue full ({} pending); rejecting write",
                        self.write_queue_capacity
                    );
                    ChannelError::Backpressure {
                        capacity: self.write_queue_capacity,
                    }
                }
                TrySendError::Closed(_) => ChannelError::NotWritable(self.state()),
            })
    }

    /// Number of writes accepted but not yet handed to the connection.
    pub fn pending_writes(&self) -> usize {
        self.audio_tx.max_capacity() - self.audio_tx.capacity()
    }

    /// Hold outbound audio. Writes keep queueing; inbound events still flow.
    pub fn pause(&self) {
        if !self.paused_tx.send_replace(true) {
            debug!("Recognition channel paused");
        }
    }

    /// Resume sending queued and future audio.
    pub fn resume(&self) {
        if self.paused_tx.send_replace(false) {
            debug!("Recognition channel resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        *self.paused_tx.borrow()
    }

    /// Begin a graceful shutdown. Calling it again has no effect.
    pub fn stop(&self) {
        let state = self.state();
        if state.is_terminal() || state == ChannelState::Closing {
            debug!("Recognition channel already {}; ignoring stop", state);
            return;
        }
        if self.shared.transition(ChannelState::Closing) {
            info!("Stopping recognition channel");
        }
        self.stop_token.cancel();
    }

    /// Wait until the channel reaches `Closed` or `Errored`.
    pub async fn closed(&self) -> ChannelState {
        let mut state_rx = self.state_rx.clone();
        match state_rx.wait_for(|state| state.is_terminal()).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        }
    }
}

impl Drop for DuplexRecognitionChannel {
    fn drop(&mut self) {
        if !self.state().is_terminal() {
            self.stop();
        }
    }
}

impl std::fmt::Debug for DuplexRecognitionChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplexRecognitionChannel")
            .field("state", &self.state())
            .field("paused", &self.is_paused())
            .field("pending_writes", &self.pending_writes())
            .finish()
    }
}

fn header_pair(auth: &AuthHeader) -> ChannelResult<(HeaderName, HeaderValue)> {
    let name = HeaderName::from_bytes(auth.name().as_bytes())
        .map_err(|e| ChannelError::Configuration(format!("Invalid auth header name: {e}")))?;
    let mut value = HeaderValue::from_str(auth.value())
        .map_err(|_| ChannelError::Configuration("Invalid auth header value".to_string()))?;
    value.set_sensitive(true);
    Ok((name, value))
}

// =============================================================================
// Connection Task
// =============================================================================

/// Inbound WebSocket frame reduced to what the channel cares about.
enum Frame {
    Text(String),
    Close(Option<String>),
    Control,
}

impl From<Message> for Frame {
    fn from(message: Message) -> Self {
        match message {
            Message::Text(text) => Frame::Text(text.as_str().to_owned()),
            // The service occasionally delivers JSON in binary frames.
            Message::Binary(data) => Frame::Text(String::from_utf8_lossy(&data).into_owned()),
            Message::Close(frame) => Frame::Close(
                frame.map(|f| format!("{} {}", u16::from(f.code), f.reason.as_str())),
            ),
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => Frame::Control,
        }
    }
}

enum PumpExit {
    /// Carries the deadline for the rest of the shutdown.
    StopRequested(Instant),
    ServerClosed,
    Failed(String),
}

struct ConnectionTask {
    url: Url,
    auth: Option<(HeaderName, HeaderValue)>,
    connector: Option<Connector>,
    start_message: String,
    connect_timeout: Duration,
    close_timeout: Duration,
    shared: StateHandle,
    audio_rx: mpsc::Receiver<Bytes>,
    paused_rx: watch::Receiver<bool>,
    stop_token: CancellationToken,
}

impl ConnectionTask {
    async fn run(self) {
        let ConnectionTask {
            url,
            auth,
            connector,
            start_message,
            connect_timeout,
            close_timeout,
            shared,
            mut audio_rx,
            mut paused_rx,
            stop_token,
        } = self;

        let connected = tokio::select! {
            biased;

            _ = stop_token.cancelled() => None,
            result = timeout(
                connect_timeout,
                connect(&url, auth, connector, start_message, &shared),
            ) => Some(result),
        };

        let (mut sink, mut source) = match connected {
            None => {
                info!("Recognition channel stopped before the service was ready");
                shared.transition(ChannelState::Closed);
                return;
            }
            Some(Ok(Ok(pair))) => pair,
            Some(Ok(Err(message))) => {
                shared.fail(message);
                return;
            }
            Some(Err(_)) => {
                shared.fail(format!(
                    "Service was not ready within {} ms",
                    connect_timeout.as_millis()
                ));
                return;
            }
        };

        if shared.transition(ChannelState::Open) {
            info!("Recognition channel open; service is listening");
        }

        let exit = pump(
            &mut sink,
            &mut source,
            &mut audio_rx,
            &mut paused_rx,
            &stop_token,
            close_timeout,
            &shared,
        )
        .await;

        match exit {
            PumpExit::StopRequested(deadline) => {
                shared.transition(ChannelState::Closing);
                match timeout_at(
                    deadline,
                    close(&mut sink, &mut source, &mut audio_rx, &shared),
                )
                .await
                {
                    Ok(Ok(())) => info!("Service finished recognition; channel closed"),
                    Ok(Err(message)) => {
                        shared.fail(message);
                        return;
                    }
                    Err(_) => warn!(
                        "Service did not confirm closure within {} ms; closing connection",
                        close_timeout.as_millis()
                    ),
                }
                shared.transition(ChannelState::Closed);
            }
            PumpExit::ServerClosed => {
                info!("Service closed the recognition connection");
                shared.transition(ChannelState::Closing);
                shared.transition(ChannelState::Closed);
            }
            PumpExit::Failed(message) => shared.fail(message),
        }
    }
}

/// Handshake, send the start message and wait for `listening`.
async fn connect(
    url: &Url,
    auth: Option<(HeaderName, HeaderValue)>,
    connector: Option<Connector>,
    start_message: String,
    shared: &StateHandle,
) -> Result<(WsSink, WsSource), String> {
    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| format!("Invalid WebSocket request: {e}"))?;
    if let Some((name, value)) = auth {
        request.headers_mut().insert(name, value);
    }

    let (ws_stream, _response) = connect_async_tls_with_config(request, None, true, connector)
        .await
        .map_err(|e| format!("Failed to connect to speech service: {e}"))?;
    debug!("WebSocket handshake complete");

    let (mut sink, mut source) = ws_stream.split();
    sink.send(Message::Text(start_message.into()))
        .await
        .map_err(|e| format!("Failed to send start message: {e}"))?;
    debug!("Sent start message");

    while let Some(message) = source.next().await {
        let message = message.map_err(|e| format!("WebSocket error before listening: {e}"))?;
        match Frame::from(message) {
            Frame::Text(text) => match classify_payload(&text) {
                Inbound::Listening => return Ok((sink, source)),
                Inbound::State(state) => debug!("Service state before listening: {}", state),
                Inbound::Event(event) => shared.emit(event),
            },
            Frame::Close(reason) => {
                return Err(format!(
                    "Service closed the connection before it was ready ({})",
                    reason.as_deref().unwrap_or("no reason")
                ));
            }
            Frame::Control => {}
        }
    }

    Err("Connection ended before the service was ready".to_string())
}

/// Open-state loop: forward audio out, events in.
async fn pump(
    sink: &mut WsSink,
    source: &mut WsSource,
    audio_rx: &mut mpsc::Receiver<Bytes>,
    paused_rx: &mut watch::Receiver<bool>,
    stop_token: &CancellationToken,
    close_timeout: Duration,
    shared: &StateHandle,
) -> PumpExit {
    let mut paused = *paused_rx.borrow_and_update();
    let mut watching_pause = true;

    loop {
        tokio::select! {
            biased;

            _ = stop_token.cancelled() => {
                return PumpExit::StopRequested(Instant::now() + close_timeout);
            }

            changed = paused_rx.changed(), if watching_pause => match changed {
                Ok(()) => paused = *paused_rx.borrow_and_update(),
                Err(_) => watching_pause = false,
            },

            audio = audio_rx.recv(), if !paused => match audio {
                Some(audio) => {
                    let send = sink.send(Message::Binary(audio));
                    tokio::pin!(send);

                    // A peer that stops reading stalls the send; once stop is
                    // requested it gets only the close grace period to finish.
                    let sent = tokio::select! {
                        biased;

                        sent = &mut send => sent,
                        _ = stop_token.cancelled() => {
                            let deadline = Instant::now() + close_timeout;
                            match timeout_at(deadline, &mut send).await {
                                Ok(Ok(())) => {}
                                Ok(Err(e)) => {
                                    return PumpExit::Failed(format!("Failed to send audio: {e}"));
                                }
                                Err(_) => warn!("Audio send still pending at stop; abandoning it"),
                            }
                            return PumpExit::StopRequested(deadline);
                        }
                    };
                    if let Err(e) = sent {
                        return PumpExit::Failed(format!("Failed to send audio: {e}"));
                    }
                }
                None => return PumpExit::StopRequested(Instant::now() + close_timeout),
            },

            message = source.next() => match message {
                Some(Ok(message)) => match Frame::from(message) {
                    Frame::Text(text) => match classify_payload(&text) {
                        Inbound::Listening => debug!("Service is listening"),
                        Inbound::State(state) => debug!("Service state: {}", state),
                        Inbound::Event(event) => {
                            if let RecognitionEvent::Error(err) = &event {
                                warn!("Recognition error event ({:?}): {}", err.kind, err.message);
                            }
                            shared.emit(event);
                        }
                    },
                    Frame::Close(reason) => {
                        debug!(
                            "Close frame received: {}",
                            reason.as_deref().unwrap_or("no reason")
                        );
                        return PumpExit::ServerClosed;
                    }
                    Frame::Control => {}
                },
                Some(Err(e)) => return PumpExit::Failed(format!("WebSocket error: {e}")),
                None => return PumpExit::ServerClosed,
            },
        }
    }
}

/// Flush queued audio, send `stop` and drain results until the service is done.
async fn close(
    sink: &mut WsSink,
    source: &mut WsSource,
    audio_rx: &mut mpsc::Receiver<Bytes>,
    shared: &StateHandle,
) -> Result<(), String> {
    let mut flushed = 0usize;
    while let Ok(audio) = audio_rx.try_recv() {
        sink.send(Message::Binary(audio))
            .await
            .map_err(|e| format!("Failed to flush queued audio: {e}"))?;
        flushed += 1;
    }
    if flushed > 0 {
        debug!("Flushed {} queued writes before stop", flushed);
    }

    let stop = serde_json::to_string(&ControlMessage::Stop)
        .map_err(|e| format!("Failed to encode stop message: {e}"))?;
    sink.send(Message::Text(stop.into()))
        .await
        .map_err(|e| format!("Failed to send stop message: {e}"))?;
    debug!("Sent stop message");

    let mut close_sent = false;
    while let Some(message) = source.next().await {
        let message = match message {
            Ok(message) => message,
            Err(e) if close_sent => {
                debug!("Connection ended after close: {}", e);
                return Ok(());
            }
            Err(e) => return Err(format!("WebSocket error while closing: {e}")),
        };

        match Frame::from(message) {
            Frame::Text(text) => match classify_payload(&text) {
                Inbound::Listening if !close_sent => {
                    close_sent = true;
                    if let Err(e) = sink.send(Message::Close(None)).await {
                        debug!("Failed to send close frame: {}", e);
                        return Ok(());
                    }
                }
                Inbound::Listening | Inbound::State(_) => {}
                Inbound::Event(event) => shared.emit(event),
            },
            Frame::Close(_) => return Ok(()),
            Frame::Control => {}
        }
    }

    Ok(())
}
