//! One attempt against one endpoint: connect, subscribe, demultiplex frames
//! until a quote resolves or the attempt fails, then clean up exactly once.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use futures_util::{SinkExt, StreamExt};
use metrics::increment_counter;
use quote_types::{QuoteRequest, QuoteResult};
use titan_wire::{
    decode_server_message, encode, subprotocol_header, ClientRequest, QuoteUpdateParams,
    RequestData, ServerMessage, StopStreamRequest,
};
use tokio::net::TcpStream;
use tokio::time::{sleep_until, timeout, timeout_at, Instant};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

use crate::config::Settings;
use crate::error::{transport_error, QuoteError, Result};
use crate::quote_stream::coordinator::QuoteRequestCoordinator;
use crate::quote_stream::regions::endpoint_host;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Time allowed for the close handshake before the connection is dropped.
pub const DEFAULT_CLOSE_GRACE: Duration = Duration::from_millis(500);

/// Lifecycle of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptPhase {
    Init,
    Connecting,
    Open,
    AwaitingStreamId,
    AwaitingData,
    Resolved,
    Failed,
}

impl AttemptPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, AttemptPhase::Resolved | AttemptPhase::Failed)
    }
}

/// Holds the attempt phase. Once terminal it never changes again.
#[derive(Debug)]
pub struct PhaseCell {
    phase: AttemptPhase,
}

impl Default for PhaseCell {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseCell {
    pub fn new() -> Self {
        Self {
            phase: AttemptPhase::Init,
        }
    }

    pub fn get(&self) -> AttemptPhase {
        self.phase
    }

    /// Moves to a non-terminal phase. Ignored after settlement.
    pub fn advance(&mut self, next: AttemptPhase) -> bool {
        if self.phase.is_terminal() || next.is_terminal() {
            return false;
        }
        self.phase = next;
        true
    }

    /// Settles the attempt. Returns `true` only on the first call.
    pub fn settle(&mut self, resolved: bool) -> bool {
        if self.phase.is_terminal() {
            return false;
        }
        self.phase = if resolved {
            AttemptPhase::Resolved
        } else {
            AttemptPhase::Failed
        };
        true
    }
}

/// Close code and reason sent when an attempt ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Ok,
    Error,
    Timeout,
}

impl CloseReason {
    pub fn for_outcome(outcome: &Result<QuoteResult>) -> Self {
        match outcome {
            Ok(_) => CloseReason::Ok,
            Err(e) if e.is_timeout() => CloseReason::Timeout,
            Err(_) => CloseReason::Error,
        }
    }

    pub fn code(self) -> u16 {
        match self {
            CloseReason::Ok => 1000,
            CloseReason::Error => 4001,
            CloseReason::Timeout => 4000,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CloseReason::Ok => "ok",
            CloseReason::Error => "error",
            CloseReason::Timeout => "timeout",
        }
    }
}

/// Per-attempt settings shared by every candidate.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub token: Option<String>,
    pub request_timeout: Duration,
    pub update: QuoteUpdateParams,
    pub close_grace: Duration,
}

impl SessionOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            token: settings.token.clone(),
            request_timeout: settings.request_timeout,
            update: QuoteUpdateParams {
                interval_ms: settings.update_interval_ms,
                num_quotes: settings.num_quotes,
            },
            close_grace: DEFAULT_CLOSE_GRACE,
        }
    }
}

pub struct SessionTransport<'a> {
    endpoint: &'a str,
    host: String,
    options: &'a SessionOptions,
    coordinator: QuoteRequestCoordinator<'a>,
    phase: PhaseCell,
    next_request_id: u32,
    subscribe_id: Option<u32>,
    stream_id: Option<u32>,
}

impl<'a> SessionTransport<'a> {
    pub fn new(endpoint: &'a str, request: &'a QuoteRequest, options: &'a SessionOptions) -> Self {
        Self {
            endpoint,
            host: endpoint_host(endpoint),
            options,
            coordinator: QuoteRequestCoordinator::new(request, options.update),
            phase: PhaseCell::new(),
            next_request_id: 1,
            subscribe_id: None,
            stream_id: None,
        }
    }

    pub fn phase(&self) -> AttemptPhase {
        self.phase.get()
    }

    pub fn stream_id(&self) -> Option<u32> {
        self.stream_id
    }

    /// Runs the attempt to settlement. Connect, handshake and streaming all
    /// share one deadline.
    pub async fn run(mut self) -> Result<QuoteResult> {
        let deadline = Instant::now() + self.options.request_timeout;
        self.phase.advance(AttemptPhase::Connecting);

        let connected = match timeout_at(deadline, self.connect()).await {
            Ok(connected) => connected,
            Err(_) => Err(self.timeout_error()),
        };
        let mut ws = match connected {
            Ok(ws) => ws,
            Err(e) => {
                self.phase.settle(false);
                record_attempt(e.kind_label());
                return Err(e);
            }
        };
        self.phase.advance(AttemptPhase::Open);

        let outcome = self.drive(&mut ws, deadline).await;
        self.finish(ws, &outcome).await;
        match &outcome {
            Ok(result) => {
                record_attempt("success");
                info!(
                    host = %self.host,
                    provider = %result.provider,
                    amount_out = %result.amount_out,
                    "Quote resolved"
                );
            }
            Err(e) => record_attempt(e.kind_label()),
        }
        outcome
    }

    async fn connect(&self) -> Result<WsStream> {
        let mut request = self
            .endpoint
            .into_client_request()
            .map_err(|e| transport_error(e, "invalid endpoint"))?;

        let headers = request.headers_mut();
        let protocols = HeaderValue::from_str(&subprotocol_header())
            .map_err(|e| QuoteError::InternalError(format!("sub-protocol header: {}", e)))?;
        headers.insert(header::SEC_WEBSOCKET_PROTOCOL, protocols);
        if let Some(token) = self.options.token.as_deref() {
            let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| QuoteError::InvalidConfig("token is not a valid header value".to_string()))?;
            headers.insert("authentication", bearer.clone());
            headers.insert(header::AUTHORIZATION, bearer);
        }

        debug!(host = %self.host, "Connecting to quote stream");
        let (ws, response) = connect_async(request)
            .await
            .map_err(|e| transport_error(e, "connect"))?;

        let negotiated = response
            .headers()
            .get(header::SEC_WEBSOCKET_PROTOCOL)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("none");
        debug!(host = %self.host, protocol = negotiated, "Quote stream connected");
        Ok(ws)
    }

    async fn drive(&mut self, ws: &mut WsStream, deadline: Instant) -> Result<QuoteResult> {
        let payload = self.coordinator.subscribe_payload()?;
        let subscribe_id = self.send(ws, RequestData::Subscribe(payload)).await?;
        self.subscribe_id = Some(subscribe_id);
        self.phase.advance(AttemptPhase::AwaitingStreamId);
        debug!(host = %self.host, request_id = subscribe_id, "Subscribed to quote stream");

        let expiry = sleep_until(deadline);
        tokio::pin!(expiry);

        loop {
            tokio::select! {
                _ = &mut expiry => return Err(self.timeout_error()),
                frame = ws.next() => {
                    let message = match frame {
                        Some(Ok(message)) => message,
                        Some(Err(e)) => return Err(transport_error(e, "read")),
                        None => return Err(QuoteError::transport("connection closed")),
                    };
                    if let Some(result) = self.on_message(message)? {
                        return Ok(result);
                    }
                }
            }
        }
    }

    /// Handles one raw transport message.
    pub fn on_message(&mut self, message: Message) -> Result<Option<QuoteResult>> {
        let bytes = match message {
            Message::Binary(bytes) => bytes,
            Message::Text(text) => BASE64_STANDARD
                .decode(text.trim())
                .map_err(|e| QuoteError::protocol(format!("undecodable text frame: {}", e)))?,
            Message::Close(frame) => {
                let detail = frame
                    .map(|f| format!("{} {}", u16::from(f.code), f.reason))
                    .unwrap_or_else(|| "no close frame".to_string());
                return Err(QuoteError::transport(format!("connection closed ({})", detail)));
            }
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => return Ok(None),
        };

        let frame = decode_server_message(&bytes)
            .map_err(|e| QuoteError::protocol(format!("undecodable frame: {}", e)))?;
        self.on_frame(frame)
    }

    /// Applies one decoded frame. Returns the result when this frame resolves
    /// the attempt.
    pub fn on_frame(&mut self, frame: ServerMessage) -> Result<Option<QuoteResult>> {
        if self.phase.get().is_terminal() {
            return Ok(None);
        }
        trace!(host = %self.host, kind = frame.kind(), "Inbound frame");

        match frame {
            ServerMessage::Ack(ack) => {
                match (self.subscribe_id, ack.stream) {
                    (Some(expected), Some(stream)) if ack.request_id == expected => {
                        self.stream_id = Some(stream.id);
                        self.phase.advance(AttemptPhase::AwaitingData);
                        debug!(host = %self.host, stream_id = stream.id, "Stream assigned");
                    }
                    _ => debug!(request_id = ack.request_id, "Ignoring ack"),
                }
                Ok(None)
            }
            ServerMessage::Error(error) => {
                debug!(
                    host = %self.host,
                    request_id = ?error.request_id,
                    code = ?error.code,
                    "Quote stream error frame"
                );
                Err(QuoteError::protocol(
                    error
                        .message
                        .unwrap_or_else(|| "quote stream error".to_string()),
                ))
            }
            ServerMessage::Data(data) => {
                if let Some(stream_id) = self.stream_id {
                    if data.id != stream_id {
                        trace!(expected = stream_id, got = data.id, "Dropping frame for another stream");
                        return Ok(None);
                    }
                }
                match data.payload.swap_quotes {
                    Some(quotes) => self.coordinator.on_quotes(&quotes).map(Some),
                    None => Ok(None),
                }
            }
            ServerMessage::End(end) => {
                debug!(host = %self.host, stream_id = end.id, code = ?end.error_code, "Stream ended");
                Err(QuoteError::protocol(
                    end.error_message.unwrap_or_else(|| "stream ended".to_string()),
                ))
            }
            ServerMessage::Unknown(kind) => {
                debug!(host = %self.host, kind = %kind, "Ignoring unknown frame kind");
                Ok(None)
            }
        }
    }

    async fn send(&mut self, ws: &mut WsStream, data: RequestData) -> Result<u32> {
        let id = self.next_request_id;
        self.next_request_id += 1;
        let bytes = encode(&ClientRequest { id, data })?;
        ws.send(Message::Binary(bytes))
            .await
            .map_err(|e| transport_error(e, "send"))?;
        Ok(id)
    }

    /// Settles the attempt and tears the connection down. Only the first call
    /// has any effect.
    async fn finish(&mut self, mut ws: WsStream, outcome: &Result<QuoteResult>) {
        if !self.phase.settle(outcome.is_ok()) {
            return;
        }

        if outcome.is_ok() {
            if let Some(stream_id) = self.stream_id {
                let stop = RequestData::Unsubscribe(StopStreamRequest { id: stream_id });
                if let Err(e) = self.send(&mut ws, stop).await {
                    debug!(host = %self.host, stream_id, error = %e, "Stop stream not delivered");
                }
            }
        }

        let reason = CloseReason::for_outcome(outcome);
        let frame = CloseFrame {
            code: CloseCode::from(reason.code()),
            reason: reason.as_str().into(),
        };
        match timeout(self.options.close_grace, ws.close(Some(frame))).await {
            Ok(Ok(())) => debug!(host = %self.host, code = reason.code(), "Connection closed"),
            Ok(Err(e)) => debug!(host = %self.host, error = %e, "Close failed"),
            Err(_) => warn!(host = %self.host, "Close not acknowledged in time; dropping connection"),
        }
    }

    fn timeout_error(&self) -> QuoteError {
        QuoteError::timeout(format!(
            "no quote from {} within {} ms",
            self.host,
            self.options.request_timeout.as_millis()
        ))
    }
}

fn record_attempt(outcome: &'static str) {
    increment_counter!("quote_attempts_total", "outcome" => outcome);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use titan_wire::{
        Ack, ErrorFrame, StreamData, StreamDataPayload, StreamEnd, StreamStart, SwapQuotes,
        SwapRoute, WireAmount,
    };

    const SOL: &str = "So11111111111111111111111111111111111111112";
    const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
    const USER: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

    fn options() -> SessionOptions {
        SessionOptions::from_settings(&Settings::default())
    }

    fn request() -> QuoteRequest {
        QuoteRequest::new(SOL, USDC, "1000", 50, USER)
    }

    fn data(stream: u32, out: u64) -> ServerMessage {
        let mut quotes = BTreeMap::new();
        quotes.insert(
            "titan".to_string(),
            SwapRoute {
                out_amount: Some(WireAmount::Unsigned(out)),
                ..SwapRoute::default()
            },
        );
        ServerMessage::Data(StreamData {
            id: stream,
            seq: Some(0),
            payload: StreamDataPayload {
                swap_quotes: Some(SwapQuotes {
                    id: format!("quotes-{}", stream),
                    quotes,
                }),
            },
        })
    }

    fn ack(request_id: u32, stream: u32) -> ServerMessage {
        ServerMessage::Ack(Ack {
            request_id,
            stream: Some(StreamStart { id: stream }),
        })
    }

    #[test]
    fn test_settle_happens_once() {
        let mut cell = PhaseCell::new();
        assert!(cell.advance(AttemptPhase::Connecting));
        assert!(cell.settle(true));
        assert!(!cell.settle(false));
        assert!(!cell.advance(AttemptPhase::Open));
        assert_eq!(cell.get(), AttemptPhase::Resolved);
    }

    #[test]
    fn test_close_reasons() {
        assert_eq!(CloseReason::for_outcome(&Err(QuoteError::timeout("t"))).code(), 4000);
        assert_eq!(CloseReason::for_outcome(&Err(QuoteError::protocol("p"))).code(), 4001);
        assert_eq!(CloseReason::Ok.code(), 1000);
        assert_eq!(CloseReason::Timeout.as_str(), "timeout");
    }

    #[test]
    fn test_ack_assigns_stream_only_for_subscribe() {
        let request = request();
        let options = options();
        let mut session = SessionTransport::new("ws://127.0.0.1:1/ws", &request, &options);
        session.subscribe_id = Some(1);

        assert!(session.on_frame(ack(7, 42)).unwrap().is_none());
        assert_eq!(session.stream_id(), None);

        assert!(session.on_frame(ack(1, 42)).unwrap().is_none());
        assert_eq!(session.stream_id(), Some(42));
        assert_eq!(session.phase(), AttemptPhase::AwaitingData);
    }

    #[test]
    fn test_data_for_other_stream_is_dropped() {
        let request = request();
        let options = options();
        let mut session = SessionTransport::new("ws://127.0.0.1:1/ws", &request, &options);
        session.subscribe_id = Some(1);
        session.on_frame(ack(1, 5)).unwrap();

        assert!(session.on_frame(data(6, 100)).unwrap().is_none());
        let result = session.on_frame(data(5, 100)).unwrap().unwrap();
        assert_eq!(result.route_id, "quotes-5");
    }

    #[test]
    fn test_data_before_ack_is_accepted() {
        let request = request();
        let options = options();
        let mut session = SessionTransport::new("ws://127.0.0.1:1/ws", &request, &options);

        let result = session.on_frame(data(9, 77)).unwrap().unwrap();
        assert_eq!(result.amount_out, "77");
    }

    #[test]
    fn test_data_without_quotes_keeps_streaming() {
        let request = request();
        let options = options();
        let mut session = SessionTransport::new("ws://127.0.0.1:1/ws", &request, &options);

        let frame = ServerMessage::Data(StreamData {
            id: 1,
            seq: None,
            payload: StreamDataPayload::default(),
        });
        assert!(session.on_frame(frame).unwrap().is_none());
    }

    #[test]
    fn test_error_and_end_frames_fail_the_attempt() {
        let request = request();
        let options = options();
        let mut session = SessionTransport::new("ws://127.0.0.1:1/ws", &request, &options);

        let err = session
            .on_frame(ServerMessage::Error(ErrorFrame {
                request_id: Some(1),
                code: Some(429),
                message: Some("rate limited".to_string()),
            }))
            .unwrap_err();
        assert!(matches!(err, QuoteError::Protocol(ref m) if m == "rate limited"));

        let err = session
            .on_frame(ServerMessage::End(StreamEnd {
                id: 1,
                error_code: Some(503),
                error_message: Some("venue offline".to_string()),
            }))
            .unwrap_err();
        assert!(matches!(err, QuoteError::Protocol(ref m) if m == "venue offline"));

        let err = session
            .on_frame(ServerMessage::End(StreamEnd {
                id: 1,
                error_code: None,
                error_message: None,
            }))
            .unwrap_err();
        assert!(matches!(err, QuoteError::Protocol(ref m) if m == "stream ended"));
    }

    #[test]
    fn test_control_and_close_messages() {
        let request = request();
        let options = options();
        let mut session = SessionTransport::new("ws://127.0.0.1:1/ws", &request, &options);

        assert!(session.on_message(Message::Ping(vec![1])).unwrap().is_none());
        let err = session.on_message(Message::Close(None)).unwrap_err();
        assert!(matches!(err, QuoteError::Transport(_)));
        let err = session.on_message(Message::Binary(vec![0xc1])).unwrap_err();
        assert!(matches!(err, QuoteError::Protocol(_)));
    }

    #[test]
    fn test_unknown_frame_kind_keeps_streaming() {
        #[derive(serde::Serialize)]
        enum Foreign {
            Heartbeat { at: u64 },
        }

        let request = request();
        let options = options();
        let mut session = SessionTransport::new("ws://127.0.0.1:1/ws", &request, &options);

        let heartbeat = encode(&Foreign::Heartbeat { at: 1 }).unwrap();
        assert!(session.on_message(Message::Binary(heartbeat)).unwrap().is_none());
        assert!(!session.phase().is_terminal());

        let bytes = encode(&data(4, 66)).unwrap();
        let result = session.on_message(Message::Binary(bytes)).unwrap().unwrap();
        assert_eq!(result.amount_out, "66");
    }

    #[test]
    fn test_text_frames_are_base64_binary() {
        let request = request();
        let options = options();
        let mut session = SessionTransport::new("ws://127.0.0.1:1/ws", &request, &options);

        let bytes = encode(&data(3, 55)).unwrap();
        let text = BASE64_STANDARD.encode(bytes);
        let result = session.on_message(Message::Text(text)).unwrap().unwrap();
        assert_eq!(result.amount_out, "55");
    }

    #[tokio::test]
    async fn test_refused_connection_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let request = request();
        let options = options();
        let endpoint = format!("ws://{}/api/v1/ws", addr);
        let err = SessionTransport::new(&endpoint, &request, &options)
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, QuoteError::Transport(_)));
    }
}
