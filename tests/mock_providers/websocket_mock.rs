//! WebSocket Mock Server for the Watson recognize interface
//!
//! Speaks the service side of `/v1/recognize`: waits for the `start`
//! message, answers `listening`, records audio frames and answers `stop`
//! with a final result followed by `listening` again.

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

/// How the mock service behaves on its single connection.
#[derive(Clone, Debug)]
pub struct MockBehavior {
    /// Delay between the `start` message and `listening`.
    pub listening_delay: Duration,
    /// Payloads pushed right after `listening`.
    pub greeting: Vec<String>,
    /// Send one interim result per received audio frame.
    pub interim_per_frame: bool,
    /// Answer `stop` with a final result and `listening`. When false the
    /// service stays silent after `stop`.
    pub answer_stop: bool,
    /// Drop the TCP connection (no close frame) after this many audio frames.
    pub drop_after_frames: Option<usize>,
    /// Reply to `start` with this error and close instead of listening.
    pub reject_with: Option<String>,
    /// Keep the connection open but never read again after `listening`.
    pub stop_reading_after_listening: bool,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            listening_delay: Duration::ZERO,
            greeting: Vec::new(),
            interim_per_frame: false,
            answer_stop: true,
            drop_after_frames: None,
            reject_with: None,
            stop_reading_after_listening: false,
        }
    }
}

/// What the mock observed from the client.
#[derive(Clone, Debug, Default)]
pub struct MockSession {
    pub request_uri: Option<String>,
    pub authorization: Option<String>,
    pub start_message: Option<Value>,
    pub audio: Vec<Vec<u8>>,
    pub stop_received: bool,
}

pub struct WatsonMockServer {
    pub url: String,
    session: Arc<Mutex<MockSession>>,
}

impl WatsonMockServer {
    /// Bind on an ephemeral port and serve one connection.
    pub async fn start(behavior: MockBehavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let session = Arc::new(Mutex::new(MockSession::default()));

        let recorded = session.clone();
        tokio::spawn(async move {
            if let Ok((stream, _)) = listener.accept().await {
                serve(stream, behavior, recorded).await;
            }
        });

        Self { url, session }
    }

    pub fn session(&self) -> MockSession {
        self.session.lock().unwrap().clone()
    }

    /// Poll the recorded session until `predicate` holds or two seconds pass.
    pub async fn wait_until<F>(&self, predicate: F) -> MockSession
    where
        F: Fn(&MockSession) -> bool,
    {
        for _ in 0..200 {
            let session = self.session();
            if predicate(&session) {
                return session;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.session()
    }
}

pub fn results_json(transcript: &str, is_final: bool) -> String {
    json!({
        "results": [{
            "final": is_final,
            "alternatives": [{"transcript": transcript, "confidence": 0.92}]
        }],
        "result_index": 0
    })
    .to_string()
}

async fn serve(
    stream: tokio::net::TcpStream,
    behavior: MockBehavior,
    session: Arc<Mutex<MockSession>>,
) {
    let handshake_session = session.clone();
    let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        let mut recorded = handshake_session.lock().unwrap();
        recorded.request_uri = Some(request.uri().to_string());
        recorded.authorization = request
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok(response)
    };

    let Ok(ws_stream) = accept_hdr_async(stream, callback).await else {
        return;
    };
    let (mut write, mut read) = ws_stream.split();

    // Wait for the start message
    while let Some(Ok(message)) = read.next().await {
        if let Message::Text(text) = message {
            let value: Value = serde_json::from_str(text.as_str()).unwrap_or(Value::Null);
            if value["action"] == "start" {
                session.lock().unwrap().start_message = Some(value);
                break;
            }
        }
    }

    if let Some(error) = &behavior.reject_with {
        let payload = json!({"error": error, "code": 400}).to_string();
        let _ = write.send(Message::Text(payload.into())).await;
        let _ = write.send(Message::Close(None)).await;
        return;
    }

    tokio::time::sleep(behavior.listening_delay).await;
    let listening = json!({"state": "listening"}).to_string();
    if write.send(Message::Text(listening.clone().into())).await.is_err() {
        return;
    }
    for payload in &behavior.greeting {
        let _ = write.send(Message::Text(payload.clone().into())).await;
    }

    if behavior.stop_reading_after_listening {
        // Both halves stay alive so the socket is neither read nor closed
        tokio::time::sleep(Duration::from_secs(60)).await;
        drop((write, read));
        return;
    }

    let mut frames = 0usize;
    while let Some(message) = read.next().await {
        match message {
            Ok(Message::Binary(data)) => {
                frames += 1;
                session.lock().unwrap().audio.push(data.to_vec());

                if behavior.drop_after_frames == Some(frames) {
                    return;
                }
                if behavior.interim_per_frame {
                    let payload = results_json(&format!("frame {frames}"), false);
                    let _ = write.send(Message::Text(payload.into())).await;
                }
            }
            Ok(Message::Text(text)) => {
                let value: Value = serde_json::from_str(text.as_str()).unwrap_or(Value::Null);
                if value["action"] == "stop" {
                    session.lock().unwrap().stop_received = true;
                    if behavior.answer_stop {
                        let payload = results_json("done", true);
                        let _ = write.send(Message::Text(payload.into())).await;
                        let _ = write.send(Message::Text(listening.clone().into())).await;
                    }
                }
            }
            Ok(Message::Close(_)) => {
                let _ = write.flush().await;
                break;
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }
}
