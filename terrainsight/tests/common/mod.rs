//! In-process n8n stand-in for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures::StreamExt;
use serde_json::Value;
use tokio::net::TcpListener;

use terrainsight::config::DeliveryPolicy;

pub const WEBHOOK_PATH: &str = "/webhook-test/eco-action";

/// Answers 400 with a streamed body of [`OVERSIZED_CHUNKS`] x [`OVERSIZED_CHUNK_BYTES`].
pub const OVERSIZED_PATH: &str = "/webhook-test/oversized";
pub const OVERSIZED_CHUNKS: usize = 64;
pub const OVERSIZED_CHUNK_BYTES: usize = 1024 * 1024;

#[derive(Default)]
struct ReceiverState {
    /// Statuses to answer with, in order; 200 once exhausted.
    script: Mutex<VecDeque<(u16, String)>>,
    received: Mutex<Vec<Value>>,
    /// Chunks of the oversized body handed to the connection so far.
    chunks_streamed: Arc<AtomicUsize>,
}

/// A webhook endpoint listening on an ephemeral local port.
pub struct WebhookReceiver {
    pub addr: SocketAddr,
    state: Arc<ReceiverState>,
}

impl WebhookReceiver {
    pub async fn start() -> Self {
        Self::scripted(Vec::new()).await
    }

    /// Answer the first requests with `responses`, then 200.
    pub async fn scripted(responses: Vec<(u16, &str)>) -> Self {
        let state = Arc::new(ReceiverState {
            script: Mutex::new(
                responses
                    .into_iter()
                    .map(|(status, body)| (status, body.to_string()))
                    .collect(),
            ),
            received: Mutex::new(Vec::new()),
            chunks_streamed: Arc::new(AtomicUsize::new(0)),
        });

        let app = Router::new()
            .route(WEBHOOK_PATH, post(receive))
            .route(OVERSIZED_PATH, post(oversized))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind receiver");
        let addr = listener.local_addr().expect("Receiver has no local address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Receiver failed");
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}{}", self.addr, WEBHOOK_PATH)
    }

    pub fn oversized_url(&self) -> String {
        format!("http://{}{}", self.addr, OVERSIZED_PATH)
    }

    pub fn chunks_streamed(&self) -> usize {
        self.state.chunks_streamed.load(Ordering::SeqCst)
    }

    pub fn hits(&self) -> usize {
        self.state.received.lock().unwrap().len()
    }

    pub fn received(&self) -> Vec<Value> {
        self.state.received.lock().unwrap().clone()
    }
}

async fn receive(
    State(state): State<Arc<ReceiverState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    state.received.lock().unwrap().push(body);
    let (status, body) = state
        .script
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or((200, String::new()));
    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::OK),
        body,
    )
}

/// Chunks are produced lazily, so the counter tracks what the client pulled.
async fn oversized(State(state): State<Arc<ReceiverState>>) -> Response {
    let counter = state.chunks_streamed.clone();
    let stream = futures::stream::iter(0..OVERSIZED_CHUNKS).map(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok::<_, std::io::Error>(Bytes::from(vec![b'x'; OVERSIZED_CHUNK_BYTES]))
    });
    (StatusCode::BAD_REQUEST, Body::from_stream(stream)).into_response()
}

/// Short timings so retry tests stay fast.
pub fn fast_policy() -> DeliveryPolicy {
    DeliveryPolicy {
        timeout: Duration::from_secs(5),
        retry_delay: Duration::from_millis(20),
    }
}
