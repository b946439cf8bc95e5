//! HTTP and WebSocket routes for the encore server.

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::{Html, IntoResponse, Json},
    routing::get,
};
use encore_core::{PageSummary, Trigger};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc};
use tower_http::cors::CorsLayer;

use crate::error::{ServerError, ServerResult};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::{SessionHandle, SessionManager};

type Sender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Jobs a connection may have waiting before new ones are refused.
pub const JOB_QUEUE_CAPACITY: usize = 64;

/// Application state shared across handlers.
pub struct AppState {
    /// Live sessions, one per WebSocket connection.
    pub sessions: SessionManager,
}

/// Work that must apply to a session in arrival order.
#[derive(Debug)]
enum Job {
    Pass(Option<Trigger>),
    SelectPage(String),
    SetState { key: String, value: Value },
}

/// Create the router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/api/pages", get(pages_handler))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Minimal landing page; real renderers talk to `/ws`.
async fn index_handler() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>encore</title>
    <style>
        body { font-family: system-ui, sans-serif; margin: 2rem; }
        h1 { color: #e11d48; }
        pre { background: #f3f4f6; padding: 1rem; border-radius: 0.5rem; }
    </style>
</head>
<body>
    <h1>encore</h1>
    <p>WebSocket endpoint: <code>/ws</code></p>
    <ul>
        <li><code>GET /health</code> - Health check</li>
        <li><code>GET /api/pages</code> - Page list</li>
    </ul>
    <pre id="log"></pre>
    <script>
        const log = document.getElementById('log');
        const ws = new WebSocket(`ws://${location.host}/ws`);
        ws.onmessage = (e) => { log.textContent += e.data + '\n'; };
    </script>
</body>
</html>"#,
    )
}

/// Health check handler.
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.sessions.len().await,
    }))
}

/// Navigation list.
async fn pages_handler(State(state): State<Arc<AppState>>) -> Json<Vec<PageSummary>> {
    Json(state.sessions.registry().summaries())
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_websocket(socket, state))
}

/// Handle one WebSocket connection for the lifetime of its session.
async fn handle_websocket(socket: WebSocket, state: Arc<AppState>) {
    let handle = state.sessions.create().await;
    let (sender, mut receiver) = socket.split();
    let sender: Sender = Arc::new(Mutex::new(sender));

    send_message(&sender, &handle.page_list()).await;

    // A single worker drains the queue, so jobs apply in arrival order.
    let (jobs, mut queue) = mpsc::channel::<Job>(JOB_QUEUE_CAPACITY);
    let worker = {
        let handle = handle.clone();
        let sender = sender.clone();
        tokio::spawn(async move {
            while let Some(job) = queue.recv().await {
                run_job(job, &handle, &sender).await;
            }
        })
    };

    if let Err(e) = enqueue(&jobs, Job::Pass(None)) {
        tracing::warn!("Session {} could not queue its first pass: {}", handle.id(), e);
    }

    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => handle_client_message(msg, &handle, &jobs, &sender).await,
                Err(e) => {
                    tracing::warn!("Failed to parse client message: {} (input: {})", e, text);
                    send_message(
                        &sender,
                        &ServerMessage::Error {
                            message: format!("Invalid message format: {}", e),
                        },
                    )
                    .await;
                }
            },
            Ok(Message::Close(_)) => break,
            Err(e) => {
                tracing::warn!("WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    drop(jobs);
    worker.abort();
    state.sessions.remove(handle.id()).await;
}

/// Send a server message through the WebSocket.
async fn send_message(sender: &Sender, msg: &ServerMessage) {
    match serde_json::to_string(msg) {
        Ok(json) => {
            let mut sender = sender.lock().await;
            let _ = sender.send(Message::Text(json.into())).await;
        }
        Err(e) => tracing::error!("Failed to serialize {} message: {}", msg.kind(), e),
    }
}

/// Handle a client message.
async fn handle_client_message(
    msg: ClientMessage,
    handle: &SessionHandle,
    jobs: &mpsc::Sender<Job>,
    sender: &Sender,
) {
    let job = match msg {
        ClientMessage::GetState => {
            let store = handle.store();
            send_message(sender, &ServerMessage::State { store }).await;
            return;
        }
        ClientMessage::ListPages => {
            send_message(sender, &handle.page_list()).await;
            return;
        }
        ClientMessage::Interrupt => {
            tracing::info!("Interrupt requested for session {}", handle.id());
            handle.interrupt();
            return;
        }
        ClientMessage::SelectPage { page } => Job::SelectPage(page),
        ClientMessage::WidgetUpdate { widget_id, value } => {
            Job::Pass(Some(Trigger::WidgetChanged { id: widget_id, value }))
        }
        ClientMessage::ButtonClick { widget_id } => {
            Job::Pass(Some(Trigger::ButtonClicked { id: widget_id }))
        }
        ClientMessage::SetState { key, value } => Job::SetState { key, value },
        ClientMessage::Rerun => Job::Pass(Some(Trigger::Reload)),
    };

    if let Err(e) = enqueue(jobs, job) {
        tracing::warn!("Session {} refused a job: {}", handle.id(), e);
        send_message(
            sender,
            &ServerMessage::Error {
                message: e.to_string(),
            },
        )
        .await;
    }
}

/// Queue a job without waiting for room, so the reader stays free to
/// handle `interrupt`.
fn enqueue(jobs: &mpsc::Sender<Job>, job: Job) -> ServerResult<()> {
    jobs.try_send(job).map_err(|e| match e {
        TrySendError::Full(_) => ServerError::QueueFull(JOB_QUEUE_CAPACITY),
        TrySendError::Closed(_) => ServerError::QueueClosed,
    })
}

async fn run_job(job: Job, handle: &SessionHandle, sender: &Sender) {
    match job {
        Job::Pass(trigger) => run_pass(trigger, handle, sender).await,
        Job::SelectPage(page) => match handle.select_page(&page).await {
            Ok(()) => {
                send_message(sender, &handle.page_list()).await;
                run_pass(None, handle, sender).await;
            }
            Err(e) => {
                tracing::warn!("Session {} cannot select page: {}", handle.id(), e);
                send_message(
                    sender,
                    &ServerMessage::Error {
                        message: e.to_string(),
                    },
                )
                .await;
            }
        },
        Job::SetState { key, value } => handle.set_state(key, value).await,
    }
}

async fn run_pass(trigger: Option<Trigger>, handle: &SessionHandle, sender: &Sender) {
    let pending = handle.begin().await;
    send_message(
        sender,
        &ServerMessage::PassStarted {
            pass: pending.number(),
        },
    )
    .await;

    match pending.run(trigger).await {
        Ok(message) => send_message(sender, &message).await,
        Err(e) => {
            tracing::error!("Pass task for session {} died: {}", handle.id(), e);
            send_message(
                sender,
                &ServerMessage::Error {
                    message: e.to_string(),
                },
            )
            .await;
        }
    }
}
