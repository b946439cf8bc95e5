//! End-to-end tests over a real WebSocket connection.
//!
//! Each test binds the router to an ephemeral port and talks to `/ws` the
//! way a renderer would.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use encore_core::{EngineConfig, PageRegistry, PassContext, Result, Slider};
use encore_server::{AppState, SessionManager, create_router};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn squares(ctx: &mut PassContext) -> Result<()> {
    let x = ctx.slider(Slider::new("x").key("slider_key"))? as i64;
    ctx.text(format!("{} squared is {}", x, x * x))?;
    Ok(())
}

fn slow(ctx: &mut PassContext) -> Result<()> {
    for i in 0..2_000 {
        std::thread::sleep(Duration::from_millis(2));
        ctx.text(format!("line {}", i))?;
    }
    Ok(())
}

async fn start_server() -> SocketAddr {
    let mut registry = PageRegistry::new("squares", squares);
    registry.register("9_slow", slow).unwrap();
    let state = Arc::new(AppState {
        sessions: SessionManager::new(Arc::new(registry), EngineConfig::default()),
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr))
        .await
        .unwrap();
    client
}

async fn send(client: &mut Client, message: Value) {
    client.send(Message::Text(message.to_string())).await.unwrap();
}

/// Next server message, failing the test if none arrives within two seconds.
async fn recv(client: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("timed out waiting for a server message")
            .expect("connection closed")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

/// Skip messages until one of the given type arrives.
async fn recv_type(client: &mut Client, kind: &str) -> Value {
    loop {
        let message = recv(client).await;
        if message["type"] == kind {
            return message;
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_connect_runs_first_pass() {
    let addr = start_server().await;
    let mut client = connect(addr).await;

    let pages = recv(&mut client).await;
    assert_eq!(pages["type"], "page_list");
    assert_eq!(pages["current"], "squares");
    assert_eq!(pages["pages"].as_array().unwrap().len(), 2);

    assert_eq!(recv(&mut client).await, json!({ "type": "pass_started", "pass": 1 }));
    let done = recv(&mut client).await;
    assert_eq!(done["type"], "pass_completed");
    assert_eq!(done["pass"], 1);
    assert_eq!(done["page"], "squares");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_widget_update_reruns_page() {
    let addr = start_server().await;
    let mut client = connect(addr).await;
    recv_type(&mut client, "pass_completed").await;

    send(
        &mut client,
        json!({ "type": "widget_update", "widget_id": "slider_key", "value": 7 }),
    )
    .await;
    assert_eq!(recv(&mut client).await["type"], "pass_started");
    let done = recv(&mut client).await;
    assert_eq!(done["pass"], 2);
    let bodies: Vec<&Value> = done["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| &item["element"]["body"])
        .collect();
    assert!(bodies.contains(&&json!("7 squared is 49")), "items: {}", done["items"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_select_page_sends_page_list_then_pass() {
    let addr = start_server().await;
    let mut client = connect(addr).await;
    recv_type(&mut client, "pass_completed").await;

    send(&mut client, json!({ "type": "select_page", "page": "nowhere" })).await;
    assert_eq!(recv(&mut client).await["type"], "error");

    send(&mut client, json!({ "type": "select_page", "page": "slow" })).await;
    let pages = recv(&mut client).await;
    assert_eq!(pages["type"], "page_list");
    assert_eq!(pages["current"], "slow");
    assert_eq!(recv(&mut client).await["type"], "pass_started");

    send(&mut client, json!({ "type": "interrupt" })).await;
    assert_eq!(recv(&mut client).await["type"], "pass_failed");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_set_state_does_not_run_a_pass() {
    let addr = start_server().await;
    let mut client = connect(addr).await;
    recv_type(&mut client, "pass_completed").await;

    send(&mut client, json!({ "type": "set_state", "key": "name", "value": "Ada" })).await;
    send(&mut client, json!({ "type": "rerun" })).await;

    // The rerun is the second pass, so the write ran none of its own.
    assert_eq!(recv(&mut client).await, json!({ "type": "pass_started", "pass": 2 }));
    assert_eq!(recv(&mut client).await["type"], "pass_completed");

    send(&mut client, json!({ "type": "get_state" })).await;
    let state = recv(&mut client).await;
    assert_eq!(state["type"], "state");
    assert_eq!(state["store"]["name"], "Ada");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_state_and_interrupt_served_during_slow_pass() {
    let addr = start_server().await;
    let mut client = connect(addr).await;
    recv_type(&mut client, "pass_completed").await;

    send(&mut client, json!({ "type": "select_page", "page": "slow" })).await;
    recv_type(&mut client, "pass_started").await;

    send(&mut client, json!({ "type": "get_state" })).await;
    let state = recv(&mut client).await;
    assert_eq!(state["type"], "state");

    send(&mut client, json!({ "type": "list_pages" })).await;
    let pages = recv(&mut client).await;
    assert_eq!(pages["type"], "page_list");
    assert_eq!(pages["current"], "slow");

    send(&mut client, json!({ "type": "interrupt" })).await;
    let failed = recv(&mut client).await;
    assert_eq!(failed["type"], "pass_failed");
    assert_eq!(failed["page"], "slow");
    assert!(
        failed["error"].as_str().unwrap().contains("aborted"),
        "unexpected error: {}",
        failed["error"]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_malformed_message_reports_error() {
    let addr = start_server().await;
    let mut client = connect(addr).await;
    recv_type(&mut client, "pass_completed").await;

    client.send(Message::Text("not json".to_string())).await.unwrap();
    let error = recv(&mut client).await;
    assert_eq!(error["type"], "error");
    assert!(
        error["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid message format")
    );

    // The connection stays usable.
    send(&mut client, json!({ "type": "rerun" })).await;
    assert_eq!(recv(&mut client).await["type"], "pass_started");
}
