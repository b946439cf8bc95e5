//! Integration tests for session isolation and pass queueing.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use encore_core::{EngineConfig, PageRegistry, PassContext, Result, Slider, Trigger};
use encore_server::{AppState, ServerMessage, SessionManager, create_router};
use serde_json::{Value, json};
use tower::ServiceExt;

fn counter(ctx: &mut PassContext) -> Result<()> {
    let runs = ctx.state().get_as::<u64>("runs").unwrap_or(0) + 1;
    // Widen the window for overlapping passes, if the queue ever let them overlap.
    std::thread::sleep(Duration::from_millis(20));
    ctx.state_mut().set("runs", runs)?;
    let x = ctx.slider(Slider::new("x").key("slider_key"))? as i64;
    ctx.text(format!("run {} x {}", runs, x))?;
    Ok(())
}

fn slow(ctx: &mut PassContext) -> Result<()> {
    for i in 0..2_000 {
        std::thread::sleep(Duration::from_millis(2));
        ctx.text(format!("line {}", i))?;
    }
    Ok(())
}

fn manager() -> Arc<SessionManager> {
    let mut registry = PageRegistry::new("counter", counter);
    registry.register("9_slow", slow).unwrap();
    Arc::new(SessionManager::new(Arc::new(registry), EngineConfig::default()))
}

fn pass_number(message: &ServerMessage) -> u64 {
    match message {
        ServerMessage::PassCompleted { pass, .. } | ServerMessage::PassFailed { pass, .. } => *pass,
        other => panic!("unexpected message: {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_triggers_are_queued() {
    let manager = manager();
    let handle = manager.create().await;

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let handle = handle.clone();
            tokio::spawn(async move {
                handle
                    .trigger(Some(Trigger::WidgetChanged {
                        id: "slider_key".to_string(),
                        value: json!(i),
                    }))
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut passes = Vec::new();
    for task in tasks {
        passes.push(pass_number(&task.await.unwrap()));
    }
    passes.sort_unstable();

    // Every pass saw the store left by the one before it.
    assert_eq!(passes, (1..=8).collect::<Vec<u64>>());
    assert_eq!(handle.store().get("runs"), Some(&json!(8)));
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let manager = manager();
    let a = manager.create().await;
    let b = manager.create().await;
    assert_ne!(a.id(), b.id());

    a.set_state("name", json!("Ada")).await;
    a.trigger(None).await.unwrap();

    assert!(b.store().get("name").is_none());
    assert_eq!(a.store().get("name"), Some(&json!("Ada")));

    let message = b.trigger(None).await.unwrap();
    assert_eq!(pass_number(&message), 1);
}

#[tokio::test]
async fn test_removed_session_forgets_store() {
    let manager = manager();
    let handle = manager.create().await;
    handle.trigger(None).await.unwrap();

    assert!(manager.remove(handle.id()).await);
    assert!(!manager.remove(handle.id()).await);

    let fresh = manager.create().await;
    assert!(fresh.store().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_interrupt_stops_pass_in_flight() {
    let manager = manager();
    let handle = manager.create().await;
    handle.select_page("slow").await.unwrap();

    let running = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.trigger(None).await.unwrap() })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.interrupt();

    match running.await.unwrap() {
        ServerMessage::PassFailed { error, page, .. } => {
            assert_eq!(page, "slow");
            assert!(error.contains("aborted"), "unexpected error: {}", error);
        }
        other => panic!("unexpected message: {:?}", other),
    }

    // The session is still usable afterwards.
    handle.select_page("counter").await.unwrap();
    let message = handle.trigger(None).await.unwrap();
    assert!(matches!(message, ServerMessage::PassCompleted { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_state_readable_during_slow_pass() {
    let manager = manager();
    let handle = manager.create().await;
    handle.set_state("name", json!("Ada")).await;
    handle.select_page("slow").await.unwrap();

    let running = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.trigger(None).await.unwrap() })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let store = tokio::time::timeout(Duration::from_millis(100), async { handle.store() })
        .await
        .expect("store read waited for the pass");
    assert_eq!(store.get("name"), Some(&json!("Ada")));
    match handle.page_list() {
        ServerMessage::PageList { current, .. } => assert_eq!(current, "slow"),
        other => panic!("unexpected message: {:?}", other),
    }
    assert!(!running.is_finished());

    handle.interrupt();
    assert!(matches!(
        running.await.unwrap(),
        ServerMessage::PassFailed { .. }
    ));
}

#[tokio::test]
async fn test_http_routes() {
    let state = Arc::new(AppState {
        sessions: SessionManager::new(manager().registry().clone(), EngineConfig::default()),
    });
    let app = create_router(state);

    let response = app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let health: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["sessions"], 0);

    let response = app
        .oneshot(Request::get("/api/pages").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let pages: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        pages,
        json!([
            { "slug": "counter", "label": "counter", "main": true },
            { "slug": "slow", "label": "slow", "main": false },
        ])
    );
}
