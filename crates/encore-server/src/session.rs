//! Session management.
//!
//! Every WebSocket connection owns one [`Session`]. Passes on a session are
//! queued: [`SessionHandle::trigger`] waits for the session lock (tokio's
//! mutex is fair, so waiters are served in arrival order) and then runs the
//! pass on the blocking pool.
//!
//! Reads (`store`, `page`, `page_list`) never touch that lock. They see the
//! [`SessionSnapshot`] published when the last pass or write finished, so a
//! renderer can ask for state while a long pass is still running.

use std::sync::Arc;

use encore_core::{AbortHandle, Engine, EngineConfig, PageRegistry, Session, SessionStore, Trigger};
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock, watch};
use uuid::Uuid;

use crate::error::{ServerError, ServerResult};
use crate::protocol::ServerMessage;

/// Creates, tracks and drops sessions.
pub struct SessionManager {
    registry: Arc<PageRegistry>,
    config: EngineConfig,
    sessions: RwLock<FxHashMap<String, SessionHandle>>,
}

impl SessionManager {
    pub fn new(registry: Arc<PageRegistry>, config: EngineConfig) -> Self {
        Self {
            registry,
            config,
            sessions: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn registry(&self) -> &Arc<PageRegistry> {
        &self.registry
    }

    /// Start a new session on the main page with an empty store.
    pub async fn create(&self) -> SessionHandle {
        let id = Uuid::new_v4().to_string();
        let abort = AbortHandle::new();
        let mut engine = Engine::new(self.config.clone());
        engine.set_abort_handle(abort.clone());

        let session = Session::new(id.clone(), &self.registry);
        let (snapshot, _) = watch::channel(SessionSnapshot::of(&session));

        let handle = SessionHandle {
            id: id.clone(),
            session: Arc::new(Mutex::new(session)),
            snapshot: Arc::new(snapshot),
            engine: Arc::new(engine),
            registry: self.registry.clone(),
            abort,
        };

        let mut sessions = self.sessions.write().await;
        sessions.insert(id.clone(), handle.clone());
        tracing::info!("Session {} created ({} active)", id, sessions.len());
        handle
    }

    pub async fn get(&self, id: &str) -> ServerResult<SessionHandle> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ServerError::SessionNotFound(id.to_string()))
    }

    /// Drop a session. Its store goes with it.
    pub async fn remove(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(id);
        if let Some(handle) = &removed {
            handle.interrupt();
            tracing::info!("Session {} closed ({} active)", id, sessions.len());
        }
        removed.is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// What a session looked like when its last pass or write finished.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub page: String,
    pub store: SessionStore,
    pub passes: u64,
}

impl SessionSnapshot {
    fn of(session: &Session) -> Self {
        Self {
            page: session.page().to_string(),
            store: session.store().clone(),
            passes: session.pass_count(),
        }
    }
}

/// Cloneable reference to one live session.
#[derive(Clone)]
pub struct SessionHandle {
    id: String,
    session: Arc<Mutex<Session>>,
    snapshot: Arc<watch::Sender<SessionSnapshot>>,
    engine: Arc<Engine>,
    registry: Arc<PageRegistry>,
    abort: AbortHandle,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Queue a pass and wait for its result.
    ///
    /// Returns `PassCompleted` or `PassFailed`. A failed pass is not an
    /// `Err`; errors are reserved for the pass task itself dying.
    pub async fn trigger(&self, trigger: Option<Trigger>) -> ServerResult<ServerMessage> {
        self.begin().await.run(trigger).await
    }

    /// Wait for the session to be free and claim it for the next pass.
    ///
    /// Interrupts sent after this returns reach the claimed pass.
    pub async fn begin(&self) -> PendingPass {
        let session = self.session.clone().lock_owned().await;

        // Nothing else runs on this session while we hold the lock, so an
        // interrupt aimed at an earlier pass must not leak into this one.
        self.abort.reset();

        PendingPass {
            pass: session.pass_count() + 1,
            session,
            engine: self.engine.clone(),
            registry: self.registry.clone(),
            snapshot: self.snapshot.clone(),
        }
    }

    /// Switch pages without running a pass.
    pub async fn select_page(&self, name: &str) -> ServerResult<()> {
        let mut session = self.session.lock().await;
        session.select_page(&self.registry, name)?;
        self.snapshot.send_replace(SessionSnapshot::of(&session));
        Ok(())
    }

    /// Write one store entry.
    pub async fn set_state(&self, key: impl Into<String>, value: Value) {
        let mut session = self.session.lock().await;
        session.store_mut().insert(key.into(), value);
        self.snapshot.send_replace(SessionSnapshot::of(&session));
    }

    /// Latest published state of the session.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Session store as of the last finished pass or write.
    pub fn store(&self) -> SessionStore {
        self.snapshot.borrow().store.clone()
    }

    /// Current page slug.
    pub fn page(&self) -> String {
        self.snapshot.borrow().page.clone()
    }

    /// Navigation list for this session.
    pub fn page_list(&self) -> ServerMessage {
        ServerMessage::PageList {
            pages: self.registry.summaries(),
            current: self.page(),
        }
    }

    /// Ask the pass in flight to stop at its next instruction.
    ///
    /// Takes no lock, so it works while a pass holds the session.
    pub fn interrupt(&self) {
        self.abort.abort();
    }
}

/// A pass that owns its session but has not started running.
pub struct PendingPass {
    pass: u64,
    session: OwnedMutexGuard<Session>,
    engine: Arc<Engine>,
    registry: Arc<PageRegistry>,
    snapshot: Arc<watch::Sender<SessionSnapshot>>,
}

impl PendingPass {
    /// Number this pass reports, starting at 1.
    pub fn number(&self) -> u64 {
        self.pass
    }

    /// Run the page on the blocking pool, then release the session.
    pub async fn run(self, trigger: Option<Trigger>) -> ServerResult<ServerMessage> {
        let Self {
            pass,
            mut session,
            engine,
            registry,
            snapshot,
        } = self;

        let message = tokio::task::spawn_blocking(move || {
            let message = match session.rerun(&engine, &registry, trigger.as_ref()) {
                Ok(output) => ServerMessage::completed(pass, output),
                Err(failure) => ServerMessage::failed(pass, &failure),
            };
            snapshot.send_replace(SessionSnapshot::of(&session));
            message
        })
        .await?;

        Ok(message)
    }
}
