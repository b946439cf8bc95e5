//! One user session: a store, a selected page, and the last good output.

use crate::engine::{Engine, PassFailure, PassOutput, Trigger};
use crate::error::Result;
use crate::registry::PageRegistry;
use crate::store::SessionStore;

/// A logical user session.
///
/// Passes on one `Session` are sequential by construction (`&mut self`).
/// Callers that share a session across tasks must serialise access.
#[derive(Debug)]
pub struct Session {
    id: String,
    page: String,
    store: SessionStore,
    passes: u64,
    last_output: Option<PassOutput>,
}

impl Session {
    /// Create a session showing the registry's main page, with an empty store.
    pub fn new(id: impl Into<String>, registry: &PageRegistry) -> Self {
        Self::with_store(id, registry, SessionStore::new())
    }

    /// Create a session resuming a previously saved store.
    pub fn with_store(id: impl Into<String>, registry: &PageRegistry, store: SessionStore) -> Self {
        Self {
            id: id.into(),
            page: registry.main().slug.clone(),
            store,
            passes: 0,
            last_output: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Slug of the selected page.
    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Direct store access for renderer-reported values.
    pub fn store_mut(&mut self) -> &mut SessionStore {
        &mut self.store
    }

    /// Number of passes started in this session, including failed ones.
    pub fn pass_count(&self) -> u64 {
        self.passes
    }

    /// Output of the most recent successful pass.
    pub fn last_output(&self) -> Option<&PassOutput> {
        self.last_output.as_ref()
    }

    /// Switch to another page. The store is shared between pages.
    pub fn select_page(&mut self, registry: &PageRegistry, name: &str) -> Result<()> {
        let entry = registry.require(name)?;
        if entry.slug != self.page {
            tracing::debug!("Session {} switched to page {}", self.id, entry.slug);
            self.page = entry.slug.clone();
            self.last_output = None;
        }
        Ok(())
    }

    /// Run one pass of the selected page.
    ///
    /// On success the new output replaces the previous one. On failure the
    /// previous output is kept and the error is returned.
    pub fn rerun(
        &mut self,
        engine: &Engine,
        registry: &PageRegistry,
        trigger: Option<&Trigger>,
    ) -> std::result::Result<&PassOutput, PassFailure> {
        self.passes += 1;

        let entry = registry.require(&self.page).map_err(|error| PassFailure {
            page: self.page.clone(),
            position: 0,
            error,
        })?;

        let output = engine.run(&entry.slug, entry.page(), &mut self.store, trigger)?;
        Ok(self.last_output.insert(output))
    }

    /// Destroy all session state.
    pub fn reset(&mut self) {
        self.store.clear();
        self.last_output = None;
    }
}
