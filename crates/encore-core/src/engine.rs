//! Page re-execution engine.
//!
//! One call to [`Engine::run`] is one pass: the page body runs top to bottom
//! against the session store and the ordered display instructions it emitted
//! are returned. A failing pass returns a [`PassFailure`] instead; its partial
//! output is discarded, but store writes made before the failure stay.
//!
//! ```text
//! Trigger ──► apply to SessionStore ──► PassContext ──► Page::run
//!                                            │
//!                  ┌─────────────────────────┴──────────────┐
//!                  ▼                                        ▼
//!         Ok: PassOutput (items, widgets)        Err: PassFailure (error, position)
//!                  │                                        │
//!                  └──────── store handed back ◄────────────┘
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::{AbortHandle, PassContext};
use crate::element::{DisplayItem, PageConfig};
use crate::error::{Error, Result};
use crate::store::SessionStore;
use crate::widgets::WidgetDef;

/// Seed used for page randomness unless configured otherwise.
pub const DEFAULT_SEED: u64 = 123;

/// Upper bound on instructions per pass.
pub const DEFAULT_MAX_INSTRUCTIONS: usize = 10_000;

/// A page body.
///
/// Any `Fn(&mut PassContext) -> Result<()>` closure or function is a page.
pub trait Page: Send + Sync {
    fn run(&self, ctx: &mut PassContext) -> Result<()>;
}

impl<F> Page for F
where
    F: Fn(&mut PassContext) -> Result<()> + Send + Sync,
{
    fn run(&self, ctx: &mut PassContext) -> Result<()> {
        self(ctx)
    }
}

/// Why a pass is being run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// The renderer reported a new value for a widget.
    WidgetChanged { id: String, value: Value },
    /// A button was clicked; it reads `true` for this pass only.
    ButtonClicked { id: String },
    /// Explicit reload with no state change.
    Reload,
}

/// Engine settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Seed for [`PassContext::rng`]; identical seeds give identical passes.
    pub seed: u64,
    /// Passes emitting more instructions than this fail.
    pub max_instructions: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            max_instructions: DEFAULT_MAX_INSTRUCTIONS,
        }
    }
}

/// Result of a successful pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassOutput {
    /// Page that was executed.
    pub page: String,
    /// Page settings, if the page set any.
    pub page_config: Option<PageConfig>,
    /// Display instructions in source order.
    pub items: Vec<DisplayItem>,
    /// Widgets declared during the pass, in source order.
    pub widgets: Vec<WidgetDef>,
    /// Wall-clock time of the pass.
    #[serde(skip)]
    pub duration: Duration,
}

/// A pass that did not complete.
#[derive(Debug, thiserror::Error)]
#[error("page `{page}` failed at instruction {position}: {error}")]
pub struct PassFailure {
    /// Page that was executed.
    pub page: String,
    /// Number of instructions emitted before the failure.
    pub position: usize,
    /// Underlying error.
    #[source]
    pub error: Error,
}

/// Runs passes. Stateless apart from its configuration.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
    abort_handle: Option<AbortHandle>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            abort_handle: None,
        }
    }

    /// Set the abort handle for cooperative cancellation.
    pub fn set_abort_handle(&mut self, handle: AbortHandle) {
        self.abort_handle = Some(handle);
    }

    /// Get the current abort handle.
    pub fn abort_handle(&self) -> Option<&AbortHandle> {
        self.abort_handle.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute one pass of `page` against `store`.
    ///
    /// A `WidgetChanged` trigger is written into the store before the page
    /// body starts.
    pub fn run(
        &self,
        name: &str,
        page: &dyn Page,
        store: &mut SessionStore,
        trigger: Option<&Trigger>,
    ) -> std::result::Result<PassOutput, PassFailure> {
        let start = Instant::now();

        let clicked = match trigger {
            Some(Trigger::WidgetChanged { id, value }) => {
                store.insert(id.clone(), value.clone());
                None
            }
            Some(Trigger::ButtonClicked { id }) => Some(id.clone()),
            Some(Trigger::Reload) | None => None,
        };

        let mut ctx = PassContext::new(
            name,
            std::mem::take(store),
            clicked,
            self.config.seed,
            self.config.max_instructions,
            self.abort_handle.clone(),
        );

        tracing::debug!("Pass started for page {} ({:?})", name, trigger);

        let result = match catch_unwind(AssertUnwindSafe(|| page.run(&mut ctx))) {
            Ok(result) => result,
            Err(payload) => Err(Error::Page(panic_message(payload.as_ref()))),
        };

        let position = ctx.position();
        let parts = ctx.into_parts();
        *store = parts.store;

        match result {
            Ok(()) => {
                let duration = start.elapsed();
                tracing::debug!(
                    "Pass completed for page {}: {} instructions, {} widgets in {:?}",
                    name,
                    parts.items.len(),
                    parts.widgets.len(),
                    duration
                );
                Ok(PassOutput {
                    page: name.to_string(),
                    page_config: parts.page_config,
                    items: parts.items,
                    widgets: parts.widgets,
                    duration,
                })
            }
            Err(error) => {
                tracing::warn!("Pass failed for page {} at instruction {}: {}", name, position, error);
                Err(PassFailure {
                    page: name.to_string(),
                    position,
                    error,
                })
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::widgets::Slider;
    use serde_json::json;

    fn squares(ctx: &mut PassContext) -> Result<()> {
        let x = ctx.slider(Slider::new("x").key("slider_key"))? as i64;
        ctx.text(format!("{} squared is {}", x, x * x))?;
        Ok(())
    }

    fn texts(output: &PassOutput) -> Vec<String> {
        output
            .items
            .iter()
            .filter_map(|item| match &item.element {
                Element::Text { body } => Some(body.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.seed, 123);
        assert_eq!(config.max_instructions, DEFAULT_MAX_INSTRUCTIONS);
    }

    #[test]
    fn test_widget_trigger_applied_before_pass() {
        let engine = Engine::default();
        let mut store = SessionStore::new();

        let first = engine.run("squares", &squares, &mut store, None).unwrap();
        assert_eq!(texts(&first), vec!["0 squared is 0"]);

        let trigger = Trigger::WidgetChanged {
            id: "slider_key".to_string(),
            value: json!(5),
        };
        let second = engine.run("squares", &squares, &mut store, Some(&trigger)).unwrap();
        assert_eq!(texts(&second), vec!["5 squared is 25"]);
        assert_eq!(store.get("slider_key"), Some(&json!(5)));
    }

    #[test]
    fn test_panic_becomes_failure() {
        let page = |ctx: &mut PassContext| -> Result<()> {
            ctx.state_mut().set("before", 1)?;
            ctx.text("partial")?;
            panic!("page exploded");
        };

        let mut store = SessionStore::new();
        let failure = Engine::default().run("boom", &page, &mut store, None).unwrap_err();
        assert_eq!(failure.position, 1);
        assert!(failure.error.to_string().contains("page exploded"));
        assert_eq!(store.get("before"), Some(&json!(1)));
    }

    #[test]
    fn test_aborted_engine_fails_pass() {
        let mut engine = Engine::default();
        let handle = AbortHandle::new();
        engine.set_abort_handle(handle.clone());
        handle.abort();

        let mut store = SessionStore::new();
        let failure = engine.run("squares", &squares, &mut store, None).unwrap_err();
        assert!(matches!(failure.error, Error::Aborted));
    }
}
