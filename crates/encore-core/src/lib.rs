//! Core engine for encore.
//!
//! This crate provides:
//! - The page re-execution engine (one pass = one top-to-bottom run)
//! - Per-session key-value state that survives across passes
//! - Widget declaration, id derivation and value resolution
//! - The display instruction stream consumed by renderers
//! - Multi-page discovery

pub mod context;
pub mod element;
pub mod engine;
pub mod error;
pub mod registry;
pub mod render;
pub mod session;
pub mod store;
pub mod widgets;

pub use context::{AbortHandle, PassContext};
pub use element::{Container, DisplayItem, Element, PageConfig, Placeholder, Table};
pub use engine::{Engine, EngineConfig, Page, PassFailure, PassOutput, Trigger};
pub use error::{Error, Result};
pub use registry::{PageEntry, PageRegistry, PageSummary};
pub use render::{Json, Render};
pub use session::Session;
pub use store::SessionStore;
pub use widgets::{Button, Checkbox, Choice, RangeSlider, Slider, TextInput, WidgetDef};
