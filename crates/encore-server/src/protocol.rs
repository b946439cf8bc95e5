//! WebSocket protocol messages for the encore server.
//!
//! Defines the message types exchanged between a renderer and its session.

use encore_core::{
    DisplayItem, PageConfig, PageSummary, PassFailure, PassOutput, SessionStore, WidgetDef,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Request the current session store.
    GetState,

    /// Request the navigation list.
    ListPages,

    /// Switch the session to another page and run it.
    SelectPage {
        /// Page slug or label.
        page: String,
    },

    /// A widget reported a new value.
    WidgetUpdate {
        /// Widget id (explicit key or derived id).
        widget_id: String,
        /// New widget value.
        value: Value,
    },

    /// A button was clicked.
    ButtonClick {
        /// Button id.
        widget_id: String,
    },

    /// Write a store entry directly, without running a pass.
    SetState {
        key: String,
        value: Value,
    },

    /// Run the current page again.
    Rerun,

    /// Stop the pass in flight at its next instruction.
    Interrupt,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Pages available in this app.
    PageList {
        /// Pages in navigation order.
        pages: Vec<PageSummary>,
        /// Slug of the session's current page.
        current: String,
    },

    /// A pass was dequeued and is running.
    PassStarted {
        /// Pass number within the session, starting at 1.
        pass: u64,
    },

    /// A pass completed; `items` replaces whatever the client shows.
    PassCompleted {
        /// Page that ran.
        page: String,
        /// Pass number within the session.
        pass: u64,
        /// Page settings, if the page set any.
        page_config: Option<PageConfig>,
        /// Display instructions in source order.
        items: Vec<DisplayItem>,
        /// Widgets declared during the pass.
        widgets: Vec<WidgetDef>,
        /// Execution time in milliseconds.
        duration_ms: u64,
    },

    /// A pass failed; the client keeps its previous output.
    PassFailed {
        /// Page that ran.
        page: String,
        /// Pass number within the session.
        pass: u64,
        /// Error message.
        error: String,
        /// Number of instructions emitted before the failure.
        position: usize,
    },

    /// Snapshot of the session store.
    State {
        store: SessionStore,
    },

    /// Request-level error (bad message, unknown page).
    Error {
        message: String,
    },
}

impl ServerMessage {
    /// Build the completion message for a successful pass.
    pub fn completed(pass: u64, output: &PassOutput) -> Self {
        Self::PassCompleted {
            page: output.page.clone(),
            pass,
            page_config: output.page_config.clone(),
            items: output.items.clone(),
            widgets: output.widgets.clone(),
            duration_ms: output.duration.as_millis() as u64,
        }
    }

    /// Build the failure message for a failed pass.
    pub fn failed(pass: u64, failure: &PassFailure) -> Self {
        Self::PassFailed {
            page: failure.page.clone(),
            pass,
            error: failure.error.with_hint(),
            position: failure.position,
        }
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PageList { .. } => "page_list",
            Self::PassStarted { .. } => "pass_started",
            Self::PassCompleted { .. } => "pass_completed",
            Self::PassFailed { .. } => "pass_failed",
            Self::State { .. } => "state",
            Self::Error { .. } => "error",
        }
    }
}
