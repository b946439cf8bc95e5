//! Error types for encore-core.

use thiserror::Error;

/// Result type for encore-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in encore-core.
#[derive(Debug, Error)]
pub enum Error {
    /// Two widgets in the same pass resolved to the same id.
    #[error("duplicate widget id `{id}`: a {kind} with this id was already declared in this pass")]
    DuplicateWidgetId { id: String, kind: &'static str },

    /// Widget declaration is not usable (empty options, inverted bounds).
    #[error("invalid widget `{id}`: {message}")]
    InvalidWidget { id: String, message: String },

    /// Element cannot be rendered with the given data.
    #[error("invalid element: {0}")]
    InvalidElement(String),

    /// `set_page_config` was called twice or after other output.
    #[error("page config error: {0}")]
    PageConfig(String),

    /// Page not found in the registry.
    #[error("page not found: {0}")]
    PageNotFound(String),

    /// A pass produced more instructions than the engine allows.
    #[error("instruction limit of {0} exceeded")]
    InstructionLimit(usize),

    /// Error raised by the page body itself.
    #[error("page error: {0}")]
    Page(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Pass was aborted by host request.
    #[error("pass aborted")]
    Aborted,

    /// Invalid operation (e.g., updating a placeholder that does not exist).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

impl Error {
    /// Convenience constructor for errors raised from page code.
    pub fn page(message: impl Into<String>) -> Self {
        Error::Page(message.into())
    }

    /// Recovery hint for the user, if one applies.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Error::DuplicateWidgetId { .. } => {
                Some("give one of the widgets an explicit, unique key")
            }
            Error::PageConfig(_) => {
                Some("call set_page_config once, as the first statement of the page")
            }
            Error::PageNotFound(_) => Some("run `encore pages` to list available pages"),
            Error::InstructionLimit(_) => Some("raise the engine's max_instructions setting"),
            _ => None,
        }
    }

    /// Format the error together with its recovery hint.
    pub fn with_hint(&self) -> String {
        match self.hint() {
            Some(hint) => format!("{}\n  hint: {}", self, hint),
            None => self.to_string(),
        }
    }
}
