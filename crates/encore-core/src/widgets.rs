//! Interactive widgets for encore pages.
//!
//! A widget is declared fresh on every pass. Its value lives in the
//! [`SessionStore`] under the widget id: the explicit key if one was given,
//! otherwise an id derived from the widget kind and label. Declaring a widget
//! reads the stored value (falling back to the declared default when the key
//! is missing or holds a value of the wrong shape) and writes the resolved
//! value back, so page code can also read it through the store.
//!
//! # Example
//!
//! ```rust
//! use encore_core::widgets::{Checkbox, Slider};
//! use encore_core::{Engine, PassContext, SessionStore};
//!
//! let page = |ctx: &mut PassContext| -> encore_core::Result<()> {
//!     let x = ctx.slider(Slider::new("x").key("slider_key"))? as i64;
//!     ctx.text(format!("{} squared is {}", x, x * x))?;
//!     if ctx.checkbox(Checkbox::new("show dataframe").key("show"))? {
//!         ctx.text("table goes here")?;
//!     }
//!     Ok(())
//! };
//!
//! let mut store = SessionStore::new();
//! let output = Engine::default().run("demo", &page, &mut store, None).unwrap();
//! assert_eq!(output.items.len(), 3);
//! ```

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::store::SessionStore;

/// Prefix of ids derived for widgets declared without an explicit key.
pub const AUTO_ID_PREFIX: &str = "$$widget-";

/// Widget definition sent to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WidgetDef {
    /// Numeric slider widget.
    Slider {
        id: String,
        label: String,
        min: f64,
        max: f64,
        step: f64,
        value: f64,
    },
    /// Two-handle slider selecting a range.
    RangeSlider {
        id: String,
        label: String,
        min: f64,
        max: f64,
        step: f64,
        value: (f64, f64),
    },
    /// Text input widget.
    TextInput {
        id: String,
        label: String,
        placeholder: String,
        value: String,
    },
    /// Dropdown select widget.
    Select {
        id: String,
        label: String,
        options: Vec<String>,
        /// Currently selected index.
        selected: usize,
    },
    /// Radio button group.
    Radio {
        id: String,
        label: String,
        options: Vec<String>,
        selected: usize,
    },
    /// Checkbox widget.
    Checkbox { id: String, label: String, value: bool },
    /// Push button; true only for the pass its click triggered.
    Button { id: String, label: String, clicked: bool },
}

impl WidgetDef {
    /// Get the widget ID.
    pub fn id(&self) -> &str {
        match self {
            WidgetDef::Slider { id, .. }
            | WidgetDef::RangeSlider { id, .. }
            | WidgetDef::TextInput { id, .. }
            | WidgetDef::Select { id, .. }
            | WidgetDef::Radio { id, .. }
            | WidgetDef::Checkbox { id, .. }
            | WidgetDef::Button { id, .. } => id,
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &str {
        match self {
            WidgetDef::Slider { label, .. }
            | WidgetDef::RangeSlider { label, .. }
            | WidgetDef::TextInput { label, .. }
            | WidgetDef::Select { label, .. }
            | WidgetDef::Radio { label, .. }
            | WidgetDef::Checkbox { label, .. }
            | WidgetDef::Button { label, .. } => label,
        }
    }

    /// One-line description for terminal output.
    pub fn render_text(&self) -> String {
        match self {
            WidgetDef::Slider { label, min, max, value, .. } => {
                format!("[slider] {}: {} ({}..{})", label, value, min, max)
            }
            WidgetDef::RangeSlider { label, value, .. } => {
                format!("[range] {}: {}..{}", label, value.0, value.1)
            }
            WidgetDef::TextInput { label, value, .. } => format!("[text] {}: {:?}", label, value),
            WidgetDef::Select { label, options, selected, .. }
            | WidgetDef::Radio { label, options, selected, .. } => format!(
                "[select] {}: {}",
                label,
                options.get(*selected).map(String::as_str).unwrap_or_default()
            ),
            WidgetDef::Checkbox { label, value, .. } => {
                format!("[{}] {}", if *value { "x" } else { " " }, label)
            }
            WidgetDef::Button { label, .. } => format!("[button] {}", label),
        }
    }
}

/// Compute the store id of a widget.
pub fn widget_id(kind: &str, label: &str, key: Option<&str>) -> String {
    match key {
        Some(key) => key.to_string(),
        None => format!("{}{}-{}", AUTO_ID_PREFIX, kind, label),
    }
}

/// A widget declaration that can be resolved against the session store.
pub trait Widget {
    /// Value handed back to the page body.
    type Value;

    /// Kind name used for derived ids and error messages.
    fn kind(&self) -> &'static str;

    /// Buttons read their value from the click that triggered the pass.
    fn is_button(&self) -> bool {
        false
    }

    fn label(&self) -> &str;

    fn key(&self) -> Option<&str>;

    /// Reject declarations that cannot produce a value.
    fn validate(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    /// Resolve the current value from what the store holds, if anything.
    fn resolve(&self, stored: Option<&Value>) -> Self::Value;

    /// Encode a resolved value for the store.
    fn encode(&self, value: &Self::Value) -> Value;

    /// Describe the widget for the renderer.
    fn describe(&self, id: String, value: &Self::Value) -> WidgetDef;
}

/// Numeric slider. Defaults to the 0..100 range, step 1, value 0.
#[derive(Debug, Clone)]
pub struct Slider {
    label: String,
    key: Option<String>,
    min: f64,
    max: f64,
    step: f64,
    default: f64,
}

impl Slider {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            key: None,
            min: 0.0,
            max: 100.0,
            step: 1.0,
            default: 0.0,
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    pub fn default_value(mut self, value: f64) -> Self {
        self.default = value;
        self
    }
}

fn check_bounds(id: &str, min: f64, max: f64, step: f64) -> Result<()> {
    if !(min <= max) {
        return Err(Error::InvalidWidget {
            id: id.to_string(),
            message: format!("min {} is greater than max {}", min, max),
        });
    }
    if !(step > 0.0) {
        return Err(Error::InvalidWidget {
            id: id.to_string(),
            message: format!("step must be positive, got {}", step),
        });
    }
    Ok(())
}

impl Widget for Slider {
    type Value = f64;

    fn kind(&self) -> &'static str {
        "slider"
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    fn validate(&self, id: &str) -> Result<()> {
        check_bounds(id, self.min, self.max, self.step)
    }

    fn resolve(&self, stored: Option<&Value>) -> f64 {
        stored
            .and_then(Value::as_f64)
            .unwrap_or(self.default)
            .clamp(self.min, self.max)
    }

    fn encode(&self, value: &f64) -> Value {
        // Whole numbers stay integers so `{"x": 5}` round-trips unchanged.
        if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            Value::from(*value as i64)
        } else {
            Value::from(*value)
        }
    }

    fn describe(&self, id: String, value: &f64) -> WidgetDef {
        WidgetDef::Slider {
            id,
            label: self.label.clone(),
            min: self.min,
            max: self.max,
            step: self.step,
            value: *value,
        }
    }
}

/// Two-handle slider returning `(low, high)`.
#[derive(Debug, Clone)]
pub struct RangeSlider {
    label: String,
    key: Option<String>,
    min: f64,
    max: f64,
    step: f64,
    default: (f64, f64),
}

impl RangeSlider {
    pub fn new(label: impl Into<String>, min: f64, max: f64, default: (f64, f64)) -> Self {
        Self {
            label: label.into(),
            key: None,
            min,
            max,
            step: 1.0,
            default,
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }
}

impl Widget for RangeSlider {
    type Value = (f64, f64);

    fn kind(&self) -> &'static str {
        "range_slider"
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    fn validate(&self, id: &str) -> Result<()> {
        check_bounds(id, self.min, self.max, self.step)
    }

    fn resolve(&self, stored: Option<&Value>) -> (f64, f64) {
        let (lo, hi) = stored
            .and_then(Value::as_array)
            .and_then(|pair| match pair.as_slice() {
                [lo, hi] => Some((lo.as_f64()?, hi.as_f64()?)),
                _ => None,
            })
            .unwrap_or(self.default);

        let lo = lo.clamp(self.min, self.max);
        let hi = hi.clamp(self.min, self.max);
        if lo <= hi { (lo, hi) } else { (hi, lo) }
    }

    fn encode(&self, value: &(f64, f64)) -> Value {
        Value::from(vec![value.0, value.1])
    }

    fn describe(&self, id: String, value: &(f64, f64)) -> WidgetDef {
        WidgetDef::RangeSlider {
            id,
            label: self.label.clone(),
            min: self.min,
            max: self.max,
            step: self.step,
            value: *value,
        }
    }
}

/// Single-line text input. Defaults to an empty string.
#[derive(Debug, Clone)]
pub struct TextInput {
    label: String,
    key: Option<String>,
    placeholder: String,
    default: String,
}

impl TextInput {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            key: None,
            placeholder: String::new(),
            default: String::new(),
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = value.into();
        self
    }
}

impl Widget for TextInput {
    type Value = String;

    fn kind(&self) -> &'static str {
        "text_input"
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    fn resolve(&self, stored: Option<&Value>) -> String {
        stored
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.default.clone())
    }

    fn encode(&self, value: &String) -> Value {
        Value::from(value.as_str())
    }

    fn describe(&self, id: String, value: &String) -> WidgetDef {
        WidgetDef::TextInput {
            id,
            label: self.label.clone(),
            placeholder: self.placeholder.clone(),
            value: value.clone(),
        }
    }
}

/// Checkbox. Defaults to unchecked.
#[derive(Debug, Clone)]
pub struct Checkbox {
    label: String,
    key: Option<String>,
    default: bool,
}

impl Checkbox {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            key: None,
            default: false,
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn default_value(mut self, value: bool) -> Self {
        self.default = value;
        self
    }
}

impl Widget for Checkbox {
    type Value = bool;

    fn kind(&self) -> &'static str {
        "checkbox"
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    fn resolve(&self, stored: Option<&Value>) -> bool {
        stored.and_then(Value::as_bool).unwrap_or(self.default)
    }

    fn encode(&self, value: &bool) -> Value {
        Value::from(*value)
    }

    fn describe(&self, id: String, value: &bool) -> WidgetDef {
        WidgetDef::Checkbox {
            id,
            label: self.label.clone(),
            value: *value,
        }
    }
}

/// Single choice out of a list of options, shown as a dropdown or radio group.
///
/// The store holds the selected option text; a numeric index is also accepted.
#[derive(Debug, Clone)]
pub struct Choice {
    label: String,
    key: Option<String>,
    options: Vec<String>,
    default: usize,
    radio: bool,
}

impl Choice {
    /// Dropdown select.
    pub fn select<S: ToString>(label: impl Into<String>, options: &[S]) -> Self {
        Self {
            label: label.into(),
            key: None,
            options: options.iter().map(ToString::to_string).collect(),
            default: 0,
            radio: false,
        }
    }

    /// Radio button group.
    pub fn radio<S: ToString>(label: impl Into<String>, options: &[S]) -> Self {
        Self {
            radio: true,
            ..Self::select(label, options)
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Index of the default selection (0-based).
    pub fn default_index(mut self, index: usize) -> Self {
        self.default = index;
        self
    }

    fn selected_index(&self, stored: Option<&Value>) -> usize {
        let from_store = stored.and_then(|v| match v {
            Value::String(s) => self.options.iter().position(|o| o == s),
            // An option whose text is the number wins over reading it as an index.
            Value::Number(n) => {
                let text = n.to_string();
                self.options
                    .iter()
                    .position(|o| *o == text)
                    .or_else(|| n.as_u64().map(|i| i as usize))
            }
            _ => None,
        });
        from_store
            .unwrap_or(self.default)
            .min(self.options.len().saturating_sub(1))
    }
}

impl Widget for Choice {
    type Value = String;

    fn kind(&self) -> &'static str {
        if self.radio { "radio" } else { "select" }
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    fn validate(&self, id: &str) -> Result<()> {
        if self.options.is_empty() {
            return Err(Error::InvalidWidget {
                id: id.to_string(),
                message: "no options to choose from".to_string(),
            });
        }
        Ok(())
    }

    fn resolve(&self, stored: Option<&Value>) -> String {
        self.options
            .get(self.selected_index(stored))
            .cloned()
            .unwrap_or_default()
    }

    fn encode(&self, value: &String) -> Value {
        Value::from(value.as_str())
    }

    fn describe(&self, id: String, value: &String) -> WidgetDef {
        let selected = self
            .options
            .iter()
            .position(|o| o == value)
            .unwrap_or_default();
        let label = self.label.clone();
        let options = self.options.clone();
        if self.radio {
            WidgetDef::Radio {
                id,
                label,
                options,
                selected,
            }
        } else {
            WidgetDef::Select {
                id,
                label,
                options,
                selected,
            }
        }
    }
}

/// Push button.
///
/// A button has no persistent value: it reads `true` only during the pass
/// triggered by its click.
#[derive(Debug, Clone)]
pub struct Button {
    label: String,
    key: Option<String>,
}

impl Button {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            key: None,
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

impl Widget for Button {
    type Value = bool;

    fn kind(&self) -> &'static str {
        "button"
    }

    fn is_button(&self) -> bool {
        true
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    fn resolve(&self, stored: Option<&Value>) -> bool {
        stored.and_then(Value::as_bool).unwrap_or(false)
    }

    fn encode(&self, value: &bool) -> Value {
        Value::from(*value)
    }

    fn describe(&self, id: String, value: &bool) -> WidgetDef {
        WidgetDef::Button {
            id,
            label: self.label.clone(),
            clicked: *value,
        }
    }
}

/// Widgets declared during one pass.
#[derive(Debug, Default)]
pub struct WidgetRegistry {
    /// Widget id -> kind of the widget that claimed it.
    seen: FxHashMap<String, &'static str>,
    /// Declared widgets in source order.
    widgets: Vec<WidgetDef>,
}

impl WidgetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a widget: check its id, resolve its value, write it back.
    ///
    /// `clicked` is the id of the button whose click triggered this pass.
    /// The store is not touched when the declaration is rejected.
    pub fn declare<W: Widget>(
        &mut self,
        widget: &W,
        store: &mut SessionStore,
        clicked: Option<&str>,
    ) -> Result<(W::Value, WidgetDef)> {
        let id = widget_id(widget.kind(), widget.label(), widget.key());

        if let Some(&kind) = self.seen.get(&id) {
            return Err(Error::DuplicateWidgetId { id, kind });
        }
        widget.validate(&id)?;

        let value = if widget.is_button() {
            widget.resolve(Some(&Value::Bool(clicked == Some(id.as_str()))))
        } else {
            widget.resolve(store.get(&id))
        };

        store.insert(id.clone(), widget.encode(&value));
        self.seen.insert(id.clone(), widget.kind());

        let def = widget.describe(id, &value);
        self.widgets.push(def.clone());
        Ok((value, def))
    }

    /// Widgets declared so far, in source order.
    pub fn widgets(&self) -> &[WidgetDef] {
        &self.widgets
    }

    /// Take all registered widgets.
    pub fn take_widgets(&mut self) -> Vec<WidgetDef> {
        std::mem::take(&mut self.widgets)
    }
}
