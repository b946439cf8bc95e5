//! Explicit per-pass context handed to page code.
//!
//! Everything a page can do during a pass goes through [`PassContext`]:
//! emitting display instructions, declaring widgets, reading and writing
//! session state, and switching layout containers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::element::{Container, DisplayItem, Element, PageConfig, Placeholder, Table};
use crate::error::{Error, Result};
use crate::render::Render;
use crate::store::SessionStore;
use crate::widgets::{
    Button, Checkbox, Choice, RangeSlider, Slider, TextInput, Widget, WidgetDef, WidgetRegistry,
};

/// Handle for cooperative cancellation of a pass.
///
/// `AbortHandle` can be cloned and shared across threads; any clone can
/// trigger the abort, which the running pass observes at its next
/// instruction boundary.
///
/// # Example
///
/// ```
/// use encore_core::AbortHandle;
///
/// let handle = AbortHandle::new();
/// let handle_clone = handle.clone();
///
/// assert!(!handle.is_aborted());
/// handle_clone.abort();
/// assert!(handle.is_aborted());
/// ```
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    aborted: Arc<AtomicBool>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if abort has been requested.
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Relaxed)
    }

    /// Request abort of the running pass.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::Relaxed);
    }

    /// Reset the abort flag.
    ///
    /// Called before starting a new pass to clear any previous abort.
    pub fn reset(&self) {
        self.aborted.store(false, Ordering::Relaxed);
    }
}

/// State of one execution pass.
///
/// The context owns the session store for the duration of the pass; the
/// engine hands it back to the session when the pass ends, successfully or
/// not, so writes made before a failure are kept.
pub struct PassContext {
    page: String,
    store: SessionStore,
    registry: WidgetRegistry,
    items: Vec<DisplayItem>,
    container: Container,
    page_config: Option<PageConfig>,
    clicked: Option<String>,
    rng: StdRng,
    max_instructions: usize,
    abort: Option<AbortHandle>,
}

/// What a finished context hands back to the engine.
pub(crate) struct PassParts {
    pub store: SessionStore,
    pub items: Vec<DisplayItem>,
    pub widgets: Vec<WidgetDef>,
    pub page_config: Option<PageConfig>,
}

impl PassContext {
    pub(crate) fn new(
        page: &str,
        store: SessionStore,
        clicked: Option<String>,
        seed: u64,
        max_instructions: usize,
        abort: Option<AbortHandle>,
    ) -> Self {
        Self {
            page: page.to_string(),
            store,
            registry: WidgetRegistry::new(),
            items: Vec::new(),
            container: Container::Main,
            page_config: None,
            clicked,
            rng: StdRng::seed_from_u64(seed),
            max_instructions,
            abort,
        }
    }

    pub(crate) fn into_parts(mut self) -> PassParts {
        PassParts {
            widgets: self.registry.take_widgets(),
            store: self.store,
            items: self.items,
            page_config: self.page_config,
        }
    }

    /// Name of the page being executed.
    pub fn page_name(&self) -> &str {
        &self.page
    }

    /// Number of instructions emitted so far.
    pub fn position(&self) -> usize {
        self.items.len()
    }

    /// Container new instructions are placed into.
    pub fn container(&self) -> Container {
        self.container
    }

    /// Read access to the session store.
    pub fn state(&self) -> &SessionStore {
        &self.store
    }

    /// Write access to the session store.
    ///
    /// Writes are visible immediately and to every later pass.
    pub fn state_mut(&mut self) -> &mut SessionStore {
        &mut self.store
    }

    /// Deterministic random source, reseeded at the start of every pass.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Widgets declared so far in this pass.
    pub fn widgets(&self) -> &[WidgetDef] {
        self.registry.widgets()
    }

    /// Page-level settings, if set.
    pub fn page_config(&self) -> Option<&PageConfig> {
        self.page_config.as_ref()
    }

    /// Set the page title and icon.
    ///
    /// Must be the first statement of the page and may only run once.
    pub fn set_page_config(&mut self, title: impl Into<String>, icon: Option<&str>) -> Result<()> {
        if self.page_config.is_some() {
            return Err(Error::PageConfig("set_page_config called twice".to_string()));
        }
        if !self.items.is_empty() {
            return Err(Error::PageConfig(format!(
                "set_page_config must come first, {} instructions were already emitted",
                self.items.len()
            )));
        }

        self.page_config = Some(PageConfig {
            title: title.into(),
            icon: icon.map(str::to_string),
        });
        Ok(())
    }

    fn check_aborted(&self) -> Result<()> {
        if self.abort.as_ref().is_some_and(|h| h.is_aborted()) {
            return Err(Error::Aborted);
        }
        Ok(())
    }

    fn check_capacity(&self) -> Result<()> {
        self.check_aborted()?;
        if self.items.len() >= self.max_instructions {
            return Err(Error::InstructionLimit(self.max_instructions));
        }
        Ok(())
    }

    /// Append an element to the instruction stream.
    pub fn push(&mut self, element: Element) -> Result<Placeholder> {
        self.check_capacity()?;
        Ok(self.push_unchecked(element))
    }

    fn push_unchecked(&mut self, element: Element) -> Placeholder {
        let index = self.items.len();
        self.items.push(DisplayItem {
            container: self.container,
            element,
        });
        Placeholder { index }
    }

    /// Write any renderable value.
    pub fn write<R: Render + ?Sized>(&mut self, value: &R) -> Result<()> {
        self.push(value.render())?;
        Ok(())
    }

    pub fn markdown(&mut self, body: impl Into<String>) -> Result<()> {
        self.push(Element::Markdown { body: body.into() })?;
        Ok(())
    }

    pub fn text(&mut self, body: impl Into<String>) -> Result<()> {
        self.push(Element::Text { body: body.into() })?;
        Ok(())
    }

    pub fn header(&mut self, body: impl Into<String>) -> Result<()> {
        self.push(Element::Header { body: body.into() })?;
        Ok(())
    }

    pub fn latex(&mut self, body: impl Into<String>) -> Result<()> {
        self.push(Element::Latex { body: body.into() })?;
        Ok(())
    }

    pub fn code(&mut self, body: impl Into<String>, language: Option<&str>) -> Result<()> {
        self.push(Element::Code {
            body: body.into(),
            language: language.map(str::to_string),
        })?;
        Ok(())
    }

    pub fn success(&mut self, body: impl Into<String>) -> Result<()> {
        self.push(Element::Success { body: body.into() })?;
        Ok(())
    }

    pub fn table(&mut self, table: Table) -> Result<()> {
        table.validate()?;
        self.push(Element::Table { table })?;
        Ok(())
    }

    /// Interactive table; `highlight_max` marks the largest value per column.
    pub fn dataframe(&mut self, table: Table, highlight_max: bool) -> Result<()> {
        table.validate()?;
        let highlight = if highlight_max {
            table.column_maxima()
        } else {
            Vec::new()
        };
        self.push(Element::DataFrame { table, highlight })?;
        Ok(())
    }

    pub fn line_chart(&mut self, table: Table) -> Result<()> {
        table.validate()?;
        self.push(Element::LineChart { table })?;
        Ok(())
    }

    /// Scatter map; the table needs numeric `lat` and `lon` columns.
    pub fn map(&mut self, table: Table) -> Result<()> {
        table.validate()?;
        for name in ["lat", "lon"] {
            let column = table
                .column(name)
                .ok_or_else(|| Error::InvalidElement(format!("map data has no `{}` column", name)))?;
            if column.iter().any(|v| !v.is_number()) {
                return Err(Error::InvalidElement(format!(
                    "map column `{}` must be numeric",
                    name
                )));
            }
        }
        self.push(Element::Map { table })?;
        Ok(())
    }

    /// Reserve a slot to fill later with [`update`](Self::update).
    pub fn empty(&mut self) -> Result<Placeholder> {
        self.push(Element::Empty)
    }

    /// Progress bar; values above 100 are clamped.
    pub fn progress(&mut self, value: u8) -> Result<Placeholder> {
        self.push(Element::Progress {
            value: value.min(100),
        })
    }

    /// Replace the element held by a placeholder, keeping its position.
    ///
    /// Adds no instruction, so it never counts against the limit.
    pub fn update(&mut self, placeholder: Placeholder, element: Element) -> Result<()> {
        self.check_aborted()?;
        let element = match element {
            Element::Progress { value } => Element::Progress {
                value: value.min(100),
            },
            other => other,
        };
        let item = self.items.get_mut(placeholder.index).ok_or_else(|| {
            Error::InvalidOperation(format!("no placeholder at position {}", placeholder.index))
        })?;
        item.element = element;
        Ok(())
    }

    /// Declare any widget and return its resolved value.
    pub fn widget<W: Widget>(&mut self, widget: W) -> Result<W::Value> {
        self.check_capacity()?;
        let (value, def) = self
            .registry
            .declare(&widget, &mut self.store, self.clicked.as_deref())?;
        self.push_unchecked(Element::Widget { widget: def });
        Ok(value)
    }

    pub fn slider(&mut self, slider: Slider) -> Result<f64> {
        self.widget(slider)
    }

    pub fn range_slider(&mut self, slider: RangeSlider) -> Result<(f64, f64)> {
        self.widget(slider)
    }

    pub fn text_input(&mut self, input: TextInput) -> Result<String> {
        self.widget(input)
    }

    pub fn checkbox(&mut self, checkbox: Checkbox) -> Result<bool> {
        self.widget(checkbox)
    }

    pub fn selectbox(&mut self, choice: Choice) -> Result<String> {
        self.widget(choice)
    }

    pub fn radio(&mut self, choice: Choice) -> Result<String> {
        self.widget(choice)
    }

    pub fn button(&mut self, button: Button) -> Result<bool> {
        self.widget(button)
    }

    /// Run `f` with every instruction placed into `container`.
    ///
    /// The previous container is restored even when `f` fails.
    pub fn with_container<T>(
        &mut self,
        container: Container,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let previous = std::mem::replace(&mut self.container, container);
        let result = f(self);
        self.container = previous;
        result
    }

    /// Run `f` inside the sidebar.
    pub fn sidebar<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.with_container(Container::Sidebar, f)
    }

    /// Split the main body into `n` columns.
    pub fn columns(&self, n: usize) -> Result<Vec<Container>> {
        if n == 0 {
            return Err(Error::InvalidElement("columns needs at least one column".to_string()));
        }
        Ok((0..n).map(|index| Container::Column { index, of: n }).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> PassContext {
        PassContext::new("test", SessionStore::new(), None, 123, 1_000, None)
    }

    #[test]
    fn test_page_config_must_be_first() {
        let mut ctx = ctx();
        ctx.text("hello").unwrap();
        let err = ctx.set_page_config("Hello", None).unwrap_err();
        assert!(matches!(err, Error::PageConfig(_)));
    }

    #[test]
    fn test_page_config_only_once() {
        let mut ctx = ctx();
        ctx.set_page_config("Hello", Some("👋")).unwrap();
        assert!(ctx.set_page_config("Again", None).is_err());
        assert_eq!(ctx.page_config().unwrap().title, "Hello");
    }

    #[test]
    fn test_containers_tag_items() {
        let mut ctx = ctx();
        ctx.text("main").unwrap();
        ctx.sidebar(|ctx| ctx.success("side")).unwrap();
        let cols = ctx.columns(2).unwrap();
        ctx.with_container(cols[1], |ctx| ctx.text("right")).unwrap();
        ctx.text("main again").unwrap();

        let parts = ctx.into_parts();
        let containers: Vec<Container> = parts.items.iter().map(|i| i.container).collect();
        assert_eq!(
            containers,
            vec![
                Container::Main,
                Container::Sidebar,
                Container::Column { index: 1, of: 2 },
                Container::Main,
            ]
        );
    }

    #[test]
    fn test_container_restored_after_error() {
        let mut ctx = ctx();
        let result: Result<()> = ctx.sidebar(|_| Err(Error::page("boom")));
        assert!(result.is_err());
        assert_eq!(ctx.container(), Container::Main);
    }

    #[test]
    fn test_zero_columns_rejected() {
        assert!(ctx().columns(0).is_err());
    }

    #[test]
    fn test_placeholder_update_in_place() {
        let mut ctx = ctx();
        let slot = ctx.empty().unwrap();
        let bar = ctx.progress(0).unwrap();
        for i in 1..=100u8 {
            ctx.update(slot, Element::Text { body: format!("Iteration {}", i) }).unwrap();
            ctx.update(bar, Element::Progress { value: i }).unwrap();
        }

        let parts = ctx.into_parts();
        assert_eq!(parts.items.len(), 2);
        assert_eq!(parts.items[0].element, Element::Text { body: "Iteration 100".to_string() });
        assert_eq!(parts.items[1].element, Element::Progress { value: 100 });
    }

    #[test]
    fn test_update_unknown_placeholder() {
        let mut ctx = ctx();
        let err = ctx.update(Placeholder { index: 3 }, Element::Empty).unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));
    }

    #[test]
    fn test_map_requires_lat_lon() {
        let mut ctx = ctx();
        let table = Table::from_rows(vec!["x".into(), "y".into()], vec![vec![1.0, 2.0]]).unwrap();
        assert!(matches!(ctx.map(table), Err(Error::InvalidElement(_))));

        let table = Table::from_rows(vec!["lat".into(), "lon".into()], vec![vec![35.69, 139.70]]).unwrap();
        ctx.map(table).unwrap();
    }

    #[test]
    fn test_ragged_table_rejected() {
        let mut ctx = ctx();
        let table = Table {
            columns: vec!["a".to_string(), "b".to_string()],
            rows: vec![vec![serde_json::json!(1)]],
        };
        assert!(matches!(ctx.dataframe(table.clone(), true), Err(Error::InvalidElement(_))));
        assert!(matches!(ctx.map(table), Err(Error::InvalidElement(_))));
        assert_eq!(ctx.position(), 0);
    }

    #[test]
    fn test_instruction_limit() {
        let mut ctx = PassContext::new("test", SessionStore::new(), None, 0, 2, None);
        ctx.text("a").unwrap();
        ctx.text("b").unwrap();
        assert!(matches!(ctx.text("c"), Err(Error::InstructionLimit(2))));
    }

    #[test]
    fn test_update_at_exact_limit() {
        let mut ctx = PassContext::new("test", SessionStore::new(), None, 0, 2, None);
        let slot = ctx.empty().unwrap();
        ctx.text("b").unwrap();
        ctx.update(slot, Element::Text { body: "a".to_string() }).unwrap();
        assert_eq!(ctx.position(), 2);
        assert_eq!(ctx.items[0].element, Element::Text { body: "a".to_string() });
    }

    #[test]
    fn test_update_after_abort_fails() {
        let handle = AbortHandle::new();
        let mut ctx = PassContext::new("test", SessionStore::new(), None, 0, 10, Some(handle.clone()));
        let bar = ctx.progress(0).unwrap();
        handle.abort();
        assert!(matches!(
            ctx.update(bar, Element::Progress { value: 50 }),
            Err(Error::Aborted)
        ));
    }

    #[test]
    fn test_abort_stops_next_instruction() {
        let handle = AbortHandle::new();
        let mut ctx = PassContext::new("test", SessionStore::new(), None, 0, 10, Some(handle.clone()));
        ctx.text("before").unwrap();
        handle.abort();
        assert!(matches!(ctx.text("after"), Err(Error::Aborted)));
    }

    #[test]
    fn test_abort_handle_reset() {
        let handle = AbortHandle::new();
        handle.abort();
        assert!(handle.is_aborted());
        handle.reset();
        assert!(!handle.is_aborted());
    }

    #[test]
    fn test_widget_value_visible_through_state() {
        let mut ctx = ctx();
        let name = ctx.text_input(TextInput::new("Your name").key("name")).unwrap();
        assert_eq!(name, "");
        assert_eq!(ctx.state().get_as::<String>("name").as_deref(), Some(""));
    }
}
