//! Display instructions emitted by a pass.
//!
//! A pass produces an ordered list of [`DisplayItem`]s. Each item pairs an
//! [`Element`] (what to draw) with the [`Container`] it was emitted into.
//! The renderer consumes the list as-is; ordering is source order.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::widgets::WidgetDef;

/// Where an element is placed on the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "area", rename_all = "snake_case")]
pub enum Container {
    /// Main page body.
    #[default]
    Main,
    /// Side navigation panel.
    Sidebar,
    /// One column of a horizontal split of the main body.
    Column {
        /// Zero-based column index.
        index: usize,
        /// Total number of columns in the split.
        of: usize,
    },
}

/// Page-level settings, set at most once per pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageConfig {
    /// Browser tab title.
    pub title: String,
    /// Browser tab icon (emoji or URL).
    pub icon: Option<String>,
}

/// Column-oriented table of JSON cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Column headers.
    pub columns: Vec<String>,
    /// Row-major cell values; every row has `columns.len()` cells.
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build a table from named columns of equal length.
    pub fn from_columns<V, I>(columns: I) -> Result<Self>
    where
        V: Into<Value>,
        I: IntoIterator<Item = (String, Vec<V>)>,
    {
        let mut names = Vec::new();
        let mut data: Vec<Vec<Value>> = Vec::new();
        for (name, values) in columns {
            names.push(name);
            data.push(values.into_iter().map(Into::into).collect());
        }

        let height = data.first().map_or(0, Vec::len);
        if let Some(pos) = data.iter().position(|col| col.len() != height) {
            return Err(Error::InvalidElement(format!(
                "column `{}` has {} values, expected {}",
                names[pos],
                data[pos].len(),
                height
            )));
        }

        let rows = (0..height)
            .map(|r| data.iter().map(|col| col[r].clone()).collect())
            .collect();

        Ok(Self {
            columns: names,
            rows,
        })
    }

    /// Build a table from numeric rows.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if let Some(bad) = rows.iter().find(|r| r.len() != columns.len()) {
            return Err(Error::InvalidElement(format!(
                "row has {} values, expected {}",
                bad.len(),
                columns.len()
            )));
        }

        Ok(Self {
            columns,
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(Value::from).collect())
                .collect(),
        })
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Check that every row has one cell per column.
    pub fn validate(&self) -> Result<()> {
        match self.rows.iter().position(|r| r.len() != self.columns.len()) {
            Some(pos) => Err(Error::InvalidElement(format!(
                "row {} has {} values, expected {}",
                pos,
                self.rows[pos].len(),
                self.columns.len()
            ))),
            None => Ok(()),
        }
    }

    /// Values of one column, top to bottom.
    ///
    /// `None` when the column is missing or a row is too short to hold it.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        self.rows.iter().map(|r| r.get(idx)).collect()
    }

    /// Row index of the largest numeric value in each column.
    ///
    /// Columns without numeric values yield `None`.
    pub fn column_maxima(&self) -> Vec<Option<usize>> {
        (0..self.columns.len())
            .map(|c| {
                self.rows
                    .iter()
                    .enumerate()
                    .filter_map(|(r, row)| row.get(c).and_then(Value::as_f64).map(|v| (r, v)))
                    .fold(None, |best: Option<(usize, f64)>, (r, v)| match best {
                        Some((_, b)) if b >= v => best,
                        _ => Some((r, v)),
                    })
                    .map(|(r, _)| r)
            })
            .collect()
    }
}

/// A single renderable unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    /// Markdown block.
    Markdown { body: String },
    /// Plain monospace-free text.
    Text { body: String },
    /// Section header.
    Header { body: String },
    /// LaTeX expression.
    Latex { body: String },
    /// Source code block.
    Code { body: String, language: Option<String> },
    /// Success notice.
    Success { body: String },
    /// Static table.
    Table { table: Table },
    /// Interactive data frame, optionally highlighting column maxima.
    DataFrame {
        table: Table,
        /// Row index to highlight per column (empty when highlighting is off).
        highlight: Vec<Option<usize>>,
    },
    /// Line chart, one series per column.
    LineChart { table: Table },
    /// Scatter map of `lat`/`lon` points.
    Map { table: Table },
    /// Progress bar, 0-100.
    Progress { value: u8 },
    /// Reserved slot with nothing in it yet.
    Empty,
    /// Interactive control.
    Widget { widget: WidgetDef },
}

impl Element {
    /// Short name used in logs and error positions.
    pub fn kind(&self) -> &'static str {
        match self {
            Element::Markdown { .. } => "markdown",
            Element::Text { .. } => "text",
            Element::Header { .. } => "header",
            Element::Latex { .. } => "latex",
            Element::Code { .. } => "code",
            Element::Success { .. } => "success",
            Element::Table { .. } => "table",
            Element::DataFrame { .. } => "data_frame",
            Element::LineChart { .. } => "line_chart",
            Element::Map { .. } => "map",
            Element::Progress { .. } => "progress",
            Element::Empty => "empty",
            Element::Widget { .. } => "widget",
        }
    }

    /// Plain-text rendering for terminals.
    pub fn render_text(&self) -> String {
        match self {
            Element::Markdown { body }
            | Element::Text { body }
            | Element::Latex { body }
            | Element::Success { body } => body.clone(),
            Element::Header { body } => format!("# {}", body),
            Element::Code { body, language } => format!(
                "```{}\n{}\n```",
                language.as_deref().unwrap_or_default(),
                body
            ),
            Element::Table { table } | Element::DataFrame { table, .. } => {
                format!("[table {}x{}: {}]", table.height(), table.columns.len(), table.columns.join(", "))
            }
            Element::LineChart { table } => {
                format!("[line chart: {} points x {}]", table.height(), table.columns.join(", "))
            }
            Element::Map { table } => format!("[map: {} points]", table.height()),
            Element::Progress { value } => format!("[progress {}%]", value),
            Element::Empty => String::new(),
            Element::Widget { widget } => widget.render_text(),
        }
    }
}

/// One entry of the display instruction stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayItem {
    /// Target area on the page.
    pub container: Container,
    /// What to draw.
    pub element: Element,
}

/// Handle to an item emitted earlier in the same pass.
///
/// Returned by [`PassContext::empty`](crate::PassContext::empty) and
/// [`PassContext::progress`](crate::PassContext::progress); pass it to
/// [`PassContext::update`](crate::PassContext::update) to replace the
/// element in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder {
    pub(crate) index: usize,
}

impl Placeholder {
    /// Position of the slot in the instruction stream.
    pub fn index(&self) -> usize {
        self.index
    }
}
