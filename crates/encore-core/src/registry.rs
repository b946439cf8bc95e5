//! Multi-page discovery.
//!
//! An app has one main page plus any number of sibling pages. Sibling pages
//! are named after their source file stem, `<N>_<snake_name>`: the optional
//! numeric prefix orders the navigation list and is stripped from the label,
//! underscores become spaces. `4_example_page` is listed as "example page".

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::engine::Page;
use crate::error::{Error, Result};

/// A registered page.
#[derive(Clone)]
pub struct PageEntry {
    /// URL-safe identifier (`example_page`).
    pub slug: String,
    /// Navigation label (`example page`).
    pub label: String,
    /// Ordering prefix taken from the file stem.
    pub order: Option<u32>,
    /// Whether this is the app's entry page.
    pub main: bool,
    page: Arc<dyn Page>,
}

impl PageEntry {
    /// The page body.
    pub fn page(&self) -> &dyn Page {
        self.page.as_ref()
    }

    pub fn summary(&self) -> PageSummary {
        PageSummary {
            slug: self.slug.clone(),
            label: self.label.clone(),
            main: self.main,
        }
    }
}

impl std::fmt::Debug for PageEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageEntry")
            .field("slug", &self.slug)
            .field("label", &self.label)
            .field("order", &self.order)
            .field("main", &self.main)
            .finish_non_exhaustive()
    }
}

/// Navigation entry sent to renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    pub slug: String,
    pub label: String,
    pub main: bool,
}

/// Split a page file stem into its ordering number and display label.
///
/// ```
/// use encore_core::registry::parse_page_name;
///
/// assert_eq!(parse_page_name("4_example_page"), (Some(4), "example page".to_string()));
/// assert_eq!(parse_page_name("pages/2 - Charts.rs"), (Some(2), "Charts".to_string()));
/// assert_eq!(parse_page_name("about"), (None, "about".to_string()));
/// ```
pub fn parse_page_name(file_name: &str) -> (Option<u32>, String) {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);

    let digits: String = stem.chars().take_while(char::is_ascii_digit).collect();
    let rest = stem[digits.len()..].trim_start_matches(['_', ' ', '-']);

    let order = digits.parse::<u32>().ok();
    let label = if rest.is_empty() {
        digits
    } else {
        rest.replace('_', " ")
    };
    (order, label.trim().to_string())
}

fn slugify(label: &str) -> String {
    label.trim().replace(' ', "_")
}

/// All pages of an app, main page first.
#[derive(Debug, Clone)]
pub struct PageRegistry {
    entries: Vec<PageEntry>,
}

impl PageRegistry {
    /// Create a registry around the app's main page.
    pub fn new(main_label: &str, page: impl Page + 'static) -> Self {
        Self {
            entries: vec![PageEntry {
                slug: slugify(main_label),
                label: main_label.to_string(),
                order: None,
                main: true,
                page: Arc::new(page),
            }],
        }
    }

    /// Register a sibling page under its file name.
    pub fn register(&mut self, file_name: &str, page: impl Page + 'static) -> Result<()> {
        let (order, label) = parse_page_name(file_name);
        if label.is_empty() {
            return Err(Error::InvalidOperation(format!(
                "page file `{}` has no usable name",
                file_name
            )));
        }

        let slug = slugify(&label);
        if self.entries.iter().any(|e| e.slug.eq_ignore_ascii_case(&slug)) {
            return Err(Error::InvalidOperation(format!(
                "page `{}` is registered twice",
                label
            )));
        }

        tracing::debug!("Registered page {} (order {:?})", label, order);
        self.entries.push(PageEntry {
            slug,
            label,
            order,
            main: false,
            page: Arc::new(page),
        });

        // Main page stays first; numbered pages before unnumbered ones.
        self.entries[1..].sort_by(|a, b| {
            let ka = (a.order.is_none(), a.order, a.label.to_lowercase());
            let kb = (b.order.is_none(), b.order, b.label.to_lowercase());
            ka.cmp(&kb)
        });
        Ok(())
    }

    /// The app's entry page.
    pub fn main(&self) -> &PageEntry {
        &self.entries[0]
    }

    /// Look a page up by slug or label, ignoring case.
    pub fn get(&self, name: &str) -> Option<&PageEntry> {
        let wanted = name.trim();
        self.entries.iter().find(|e| {
            e.slug.eq_ignore_ascii_case(wanted) || e.label.eq_ignore_ascii_case(wanted)
        })
    }

    /// Like [`get`](Self::get), but a missing page is an error.
    pub fn require(&self, name: &str) -> Result<&PageEntry> {
        self.get(name)
            .ok_or_else(|| Error::PageNotFound(name.to_string()))
    }

    /// Pages in navigation order.
    pub fn pages(&self) -> &[PageEntry] {
        &self.entries
    }

    pub fn summaries(&self) -> Vec<PageSummary> {
        self.entries.iter().map(PageEntry::summary).collect()
    }
}
