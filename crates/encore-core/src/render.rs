//! Conversion of plain values into display elements.
//!
//! [`PassContext::write`](crate::PassContext::write) accepts anything that
//! implements [`Render`], so page code can write strings, numbers, tables or
//! JSON without picking an element by hand.

use serde::Serialize;

use crate::element::{Element, Table};

/// Types that know how to display themselves.
///
/// # Example
///
/// ```rust
/// use encore_core::element::Element;
/// use encore_core::render::Render;
///
/// struct Squared(i64);
///
/// impl Render for Squared {
///     fn render(&self) -> Element {
///         Element::Text {
///             body: format!("{} squared is {}", self.0, self.0 * self.0),
///         }
///     }
/// }
///
/// assert_eq!(
///     Squared(5).render(),
///     Element::Text { body: "5 squared is 25".to_string() }
/// );
/// ```
pub trait Render {
    fn render(&self) -> Element;
}

// Strings are treated as markdown.

impl Render for str {
    fn render(&self) -> Element {
        Element::Markdown {
            body: self.to_string(),
        }
    }
}

impl Render for String {
    fn render(&self) -> Element {
        self.as_str().render()
    }
}

macro_rules! render_as_text {
    ($($t:ty),*) => {
        $(
            impl Render for $t {
                fn render(&self) -> Element {
                    Element::Text { body: self.to_string() }
                }
            }
        )*
    };
}

render_as_text!(i32, i64, u32, u64, usize, f32, f64, bool);

impl Render for Table {
    fn render(&self) -> Element {
        Element::DataFrame {
            table: self.clone(),
            highlight: Vec::new(),
        }
    }
}

impl<T: Render> Render for Option<T> {
    fn render(&self) -> Element {
        match self {
            Some(v) => v.render(),
            None => Element::Text {
                body: "None".to_string(),
            },
        }
    }
}

impl<T: Render + ?Sized> Render for &T {
    fn render(&self) -> Element {
        (**self).render()
    }
}

impl Render for serde_json::Value {
    fn render(&self) -> Element {
        Element::Code {
            body: serde_json::to_string_pretty(self).unwrap_or_else(|_| self.to_string()),
            language: Some("json".to_string()),
        }
    }
}

/// Convenience wrapper for types that implement Serialize.
///
/// Wrapping a value in `Json` renders it as formatted JSON.
#[derive(Debug, Clone)]
pub struct Json<T: Serialize>(pub T);

impl<T: Serialize + std::fmt::Debug> Render for Json<T> {
    fn render(&self) -> Element {
        Element::Code {
            body: serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| format!("{:?}", self.0)),
            language: Some("json".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_str_is_markdown() {
        assert_eq!(
            "## Layout".render(),
            Element::Markdown {
                body: "## Layout".to_string()
            }
        );
    }

    #[test]
    fn test_number_is_text() {
        assert_eq!(
            25i64.render(),
            Element::Text {
                body: "25".to_string()
            }
        );
    }

    #[test]
    fn test_table_is_dataframe() {
        let table = Table::from_rows(vec!["a".into()], vec![vec![1.0]]).unwrap();
        assert!(matches!(table.render(), Element::DataFrame { .. }));
    }

    #[test]
    fn test_none() {
        let value: Option<i32> = None;
        assert_eq!(value.render().render_text(), "None");
    }

    #[test]
    fn test_json_wrapper() {
        #[derive(Debug, Serialize)]
        struct Point {
            lat: f64,
        }
        match Json(Point { lat: 35.69 }).render() {
            Element::Code { body, language } => {
                assert!(body.contains("35.69"));
                assert_eq!(language.as_deref(), Some("json"));
            }
            other => panic!("unexpected element {other:?}"),
        }
        assert!(matches!(json!({"a": 1}).render(), Element::Code { .. }));
    }
}
