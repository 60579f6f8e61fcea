//! Dynamic values passed through capability dispatch.
//!
//! Operations are resolved by name at runtime, so their arguments and
//! results travel as [`Value`]s. Elements returned by a driver are plain
//! [`ElementHandle`] snapshots.

use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Element handle for DOM interactions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Unique identifier for the element
    pub id: String,
    /// Element tag name
    pub tag_name: String,
    /// Element text content
    pub text_content: Option<String>,
    /// Whether the element is currently displayed
    pub displayed: bool,
}

impl ElementHandle {
    /// Create a new, displayed element handle
    #[must_use]
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_name: tag_name.into(),
            text_content: None,
            displayed: true,
        }
    }

    /// Set the text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_content = Some(text.into());
        self
    }

    /// Set whether the element is displayed
    #[must_use]
    pub const fn with_displayed(mut self, displayed: bool) -> Self {
        self.displayed = displayed;
        self
    }

    /// Check if element is displayed
    #[must_use]
    pub const fn is_displayed(&self) -> bool {
        self.displayed
    }

    /// Text content, or empty if the element has none
    #[must_use]
    pub fn text(&self) -> &str {
        self.text_content.as_deref().unwrap_or_default()
    }
}

/// How an element is identified in a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum By {
    /// Unique element id
    #[default]
    Id,
    /// CSS selector
    Css,
    /// XPath expression
    XPath,
    /// Tag name
    TagName,
    /// `name` attribute
    Name,
    /// Class name
    ClassName,
    /// Exact link text
    LinkText,
}

impl By {
    /// Wire name of this identifier kind
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Css => "css",
            Self::XPath => "xpath",
            Self::TagName => "tag_name",
            Self::Name => "name",
            Self::ClassName => "class_name",
            Self::LinkText => "link_text",
        }
    }
}

impl fmt::Display for By {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for By {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(Self::Id),
            "css" => Ok(Self::Css),
            "xpath" => Ok(Self::XPath),
            "tag_name" => Ok(Self::TagName),
            "name" => Ok(Self::Name),
            "class_name" => Ok(Self::ClassName),
            "link_text" => Ok(Self::LinkText),
            other => Err(HarnessError::UnexpectedValue {
                expected: "identifier kind",
                found: other.to_string(),
            }),
        }
    }
}

/// Argument or result of a dispatched operation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// No value
    #[default]
    Unit,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Text
    Text(String),
    /// Single element
    Element(ElementHandle),
    /// Ordered element list
    Elements(Vec<ElementHandle>),
    /// Arbitrary JSON (script results)
    Json(serde_json::Value),
}

impl Value {
    /// Short name of the variant, used in error messages
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Text(_) => "text",
            Self::Element(_) => "element",
            Self::Elements(_) => "elements",
            Self::Json(_) => "json",
        }
    }

    /// Readiness predicate used by visibility-style waits.
    ///
    /// Elements must be displayed, element lists must be non-empty and fully
    /// displayed, text must be non-empty, and `Unit` is never ready.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        match self {
            Self::Unit => false,
            Self::Bool(b) => *b,
            Self::Int(_) | Self::Json(_) => true,
            Self::Text(s) => !s.is_empty(),
            Self::Element(e) => e.is_displayed(),
            Self::Elements(list) => !list.is_empty() && list.iter().all(ElementHandle::is_displayed),
        }
    }

    /// Borrow as text
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Read as integer
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Borrow as element
    #[must_use]
    pub const fn as_element(&self) -> Option<&ElementHandle> {
        match self {
            Self::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Convert into a single element
    pub fn into_element(self) -> HarnessResult<ElementHandle> {
        match self {
            Self::Element(e) => Ok(e),
            other => Err(HarnessError::UnexpectedValue {
                expected: "element",
                found: other.kind().to_string(),
            }),
        }
    }

    /// Convert into an ordered element list.
    ///
    /// A single element becomes a one-item list and `Unit` an empty one.
    pub fn into_elements(self) -> HarnessResult<Vec<ElementHandle>> {
        match self {
            Self::Elements(list) => Ok(list),
            Self::Element(e) => Ok(vec![e]),
            Self::Unit => Ok(Vec::new()),
            other => Err(HarnessError::UnexpectedValue {
                expected: "elements",
                found: other.kind().to_string(),
            }),
        }
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Self::Unit
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<By> for Value {
    fn from(by: By) -> Self {
        Self::Text(by.as_str().to_string())
    }
}

impl From<ElementHandle> for Value {
    fn from(e: ElementHandle) -> Self {
        Self::Element(e)
    }
}

impl From<Vec<ElementHandle>> for Value {
    fn from(list: Vec<ElementHandle>) -> Self {
        Self::Elements(list)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Self::Json(json)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Unit, Into::into)
    }
}
