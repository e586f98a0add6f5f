use crate::crawler::{Document, Element, Job};

/// One value flowing through a job's chain
///
/// List payloads hand their items to `map`, `filter` and `each` as values, `replace`
/// receives the whole payload as a list of values, and `get` returns one.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<T> {
    /// Extracted text
    Text(String),

    /// A matched element
    Element(Element),

    /// A downloaded page
    Document(Document),

    /// A child job spawned by `click`
    Job(Job<T>),

    /// A caller-defined value
    Custom(T),

    /// A nested list of values
    List(Vec<Value<T>>),
}

impl<T> Value<T> {
    /// Returns a short name for the variant, used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Element(_) => "element",
            Self::Document(_) => "document",
            Self::Job(_) => "job",
            Self::Custom(_) => "custom",
            Self::List(_) => "list",
        }
    }

    /// Returns the text of a `Text` or `Element` value
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Element(element) => Some(element.text()),
            _ => None,
        }
    }

    /// Converts a `Job` value into the job handle
    pub fn into_job(self) -> Option<Job<T>> {
        match self {
            Self::Job(job) => Some(job),
            _ => None,
        }
    }

    /// Converts a `Custom` value into the caller's value
    pub fn into_custom(self) -> Option<T> {
        match self {
            Self::Custom(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> From<String> for Value<T> {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl<T> From<&str> for Value<T> {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl<T> From<Element> for Value<T> {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

impl<T> From<Vec<Value<T>>> for Value<T> {
    fn from(values: Vec<Value<T>>) -> Self {
        Self::List(values)
    }
}

/// Conversion from a reported value into a crawler's result type
///
/// `result()` and `report()` convert every reported value with this trait; a value
/// that converts to `None` fails the reporting step.
///
/// # Example
///
/// ```
/// use crawl_chain::{FromValue, Value};
///
/// #[derive(Clone)]
/// struct Package {
///     name: String,
/// }
///
/// impl FromValue for Package {
///     fn from_value(value: Value<Self>) -> Option<Self> {
///         value.into_custom()
///     }
/// }
/// ```
pub trait FromValue: Sized {
    fn from_value(value: Value<Self>) -> Option<Self>;
}

impl FromValue for String {
    fn from_value(value: Value<Self>) -> Option<Self> {
        match value {
            Value::Text(text) | Value::Custom(text) => Some(text),
            Value::Element(element) => Some(element.text().to_string()),
            Value::Document(document) => Some(document.html().to_string()),
            Value::Job(_) | Value::List(_) => None,
        }
    }
}
