//! The payload a job carries between steps and its transition table
//!
//! | Current       | Operation      | Next                     |
//! |---------------|----------------|--------------------------|
//! | Document      | `find`         | Elements                 |
//! | Elements      | `text_content` | Strings                  |
//! | Elements      | `attr`         | Strings                  |
//! | Elements      | `click`        | Jobs (handled by the job) |
//! | Strings       | `resolve`      | Strings                  |
//! | any list      | `map`          | inferred from the output |
//! | any list      | `filter`       | unchanged                |
//! | any           | `replace`      | inferred from the output |
//!
//! Every transition checks its precondition before touching the payload, so a failed
//! step leaves the previous payload in place.

use super::{ResultKind, Value};
use crate::crawler::{Document, Element, Job};
use crate::url::resolve_url;
use crate::{JobError, JobResult};

/// The current value of a job, tagged by its result kind
#[derive(Debug, Clone, PartialEq)]
pub enum Payload<T> {
    Empty,
    Document(Document),
    Elements(Vec<Element>),
    Strings(Vec<String>),
    Jobs(Vec<Job<T>>),
    Custom(Value<T>),
}

impl<T> Default for Payload<T> {
    fn default() -> Self {
        Self::Empty
    }
}

impl<T> Payload<T> {
    /// Returns the result kind of this payload
    pub fn kind(&self) -> ResultKind {
        match self {
            Self::Empty => ResultKind::Empty,
            Self::Document(_) => ResultKind::Document,
            Self::Elements(_) => ResultKind::Elements,
            Self::Strings(_) => ResultKind::Strings,
            Self::Jobs(_) => ResultKind::Jobs,
            Self::Custom(_) => ResultKind::Custom,
        }
    }

    /// Returns true if the payload is a list of values
    pub fn is_list(&self) -> bool {
        self.kind().is_list() || matches!(self, Self::Custom(Value::List(_)))
    }

    /// Builds a payload from a single value, inferring its kind
    ///
    /// Lists are inferred as in [`Payload::from_values`], a lone element becomes an
    /// element set of one, and anything else is custom.
    pub fn from_value(value: Value<T>) -> Self {
        match value {
            Value::List(values) => Self::from_values(values),
            Value::Element(element) => Self::Elements(vec![element]),
            other => Self::Custom(other),
        }
    }

    /// Builds a payload from a list of values, inferring its kind
    ///
    /// All text becomes a string list (including the empty list), all elements become an
    /// element set, and any other mix is a custom list.
    pub fn from_values(values: Vec<Value<T>>) -> Self {
        if values.iter().all(|value| matches!(value, Value::Text(_))) {
            Self::Strings(texts(values))
        } else if values.iter().all(|value| matches!(value, Value::Element(_))) {
            Self::Elements(elements(values))
        } else {
            Self::Custom(Value::List(values))
        }
    }

    /// Coerces the payload into a list of values
    pub fn into_values(self) -> Vec<Value<T>> {
        match self {
            Self::Empty => Vec::new(),
            Self::Document(document) => vec![Value::Document(document)],
            Self::Elements(elements) => elements.into_iter().map(Value::Element).collect(),
            Self::Strings(strings) => strings.into_iter().map(Value::Text).collect(),
            Self::Jobs(jobs) => jobs.into_iter().map(Value::Job).collect(),
            Self::Custom(Value::List(values)) => values,
            Self::Custom(value) => vec![value],
        }
    }

    /// Runs a CSS selector against the downloaded document
    pub fn find(&mut self, selector: &str) -> JobResult<()> {
        let elements = match &*self {
            Self::Document(document) => document.select(selector)?,
            other => return Err(other.state_error("find", ResultKind::Document.as_str())),
        };

        *self = Self::Elements(elements);
        Ok(())
    }

    /// Replaces matched elements with their text content
    pub fn text_content(&mut self) -> JobResult<()> {
        let strings = match &*self {
            Self::Elements(elements) => elements
                .iter()
                .map(|element| element.text().to_string())
                .collect(),
            other => {
                return Err(other.state_error("text_content", ResultKind::Elements.as_str()))
            }
        };

        *self = Self::Strings(strings);
        Ok(())
    }

    /// Replaces matched elements with the value of attribute `name`
    ///
    /// Elements without the attribute are dropped.
    pub fn attr(&mut self, name: &str) -> JobResult<()> {
        let strings = match &*self {
            Self::Elements(elements) => elements
                .iter()
                .filter_map(|element| element.attr(name))
                .map(str::to_string)
                .collect(),
            other => return Err(other.state_error("attr", ResultKind::Elements.as_str())),
        };

        *self = Self::Strings(strings);
        Ok(())
    }

    /// Returns the `href` of every matched element, empty when absent
    ///
    /// The payload itself is left unchanged; the job turns these into child jobs.
    pub fn hrefs(&self) -> JobResult<Vec<String>> {
        match self {
            Self::Elements(elements) => Ok(elements
                .iter()
                .map(|element| element.attr("href").unwrap_or_default().to_string())
                .collect()),
            other => Err(other.state_error("click", ResultKind::Elements.as_str())),
        }
    }

    /// Resolves every string against `base`
    ///
    /// Strings that cannot be resolved are kept unchanged.
    pub fn resolve(&mut self, base: &str) -> JobResult<()> {
        match self {
            Self::Strings(strings) => {
                for entry in strings.iter_mut() {
                    *entry = resolve_url(base, entry.as_str());
                }
                Ok(())
            }
            other => Err(other.state_error("resolve", ResultKind::Strings.as_str())),
        }
    }

    /// Maps every item of a list payload and infers the new kind from the output
    pub fn map<F>(&mut self, mut f: F) -> JobResult<()>
    where
        F: FnMut(Value<T>) -> Value<T>,
    {
        if !self.is_list() {
            return Err(self.state_error("map", "list"));
        }

        let values = std::mem::take(self).into_values();
        *self = Self::from_values(values.into_iter().map(|value| f(value)).collect());
        Ok(())
    }

    /// Keeps the items of a list payload for which `keep` returns true
    pub fn filter<F>(&mut self, mut keep: F) -> JobResult<()>
    where
        F: FnMut(&Value<T>) -> bool,
    {
        if !self.is_list() {
            return Err(self.state_error("filter", "list"));
        }

        let kind = self.kind();
        let values: Vec<Value<T>> = std::mem::take(self)
            .into_values()
            .into_iter()
            .filter(|value| keep(value))
            .collect();

        *self = match kind {
            ResultKind::Elements => Self::Elements(elements(values)),
            ResultKind::Strings => Self::Strings(texts(values)),
            ResultKind::Jobs => Self::Jobs(
                values
                    .into_iter()
                    .filter_map(Value::into_job)
                    .collect(),
            ),
            _ => Self::Custom(Value::List(values)),
        };
        Ok(())
    }

    /// Replaces the whole payload with the value `f` builds from it
    pub fn replace<F>(&mut self, f: F)
    where
        F: FnOnce(Vec<Value<T>>) -> Value<T>,
    {
        let values = std::mem::take(self).into_values();
        *self = Self::from_value(f(values));
    }

    fn state_error(&self, operation: &'static str, expected: &'static str) -> JobError {
        JobError::State {
            operation,
            expected,
            found: self.kind(),
        }
    }
}

impl<T: Clone> Payload<T> {
    /// Returns the payload coerced into a list, leaving it in place
    pub fn to_values(&self) -> Vec<Value<T>> {
        self.clone().into_values()
    }
}

fn texts<T>(values: Vec<Value<T>>) -> Vec<String> {
    values
        .into_iter()
        .filter_map(|value| match value {
            Value::Text(text) => Some(text),
            _ => None,
        })
        .collect()
}

fn elements<T>(values: Vec<Value<T>>) -> Vec<Element> {
    values
        .into_iter()
        .filter_map(|value| match value {
            Value::Element(element) => Some(element),
            _ => None,
        })
        .collect()
}
