/// Result state definitions for a job's chain
///
/// The kind of the current payload decides which operation may run next.
use std::fmt;

/// Represents which shape of value a job currently holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultKind {
    /// Nothing yet; the download has not completed
    Empty,

    /// A downloaded HTML page
    Document,

    /// Elements matched by a selector
    Elements,

    /// Extracted strings (text content, attribute values, resolved links)
    Strings,

    /// Child jobs spawned by `click`
    Jobs,

    /// Anything produced by `map` or `replace` that is not strings or elements
    Custom,
}

impl ResultKind {
    /// Returns the human readable name used in error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Document => "document",
            Self::Elements => "element set",
            Self::Strings => "string list",
            Self::Jobs => "job list",
            Self::Custom => "custom",
        }
    }

    /// Returns true if payloads of this kind are always lists
    ///
    /// `Custom` payloads may or may not be lists; check the payload itself.
    pub fn is_list(&self) -> bool {
        matches!(self, Self::Elements | Self::Strings | Self::Jobs)
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
