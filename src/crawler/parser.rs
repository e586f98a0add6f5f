//! HTML parsing for job steps
//!
//! A downloaded page is kept as its source text and parsed with `scraper` whenever a
//! selector runs against it. Matched nodes are copied out into [`Element`] snapshots
//! (tag name, outer HTML, text content and attributes) so they can travel between steps
//! and tasks without borrowing from a parsed tree.

use crate::{JobError, JobResult};
use scraper::{ElementRef, Html, Selector};

/// A downloaded HTML page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    url: String,
    html: String,
}

impl Document {
    /// Wraps the body downloaded from `url`
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }

    /// Returns the URL the page was downloaded from
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the page source
    pub fn html(&self) -> &str {
        &self.html
    }

    /// Returns every element matching a CSS selector, in document order
    ///
    /// # Example
    ///
    /// ```
    /// use crawl_chain::crawler::Document;
    ///
    /// let document = Document::new(
    ///     "https://example.com/",
    ///     r#"<html><body><h2>First</h2><h2>Second</h2></body></html>"#,
    /// );
    /// let headings = document.select("h2").unwrap();
    /// assert_eq!(headings.len(), 2);
    /// assert_eq!(headings[1].text(), "Second");
    /// ```
    pub fn select(&self, selector: &str) -> JobResult<Vec<Element>> {
        let compiled = parse_selector(selector)?;
        let document = Html::parse_document(&self.html);

        Ok(document.select(&compiled).map(Element::from_ref).collect())
    }
}

/// A snapshot of one matched element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    html: String,
    text: String,
    attrs: Vec<(String, String)>,
}

impl Element {
    fn from_ref(element: ElementRef<'_>) -> Self {
        let value = element.value();

        Self {
            name: value.name().to_string(),
            html: element.html(),
            text: element.text().collect(),
            attrs: value
                .attrs()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        }
    }

    /// Returns the lowercase tag name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the outer HTML of the element
    pub fn html(&self) -> &str {
        &self.html
    }

    /// Returns the concatenated text of the element and its descendants
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the value of an attribute, if present
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns every descendant matching a CSS selector
    ///
    /// The element itself is part of the searched fragment, so a selector matching it
    /// returns it too. Table parts (`tr`, `td` and friends) are reparsed inside a
    /// synthetic table, since the HTML parser drops them anywhere else; the wrapper
    /// itself never matches.
    pub fn select(&self, selector: &str) -> JobResult<Vec<Element>> {
        let compiled = parse_selector(selector)?;

        let (open, close) = match table_context(&self.name) {
            Some(context) => context,
            None => {
                let fragment = Html::parse_fragment(&self.html);
                return Ok(fragment.select(&compiled).map(Element::from_ref).collect());
            }
        };

        let fragment = Html::parse_fragment(&format!("{}{}{}", open, self.html, close));
        let root = match wrapped_root(&fragment, &self.name) {
            Some(root) => root,
            None => return Ok(Vec::new()),
        };

        let itself = compiled.matches(&root).then_some(root);
        Ok(itself
            .into_iter()
            .chain(root.select(&compiled))
            .map(Element::from_ref)
            .collect())
    }
}

/// Markup a table part must be nested in to survive fragment parsing
fn table_context(name: &str) -> Option<(&'static str, &'static str)> {
    match name {
        "td" | "th" => Some(("<table><tr>", "</tr></table>")),
        "tr" | "thead" | "tbody" | "tfoot" | "caption" | "colgroup" => {
            Some(("<table>", "</table>"))
        }
        "col" => Some(("<table><colgroup>", "</colgroup></table>")),
        _ => None,
    }
}

/// Descends from the fragment root through first children to the reparsed element
fn wrapped_root<'a>(fragment: &'a Html, name: &str) -> Option<ElementRef<'a>> {
    let mut current = fragment.root_element();
    loop {
        if current.value().name() == name {
            return Some(current);
        }
        current = current.children().find_map(ElementRef::wrap)?;
    }
}

/// Parses a CSS selector, reporting failures as a job error
pub fn parse_selector(selector: &str) -> JobResult<Selector> {
    Selector::parse(selector).map_err(|e| JobError::Selector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}
