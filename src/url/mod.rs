//! URL resolution for crawl chains
//!
//! Links and extracted strings are resolved against the URL of the page they came from.
//! Resolution is forgiving: [`resolve_url`] hands back the original string when it cannot
//! be turned into an absolute URL, while [`try_resolve`] reports the failure so callers
//! such as `click` can skip the link instead.

use crate::{UrlError, UrlResult};
use url::Url;

/// Resolves `href` against `base`, returning the absolute URL
///
/// # Arguments
///
/// * `base` - The absolute URL of the page the link was found on
/// * `href` - An absolute or relative reference
///
/// # Returns
///
/// * `Ok(Url)` - The absolute URL
/// * `Err(UrlError)` - `base` is not an absolute URL or `href` is malformed
pub fn try_resolve(base: &str, href: &str) -> UrlResult<Url> {
    let base = Url::parse(base).map_err(|e| UrlError::InvalidBase(format!("{}: {}", base, e)))?;

    base.join(href.trim())
        .map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))
}

/// Resolves `href` against `base`, falling back to `href` unchanged on failure
///
/// # Examples
///
/// ```
/// use crawl_chain::url::resolve_url;
///
/// assert_eq!(
///     resolve_url("https://example.com/docs/", "intro"),
///     "https://example.com/docs/intro"
/// );
/// assert_eq!(resolve_url("https://example.com/", "http://[::1"), "http://[::1");
/// ```
pub fn resolve_url(base: &str, href: &str) -> String {
    match try_resolve(base, href) {
        Ok(url) => url.into(),
        Err(e) => {
            tracing::debug!("Keeping unresolved link {:?}: {}", href, e);
            href.to_string()
        }
    }
}
