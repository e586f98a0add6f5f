use crate::config::types::{Config, CrawlerConfig, StartEntry, StepConfig};
use crate::crawler::{build_headers, parse_selector, MAX_CONCURRENCY};
use crate::state::ResultKind;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    build_headers(&config.headers)?;
    validate_start_entries(&config.start)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY, config.concurrency
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    Ok(())
}

/// Validates every start entry and its chain
fn validate_start_entries(entries: &[StartEntry]) -> Result<(), ConfigError> {
    if entries.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[start]] entry is required".to_string(),
        ));
    }

    for entry in entries {
        validate_start_url(&entry.url)?;
        validate_chain(&entry.url, &entry.steps)?;
    }

    Ok(())
}

/// Validates a start URL: absolute, http or https
fn validate_start_url(url: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid start URL '{}': {}", url, e)))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Start URL '{}' must use http or https",
            url
        )));
    }

    Ok(())
}

/// Checks a chain against the result-state transition table before anything runs
///
/// Every page starts as a document; `click` hands the remaining steps to the clicked
/// pages, which start as documents again.
fn validate_chain(url: &str, steps: &[StepConfig]) -> Result<(), ConfigError> {
    let mut kind = ResultKind::Document;

    for (index, step) in steps.iter().enumerate() {
        validate_step_argument(step)?;

        kind = next_kind(kind, step).ok_or_else(|| {
            ConfigError::Validation(format!(
                "{}: step {} ({}) cannot run on {} results",
                url,
                index + 1,
                step,
                kind
            ))
        })?;
    }

    if steps.last() == Some(&StepConfig::Click) {
        return Err(ConfigError::Validation(format!(
            "{}: chain ends with click; add steps for the clicked pages",
            url
        )));
    }

    Ok(())
}

fn validate_step_argument(step: &StepConfig) -> Result<(), ConfigError> {
    match step {
        StepConfig::Find(selector) => {
            parse_selector(selector).map_err(|e| ConfigError::InvalidSelector(e.to_string()))?;
        }
        StepConfig::Attr(name) if name.trim().is_empty() => {
            return Err(ConfigError::Validation(
                "attr name cannot be empty".to_string(),
            ));
        }
        _ => {}
    }
    Ok(())
}

/// Returns the state after `step`, or `None` if `step` cannot run on `kind`
fn next_kind(kind: ResultKind, step: &StepConfig) -> Option<ResultKind> {
    match (kind, step) {
        (ResultKind::Document, StepConfig::Find(_)) => Some(ResultKind::Elements),
        (ResultKind::Elements, StepConfig::TextContent | StepConfig::Attr(_)) => {
            Some(ResultKind::Strings)
        }
        (ResultKind::Elements, StepConfig::Click) => Some(ResultKind::Document),
        (ResultKind::Strings, StepConfig::Resolve | StepConfig::Trim) => Some(ResultKind::Strings),
        (ResultKind::Elements | ResultKind::Strings, StepConfig::Contains(_)) => Some(kind),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(selector: &str) -> StepConfig {
        StepConfig::Find(selector.to_string())
    }

    #[test]
    fn test_validate_start_url() {
        assert!(validate_start_url("https://example.com/").is_ok());
        assert!(validate_start_url("http://localhost:8080/list").is_ok());

        assert!(matches!(
            validate_start_url("/relative"),
            Err(ConfigError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_start_url("ftp://example.com/"),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_valid_chains() {
        let url = "https://example.com/";
        assert!(validate_chain(url, &[]).is_ok());
        assert!(validate_chain(url, &[find("h1"), StepConfig::TextContent]).is_ok());
        assert!(validate_chain(
            url,
            &[
                find("a"),
                StepConfig::Contains("docs".to_string()),
                StepConfig::Click,
                find("h1"),
                StepConfig::TextContent,
                StepConfig::Trim,
            ]
        )
        .is_ok());
        assert!(validate_chain(
            url,
            &[find("a"), StepConfig::Attr("href".to_string()), StepConfig::Resolve]
        )
        .is_ok());
    }

    #[test]
    fn test_chain_state_errors() {
        let url = "https://example.com/";
        assert!(validate_chain(url, &[StepConfig::TextContent]).is_err());
        assert!(validate_chain(url, &[find("a"), find("b")]).is_err());
        assert!(validate_chain(url, &[find("a"), StepConfig::Resolve]).is_err());
        assert!(validate_chain(url, &[StepConfig::Click]).is_err());
    }

    #[test]
    fn test_chain_error_names_step() {
        let err = validate_chain("https://example.com/", &[find("a"), StepConfig::Trim])
            .unwrap_err()
            .to_string();
        assert!(err.contains("step 2 (trim)"));
        assert!(err.contains("element set"));
    }

    #[test]
    fn test_chain_must_not_end_with_click() {
        let err = validate_chain("https://example.com/", &[find("a"), StepConfig::Click])
            .unwrap_err();
        assert!(err.to_string().contains("ends with click"));
    }

    #[test]
    fn test_invalid_selector_and_attr() {
        let url = "https://example.com/";
        assert!(matches!(
            validate_chain(url, &[find("a[")]),
            Err(ConfigError::InvalidSelector(_))
        ));
        assert!(validate_chain(url, &[find("a"), StepConfig::Attr(" ".to_string())]).is_err());
    }

    #[test]
    fn test_crawler_limits() {
        let mut config = CrawlerConfig::default();
        assert!(validate_crawler_config(&config).is_ok());

        config.concurrency = 0;
        assert!(validate_crawler_config(&config).is_err());

        config.concurrency = 2;
        config.timeout_secs = 0;
        assert!(validate_crawler_config(&config).is_err());
    }

    #[test]
    fn test_requires_start_entry() {
        assert!(validate_start_entries(&[]).is_err());
    }

    #[test]
    fn test_invalid_header_rejected() {
        let config: Config = toml::from_str(
            r#"
[headers]
"bad header" = "value"

[[start]]
url = "https://example.com/"
"#,
        )
        .unwrap();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidHeader { .. })
        ));
    }
}
