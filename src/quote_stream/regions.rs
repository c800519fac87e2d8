//! Candidate endpoint resolution from a URL template and a region list.

use url::Url;

use crate::error::{QuoteError, Result};

/// Path used when the template has none.
pub const DEFAULT_PATH: &str = "/api/v1/ws";
/// Query parameter carrying the bearer token.
pub const AUTH_QUERY_PARAM: &str = "auth";
const DEFAULT_SCHEME: &str = "wss";

/// Recognized region placeholder spellings, applied in this order. The
/// double-brace form goes first so `{region}` does not match inside it.
const REGION_PLACEHOLDERS: [&str; 5] = ["{{region}}", "{region}", "<region>", "%region%", "{REGION}"];

pub fn has_placeholder(template: &str) -> bool {
    REGION_PLACEHOLDERS.iter().any(|placeholder| template.contains(placeholder))
}

fn substitute_placeholders(template: &str, region: &str) -> String {
    REGION_PLACEHOLDERS
        .iter()
        .fold(template.to_string(), |acc, placeholder| acc.replace(placeholder, region))
}

fn ensure_scheme(value: &str) -> String {
    let has_scheme = value
        .split_once("://")
        .map(|(scheme, _)| !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphabetic()))
        .unwrap_or(false);

    if has_scheme {
        value.to_string()
    } else {
        format!("{}://{}", DEFAULT_SCHEME, value)
    }
}

/// Builds one candidate URL for `region`, or for the bare template when
/// `region` is `None`.
pub fn candidate_url(template: &str, region: Option<&str>, token: Option<&str>) -> Result<String> {
    let region = region.map(str::trim).filter(|r| !r.is_empty());
    let substituted = match region {
        Some(region) => substitute_placeholders(template, region),
        None => template.to_string(),
    };

    let mut url = Url::parse(&ensure_scheme(&substituted))
        .map_err(|e| QuoteError::InvalidConfig(format!("invalid endpoint template: {}", e)))?;

    if let Some(region) = region.filter(|_| substituted == template) {
        let host = if region.contains('.') {
            region.to_string()
        } else {
            let mut labels: Vec<&str> = url
                .host_str()
                .unwrap_or_default()
                .split('.')
                .filter(|label| !label.is_empty())
                .collect();
            match labels.first_mut() {
                Some(first) => {
                    *first = region;
                    labels.join(".")
                }
                None => region.to_string(),
            }
        };
        url.set_host(Some(&host))
            .map_err(|e| QuoteError::InvalidConfig(format!("invalid region host {:?}: {}", host, e)))?;
    }

    if url.path().is_empty() || url.path() == "/" {
        url.set_path(DEFAULT_PATH);
    }

    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != AUTH_QUERY_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    let token = token.map(str::trim).filter(|t| !t.is_empty());

    if retained.is_empty() && token.is_none() {
        url.set_query(None);
    } else {
        let mut pairs = url.query_pairs_mut();
        pairs.clear().extend_pairs(retained);
        if let Some(token) = token {
            pairs.append_pair(AUTH_QUERY_PARAM, token);
        }
    }

    Ok(url.to_string())
}

/// Ordered, deduplicated candidate endpoints.
///
/// Every region yields one candidate. The bare template is appended when the
/// region list is empty or the template has no placeholder to substitute.
pub fn resolve_candidates(template: &str, regions: &[String], token: Option<&str>) -> Result<Vec<String>> {
    let mut candidates: Vec<String> = Vec::new();
    let mut push = |url: String| {
        if !candidates.contains(&url) {
            candidates.push(url);
        }
    };

    for region in regions {
        push(candidate_url(template, Some(region), token)?);
    }
    if regions.is_empty() || !has_placeholder(template) {
        push(candidate_url(template, None, token)?);
    }

    Ok(candidates)
}

/// Host and port of an endpoint, safe to log.
pub fn endpoint_host(endpoint: &str) -> String {
    match Url::parse(endpoint) {
        Ok(url) => match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            _ => "<no host>".to_string(),
        },
        Err(_) => "<invalid endpoint>".to_string(),
    }
}
