use url::{form_urlencoded, Url};

/// Exact query parameter names stripped during normalization
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "mc_cid", "_ga"];

/// Any query parameter starting with this prefix is stripped as well
const TRACKING_PREFIX: &str = "utm_";

/// Normalizes a URL into the comparison key used by every registry
///
/// # Normalization Steps
///
/// 1. Resolve the input against `base` when given
/// 2. Fold `https` into `http` so both schemes share one key
/// 3. Lowercase the host and keep any non-default port
/// 4. Strip trailing slashes from the path (a bare root becomes empty)
/// 5. Drop tracking parameters (`utm_*`, `fbclid`, `gclid`, `mc_eid`, `mc_cid`, `_ga`)
/// 6. Sort the remaining `(key, value)` pairs and re-encode them form-style
/// 7. Drop an empty query and discard the fragment
///
/// Normalization never fails. Input that cannot be parsed as a URL yields a
/// degraded key: the trimmed, fragment-stripped, lowercased raw text.
///
/// # Examples
///
/// ```
/// use campus_harvest::url::normalize_url;
///
/// assert_eq!(normalize_url("https://Site.EDU/a/?utm_source=x#top", None), "http://site.edu/a");
/// assert_eq!(normalize_url("http://site.edu/", None), "http://site.edu");
/// ```
pub fn normalize_url(raw: &str, base: Option<&Url>) -> String {
    let trimmed = raw.trim();

    let parsed = match base {
        Some(base) => base.join(trimmed),
        None => Url::parse(trimmed),
    };

    match parsed {
        Ok(url) if !url.cannot_be_a_base() => canonical_key(&url),
        Ok(url) => degraded_key(url.as_str()),
        Err(e) => {
            tracing::trace!("Degraded normalization for '{}': {}", trimmed, e);
            degraded_key(trimmed)
        }
    }
}

/// Builds the canonical key for a parsed hierarchical URL
fn canonical_key(url: &Url) -> String {
    let scheme = match url.scheme() {
        "https" => "http",
        other => other,
    };

    let host = url.host_str().unwrap_or_default().to_lowercase();

    // `port()` is None when the port is the scheme default
    let port = match url.port() {
        Some(80) | Some(443) | None => String::new(),
        Some(port) => format!(":{}", port),
    };

    let path = url.path().trim_end_matches('/');

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    pairs.sort();

    let query = if pairs.is_empty() {
        String::new()
    } else {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &pairs {
            serializer.append_pair(key, value);
        }
        format!("?{}", serializer.finish())
    };

    format!("{}://{}{}{}{}", scheme, host, port, path, query)
}

/// Fallback key for input the URL parser rejects
fn degraded_key(raw: &str) -> String {
    let without_fragment = raw.split('#').next().unwrap_or(raw);
    without_fragment.trim().to_lowercase()
}

/// Returns true if the query parameter only carries tracking data
fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with(TRACKING_PREFIX) || TRACKING_PARAMS.contains(&key.as_str())
}
