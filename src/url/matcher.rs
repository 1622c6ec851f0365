use url::Url;

/// A single configured site-domain pattern
///
/// Two forms are supported:
/// 1. Exact: `"site.edu"` matches only `site.edu`
/// 2. Wildcard: `"*.site.edu"` matches `site.edu` itself and any subdomain
///    (`library.site.edu`, `cs.grad.site.edu`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostPattern {
    Exact(String),
    Subdomains(String),
}

impl HostPattern {
    /// Parses a pattern string, lowercasing it
    pub fn parse(pattern: &str) -> Self {
        let pattern = pattern.trim().to_lowercase();
        match pattern.strip_prefix("*.") {
            Some(base) => Self::Subdomains(base.to_string()),
            None => Self::Exact(pattern),
        }
    }

    /// Returns true if the (already lowercased) host matches this pattern
    pub fn matches(&self, host: &str) -> bool {
        match self {
            Self::Exact(domain) => host == domain,
            Self::Subdomains(base) => {
                host == base
                    || (host.len() > base.len()
                        && host.ends_with(base.as_str())
                        && host.as_bytes()[host.len() - base.len() - 1] == b'.')
            }
        }
    }
}

/// The set of hosts a crawl is allowed to fetch from
///
/// A host is in scope when it matches any configured pattern. Ports are
/// ignored, so `127.0.0.1:8080` is in scope for the pattern `127.0.0.1`.
///
/// # Examples
///
/// ```
/// use campus_harvest::url::SiteScope;
///
/// let scope = SiteScope::new(&["site.edu".to_string(), "*.library.site.edu".to_string()]);
/// assert!(scope.contains_host("site.edu"));
/// assert!(scope.contains_host("Archives.Library.site.edu"));
/// assert!(!scope.contains_host("mirror.site.edu"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteScope {
    patterns: Vec<HostPattern>,
}

impl SiteScope {
    pub fn new(patterns: &[String]) -> Self {
        Self {
            patterns: patterns.iter().map(|p| HostPattern::parse(p)).collect(),
        }
    }

    pub fn contains_host(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        self.patterns.iter().any(|pattern| pattern.matches(&host))
    }

    /// Returns true if the URL has a host and that host is in scope
    pub fn contains(&self, url: &Url) -> bool {
        url.host_str()
            .map(|host| self.contains_host(host))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(patterns: &[&str]) -> SiteScope {
        SiteScope::new(&patterns.iter().map(|p| p.to_string()).collect::<Vec<_>>())
    }

    #[test]
    fn test_exact_pattern() {
        let pattern = HostPattern::parse("site.edu");
        assert_eq!(pattern, HostPattern::Exact("site.edu".to_string()));
        assert!(pattern.matches("site.edu"));
        assert!(!pattern.matches("www.site.edu"));
        assert!(!pattern.matches("othersite.edu"));
    }

    #[test]
    fn test_wildcard_pattern() {
        let pattern = HostPattern::parse("*.site.edu");
        assert_eq!(pattern, HostPattern::Subdomains("site.edu".to_string()));
        assert!(pattern.matches("site.edu"));
        assert!(pattern.matches("library.site.edu"));
        assert!(pattern.matches("cs.grad.site.edu"));
        assert!(!pattern.matches("othersite.edu"));
        assert!(!pattern.matches("site.edu.evil.com"));
    }

    #[test]
    fn test_pattern_case_insensitive() {
        assert!(HostPattern::parse("Site.EDU").matches("site.edu"));
        assert!(scope(&["site.edu"]).contains_host("SITE.edu"));
    }

    #[test]
    fn test_mirror_subdomain_out_of_scope_for_exact() {
        let scope = scope(&["site.edu"]);
        assert!(!scope.contains_host("mirror.site.edu"));
    }

    #[test]
    fn test_contains_url_ignores_port() {
        let scope = scope(&["127.0.0.1"]);
        assert!(scope.contains(&Url::parse("http://127.0.0.1:9000/a").unwrap()));
        assert!(!scope.contains(&Url::parse("http://localhost:9000/a").unwrap()));
    }

    #[test]
    fn test_url_without_host() {
        let scope = scope(&["site.edu"]);
        assert!(!scope.contains(&Url::parse("mailto:admin@site.edu").unwrap()));
    }

    #[test]
    fn test_empty_scope_matches_nothing() {
        assert!(!scope(&[]).contains_host("site.edu"));
    }
}
