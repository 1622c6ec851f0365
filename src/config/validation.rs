use crate::config::types::{
    BrowserConfig, Config, CrawlerConfig, FormatConfig, StorageConfig, UserAgentConfig,
};
use crate::url::DRIVE_FORMAT_TAG;
use crate::ConfigError;
use std::net::IpAddr;
use url::Url;

/// Longest settle delay accepted, in milliseconds
const MAX_SETTLE_DELAY_MS: u64 = 60_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_storage_config(&config.storage)?;
    validate_browser_config(&config.browser)?;
    validate_format_config(&config.formats)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.site_domains.is_empty() {
        return Err(ConfigError::Validation(
            "site_domains must list at least one domain".to_string(),
        ));
    }

    for pattern in &config.site_domains {
        validate_domain_pattern(pattern)?;
    }

    for seed in &config.seeds {
        validate_seed_url(seed)?;
    }

    if config.settle_delay_ms > MAX_SETTLE_DELAY_MS {
        return Err(ConfigError::Validation(format!(
            "settle_delay_ms must be <= {}ms, got {}ms",
            MAX_SETTLE_DELAY_MS, config.settle_delay_ms
        )));
    }

    if config.request_timeout_secs < 1 || config.request_timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be between 1 and 300, got {}",
            config.request_timeout_secs
        )));
    }

    if config.checkpoint_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "checkpoint_interval must be >= 1, got {}",
            config.checkpoint_interval
        )));
    }

    Ok(())
}

/// Validates a seed URL: must parse and use HTTP(S)
pub(crate) fn validate_seed_url(seed: &str) -> Result<(), ConfigError> {
    let url = Url::parse(seed)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Seed URL '{}' must use HTTP or HTTPS scheme",
            seed
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    let paths = [
        ("checkpoint_path", &config.checkpoint_path),
        ("download_folder", &config.download_folder),
        ("tables_folder", &config.tables_folder),
    ];

    for (name, value) in paths {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}

fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    if let Some(executable) = &config.chrome_executable {
        if executable.trim().is_empty() {
            return Err(ConfigError::Validation(
                "chrome_executable cannot be empty when set".to_string(),
            ));
        }
    }
    Ok(())
}

/// Validates the format lists: plain alphanumeric extensions without dots
fn validate_format_config(config: &FormatConfig) -> Result<(), ConfigError> {
    let all = config
        .documents
        .iter()
        .chain(config.images.iter())
        .chain(config.videos.iter());

    for format in all {
        if format.is_empty() || !format.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::Validation(format!(
                "Format '{}' must be a non-empty alphanumeric extension",
                format
            )));
        }
    }

    if config
        .documents
        .iter()
        .any(|f| f.eq_ignore_ascii_case(DRIVE_FORMAT_TAG))
    {
        return Err(ConfigError::Validation(format!(
            "'{}' is reserved for cloud-drive downloads",
            DRIVE_FORMAT_TAG
        )));
    }

    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    if let Some(domain) = pattern.strip_prefix("*.") {
        validate_domain_string(domain)
    } else if pattern == "localhost" || pattern.parse::<IpAddr>().is_ok() {
        Ok(())
    } else {
        validate_domain_string(pattern)
    }
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    // Check for invalid characters
    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    // Must contain at least one dot (e.g., site.edu, not just "site")
    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'site.edu')",
            domain
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crawler_config() -> CrawlerConfig {
        CrawlerConfig {
            site_domains: vec!["site.edu".to_string()],
            seeds: vec!["http://site.edu/".to_string()],
            settle_delay_ms: 0,
            request_timeout_secs: 30,
            checkpoint_interval: 25,
        }
    }

    #[test]
    fn test_validate_domain_pattern() {
        assert!(validate_domain_pattern("site.edu").is_ok());
        assert!(validate_domain_pattern("*.site.edu").is_ok());
        assert!(validate_domain_pattern("www.cs.site.edu").is_ok());
        assert!(validate_domain_pattern("localhost").is_ok());
        assert!(validate_domain_pattern("127.0.0.1").is_ok());
        assert!(validate_domain_pattern("::1").is_ok());

        assert!(validate_domain_pattern("").is_err());
        assert!(validate_domain_pattern("*.").is_err());
        assert!(validate_domain_pattern("site").is_err());
        assert!(validate_domain_pattern(".site.edu").is_err());
        assert!(validate_domain_pattern("site.edu.").is_err());
        assert!(validate_domain_pattern("site..edu").is_err());
    }

    #[test]
    fn test_crawler_limits() {
        assert!(validate_crawler_config(&crawler_config()).is_ok());

        let mut config = crawler_config();
        config.settle_delay_ms = 60_001;
        assert!(validate_crawler_config(&config).is_err());

        let mut config = crawler_config();
        config.request_timeout_secs = 0;
        assert!(validate_crawler_config(&config).is_err());

        let mut config = crawler_config();
        config.checkpoint_interval = 0;
        assert!(validate_crawler_config(&config).is_err());

        let mut config = crawler_config();
        config.site_domains.clear();
        assert!(validate_crawler_config(&config).is_err());
    }

    #[test]
    fn test_seed_schemes() {
        assert!(validate_seed_url("http://site.edu/").is_ok());
        assert!(validate_seed_url("https://site.edu/admissions").is_ok());
        assert!(matches!(
            validate_seed_url("ftp://site.edu/"),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            validate_seed_url("site.edu"),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_format_lists() {
        assert!(validate_format_config(&FormatConfig::default()).is_ok());

        let mut formats = FormatConfig::default();
        formats.documents.push(".pdf".to_string());
        assert!(validate_format_config(&formats).is_err());

        let mut formats = FormatConfig::default();
        formats.documents.push("gdrive".to_string());
        assert!(validate_format_config(&formats).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@site.edu").is_ok());
        assert!(validate_email("admin@cs.site.edu").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@site.edu").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());
        assert!(validate_email("a@b@site.edu").is_err());
    }
}
