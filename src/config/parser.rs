use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use campus_harvest::config::load_config;
///
/// let config = load_config(Path::new("config.toml")).unwrap();
/// println!("Checkpoint every {} entries", config.crawler.checkpoint_interval);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Stored with every run so that a resumed crawl can tell whether the
/// configuration changed in between.
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BrowserMode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const MINIMAL: &str = r#"
[crawler]
site-domains = ["site.edu"]

[user-agent]
crawler-name = "TestCrawler"
crawler-version = "1.0"
contact-url = "https://site.edu/about"
contact-email = "admin@site.edu"

[storage]
checkpoint-path = "./state.db"
"#;

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[crawler]
site-domains = ["site.edu", "*.site.edu"]
seeds = ["https://site.edu/"]
settle-delay-ms = 1000
request-timeout-secs = 10
checkpoint-interval = 5

[user-agent]
crawler-name = "TestCrawler"
crawler-version = "1.0"
contact-url = "https://site.edu/about"
contact-email = "admin@site.edu"

[storage]
checkpoint-path = "./state.db"
download-folder = "./docs"
tables-folder = "./csv"

[browser]
mode = "http"

[formats]
documents = ["pdf", "pptx"]

[video]
youtube-api-key = "secret"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.site_domains.len(), 2);
        assert_eq!(config.crawler.settle_delay_ms, 1000);
        assert_eq!(config.crawler.checkpoint_interval, 5);
        assert_eq!(config.user_agent.crawler_name, "TestCrawler");
        assert_eq!(config.storage.download_folder, "./docs");
        assert_eq!(config.browser.mode, BrowserMode::Http);
        assert!(config.browser.headless);
        assert_eq!(config.formats.documents, vec!["pdf", "pptx"]);
        assert!(config.formats.images.contains(&"png".to_string()));
        assert_eq!(config.video.api_key().as_deref(), Some("secret"));
    }

    #[test]
    fn test_defaults_applied() {
        let file = create_temp_config(MINIMAL);
        let config = load_config(file.path()).unwrap();

        assert!(config.crawler.seeds.is_empty());
        assert_eq!(config.crawler.settle_delay_ms, 5000);
        assert_eq!(config.crawler.request_timeout_secs, 30);
        assert_eq!(config.crawler.checkpoint_interval, 25);
        assert_eq!(config.storage.download_folder, "./fetched_downloadables");
        assert_eq!(config.storage.tables_folder, "./tables");
        assert_eq!(config.browser.mode, BrowserMode::Chromium);
        assert_eq!(config.formats.documents, vec!["pdf", "docx", "xlsx", "zip"]);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unknown_browser_mode_rejected() {
        let content = format!("{}\n[browser]\nmode = \"firefox\"\n", MINIMAL);
        let file = create_temp_config(&content);
        assert!(matches!(load_config(file.path()), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let content = MINIMAL.replace("[\"site.edu\"]", "[]");
        let file = create_temp_config(&content);
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        assert_ne!(
            compute_config_hash(file1.path()).unwrap(),
            compute_config_hash(file2.path()).unwrap()
        );
    }

    #[test]
    fn test_load_with_hash() {
        let file = create_temp_config(MINIMAL);
        let (config, hash) = load_config_with_hash(file.path()).unwrap();
        assert_eq!(config.crawler.site_domains, vec!["site.edu"]);
        assert_eq!(hash, compute_config_hash(file.path()).unwrap());
    }
}
