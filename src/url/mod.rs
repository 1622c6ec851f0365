//! URL handling module for Campus-Harvest
//!
//! This module provides URL normalization, site-scope matching, cloud-drive
//! link recognition and logical filename derivation for downloads.

mod cloud;
mod filename;
mod matcher;
mod normalize;

// Re-export main functions
pub use cloud::{drive_download_url, drive_file_id, DRIVE_FORMAT_TAG};
pub use filename::{path_extension, FilenameDeriver};
pub use matcher::SiteScope;
pub use normalize::normalize_url;

use url::Url;

/// Returns true if the URL uses a scheme the crawler can fetch
pub fn is_http_scheme(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_http_scheme() {
        assert!(is_http_scheme(&Url::parse("http://site.edu/").unwrap()));
        assert!(is_http_scheme(&Url::parse("https://site.edu/").unwrap()));
        assert!(!is_http_scheme(&Url::parse("ftp://site.edu/").unwrap()));
        assert!(!is_http_scheme(&Url::parse("mailto:dean@site.edu").unwrap()));
    }
}
