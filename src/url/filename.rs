//! Logical filenames for downloaded documents

use url::Url;

/// Derives stable logical filenames from document URLs
///
/// The filename is the URL path with the leading slash removed, the file
/// extension stripped and every remaining `/` replaced with `_`, so
/// `/docs/catalog/2024.pdf` becomes `docs_catalog_2024`. Query and fragment
/// never contribute, which makes `doc.pdf` and `doc.pdf#section2` collide on
/// purpose.
///
/// A URL with an empty path gets `default_name_<n>` from a counter owned by
/// this deriver. The counter is per run and is not persisted.
#[derive(Debug, Default)]
pub struct FilenameDeriver {
    unnamed: u32,
}

impl FilenameDeriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the logical filename for a document URL
    pub fn derive(&mut self, url: &Url) -> String {
        let path = url.path().trim_start_matches('/').trim_end_matches('/');

        let stem = match path.rfind('.') {
            // only strip a dot that belongs to the last segment
            Some(dot) if !path[dot..].contains('/') => &path[..dot],
            _ => path,
        };

        if stem.is_empty() {
            self.unnamed += 1;
            return format!("default_name_{}", self.unnamed);
        }

        stem.replace('/', "_")
    }
}

/// Returns the lowercased extension of the last path segment, if any
///
/// # Examples
///
/// ```
/// use campus_harvest::url::path_extension;
/// use url::Url;
///
/// let url = Url::parse("https://site.edu/forms/Apply.PDF?v=2").unwrap();
/// assert_eq!(path_extension(&url), Some("pdf".to_string()));
/// ```
pub fn path_extension(url: &Url) -> Option<String> {
    let last = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let (stem, ext) = last.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}
