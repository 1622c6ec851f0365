//! Google Drive file-link recognition

use url::Url;

/// Registry tag under which cloud-drive downloads are recorded
pub const DRIVE_FORMAT_TAG: &str = "gdrive";

const DRIVE_HOST: &str = "drive.google.com";

/// Extracts the file id from a Google Drive file link
///
/// Recognized shapes:
/// - `https://drive.google.com/file/d/<id>/view`
/// - `https://drive.google.com/open?id=<id>`
/// - `https://drive.google.com/uc?id=<id>` (with or without `export=download`)
///
/// Folder links and anything on another host return `None`.
pub fn drive_file_id(url: &Url) -> Option<String> {
    if !url.host_str()?.eq_ignore_ascii_case(DRIVE_HOST) {
        return None;
    }

    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();

    match segments.as_slice() {
        ["file", "d", id, ..] if is_file_id(id) => Some(id.to_string()),
        ["open"] | ["uc"] => url
            .query_pairs()
            .find(|(key, _)| key == "id")
            .map(|(_, value)| value.into_owned())
            .filter(|id| is_file_id(id)),
        _ => None,
    }
}

/// Builds the direct-download URL for a Drive file id
pub fn drive_download_url(file_id: &str) -> String {
    format!(
        "https://drive.google.com/uc?export=download&id={}",
        file_id
    )
}

fn is_file_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
