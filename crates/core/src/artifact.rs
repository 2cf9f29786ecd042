//! Artifact selection from provider output descriptors.
//!
//! When a task completes, the provider returns a list of output files of
//! mixed types (the requested media plus thumbnails, logs, etc.). Each
//! tool declares which [`MediaKind`]s it expects; [`select_artifacts`]
//! picks the matching URLs.

use serde::{Deserialize, Serialize};

/// A single provider-produced output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputDescriptor {
    /// Download URL for the file.
    pub file_url: String,
    /// Mime type as reported by the provider. Absent or opaque for some
    /// output kinds, in which case the URL extension decides.
    #[serde(default)]
    pub file_type: Option<String>,
}

/// Media categories a tool can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

/// Extensions accepted as images when no usable mime type is present.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];

/// Extensions accepted as video when no usable mime type is present.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov"];

impl MediaKind {
    /// Stable lowercase name, used in error messages and API payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    fn mime_prefix(self) -> &'static str {
        match self {
            MediaKind::Image => "image/",
            MediaKind::Video => "video/",
        }
    }

    fn extensions(self) -> &'static [&'static str] {
        match self {
            MediaKind::Image => IMAGE_EXTENSIONS,
            MediaKind::Video => VIDEO_EXTENSIONS,
        }
    }

    /// Whether an output descriptor is of this media kind.
    ///
    /// A present, non-empty mime type is authoritative; the URL extension
    /// is only consulted when the mime type is missing or blank.
    pub fn matches(self, output: &OutputDescriptor) -> bool {
        if let Some(mime) = output.file_type.as_deref() {
            let mime = mime.trim();
            if !mime.is_empty() {
                return mime.to_ascii_lowercase().starts_with(self.mime_prefix());
            }
        }
        match url_extension(&output.file_url) {
            Some(ext) => self.extensions().contains(&ext.as_str()),
            None => false,
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercased extension of the final path segment, ignoring query string
/// and fragment.
fn url_extension(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.rsplit('/').next().unwrap_or(path);
    let (_, ext) = segment.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_ascii_lowercase())
    }
}

/// Select the URLs of outputs matching any of the expected media kinds,
/// preserving provider order.
///
/// An empty result for a completed task is the caller's
/// `ArtifactNotFound` condition, not a silent success.
pub fn select_artifacts(outputs: &[OutputDescriptor], expected: &[MediaKind]) -> Vec<String> {
    outputs
        .iter()
        .filter(|output| expected.iter().any(|kind| kind.matches(output)))
        .map(|output| output.file_url.clone())
        .collect()
}
