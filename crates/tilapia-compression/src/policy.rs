//! Content-type compressibility policy

use serde::{Deserialize, Deserializer, Serialize};

const COMPRESSIBLE: &[&str] = &[
    "text/",
    "application/json",
    "application/javascript",
    "application/xml",
    "application/rss+xml",
    "application/atom+xml",
    "image/svg+xml",
];

// Raster images are listed one by one so that image/svg+xml stays compressible.
const NON_COMPRESSIBLE: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/jpg",
    "image/gif",
    "image/webp",
    "image/avif",
    "image/heic",
    "image/bmp",
    "image/tiff",
    "image/x-icon",
    "image/vnd.microsoft.icon",
    "video/",
    "audio/",
    "application/zip",
    "application/gzip",
    "application/x-gzip",
    "application/x-bzip2",
    "application/x-xz",
    "application/x-7z-compressed",
    "application/x-rar-compressed",
    "application/vnd.rar",
    "application/zstd",
    "font/woff",
];

/// Decides whether a MIME type is worth compressing.
///
/// Entries are matched as case-insensitive substrings. They are stored
/// lowercased, whether they come from a config file or [`ContentTypePolicy::new`].
/// The deny list is consulted first; anything on neither list is not
/// compressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTypePolicy {
    /// Content types that benefit from compression
    #[serde(default = "default_compressible", deserialize_with = "normalized_entries")]
    pub compressible: Vec<String>,

    /// Content types that are already compressed
    #[serde(
        default = "default_non_compressible",
        deserialize_with = "normalized_entries"
    )]
    pub non_compressible: Vec<String>,
}

fn default_compressible() -> Vec<String> {
    COMPRESSIBLE.iter().map(|s| s.to_string()).collect()
}

fn default_non_compressible() -> Vec<String> {
    NON_COMPRESSIBLE.iter().map(|s| s.to_string()).collect()
}

fn normalize(entries: impl IntoIterator<Item = String>) -> Vec<String> {
    entries
        .into_iter()
        .map(|entry| entry.trim().to_ascii_lowercase())
        .filter(|entry| !entry.is_empty())
        .collect()
}

fn normalized_entries<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<String>::deserialize(deserializer).map(normalize)
}

impl Default for ContentTypePolicy {
    fn default() -> Self {
        Self {
            compressible: default_compressible(),
            non_compressible: default_non_compressible(),
        }
    }
}

impl ContentTypePolicy {
    /// Build a policy from allow and deny lists, lowercasing every entry
    pub fn new<A, D>(compressible: A, non_compressible: D) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        Self {
            compressible: normalize(compressible.into_iter().map(Into::into)),
            non_compressible: normalize(non_compressible.into_iter().map(Into::into)),
        }
    }

    /// Check if a content type should be compressed
    pub fn is_compressible(&self, content_type: &str) -> bool {
        let ct = content_type.to_ascii_lowercase();

        if self.non_compressible.iter().any(|deny| ct.contains(deny.as_str())) {
            return false;
        }

        self.compressible.iter().any(|allow| ct.contains(allow.as_str()))
    }
}
