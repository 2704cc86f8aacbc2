use std::convert::Infallible;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::constants::*;

/// Locator of one image, resolved against the catalog it came from.
pub type ImageRef = String;

/// Image references in the order the catalog lists them.
pub type SourceList = Vec<ImageRef>;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not reach {location}: {message}")]
    Network { location: String, message: String },

    #[error("{location} answered with HTTP status {status}")]
    Status { location: String, status: u16 },

    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("catalog loader stopped unexpectedly: {0}")]
    Worker(String),
}

/// Where a catalog (or an image) lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogLocation {
    Http(String),
    File(PathBuf),
}

impl CatalogLocation {
    pub fn parse(raw: &str) -> Self {
        if is_url(raw) {
            CatalogLocation::Http(raw.to_string())
        } else {
            CatalogLocation::File(PathBuf::from(raw))
        }
    }

    /// Resolve a reference found in this catalog. Absolute URLs and absolute
    /// paths are kept, relative ones are taken relative to the catalog.
    pub fn resolve(&self, reference: &str) -> CatalogLocation {
        if is_url(reference) {
            return CatalogLocation::Http(reference.to_string());
        }
        match self {
            CatalogLocation::Http(base) => {
                if reference.starts_with('/') {
                    CatalogLocation::Http(format!("{}{}", url_origin(base), reference))
                } else {
                    CatalogLocation::Http(format!("{}{}", url_directory(base), reference))
                }
            }
            CatalogLocation::File(base) => {
                let path = Path::new(reference);
                if path.is_absolute() {
                    CatalogLocation::File(path.to_path_buf())
                } else {
                    let dir = base.parent().unwrap_or(Path::new("."));
                    CatalogLocation::File(dir.join(path))
                }
            }
        }
    }

    /// Read the whole resource. HTTP requests ask every intermediate cache to
    /// revalidate so a reload sees the current catalog.
    pub fn fetch(&self, limit: u64) -> Result<Vec<u8>, LoadError> {
        match self {
            CatalogLocation::Http(url) => {
                let mut response = ureq::get(url)
                    .header("Cache-Control", "no-cache")
                    .header("Pragma", "no-cache")
                    .call()
                    .map_err(|e| match e {
                        ureq::Error::StatusCode(status) => LoadError::Status {
                            location: url.clone(),
                            status,
                        },
                        other => LoadError::Network {
                            location: url.clone(),
                            message: other.to_string(),
                        },
                    })?;
                response
                    .body_mut()
                    .with_config()
                    .limit(limit)
                    .read_to_vec()
                    .map_err(|e| LoadError::Network {
                        location: url.clone(),
                        message: e.to_string(),
                    })
            }
            CatalogLocation::File(path) => std::fs::read(path).map_err(|source| LoadError::Io {
                path: path.clone(),
                source,
            }),
        }
    }
}

impl FromStr for CatalogLocation {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(CatalogLocation::parse(s))
    }
}

impl fmt::Display for CatalogLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogLocation::Http(url) => write!(f, "{}", url),
            CatalogLocation::File(path) => write!(f, "{}", path.display()),
        }
    }
}

fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

// "https://host/a/b.json" -> "https://host", "http://host?x=/a" -> "http://host"
fn url_origin(url: &str) -> &str {
    let after_scheme = url.find("://").map_or(0, |i| i + 3);
    let end = url[after_scheme..]
        .find(['/', '?', '#'])
        .map_or(url.len(), |i| after_scheme + i);
    &url[..end]
}

// "https://host/a/b.json" -> "https://host/a/"
fn url_directory(url: &str) -> String {
    let origin = url_origin(url);
    let path = url[origin.len()..]
        .split(['?', '#'])
        .next()
        .unwrap_or("");
    match path.rfind('/') {
        Some(slash) => format!("{}{}", origin, &path[..=slash]),
        None => format!("{}/", origin),
    }
}

/// Turn a catalog body into its image references.
///
/// Invalid JSON is an error. Anything other than an array yields an empty
/// list, and entries that are not non-empty strings are skipped.
pub fn parse_catalog(body: &[u8]) -> Result<SourceList, LoadError> {
    let value: Value = serde_json::from_slice(body)?;
    let Value::Array(entries) = value else {
        warn!("catalog is not a JSON array, treating it as empty");
        return Ok(Vec::new());
    };

    let mut references = Vec::with_capacity(entries.len());
    for (i, entry) in entries.into_iter().enumerate() {
        match entry {
            Value::String(s) if !s.is_empty() => references.push(s),
            other => warn!("skipping catalog entry {}: {}", i, other),
        }
    }
    Ok(references)
}

/// Fetch and parse the catalog, resolving every reference against `location`.
pub fn load(location: &CatalogLocation) -> Result<SourceList, LoadError> {
    debug!("fetching catalog from {}", location);
    let body = location.fetch(MAX_CATALOG_BYTES)?;
    let references = parse_catalog(&body)?;
    Ok(references
        .iter()
        .map(|r| location.resolve(r).to_string())
        .collect())
}

/// Fetch the bytes of one resolved image reference.
pub fn fetch_image(reference: &str) -> Result<Vec<u8>, LoadError> {
    CatalogLocation::parse(reference).fetch(MAX_IMAGE_BYTES)
}
