//! EMPIAR entry metadata lookup.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Image set category holding the raw movies of an entry.
pub const MOVIE_CATEGORY: &str = "micrographs - multiframe";

/// What the downloader needs to know about an entry.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryMetadata {
    /// Entry identifier, without the `EMPIAR-` prefix.
    pub entry_id: String,
    /// Entry title.
    pub title: String,
    /// Pixel size of the movies in Å, when published.
    pub sampling_rate: Option<f64>,
    /// Data format label such as `TIFF` or `MRC`.
    pub data_format: String,
    /// Movie directory relative to the entry root, e.g. `data/Movies`.
    pub directory: String,
    /// Number of movie image sets in the entry; only the first is used.
    pub movie_sets: usize,
}

/// Resolves entry identifiers into [`EntryMetadata`].
#[async_trait]
pub trait EntryResolver: Send + Sync {
    /// Looks up `entry_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the entry has no movie image set.
    async fn resolve(&self, entry_id: &str) -> Result<EntryMetadata>;
}

#[derive(Deserialize)]
struct ApiEntry {
    title: String,
    #[serde(default)]
    imagesets: Vec<ApiImageSet>,
}

#[derive(Deserialize)]
struct ApiImageSet {
    #[serde(default)]
    category: String,
    #[serde(default)]
    pixel_width: Option<serde_json::Value>,
    #[serde(default)]
    data_format: String,
    #[serde(default)]
    directory: String,
}

fn pixel_width(value: Option<&serde_json::Value>) -> Option<f64> {
    match value? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Extracts the metadata of `entry_id` from an API response body.
///
/// # Errors
///
/// Returns [`Error::Metadata`] for malformed documents and
/// [`Error::NotFound`] when no image set is in [`MOVIE_CATEGORY`].
pub fn parse_entry(entry_id: &str, body: &str) -> Result<EntryMetadata> {
    let mut entries: HashMap<String, ApiEntry> =
        serde_json::from_str(body).map_err(|e| Error::Metadata(e.to_string()))?;
    let key = format!("EMPIAR-{entry_id}");
    let entry = entries
        .remove(&key)
        .ok_or_else(|| Error::Metadata(format!("response has no {key} record")))?;

    let mut movies = entry
        .imagesets
        .into_iter()
        .filter(|set| set.category == MOVIE_CATEGORY);
    let first = movies.next().ok_or_else(|| Error::NotFound {
        entry_id: entry_id.to_string(),
    })?;
    let movie_sets = 1 + movies.count();
    if movie_sets > 1 {
        log::info!(
            "Found {movie_sets} movie datasets in EMPIAR entry {entry_id}. Will download the first one only!"
        );
    }

    Ok(EntryMetadata {
        entry_id: entry_id.to_string(),
        title: entry.title,
        sampling_rate: pixel_width(first.pixel_width.as_ref()),
        data_format: first.data_format,
        directory: first.directory,
        movie_sets,
    })
}

/// Client for the public EMPIAR REST API.
#[derive(Debug, Clone)]
pub struct EmpiarApi {
    http: reqwest::Client,
    base_url: String,
}

impl EmpiarApi {
    /// Creates a client for `base_url` (e.g. [`crate::config::EMPIAR_API_URL`]).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Creates a client reusing an existing HTTP client.
    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn entry_url(&self, entry_id: &str) -> String {
        format!("{}/{entry_id}", self.base_url)
    }
}

#[async_trait]
impl EntryResolver for EmpiarApi {
    async fn resolve(&self, entry_id: &str) -> Result<EntryMetadata> {
        let url = self.entry_url(entry_id);
        log::debug!("GET {url}");
        let body = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_entry(entry_id, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ENTRY_10200: &str = r#"{
        "EMPIAR-10200": {
            "title": "Human apoferritin",
            "imagesets": [
                {
                    "name": "Gain reference",
                    "category": "other",
                    "data_format": "MRC",
                    "directory": "data/Gain"
                },
                {
                    "name": "Unaligned movies",
                    "category": "micrographs - multiframe",
                    "pixel_width": 0.66,
                    "data_format": "TIFF",
                    "directory": "data/Movies"
                },
                {
                    "name": "More movies",
                    "category": "micrographs - multiframe",
                    "pixel_width": "1.1",
                    "data_format": "MRC",
                    "directory": "data/More"
                }
            ]
        }
    }"#;

    #[test]
    fn picks_first_movie_set() {
        let meta = parse_entry("10200", ENTRY_10200).unwrap();
        assert_eq!(meta.title, "Human apoferritin");
        assert_eq!(meta.sampling_rate, Some(0.66));
        assert_eq!(meta.data_format, "TIFF");
        assert_eq!(meta.directory, "data/Movies");
        assert_eq!(meta.movie_sets, 2);
    }

    #[test]
    fn pixel_width_may_be_a_string() {
        let body = r#"{"EMPIAR-1": {"title": "t", "imagesets": [
            {"category": "micrographs - multiframe", "pixel_width": " 1.1 ",
             "data_format": "MRC", "directory": "data"}]}}"#;
        let meta = parse_entry("1", body).unwrap();
        assert_eq!(meta.sampling_rate, Some(1.1));
        assert_eq!(meta.movie_sets, 1);
    }

    #[test]
    fn entry_without_movies_is_not_found() {
        let body = r#"{"EMPIAR-2": {"title": "maps only", "imagesets": [
            {"category": "reconstructed volumes", "data_format": "MRC", "directory": "maps"}]}}"#;
        let err = parse_entry("2", body).unwrap_err();
        assert!(matches!(err, Error::NotFound { ref entry_id } if entry_id == "2"));
    }

    #[test]
    fn wrong_entry_key_is_a_metadata_error() {
        let err = parse_entry("3", ENTRY_10200).unwrap_err();
        assert!(matches!(err, Error::Metadata(_)));
        assert!(matches!(
            parse_entry("3", "not json"),
            Err(Error::Metadata(_))
        ));
    }

    #[tokio::test]
    async fn resolves_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/empiar/api/entry/10200"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ENTRY_10200))
            .mount(&server)
            .await;

        let api = EmpiarApi::new(format!("{}/empiar/api/entry/", server.uri())).unwrap();
        let meta = api.resolve("10200").await.unwrap();
        assert_eq!(meta.entry_id, "10200");
        assert_eq!(meta.directory, "data/Movies");
    }

    #[tokio::test]
    async fn http_errors_propagate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let api = EmpiarApi::new(server.uri()).unwrap();
        assert!(matches!(api.resolve("99999").await, Err(Error::Http(_))));
    }
}
