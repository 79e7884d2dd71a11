//! Dataset loader - shows, users and ratings from JSON
//!
//! The dataset is a single JSON document:
//! - `shows`: ordered list of `{name, x, y, z}` (index = identity)
//! - `users`: ordered list of `{id, name, x, y, z}`
//! - `ratings`: user id -> list of watched show indices
//!
//! Sources can be local files (plain or `.gz`) or `http(s)://` URLs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Fetch failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server returned status {0}")]
    Status(u16),
    #[error("Invalid dataset JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A show point: display name + position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowRecord {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// A user point: id, display name + position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl ShowRecord {
    pub fn position(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

impl UserRecord {
    pub fn position(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

/// Full visualization dataset
///
/// Ratings keep raw JSON integers; negative or out-of-range indices are
/// skipped wherever they are resolved against `shows`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub shows: Vec<ShowRecord>,
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub ratings: HashMap<String, Vec<i64>>,
}

impl Dataset {
    /// Parse a dataset from raw JSON bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DatasetError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Resolve a raw rating index to a valid show index
    pub fn show_index(&self, raw: i64) -> Option<usize> {
        usize::try_from(raw).ok().filter(|&i| i < self.shows.len())
    }

    /// Watched show indices for a user, in dataset order (invalid entries dropped)
    pub fn watched(&self, user_id: &str) -> Vec<usize> {
        self.ratings
            .get(user_id)
            .map(|raw| raw.iter().filter_map(|&i| self.show_index(i)).collect())
            .unwrap_or_default()
    }

    /// Number of rating entries that point at no show
    pub fn dangling_ratings(&self) -> usize {
        self.ratings
            .values()
            .flatten()
            .filter(|&&i| self.show_index(i).is_none())
            .count()
    }
}

/// Where the dataset comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    File(PathBuf),
    Url(String),
}

impl FromStr for DatasetSource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with("http://") || s.starts_with("https://") {
            Ok(DatasetSource::Url(s.to_string()))
        } else {
            Ok(DatasetSource::File(PathBuf::from(s)))
        }
    }
}

impl std::fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetSource::File(path) => write!(f, "{}", path.display()),
            DatasetSource::Url(url) => write!(f, "{}", url),
        }
    }
}

/// Load and parse a dataset
pub async fn load(source: &DatasetSource) -> Result<Dataset, DatasetError> {
    tracing::debug!("Loading dataset from {}", source);

    let bytes = match source {
        DatasetSource::File(path) => {
            let raw = tokio::fs::read(path).await.map_err(|e| DatasetError::Io {
                path: path.clone(),
                source: e,
            })?;
            if path.extension().is_some_and(|ext| ext == "gz") {
                gunzip(&raw).map_err(|e| DatasetError::Io {
                    path: path.clone(),
                    source: e,
                })?
            } else {
                raw
            }
        }
        DatasetSource::Url(url) => fetch(url).await?,
    };
    tracing::debug!("Read {} bytes of dataset JSON", bytes.len());

    Dataset::from_slice(&bytes)
}

/// Load a dataset, falling back to an empty one on failure
///
/// This is the only recognized failure of the viewer: it is logged and the
/// scene simply stays empty.
pub async fn load_or_empty(source: &DatasetSource) -> Dataset {
    match load(source).await {
        Ok(dataset) => {
            tracing::info!(
                "Successfully loaded {} shows and {} users from {}",
                dataset.shows.len(),
                dataset.users.len(),
                source
            );
            let dangling = dataset.dangling_ratings();
            if dangling > 0 {
                tracing::debug!("{} rating entries reference unknown shows", dangling);
            }
            dataset
        }
        Err(e) => {
            tracing::error!("Failed to load or process visualization data from {}: {}", source, e);
            Dataset::default()
        }
    }
}

async fn fetch(url: &str) -> Result<Vec<u8>, DatasetError> {
    tracing::info!("Fetching dataset: {}", url);

    let client = reqwest::Client::new();
    let response = client
        .get(url)
        .header("User-Agent", "TvShowVisualizer/0.1")
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(DatasetError::Status(response.status().as_u16()));
    }

    Ok(response.bytes().await?.to_vec())
}

fn gunzip(raw: &[u8]) -> std::io::Result<Vec<u8>> {
    use flate2::read::GzDecoder;

    let mut decoder = GzDecoder::new(raw);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "shows": [
            {"name": "Show A", "x": 1.0, "y": 2.0, "z": 3.0},
            {"name": "Show B", "x": -1.0, "y": 0.5, "z": 0.0}
        ],
        "users": [
            {"id": "u1", "name": "User One", "x": 0.0, "y": 0.0, "z": 10.0}
        ],
        "ratings": {"u1": [1, 0, 7, -2]}
    }"#;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("tvviz_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_parse_sample() {
        let dataset = Dataset::from_slice(SAMPLE.as_bytes()).unwrap();
        assert_eq!(dataset.shows.len(), 2);
        assert_eq!(dataset.users.len(), 1);
        assert_eq!(dataset.shows[0].position(), [1.0, 2.0, 3.0]);
        assert_eq!(dataset.users[0].position(), [0.0, 0.0, 10.0]);
    }

    #[test]
    fn test_watched_skips_invalid_indices() {
        let dataset = Dataset::from_slice(SAMPLE.as_bytes()).unwrap();
        assert_eq!(dataset.watched("u1"), vec![1, 0]);
        assert_eq!(dataset.dangling_ratings(), 2);
        assert!(dataset.watched("nobody").is_empty());
    }

    #[test]
    fn test_missing_fields_default_empty() {
        let dataset = Dataset::from_slice(br#"{"shows": []}"#).unwrap();
        assert!(dataset.users.is_empty());
        assert!(dataset.ratings.is_empty());
    }

    #[test]
    fn test_source_from_str() {
        assert_eq!(
            "https://example.org/data.json".parse::<DatasetSource>().unwrap(),
            DatasetSource::Url("https://example.org/data.json".to_string())
        );
        assert_eq!(
            "visualization_data.json".parse::<DatasetSource>().unwrap(),
            DatasetSource::File(PathBuf::from("visualization_data.json"))
        );
    }

    #[tokio::test]
    async fn test_load_plain_file() {
        let path = temp_path("plain.json");
        std::fs::write(&path, SAMPLE).unwrap();

        let dataset = load(&DatasetSource::File(path.clone())).await.unwrap();
        assert_eq!(dataset.shows.len(), 2);

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_load_gzip_file() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let path = temp_path("packed.json.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(SAMPLE.as_bytes()).unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let dataset = load(&DatasetSource::File(path.clone())).await.unwrap();
        assert_eq!(dataset.users[0].id, "u1");

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_load_failure_yields_empty_dataset() {
        let missing = DatasetSource::File(temp_path("does_not_exist.json"));
        assert!(matches!(load(&missing).await, Err(DatasetError::Io { .. })));

        let dataset = load_or_empty(&missing).await;
        assert!(dataset.shows.is_empty());
        assert!(dataset.users.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_json_yields_empty_dataset() {
        let path = temp_path("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let source = DatasetSource::File(path.clone());
        assert!(matches!(load(&source).await, Err(DatasetError::Json(_))));
        assert_eq!(load_or_empty(&source).await, Dataset::default());

        let _ = std::fs::remove_file(path);
    }
}
