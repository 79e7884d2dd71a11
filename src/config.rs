//! Configuration loader - YAML viewer config + .env overrides

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::dataset::{Dataset, DatasetSource};
use crate::recommend::{Method, Recommendation, RecommendationTable};
use crate::scene::Palette;

/// Main configuration loaded from viewer.yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Dataset path or URL
    pub dataset: String,
    pub recommendations: RecommendationConfig,
    pub palette: Palette,
    pub viewer: ViewerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset: "visualization_data.json".to_string(),
            recommendations: RecommendationConfig::default(),
            palette: Palette::default(),
            viewer: ViewerConfig::default(),
        }
    }
}

/// Where recommendation connectors come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationMode {
    #[default]
    Static,
    UserUser,
    ItemItem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    pub mode: RecommendationMode,
    pub top_k: usize,
    pub table: RecommendationTable,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        let rec = |name: &str, index| Recommendation { name: name.to_string(), index };
        let mut table = HashMap::new();
        table.insert(
            "user_499".to_string(),
            vec![
                rec("FOX 28 News at 10pm", 99),
                rec("Family Guy", 82),
                rec("2009 NCAA Basketball Tournament", 46),
                rec("NBC 4 at Eleven", 65),
                rec("Two and a Half Men", 9),
            ],
        );

        Self {
            mode: RecommendationMode::Static,
            top_k: 5,
            table: RecommendationTable::new(table),
        }
    }
}

impl RecommendationConfig {
    /// Build the table the selection controller draws from
    pub fn build_table(&self, dataset: &Dataset) -> RecommendationTable {
        match self.mode {
            RecommendationMode::Static => self.table.clone(),
            RecommendationMode::UserUser => RecommendationTable::computed(dataset, Method::UserUser, self.top_k),
            RecommendationMode::ItemItem => RecommendationTable::computed(dataset, Method::ItemItem, self.top_k),
        }
    }
}

/// Window, camera and marker geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window_size: [f32; 2],
    pub camera_target: [f32; 3],
    pub camera_position: [f32; 3],
    pub show_radius: f32,
    pub user_size: f32,
    /// Pick tolerance in plot units
    pub pick_radius: f64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window_size: [1200.0, 800.0],
            camera_target: [40.0, 0.0, 0.0],
            camera_position: [40.0, 0.0, 100.0],
            show_radius: 0.3,
            user_size: 0.5,
            pick_radius: 1.0,
        }
    }
}

/// Overrides loaded from .env / environment
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub dataset: Option<String>,
    pub log_dir: String,
}

impl Config {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load if the file exists, defaults otherwise
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            tracing::info!("Loading config from {:?}", path);
            Self::load(path)
        } else {
            tracing::warn!("Config file not found: {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Dataset location: CLI flag beats env beats config file
    pub fn dataset_source(&self, cli: Option<&str>, env: &EnvOverrides) -> DatasetSource {
        let raw = cli
            .or(env.dataset.as_deref())
            .unwrap_or(self.dataset.as_str());
        match raw.parse() {
            Ok(source) => source,
            Err(never) => match never {},
        }
    }
}

impl EnvOverrides {
    /// Load overrides from .env file
    pub fn load() -> Self {
        dotenvy::dotenv().ok();

        EnvOverrides {
            dataset: std::env::var("TVVIZ_DATASET").ok(),
            log_dir: std::env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_defaults_from_partial_yaml() {
        let config: Config = serde_yaml::from_str("dataset: data/shows.json\n").unwrap();
        assert_eq!(config.dataset, "data/shows.json");
        assert_eq!(config.recommendations.mode, RecommendationMode::Static);
        assert_eq!(config.recommendations.top_k, 5);
        assert_eq!(config.viewer.camera_target, [40.0, 0.0, 0.0]);
        assert_eq!(config.palette, Palette::default());
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let config: Config = serde_yaml::from_str(include_str!("../viewer.yaml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_default_static_table() {
        let table = RecommendationConfig::default().table;
        let recs = table.get("user_499").unwrap();
        let indices: Vec<usize> = recs.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![99, 82, 46, 65, 9]);
        assert_eq!(recs[1].name, "Family Guy");
    }

    #[test]
    fn test_yaml_table_and_mode() {
        let yaml = r#"
recommendations:
  mode: item_item
  top_k: 3
  table:
    u7:
      - { name: "Lost", index: 4 }
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.recommendations.mode, RecommendationMode::ItemItem);
        assert_eq!(config.recommendations.top_k, 3);
        assert_eq!(config.recommendations.table.get("u7").unwrap()[0].index, 4);
    }

    #[test]
    fn test_dataset_source_precedence() {
        let config = Config::default();
        let env = EnvOverrides { dataset: Some("https://host/data.json".into()), log_dir: "logs".into() };

        assert_eq!(
            config.dataset_source(Some("local.json"), &env),
            DatasetSource::File(PathBuf::from("local.json"))
        );
        assert_eq!(
            config.dataset_source(None, &env),
            DatasetSource::Url("https://host/data.json".into())
        );
        assert_eq!(
            config.dataset_source(None, &EnvOverrides::default()),
            DatasetSource::File(PathBuf::from("visualization_data.json"))
        );
    }
}
