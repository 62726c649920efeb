use std::{sync::Arc, time::Duration};

use anyhow::Context;

use crate::{
    config::Config,
    db::Catalog,
    services::{
        providers::{MetadataProvider, OmdbProvider},
        scoring::{ForestModel, RatingModel},
    },
};

/// Shared application state
///
/// Everything here is loaded before the server starts and is only ever read
/// afterwards, so requests share it without locking.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub model: Arc<dyn RatingModel>,
    pub metadata: Arc<dyn MetadataProvider>,
}

impl AppState {
    /// Creates the state, checking that the catalog carries every model feature
    pub fn new(
        catalog: Catalog,
        model: impl RatingModel + 'static,
        metadata: impl MetadataProvider + 'static,
    ) -> anyhow::Result<Self> {
        catalog
            .feature_columns(model.feature_names())
            .context("Dataset does not match the model's feature list")?;

        Ok(Self {
            catalog: Arc::new(catalog),
            model: Arc::new(model),
            metadata: Arc::new(metadata),
        })
    }

    /// Loads the dataset, model and feature list named in the configuration
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let catalog = Catalog::load(&config.dataset_path)?;
        let model = ForestModel::load(&config.model_path, &config.feature_columns_path)?;
        let metadata = OmdbProvider::new(
            config.api_key.clone(),
            config.omdb_api_url.clone(),
            config.omdb_timeout_secs.map(Duration::from_secs),
        )
        .context("Failed to build OMDb client")?;

        tracing::info!(
            movies = catalog.len(),
            genres = ?catalog.genre_columns(),
            features = model.feature_names().len(),
            trees = model.tree_count(),
            "Recommendation state ready"
        );

        Self::new(catalog, model, metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::MockMetadataProvider;
    use crate::services::scoring::{RegressionTree, TreeNode};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const DATASET: &str = "\
movieId,imdbId_y,title,genres,avg_rating,rating_count,Comedy
1,114709,Toy Story (1995),Comedy,3.9,215,1
";

    fn model(features: &[&str]) -> ForestModel {
        ForestModel::new(
            features.iter().map(|s| s.to_string()).collect(),
            vec![RegressionTree {
                nodes: vec![TreeNode::Leaf { value: 3.0 }],
            }],
        )
        .unwrap()
    }

    #[test]
    fn test_new_accepts_matching_features() {
        let catalog = Catalog::from_reader(DATASET.as_bytes()).unwrap();
        let state = AppState::new(
            catalog,
            model(&["avg_rating", "rating_count"]),
            MockMetadataProvider::new(),
        );
        assert!(state.is_ok());
    }

    #[test]
    fn test_new_rejects_unknown_feature() {
        let catalog = Catalog::from_reader(DATASET.as_bytes()).unwrap();
        let state = AppState::new(
            catalog,
            model(&["avg_rating", "runtime"]),
            MockMetadataProvider::new(),
        );
        assert!(state.is_err());
    }

    #[test]
    fn test_from_config_loads_all_artifacts() -> anyhow::Result<()> {
        let mut dataset = NamedTempFile::new()?;
        dataset.write_all(DATASET.as_bytes())?;
        let mut features = NamedTempFile::new()?;
        write!(features, r#"["avg_rating"]"#)?;
        let mut model_file = NamedTempFile::new()?;
        write!(model_file, r#"{{"n_features": 1, "trees": [{{"nodes": [{{"value": 3.5}}]}}]}}"#)?;

        let config = Config {
            api_key: "key".to_string(),
            omdb_api_url: "http://127.0.0.1:9/".to_string(),
            omdb_timeout_secs: Some(1),
            model_path: model_file.path().display().to_string(),
            feature_columns_path: features.path().display().to_string(),
            dataset_path: dataset.path().display().to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
        };

        let state = AppState::from_config(&config)?;
        assert_eq!(state.catalog.len(), 1);
        assert_eq!(state.model.feature_names(), &["avg_rating"]);

        let missing = Config {
            dataset_path: "/nonexistent/merged_with_imdb.csv".to_string(),
            ..config
        };
        assert!(AppState::from_config(&missing).is_err());
        Ok(())
    }
}
