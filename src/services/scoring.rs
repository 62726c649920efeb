/// Rating prediction
///
/// The pretrained model is a regression forest exported as JSON together with
/// the ordered list of feature names it was trained on. Both are loaded once at
/// startup; the feature order declared here is the only source of truth for how
/// feature rows are laid out.
use anyhow::{bail, ensure, Context};
use serde::Deserialize;
use std::{collections::HashSet, fs::File, io::BufReader, path::Path};

use crate::error::{AppError, AppResult};

/// Trait for rating predictors
pub trait RatingModel: Send + Sync {
    /// Feature names in the order each row must supply them
    fn feature_names(&self) -> &[String];

    /// Predicts one rating per row, in row order
    fn predict(&self, features: &FeatureMatrix) -> AppResult<Vec<f64>>;
}

/// Row-major matrix of feature values
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    width: usize,
    rows: usize,
    values: Vec<f64>,
}

impl FeatureMatrix {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            rows: 0,
            values: Vec::new(),
        }
    }

    /// Appends a row, which must have exactly `width` values
    pub fn push_row(&mut self, row: &[f64]) -> AppResult<()> {
        if row.len() != self.width {
            return Err(AppError::Internal(format!(
                "Feature row has {} values, expected {}",
                row.len(),
                self.width
            )));
        }
        self.values.extend_from_slice(row);
        self.rows += 1;
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.rows).map(move |r| &self.values[r * self.width..(r + 1) * self.width])
    }
}

/// Node of a regression tree
///
/// Split nodes send a row left when `row[feature] <= threshold`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// Regression tree stored as a flat node list rooted at index 0
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Checks that traversal from the root always reaches a leaf
    fn validate(&self, n_features: usize) -> anyhow::Result<()> {
        ensure!(!self.nodes.is_empty(), "tree has no nodes");

        for (index, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature,
                left,
                right,
                ..
            } = node
            {
                ensure!(
                    *feature < n_features,
                    "node {} splits on feature {} of {}",
                    index,
                    feature,
                    n_features
                );
                // Children after their parent rules out cycles
                for child in [*left, *right] {
                    ensure!(
                        child > index && child < self.nodes.len(),
                        "node {} has invalid child {}",
                        index,
                        child
                    );
                }
            }
        }

        Ok(())
    }

    fn predict(&self, row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// On-disk model layout
#[derive(Debug, Deserialize)]
struct ForestArtifact {
    n_features: usize,
    trees: Vec<RegressionTree>,
}

/// Random forest regressor: the mean of its trees' predictions
#[derive(Debug, Clone)]
pub struct ForestModel {
    feature_names: Vec<String>,
    trees: Vec<RegressionTree>,
}

impl ForestModel {
    /// Builds a model after validating its trees against the feature list
    pub fn new(feature_names: Vec<String>, trees: Vec<RegressionTree>) -> anyhow::Result<Self> {
        ensure!(!feature_names.is_empty(), "feature list is empty");
        let mut seen = HashSet::new();
        for name in &feature_names {
            ensure!(seen.insert(name), "feature '{}' is listed twice", name);
        }

        ensure!(!trees.is_empty(), "model has no trees");
        for (index, tree) in trees.iter().enumerate() {
            tree.validate(feature_names.len())
                .with_context(|| format!("tree {} is malformed", index))?;
        }

        Ok(Self {
            feature_names,
            trees,
        })
    }

    /// Loads the model artifact and its feature list
    pub fn load(
        model_path: impl AsRef<Path>,
        features_path: impl AsRef<Path>,
    ) -> anyhow::Result<Self> {
        let model_path = model_path.as_ref();
        let features_path = features_path.as_ref();

        let feature_names: Vec<String> = read_json(features_path)
            .with_context(|| format!("Failed to load feature list {}", features_path.display()))?;
        let artifact: ForestArtifact = read_json(model_path)
            .with_context(|| format!("Failed to load model {}", model_path.display()))?;

        if artifact.n_features != feature_names.len() {
            bail!(
                "Model expects {} features but {} lists {}",
                artifact.n_features,
                features_path.display(),
                feature_names.len()
            );
        }

        let model = Self::new(feature_names, artifact.trees)
            .with_context(|| format!("Invalid model {}", model_path.display()))?;

        tracing::info!(
            path = %model_path.display(),
            trees = model.trees.len(),
            features = model.feature_names.len(),
            "Loaded rating model"
        );

        Ok(model)
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

impl RatingModel for ForestModel {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, features: &FeatureMatrix) -> AppResult<Vec<f64>> {
        if features.width() != self.feature_names.len() {
            return Err(AppError::Internal(format!(
                "Feature matrix has {} columns, model expects {}",
                features.width(),
                self.feature_names.len()
            )));
        }

        let tree_count = self.trees.len() as f64;
        Ok(features
            .rows()
            .map(|row| self.trees.iter().map(|t| t.predict(row)).sum::<f64>() / tree_count)
            .collect())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
