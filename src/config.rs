use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// OMDb API key
    pub api_key: String,

    /// OMDb API base URL
    #[serde(default = "default_omdb_api_url")]
    pub omdb_api_url: String,

    /// Optional timeout for OMDb lookups, in seconds
    #[serde(default)]
    pub omdb_timeout_secs: Option<u64>,

    /// Serialized regression forest
    #[serde(default = "default_model_path")]
    pub model_path: String,

    /// Ordered feature names the model was trained on
    #[serde(default = "default_feature_columns_path")]
    pub feature_columns_path: String,

    /// Merged movie dataset
    #[serde(default = "default_dataset_path")]
    pub dataset_path: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_omdb_api_url() -> String {
    "http://www.omdbapi.com/".to_string()
}

fn default_model_path() -> String {
    "random_forest_movie_rating_model.json".to_string()
}

fn default_feature_columns_path() -> String {
    "feature_columns.json".to_string()
}

fn default_dataset_path() -> String {
    "merged_with_imdb.csv".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Socket address the server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
