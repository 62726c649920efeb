/// Movie metadata providers
///
/// Enrichment is best effort: a provider reports failures through `AppResult`,
/// and `fetch_enrichment` turns any failure into `Enrichment::Unavailable` so a
/// broken lookup never fails the surrounding request.
use crate::{
    error::AppResult,
    models::{Enrichment, ImdbId},
};

pub mod omdb;

pub use omdb::OmdbProvider;

/// Raw metadata object returned by a provider
pub type MetadataObject = serde_json::Map<String, serde_json::Value>;

/// Trait for movie metadata providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Looks up metadata for a single title
    ///
    /// Implementations make one attempt and do not cache.
    async fn lookup(&self, imdb_id: &ImdbId) -> AppResult<MetadataObject>;
}

/// Fetches metadata for a title, degrading to `Enrichment::Unavailable`
pub async fn fetch_enrichment(provider: &dyn MetadataProvider, imdb_id: &ImdbId) -> Enrichment {
    match provider.lookup(imdb_id).await {
        Ok(details) => Enrichment::Found(details),
        Err(e) => {
            tracing::warn!(imdb_id = %imdb_id, error = %e, "Metadata lookup failed");
            Enrichment::Unavailable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use serde_json::json;

    fn imdb(number: u64) -> ImdbId {
        ImdbId::new(number).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_enrichment_success() {
        let mut provider = MockMetadataProvider::new();
        provider
            .expect_lookup()
            .withf(|id| id.to_string() == "tt0000125")
            .times(1)
            .returning(|_| {
                let mut details = MetadataObject::new();
                details.insert("Title".to_string(), json!("Sherlock Jr."));
                Ok(details)
            });

        let enrichment = fetch_enrichment(&provider, &imdb(125)).await;
        match enrichment {
            Enrichment::Found(details) => assert_eq!(details["Title"], "Sherlock Jr."),
            Enrichment::Unavailable => panic!("expected metadata"),
        }
    }

    #[tokio::test]
    async fn test_fetch_enrichment_degrades_on_error() {
        let mut provider = MockMetadataProvider::new();
        provider
            .expect_lookup()
            .times(1)
            .returning(|_| Err(AppError::ExternalApi("OMDb returned status 503".to_string())));

        let enrichment = fetch_enrichment(&provider, &imdb(125)).await;
        assert_eq!(enrichment, Enrichment::Unavailable);
    }
}
