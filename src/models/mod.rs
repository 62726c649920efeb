use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt::Display, str::FromStr};

pub mod movie;

pub use movie::{ImdbId, MovieRecord, MAX_IMDB_NUMBER};

/// Most results a single recommendation request returns
pub const MAX_RECOMMENDATIONS: usize = 10;

// ============================================================================
// Request Types
// ============================================================================

/// Body of `POST /recommend`
///
/// `genre` stays optional here so a missing or non-string genre reaches
/// validation and is reported like an unknown one.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RecommendationRequest {
    #[serde(default, deserialize_with = "string_or_none")]
    pub genre: Option<String>,
    #[serde(default, deserialize_with = "number_or_string")]
    pub min_rating: f64,
    #[serde(default, deserialize_with = "vote_count")]
    pub min_votes: u64,
}

impl RecommendationRequest {
    pub fn new(genre: impl Into<String>, min_rating: f64, min_votes: u64) -> Self {
        Self {
            genre: Some(genre.into()),
            min_rating,
            min_votes,
        }
    }
}

/// Keeps string values; any other JSON value becomes `None`
fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString<T> {
    Number(T),
    Text(String),
}

/// Accepts `4.5`, `"4.5"` or `null` (treated as the default)
fn number_or_string<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr + Default,
    T::Err: Display,
{
    match Option::<NumberOrString<T>>::deserialize(deserializer)? {
        None => Ok(T::default()),
        Some(NumberOrString::Number(n)) => Ok(n),
        Some(NumberOrString::Text(s)) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VoteCount {
    Integer(u64),
    Float(f64),
    Text(String),
}

/// Accepts `100`, `100.0` (truncated toward zero), `"100"` or `null`
fn vote_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<VoteCount>::deserialize(deserializer)? {
        None => Ok(0),
        Some(VoteCount::Integer(n)) => Ok(n),
        Some(VoteCount::Float(f)) => {
            let whole = f.trunc();
            if whole.is_finite() && whole >= 0.0 && whole <= u64::MAX as f64 {
                Ok(whole as u64)
            } else {
                Err(serde::de::Error::custom(format!(
                    "min_votes must be a non-negative number, got {}",
                    f
                )))
            }
        }
        Some(VoteCount::Text(s)) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// OMDb metadata attached to a recommendation
#[derive(Debug, Clone, PartialEq)]
pub enum Enrichment {
    /// Full OMDb response object
    Found(serde_json::Map<String, serde_json::Value>),
    /// Lookup failed; serialized as `{}`
    Unavailable,
}

impl Enrichment {
    pub fn is_found(&self) -> bool {
        matches!(self, Enrichment::Found(_))
    }
}

impl Serialize for Enrichment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Enrichment::Found(details) => details.serialize(serializer),
            Enrichment::Unavailable => serde_json::Map::new().serialize(serializer),
        }
    }
}

/// A scored and enriched movie
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Recommendation {
    #[serde(rename = "movieId")]
    pub movie_id: i64,
    #[serde(rename = "imdbId")]
    pub imdb_id: ImdbId,
    pub title: String,
    pub genres: String,
    pub avg_rating: f64,
    pub rating_count: u64,
    pub predicted_rating: f64,
    pub omdb_response: Enrichment,
}

/// Body of a successful `POST /recommend`
#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<Recommendation>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_defaults() {
        let request: RecommendationRequest =
            serde_json::from_value(json!({ "genre": "Comedy" })).unwrap();
        assert_eq!(request, RecommendationRequest::new("Comedy", 0.0, 0));
    }

    #[test]
    fn test_request_without_genre_still_parses() {
        let request: RecommendationRequest =
            serde_json::from_value(json!({ "min_rating": 3 })).unwrap();
        assert_eq!(request.genre, None);
        assert_eq!(request.min_rating, 3.0);
    }

    #[test]
    fn test_request_accepts_numeric_strings() {
        let request: RecommendationRequest = serde_json::from_value(json!({
            "genre": "Drama",
            "min_rating": "3.5",
            "min_votes": " 100 "
        }))
        .unwrap();
        assert_eq!(request.min_rating, 3.5);
        assert_eq!(request.min_votes, 100);
    }

    #[test]
    fn test_request_null_numbers_use_defaults() {
        let request: RecommendationRequest = serde_json::from_value(json!({
            "genre": "Drama",
            "min_rating": null,
            "min_votes": null
        }))
        .unwrap();
        assert_eq!(request.min_rating, 0.0);
        assert_eq!(request.min_votes, 0);
    }

    #[test]
    fn test_request_non_string_genre_becomes_none() {
        let genres = [json!(5), json!(["Comedy"]), json!({ "name": "Comedy" }), json!(null)];
        for genre in genres {
            let request: RecommendationRequest =
                serde_json::from_value(json!({ "genre": genre, "min_rating": 2 })).unwrap();
            assert_eq!(request.genre, None);
            assert_eq!(request.min_rating, 2.0);
        }
    }

    #[test]
    fn test_request_min_votes_accepts_floats() {
        let request: RecommendationRequest =
            serde_json::from_value(json!({ "genre": "Comedy", "min_votes": 5.0 })).unwrap();
        assert_eq!(request.min_votes, 5);

        let request: RecommendationRequest =
            serde_json::from_value(json!({ "genre": "Comedy", "min_votes": 7.9 })).unwrap();
        assert_eq!(request.min_votes, 7);

        let result: Result<RecommendationRequest, _> =
            serde_json::from_value(json!({ "genre": "Comedy", "min_votes": -2.0 }));
        assert!(result.is_err());
    }

    #[test]
    fn test_request_rejects_garbage_numbers() {
        let result: Result<RecommendationRequest, _> =
            serde_json::from_value(json!({ "genre": "Drama", "min_votes": "lots" }));
        assert!(result.is_err());

        let result: Result<RecommendationRequest, _> =
            serde_json::from_value(json!({ "genre": "Drama", "min_votes": -5 }));
        assert!(result.is_err());
    }

    #[test]
    fn test_unavailable_enrichment_serializes_as_empty_object() {
        let json = serde_json::to_value(Enrichment::Unavailable).unwrap();
        assert_eq!(json, json!({}));
    }

    #[test]
    fn test_recommendation_field_names() {
        let mut details = serde_json::Map::new();
        details.insert("Title".to_string(), json!("Heat"));

        let recommendation = Recommendation {
            movie_id: 6,
            imdb_id: ImdbId::new(113277).unwrap(),
            title: "Heat (1995)".to_string(),
            genres: "Action|Crime|Thriller".to_string(),
            avg_rating: 3.95,
            rating_count: 102,
            predicted_rating: 3.9,
            omdb_response: Enrichment::Found(details),
        };

        let json = serde_json::to_value(&recommendation).unwrap();
        assert_eq!(json["movieId"], 6);
        assert_eq!(json["imdbId"], "tt0113277");
        assert_eq!(json["rating_count"], 102);
        assert_eq!(json["omdb_response"]["Title"], "Heat");
    }
}
