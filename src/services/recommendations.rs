use std::cmp::Ordering;

use crate::{
    db::Catalog,
    error::{AppError, AppResult},
    models::{MovieRecord, Recommendation, RecommendationRequest, MAX_RECOMMENDATIONS},
    services::{
        providers::{fetch_enrichment, MetadataProvider},
        scoring::{FeatureMatrix, RatingModel},
    },
};

pub const INVALID_GENRE: &str = "Invalid or missing genre";

/// Recommends up to ten movies of a genre, best predicted rating first
///
/// Filters the catalog by genre and thresholds, scores the candidates with the
/// rating model, keeps the top ten (ties stay in catalog order) and attaches
/// OMDb metadata to each. Only an unknown or missing genre fails the request;
/// a failed metadata lookup leaves that entry with empty metadata.
pub async fn recommend(
    catalog: &Catalog,
    model: &dyn RatingModel,
    provider: &dyn MetadataProvider,
    request: RecommendationRequest,
) -> AppResult<Vec<Recommendation>> {
    let genre = request
        .genre
        .as_deref()
        .and_then(|name| catalog.genre(name))
        .ok_or_else(|| AppError::InvalidInput(INVALID_GENRE.to_string()))?;

    let candidates = catalog.filter(genre, request.min_rating, request.min_votes);
    if candidates.is_empty() {
        tracing::debug!("No movies matched the criteria");
        return Ok(Vec::new());
    }

    let predictions = score(catalog, model, &candidates)?;
    let ranked = rank(candidates.into_iter().zip(predictions).collect());

    let mut recommendations = Vec::with_capacity(ranked.len());
    for (movie, predicted_rating) in ranked {
        let omdb_response = fetch_enrichment(provider, &movie.imdb_id).await;
        recommendations.push(Recommendation {
            movie_id: movie.movie_id,
            imdb_id: movie.imdb_id,
            title: movie.title.clone(),
            genres: movie.genres.clone(),
            avg_rating: movie.avg_rating,
            rating_count: movie.rating_count,
            predicted_rating,
            omdb_response,
        });
    }

    let enriched = recommendations
        .iter()
        .filter(|r| r.omdb_response.is_found())
        .count();
    tracing::debug!(
        returned = recommendations.len(),
        enriched,
        "Recommendations assembled"
    );

    Ok(recommendations)
}

/// Predicts a rating per candidate, in candidate order
fn score(
    catalog: &Catalog,
    model: &dyn RatingModel,
    candidates: &[&MovieRecord],
) -> AppResult<Vec<f64>> {
    let columns = catalog.feature_columns(model.feature_names())?;

    let mut features = FeatureMatrix::new(columns.len());
    let mut row = Vec::with_capacity(columns.len());
    for movie in candidates {
        row.clear();
        row.extend(columns.iter().map(|&c| movie.values[c]));
        features.push_row(&row)?;
    }

    let predictions = model.predict(&features)?;
    if predictions.len() != candidates.len() {
        return Err(AppError::Internal(format!(
            "Model returned {} predictions for {} candidates",
            predictions.len(),
            candidates.len()
        )));
    }

    Ok(predictions)
}

/// Sorts by predicted rating, descending, and keeps the top entries
///
/// The sort is stable, so equal predictions keep their catalog order. NaN
/// predictions sort last.
fn rank(mut scored: Vec<(&MovieRecord, f64)>) -> Vec<(&MovieRecord, f64)> {
    scored.sort_by(|(_, a), (_, b)| {
        b.partial_cmp(a)
            .unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()))
    });
    scored.truncate(MAX_RECOMMENDATIONS);
    scored
}
