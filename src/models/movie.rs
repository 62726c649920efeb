use serde::{Serialize, Serializer};
use std::fmt::Display;

/// Largest numeric IMDb id that fits the 7-digit `tt` form
pub const MAX_IMDB_NUMBER: u32 = 9_999_999;

/// IMDb identifier, formatted as `tt` followed by 7 zero-padded digits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImdbId(u32);

impl ImdbId {
    /// Wraps a numeric IMDb id, rejecting values wider than 7 digits
    pub fn new(number: u64) -> Option<Self> {
        u32::try_from(number)
            .ok()
            .filter(|n| *n <= MAX_IMDB_NUMBER)
            .map(Self)
    }

    pub fn number(&self) -> u32 {
        self.0
    }
}

impl Display for ImdbId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tt{:07}", self.0)
    }
}

impl Serialize for ImdbId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One row of the movie catalog
#[derive(Debug, Clone, PartialEq)]
pub struct MovieRecord {
    pub movie_id: i64,
    pub imdb_id: ImdbId,
    pub title: String,
    /// Pipe-delimited genre list, e.g. `Action|Sci-Fi`
    pub genres: String,
    pub avg_rating: f64,
    pub rating_count: u64,
    /// Indicator per catalog genre column, in catalog column order
    pub genre_flags: Vec<bool>,
    /// Value per catalog numeric column, in catalog column order
    pub values: Vec<f64>,
}

impl MovieRecord {
    /// Genres as individual names
    pub fn genre_names(&self) -> impl Iterator<Item = &str> {
        self.genres
            .split('|')
            .map(str::trim)
            .filter(|g| !g.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imdb_id_is_zero_padded() {
        assert_eq!(ImdbId::new(125).unwrap().to_string(), "tt0000125");
        assert_eq!(ImdbId::new(1234567).unwrap().to_string(), "tt1234567");
        assert_eq!(ImdbId::new(0).unwrap().to_string(), "tt0000000");
    }

    #[test]
    fn test_imdb_id_rejects_more_than_seven_digits() {
        assert!(ImdbId::new(9_999_999).is_some());
        assert!(ImdbId::new(10_000_000).is_none());
        assert!(ImdbId::new(u64::MAX).is_none());
    }

    #[test]
    fn test_imdb_id_serializes_as_string() {
        let json = serde_json::to_string(&ImdbId::new(114709).unwrap()).unwrap();
        assert_eq!(json, r#""tt0114709""#);
    }

    #[test]
    fn test_genre_names() {
        let movie = MovieRecord {
            movie_id: 1,
            imdb_id: ImdbId::new(114709).unwrap(),
            title: "Toy Story (1995)".to_string(),
            genres: "Adventure|Animation|Children".to_string(),
            avg_rating: 3.92,
            rating_count: 215,
            genre_flags: vec![],
            values: vec![],
        };

        let genres: Vec<&str> = movie.genre_names().collect();
        assert_eq!(genres, vec!["Adventure", "Animation", "Children"]);
    }
}
