/// In-memory movie catalog
///
/// Loaded once from the merged CSV dataset and never mutated afterwards. Genre
/// indicator columns and numeric feature columns are resolved to positional
/// indices at load time so request-time lookups cannot hit a missing key.
use anyhow::{anyhow, bail, Context};
use std::{
    collections::{BTreeSet, HashMap},
    io::Read,
    path::Path,
};

use crate::{
    error::{AppError, AppResult},
    models::{ImdbId, MovieRecord},
};

const MOVIE_ID: &str = "movieId";
const IMDB_ID: &str = "imdbId";
/// Name the merge step gives the IMDb column
const IMDB_ID_MERGED: &str = "imdbId_y";
const TITLE: &str = "title";
const GENRES: &str = "genres";
const AVG_RATING: &str = "avg_rating";
const RATING_COUNT: &str = "rating_count";

/// Handle to a validated genre indicator column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenreColumn(usize);

/// Read-only movie table
#[derive(Debug)]
pub struct Catalog {
    movies: Vec<MovieRecord>,
    genre_columns: Vec<String>,
    numeric_columns: Vec<String>,
    numeric_index: HashMap<String, usize>,
}

/// Positions of the fixed columns within the numeric columns
struct FixedColumns {
    movie_id: usize,
    imdb_id: usize,
    avg_rating: usize,
    rating_count: usize,
}

impl Catalog {
    /// Loads the catalog from a CSV file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open dataset {}", path.display()))?;
        let catalog = Self::from_reader(file)
            .with_context(|| format!("Failed to load dataset {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            movies = catalog.len(),
            genre_columns = catalog.genre_columns.len(),
            numeric_columns = catalog.numeric_columns.len(),
            "Loaded movie catalog"
        );

        Ok(catalog)
    }

    /// Parses a catalog from CSV data with a header row
    pub fn from_reader<R: Read>(reader: R) -> anyhow::Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers = reader.headers().context("Failed to read CSV header")?.clone();

        let mut seen = BTreeSet::new();
        for name in headers.iter() {
            if !seen.insert(name) {
                bail!("Duplicate column '{}'", name);
            }
        }

        let text_position = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| anyhow!("Missing required column '{}'", name))
        };
        let title_at = text_position(TITLE)?;
        let genres_at = text_position(GENRES)?;

        // Every column other than title and genres holds numbers
        let numeric_positions: Vec<usize> = (0..headers.len())
            .filter(|&i| i != title_at && i != genres_at)
            .collect();
        let numeric_columns: Vec<String> = numeric_positions
            .iter()
            .map(|&i| headers[i].to_string())
            .collect();
        let numeric_index: HashMap<String, usize> = numeric_columns
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        let numeric = |name: &str| {
            numeric_index
                .get(name)
                .copied()
                .ok_or_else(|| anyhow!("Missing required column '{}'", name))
        };
        let fixed = FixedColumns {
            movie_id: numeric(MOVIE_ID)?,
            imdb_id: numeric(IMDB_ID_MERGED).or_else(|_| numeric(IMDB_ID))?,
            avg_rating: numeric(AVG_RATING)?,
            rating_count: numeric(RATING_COUNT)?,
        };

        let mut rows = Vec::new();
        for (line, result) in reader.records().enumerate() {
            // Header is line 1
            let line = line + 2;
            let record = result.with_context(|| format!("Malformed CSV at line {}", line))?;

            let mut values = Vec::with_capacity(numeric_positions.len());
            for (column, &position) in numeric_columns.iter().zip(&numeric_positions) {
                let cell = record.get(position).unwrap_or("").trim();
                values.push(parse_number(cell).with_context(|| {
                    format!("Line {}: column '{}' is not numeric", line, column)
                })?);
            }

            let title = record.get(title_at).unwrap_or("").to_string();
            let genres = record.get(genres_at).unwrap_or("").to_string();
            rows.push((title, genres, values));
        }

        // A numeric column is a genre indicator when some movie lists it as a
        // genre, or when it holds only 0/1 flags (a genre no movie carries)
        let genre_names: BTreeSet<&str> = rows
            .iter()
            .flat_map(|(_, genres, _)| genres.split('|').map(str::trim))
            .filter(|g| !g.is_empty())
            .collect();
        let fixed_positions = [
            fixed.movie_id,
            fixed.imdb_id,
            fixed.avg_rating,
            fixed.rating_count,
        ];
        let is_flag_column = |i: usize| {
            !rows.is_empty()
                && !fixed_positions.contains(&i)
                && rows.iter().all(|(_, _, values)| values[i] == 0.0 || values[i] == 1.0)
        };
        let genre_columns: Vec<String> = numeric_columns
            .iter()
            .enumerate()
            .filter(|(i, name)| genre_names.contains(name.as_str()) || is_flag_column(*i))
            .map(|(_, name)| name.clone())
            .collect();
        let genre_positions: Vec<usize> = genre_columns.iter().map(|g| numeric_index[g]).collect();

        let mut movies = Vec::with_capacity(rows.len());
        for (row, (title, genres, values)) in rows.into_iter().enumerate() {
            let line = row + 2;
            let movie_id = as_integer(values[fixed.movie_id])
                .with_context(|| format!("Line {}: invalid {}", line, MOVIE_ID))?;
            let imdb_number = as_integer(values[fixed.imdb_id])
                .and_then(|n| u64::try_from(n).ok())
                .and_then(ImdbId::new)
                .ok_or_else(|| anyhow!("Line {}: invalid {}", line, IMDB_ID))?;
            let rating_count = as_integer(values[fixed.rating_count])
                .and_then(|n| u64::try_from(n).ok())
                .ok_or_else(|| anyhow!("Line {}: invalid {}", line, RATING_COUNT))?;
            let avg_rating = values[fixed.avg_rating];
            if !avg_rating.is_finite() {
                bail!("Line {}: invalid {}", line, AVG_RATING);
            }

            let genre_flags = genre_positions.iter().map(|&i| values[i] == 1.0).collect();

            movies.push(MovieRecord {
                movie_id,
                imdb_id: imdb_number,
                title,
                genres,
                avg_rating,
                rating_count,
                genre_flags,
                values,
            });
        }

        Ok(Self {
            movies,
            genre_columns,
            numeric_columns,
            numeric_index,
        })
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    /// All movies in load order
    pub fn movies(&self) -> &[MovieRecord] {
        &self.movies
    }

    /// Names of the genre indicator columns, in column order
    pub fn genre_columns(&self) -> &[String] {
        &self.genre_columns
    }

    /// Names of the numeric columns, in column order
    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric_columns
    }

    /// Resolves a genre name to its indicator column
    pub fn genre(&self, name: &str) -> Option<GenreColumn> {
        self.genre_columns
            .iter()
            .position(|g| g == name)
            .map(GenreColumn)
    }

    /// Movies flagged with `genre` that meet both thresholds, in load order
    pub fn filter(&self, genre: GenreColumn, min_rating: f64, min_votes: u64) -> Vec<&MovieRecord> {
        self.movies
            .iter()
            .filter(|m| {
                m.genre_flags[genre.0] && m.rating_count >= min_votes && m.avg_rating >= min_rating
            })
            .collect()
    }

    /// Maps feature names to positions in `MovieRecord::values`
    ///
    /// Fails when a name is not a numeric column of this catalog.
    pub fn feature_columns(&self, names: &[String]) -> AppResult<Vec<usize>> {
        names
            .iter()
            .map(|name| {
                self.numeric_index.get(name).copied().ok_or_else(|| {
                    AppError::Internal(format!("Feature '{}' is not a catalog column", name))
                })
            })
            .collect()
    }
}

fn parse_number(cell: &str) -> anyhow::Result<f64> {
    if cell.is_empty() {
        return Ok(f64::NAN);
    }
    Ok(cell.parse::<f64>()?)
}

/// Integral value of a cell such as `42` or `42.0`
fn as_integer(value: f64) -> Option<i64> {
    (value.is_finite() && value.fract() == 0.0).then_some(value as i64)
}
