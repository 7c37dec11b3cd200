//! Core domain types for the movie catalog.
//!
//! Genres are free-text strings here: the catalog files carry whatever genre
//! labels their producer used, and the server matches them by substring.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// =============================================================================
// Type Aliases
// =============================================================================

/// Identifier of the user who submitted a rating
pub type UserId = i64;

/// Unique identifier for a movie
///
/// Signed, so a negative id in the file stays its own movie instead of
/// collapsing into the zero used for unparseable text.
pub type MovieId = i64;

// =============================================================================
// Movie / Rating
// =============================================================================

/// Represents a movie in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    /// Genre labels in file order. Duplicates are kept as parsed.
    pub genres: Vec<String>,
}

/// A single score given by a user to a movie
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub rating: f64,
}

// =============================================================================
// Statistics Types
// =============================================================================

/// Precomputed statistics for a movie
///
/// Computed once after loading; movies without ratings have no entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovieStats {
    pub avg_rating: f64,
    pub rating_count: u32,
}

// =============================================================================
// Catalog - the read-only in-memory database
// =============================================================================

/// Holds every movie and rating, plus the indices the server queries.
///
/// Built once at startup and shared behind an `Arc` afterwards. Nothing
/// mutates it after loading, so readers need no synchronization.
#[derive(Debug)]
pub struct Catalog {
    /// Ordered by id so every enumeration is deterministic
    pub(crate) movies: BTreeMap<MovieId, Movie>,
    /// All ratings received by each movie
    pub(crate) movie_ratings: HashMap<MovieId, Vec<Rating>>,
    pub(crate) movie_stats: HashMap<MovieId, MovieStats>,
}

impl Catalog {
    /// Creates a new, empty catalog
    pub fn new() -> Self {
        Self {
            movies: BTreeMap::new(),
            movie_ratings: HashMap::new(),
            movie_stats: HashMap::new(),
        }
    }

    /// Get a movie by ID
    pub fn get_movie(&self, id: MovieId) -> Option<&Movie> {
        self.movies.get(&id)
    }

    /// Iterate over all movies in ascending id order
    pub fn movies(&self) -> impl Iterator<Item = &Movie> {
        self.movies.values()
    }

    /// Get all ratings for a movie
    pub fn get_movie_ratings(&self, movie_id: MovieId) -> &[Rating] {
        self.movie_ratings
            .get(&movie_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Get precomputed statistics for a movie
    pub fn get_movie_stats(&self, movie_id: MovieId) -> Option<&MovieStats> {
        self.movie_stats.get(&movie_id)
    }

    /// Insert a movie, replacing any previous movie with the same id
    pub fn insert_movie(&mut self, movie: Movie) {
        self.movies.insert(movie.id, movie);
    }

    /// Insert a rating
    ///
    /// Drops the movie's precomputed stats; queries fall back to the raw
    /// ratings until `compute_movie_stats` runs again.
    pub fn insert_rating(&mut self, rating: Rating) {
        self.movie_stats.remove(&rating.movie_id);
        self.movie_ratings
            .entry(rating.movie_id)
            .or_default()
            .push(rating);
    }

    /// Get (movies, ratings) counts for logging
    pub fn counts(&self) -> (usize, usize) {
        let total_ratings = self.movie_ratings.values().map(|v| v.len()).sum();
        (self.movies.len(), total_ratings)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
