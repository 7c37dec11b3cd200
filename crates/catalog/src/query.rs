//! Genre ranking and movie lookups used by the recommendation server.

use crate::index::mean;
use crate::types::*;
use std::collections::HashMap;

/// A genre label and how many times it occurs across the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenreCount {
    pub genre: String,
    pub count: usize,
}

impl Catalog {
    /// Rank genre labels by how often they occur, most frequent first.
    ///
    /// Every occurrence counts, so a movie listing the same genre twice adds
    /// two. Ties are ordered by genre name. At most `limit` entries.
    pub fn genre_counts(&self, limit: usize) -> Vec<GenreCount> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for movie in self.movies() {
            for genre in &movie.genres {
                *counts.entry(genre.as_str()).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<GenreCount> = counts
            .into_iter()
            .map(|(genre, count)| GenreCount {
                genre: genre.to_string(),
                count,
            })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.genre.cmp(&b.genre)));
        ranked.truncate(limit);
        ranked
    }

    /// Genre names in popularity order, at most `limit`
    pub fn genres_by_popularity(&self, limit: usize) -> Vec<String> {
        self.genre_counts(limit)
            .into_iter()
            .map(|g| g.genre)
            .collect()
    }

    /// Movies having a genre that contains `genre`, ignoring case.
    ///
    /// This is a substring match: "sci-fi" also finds "Sci-Fi-Action".
    /// Movies are visited in id order and the first `limit` matches returned.
    pub fn movies_matching_genre(&self, genre: &str, limit: usize) -> Vec<&Movie> {
        let needle = genre.to_lowercase();
        self.movies()
            .filter(|movie| {
                movie
                    .genres
                    .iter()
                    .any(|g| g.to_lowercase().contains(&needle))
            })
            .take(limit)
            .collect()
    }

    /// Mean score of a movie, 0.0 when it has no ratings
    pub fn average_rating(&self, movie_id: MovieId) -> f64 {
        match self.get_movie_stats(movie_id) {
            Some(stats) => stats.avg_rating,
            None => mean(self.get_movie_ratings(movie_id).iter().map(|r| r.rating)),
        }
    }
}
