//! # Aggregation Store
//!
//! Shared, process-wide state combining the recommendations handed out to
//! every client. For each genre it keeps one running record per movie:
//! the combined average rating and how many contributions went into it.
//!
//! ## Combination rule
//! Each contribution carries that call's own average for the movie. The
//! stored value is the equal-weight fold of those per-call averages:
//!
//! ```text
//! new_avg = (old_avg * old_count + call_avg) / (old_count + 1)
//! ```
//!
//! This is an average of averages, not an average over the underlying
//! ratings, and it is kept that way on purpose.
//!
//! ## Locking
//! The store is sharded by genre. The outer `RwLock` only guards the genre
//! → shard map; each shard has its own `Mutex`. Contributions to different
//! genres never wait on each other, contributions to one genre are applied
//! one at a time. No lock is ever held across an `.await`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use serde::Serialize;
use tracing::debug;

use catalog::{Movie, MovieId};

/// Running recommendation for one movie within one genre
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationRecord {
    pub movie_id: MovieId,
    pub title: String,
    /// Genres of the movie when the record was created
    pub genres: Vec<String>,
    pub combined_avg: f64,
    pub count: u32,
}

impl RecommendationRecord {
    /// Fold one more per-call average into the running value
    fn fold(&mut self, call_avg: f64) {
        let count = f64::from(self.count);
        self.combined_avg = (self.combined_avg * count + call_avg) / (count + 1.0);
        self.count += 1;
    }
}

/// One movie's contribution from a single genre selection
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    pub movie_id: MovieId,
    pub title: String,
    pub genres: Vec<String>,
    /// The movie's average rating as computed for this call
    pub avg_rating: f64,
}

impl Contribution {
    pub fn new(movie: &Movie, avg_rating: f64) -> Self {
        Self {
            movie_id: movie.id,
            title: movie.title.clone(),
            genres: movie.genres.clone(),
            avg_rating,
        }
    }
}

/// Records of a single genre, in the order movies were first contributed
#[derive(Debug, Default)]
struct GenreShard {
    records: Vec<RecommendationRecord>,
    positions: HashMap<MovieId, usize>,
}

impl GenreShard {
    fn merge(&mut self, contribution: &Contribution) {
        match self.positions.get(&contribution.movie_id) {
            Some(&pos) => self.records[pos].fold(contribution.avg_rating),
            None => {
                self.positions
                    .insert(contribution.movie_id, self.records.len());
                self.records.push(RecommendationRecord {
                    movie_id: contribution.movie_id,
                    title: contribution.title.clone(),
                    genres: contribution.genres.clone(),
                    combined_avg: contribution.avg_rating,
                    count: 1,
                });
            }
        }
    }
}

type Shard = Arc<Mutex<GenreShard>>;

/// Genre-keyed store of combined recommendations, shared by all connections
#[derive(Debug, Default)]
pub struct AggregationStore {
    shards: RwLock<HashMap<String, Shard>>,
}

/// Records are plain data and every update finishes before the guard drops,
/// so a panic elsewhere can't leave a shard half-written.
fn lock(shard: &Shard) -> MutexGuard<'_, GenreShard> {
    shard.lock().unwrap_or_else(PoisonError::into_inner)
}

impl AggregationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn shard(&self, genre: &str) -> Option<Shard> {
        let shards = self.shards.read().unwrap_or_else(PoisonError::into_inner);
        shards.get(genre).cloned()
    }

    fn shard_or_insert(&self, genre: &str) -> Shard {
        if let Some(shard) = self.shard(genre) {
            return shard;
        }
        let mut shards = self.shards.write().unwrap_or_else(PoisonError::into_inner);
        shards.entry(genre.to_string()).or_default().clone()
    }

    /// Merge a call's contributions into the genre's records.
    ///
    /// An empty batch is a no-op and does not create the genre. The whole
    /// batch is applied under one acquisition of the genre's lock.
    pub fn contribute(&self, genre: &str, contributions: &[Contribution]) {
        if contributions.is_empty() {
            debug!(genre, "No contributions, store left untouched");
            return;
        }

        let shard = self.shard_or_insert(genre);
        let mut records = lock(&shard);
        for contribution in contributions {
            records.merge(contribution);
        }
        debug!(
            genre,
            merged = contributions.len(),
            total = records.records.len(),
            "Merged contributions"
        );
    }

    /// Copy of the first `limit` records stored for a genre.
    ///
    /// `None` when nothing was ever contributed to the genre.
    pub fn snapshot(&self, genre: &str, limit: usize) -> Option<Vec<RecommendationRecord>> {
        let shard = self.shard(genre)?;
        let records = lock(&shard);
        Some(records.records.iter().take(limit).cloned().collect())
    }

    /// Current record for a (genre, movie) pair
    pub fn record(&self, genre: &str, movie_id: MovieId) -> Option<RecommendationRecord> {
        let shard = self.shard(genre)?;
        let records = lock(&shard);
        let pos = *records.positions.get(&movie_id)?;
        Some(records.records[pos].clone())
    }

    /// Number of genres with at least one record
    pub fn genre_count(&self) -> usize {
        self.shards
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
