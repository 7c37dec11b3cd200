//! # Recommendation Service
//!
//! Ties the read-only catalog to the shared aggregation store:
//! 1. Offer the most popular genres as a menu
//! 2. Find candidate movies for the selected genre
//! 3. Merge the candidates into the store
//! 4. Read back the combined records for the genre
//!
//! Steps 3 and 4 take the genre's lock separately. Another client's merge
//! can land in between, so a reply may include movies that client added.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument};

use catalog::{Catalog, Movie};

use crate::config::ServerConfig;
use crate::store::{AggregationStore, Contribution, RecommendationRecord};

/// Shared by every connection; cloning only bumps reference counts
#[derive(Debug, Clone)]
pub struct RecommendationService {
    catalog: Arc<Catalog>,
    store: Arc<AggregationStore>,
    menu_size: usize,
    limit: usize,
}

impl RecommendationService {
    /// Create a service with an empty aggregation store
    ///
    /// # Arguments
    /// * `catalog` - Loaded catalog, shared read-only
    /// * `menu_size` - Number of genres offered to clients (15 on the wire)
    /// * `limit` - Candidates per call and records per reply (5 on the wire)
    pub fn new(catalog: Arc<Catalog>, menu_size: usize, limit: usize) -> Self {
        Self::with_store(catalog, Arc::new(AggregationStore::new()), menu_size, limit)
    }

    /// Create a service around an existing store
    pub fn with_store(
        catalog: Arc<Catalog>,
        store: Arc<AggregationStore>,
        menu_size: usize,
        limit: usize,
    ) -> Self {
        Self {
            catalog,
            store,
            menu_size,
            limit,
        }
    }

    pub fn from_config(catalog: Arc<Catalog>, config: &ServerConfig) -> Self {
        Self::new(catalog, config.menu_size, config.recommendation_limit)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn store(&self) -> &AggregationStore {
        &self.store
    }

    /// Genres offered to clients, most popular first
    pub fn genre_menu(&self) -> Vec<String> {
        self.catalog.genres_by_popularity(self.menu_size)
    }

    /// Movies matching the genre, at most `limit`
    pub fn candidates(&self, genre: &str) -> Vec<&Movie> {
        self.catalog.movies_matching_genre(genre, self.limit)
    }

    /// Fold candidates into the store under `genre`
    ///
    /// Averages come from the immutable catalog, so they are computed before
    /// the genre's lock is taken.
    pub fn contribute(&self, genre: &str, candidates: &[&Movie]) {
        let contributions: Vec<Contribution> = candidates
            .iter()
            .map(|movie| Contribution::new(movie, self.catalog.average_rating(movie.id)))
            .collect();
        self.store.contribute(genre, &contributions);
    }

    /// Full recommendation step for one genre selection
    ///
    /// # Returns
    /// The first `limit` combined records for the genre, or `None` when the
    /// genre has never received any candidate.
    #[instrument(skip(self))]
    pub fn recommend(&self, genre: &str) -> Option<Vec<RecommendationRecord>> {
        let start_time = Instant::now();

        let candidates = self.candidates(genre);
        debug!("Found {} candidates", candidates.len());

        self.contribute(genre, &candidates);

        let records = self.store.snapshot(genre, self.limit);
        info!(
            "Recommended {} movies in {:.2?}",
            records.as_ref().map_or(0, Vec::len),
            start_time.elapsed()
        );
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::Rating;

    // ============================================================================
    // Test Fixtures
    // ============================================================================

    fn build_test_catalog() -> Arc<Catalog> {
        let mut catalog = Catalog::new();

        catalog.insert_movie(Movie {
            id: 1,
            title: "A".to_string(),
            genres: vec!["Comedy".to_string()],
        });
        catalog.insert_movie(Movie {
            id: 2,
            title: "B".to_string(),
            genres: vec!["Comedy".to_string()],
        });
        catalog.insert_movie(Movie {
            id: 3,
            title: "C".to_string(),
            genres: vec!["Drama".to_string(), "Romantic Comedy".to_string()],
        });
        catalog.insert_movie(Movie {
            id: 4,
            title: "D".to_string(),
            genres: vec!["Drama".to_string()],
        });

        for (movie_id, rating) in [(1, 4.0), (1, 5.0), (2, 3.0), (4, 2.0)] {
            catalog.insert_rating(Rating {
                user_id: 1,
                movie_id,
                rating,
            });
        }
        catalog.compute_movie_stats();

        Arc::new(catalog)
    }

    #[test]
    fn test_genre_menu_respects_size() {
        let service = RecommendationService::new(build_test_catalog(), 1, 5);
        assert_eq!(service.genre_menu(), vec!["Comedy"]);

        let service = RecommendationService::new(build_test_catalog(), 15, 5);
        assert_eq!(
            service.genre_menu(),
            vec!["Comedy", "Drama", "Romantic Comedy"]
        );
    }

    #[test]
    fn test_recommend_merges_and_reads_back() {
        let service = RecommendationService::new(build_test_catalog(), 15, 5);

        let records = service.recommend("Comedy").unwrap();

        // Substring match also picks up "Romantic Comedy"
        let ids: Vec<_> = records.iter().map(|r| r.movie_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(records[0].combined_avg, 4.5);
        assert_eq!(records[1].combined_avg, 3.0);
        // Unrated movie averages to zero
        assert_eq!(records[2].combined_avg, 0.0);
        assert!(records.iter().all(|r| r.count == 1));
    }

    #[test]
    fn test_recommend_twice_counts_twice() {
        let service = RecommendationService::new(build_test_catalog(), 15, 5);

        service.recommend("Comedy");
        let records = service.recommend("Comedy").unwrap();

        assert!(records.iter().all(|r| r.count == 2));
        assert_eq!(records[0].combined_avg, 4.5);
    }

    #[test]
    fn test_recommend_without_candidates() {
        let service = RecommendationService::new(build_test_catalog(), 15, 5);

        assert!(service.recommend("Western").is_none());
        assert_eq!(service.store().genre_count(), 0);
    }

    #[test]
    fn test_limit_caps_candidates() {
        let service = RecommendationService::new(build_test_catalog(), 15, 2);

        let records = service.recommend("Comedy").unwrap();
        assert_eq!(records.len(), 2);
        assert!(service.store().record("Comedy", 3).is_none());
    }

    #[test]
    fn test_clones_share_the_store() {
        let service = RecommendationService::new(build_test_catalog(), 15, 5);
        let other = service.clone();

        service.recommend("Drama");
        other.recommend("Drama");

        assert_eq!(service.store().record("Drama", 4).unwrap().count, 2);
    }
}
