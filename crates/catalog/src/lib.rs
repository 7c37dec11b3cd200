//! # Catalog Crate
//!
//! Loads the movie and rating CSV files into a read-only in-memory catalog
//! and answers the queries the recommendation server needs.
//!
//! ## Main Components
//!
//! - **types**: Movie, Rating, MovieStats and the Catalog itself
//! - **parser**: Lenient CSV parsing of movies.csv and ratings.csv
//! - **index**: Loading both files and computing per-movie statistics
//! - **query**: Genre popularity ranking, genre lookups, average ratings
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use catalog::Catalog;
//! use std::path::Path;
//!
//! let load = Catalog::load_from_files(
//!     Path::new("Dataset/movies.csv"),
//!     Path::new("Dataset/ratings.csv"),
//! );
//! for error in &load.errors {
//!     eprintln!("{error}");
//! }
//!
//! let catalog = load.catalog;
//! let genres = catalog.genres_by_popularity(15);
//! let comedies = catalog.movies_matching_genre("Comedy", 5);
//! ```

pub mod error;
pub mod types;
pub mod parser;
pub mod index;
pub mod query;

// Re-export commonly used types for convenience
pub use error::{DataLoadError, Result};
pub use index::CatalogLoad;
pub use query::GenreCount;
pub use types::{Catalog, Movie, MovieId, MovieStats, Rating, UserId};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_creation() {
        let catalog = Catalog::new();
        let (movies, ratings) = catalog.counts();

        assert_eq!(movies, 0);
        assert_eq!(ratings, 0);
    }

    #[test]
    fn test_insert_movie_replaces_duplicate_id() {
        let mut catalog = Catalog::new();

        catalog.insert_movie(Movie {
            id: 1,
            title: "First".to_string(),
            genres: vec!["Drama".to_string()],
        });
        catalog.insert_movie(Movie {
            id: 1,
            title: "Second".to_string(),
            genres: vec!["Comedy".to_string()],
        });

        let retrieved = catalog.get_movie(1).unwrap();
        assert_eq!(retrieved.title, "Second");
        assert_eq!(catalog.counts(), (1, 0));
    }

    #[test]
    fn test_insert_rating() {
        let mut catalog = Catalog::new();

        catalog.insert_rating(Rating {
            user_id: 1,
            movie_id: 1193,
            rating: 5.0,
        });

        let movie_ratings = catalog.get_movie_ratings(1193);
        assert_eq!(movie_ratings.len(), 1);
        assert_eq!(movie_ratings[0].rating, 5.0);
    }

    #[test]
    fn test_empty_queries() {
        let catalog = Catalog::new();

        assert!(catalog.get_movie(999).is_none());
        assert!(catalog.get_movie_ratings(999).is_empty());
        assert!(catalog.get_movie_stats(999).is_none());
        assert!(catalog.movies_matching_genre("Action", 5).is_empty());
    }
}
