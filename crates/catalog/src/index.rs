//! Catalog building and loading logic.
//!
//! - Parse both files in parallel
//! - Build the primary indices (movies, ratings per movie)
//! - Compute per-movie statistics

use crate::error::DataLoadError;
use crate::parser;
use crate::types::*;
use rayon::prelude::*;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Result of loading the catalog files.
///
/// Loading never fails as a whole: a file that can't be read is reported in
/// `errors` and simply contributes nothing to the catalog.
#[derive(Debug)]
pub struct CatalogLoad {
    pub catalog: Catalog,
    pub errors: Vec<DataLoadError>,
}

impl CatalogLoad {
    /// True when both files were read
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

impl Catalog {
    /// Load the catalog from a movies file and a ratings file
    ///
    /// Steps:
    /// 1. Parse both files in parallel
    /// 2. Insert movies and ratings
    /// 3. Compute movie statistics
    #[instrument(skip_all, fields(movies = %movies_path.display(), ratings = %ratings_path.display()))]
    pub fn load_from_files(movies_path: &Path, ratings_path: &Path) -> CatalogLoad {
        info!("Loading catalog");

        let (movies, ratings) = rayon::join(
            || parser::parse_movies(movies_path),
            || parser::parse_ratings(ratings_path),
        );

        let mut catalog = Catalog::new();
        let mut errors = Vec::new();

        match movies {
            Ok(parsed) => {
                debug!(skipped = parsed.skipped, "Parsed movies file");
                for movie in parsed.rows {
                    catalog.insert_movie(movie);
                }
            }
            Err(e) => {
                warn!(error = %e, "Could not read movies file, continuing without movies");
                errors.push(e);
            }
        }

        match ratings {
            Ok(parsed) => {
                debug!(skipped = parsed.skipped, "Parsed ratings file");
                for rating in parsed.rows {
                    catalog.insert_rating(rating);
                }
            }
            Err(e) => {
                warn!(error = %e, "Could not read ratings file, continuing without ratings");
                errors.push(e);
            }
        }

        catalog.compute_movie_stats();

        let (movie_count, rating_count) = catalog.counts();
        info!(
            "Loaded {} movies and {} ratings ({} file errors)",
            movie_count,
            rating_count,
            errors.len()
        );

        CatalogLoad { catalog, errors }
    }

    /// Compute average rating and rating count for every rated movie
    pub fn compute_movie_stats(&mut self) {
        self.movie_stats = self
            .movie_ratings
            .par_iter()
            .map(|(&movie_id, ratings)| {
                let rating_count = ratings.len() as u32;
                let avg_rating = mean(ratings.iter().map(|r| r.rating));
                (
                    movie_id,
                    MovieStats {
                        avg_rating,
                        rating_count,
                    },
                )
            })
            .collect();
    }
}

/// Arithmetic mean, 0.0 for an empty sequence
pub(crate) fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (total, count) = values.fold((0.0, 0u32), |(total, count), v| (total + v, count + 1));
    if count == 0 {
        0.0
    } else {
        total / f64::from(count)
    }
}
