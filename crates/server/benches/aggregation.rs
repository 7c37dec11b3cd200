//! Benchmarks for the recommendation hot path
//!
//! Run with: cargo bench --package server
//!
//! Uses a synthetic catalog so no dataset files are needed.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use catalog::{Catalog, Movie, Rating};
use server::{AggregationStore, Contribution, RecommendationService};
use std::sync::Arc;

const GENRES: [&str; 8] = [
    "Action", "Comedy", "Drama", "Horror", "Romance", "Sci-Fi", "Thriller", "Western",
];

fn build_catalog() -> Arc<Catalog> {
    let mut catalog = Catalog::new();
    for id in 0..10_000i64 {
        let first = GENRES[id as usize % GENRES.len()];
        let second = GENRES[(id as usize / 3) % GENRES.len()];
        catalog.insert_movie(Movie {
            id,
            title: format!("Movie {}", id),
            genres: vec![first.to_string(), second.to_string()],
        });
        for user_id in 0..5 {
            catalog.insert_rating(Rating {
                user_id,
                movie_id: id,
                rating: ((id + user_id) % 5 + 1) as f64,
            });
        }
    }
    catalog.compute_movie_stats();
    Arc::new(catalog)
}

fn bench_store_contribute(c: &mut Criterion) {
    let store = AggregationStore::new();
    let contributions: Vec<Contribution> = (0..5i64)
        .map(|id| Contribution {
            movie_id: id,
            title: format!("Movie {}", id),
            genres: vec!["Comedy".to_string()],
            avg_rating: 3.5,
        })
        .collect();

    c.bench_function("store_contribute", |b| {
        b.iter(|| store.contribute(black_box("Comedy"), black_box(&contributions)))
    });
}

fn bench_genre_menu(c: &mut Criterion) {
    let service = RecommendationService::new(build_catalog(), 15, 5);

    c.bench_function("genre_menu", |b| b.iter(|| black_box(service.genre_menu())));
}

fn bench_recommend(c: &mut Criterion) {
    let service = RecommendationService::new(build_catalog(), 15, 5);

    c.bench_function("recommend", |b| {
        b.iter(|| black_box(service.recommend(black_box("sci"))))
    });
}

criterion_group!(benches, bench_store_contribute, bench_genre_menu, bench_recommend);
criterion_main!(benches);
