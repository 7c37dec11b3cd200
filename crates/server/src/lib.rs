//! Server crate for the genre recommendation service.
//!
//! Clients connect over TCP, pick a genre from a menu and get movies for it.
//! Every selection is merged into a shared store, so the ratings shown are
//! combined across all clients that picked the same genre.
//!
//! ## Components
//! - **store**: genre-sharded aggregation of running averages
//! - **service**: catalog queries plus merge and read-back
//! - **session**: the per-connection protocol state machine
//! - **listener**: accept loop, one task per connection
//! - **client**: the client side of the protocol
//! - **protocol**: fixed wire text and line formatting

pub mod client;
pub mod config;
pub mod error;
pub mod listener;
pub mod protocol;
pub mod service;
pub mod session;
pub mod store;

pub use client::{Client, Reply};
pub use config::ServerConfig;
pub use error::{ClientError, SessionError};
pub use listener::Server;
pub use service::RecommendationService;
pub use session::{Session, SessionState};
pub use store::{AggregationStore, Contribution, RecommendationRecord};
