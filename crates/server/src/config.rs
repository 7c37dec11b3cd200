//! Server configuration.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Settings for one server process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub movies_path: PathBuf,
    pub ratings_path: PathBuf,
    /// Genres offered in the menu
    pub menu_size: usize,
    /// Candidates per selection and records per reply
    pub recommendation_limit: usize,
}

mod defaults {
    use std::net::{Ipv4Addr, SocketAddr};

    pub const PORT: u16 = 8080;
    pub const MOVIES_PATH: &str = "Dataset/movies.csv";
    pub const RATINGS_PATH: &str = "Dataset/ratings.csv";
    pub const MENU_SIZE: usize = 15;
    pub const RECOMMENDATION_LIMIT: usize = 5;

    pub fn bind_addr() -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, PORT))
    }
}

pub use defaults::{MENU_SIZE, MOVIES_PATH, PORT, RATINGS_PATH, RECOMMENDATION_LIMIT};

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: defaults::bind_addr(),
            movies_path: PathBuf::from(defaults::MOVIES_PATH),
            ratings_path: PathBuf::from(defaults::RATINGS_PATH),
            menu_size: defaults::MENU_SIZE,
            recommendation_limit: defaults::RECOMMENDATION_LIMIT,
        }
    }
}

impl ServerConfig {
    /// Read a JSON config file; missing keys keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn with_data_files(mut self, movies: impl Into<PathBuf>, ratings: impl Into<PathBuf>) -> Self {
        self.movies_path = movies.into();
        self.ratings_path = ratings.into();
        self
    }

    pub fn with_menu_size(mut self, menu_size: usize) -> Self {
        self.menu_size = menu_size;
        self
    }

    pub fn with_recommendation_limit(mut self, limit: usize) -> Self {
        self.recommendation_limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.menu_size, 15);
        assert_eq!(config.recommendation_limit, 5);
        assert_eq!(config.movies_path, PathBuf::from("Dataset/movies.csv"));
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let config: ServerConfig =
            serde_json::from_str(r#"{"bind-addr": "127.0.0.1:9000", "menu-size": 10}"#).unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.menu_size, 10);
        assert_eq!(config.recommendation_limit, 5);
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("server.json");
        fs::write(&path, r#"{"movies-path": "data/m.csv", "recommendation-limit": 3}"#).unwrap();

        let config = ServerConfig::from_json_file(&path).unwrap();
        assert_eq!(config.movies_path, PathBuf::from("data/m.csv"));
        assert_eq!(config.recommendation_limit, 3);
        assert_eq!(config.menu_size, 15);

        assert!(ServerConfig::from_json_file(&dir.path().join("missing.json")).is_err());
    }
}
