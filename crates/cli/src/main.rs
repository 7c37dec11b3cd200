use anyhow::{Context, Result, bail};
use catalog::Catalog;
use clap::{Parser, Subcommand};
use colored::Colorize;
use rand::Rng;
use server::config::{self, ServerConfig};
use server::{Client, RecommendationService, Reply, Server};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

/// cinerec - genre-based movie recommendations combined across clients
#[derive(Parser)]
#[command(name = "cinerec")]
#[command(about = "Multi-client movie recommendation server and client", long_about = None)]
struct Cli {
    /// Path to the movies CSV file
    #[arg(long, global = true, default_value = config::MOVIES_PATH)]
    movies: PathBuf,

    /// Path to the ratings CSV file
    #[arg(long, global = true, default_value = config::RATINGS_PATH)]
    ratings: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the catalog and serve recommendations over TCP
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8080")]
        addr: SocketAddr,

        /// JSON config file; explicit flags are ignored when given
        #[arg(long = "config")]
        config_file: Option<PathBuf>,

        /// Number of genres offered to clients
        #[arg(long, default_value_t = config::MENU_SIZE)]
        menu_size: usize,

        /// Movies per recommendation
        #[arg(long, default_value_t = config::RECOMMENDATION_LIMIT)]
        limit: usize,
    },

    /// Connect to a server and ask for recommendations
    Client {
        /// Server address
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: SocketAddr,

        /// User ID to send (prompted when missing)
        #[arg(long)]
        user_id: Option<String>,

        /// 1-based genre number to select (prompted when missing)
        #[arg(long)]
        genre_index: Option<String>,
    },

    /// Show the genre popularity ranking
    Genres {
        /// Number of genres to show
        #[arg(long, default_value_t = config::MENU_SIZE)]
        limit: usize,
    },

    /// List movies matching a genre, with their average ratings
    Movies {
        /// Genre to search for (case-insensitive substring match)
        #[arg(long)]
        genre: String,

        /// Number of movies to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Fire concurrent clients at a running server
    Benchmark {
        /// Server address
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: SocketAddr,

        /// Number of requests to make
        #[arg(long, default_value = "100")]
        requests: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Serve {
            addr,
            config_file,
            menu_size,
            limit,
        } => {
            let config = match config_file {
                Some(path) => ServerConfig::from_json_file(&path)?,
                None => ServerConfig::default()
                    .with_bind_addr(addr)
                    .with_data_files(cli.movies, cli.ratings)
                    .with_menu_size(menu_size)
                    .with_recommendation_limit(limit),
            };
            handle_serve(config).await?
        }
        Commands::Client {
            addr,
            user_id,
            genre_index,
        } => handle_client(addr, user_id, genre_index).await?,
        Commands::Genres { limit } => {
            handle_genres(&load_catalog(&cli.movies, &cli.ratings), limit)
        }
        Commands::Movies { genre, limit } => {
            handle_movies(&load_catalog(&cli.movies, &cli.ratings), &genre, limit)?
        }
        Commands::Benchmark { addr, requests } => handle_benchmark(addr, requests).await?,
    }

    Ok(())
}

/// Load the catalog, reporting file problems without stopping
fn load_catalog(movies: &Path, ratings: &Path) -> Catalog {
    println!("Loading catalog from {} and {}...", movies.display(), ratings.display());
    let start = Instant::now();
    let load = Catalog::load_from_files(movies, ratings);

    for error in &load.errors {
        println!("{} {}", "✗".red(), error);
    }
    let (movie_count, rating_count) = load.catalog.counts();
    println!(
        "{} Loaded {} movies and {} ratings in {:?}",
        "✓".green(),
        movie_count,
        rating_count,
        start.elapsed()
    );
    load.catalog
}

/// Handle the 'serve' command
async fn handle_serve(config: ServerConfig) -> Result<()> {
    let catalog = load_catalog(&config.movies_path, &config.ratings_path);
    let service = RecommendationService::from_config(Arc::new(catalog), &config);

    let server = Server::bind(config.bind_addr, service).await?;
    println!(
        "{} Server listening on {}",
        "✓".green(),
        server.local_addr()?
    );

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Could not listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
}

/// Read one answer from stdin, or use the value given on the command line
async fn answer(
    stdin: &mut tokio::io::Lines<BufReader<tokio::io::Stdin>>,
    given: Option<String>,
    prompt: &str,
) -> Result<String> {
    if let Some(value) = given {
        return Ok(value);
    }
    println!("{}", prompt.bold());
    Ok(stdin.next_line().await?.unwrap_or_default())
}

/// Handle the 'client' command
async fn handle_client(
    addr: SocketAddr,
    user_id: Option<String>,
    genre_index: Option<String>,
) -> Result<()> {
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut client = Client::connect(addr)
        .await
        .with_context(|| format!("Failed to connect to {}", addr))?;

    println!("{}", client.read_greeting().await?.bold().blue());
    let prompt = client.read_id_prompt().await?;
    let user_id = answer(&mut stdin, user_id, &prompt).await?;
    println!("{}", client.send_user_id(user_id.trim()).await?);

    let genres = client.read_menu().await?;
    for (i, genre) in genres.iter().enumerate() {
        println!("{}. {}", (i + 1).to_string().green(), genre);
    }
    let selection = answer(
        &mut stdin,
        genre_index,
        "Por favor, selecciona un género por el número:",
    )
    .await?;

    match client.select(selection.trim()).await? {
        Reply::Recommendations { genre, lines } => {
            println!("{}", format!("Películas recomendadas: {}", genre).bold().blue());
            for line in lines {
                println!("{}", line);
            }
        }
        Reply::NoRecommendations => println!("{}", server::protocol::NO_RECOMMENDATIONS.yellow()),
        Reply::InvalidSelection => {
            bail!(server::protocol::INVALID_GENRE_INDEX)
        }
    }
    Ok(())
}

/// Handle the 'genres' command
fn handle_genres(catalog: &Catalog, limit: usize) {
    println!("{}", "Genres by popularity:".bold().blue());
    for (i, entry) in catalog.genre_counts(limit).iter().enumerate() {
        println!(
            "{}. {} ({} movies)",
            (i + 1).to_string().green(),
            entry.genre,
            entry.count
        );
    }
}

/// Handle the 'movies' command
fn handle_movies(catalog: &Catalog, genre: &str, limit: usize) -> Result<()> {
    let movies = catalog.movies_matching_genre(genre, limit);
    if movies.is_empty() {
        bail!("No movies match genre '{}'", genre);
    }

    println!("{}", format!("Movies matching '{}':", genre).bold().blue());
    for movie in movies {
        let rating_count = catalog
            .get_movie_stats(movie.id)
            .map(|s| s.rating_count)
            .unwrap_or(0);
        println!(
            "{}: {} [{}] avg {:.2} ({} ratings)",
            movie.id,
            movie.title,
            movie.genres.join(", "),
            catalog.average_rating(movie.id),
            rating_count
        );
    }
    Ok(())
}

/// Handle the 'benchmark' command
async fn handle_benchmark(addr: SocketAddr, requests: usize) -> Result<()> {
    if requests == 0 {
        bail!("Need at least one request");
    }

    // Read the menu once to know how many genres can be picked
    let mut probe = Client::connect(addr)
        .await
        .with_context(|| format!("Failed to connect to {}", addr))?;
    probe.read_greeting().await?;
    probe.read_id_prompt().await?;
    probe.send_user_id("0").await?;
    let menu_len = probe.read_menu().await?.len();
    drop(probe);
    if menu_len == 0 {
        bail!("Server offered no genres");
    }

    // Use tokio::spawn to make concurrent requests
    let start = Instant::now();
    let mut handles = vec![];
    for user in 0..requests {
        let selection = rand::rng().random_range(1..=menu_len).to_string();
        let handle = tokio::spawn(async move {
            let start = Instant::now();
            Client::request(addr, &user.to_string(), &selection).await?;
            Ok::<_, anyhow::Error>(start.elapsed())
        });
        handles.push(handle);
    }

    // Wait for all tasks to complete and collect timings
    let mut timings: Vec<Duration> = vec![];
    for handle in handles {
        let elapsed = handle.await??;
        timings.push(elapsed);
    }
    let wall_time = start.elapsed();

    let total_time: Duration = timings.iter().sum();
    let avg_latency = total_time / (timings.len() as u32);
    timings.sort();
    let percentile = |p: f32| timings[((timings.len() as f32 * p) as usize).min(timings.len() - 1)];
    let throughput = requests as f32 / wall_time.as_secs_f32();

    println!("Benchmark results:");
    println!("Wall time: {:?}", wall_time);
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", percentile(0.50));
    println!("P95 latency: {:?}", percentile(0.95));
    println!("P99 latency: {:?}", percentile(0.99));
    println!("Throughput: {:.2} requests/second", throughput);

    Ok(())
}
