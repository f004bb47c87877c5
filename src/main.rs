use clap::{Parser, Subcommand};
use episode_shelf::{Config, EpisodeShelfError, Shelf, open_shelf};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// Browse a bundled catalog of TV seasons and keep track of watched episodes
#[derive(Parser, Debug)]
#[command(name = "episode-shelf", version, about)]
struct Args {
    /// Config file (defaults to config.toml in the platform config directory)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Catalog bundle JSON file
    #[arg(long, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Media lookup table JSON file
    #[arg(long, value_name = "FILE")]
    media: Option<PathBuf>,

    /// Directory for persisted watched state
    #[arg(long, value_name = "DIR")]
    storage_dir: Option<PathBuf>,

    /// Storage key for the watched set
    #[arg(long, value_name = "KEY")]
    storage_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all seasons with watched progress
    Seasons,

    /// List the episodes of a season
    Episodes {
        /// Season id
        season: String,
    },

    /// Show the details of one episode
    Show {
        /// Season id
        season: String,
        /// Episode id
        episode: String,
    },

    /// Mark an episode watched, or unwatched if it already is
    Toggle {
        /// Season id
        season: String,
        /// Episode id
        episode: String,
    },
}

/// Loads the config file and applies command-line overrides
fn resolve_config(args: &Args) -> Result<Config, EpisodeShelfError> {
    let mut config = match args.config.clone().or_else(Config::default_path) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };

    if let Some(catalog) = &args.catalog {
        config.catalog_path = Some(catalog.clone());
    }
    if let Some(media) = &args.media {
        config.media_path = Some(media.clone());
    }
    if let Some(dir) = &args.storage_dir {
        config.storage_dir = Some(dir.clone());
    }
    if let Some(key) = &args.storage_key {
        config.storage_key = key.clone();
    }

    Ok(config)
}

fn print_seasons(shelf: &Shelf) {
    if shelf.catalog().seasons.is_empty() {
        println!("No seasons found.");
        return;
    }

    for season in &shelf.catalog().seasons {
        println!(
            "[{}] {}  ({}/{} watched)",
            season.id,
            season.title,
            shelf.watched().watched_in_season(season),
            season.episodes.len()
        );
    }
}

fn print_episodes(shelf: &Shelf, season_id: &str) -> Result<(), EpisodeShelfError> {
    let season = shelf
        .catalog()
        .season(season_id)
        .ok_or_else(|| episode_shelf::ShelfError::UnknownSeason(season_id.to_string()))?;

    println!("=== {} ===\n", season.title);
    for episode in &season.episodes {
        let marker = if shelf.is_watched(&season.id, &episode.id) {
            "x"
        } else {
            " "
        };
        println!(
            "[{}] {}. {}  (id {}, {} min)",
            marker, episode.episode_number, episode.title, episode.id, episode.duration
        );
    }

    Ok(())
}

fn print_episode(shelf: &Shelf, season_id: &str, episode_id: &str) -> Result<(), EpisodeShelfError> {
    let (season, episode) = shelf.episode(season_id, episode_id)?;

    println!("{}. {}", episode.episode_number, episode.title);
    println!("  Season: {}", season.title);
    println!("  Duration: {} min", episode.duration);
    println!("  Air date: {}", episode.air_date);
    println!("  Image: {}", episode.image_ref);
    println!(
        "  Watched: {}",
        if shelf.is_watched(season_id, episode_id) {
            "yes"
        } else {
            "no"
        }
    );
    println!("\n{}", episode.synopsis);

    Ok(())
}

async fn run(args: Args, config: Config) -> Result<(), EpisodeShelfError> {
    let mut shelf = open_shelf(&config).await?;

    match args.command {
        Command::Seasons => print_seasons(&shelf),
        Command::Episodes { season } => print_episodes(&shelf, &season)?,
        Command::Show { season, episode } => print_episode(&shelf, &season, &episode)?,
        Command::Toggle { season, episode } => {
            let watched = shelf.toggle(&season, &episode)?;
            let (_, found) = shelf.episode(&season, &episode)?;
            println!(
                "{}. {} is now {}",
                found.episode_number,
                found.title,
                if watched { "watched" } else { "unwatched" }
            );
            // The write runs in the background; let it finish before exiting.
            shelf.flush().await;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match resolve_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args, config).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
