use std::sync::Arc;

use anyhow::Context;
use citycards_core::{
    Board, CityId, CityRegistry, Config, FileStore, KeyValueStore, WeatherProvider, config::API_KEY_ENV,
    provider_from_config,
};
use clap::{Parser, Subcommand};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "citycards", version, about = "Current weather for a list of cities")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive board (the default).
    Board,

    /// Store the OpenWeather API key.
    Configure,

    /// Add a city to the list.
    Add {
        /// City name, e.g. "Paris" or "New York".
        name: String,
    },

    /// Remove a city by id (see `list`).
    Remove { id: u64 },

    /// Print the tracked cities.
    List,

    /// Fetch and print weather for every tracked city.
    Show,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::load()?;

        match self.command.unwrap_or(Command::Board) {
            Command::Board => {
                let board = open_board(&config).await?;
                crate::board::run(board).await?;
            }
            Command::Configure => configure(config).await?,
            Command::Add { name } => {
                let mut registry = CityRegistry::load(open_store(&config)?).await;
                let entry = registry.add(&name)?;
                registry.flush().await;
                report_write_error(registry.last_write_error());
                println!("Added [{}] {}", entry.id, entry.name);
            }
            Command::Remove { id } => {
                let mut registry = CityRegistry::load(open_store(&config)?).await;
                match registry.delete(CityId(id)) {
                    Some(entry) => {
                        registry.flush().await;
                        report_write_error(registry.last_write_error());
                        println!("Removed [{}] {}", entry.id, entry.name);
                    }
                    None => println!("No city with id {id}"),
                }
            }
            Command::List => {
                let registry = CityRegistry::load(open_store(&config)?).await;
                if registry.is_empty() {
                    println!("No cities yet. Add one with `citycards add <name>`.");
                }
                for entry in registry.cities() {
                    println!("[{}] {}", entry.id, entry.name);
                }
            }
            Command::Show => {
                let mut board = open_board(&config).await?;
                board.settle().await;
                crate::board::render(&board);
                board.close().await;
            }
        }

        Ok(())
    }
}

fn open_store(config: &Config) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    let dir = config.store_dir()?;
    tracing::debug!(dir = %dir.display(), "using city store");
    Ok(Arc::new(FileStore::new(dir)))
}

async fn open_board(config: &Config) -> anyhow::Result<Board> {
    let provider: Arc<dyn WeatherProvider> =
        provider_from_config(config, std::env::var(API_KEY_ENV).ok())?;
    Ok(Board::open(open_store(config)?, provider).await)
}

async fn configure(mut config: Config) -> anyhow::Result<()> {
    let api_key = tokio::task::spawn_blocking(|| {
        inquire::Password::new("OpenWeather API key:")
            .without_confirmation()
            .with_help_message("Get one at https://openweathermap.org/api")
            .prompt()
    })
    .await
    .context("Prompt task failed")?
    .context("No API key entered")?;

    let api_key = api_key.trim().to_string();
    if api_key.is_empty() {
        anyhow::bail!("API key must not be empty");
    }

    config.set_api_key(api_key);
    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

pub(crate) fn report_write_error(error: Option<String>) {
    if let Some(error) = error {
        eprintln!("Warning: the city list could not be saved ({error}). Changes last until exit.");
    }
}
