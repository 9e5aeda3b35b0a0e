use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::Password;
use weather_core::{Config, FileStore, LocationStore, icon_url, provider_from_config};

use crate::display;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-tracker", version, about = "Track current weather for saved locations")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the weather API key.
    Configure,

    /// Add a location by name and show its current weather.
    Add {
        /// City name, e.g. "London" or "Paris,FR".
        name: String,
    },

    /// Stop tracking a location.
    Remove {
        /// Location id as shown by `list`.
        id: String,
    },

    /// Show weather for all saved locations.
    List,

    /// Re-fetch weather for all saved locations.
    Refresh,

    /// Switch between Celsius and Fahrenheit.
    Unit,

    /// Print the image URL for a weather icon code.
    Icon {
        code: String,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure()?,
            Command::Icon { code } => println!("{}", icon_url(&code)),
            Command::Add { name } => {
                let mut store = open_store().await?;
                if !store.add_location(&name).await {
                    return fail(&mut store);
                }
                if let Some(record) = store.records().last() {
                    println!("{}", display::record_line(&store, record));
                }
            }
            Command::Remove { id } => {
                let mut store = open_store().await?;
                let before = store.records().len();
                store.remove_location(&id);
                if store.records().len() == before {
                    println!("No location with id {id}");
                }
                print!("{}", display::render_list(&store));
            }
            Command::List => {
                let store = open_store().await?;
                print!("{}", display::render_list(&store));
            }
            Command::Refresh => {
                let mut store = open_store().await?;
                store.refresh_all_weather().await;
                print!("{}", display::render_list(&store));
            }
            Command::Unit => {
                let mut store = build_store()?;
                store.restore_preferences();
                store.toggle_temperature_unit();
                println!("Temperature unit: {}", store.temperature_unit());
            }
        }

        Ok(())
    }
}

fn configure() -> anyhow::Result<()> {
    // Read the file directly so an environment override never gets written back.
    let path = Config::config_file_path()?;
    let mut config = Config::load_from(&path)?;

    let api_key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    if api_key.trim().is_empty() {
        bail!("API key must not be empty");
    }

    config.set_api_key(api_key.trim().to_string());
    config.save_to(&path)?;

    println!("Saved configuration to {}", path.display());
    Ok(())
}

/// Store wired to the configured provider and state file, nothing loaded yet.
fn build_store() -> anyhow::Result<LocationStore> {
    let config = Config::load()?;
    let provider = provider_from_config(&config)?;
    let storage = FileStore::new(config.state_file_path()?);
    tracing::debug!(path = %storage.path().display(), "using state file");

    Ok(LocationStore::new(provider, Arc::new(storage)))
}

/// Store with saved locations fetched fresh.
async fn open_store() -> anyhow::Result<LocationStore> {
    let mut store = build_store()?;
    store.initialize().await;
    Ok(store)
}

fn fail(store: &mut LocationStore) -> anyhow::Result<()> {
    let message = store.error().unwrap_or("Failed to fetch weather data").to_string();
    store.clear_error();
    bail!(message)
}
