//! Core library for `weather-tracker`.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The weather provider abstraction and its OpenWeather implementation
//! - Key-value persistence for saved locations and the unit preference
//! - The location store that ties fetching, deduplication and persistence together
//!
//! It is used by the `weather-tracker` binary, but can also be reused by other front ends.

pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod storage;
pub mod store;

pub use config::Config;
pub use error::WeatherError;
pub use model::{TemperatureUnit, WeatherRecord};
pub use provider::{
    WeatherProvider, icon_url, openweather::OpenWeatherProvider, provider_from_config,
};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use store::LocationStore;
