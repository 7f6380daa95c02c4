//! Core library for the `citycards` app.
//!
//! This crate defines:
//! - The tracked city list and its persistence (`registry`, `store`)
//! - Per-city weather cards and their fetch lifecycle (`card`)
//! - The board that ties the two together (`board`)
//! - Configuration, the weather provider, and shared models
//!
//! It is used by `citycards-cli`, but has no terminal dependencies of its own.

pub mod board;
pub mod card;
pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod registry;
pub mod store;

#[cfg(test)]
mod testing;

pub use board::Board;
pub use card::{CardMessage, FetchState, WeatherCard};
pub use config::Config;
pub use error::{FetchError, StorageError, ValidationError};
pub use model::{CityEntry, CityId, CityList, WeatherSnapshot};
pub use provider::{WeatherProvider, openweather::OpenWeatherProvider, provider_from_config};
pub use registry::{CITIES_KEY, CityRegistry};
pub use store::{FileStore, KeyValueStore};
