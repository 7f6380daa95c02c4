//! Per-city weather card.
//!
//! A card owns one fetch lifecycle: `Idle -> Loading -> Ready | Failed`, with
//! `Ready` and `Failed` going back to `Loading` on refresh. Fetches run as
//! tokio tasks and report back over the board's channel as
//! [`CardMessage::FetchDone`]; the owner feeds those into [`WeatherCard::apply`].
//!
//! At most one fetch is in flight per card. Each fetch is tagged with a
//! generation so a late completion cannot overwrite newer state, and dropping
//! the card cancels whatever is still outstanding.

use std::{fmt, sync::Arc};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    error::FetchError,
    model::{CityEntry, CityId, WeatherSnapshot},
    provider::WeatherProvider,
};

#[derive(Debug, Clone, Default)]
pub enum FetchState {
    #[default]
    Idle,
    Loading,
    Ready(WeatherSnapshot),
    Failed(FetchError),
}

impl FetchState {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading)
    }

    pub fn snapshot(&self) -> Option<&WeatherSnapshot> {
        match self {
            FetchState::Ready(snap) => Some(snap),
            _ => None,
        }
    }
}

/// Messages sent from cards (and their fetch tasks) to the owning board.
#[derive(Debug)]
pub enum CardMessage {
    FetchDone { id: CityId, generation: u64, result: Result<WeatherSnapshot, FetchError> },
    DeleteRequested(CityId),
}

#[derive(Debug)]
pub struct WeatherCard {
    entry: CityEntry,
    state: FetchState,
    generation: u64,
    in_flight: Option<CancellationToken>,
    provider: Arc<dyn WeatherProvider>,
    tx: mpsc::UnboundedSender<CardMessage>,
}

impl WeatherCard {
    /// Mount a card and start its first fetch.
    pub fn mount(
        entry: CityEntry,
        provider: Arc<dyn WeatherProvider>,
        tx: mpsc::UnboundedSender<CardMessage>,
    ) -> Self {
        let mut card = Self {
            entry,
            state: FetchState::Idle,
            generation: 0,
            in_flight: None,
            provider,
            tx,
        };
        card.start_fetch();
        card
    }

    pub fn id(&self) -> CityId {
        self.entry.id
    }

    pub fn name(&self) -> &str {
        &self.entry.name
    }

    pub fn state(&self) -> &FetchState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    /// Re-fetch. Ignored while a fetch is already in flight; returns whether a
    /// new fetch was started.
    pub fn refresh(&mut self) -> bool {
        if self.is_loading() {
            tracing::debug!(id = %self.entry.id, "refresh ignored, fetch in flight");
            return false;
        }
        self.start_fetch();
        true
    }

    /// Ask the owner to remove this city. Local state is untouched.
    pub fn request_delete(&self) {
        let _ = self.tx.send(CardMessage::DeleteRequested(self.entry.id));
    }

    /// Apply a completed fetch. Completions from any fetch other than the one
    /// currently in flight are dropped; returns whether state changed.
    pub fn apply(&mut self, generation: u64, result: Result<WeatherSnapshot, FetchError>) -> bool {
        if !self.is_loading() || generation != self.generation {
            tracing::debug!(
                id = %self.entry.id,
                generation,
                current = self.generation,
                "stale fetch result dropped"
            );
            return false;
        }

        self.in_flight = None;
        self.state = match result {
            Ok(snap) => FetchState::Ready(snap),
            Err(e) => {
                tracing::debug!(id = %self.entry.id, city = %self.entry.name, error = %e, "fetch failed");
                FetchState::Failed(e)
            }
        };
        true
    }

    fn start_fetch(&mut self) {
        self.generation += 1;
        self.state = FetchState::Loading;

        let token = CancellationToken::new();
        self.in_flight = Some(token.clone());

        let id = self.entry.id;
        let generation = self.generation;
        let city = self.entry.name.clone();
        let provider = Arc::clone(&self.provider);
        let tx = self.tx.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::debug!(%id, generation, "fetch cancelled");
                }
                result = provider.current_weather(&city) => {
                    let _ = tx.send(CardMessage::FetchDone { id, generation, result });
                }
            }
        });
    }
}

impl Drop for WeatherCard {
    fn drop(&mut self) {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
    }
}

impl fmt::Display for WeatherCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            FetchState::Idle => write!(f, "[{}] {}", self.entry.id, self.entry.name),
            FetchState::Loading => write!(f, "[{}] {}\n  Loading...", self.entry.id, self.entry.name),
            FetchState::Failed(e) => {
                write!(f, "[{}] {}\n  Error: {}", self.entry.id, self.entry.name, e.user_message())
            }
            FetchState::Ready(snap) => {
                writeln!(f, "[{}] {}", self.entry.id, snap.city)?;
                writeln!(f, "  Main: {}", snap.condition_summary)?;
                writeln!(f, "  Temp: {} °C", snap.temperature_c)?;
                writeln!(f, "  Feels like: {} °C", snap.feels_like_c)?;
                writeln!(f, "  Humidity: {} %", snap.humidity_pct)?;
                write!(f, "  Icon: {}", snap.icon_url())
            }
        }
    }
}
