use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a tracked city, unique within the live list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CityId(pub u64);

impl fmt::Display for CityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One tracked city. Persisted as `{"id": .., "name": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityEntry {
    pub id: CityId,
    pub name: String,
}

impl CityEntry {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self { id: CityId(id), name: name.into() }
    }
}

/// Ordered city list; insertion order is display order.
pub type CityList = Vec<CityEntry>;

/// Current conditions for one city as returned by the weather service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub city: String,
    pub condition_summary: String,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: u8,
    pub icon_id: String,
    pub observed_at: DateTime<Utc>,
}

impl WeatherSnapshot {
    /// Large (2x) condition icon hosted by OpenWeather.
    pub fn icon_url(&self) -> String {
        format!("http://openweathermap.org/img/wn/{}@2x.png", self.icon_id)
    }
}
