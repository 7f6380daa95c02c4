//! Test doubles shared by the unit test modules.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Semaphore;

use crate::{
    error::{FetchError, StorageError},
    model::WeatherSnapshot,
    provider::WeatherProvider,
    store::KeyValueStore,
};

pub fn snapshot(city: &str, temperature_c: f64) -> WeatherSnapshot {
    WeatherSnapshot {
        city: city.to_string(),
        condition_summary: "Clear".to_string(),
        temperature_c,
        feels_like_c: temperature_c - 1.0,
        humidity_pct: 50,
        icon_id: "01d".to_string(),
        observed_at: Utc::now(),
    }
}

/// Provider answering from per-city queues. Cities with an empty queue get a
/// 20 °C snapshot. A gated provider holds every call until `release`.
#[derive(Debug)]
pub struct ScriptedProvider {
    responses: Mutex<HashMap<String, VecDeque<Result<WeatherSnapshot, FetchError>>>>,
    calls: AtomicUsize,
    gate: Semaphore,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::default(),
            calls: AtomicUsize::new(0),
            gate: Semaphore::new(Semaphore::MAX_PERMITS),
        }
    }

    pub fn gated() -> Self {
        Self { gate: Semaphore::new(0), ..Self::new() }
    }

    pub fn push(&self, city: &str, response: Result<WeatherSnapshot, FetchError>) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(city.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn release(&self, calls: usize) {
        self.gate.add_permits(calls);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherProvider for ScriptedProvider {
    async fn current_weather(&self, city: &str) -> Result<WeatherSnapshot, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }

        let scripted = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(city)
            .and_then(VecDeque::pop_front);

        scripted.unwrap_or_else(|| Ok(snapshot(city, 20.0)))
    }
}

/// In-memory store that records every access. Failures can be switched on to
/// exercise the degraded paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    values: HashMap<String, String>,
    reads: usize,
    writes: Vec<(String, String)>,
    fail_reads: bool,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: &str) -> Self {
        let store = Self::default();
        store.lock().values.insert(key.to_string(), value.to_string());
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Number of `get` calls so far, failed ones included.
    pub fn read_count(&self) -> usize {
        self.lock().reads
    }

    /// Every successful `set` in order.
    pub fn writes(&self) -> Vec<(String, String)> {
        self.lock().writes.clone()
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.lock().values.get(key).cloned()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut inner = self.lock();
        inner.reads += 1;
        if inner.fail_reads {
            return Err(StorageError::read(key, anyhow::anyhow!("simulated read failure")));
        }
        Ok(inner.values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut inner = self.lock();
        if inner.fail_writes {
            return Err(StorageError::write(key, anyhow::anyhow!("simulated write failure")));
        }
        inner.values.insert(key.to_string(), value.to_string());
        inner.writes.push((key.to_string(), value.to_string()));
        Ok(())
    }
}

/// Store whose writes take the given delays in turn, slowest first, and
/// which records how many writes were ever running at once.
#[derive(Debug)]
pub struct SlowStore {
    inner: MemoryStore,
    delays: Mutex<VecDeque<Duration>>,
    running: AtomicUsize,
    max_running: AtomicUsize,
}

impl SlowStore {
    pub fn new(delays: impl IntoIterator<Item = Duration>) -> Self {
        Self {
            inner: MemoryStore::new(),
            delays: Mutex::new(delays.into_iter().collect()),
            running: AtomicUsize::new(0),
            max_running: AtomicUsize::new(0),
        }
    }

    pub fn writes(&self) -> Vec<(String, String)> {
        self.inner.writes()
    }

    pub fn max_concurrent_writes(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for SlowStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(running, Ordering::SeqCst);

        let delay = self.delays.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = self.inner.set(key, value).await;
        self.running.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_records_access() {
        let store = MemoryStore::with_value("@cities", "[]");

        assert_eq!(store.get("@cities").await.unwrap().as_deref(), Some("[]"));
        store.set("@cities", "[1]").await.unwrap();

        assert_eq!(store.read_count(), 1);
        assert_eq!(store.writes(), vec![("@cities".to_string(), "[1]".to_string())]);

        store.fail_writes(true);
        assert!(store.set("@cities", "[2]").await.is_err());
        assert_eq!(store.value("@cities").as_deref(), Some("[1]"));
    }
}
