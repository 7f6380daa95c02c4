//! The authoritative list of tracked cities and its persistence.
//!
//! The registry reads the store once, when it is loaded. After that the
//! in-memory list is the source of truth: every successful `add`/`delete`
//! hands one snapshot of the whole list to a single writer task, which writes
//! snapshots in the order they were produced. Nothing the registry does on its
//! own reads the store again.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};

use crate::{
    error::{StorageError, ValidationError},
    model::{CityEntry, CityId, CityList},
    store::KeyValueStore,
};

/// Store key holding the JSON array of `{id, name}`.
pub const CITIES_KEY: &str = "@cities";

/// Read the persisted list. A missing key is an empty list.
pub async fn load_cities(store: &dyn KeyValueStore) -> Result<CityList, StorageError> {
    match store.get(CITIES_KEY).await? {
        None => Ok(Vec::new()),
        Some(raw) => serde_json::from_str(&raw).map_err(|e| StorageError::read(CITIES_KEY, e)),
    }
}

/// Serialize and write the whole list.
pub async fn save_cities(store: &dyn KeyValueStore, cities: &[CityEntry]) -> Result<(), StorageError> {
    let raw = serde_json::to_string(cities).map_err(|e| StorageError::write(CITIES_KEY, e))?;
    store.set(CITIES_KEY, &raw).await
}

enum WriteCommand {
    Save(CityList),
    Flush(oneshot::Sender<()>),
}

async fn run_writer(
    store: Arc<dyn KeyValueStore>,
    mut rx: mpsc::UnboundedReceiver<WriteCommand>,
    last_error: watch::Sender<Option<String>>,
) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WriteCommand::Save(cities) => match save_cities(store.as_ref(), &cities).await {
                Ok(()) => {
                    tracing::debug!(count = cities.len(), "city list saved");
                    last_error.send_replace(None);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "cities saving failed; keeping in-memory list");
                    last_error.send_replace(Some(e.to_string()));
                }
            },
            WriteCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

#[derive(Debug)]
pub struct CityRegistry {
    cities: CityList,
    /// `None` once the largest id has been handed out.
    next_id: Option<u64>,
    writer: mpsc::UnboundedSender<WriteCommand>,
    last_error: watch::Receiver<Option<String>>,
}

impl CityRegistry {
    /// Hydrate from the store. A failed read is logged and treated as an
    /// empty list so the board can still come up.
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let cities = match load_cities(store.as_ref()).await {
            Ok(cities) => cities,
            Err(e) => {
                tracing::warn!(error = %e, "cities loading failed; starting with an empty list");
                Vec::new()
            }
        };

        let mut registry = Self::empty(store);
        registry.replace(cities);
        tracing::debug!(count = registry.cities.len(), "city list loaded");
        registry
    }

    /// Registry with an empty list that never reads the store.
    pub fn empty(store: Arc<dyn KeyValueStore>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (error_tx, error_rx) = watch::channel(None);
        tokio::spawn(run_writer(store, rx, error_tx));

        Self { cities: Vec::new(), next_id: Some(0), writer: tx, last_error: error_rx }
    }

    pub fn cities(&self) -> &[CityEntry] {
        &self.cities
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    /// Append a city and persist the new list. Fails without touching the
    /// list when the name is blank or no unused id is left.
    pub fn add(&mut self, name: &str) -> Result<CityEntry, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }

        let id = self.next_id.ok_or(ValidationError::IdsExhausted)?;
        let entry = CityEntry { id: CityId(id), name: name.to_string() };
        self.next_id = id.checked_add(1);
        self.cities.push(entry.clone());
        tracing::info!(id = %entry.id, name = %entry.name, "city added");

        self.save();
        Ok(entry)
    }

    /// Remove the entry with `id` and persist the new list. Unknown ids change
    /// nothing and write nothing.
    pub fn delete(&mut self, id: CityId) -> Option<CityEntry> {
        let pos = self.cities.iter().position(|c| c.id == id)?;
        let removed = self.cities.remove(pos);
        tracing::info!(id = %removed.id, name = %removed.name, "city deleted");

        self.save();
        Some(removed)
    }

    /// Swap in a whole list without writing it back. Duplicate ids keep their
    /// first entry; ids handed out afterwards start above the largest one.
    pub fn replace(&mut self, cities: CityList) {
        let mut seen = std::collections::HashSet::new();
        let before = cities.len();
        self.cities = cities.into_iter().filter(|c| seen.insert(c.id)).collect();
        if self.cities.len() != before {
            tracing::warn!(dropped = before - self.cities.len(), "duplicate city ids dropped");
        }

        self.next_id = match self.cities.iter().map(|c| c.id.0).max() {
            Some(max) => max.checked_add(1),
            None => Some(0),
        };
        if self.next_id.is_none() {
            tracing::warn!("largest city id already in use; new cities cannot be added");
        }
    }

    /// Queue a write of the current list. Returns immediately.
    fn save(&self) {
        if self.writer.send(WriteCommand::Save(self.cities.clone())).is_err() {
            tracing::warn!("city list writer has stopped; change kept in memory only");
        }
    }

    /// Wait until every write queued so far has been attempted.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.writer.send(WriteCommand::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Message of the most recent failed write, cleared by the next success.
    pub fn last_write_error(&self) -> Option<String> {
        self.last_error.borrow().clone()
    }
}
