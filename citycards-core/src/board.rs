//! Screen controller: the city registry plus one mounted card per city.
//!
//! All card state changes go through [`Board::handle`], fed from a single
//! message channel shared by every card. Cards are mounted when a city is
//! added or loaded and dropped (cancelling any fetch) when it is deleted.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{
    card::{CardMessage, WeatherCard},
    error::ValidationError,
    model::CityId,
    provider::WeatherProvider,
    registry::CityRegistry,
    store::KeyValueStore,
};

#[derive(Debug)]
pub struct Board {
    registry: CityRegistry,
    cards: Vec<WeatherCard>,
    provider: Arc<dyn WeatherProvider>,
    tx: mpsc::UnboundedSender<CardMessage>,
    rx: mpsc::UnboundedReceiver<CardMessage>,
}

impl Board {
    /// Load the city list once and mount a card for each entry.
    pub async fn open(store: Arc<dyn KeyValueStore>, provider: Arc<dyn WeatherProvider>) -> Self {
        let registry = CityRegistry::load(store).await;
        let (tx, rx) = mpsc::unbounded_channel();

        let cards = registry
            .cities()
            .iter()
            .map(|entry| WeatherCard::mount(entry.clone(), Arc::clone(&provider), tx.clone()))
            .collect();

        Self { registry, cards, provider, tx, rx }
    }

    pub fn registry(&self) -> &CityRegistry {
        &self.registry
    }

    /// Cards in display order.
    pub fn cards(&self) -> &[WeatherCard] {
        &self.cards
    }

    pub fn card(&self, id: CityId) -> Option<&WeatherCard> {
        self.cards.iter().find(|c| c.id() == id)
    }

    fn card_mut(&mut self, id: CityId) -> Option<&mut WeatherCard> {
        self.cards.iter_mut().find(|c| c.id() == id)
    }

    pub fn add_city(&mut self, name: &str) -> Result<CityId, ValidationError> {
        let entry = self.registry.add(name)?;
        let id = entry.id;
        self.cards.push(WeatherCard::mount(entry, Arc::clone(&self.provider), self.tx.clone()));
        Ok(id)
    }

    /// Remove a city and unmount its card. Returns false for unknown ids.
    pub fn delete_city(&mut self, id: CityId) -> bool {
        if self.registry.delete(id).is_none() {
            return false;
        }
        self.cards.retain(|c| c.id() != id);
        true
    }

    /// Ask the card for `id` to request its own deletion, as its delete
    /// button would. The deletion happens when the message is handled.
    pub fn request_delete(&self, id: CityId) -> bool {
        match self.card(id) {
            Some(card) => {
                card.request_delete();
                true
            }
            None => false,
        }
    }

    pub fn refresh(&mut self, id: CityId) -> bool {
        self.card_mut(id).is_some_and(WeatherCard::refresh)
    }

    /// Refresh every card that is not already loading; returns how many started.
    pub fn refresh_all(&mut self) -> usize {
        self.cards.iter_mut().map(WeatherCard::refresh).filter(|started| *started).count()
    }

    pub fn handle(&mut self, msg: CardMessage) {
        match msg {
            CardMessage::FetchDone { id, generation, result } => match self.card_mut(id) {
                Some(card) => {
                    card.apply(generation, result);
                }
                None => tracing::debug!(%id, "fetch result for unmounted card dropped"),
            },
            CardMessage::DeleteRequested(id) => {
                self.delete_city(id);
            }
        }
    }

    /// Wait for the next card message. The board keeps a sender of its own,
    /// so this only resolves when a message arrives.
    pub async fn next_message(&mut self) -> Option<CardMessage> {
        self.rx.recv().await
    }

    /// Handle every message already queued without waiting; returns the count.
    pub fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(msg) = self.rx.try_recv() {
            self.handle(msg);
            handled += 1;
        }
        handled
    }

    pub fn is_loading(&self) -> bool {
        self.cards.iter().any(WeatherCard::is_loading)
    }

    /// Process messages until no card is loading.
    pub async fn settle(&mut self) {
        loop {
            self.drain();
            if !self.is_loading() {
                break;
            }
            if let Some(msg) = self.next_message().await {
                self.handle(msg);
            }
        }
    }

    /// Most recent persistence failure, if the last write did not succeed.
    pub fn persistence_notice(&self) -> Option<String> {
        self.registry.last_write_error()
    }

    /// Wait for pending writes. Cards are dropped with the board.
    pub async fn close(self) {
        self.registry.flush().await;
    }
}
