//! Interactive board: card list plus a menu for add, refresh and delete.

use std::fmt;

use anyhow::Context;
use citycards_core::{Board, CityId};
use inquire::{InquireError, Select, Text};

#[derive(Debug, Clone)]
enum MenuItem {
    Add,
    RefreshAll,
    Refresh(CityId, String),
    Delete(CityId, String),
    Quit,
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuItem::Add => f.write_str("Add"),
            MenuItem::RefreshAll => f.write_str("Refresh all"),
            MenuItem::Refresh(_, name) => write!(f, "Refresh {name}"),
            MenuItem::Delete(_, name) => write!(f, "x {name}"),
            MenuItem::Quit => f.write_str("Quit"),
        }
    }
}

fn menu(board: &Board) -> Vec<MenuItem> {
    let mut items = vec![MenuItem::Add];
    if !board.cards().is_empty() {
        items.push(MenuItem::RefreshAll);
    }
    for card in board.cards() {
        items.push(MenuItem::Refresh(card.id(), card.name().to_string()));
    }
    for card in board.cards() {
        items.push(MenuItem::Delete(card.id(), card.name().to_string()));
    }
    items.push(MenuItem::Quit);
    items
}

pub fn render(board: &Board) {
    println!("\n== Weather App ==");
    if board.cards().is_empty() {
        println!("No cities yet. Choose Add to track one.");
    }
    for card in board.cards() {
        println!("\n{card}");
    }
    println!();
    crate::cli::report_write_error(board.persistence_notice());
}

/// Returns `None` when the dialog was cancelled.
async fn prompt<T, F>(f: F) -> anyhow::Result<Option<T>>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, InquireError> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await.context("Prompt task failed")? {
        Ok(value) => Ok(Some(value)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(anyhow::Error::new(e).context("Prompt failed")),
    }
}

/// Where the board loop gets its next action from.
trait Actions {
    /// `None` when the menu was cancelled.
    async fn choose(&mut self, items: Vec<MenuItem>) -> anyhow::Result<Option<MenuItem>>;

    /// `None` when the name dialog was cancelled.
    async fn city_name(&mut self) -> anyhow::Result<Option<String>>;
}

/// Terminal prompts.
struct Prompts;

impl Actions for Prompts {
    async fn choose(&mut self, items: Vec<MenuItem>) -> anyhow::Result<Option<MenuItem>> {
        prompt(move || Select::new("Action:", items).prompt()).await
    }

    async fn city_name(&mut self) -> anyhow::Result<Option<String>> {
        prompt(|| {
            Text::new("Add a new City")
                .with_placeholder("cityname")
                .with_help_message("Enter to add, Esc to cancel")
                .prompt()
        })
        .await
    }
}

pub async fn run(board: Board) -> anyhow::Result<()> {
    run_with(board, Prompts).await
}

/// Drive the board until Quit, then wait for pending writes. Writes are
/// flushed on the error path too.
async fn run_with(mut board: Board, mut actions: impl Actions) -> anyhow::Result<()> {
    let result = run_loop(&mut board, &mut actions).await;
    board.close().await;
    result
}

async fn run_loop(board: &mut Board, actions: &mut impl Actions) -> anyhow::Result<()> {
    loop {
        board.settle().await;
        render(board);

        match actions.choose(menu(board)).await? {
            None | Some(MenuItem::Quit) => return Ok(()),
            Some(MenuItem::Add) => {
                if let Some(name) = actions.city_name().await? {
                    if let Err(e) = board.add_city(&name) {
                        println!("{e}");
                    }
                }
            }
            Some(MenuItem::RefreshAll) => {
                board.refresh_all();
            }
            Some(MenuItem::Refresh(id, _)) => {
                board.refresh(id);
            }
            Some(MenuItem::Delete(id, _)) => {
                board.request_delete(id);
                board.drain();
            }
        }
    }
}
