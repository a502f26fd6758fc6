// Repository module - persistence boundary for card records

use async_trait::async_trait;

use crate::models::{CardFilter, CardNumber, CardRecord, PageRequest};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryCardRepository;
pub use postgres::PgCardRepository;

#[derive(thiserror::Error, Debug)]
pub enum RepositoryError {
    #[error("Card {0} already exists")]
    Duplicate(String),

    #[error("Card {0} not found")]
    NotFound(String),

    #[error("Card {0} changed concurrently")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait CardRepository: Send + Sync {
    /// Inserts a new record. Fails with `Duplicate` when the card number exists; the check
    /// and the insert are a single atomic step.
    async fn insert(&self, card: &CardRecord) -> Result<(), RepositoryError>;

    async fn find_by_number(
        &self,
        card_number: &CardNumber,
    ) -> Result<Option<CardRecord>, RepositoryError>;

    /// Persists a block transition. Fails with `Conflict` if the stored record is already
    /// blocked and `NotFound` if it does not exist.
    async fn save_blocked(&self, card: &CardRecord) -> Result<(), RepositoryError>;

    /// Returns one page of matching records, newest first, and the total match count
    async fn find_page(
        &self,
        filter: &CardFilter,
        page: &PageRequest,
    ) -> Result<(Vec<CardRecord>, u64), RepositoryError>;
}

/// Storage whose existence lookup always misses but whose insert hits the unique
/// constraint, the way a concurrent enrollment of the same number looks from the loser.
#[cfg(test)]
pub(crate) struct UniqueViolationRepository;

#[cfg(test)]
#[async_trait]
impl CardRepository for UniqueViolationRepository {
    async fn insert(&self, card: &CardRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Duplicate(card.card_number.masked()))
    }

    async fn find_by_number(
        &self,
        _card_number: &CardNumber,
    ) -> Result<Option<CardRecord>, RepositoryError> {
        Ok(None)
    }

    async fn save_blocked(&self, card: &CardRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::NotFound(card.card_number.masked()))
    }

    async fn find_page(
        &self,
        _filter: &CardFilter,
        _page: &PageRequest,
    ) -> Result<(Vec<CardRecord>, u64), RepositoryError> {
        Ok((Vec::new(), 0))
    }
}
