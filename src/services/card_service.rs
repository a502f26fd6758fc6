use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};

use crate::models::{
    card::{normalize_holder_name, CardNumber, CardRecord, ProductId, ValidationError},
    CardFilter, Page, PageRequest, Pagination,
};
use crate::repository::{CardRepository, RepositoryError};
use crate::services::card_number::{self, CardNumberError};
use crate::services::lifecycle::{self, LifecycleError};

#[derive(thiserror::Error, Debug)]
pub enum CardError {
    #[error(transparent)]
    InvalidInput(#[from] ValidationError),

    #[error("A card with this number already exists")]
    DuplicateCard,

    #[error("Card not found")]
    CardNotFound,

    #[error("Card is already blocked")]
    AlreadyBlocked,

    #[error("Internal error")]
    Internal(#[source] anyhow::Error),
}

impl From<RepositoryError> for CardError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Duplicate(_) => CardError::DuplicateCard,
            RepositoryError::NotFound(_) => CardError::CardNotFound,
            RepositoryError::Conflict(_) => CardError::AlreadyBlocked,
            err @ RepositoryError::Database(_) => CardError::Internal(err.into()),
        }
    }
}

impl From<LifecycleError> for CardError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::AlreadyBlocked => CardError::AlreadyBlocked,
            err @ LifecycleError::AlreadyActive => CardError::Internal(err.into()),
        }
    }
}

impl From<CardNumberError> for CardError {
    fn from(err: CardNumberError) -> Self {
        match err {
            CardNumberError::InvalidProductId(e) => CardError::InvalidInput(e),
            err @ CardNumberError::RandomSource => CardError::Internal(err.into()),
        }
    }
}

/// Current time at the microsecond precision Postgres `TIMESTAMPTZ` stores, so a record
/// returned by a write matches the same record read back later
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Preview produced by number generation; nothing is stored
#[derive(Debug, Clone)]
pub struct GeneratedNumber {
    pub product_id: ProductId,
    pub card_number: CardNumber,
    pub generated_at: DateTime<Utc>,
}

/// Request to enroll (create and activate) a card
#[derive(Debug, Clone)]
pub struct EnrollCardRequest {
    pub card_number: String,
    pub holder_name: String,
}

/// Card use cases over an injected repository
#[derive(Clone)]
pub struct CardService {
    repo: Arc<dyn CardRepository>,
}

impl CardService {
    pub fn new(repo: Arc<dyn CardRepository>) -> Self {
        Self { repo }
    }

    pub fn generate_number(&self, product_id: &str) -> Result<GeneratedNumber, CardError> {
        let card_number = card_number::generate(product_id)?;

        tracing::debug!(card = %card_number.masked(), "Generated card number");

        Ok(GeneratedNumber {
            product_id: card_number.product_id(),
            card_number,
            generated_at: Utc::now(),
        })
    }

    /// Creates the card and activates it in one step.
    ///
    /// The existence pre-check only gives a clean error early; the repository's unique
    /// constraint is what actually rejects a concurrent duplicate.
    #[tracing::instrument(skip(self, request))]
    pub async fn enroll(&self, request: EnrollCardRequest) -> Result<CardRecord, CardError> {
        let card_number = CardNumber::parse(&request.card_number)?;
        let holder_name = normalize_holder_name(&request.holder_name)?;

        if self.repo.find_by_number(&card_number).await?.is_some() {
            tracing::warn!(card = %card_number.masked(), "Enrollment rejected, card exists");
            return Err(CardError::DuplicateCard);
        }

        let created = lifecycle::create(card_number, holder_name, now())?;
        let card = lifecycle::activate(created, now())?;

        self.repo.insert(&card).await.map_err(|e| {
            if matches!(e, RepositoryError::Duplicate(_)) {
                tracing::warn!(card = %card.card_number.masked(), "Lost enrollment race");
            }
            CardError::from(e)
        })?;

        tracing::info!(
            card = %card.card_number.masked(),
            product_id = %card.product_id,
            expiration = %card.expiration_date,
            "Card enrolled and activated"
        );

        Ok(card)
    }

    #[tracing::instrument(skip(self, card_number))]
    pub async fn block(&self, card_number: &str) -> Result<CardRecord, CardError> {
        let card_number = CardNumber::parse(card_number)?;

        let card = self
            .repo
            .find_by_number(&card_number)
            .await?
            .ok_or(CardError::CardNotFound)?;

        let card = lifecycle::block(card, now())?;
        self.repo.save_blocked(&card).await?;

        tracing::info!(card = %card.card_number.masked(), "Card blocked");

        Ok(card)
    }

    pub async fn get(&self, card_number: &str) -> Result<CardRecord, CardError> {
        let card_number = CardNumber::parse(card_number)?;

        self.repo
            .find_by_number(&card_number)
            .await?
            .ok_or(CardError::CardNotFound)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(
        &self,
        filter: CardFilter,
        page: PageRequest,
    ) -> Result<Page<CardRecord>, CardError> {
        let (records, total) = self.repo.find_page(&filter, &page).await?;

        tracing::debug!(returned = records.len(), total, "Listed cards");

        Ok(Page {
            records,
            pagination: Pagination::new(page, total),
        })
    }
}
