use async_trait::async_trait;
use sqlx::PgPool;

use super::{CardRepository, RepositoryError};
use crate::models::{CardFilter, CardNumber, CardRecord, PageRequest};

/// Card storage backed by the `cards` table
#[derive(Debug, Clone)]
pub struct PgCardRepository {
    pool: PgPool,
}

impl PgCardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[async_trait]
impl CardRepository for PgCardRepository {
    async fn insert(&self, card: &CardRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO cards (
                card_number, product_id, holder_name, expiration_date,
                active, blocked, balance, currency,
                created_at, activated_at, blocked_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(card.card_number.as_str())
        .bind(card.product_id.as_str())
        .bind(&card.holder_name)
        .bind(card.expiration_date.to_string())
        .bind(card.active)
        .bind(card.blocked)
        .bind(card.balance)
        .bind(card.currency.as_str())
        .bind(card.created_at)
        .bind(card.activated_at)
        .bind(card.blocked_at)
        .bind(card.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepositoryError::Duplicate(card.card_number.masked())
            } else {
                RepositoryError::Database(e)
            }
        })?;

        Ok(())
    }

    async fn find_by_number(
        &self,
        card_number: &CardNumber,
    ) -> Result<Option<CardRecord>, RepositoryError> {
        let card = sqlx::query_as::<_, CardRecord>(
            r#"
            SELECT * FROM cards WHERE card_number = $1
            "#,
        )
        .bind(card_number.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    async fn save_blocked(&self, card: &CardRecord) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE cards
            SET blocked = TRUE, blocked_at = $2, updated_at = $3
            WHERE card_number = $1 AND blocked = FALSE
            "#,
        )
        .bind(card.card_number.as_str())
        .bind(card.blocked_at)
        .bind(card.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Either the row vanished or another request blocked it first
            return match self.find_by_number(&card.card_number).await? {
                Some(_) => Err(RepositoryError::Conflict(card.card_number.masked())),
                None => Err(RepositoryError::NotFound(card.card_number.masked())),
            };
        }

        Ok(())
    }

    async fn find_page(
        &self,
        filter: &CardFilter,
        page: &PageRequest,
    ) -> Result<(Vec<CardRecord>, u64), RepositoryError> {
        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);

        let cards = sqlx::query_as::<_, CardRecord>(
            r#"
            SELECT * FROM cards
            WHERE ($1::BOOLEAN IS NULL OR active = $1)
              AND ($2::BOOLEAN IS NULL OR blocked = $2)
            ORDER BY created_at DESC, card_number ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.active)
        .bind(filter.blocked)
        .bind(i64::from(page.limit()))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM cards
            WHERE ($1::BOOLEAN IS NULL OR active = $1)
              AND ($2::BOOLEAN IS NULL OR blocked = $2)
            "#,
        )
        .bind(filter.active)
        .bind(filter.blocked)
        .fetch_one(&self.pool)
        .await?;

        Ok((cards, u64::try_from(total).unwrap_or_default()))
    }
}
