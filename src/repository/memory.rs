use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CardRepository, RepositoryError};
use crate::models::{CardFilter, CardNumber, CardRecord, PageRequest};

/// Process-local card storage, used for `storage=memory` and in tests
#[derive(Debug, Default)]
pub struct InMemoryCardRepository {
    cards: RwLock<HashMap<CardNumber, CardRecord>>,
}

impl InMemoryCardRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CardRepository for InMemoryCardRepository {
    async fn insert(&self, card: &CardRecord) -> Result<(), RepositoryError> {
        let mut cards = self.cards.write().await;
        if cards.contains_key(&card.card_number) {
            return Err(RepositoryError::Duplicate(card.card_number.masked()));
        }
        cards.insert(card.card_number.clone(), card.clone());
        Ok(())
    }

    async fn find_by_number(
        &self,
        card_number: &CardNumber,
    ) -> Result<Option<CardRecord>, RepositoryError> {
        Ok(self.cards.read().await.get(card_number).cloned())
    }

    async fn save_blocked(&self, card: &CardRecord) -> Result<(), RepositoryError> {
        let mut cards = self.cards.write().await;
        let stored = cards
            .get_mut(&card.card_number)
            .ok_or_else(|| RepositoryError::NotFound(card.card_number.masked()))?;

        if stored.blocked {
            return Err(RepositoryError::Conflict(card.card_number.masked()));
        }

        stored.blocked = true;
        stored.blocked_at = card.blocked_at;
        stored.updated_at = card.updated_at;
        Ok(())
    }

    async fn find_page(
        &self,
        filter: &CardFilter,
        page: &PageRequest,
    ) -> Result<(Vec<CardRecord>, u64), RepositoryError> {
        let cards = self.cards.read().await;

        let mut matching: Vec<&CardRecord> = cards
            .values()
            .filter(|c| filter.matches(c.active, c.blocked))
            .collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.card_number.cmp(&b.card_number))
        });

        let total = matching.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let records = matching
            .into_iter()
            .skip(offset)
            .take(page.limit() as usize)
            .cloned()
            .collect();

        Ok((records, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::lifecycle;
    use chrono::{Duration, TimeZone, Utc};

    fn card(number: &str, minutes: i64) -> CardRecord {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes);
        let created = lifecycle::create(
            CardNumber::parse(number).unwrap(),
            "Test Holder".to_string(),
            now,
        )
        .unwrap();
        lifecycle::activate(created, now).unwrap()
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicates() {
        let repo = InMemoryCardRepository::new();
        let record = card("1020301234567801", 0);

        repo.insert(&record).await.unwrap();
        let err = repo.insert(&record).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Duplicate(_)));

        let found = repo.find_by_number(&record.card_number).await.unwrap();
        assert_eq!(found, Some(record));
    }

    #[tokio::test]
    async fn test_save_blocked_is_conditional() {
        let repo = InMemoryCardRepository::new();
        let record = card("1020301234567801", 0);
        repo.insert(&record).await.unwrap();

        let blocked = lifecycle::block(record.clone(), Utc::now()).unwrap();
        repo.save_blocked(&blocked).await.unwrap();
        assert!(matches!(
            repo.save_blocked(&blocked).await,
            Err(RepositoryError::Conflict(_))
        ));

        let missing = card("9999999999999999", 0);
        assert!(matches!(
            repo.save_blocked(&missing).await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_pages_are_newest_first_and_disjoint() {
        let repo = InMemoryCardRepository::new();
        for i in 0..7 {
            repo.insert(&card(&format!("10203000000000{:02}", i), i))
                .await
                .unwrap();
        }

        let mut seen = Vec::new();
        for p in 1..=3 {
            let (records, total) = repo
                .find_page(&CardFilter::default(), &PageRequest::new(Some(p), Some(3)))
                .await
                .unwrap();
            assert_eq!(total, 7);
            seen.extend(records);
        }

        assert_eq!(seen.len(), 7);
        assert!(seen.windows(2).all(|w| w[0].created_at > w[1].created_at));
        assert_eq!(seen[0].card_number.as_str(), "1020300000000006");
    }
}
