//! Card state transitions.
//!
//! Every function here is pure: it takes the current record and a timestamp and returns the
//! next record. Persisting the result is the caller's job.

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::models::card::{CardNumber, CardRecord, Currency, ExpirationDate, ValidationError};

/// Years a card stays valid after creation
pub const VALIDITY_YEARS: i32 = 3;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Card is already active")]
    AlreadyActive,

    #[error("Card is already blocked")]
    AlreadyBlocked,
}

/// Expiration for a card created at `now`: same month, three years later.
///
/// A February 29 creation date rolls over to March 1, so the month moves forward.
pub fn expiration_date(now: DateTime<Utc>) -> Result<ExpirationDate, ValidationError> {
    let today = now.date_naive();
    let year = today.year() + VALIDITY_YEARS;
    let target = today
        .with_year(year)
        .or_else(|| NaiveDate::from_ymd_opt(year, 3, 1))
        .ok_or(ValidationError::InvalidExpirationDate)?;
    ExpirationDate::new(target.month(), target.year())
}

/// Builds a fresh, inactive record. `holder_name` must already be normalized.
pub fn create(
    card_number: CardNumber,
    holder_name: String,
    now: DateTime<Utc>,
) -> Result<CardRecord, ValidationError> {
    Ok(CardRecord {
        product_id: card_number.product_id(),
        card_number,
        holder_name,
        expiration_date: expiration_date(now)?,
        active: false,
        blocked: false,
        balance: 0,
        currency: Currency::Usd,
        created_at: now,
        activated_at: None,
        blocked_at: None,
        updated_at: now,
    })
}

pub fn activate(card: CardRecord, now: DateTime<Utc>) -> Result<CardRecord, LifecycleError> {
    if card.active {
        return Err(LifecycleError::AlreadyActive);
    }
    Ok(CardRecord {
        active: true,
        activated_at: Some(now),
        updated_at: now,
        ..card
    })
}

/// Blocking only adds the restriction flag; `active` is left as is
pub fn block(card: CardRecord, now: DateTime<Utc>) -> Result<CardRecord, LifecycleError> {
    if card.blocked {
        return Err(LifecycleError::AlreadyBlocked);
    }
    Ok(CardRecord {
        blocked: true,
        blocked_at: Some(now),
        updated_at: now,
        ..card
    })
}
