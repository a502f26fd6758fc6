use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const PRODUCT_ID_LEN: usize = 6;
pub const CARD_NUMBER_LEN: usize = 16;
pub const HOLDER_NAME_MIN: usize = 2;
pub const HOLDER_NAME_MAX: usize = 100;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Product ID is required")]
    MissingProductId,

    #[error("Product ID must contain only digits")]
    NonNumericProductId,

    #[error("Product ID must be exactly 6 digits. Received: {0} digits")]
    ProductIdTooShort(usize),

    #[error("Product ID must be exactly 6 digits. Received: {len} digits. Use only the first 6 digits: {prefix}")]
    ProductIdTooLong { len: usize, prefix: String },

    #[error("Card number must be exactly 16 digits")]
    InvalidCardNumber,

    #[error("Holder name must be at least 2 characters")]
    HolderNameTooShort,

    #[error("Holder name cannot exceed 100 characters")]
    HolderNameTooLong,

    #[error("Expiration date must use the MM/YYYY format")]
    InvalidExpirationDate,

    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Six digit code identifying a card product line
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductId(String);

impl ProductId {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        if raw.is_empty() {
            return Err(ValidationError::MissingProductId);
        }
        if !all_digits(raw) {
            return Err(ValidationError::NonNumericProductId);
        }
        match raw.len() {
            PRODUCT_ID_LEN => Ok(Self(raw.to_string())),
            len if len < PRODUCT_ID_LEN => Err(ValidationError::ProductIdTooShort(len)),
            len => Err(ValidationError::ProductIdTooLong {
                len,
                prefix: raw[..PRODUCT_ID_LEN].to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProductId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ProductId> for String {
    fn from(value: ProductId) -> Self {
        value.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sixteen digit card number. The first six digits are the product id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardNumber(String);

impl CardNumber {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        if raw.len() != CARD_NUMBER_LEN || !all_digits(raw) {
            return Err(ValidationError::InvalidCardNumber);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn product_id(&self) -> ProductId {
        // Always six ASCII digits once the number parsed
        ProductId(self.0[..PRODUCT_ID_LEN].to_string())
    }

    /// Card number safe for logs, e.g. `102030******7801`
    pub fn masked(&self) -> String {
        format!("{}******{}", &self.0[..PRODUCT_ID_LEN], &self.0[12..])
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CardNumber {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CardNumber> for String {
    fn from(value: CardNumber) -> Self {
        value.0
    }
}

impl fmt::Display for CardNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trims the holder name and checks its length in characters
pub fn normalize_holder_name(raw: &str) -> Result<String, ValidationError> {
    let name = raw.trim();
    let len = name.chars().count();
    if len < HOLDER_NAME_MIN {
        return Err(ValidationError::HolderNameTooShort);
    }
    if len > HOLDER_NAME_MAX {
        return Err(ValidationError::HolderNameTooLong);
    }
    Ok(name.to_string())
}

/// Card expiration, rendered as `MM/YYYY`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub struct ExpirationDate {
    month: u32,
    year: i32,
}

impl ExpirationDate {
    pub fn new(month: u32, year: i32) -> Result<Self, ValidationError> {
        if !(1..=12).contains(&month) || !(0..=9999).contains(&year) {
            return Err(ValidationError::InvalidExpirationDate);
        }
        Ok(Self { month, year })
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }
}

impl FromStr for ExpirationDate {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (month, year) = s
            .split_once('/')
            .ok_or(ValidationError::InvalidExpirationDate)?;
        if month.len() != 2 || year.len() != 4 || !all_digits(month) || !all_digits(year) {
            return Err(ValidationError::InvalidExpirationDate);
        }
        let month = month
            .parse()
            .map_err(|_| ValidationError::InvalidExpirationDate)?;
        let year = year
            .parse()
            .map_err(|_| ValidationError::InvalidExpirationDate)?;
        Self::new(month, year)
    }
}

impl TryFrom<String> for ExpirationDate {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ExpirationDate> for String {
    fn from(value: ExpirationDate) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ExpirationDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:04}", self.month, self.year)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "USD")]
    Usd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
        }
    }
}

impl TryFrom<String> for Currency {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == Currency::Usd.as_str() {
            Ok(Currency::Usd)
        } else {
            Err(ValidationError::UnsupportedCurrency(value))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    #[sqlx(try_from = "String")]
    pub card_number: CardNumber,
    #[sqlx(try_from = "String")]
    pub product_id: ProductId,
    pub holder_name: String,
    #[sqlx(try_from = "String")]
    pub expiration_date: ExpirationDate,
    pub active: bool,
    pub blocked: bool,
    pub balance: i64, // always 0, placeholder
    #[sqlx(try_from = "String")]
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub blocked_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_id_accepts_six_digits() {
        let id = ProductId::parse("102030").unwrap();
        assert_eq!(id.as_str(), "102030");
    }

    #[test]
    fn test_product_id_rejections() {
        assert_eq!(ProductId::parse(""), Err(ValidationError::MissingProductId));
        assert_eq!(
            ProductId::parse("12a456"),
            Err(ValidationError::NonNumericProductId)
        );
        assert_eq!(
            ProductId::parse("12345"),
            Err(ValidationError::ProductIdTooShort(5))
        );
        assert_eq!(
            ProductId::parse("1234567"),
            Err(ValidationError::ProductIdTooLong {
                len: 7,
                prefix: "123456".to_string()
            })
        );
    }

    #[test]
    fn test_too_long_message_suggests_prefix() {
        let err = ProductId::parse("10203040").unwrap_err();
        assert!(err.to_string().contains("first 6 digits: 102030"));
    }

    #[test]
    fn test_card_number_parsing() {
        let number = CardNumber::parse("1020301234567801").unwrap();
        assert_eq!(number.product_id().as_str(), "102030");
        assert_eq!(number.masked(), "102030******7801");

        assert!(CardNumber::parse("123").is_err());
        assert!(CardNumber::parse("10203012345678011").is_err());
        assert!(CardNumber::parse("10203012345678a1").is_err());
        assert!(CardNumber::parse("١٠٢٠٣٠١٢٣٤٥٦٧٨").is_err());
    }

    #[test]
    fn test_holder_name_bounds() {
        assert_eq!(normalize_holder_name("  Juan Pérez ").unwrap(), "Juan Pérez");
        assert_eq!(
            normalize_holder_name("A"),
            Err(ValidationError::HolderNameTooShort)
        );
        assert_eq!(
            normalize_holder_name("  A  "),
            Err(ValidationError::HolderNameTooShort)
        );
        assert!(normalize_holder_name(&"é".repeat(100)).is_ok());
        assert_eq!(
            normalize_holder_name(&"x".repeat(101)),
            Err(ValidationError::HolderNameTooLong)
        );
    }

    #[test]
    fn test_expiration_date_format() {
        let date = ExpirationDate::new(3, 2029).unwrap();
        assert_eq!(date.to_string(), "03/2029");
        assert_eq!("12/2031".parse::<ExpirationDate>().unwrap().month(), 12);
        assert!("13/2031".parse::<ExpirationDate>().is_err());
        assert!("00/2031".parse::<ExpirationDate>().is_err());
        assert!("3/2031".parse::<ExpirationDate>().is_err());
        assert!(ExpirationDate::new(0, 2030).is_err());
    }

    #[test]
    fn test_currency_only_usd() {
        assert_eq!(Currency::try_from("USD".to_string()), Ok(Currency::Usd));
        assert!(Currency::try_from("EUR".to_string()).is_err());
        assert_eq!(serde_json::to_value(Currency::Usd).unwrap(), "USD");
    }

    #[test]
    fn test_card_record_serializes_camel_case() {
        let created_at = "2025-03-01T10:00:00.123456Z".parse().unwrap();
        let card = CardRecord {
            card_number: CardNumber::parse("1020301234567801").unwrap(),
            product_id: ProductId::parse("102030").unwrap(),
            holder_name: "Juan Pérez".to_string(),
            expiration_date: ExpirationDate::new(3, 2028).unwrap(),
            active: true,
            blocked: false,
            balance: 0,
            currency: Currency::Usd,
            created_at,
            activated_at: Some(created_at),
            blocked_at: None,
            updated_at: created_at,
        };

        let value = serde_json::to_value(&card).unwrap();
        assert_eq!(value["cardNumber"], "1020301234567801");
        assert_eq!(value["productId"], "102030");
        assert_eq!(value["expirationDate"], "03/2028");
        assert_eq!(value["currency"], "USD");
        assert_eq!(value["createdAt"], "2025-03-01T10:00:00.123456Z");
        assert!(value["blockedAt"].is_null());
    }
}
