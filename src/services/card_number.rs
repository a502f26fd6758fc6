use ring::rand::{SecureRandom, SystemRandom};

use crate::models::card::{CardNumber, ProductId, ValidationError, CARD_NUMBER_LEN, PRODUCT_ID_LEN};

const RANDOM_DIGITS: usize = CARD_NUMBER_LEN - PRODUCT_ID_LEN;

// Largest multiple of 10 that fits in a byte; bytes at or above it are redrawn
const UNBIASED_BYTE_LIMIT: u8 = 250;

#[derive(thiserror::Error, Debug)]
pub enum CardNumberError {
    #[error(transparent)]
    InvalidProductId(#[from] ValidationError),

    #[error("Random source unavailable")]
    RandomSource,
}

/// Generates a candidate card number: the product id followed by ten uniform random digits.
///
/// Nothing is persisted and no existence check is made. Two calls may in principle collide;
/// uniqueness is enforced when the card is enrolled.
pub fn generate(product_id: &str) -> Result<CardNumber, CardNumberError> {
    let product_id = ProductId::parse(product_id)?;
    generate_with(&SystemRandom::new(), &product_id)
}

pub fn generate_with(
    rng: &dyn SecureRandom,
    product_id: &ProductId,
) -> Result<CardNumber, CardNumberError> {
    let mut number = String::with_capacity(CARD_NUMBER_LEN);
    number.push_str(product_id.as_str());

    let mut buf = [0u8; RANDOM_DIGITS * 2];
    while number.len() < CARD_NUMBER_LEN {
        rng.fill(&mut buf).map_err(|_| CardNumberError::RandomSource)?;
        append_digits(&mut number, &buf);
    }

    // Product id and digits are all ASCII digits, so this cannot fail
    Ok(CardNumber::parse(&number)?)
}

/// Maps random bytes to decimal digits until the number is full, skipping biased bytes
fn append_digits(number: &mut String, bytes: &[u8]) {
    for byte in bytes.iter().filter(|b| **b < UNBIASED_BYTE_LIMIT) {
        if number.len() == CARD_NUMBER_LEN {
            break;
        }
        number.push(char::from(b'0' + byte % 10));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_keeps_product_prefix() {
        for _ in 0..50 {
            let number = generate("102030").unwrap();
            assert_eq!(number.as_str().len(), 16);
            assert!(number.as_str().starts_with("102030"));
            assert!(number.as_str().bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn test_generate_rejects_bad_product_id() {
        assert!(matches!(
            generate("12345"),
            Err(CardNumberError::InvalidProductId(
                ValidationError::ProductIdTooShort(5)
            ))
        ));
        assert!(matches!(
            generate("abcdef"),
            Err(CardNumberError::InvalidProductId(
                ValidationError::NonNumericProductId
            ))
        ));
    }

    #[test]
    fn test_generate_is_not_deterministic() {
        let numbers: HashSet<String> = (0..100)
            .map(|_| generate("999999").unwrap().to_string())
            .collect();
        assert!(numbers.len() > 95);
    }

    #[test]
    fn test_digit_mapping_skips_biased_bytes() {
        let mut number = "111111".to_string();
        append_digits(&mut number, &[13, 250, 255, 9, 249, 100]);
        assert_eq!(number, "1111113990");

        append_digits(&mut number, &[7; 20]);
        assert_eq!(number, "1111113990777777");
    }
}
