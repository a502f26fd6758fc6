// Models module - card entity, value types and list paging

pub mod card;
pub mod pagination;

pub use card::{CardNumber, CardRecord, Currency, ExpirationDate, ProductId, ValidationError};
pub use pagination::{CardFilter, Page, PageRequest, Pagination};
