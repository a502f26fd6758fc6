// Services module - Business logic

pub mod card_number;
pub mod card_service;
pub mod lifecycle;
