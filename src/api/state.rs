use axum::extract::FromRef;

use crate::services::card_service::CardService;

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub cards: CardService,
}

impl FromRef<AppState> for CardService {
    fn from_ref(state: &AppState) -> CardService {
        state.cards.clone()
    }
}
