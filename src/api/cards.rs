use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{route_not_found, ApiResponse, AppState};
use crate::error::Result;
use crate::models::{CardFilter, CardNumber, CardRecord, Page, PageRequest, ProductId};
use crate::services::card_service::EnrollCardRequest;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedNumberResponse {
    product_id: ProductId,
    card_number: CardNumber,
    timestamp: DateTime<Utc>,
}

/// Generates a card number preview for a product
async fn generate_number(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<ApiResponse<GeneratedNumberResponse>>> {
    let generated = state.cards.generate_number(&product_id)?;

    Ok(Json(ApiResponse::with_message(
        "Card number generated successfully",
        GeneratedNumberResponse {
            product_id: generated.product_id,
            card_number: generated.card_number,
            timestamp: generated.generated_at,
        },
    )))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnrollCardBody {
    card_number: String,
    holder_name: String,
}

async fn enroll_card(
    State(state): State<AppState>,
    body: std::result::Result<Json<EnrollCardBody>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<CardRecord>>)> {
    let Json(body) = body?;

    let card = state
        .cards
        .enroll(EnrollCardRequest {
            card_number: body.card_number,
            holder_name: body.holder_name,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Card activated successfully", card)),
    ))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BlockedCardResponse {
    card_id: CardNumber,
    blocked: bool,
    blocked_at: Option<DateTime<Utc>>,
}

async fn block_card(
    State(state): State<AppState>,
    Path(card_id): Path<String>,
) -> Result<Json<ApiResponse<BlockedCardResponse>>> {
    let card = state.cards.block(&card_id).await?;

    Ok(Json(ApiResponse::with_message(
        "Card blocked successfully",
        BlockedCardResponse {
            card_id: card.card_number,
            blocked: card.blocked,
            blocked_at: card.blocked_at,
        },
    )))
}

async fn get_card(
    State(state): State<AppState>,
    Path(card_id): Path<String>,
) -> Result<Json<ApiResponse<CardRecord>>> {
    let card = state.cards.get(&card_id).await?;

    Ok(Json(ApiResponse::ok(card)))
}

#[derive(Debug, Deserialize)]
struct ListCardsQuery {
    page: Option<u32>,
    limit: Option<u32>,
    active: Option<bool>,
    blocked: Option<bool>,
}

/// Lists cards newest first. Out-of-range `page`/`limit` values are clamped.
async fn list_cards(
    State(state): State<AppState>,
    query: std::result::Result<Query<ListCardsQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Page<CardRecord>>>> {
    let Query(query) = query?;

    let filter = CardFilter {
        active: query.active,
        blocked: query.blocked,
    };
    let page = state
        .cards
        .list(filter, PageRequest::new(query.page, query.limit))
        .await?;

    Ok(Json(ApiResponse::ok(page)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/card/enroll", post(enroll_card).fallback(route_not_found))
        .route("/card/:id/number", get(generate_number).fallback(route_not_found))
        .route("/card/:id", get(get_card).delete(block_card).fallback(route_not_found))
        .route("/cards", get(list_cards).fallback(route_not_found))
}
