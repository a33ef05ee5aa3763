use crate::api::{ApiResponse, response::ApiError, state::AppState};
use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use postbox_core::{Message, RelayStats};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct RecipientQuery {
    #[serde(default)]
    pub recipient: String,
}

#[derive(Debug, Serialize)]
pub struct PullMessagesResponse {
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(flatten)]
    pub stats: RelayStats,
}

// POST /messages
pub async fn send_message(
    State(state): State<AppState>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        ApiError::bad_request(format!("Invalid request body: {rejection}"))
    })?;

    let message = state
        .relay
        .send(request.sender, request.recipient, request.content)
        .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

// GET /messages?recipient=
pub async fn fetch_messages(
    State(state): State<AppState>,
    Query(query): Query<RecipientQuery>,
) -> Result<Json<ApiResponse<Vec<Message>>>, ApiError> {
    let messages = state.relay.fetch(&query.recipient).await?;
    Ok(Json(ApiResponse::ok(messages)))
}

// GET /pull?recipient=
pub async fn pull_messages(
    State(state): State<AppState>,
    Query(query): Query<RecipientQuery>,
) -> Result<Json<PullMessagesResponse>, ApiError> {
    let messages = state.relay.pull(&query.recipient).await?;
    Ok(Json(PullMessagesResponse { messages }))
}

// GET /health
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let stats = state.relay.stats().await?;
    Ok(Json(HealthResponse {
        status: "postbox is working!".to_string(),
        stats,
    }))
}
