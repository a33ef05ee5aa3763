//! JSON-RPC 2.0 front-end for the relay.
//!
//! Methods: `SendMessage`, `FetchMessages`, `Pull`.

use crate::api::state::AppState;
use axum::{Json, body::Bytes, extract::State};
use postbox_core::{CoreError, Message};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

const JSONRPC_VERSION: &str = "2.0";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const INTERNAL_ERROR: i64 = -32603;
const REQUEST_CANCELLED: i64 = -32000;

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

impl JsonRpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<CoreError> for JsonRpcError {
    fn from(error: CoreError) -> Self {
        let code = match &error {
            CoreError::Validation(_) => INVALID_PARAMS,
            CoreError::Storage { .. } => {
                tracing::error!(error = %error, "Storage failure");
                INTERNAL_ERROR
            }
            CoreError::Cancelled { .. } => REQUEST_CANCELLED,
        };
        Self::new(code, error.to_string())
    }
}

impl JsonRpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SendMessageParams {
    #[serde(default)]
    sender: String,
    #[serde(default)]
    recipient: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct RecipientParams {
    #[serde(default)]
    recipient: String,
}

#[derive(Debug, Serialize)]
struct SendMessageResult {
    id: i64,
    sender: String,
    recipient: String,
    content: String,
    message: Message,
}

#[derive(Debug, Serialize)]
struct MessagesResult {
    messages: Vec<Message>,
}

// POST /rpc
pub async fn handle_rpc(State(state): State<AppState>, body: Bytes) -> Json<JsonRpcResponse> {
    let raw: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(err) => {
            return Json(JsonRpcResponse::failure(
                Value::Null,
                JsonRpcError::new(PARSE_ERROR, format!("Parse error: {err}")),
            ));
        }
    };

    let request: JsonRpcRequest = match serde_json::from_value(raw) {
        Ok(request) => request,
        Err(err) => {
            return Json(JsonRpcResponse::failure(
                Value::Null,
                JsonRpcError::new(INVALID_REQUEST, format!("Invalid request: {err}")),
            ));
        }
    };

    if request.jsonrpc != JSONRPC_VERSION {
        return Json(JsonRpcResponse::failure(
            request.id,
            JsonRpcError::new(INVALID_REQUEST, "Invalid request: jsonrpc must be \"2.0\""),
        ));
    }

    let id = request.id;
    match dispatch(&state, &request.method, request.params).await {
        Ok(result) => Json(JsonRpcResponse::success(id, result)),
        Err(error) => Json(JsonRpcResponse::failure(id, error)),
    }
}

async fn dispatch(
    state: &AppState,
    method: &str,
    params: Option<Value>,
) -> Result<Value, JsonRpcError> {
    tracing::debug!(method, "RPC call");

    match method {
        "SendMessage" => {
            let params: SendMessageParams = decode_params(params)?;
            let message = state
                .relay
                .send(params.sender, params.recipient, params.content)
                .await?;
            to_result(SendMessageResult {
                id: message.id,
                sender: message.sender.clone(),
                recipient: message.recipient.clone(),
                content: message.content.clone(),
                message,
            })
        }
        "FetchMessages" => {
            let params: RecipientParams = decode_params(params)?;
            let messages = state.relay.fetch(&params.recipient).await?;
            to_result(MessagesResult { messages })
        }
        "Pull" => {
            let params: RecipientParams = decode_params(params)?;
            let messages = state.relay.pull(&params.recipient).await?;
            to_result(MessagesResult { messages })
        }
        other => Err(JsonRpcError::new(
            METHOD_NOT_FOUND,
            format!("Method not found: {other}"),
        )),
    }
}

fn decode_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, JsonRpcError> {
    let params = params.unwrap_or_else(|| Value::Object(Default::default()));
    serde_json::from_value(params)
        .map_err(|err| JsonRpcError::new(INVALID_PARAMS, format!("Invalid params: {err}")))
}

fn to_result<T: Serialize>(result: T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(result).map_err(|err| {
        JsonRpcError::new(INTERNAL_ERROR, format!("Failed to encode result: {err}"))
    })
}
