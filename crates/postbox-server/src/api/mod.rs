pub mod messages;
pub mod response;
pub mod rpc;
pub mod state;

pub use response::ApiResponse;
pub use state::AppState;

use axum::{
    Router,
    routing::{get, post},
};

/// REST surface: send, fetch and pull plus a health check.
pub fn http_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(messages::health))
        .route(
            "/messages",
            get(messages::fetch_messages).post(messages::send_message),
        )
        .route("/pull", get(messages::pull_messages))
        .with_state(state)
}

/// JSON-RPC surface, served on its own listener.
pub fn rpc_router(state: AppState) -> Router {
    Router::new()
        .route("/rpc", post(rpc::handle_rpc))
        .with_state(state)
}
