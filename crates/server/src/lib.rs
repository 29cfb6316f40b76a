//! Gambit match server
//!
//! Websocket transport around the engine: a lobby channel for matchmaking,
//! one channel per live game, and the headless block-to-source conversion
//! endpoint. All game mutation happens behind one lock per game.

pub mod convert;
pub mod game_ws;
pub mod lobby_ws;
pub mod messages;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws/lobby", get(lobby_ws::lobby_handler))
        .route("/ws/game/:game_id", get(game_ws::game_handler))
        .route("/convert", post(convert::convert_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
