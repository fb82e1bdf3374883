//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.
//!
//! The caller's identity is taken from the upgrade request headers and holds
//! for the whole connection.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};

use crate::protocol::{to_test_out, ClientWsMessage, ServerWsMessage};
use crate::logic::submit_answers;
use crate::routes::identity::MaybeUser;
use crate::state::AppState;

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(
  ws: WebSocketUpgrade,
  State(state): State<Arc<AppState>>,
  MaybeUser(user): MaybeUser,
) -> impl IntoResponse {
  info!(target: "listening_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state, user))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>, user: Option<String>) {
  info!(target: "listening_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "listening_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state, user.as_deref()).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "listening_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "listening_backend", "WebSocket disconnected");
}

#[instrument(level = "info", skip(state))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState, user: Option<&str>) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::NewTest => match state.choose_test(user).await {
      Ok(clip) => {
        info!(target: "practice", id = %clip.id, "WS test served");
        ServerWsMessage::Test { test: to_test_out(&clip) }
      }
      Err(e) => ServerWsMessage::Error { message: e.to_string() },
    },

    ClientWsMessage::SubmitAnswers { audio_id, answers, time_spent } => {
      match submit_answers(state, user, &audio_id, &answers, time_spent).await {
        Ok(out) => ServerWsMessage::GradeResult(out),
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }
  }
}
