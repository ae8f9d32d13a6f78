use tracing::{debug, warn};
use chrono::Utc;

use crate::app::AppState;
use crate::models::{PingMessage, PongMessage, SendMessage};
use crate::ws::connctx::ConnId;
use super::relay::RelayError;

/// Handle PingMessage
pub async fn handle_ping_message(state: &AppState, conn: ConnId, ping_msg: PingMessage) -> Result<(), RelayError> {
    // Handle ping message - send a pong message back.
    debug!("Ping received from connection {} (user {:?})", conn, ping_msg.user);

    // Reply with pong
    let pong = SendMessage::Pong(PongMessage { date: Utc::now().to_rfc3339() });
    if !state.mux.send_to(conn, &pong).await {
        warn!("Failed to send Pong message to connection {}", conn);
    }
    Ok(())
}
