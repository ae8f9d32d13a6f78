use std::sync::Arc;
use axum::{
    extract::{State, ws::{Message, WebSocket, WebSocketUpgrade}},
    response::Response,
};
use tokio::sync::mpsc;
use tracing::{info, warn, debug};
use futures_util::{StreamExt, SinkExt};

use crate::app::AppState;
use super::relay;

/// WebSocket handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    info!("New WebSocket connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {

    // Split the socket into sender and receiver
    let (mut sender, mut receiver) = socket.split();

    // Register with the multiplexer; everything addressed to this connection
    // arrives on `outbound`
    let (tx, mut outbound) = mpsc::unbounded_channel::<String>();
    let conn = app_state.mux.connect(tx).await;
    info!("WebSocket connection established with connection_id: {}", conn);

    // Forward queued frames to the client
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    // Process inbound frames one at a time, in arrival order
    let recv_state = app_state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => relay::handle_frame(&recv_state, conn, &text).await,
                Ok(Message::Close(_)) => break,
                Ok(_) => debug!("Ignoring non-text frame from {}", conn),
                Err(e) => {
                    warn!("WebSocket error on connection {}: {}", conn, e);
                    break;
                }
            }
        }
    });

    // Wait for either task to finish (and finish the other)
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    app_state.mux.disconnect(conn).await;
    info!("WebSocket connection {} terminated", conn);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::build_router;
    use crate::config::Config;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tokio::net::{TcpListener, TcpStream};
    use tokio_tungstenite::tungstenite::Message as WsMessage;
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn serve() -> (String, Arc<AppState>) {
        let state = Arc::new(AppState::in_memory(Config::default()));
        let app = build_router(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("ws://{}/ws", addr), state)
    }

    async fn client(url: &str) -> Client {
        let (ws, _) = connect_async(url).await.unwrap();
        ws
    }

    async fn send(ws: &mut Client, msg: Value) {
        ws.send(WsMessage::text(msg.to_string())).await.unwrap();
    }

    async fn recv(ws: &mut Client) -> Value {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
                .await
                .expect("timed out waiting for a frame")
                .expect("connection closed")
                .unwrap();
            if let WsMessage::Text(text) = msg {
                return serde_json::from_str(text.as_str()).unwrap();
            }
        }
    }

    /// Round-trip a ping: every frame sent before it has been handled once the pong arrives.
    async fn sync(ws: &mut Client) {
        send(ws, json!({"type": "ping"})).await;
        assert_eq!(recv(ws).await["type"], "pong");
    }

    #[tokio::test]
    async fn shared_viewing_session() {
        let (url, state) = serve().await;

        // A opens a fresh room
        let mut a = client(&url).await;
        send(&mut a, json!({"type": "join", "roomId": "r1"})).await;
        assert_eq!(recv(&mut a).await, json!({"type": "initialData", "roomId": "r1", "highlights": [], "notes": []}));

        send(&mut a, json!({"type": "documentUploaded", "roomId": "r1", "url": "http://x/doc.pdf"})).await;
        sync(&mut a).await;

        // B joins late and is brought up to date
        let mut b = client(&url).await;
        send(&mut b, json!({"type": "join", "roomId": "r1"})).await;
        let doc = recv(&mut b).await;
        assert_eq!(doc["type"], "documentAvailable");
        assert_eq!(doc["url"], "http://x/doc.pdf");
        assert_eq!(recv(&mut b).await, json!({"type": "pageChanged", "page": 1}));
        assert_eq!(recv(&mut b).await["type"], "initialData");

        // A highlights; B sees it live, A gets no echo
        send(&mut a, json!({"type": "highlightAdded", "roomId": "r1",
            "highlight": {"x": 1, "y": 2, "width": 3, "height": 4}})).await;
        let live = recv(&mut b).await;
        assert_eq!(live["type"], "highlightAdded");
        assert_eq!(live["highlight"]["x"], 1.0);
        assert_eq!(live["highlight"]["height"], 4.0);
        sync(&mut a).await;

        // C joins after the write landed and finds it in the history
        state.persist.flush().await;
        let mut c = client(&url).await;
        send(&mut c, json!({"type": "join", "roomId": "r1"})).await;
        assert_eq!(recv(&mut c).await["type"], "documentAvailable");
        assert_eq!(recv(&mut c).await["type"], "pageChanged");
        let initial = recv(&mut c).await;
        assert_eq!(initial["type"], "initialData");
        assert_eq!(initial["highlights"][0]["seq"], live["seq"]);
        assert_eq!(initial["highlights"][0]["roomId"], "r1");
    }

    #[tokio::test]
    async fn sender_never_gets_its_own_cursor() {
        let (url, _state) = serve().await;
        let mut a = client(&url).await;
        let mut b = client(&url).await;
        send(&mut a, json!({"type": "join", "roomId": "r1"})).await;
        recv(&mut a).await;
        send(&mut b, json!({"type": "join", "roomId": "r1"})).await;
        recv(&mut b).await;

        send(&mut a, json!({"type": "cursorMoved", "roomId": "r1", "position": {"x": 10, "y": 20}})).await;
        assert_eq!(recv(&mut b).await["type"], "cursorMoved");
        // The next frame A sees is its pong, not an echo
        sync(&mut a).await;
    }

    #[tokio::test]
    async fn closing_the_socket_unbinds_the_connection() {
        let (url, state) = serve().await;
        let mut a = client(&url).await;
        send(&mut a, json!({"type": "join", "roomId": "r1"})).await;
        recv(&mut a).await;
        assert_eq!(state.mux.stats().await, (1, 1));

        a.close(None).await.unwrap();
        for _ in 0..50 {
            if state.mux.stats().await == (0, 0) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("connection was not removed after close");
    }
}
