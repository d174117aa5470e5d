//! WebSocket proxy for `/v1/chat/ws` (`spec.md` §4.1).
//!
//! Dials the upstream over `ws://`/`wss://`, completes the client-side
//! handshake, then races two forwarders the same way chat-service races
//! its own reader/writer halves: whichever direction closes first tears
//! down the other.

use axum::extract::ws::{CloseFrame as AxumCloseFrame, Message as AxumMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame as TungsteniteCloseFrame;
use tokio_tungstenite::tungstenite::Message as TungsteniteMessage;

use crate::routes;
use crate::state::AppState;

pub async fn handle(ws: WebSocketUpgrade, State(state): State<AppState>, uri: Uri) -> Response {
    let path = uri.path();
    let Some((upstream, upstream_path)) = routes::resolve(path) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let Some(base_url) = state.base_url_for(upstream) else {
        return StatusCode::BAD_GATEWAY.into_response();
    };

    let query = uri.query().map(|q| format!("?{q}")).unwrap_or_default();
    let target = format!("{}{upstream_path}{query}", to_ws_scheme(base_url));

    ws.on_upgrade(move |client_socket| proxy(client_socket, target))
}

fn to_ws_scheme(base_url: &str) -> String {
    if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base_url.to_owned()
    }
}

async fn proxy(client_socket: WebSocket, target: String) {
    let upstream_socket = match tokio_tungstenite::connect_async(target.as_str()).await {
        Ok((socket, _response)) => socket,
        Err(err) => {
            tracing::warn!(error = %err, upstream_url = target, "failed to dial upstream websocket");
            close_with_error(client_socket).await;
            return;
        }
    };

    let (mut client_tx, mut client_rx) = client_socket.split();
    let (mut upstream_tx, mut upstream_rx) = upstream_socket.split();

    let client_to_upstream = async {
        while let Some(Ok(msg)) = client_rx.next().await {
            let done = matches!(msg, AxumMessage::Close(_));
            if upstream_tx.send(to_tungstenite(msg)).await.is_err() || done {
                break;
            }
        }
        let _ = upstream_tx.close().await;
    };

    let upstream_to_client = async {
        while let Some(Ok(msg)) = upstream_rx.next().await {
            let done = matches!(msg, TungsteniteMessage::Close(_));
            if client_tx.send(to_axum(msg)).await.is_err() || done {
                break;
            }
        }
        let _ = client_tx.close().await;
    };

    tokio::select! {
        () = client_to_upstream => {}
        () = upstream_to_client => {}
    }
}

async fn close_with_error(mut socket: WebSocket) {
    let _ = socket
        .send(AxumMessage::Close(Some(AxumCloseFrame {
            code: 1011,
            reason: "upstream unavailable".into(),
        })))
        .await;
}

fn to_tungstenite(msg: AxumMessage) -> TungsteniteMessage {
    match msg {
        AxumMessage::Text(text) => TungsteniteMessage::Text(text.to_string().into()),
        AxumMessage::Binary(data) => TungsteniteMessage::Binary(data.to_vec()),
        AxumMessage::Ping(data) => TungsteniteMessage::Ping(data.to_vec()),
        AxumMessage::Pong(data) => TungsteniteMessage::Pong(data.to_vec()),
        AxumMessage::Close(frame) => TungsteniteMessage::Close(frame.map(|f| TungsteniteCloseFrame {
            code: CloseCode::from(f.code),
            reason: f.reason.to_string().into(),
        })),
    }
}

fn to_axum(msg: TungsteniteMessage) -> AxumMessage {
    match msg {
        TungsteniteMessage::Text(text) => AxumMessage::Text(text.to_string().into()),
        TungsteniteMessage::Binary(data) => AxumMessage::Binary(data.into()),
        TungsteniteMessage::Ping(data) => AxumMessage::Ping(data.into()),
        TungsteniteMessage::Pong(data) => AxumMessage::Pong(data.into()),
        TungsteniteMessage::Close(frame) => AxumMessage::Close(frame.map(|f| AxumCloseFrame {
            code: f.code.into(),
            reason: f.reason.to_string().into(),
        })),
        TungsteniteMessage::Frame(_) => AxumMessage::Close(None),
    }
}
