//! The WebSocket feed connector against a local gateway.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;

use livecast_core::{ChannelId, ChatEvent};
use livecast_services::{UpstreamConnector, UpstreamError, WsFeedConnector};

use crate::*;

/// Gateway that treats `/live/offline*` as not live and otherwise sends
/// `frames` then holds the socket open.
async fn spawn_gateway(frames: Vec<&'static str>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let frames = frames.clone();
            tokio::spawn(async move {
                let check = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                    if req.uri().path().starts_with("/live/offline") {
                        let mut not_live = ErrorResponse::new(None);
                        *not_live.status_mut() = StatusCode::NOT_FOUND;
                        return Err(not_live);
                    }
                    Ok(resp)
                };
                let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(stream, check).await else {
                    return;
                };
                for frame in frames {
                    if ws.send(Message::Text(frame.to_string().into())).await.is_err() {
                        return;
                    }
                }
                while let Some(Ok(_)) = ws.next().await {}
            });
        }
    });
    addr
}

fn connector_for(gateway: SocketAddr) -> WsFeedConnector {
    WsFeedConnector::new(format!("ws://{gateway}/live/{{channel}}"))
}

#[tokio::test]
async fn test_connector_yields_chat_events() {
    let gateway = spawn_gateway(vec![
        r#"{"nickname":"bob","comment":"hi"}"#,
        r#"{"type":"gift","value":3}"#,
        r#"{"nickname":"eve","comment":"yo"}"#,
    ])
    .await;
    let connector = connector_for(gateway);
    let channel = ChannelId::from_reference("https://x/@alice").unwrap();

    let mut feed = connector.connect(&channel).await.unwrap();
    let mut events = feed.subscribe().unwrap();
    assert_eq!(events.next().await, Some(ChatEvent::new("bob", "hi")));
    assert_eq!(events.next().await, Some(ChatEvent::new("eve", "yo")));

    feed.disconnect();
    assert_eq!(events.next().await, None);
}

#[tokio::test]
async fn test_connector_reports_not_live() {
    let gateway = spawn_gateway(vec![]).await;
    let connector = connector_for(gateway);
    let channel = ChannelId::from_reference("@offline_dan").unwrap();

    let err = connector.connect(&channel).await.unwrap_err();
    assert!(matches!(err, UpstreamError::NotLive(_)), "got {err:?}");
}

#[tokio::test]
async fn test_gateway_feed_end_to_end() {
    let gateway = spawn_gateway(vec![r#"{"nickname":"bob","comment":"over the wire"}"#]).await;
    let registry = SessionRegistry::new(Arc::new(connector_for(gateway)), &relay_settings());
    let server = spawn_router(registry, Arc::default(), &generous_limits()).await;

    let (mut ws, session) = open_viewer(&server).await;
    let resp = server.bind("https://live.example/@alice/live", &session).await;
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(next_chat(&mut ws).await, "bob: over the wire");

    let resp = server.bind("https://live.example/@offline_dan", &session).await;
    assert_eq!(resp.status().as_u16(), 502);
}
