use crate::*;

#[tokio::test]
async fn test_viewer_gets_session_and_close_destroys_it() {
    let server = spawn_server().await;
    let (ws, session) = open_viewer(&server).await;
    assert!(server.registry.contains(&session));

    drop(ws);
    assert!(eventually(|| !server.registry.contains(&session)).await);
}

#[tokio::test]
async fn test_session_ids_are_distinct() {
    let server = spawn_server().await;
    let mut ids = std::collections::HashSet::new();
    let mut sockets = Vec::new();
    for _ in 0..10 {
        let (ws, id) = open_viewer(&server).await;
        sockets.push(ws);
        assert!(ids.insert(id));
    }
    assert_eq!(server.registry.len(), 10);
}

#[tokio::test]
async fn test_join_unknown_session_gets_error_frame() {
    let server = spawn_server().await;
    let mut ws = join_viewer(&server, "no-such-session").await;

    let frame = next_json(&mut ws).await;
    assert_eq!(frame["type"], "error");
    assert_eq!(frame["code"], "session_not_found");
    assert!(closed_by_server(&mut ws).await);
    assert!(server.registry.is_empty());
}

#[tokio::test]
async fn test_ping_is_answered() {
    let server = spawn_server().await;
    let (mut ws, _session) = open_viewer(&server).await;

    send_text(&mut ws, r#"{"type":"ping"}"#).await;
    assert_eq!(next_json(&mut ws).await, serde_json::json!({ "type": "pong" }));

    send_text(&mut ws, "not json at all").await;
    send_text(&mut ws, r#"{"type":"subscribe"}"#).await;
    expect_quiet(&mut ws, 150).await;
}

#[tokio::test]
async fn test_closing_last_viewer_disconnects_feed() {
    let server = spawn_server().await;
    let (ws, session) = open_viewer(&server).await;
    server.bind("https://x/@alice", &session).await;
    assert_eq!(server.connector.disconnects("alice"), 0);

    drop(ws);
    assert!(eventually(|| server.connector.disconnects("alice") == 1).await);
    assert!(!server.registry.contains(&session));
}

#[tokio::test]
async fn test_viewer_can_leave_while_bind_is_dialling() {
    let server = spawn_server().await;
    let (ws, session) = open_viewer(&server).await;
    let url = server.url("/connect");
    let body = serde_json::json!({ "url": "https://x/@slowbob", "sessionId": session });
    let pending = tokio::spawn(async move {
        reqwest::Client::new()
            .post(url)
            .json(&body)
            .send()
            .await
            .expect("POST /connect")
    });
    assert!(eventually(|| server.connector.connects() == 1).await);

    drop(ws);
    assert!(eventually(|| !server.registry.contains(&session)).await);

    server.connector.open_gate();
    let resp = pending.await.unwrap();
    assert_eq!(resp.status().as_u16(), 404);
    assert_eq!(server.connector.disconnects("slowbob"), 1);
}

#[tokio::test]
async fn test_status_reports_sessions() {
    let server = spawn_server().await;
    let (_ws_a, session_a) = open_viewer(&server).await;
    let _ws_b = join_viewer(&server, &session_a).await;
    let (_ws_c, _session_c) = open_viewer(&server).await;
    assert!(wait_for_connections(&server.registry, &session_a, 2).await);
    server.bind("https://x/@alice", &session_a).await;

    let (status, body) = server.get_json("/api/status").await;
    assert_eq!(status, 200);
    assert_eq!(body["session_count"], 2);
    assert_eq!(body["connection_count"], 3);
    assert_eq!(body["bound_count"], 1);

    let (status, body) = server.get_json(&format!("/api/sessions/{session_a}")).await;
    assert_eq!(status, 200);
    assert_eq!(body["session_id"], session_a.as_str());
    assert_eq!(body["connections"], 2);
    assert_eq!(body["channel"], "alice");

    let (status, body) = server.get_json("/api/sessions/nope").await;
    assert_eq!(status, 404);
    assert_eq!(body["code"], "session_not_found");
}

#[tokio::test]
async fn test_static_fallback() {
    let server = spawn_server().await;
    let body = reqwest::get(server.url("/index.html"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("livecast static fixture"));

    let resp = reqwest::get(server.url("/missing.css")).await.unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn test_shutdown_closes_viewers_and_feeds() {
    let server = spawn_server().await;
    let (mut ws, session) = open_viewer(&server).await;
    server.bind("https://x/@alice", &session).await;
    let connector = server.connector.clone();
    let registry = server.registry.clone();

    let stopping = tokio::spawn(server.stop());
    assert!(closed_by_server(&mut ws).await);
    stopping.await.unwrap().unwrap();

    assert!(registry.is_empty());
    assert_eq!(connector.disconnects("alice"), 1);
}
