use std::time::Duration;

use crate::*;

#[tokio::test]
async fn test_bound_channel_reaches_viewer() {
    let server = spawn_server().await;
    let (mut ws, session) = open_viewer(&server).await;

    let resp = server.bind("https://live.example/@alice/live", &session).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "success": true }));

    server.connector.push("alice", "bob", "hi");
    assert_eq!(next_chat(&mut ws).await, "bob: hi");
}

#[tokio::test]
async fn test_throttle_scenario() {
    let server = spawn_server().await;
    let (mut ws, session) = open_viewer(&server).await;
    server.bind("https://x/@alice", &session).await;

    server.connector.push("alice", "bob", "hi");
    assert_eq!(next_chat(&mut ws).await, "bob: hi");

    tokio::time::sleep(Duration::from_millis(500)).await;
    server.connector.push("alice", "bob", "there");
    expect_quiet(&mut ws, 100).await;

    tokio::time::sleep(Duration::from_millis(300)).await;
    server.connector.push("alice", "bob", "there");
    assert_eq!(next_chat(&mut ws).await, "bob: there");
    expect_quiet(&mut ws, 200).await;
}

#[tokio::test]
async fn test_events_inside_interval_are_dropped() {
    let server = spawn_server().await;
    let (mut ws, session) = open_viewer(&server).await;
    server.bind("https://x/@alice", &session).await;

    for i in 0..5 {
        server.connector.push("alice", "bob", &format!("spam {i}"));
    }
    assert_eq!(next_chat(&mut ws).await, "bob: spam 0");
    expect_quiet(&mut ws, 300).await;
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let server = spawn_server().await;
    let (mut ws_a, session_a) = open_viewer(&server).await;
    let (mut ws_b, session_b) = open_viewer(&server).await;
    assert_ne!(session_a, session_b);

    server.bind("https://x/@alice", &session_a).await;
    server.bind("https://x/@carol", &session_b).await;

    server.connector.push("alice", "bob", "for a");
    server.connector.push("carol", "dan", "for b");

    assert_eq!(next_chat(&mut ws_a).await, "bob: for a");
    assert_eq!(next_chat(&mut ws_b).await, "dan: for b");
    expect_quiet(&mut ws_a, 150).await;
    expect_quiet(&mut ws_b, 150).await;
}

#[tokio::test]
async fn test_rebind_switches_channel() {
    let server = spawn_server().await;
    let (mut ws, session) = open_viewer(&server).await;

    server.bind("https://x/@alice", &session).await;
    let resp = server.bind("https://x/@carol", &session).await;
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(server.connector.disconnects("alice"), 1);

    server.connector.push("carol", "dan", "new feed");
    assert_eq!(next_chat(&mut ws).await, "dan: new feed");
}

#[tokio::test]
async fn test_shared_session_survives_one_viewer_leaving() {
    let server = spawn_server().await;
    let (mut first, session) = open_viewer(&server).await;
    let mut second = join_viewer(&server, &session).await;
    let greeting = next_json(&mut second).await;
    assert_eq!(greeting["sessionId"], session.as_str());

    server.bind("https://x/@alice", &session).await;
    server.connector.push("alice", "bob", "both");
    assert_eq!(next_chat(&mut first).await, "bob: both");
    assert_eq!(next_chat(&mut second).await, "bob: both");

    first.close(None).await.unwrap();
    assert!(wait_for_connections(&server.registry, &session, 1).await);

    tokio::time::sleep(Duration::from_millis(850)).await;
    server.connector.push("alice", "bob", "still here");
    assert_eq!(next_chat(&mut second).await, "bob: still here");
    assert_eq!(server.connector.disconnects("alice"), 0);

    second.close(None).await.unwrap();
    assert!(eventually(|| !server.registry.contains(&session)).await);
    assert!(eventually(|| server.connector.disconnects("alice") == 1).await);
}

#[tokio::test]
async fn test_feed_end_leaves_session_bindable() {
    let server = spawn_server().await;
    let (mut ws, session) = open_viewer(&server).await;
    server.bind("https://x/@alice", &session).await;

    server.connector.end("alice");
    let (status, body) = server.get_json(&format!("/api/sessions/{session}")).await;
    assert_eq!(status, 200);
    assert_eq!(body["connections"], 1);

    let registry = server.registry.clone();
    let handle = registry.session(&session).unwrap();
    let mut unbound = false;
    for _ in 0..100 {
        if handle.bound_channel().await.is_none() {
            unbound = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(unbound, "binding should clear when the feed ends");

    server.bind("https://x/@carol", &session).await;
    server.connector.push("carol", "dan", "back");
    assert_eq!(next_chat(&mut ws).await, "dan: back");
}
