//! Daemon status command.

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json};

#[derive(Deserialize)]
struct StatusResponse {
    session_count: usize,
    connection_count: usize,
    bound_count: usize,
    sessions: Vec<SessionInfo>,
}

#[derive(Deserialize)]
pub(super) struct SessionInfo {
    pub session_id: String,
    pub connections: usize,
    pub channel: Option<String>,
    pub uptime_secs: u64,
}

pub async fn cmd_status(port: u16) -> Result<()> {
    let resp: StatusResponse = get_json(&format!("{}/api/status", base_url(port))).await?;

    println!("═══════════════════════════════════════");
    println!("  Livecast Relay Status");
    println!("═══════════════════════════════════════");
    println!("  Sessions     : {}", resp.session_count);
    println!("  Viewers      : {}", resp.connection_count);
    println!("  Bound feeds  : {}", resp.bound_count);

    if resp.sessions.is_empty() {
        println!("\n  No active sessions.");
    } else {
        println!("\n  Sessions:");
        for s in &resp.sessions {
            println!("  ┌─ {}", s.session_id);
            println!("  │  viewers : {}", s.connections);
            println!("  │  channel : {}", s.channel.as_deref().map_or("-".to_string(), |c| format!("@{c}")));
            println!("  └─ uptime  : {}s", s.uptime_secs);
        }
    }

    Ok(())
}
