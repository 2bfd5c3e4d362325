//! Session inspection commands.

use anyhow::Result;

use super::http::{base_url, get_json};
use super::status::SessionInfo;

pub async fn cmd_session_inspect(port: u16, session_id: &str) -> Result<()> {
    let resp: SessionInfo =
        get_json(&format!("{}/api/sessions/{}", base_url(port), session_id)).await?;

    println!("═══════════════════════════════════════");
    println!("  Session Details");
    println!("═══════════════════════════════════════");
    println!("  ID       : {}", resp.session_id);
    println!("  Viewers  : {}", resp.connections);
    match &resp.channel {
        Some(channel) => println!("  Channel  : @{}", channel),
        None => println!("  Channel  : (not bound)"),
    }
    println!("  Uptime   : {}s", resp.uptime_secs);

    Ok(())
}
