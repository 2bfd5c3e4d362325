//! Bind a live channel to a session, the same request the viewer page makes.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::http::{base_url, post_json_body};

#[derive(Serialize)]
struct ConnectRequest<'a> {
    url: &'a str,
    #[serde(rename = "sessionId")]
    session_id: &'a str,
}

#[derive(Deserialize)]
struct ConnectResponse {
    success: bool,
}

pub async fn cmd_bind(port: u16, url: &str, session_id: &str) -> Result<()> {
    let resp: ConnectResponse = post_json_body(
        &format!("{}/connect", base_url(port)),
        &ConnectRequest { url, session_id },
    )
    .await?;

    if resp.success {
        println!("Bound {} to session {}.", url, session_id);
    } else {
        println!("Daemon did not confirm the bind.");
    }
    Ok(())
}
