//! livecast-ctl: command-line interface for the livecast relay daemon.

mod cmd;

use anyhow::{Context, Result};

const DEFAULT_PORT: u16 = 3000;

fn print_usage() {
    println!("Usage: livecast-ctl [--port <port>] <command>");
    println!();
    println!("Commands:");
    println!("  status                     Show sessions, viewers, and bound feeds");
    println!("  sessions inspect <id>      Show one session");
    println!("  bind <url> <session-id>    Bind the channel in <url> to a session");
    println!();
    println!("Options:");
    println!("  --port <port>   Daemon HTTP port (default: {})", DEFAULT_PORT);
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // Parse --port option
    let mut port = DEFAULT_PORT;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--port" {
            i += 1;
            port = args
                .get(i)
                .context("--port requires a value")?
                .parse()
                .context("--port must be a number")?;
        } else {
            remaining.push(&args[i]);
        }
        i += 1;
    }

    match remaining.as_slice() {
        ["status"] | [] => cmd::status::cmd_status(port).await,
        ["sessions", "inspect", id] => cmd::sessions::cmd_session_inspect(port, id).await,
        ["bind", url, session] => cmd::bind::cmd_bind(port, url, session).await,
        ["help"] | ["--help"] | ["-h"] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
