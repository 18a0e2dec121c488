use anyhow::Context;
use gradebookd::config::SidecarConfig;
use gradebookd::{ipc, logging};
use serde_json::json;
use std::io::{self, BufRead, Write};

fn main() -> anyhow::Result<()> {
    let config = SidecarConfig::load().context("failed to load gradebookd configuration")?;
    logging::init(&config)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        max_sessions = config.max_sessions,
        "gradebookd ready"
    );

    let mut state = ipc::AppState::new(config);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("stdin closed: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                let _ = writeln!(
                    stdout,
                    "{}",
                    json!({
                        "ok": false,
                        "error": { "code": "bad_json", "message": e.to_string() }
                    })
                );
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    tracing::info!(open_sessions = state.sessions.len(), "gradebookd shutting down");
    Ok(())
}
