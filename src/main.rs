use anyhow::{Context, Result};
use resqher::config::{AppConfig, BASE_URL_KEY};
use resqher::session::{PENDING_PLACEHOLDER, SessionController};
use resqher::surfaces::{self, SurfaceKind};
use resqher::types::{Message, Phase, Sender};
use std::io::Write;
use std::task::Poll;
use time::{UtcOffset, format_description::FormatItem, macros::format_description};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Bundled config for builds that ship without a `.env`
const BUNDLED_CONFIG: &str = include_str!("../assets/config.env");

const MESSAGE_TIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[hour repr:12 padding:zero]:[minute padding:zero] [period case:upper]");

/// `.env` wins when present, otherwise the bundled defaults apply. Variables
/// already set in the environment are never overridden.
fn load_env() -> Result<()> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => {
            dotenvy::from_read(BUNDLED_CONFIG.as_bytes()).context("Bundled config is malformed")
        }
        Err(err) => Err(err).context("Failed to read .env"),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("resqher=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn format_message(msg: &Message) -> String {
    let mut datetime = msg.created_at;
    if let Ok(offset) = UtcOffset::current_local_offset() {
        datetime = datetime.to_offset(offset);
    }
    let stamp = datetime.format(MESSAGE_TIME_FORMAT).unwrap_or_default();
    let who = match msg.sender {
        Sender::User => "you",
        Sender::Assistant => "bot",
    };

    let mut out = format!("[{stamp}] {who}: {}", msg.text);
    if !msg.citations.is_empty() {
        out.push_str("\n    Sources used:");
        for source in &msg.citations {
            out.push_str("\n    - ");
            out.push_str(source);
        }
    }
    out
}

fn print_new(session: &SessionController, printed: &mut usize) {
    let messages = session.messages();
    for msg in messages.iter().skip(*printed) {
        // The user's own line is already on screen.
        if !msg.is_user() {
            println!("{}", format_message(msg));
        }
    }
    *printed = messages.len();
}

async fn run(kind: SurfaceKind) -> Result<()> {
    let config = AppConfig::from_env().context("Invalid configuration")?;
    if config.backend.base_url.is_none() && kind != SurfaceKind::Therapy {
        tracing::warn!("{BASE_URL_KEY} is not set; every request will fail");
    }

    let session = surfaces::open(kind, &config);
    let priming = session.activate();

    let mut printed = 0;
    print_new(&session, &mut printed);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().ok();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim() == "/quit" {
            break;
        }
        let mut submission = Box::pin(session.submit(&line));
        match futures::poll!(submission.as_mut()) {
            Poll::Ready(outcome) => tracing::debug!(?outcome, "Submission settled immediately"),
            Poll::Pending => {
                if session.phase() == Phase::Submitting {
                    println!("bot: {PENDING_PLACEHOLDER}");
                }
                submission.await;
            }
        }
        print_new(&session, &mut printed);
    }

    // Dropping the session unmounts it; outstanding priming is discarded.
    drop(session);
    if let Some(handle) = priming {
        handle.abort();
    }
    Ok(())
}

fn main() -> Result<()> {
    // Must run before the runtime spawns any threads.
    load_env()?;
    init_tracing();

    let kind = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<SurfaceKind>().map_err(anyhow::Error::msg)?,
        None => SurfaceKind::Legal,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(run(kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_config_parses() {
        let vars = dotenvy::from_read_iter(BUNDLED_CONFIG.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .expect("bundled config parses");
        assert!(vars.iter().any(|(key, value)| key == BASE_URL_KEY && !value.is_empty()));
    }
}
