//! VoxRelay - HTTP relay between the browser and OpenAI voice APIs

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use voxrelay::api::{self, AppState};
use voxrelay::{OpenAiProvider, Settings};

#[derive(Debug, Parser)]
#[command(
    name = "voxrelay",
    about = "Relay browser audio and chat to OpenAI",
    version = env!("CARGO_PKG_VERSION")
)]
struct ServerArgs {
    /// Host to bind to (overrides HOST)
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();

    // Loaded before logging so RUST_LOG can come from .env
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voxrelay=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Some(problem) = dotenv_problem(&dotenv) {
        warn!("Ignoring .env file: {}", problem);
    }

    let settings = Settings::from_env()?.with_overrides(args.host, args.port);
    info!("🌐 Provider endpoint: {}", settings.api_base);

    let provider = OpenAiProvider::new(&settings).context("Failed to create HTTP client")?;
    let state = AppState::new(Arc::new(provider), settings.request_timeout);

    let addr = settings.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("🎙️ VoxRelay listening on http://{}", addr);

    api::serve(listener, state).await?;

    info!("Server stopped");
    Ok(())
}

/// A missing .env is fine; the real environment still applies. Anything
/// else (a malformed line, an unreadable file) is worth a warning.
fn dotenv_problem(result: &Result<PathBuf, dotenvy::Error>) -> Option<String> {
    match result {
        Ok(_) => None,
        Err(dotenvy::Error::Io(e)) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => Some(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ServerArgs {
        ServerArgs::try_parse_from(args).expect("arguments should parse")
    }

    #[test]
    fn no_flags_leaves_environment_in_charge() {
        let args = parse(&["voxrelay"]);
        assert_eq!(args.host, None);
        assert_eq!(args.port, None);
    }

    #[test]
    fn short_and_long_flags_parse() {
        let args = parse(&["voxrelay", "-H", "127.0.0.1", "--port", "9000"]);
        assert_eq!(args.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(args.port, Some(9000));
    }

    #[test]
    fn missing_dotenv_is_silent() {
        let missing = Err(dotenvy::Error::Io(std::io::Error::from(ErrorKind::NotFound)));
        assert_eq!(dotenv_problem(&missing), None);
        assert_eq!(dotenv_problem(&Ok(PathBuf::from(".env"))), None);
    }

    #[test]
    fn malformed_dotenv_is_reported() {
        let malformed = Err(dotenvy::Error::LineParse("OPENAI_API_KEY='sk".to_string(), 15));
        assert!(dotenv_problem(&malformed).is_some());

        let unreadable = Err(dotenvy::Error::Io(std::io::Error::from(
            ErrorKind::PermissionDenied,
        )));
        assert!(dotenv_problem(&unreadable).is_some());
    }

    #[test]
    fn rejects_out_of_range_port() {
        assert!(ServerArgs::try_parse_from(["voxrelay", "--port", "70000"]).is_err());
    }
}
