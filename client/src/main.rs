use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use filing_client::infrastructure::config::ClientConfig;
use filing_client::infrastructure::driving::{cli, Cli, TerminalSurface};
use filing_client::infrastructure::AppContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays clean for tables
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("filing_client=info,filing=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::load()?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    info!(base_url = %config.api_base_url, "back office client starting");
    let ctx = AppContext::build(config)?;
    let surface = TerminalSurface::new(ctx.coordinator().clone(), ctx.config.image_dir.clone()).spawn();

    if cli.command.needs_session() {
        cli::ensure_session(&ctx).await?;
    }
    let result = cli::run(cli.command, &ctx).await;
    surface.abort();

    if let Some(target) = ctx.guard.last_redirect() {
        eprintln!("Session expired, log in again (then continue at {})", target);
    }

    match result {
        Err(e) if e.is_cancelled() => {
            eprintln!("Cancelled");
            Ok(())
        }
        other => Ok(other?),
    }
}
