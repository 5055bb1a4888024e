use anyhow::{Context, Result};
use clap::Parser;
use painel::{
    config::{Cli, Command, OutputFormat, RenderArgs, Settings},
    render::render_html,
    server, Dashboard,
};
use std::{
    fs,
    io::{self, Write},
    sync::Arc,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.settings()?;

    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},painel={}", settings.log_level, settings.log_level)));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .with_writer(io::stderr)
        .init();
    info!("startup");

    // ─── 2) load data once; it is read-only from here on ─────────────
    let dashboard = match Dashboard::load(&settings) {
        Ok(d) => Arc::new(d),
        Err(e) => {
            error!("failed to load dashboard data: {:#}", e);
            return Err(e);
        }
    };

    // ─── 3) serve or render once ─────────────────────────────────────
    match cli.command {
        Command::Serve(_) => {
            let addr = settings.socket_addr()?;
            server::serve(dashboard, addr).await;
        }
        Command::Render(args) => render_once(&dashboard, &settings, &args)?,
    }
    Ok(())
}

fn render_once(dashboard: &Dashboard, settings: &Settings, args: &RenderArgs) -> Result<()> {
    let selection = args.filters.query().selection();
    let tree = dashboard.render(&selection);
    let output = match args.format {
        OutputFormat::Html => render_html(&tree, dashboard.geometry()),
        OutputFormat::Json => {
            serde_json::to_string_pretty(&tree).context("serializing render tree")?
        }
    };

    match &args.output {
        Some(path) => {
            fs::write(path, &output).with_context(|| format!("failed to write {:?}", path))?;
            info!(
                path = %path.display(),
                data = %settings.data_path.display(),
                "render written"
            );
        }
        None => io::stdout()
            .write_all(output.as_bytes())
            .context("writing render to stdout")?,
    }
    Ok(())
}
