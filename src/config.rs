//! Settings resolution: built-in defaults, then an optional YAML file, then
//! environment variables, then command-line flags.
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::filter::DashboardQuery;

pub const ENV_PORT: &str = "PORT";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_DATA: &str = "PAINEL_DATA";
pub const ENV_GEO: &str = "PAINEL_GEO";

#[derive(Parser, Debug)]
#[command(
    name = "painel",
    version,
    about = "Painel socioeconômico do Brasil por UF e ano"
)]
pub struct Cli {
    /// YAML settings file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Consolidated CSV dataset.
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,
    /// GeoJSON with the state boundaries.
    #[arg(long, global = true)]
    pub geo: Option<PathBuf>,
    #[arg(long, global = true)]
    pub log_level: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the dashboard over HTTP.
    Serve(ServeArgs),
    /// Run a single render pass and write the result.
    Render(RenderArgs),
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    #[arg(long)]
    pub bind: Option<String>,
    #[arg(short, long)]
    pub port: Option<u16>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Html,
    Json,
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Html)]
    pub format: OutputFormat,
    /// Defaults to stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    #[command(flatten)]
    pub filters: FilterArgs,
}

/// Filter flags for `render`; same keys as the HTTP query string.
#[derive(Args, Debug, Default, Clone)]
pub struct FilterArgs {
    #[arg(long)]
    pub year: Option<i64>,
    #[arg(long)]
    pub region: Option<String>,
    #[arg(long)]
    pub map_metric: Option<String>,
    #[arg(long)]
    pub ranking_metric: Option<String>,
    /// Comma-separated metric labels.
    #[arg(long)]
    pub evolution_metrics: Option<String>,
    /// Comma-separated metric labels.
    #[arg(long)]
    pub comparison_metrics: Option<String>,
    #[arg(long)]
    pub comparison_sort: Option<String>,
    /// `top` or `bottom`.
    #[arg(long)]
    pub comparison_order: Option<String>,
    #[arg(long)]
    pub pair: Option<String>,
    #[arg(long)]
    pub show_table: bool,
}

impl FilterArgs {
    pub fn query(&self) -> DashboardQuery {
        DashboardQuery {
            year: self.year,
            region: self.region.clone(),
            map_metric: self.map_metric.clone(),
            ranking_metric: self.ranking_metric.clone(),
            evolution_metrics: self.evolution_metrics.clone(),
            comparison_metrics: self.comparison_metrics.clone(),
            comparison_sort: self.comparison_sort.clone(),
            comparison_order: self.comparison_order.clone(),
            pair: self.pair.clone(),
            show_table: self.show_table.then_some(true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data_path: PathBuf,
    pub geo_path: PathBuf,
    pub bind: String,
    pub port: u16,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("dados_consolidados_corrigido.csv"),
            geo_path: PathBuf::from("brasil_estados.json"),
            bind: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
        }
    }
}

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub data_path: Option<PathBuf>,
    pub geo_path: Option<PathBuf>,
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        let (bind, port) = match &self.command {
            Command::Serve(args) => (args.bind.clone(), args.port),
            Command::Render(_) => (None, None),
        };
        Overrides {
            data_path: self.data.clone(),
            geo_path: self.geo.clone(),
            bind,
            port,
            log_level: self.log_level.clone(),
        }
    }

    pub fn settings(&self) -> Result<Settings> {
        Settings::resolve(self.config.as_deref(), &self.overrides())
    }
}

impl Settings {
    /// Missing keys keep their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse config file {:?}", path))
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = lookup(ENV_PORT) {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("invalid {} value `{}`", ENV_PORT, port))?;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(path) = lookup(ENV_DATA) {
            self.data_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_GEO) {
            self.geo_path = PathBuf::from(path);
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(p) = &overrides.data_path {
            self.data_path = p.clone();
        }
        if let Some(p) = &overrides.geo_path {
            self.geo_path = p.clone();
        }
        if let Some(b) = &overrides.bind {
            self.bind = b.clone();
        }
        if let Some(p) = overrides.port {
            self.port = p;
        }
        if let Some(l) = &overrides.log_level {
            self.log_level = l.clone();
        }
    }

    pub fn resolve(config: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let mut settings = match config {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.apply_overrides(overrides);
        debug!(?settings, "settings resolved");
        Ok(settings)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .bind
            .parse()
            .with_context(|| format!("invalid bind address `{}`", self.bind))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}
