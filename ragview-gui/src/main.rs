mod error;
mod graph_view;
mod gui;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ragview_core::config::{ClientConfig, ConfigFile};
use ragview_core::graph::{FileGraphSource, GraphSource};
use ragview_core::{Gateway, HttpGateway};

use crate::error::GuiResult;
use crate::gui::{run_gui, GuiArgs};

#[derive(Parser, Debug)]
#[command(name = "ragview")]
#[command(about = "Desktop client for the multimodal RAG knowledge-graph backend", long_about = None)]
struct Cli {
    /// Backend base URL, e.g. http://localhost:8000
    #[arg(long, env = "RAGVIEW_API_BASE_URL")]
    api_base_url: Option<String>,
    /// graph.json written by the backend's /process step
    #[arg(long, env = "RAGVIEW_GRAPH_PATH")]
    graph_path: Option<PathBuf>,
    /// Optional TOML file with the same keys
    #[arg(long, env = "RAGVIEW_CONFIG")]
    config: Option<PathBuf>,
}

fn main() -> GuiResult<()> {
    init_logging()?;

    let cli = Cli::parse();
    let file = cli.config.as_deref().map(ConfigFile::read).transpose()?;
    let config = ClientConfig::resolve(file, cli.api_base_url, cli.graph_path)?;
    tracing::info!(
        "Starting ragview against {} (graph: {})",
        config.api_base_url,
        config.graph_path.display()
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let gateway: Arc<dyn Gateway> = Arc::new(HttpGateway::try_new(config.clone())?);
    let graph_source: Arc<dyn GraphSource> = Arc::new(FileGraphSource::new(&config.graph_path));

    run_gui(GuiArgs {
        runtime_handle: runtime.handle().clone(),
        gateway,
        graph_source,
        backend_label: config.api_base_url.clone(),
    })
}

const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, PartialEq, Eq)]
enum LogTarget {
    Stderr,
    Stdout,
    File(PathBuf),
    StateFile,
}

impl LogTarget {
    fn from_env(value: Option<&str>) -> Self {
        match value {
            Some("stderr") => LogTarget::Stderr,
            Some("stdout") => LogTarget::Stdout,
            Some(path) if !path.trim().is_empty() => LogTarget::File(PathBuf::from(path)),
            _ => LogTarget::StateFile,
        }
    }
}

/// `RAGVIEW_LOG_LEVEL` takes any `EnvFilter` directive; bad input falls back to info.
fn log_filter(directive: Option<&str>) -> EnvFilter {
    directive
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

fn init_logging() -> GuiResult<()> {
    let filter = log_filter(std::env::var("RAGVIEW_LOG_LEVEL").ok().as_deref());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match LogTarget::from_env(std::env::var("RAGVIEW_LOG").ok().as_deref()) {
        LogTarget::Stderr => builder.with_writer(std::io::stderr).init(),
        LogTarget::Stdout => builder.with_writer(std::io::stdout).init(),
        LogTarget::File(path) => {
            let file = open_log_file(&path)?;
            builder.with_writer(file).with_ansi(false).init();
        }
        LogTarget::StateFile => match default_log_path().map(|path| open_log_file(&path)) {
            Some(Ok(file)) => builder.with_writer(file).with_ansi(false).init(),
            _ => builder.with_writer(std::io::sink).init(),
        },
    }
    Ok(())
}

fn default_log_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("XDG_STATE_HOME") {
        return Some(PathBuf::from(path).join("ragview").join("ragview.log"));
    }
    let home = std::env::var("HOME").ok()?;
    if cfg!(target_os = "macos") {
        Some(PathBuf::from(home).join("Library/Logs/ragview.log"))
    } else {
        Some(
            PathBuf::from(home)
                .join(".local/state")
                .join("ragview")
                .join("ragview.log"),
        )
    }
}

fn open_log_file(path: &Path) -> GuiResult<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?)
}
