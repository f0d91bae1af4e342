//! `dg serve` command implementation.

use std::path::PathBuf;

use clap::Args;
use dg_config::{CliSettings, Config};
use dg_server::run_server;
use tracing_subscriber::EnvFilter;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover dg.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// SVG template directory (overrides config).
    #[arg(long)]
    template_dir: Option<PathBuf>,

    /// Path to the Mermaid CLI renderer (overrides config).
    #[arg(long)]
    mermaid_cli: Option<PathBuf>,

    /// Enable verbose output (request logs and timing).
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self, version: &str) -> Result<(), CliError> {
        let output = Output::new();

        // Build CLI settings from args
        let cli_settings = CliSettings {
            host: self.host,
            port: self.port,
            template_dir: self.template_dir,
            mermaid_cli_path: self.mermaid_cli,
        };

        // Load config
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        // Initialize tracing: --verbose wins, then RUST_LOG, then the
        // config file's log_level, then warn
        let filter = if self.verbose {
            EnvFilter::new("info")
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if let Some(level) = &config.log_level {
            EnvFilter::new(level)
        } else {
            EnvFilter::new("warn")
        };
        tracing_subscriber::fmt().with_env_filter(filter).init();

        // Print startup info
        output.info(&format!(
            "Starting server on {}:{}",
            config.server.host, config.server.port
        ));
        if let Some(path) = &config.config_path {
            output.info(&format!("Config: {}", path.display()));
        }
        if let Some(dir) = &config.templates.dir {
            output.info(&format!("Template directory: {}", dir.display()));
        }
        match &config.mermaid.cli_path {
            Some(path) => output.info(&format!("Mermaid renderer: {}", path.display())),
            None => output.info("Mermaid renderer: disabled (DSL returned unrendered)"),
        }
        if config.uploads_enabled() {
            output.info("Object store uploads: enabled");
        } else {
            output.info("Object store uploads: disabled (inline delivery)");
        }
        output.success(&format!(
            "WebSocket endpoint: ws://{}:{}/ws",
            config.server.host, config.server.port
        ));

        run_server(&config, version.to_owned()).await?;
        Ok(())
    }
}
