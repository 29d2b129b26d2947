//! CLI argument parsing and execution

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use layerconf::fetch::DefaultFetcher;
use layerconf::location::ProcessWorkingDir;
use layerconf::{Document, Format, Options, Resolver};

/// layerconf - Merge layered JSON, YAML and TOML documents
#[derive(Parser, Debug)]
#[command(name = "layerconf")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Documents to merge, lowest precedence first (paths or URLs)
    #[arg(value_name = "LOCATION", required = true)]
    locations: Vec<String>,

    /// Output format
    #[arg(short, long, value_name = "FORMAT", default_value = "json")]
    format: Format,

    /// Expand $NAME environment variables before decoding
    #[arg(short, long, env = "LAYERCONF_EXPAND")]
    expand: bool,

    /// Resolve includes concurrently
    #[arg(long)]
    parallel: bool,

    /// Timeout for HTTP requests, in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

impl Cli {
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        let fetcher = match self.timeout {
            Some(secs) => DefaultFetcher::with_timeout(Duration::from_secs(secs)),
            None => DefaultFetcher::new(),
        };
        let options = Options::new()
            .with_expand(self.expand)
            .with_parallel(self.parallel);
        let resolver = Resolver::new(Arc::new(fetcher), Arc::new(ProcessWorkingDir), options);

        let mut doc = Document::with_resolver(resolver);
        doc.add_files(self.locations.as_slice())?;
        info!("Merged {} document(s)", self.locations.len());

        let output = doc.encode(self.format)?;
        std::io::stdout()
            .lock()
            .write_all(&output)
            .context("Failed to write to stdout")?;
        Ok(())
    }
}

/// `RUST_LOG` takes precedence over `--log-level` when set.
fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    let _ = env_logger::Builder::from_env(env).try_init();
}
