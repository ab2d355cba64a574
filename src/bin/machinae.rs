//! CLI binary for machinae.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::builder::PossibleValuesParser;
use clap::{ArgAction, Args, Parser};
use machinae::config::{ConfigPaths, LoadOptions, SitesConfig};
use machinae::output::{self, Format};
use machinae::session::{self, SessionOptions};
use machinae::target::{self, OTYPES};
use machinae::web;
use machinae_lookup::{LookupConfig, SiteSelection};
use serde_json::Map;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Machinae: collect security intelligence on indicators from many sites at once.
#[derive(Parser, Debug)]
#[command(name = "machinae", version, about, disable_version_flag = true)]
struct Cli {
    /// Print version.
    #[arg(short = 'v', long, action = ArgAction::Version)]
    version: Option<bool>,

    /// Sites file; skips discovery of machinae.toml, /etc/machinae.toml and $MACHINAE_CONFIG.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not merge /etc/machinae.local.toml and ~/.machinae.toml over the sites file.
    #[arg(long)]
    nomerge: bool,

    /// Seconds each lookup waits before querying its site.
    #[arg(short, long, default_value_t = 0)]
    delay: u64,

    /// Write output here instead of stdout (`-` is stdout).
    #[arg(short, long, default_value = "-")]
    file: String,

    /// Read targets from this file, one per line, before the positional ones.
    #[arg(short, long)]
    infile: Option<PathBuf>,

    /// Output format: N normal, J JSON lines, D defanged, S short.
    #[arg(short = 'o', value_name = "FORMAT", default_value = "N")]
    output: Format,

    /// Force the observable type instead of detecting it.
    #[arg(short = 'O', long, value_parser = PossibleValuesParser::new(OTYPES))]
    otype: Option<String>,

    /// Quieter logging; request URLs are no longer shown.
    #[arg(short, long)]
    quiet: bool,

    /// Sites to query: `default`, `all`, or a comma-separated list of names.
    #[arg(short, long, default_value = "default")]
    sites: SiteSelection,

    /// Maximum concurrent site lookups per target.
    #[arg(short, long, default_value_t = 10)]
    workers: usize,

    /// Credentials file for sites that need authentication.
    #[arg(short, long)]
    auth: Option<PathBuf>,

    /// Proxy for both HTTP and HTTPS requests.
    #[arg(short = 'H', long)]
    http_proxy: Option<String>,

    #[command(flatten)]
    mode: Mode,

    /// Indicators to look up.
    #[arg(trailing_var_arg = true)]
    targets: Vec<String>,
}

/// Alternative modes; at most one may be given.
#[derive(Args, Debug)]
#[group(multiple = false)]
struct Mode {
    /// Print the merged sites configuration and exit.
    #[arg(long)]
    dump_config: bool,

    /// Print the detected type of each target and exit.
    #[arg(long)]
    detect_otype: bool,

    /// List configured sites and exit.
    #[arg(long)]
    list_sites: bool,

    /// Serve JSON lookups over HTTP on this address.
    #[arg(long, value_name = "ADDR")]
    serve: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only results.
    // Users can override with RUST_LOG=debug to see everything.
    let default_filter = if cli.quiet {
        "machinae=warn,machinae_lookup=warn"
    } else {
        "machinae=info,machinae_lookup=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    tokio::select! {
        result = run(cli) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("received Ctrl+C, aborting");
            Ok(())
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let options = LoadOptions {
        path: cli.config.clone(),
        nomerge: cli.nomerge,
    };
    let config = SitesConfig::load(&options, &ConfigPaths::standard())?;

    if let Some(addr) = cli.mode.serve {
        return serve(&cli, &config, addr).await;
    }

    let mut out = open_output(&cli.file).await?;

    if cli.mode.dump_config {
        out.write_all(config.dump()?.as_bytes()).await?;
    } else if cli.mode.list_sites {
        out.write_all(config.list_sites().as_bytes()).await?;
    } else if cli.mode.detect_otype {
        let targets = target::collect(cli.infile.as_deref(), &cli.targets, cli.otype.as_deref())?;
        let mut detected = Map::new();
        for info in targets {
            detected.insert(info.target, info.otype.into());
        }
        out.write_all(toml::to_string(&detected)?.as_bytes()).await?;
    } else {
        lookup(&cli, &config, out.as_mut()).await?;
    }

    out.flush().await?;
    Ok(())
}

fn session_options(cli: &Cli) -> SessionOptions {
    SessionOptions {
        sites: cli.sites.clone(),
        lookup: LookupConfig {
            delay_seconds: cli.delay,
            max_workers: cli.workers,
            verbose: !cli.quiet,
            ..Default::default()
        },
        auth: cli.auth.clone(),
        http_proxy: cli.http_proxy.clone(),
    }
}

async fn lookup(
    cli: &Cli,
    config: &SitesConfig,
    out: &mut (dyn AsyncWrite + Unpin + Send),
) -> anyhow::Result<()> {
    let orchestrator = session::orchestrator(config, &session_options(cli))?;
    let targets = target::collect(cli.infile.as_deref(), &cli.targets, cli.otype.as_deref())?;
    if targets.is_empty() {
        anyhow::bail!("no targets given; pass them as arguments or with --infile");
    }

    info!(
        targets = targets.len(),
        sites = orchestrator.registry().len(),
        "starting lookups"
    );
    let written = output::write_stream(orchestrator.results(targets), cli.output, out).await?;
    tracing::debug!(records = written, "done");
    Ok(())
}

async fn serve(cli: &Cli, config: &SitesConfig, addr: SocketAddr) -> anyhow::Result<()> {
    let orchestrator = session::orchestrator(config, &session_options(cli))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    web::serve(listener, Arc::new(orchestrator)).await?;
    Ok(())
}

async fn open_output(dest: &str) -> anyhow::Result<Box<dyn AsyncWrite + Unpin + Send>> {
    if dest == "-" {
        return Ok(Box::new(tokio::io::stdout()));
    }
    let file = tokio::fs::File::create(dest)
        .await
        .with_context(|| format!("failed to create {dest}"))?;
    Ok(Box::new(file))
}
