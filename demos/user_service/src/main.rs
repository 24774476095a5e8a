use anyhow::{Context, Result};
use clap::Parser;
use servicehandler::logging::{init_logging_with_config, LogConfig};
use servicehandler::runtime_config::RuntimeConfig;
use servicehandler::HttpServer;
use user_service::{MemoryStore, UserService};

#[derive(Parser)]
#[command(name = "user_service")]
#[command(about = "In-memory user service exposed over HTTP/JSON", long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "SVCH_ADDR", default_value = "0.0.0.0:8080")]
    addr: String,

    /// Log level: trace/debug/info/warn/error
    #[arg(long, env = "SVCH_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env();
    log_config.log_level = cli.log_level;
    init_logging_with_config(&log_config)?;

    RuntimeConfig::from_env().apply();

    let service = UserService::new(MemoryStore::new());
    let app = servicehandler::wrap(service).context("failed to build user service")?;

    let server = HttpServer(app)
        .start(cli.addr.as_str())
        .with_context(|| format!("failed to listen on {}", cli.addr))?;
    tracing::info!(addr = %server.addr(), "user_service ready");

    server
        .join()
        .map_err(|e| anyhow::anyhow!("server failed: {e:?}"))?;
    Ok(())
}
