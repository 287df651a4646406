//! lightrag-mcp - MCP server for a LightRAG backend.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use lightrag_core::GatewayConfig;
use lightrag_mcp::{catalog, Dispatcher, McpServer};

/// Expose a LightRAG server as MCP tools over stdio
#[derive(Parser)]
#[command(name = "lightrag-mcp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/lightrag-mcp/config.toml, then ./lightrag-mcp.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// LightRAG base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// API key sent as X-API-Key
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<f64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP over stdin/stdout (default)
    Serve,

    /// Print the tool catalog as JSON
    Tools,

    /// Invoke one tool and print its result
    Call {
        /// Tool name
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // stdout carries protocol frames
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

/// File, then environment, then command-line flags.
fn load_config(cli: &Cli) -> Result<GatewayConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => GatewayConfig::load(path)?,
        None => GatewayConfig::load_default()?,
    };
    config.apply_env()?;
    apply_flags(&mut config, cli);
    config.validate()?;
    Ok(config)
}

fn apply_flags(config: &mut GatewayConfig, cli: &Cli) {
    if let Some(url) = &cli.base_url {
        config.backend.base_url = url.clone();
    }
    if let Some(key) = &cli.api_key {
        config.backend.api_key = Some(key.clone());
    }
    if let Some(timeout) = cli.timeout {
        config.backend.timeout_secs = timeout;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    match cli.command {
        Some(Commands::Tools) => {
            println!("{}", serde_json::to_string_pretty(&catalog::tools())?);
        }
        Some(Commands::Call { ref tool, ref args }) => {
            let config = Arc::new(load_config(&cli)?);
            let arguments: Value = serde_json::from_str(args)?;
            let failed = call(config, tool, arguments).await?;
            if failed {
                std::process::exit(1);
            }
        }
        Some(Commands::Serve) | None => {
            let config = Arc::new(load_config(&cli)?);
            serve(config).await?;
        }
    }

    Ok(())
}

async fn serve(config: Arc<GatewayConfig>) -> Result<(), Box<dyn std::error::Error>> {
    info!("Using LightRAG backend at {}", config.backend.base_url);
    McpServer::from_config(config).serve_stdio().await?;
    Ok(())
}

/// Returns whether the tool reported an error.
async fn call(
    config: Arc<GatewayConfig>,
    tool: &str,
    arguments: Value,
) -> Result<bool, Box<dyn std::error::Error>> {
    let dispatcher = Dispatcher::new(config);
    let outcome = dispatcher.invoke(tool, arguments).await;
    dispatcher.shutdown().await;

    let result = outcome.to_call_result();
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(result.is_error.unwrap_or(false))
}
