use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transatel_mcp_runtime::OperatorArgs;

#[derive(Parser, Debug)]
#[command(
    name = "transatel-mcp",
    version,
    about = "Transatel MCP server over stdio"
)]
struct Cli {
    #[command(flatten)]
    operator: OperatorArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    // stdout carries the protocol; logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "transatel_mcp_runtime=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    let config = match cli.operator.into_config() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(event = "config_invalid", error = %err, "Invalid operator configuration");
            return ExitCode::FAILURE;
        }
    };

    match transatel_mcp_runtime::run_stdio(config).await {
        0 => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}
