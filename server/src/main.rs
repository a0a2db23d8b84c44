use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use axum::Router;
use clap::Parser;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transatel_mcp_runtime::{McpServer, OperatorArgs};

mod error;
mod middleware;
mod routes;
mod state;

const DEFAULT_BIND: &str = "0.0.0.0:8000";

/// Transatel network tools over MCP's HTTP+SSE transport.
#[derive(Parser, Debug)]
#[command(name = "transatel-mcp-server", version, about)]
struct Cli {
    #[command(flatten)]
    operator: OperatorArgs,
    /// Listen address
    #[arg(long, env = "TRANSATEL_MCP_BIND", default_value = DEFAULT_BIND)]
    bind: SocketAddr,
    /// Comma-separated browser origins allowed by CORS (default: any)
    #[arg(long, env = "TRANSATEL_MCP_CORS_ORIGINS", value_delimiter = ',')]
    cors_origins: Vec<String>,
}

fn app(state: state::AppState, cors_layer: CorsLayer) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::sse::router())
        .merge(routes::mcp_http::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "transatel_mcp_server=info,transatel_mcp_runtime=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let cli = Cli::parse();
    let config = match cli.operator.into_config() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(event = "config_invalid", error = %err, "Invalid operator configuration");
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!(event = "config_loaded", config = ?config, "Operator configuration loaded");

    let mcp = match McpServer::new(Arc::new(config)) {
        Ok(mcp) => mcp,
        Err(err) => {
            tracing::error!(event = "http_client_failed", error = %err, "Failed to build HTTP client");
            return ExitCode::FAILURE;
        }
    };
    let state = state::AppState::new(mcp);
    let app = app(state, middleware::cors::build_cors_layer(&cli.cors_origins));

    let listener = match tokio::net::TcpListener::bind(cli.bind).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(event = "bind_failed", addr = %cli.bind, error = %err, "Failed to bind listener");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        event = "mcp_server_listening",
        addr = %cli.bind,
        version = env!("CARGO_PKG_VERSION"),
        "Transatel MCP server listening"
    );

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(event = "server_failed", error = %err, "HTTP server stopped with an error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!(event = "shutdown_requested", "Shutting down");
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;

    #[test]
    fn cli_reads_flags_and_defaults_bind() {
        let cli = Cli::try_parse_from([
            "transatel-mcp-server",
            "--access-token-url",
            "https://auth.example.test/oauth/token",
            "--client-id",
            "client",
            "--client-secret",
            "secret",
            "--scope",
            "network:read",
            "--cors-origins",
            "https://claude.ai,https://chatgpt.com",
        ])
        .expect("cli should parse");
        assert_eq!(cli.operator.client_id, "client");
        assert_eq!(cli.cors_origins.len(), 2);
        if std::env::var_os("TRANSATEL_MCP_BIND").is_none() {
            assert_eq!(cli.bind.to_string(), DEFAULT_BIND);
        }
    }

    #[tokio::test]
    async fn app_serves_every_transport_route() {
        let app = app(state::test_state(), middleware::cors::build_cors_layer(&[]));

        for (method, uri, expected) in [
            ("GET", "/health", StatusCode::OK),
            ("GET", "/mcp", StatusCode::METHOD_NOT_ALLOWED),
            ("POST", "/messages/", StatusCode::BAD_REQUEST),
            ("GET", "/unknown", StatusCode::NOT_FOUND),
        ] {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri(uri)
                        .body(Body::empty())
                        .expect("request should build"),
                )
                .await
                .expect("request should succeed");
            assert_eq!(response.status(), expected, "{method} {uri}");
        }
    }
}
