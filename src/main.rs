use actix_web::HttpServer;
use qa_toolsmith::{AppState, ServerConfig, create_app};
use tracing_subscriber::EnvFilter;

/// Initialize tracing: `RUST_LOG` filtering (default `info`), JSON output when
/// `LOG_FORMAT=json`
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // A missing .env file is fine; the environment may already be set.
    dotenvy::dotenv().ok();
    init_tracing();

    let state = AppState::from_env().map_err(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::io::Error::other(e)
    })?;
    let server = ServerConfig::from_env();

    tracing::info!(
        host = %server.host,
        port = server.port,
        backend = ?state.backend_config.mode,
        "Starting QA Toolsmith"
    );

    HttpServer::new(move || create_app(state.clone()))
        .bind((server.host.as_str(), server.port))?
        .run()
        .await
}
