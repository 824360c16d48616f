use std::env;

use tracing_subscriber::EnvFilter;

use cognita_api::config::AppConfig;
use cognita_api::state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let on_lambda = env::var_os("AWS_LAMBDA_RUNTIME_API").is_some();
    init_tracing(on_lambda);

    let config = AppConfig::load()?;
    tracing::info!(config = ?config, "starting cognita-api");

    let cors = cognita_api::cors_layer(&config.cors_allowed_origins)?;
    let state = AppState::from_config(&config).await?;
    let app = cognita_api::app(state, cors);

    if on_lambda {
        return lambda_http::run(app).await.map_err(|e| eyre::eyre!(e));
    }

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// JSON logs under Lambda (for CloudWatch) or when `COGNITA_LOG_FORMAT=json`.
fn init_tracing(on_lambda: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = match env::var("COGNITA_LOG_FORMAT") {
        Ok(format) => format.eq_ignore_ascii_case("json"),
        Err(_) => on_lambda,
    };
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
