use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use canopy_session::{Config, RouteTracker, SessionManager};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "canopy-session starting");

    let config = Config::load()?;
    info!(base_url = %config.api.base_url, "Loaded configuration");

    let navigator = Arc::new(RouteTracker::default());
    let manager = SessionManager::from_config(&config, navigator.clone())?;

    let state = manager.bootstrap().await;
    info!(
        authenticated = state.is_authenticated(),
        redirects = navigator.navigations().len(),
        "Session state resolved"
    );

    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}
