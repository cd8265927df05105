//! coupon-cloud service entry point

use coupon_cloud::{AppState, Config, api};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coupon_cloud=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!(
        "Starting coupon-cloud (env: {}, payment test mode: {})",
        config.environment,
        config.payment_test_mode
    );

    // Initialize application state
    let state = AppState::new(&config).await?;

    // Periodic order lock cleanup (every 5 minutes)
    let orders = state.orders.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            let removed = orders.locks().cleanup();
            if removed > 0 {
                tracing::debug!(removed, "Pruned idle order locks");
            }
        }
    });

    let app = api::create_router(state);

    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("coupon-cloud HTTP listening on {http_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
