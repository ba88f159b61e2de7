use presence_relay::{config, routes, state};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = config::RelayConfig::from_env().expect("invalid relay configuration");
    let port = config.port;
    tracing::info!(
        max_frame_bytes = config.max_frame_bytes,
        idle_timeout_secs = config.idle_timeout.as_secs(),
        outbound_queue = config.outbound_queue,
        "relay configured"
    );

    let state = state::AppState::new(config);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "presence relay listening");
    axum::serve(listener, app).await.expect("server failed");
}
