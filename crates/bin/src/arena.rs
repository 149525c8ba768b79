//! Arena - game server with static frontend hosting.

use axum::{
    Router,
    extract::{
        ConnectInfo, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use futures_util::{SinkExt, StreamExt, future};
use server::{Frame, ServerContext};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,server=debug")),
        )
        .init();

    info!("Blob Arena Server v{}", env!("CARGO_PKG_VERSION"));

    // Load server configuration
    let config = server::Config::load()?;
    info!("Loaded configuration");
    info!("  Port: {}", config.server.port);
    info!("  Map: {0}x{0}", config.world.map_size);
    info!("  Tick rate: {} Hz", config.server.tick_rate);
    info!("  Static files: {}", config.server.static_dir.display());

    let ctx = ServerContext::new(&config);

    // Start the game loop
    tokio::spawn(server::run_game_loop(ctx.clone(), config.server.tick_interval()));

    // Build the axum router
    let app = Router::new()
        // WebSocket game endpoint
        .route("/ws", get(websocket_handler))
        // Everything else comes from the static directory
        .fallback_service(ServeDir::new(&config.server.static_dir))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(ctx);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Game WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Handle WebSocket upgrades for the game
async fn websocket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(ctx): State<ServerContext>,
) -> impl IntoResponse {
    info!("WebSocket connection from {}", addr);

    ws.on_upgrade(move |socket| handle_websocket(socket, addr, ctx))
}

/// Adapt the axum socket to the server's session loop
async fn handle_websocket(socket: WebSocket, addr: SocketAddr, ctx: ServerContext) {
    let (write, read) = socket.split();
    let read = read.map(|msg| {
        msg.map(|msg| match msg {
            Message::Text(text) => Frame::Text(text.as_str().to_owned()),
            Message::Close(_) => Frame::Close,
            _ => Frame::Ignored,
        })
    });
    let write = write.with(|text: String| {
        future::ready(Ok::<_, axum::Error>(Message::Text(text.into())))
    });

    server::drive_session(read, write, addr, ctx).await;
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
