//! Surgeon Call Scheduling - Axum Server
//!
//! Run with: cargo run
//! Then open: http://localhost:7860

use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("surgeon_call_scheduling=info".parse().unwrap()),
        )
        .init();

    #[cfg(feature = "console")]
    surgeon_call_scheduling::console::print_banner();

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(7860);

    let app = surgeon_call_scheduling::api::create_router();
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
