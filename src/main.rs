//! QUBO Scheduling - Axum Server
//!
//! Run with: cargo run
//! Then open: http://localhost:7860

use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

use qubo_scheduling::api::{self, AppState};
use qubo_scheduling::console;
use qubo_scheduling::remote::HttpSampler;
use qubo_scheduling::solver::SolverService;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("qubo_scheduling=info".parse().unwrap()),
        )
        .init();

    console::print_banner();

    let sampler = Arc::new(HttpSampler::from_env());
    println!("Submitting QUBO models to {}", sampler.endpoint());

    let state = Arc::new(AppState::new(SolverService::new(sampler)));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = api::router(state).layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], 7860));
    println!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
