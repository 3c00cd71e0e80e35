use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::Level;

#[macro_use]
extern crate tracing;

mod acknowledgement;
mod config;
mod data_adapter;
mod document;
mod error;
mod handlers;
mod healthz;
mod identity;
mod middleware;
mod model;
mod protocol;
mod state;
mod validation;

use state::AppState;

pub(crate) fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(healthz::service_info))
        .route("/getApplePaySession", post(handlers::get_apple_pay_session))
        .route("/processPayment", post(handlers::process_payment))
        .layer(axum::middleware::from_fn(middleware::log_request))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let settings = config::Settings::from_env()?;
    info!("Loaded settings: {:?}", settings);

    let state = AppState::from_settings(&settings).map_err(|e| {
        error!("FATAL: {}", e);
        e
    })?;

    let listener = TcpListener::bind(&settings.listen_addr).await?;
    info!("Listening on {}", settings.listen_addr);
    axum::serve(listener, app(state).into_make_service()).await?;
    Ok(())
}
