use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::helpers::handler_404::page_not_found_handler;
use crate::repositories::store::{BookingStore, PlaceStore, UserStore};
use crate::services::media_service::MediaService;
use crate::services::session_service::SessionManager;

pub mod auth_controller;
pub mod booking_controller;
pub mod health_check;
pub mod place_controller;
pub mod upload_controller;

/// Handles shared by every router. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub places: Arc<dyn PlaceStore>,
    pub bookings: Arc<dyn BookingStore>,
    pub sessions: Arc<SessionManager>,
    pub media: Arc<MediaService>,
}

impl AppState {
    pub fn new<R>(repo: Arc<R>, sessions: SessionManager, media: MediaService) -> Self
    where
        R: UserStore + PlaceStore + BookingStore + 'static,
    {
        Self {
            users: repo.clone(),
            places: repo.clone(),
            bookings: repo,
            sessions: Arc::new(sessions),
            media: Arc::new(media),
        }
    }
}

pub async fn serve(
    app_state: AppState,
    config: &Config,
) -> anyhow::Result<()> {
    let origins: Vec<HeaderValue> = config
        .allowed_origins()
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid origin {}: {}", origin, e);
                None
            }
        })
        .collect::<Vec<HeaderValue>>();

    let application = build_app(app_state, config)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(
                    CorsLayer::new()
                        .allow_methods([
                            Method::GET,
                            Method::POST,
                            Method::PUT,
                            Method::DELETE,
                            Method::OPTIONS
                        ])
                        .allow_origin(origins)
                        .allow_headers([CONTENT_TYPE])
                        .allow_credentials(true)
                )
        );

    let address = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("API server listening on: {}", address);
    axum::Server::bind(&address)
        .serve(application.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Error spinning up the API server")
}

/// Full route table: the API under `/api`, uploaded files under `/uploads`.
pub fn build_app(app_state: AppState, config: &Config) -> Router {
    Router::new()
        .nest("/api", api_endpoints(app_state))
        .merge(health_check::router())
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .fallback(page_not_found_handler)
}

pub fn api_endpoints(app_state: AppState) -> Router {
    Router::new()
        .merge(health_check::api_router())
        .merge(auth_controller::router(app_state.clone()))
        .merge(upload_controller::router(app_state.clone()))
        .merge(place_controller::router(app_state.clone()))
        .merge(booking_controller::router(app_state))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, draining connections"),
        Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
    }
}
