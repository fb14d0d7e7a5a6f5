//! Hubly Server - support desk API
//!
//! HTTP surface for the chat widget and the staff dashboard.

pub mod auth;
pub mod config;
pub mod error;
pub mod http;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    http::HeaderValue,
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use hubly_core::HelpDesk;

pub use error::ApiError;

/// Shared application state
pub struct AppState {
    desk: Mutex<HelpDesk>,
    cors_origin: Option<String>,
}

impl AppState {
    pub fn new(desk: HelpDesk) -> Self {
        Self {
            desk: Mutex::new(desk),
            cors_origin: None,
        }
    }

    /// Restrict browser access to a single origin
    pub fn with_cors_origin(mut self, origin: Option<String>) -> Self {
        self.cors_origin = origin;
        self
    }

    /// Exclusive access to the desk for the duration of one request
    pub fn desk(&self) -> Result<MutexGuard<'_, HelpDesk>, ApiError> {
        self.desk
            .lock()
            .map_err(|e| ApiError::internal(format!("Desk lock poisoned: {}", e)))
    }
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    match origin {
        None => CorsLayer::permissive(),
        Some(origin) => match origin.parse::<HeaderValue>() {
            Ok(value) => CorsLayer::new()
                .allow_origin(value)
                .allow_methods(Any)
                .allow_headers(Any),
            Err(_) => {
                tracing::warn!(origin, "Invalid CORS origin, cross-origin requests disabled");
                CorsLayer::new()
            }
        },
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let public = Router::new()
        .route("/health", get(http::health))
        .route("/chat/start", post(http::start_chat))
        .route(
            "/chat/{ticket_id}/messages",
            get(http::list_chat_messages).post(http::post_customer_message),
        )
        .route("/chatbot/settings", get(http::get_settings));

    let staff = Router::new()
        // Tickets
        .route("/tickets", get(http::list_tickets))
        .route("/tickets/{ticket_id}/assign", patch(http::assign_ticket))
        .route("/tickets/{ticket_id}/status", patch(http::change_status))
        // Messages
        .route(
            "/messages/ticket/{ticket_id}",
            get(http::list_ticket_messages).post(http::post_staff_message),
        )
        // Analytics
        .route("/analytics/overview", get(http::analytics_overview))
        // Roster
        .route("/users", get(http::list_users).post(http::create_user))
        .route("/users/me", get(http::current_user))
        .route("/users/{staff_id}", delete(http::remove_user))
        // Settings
        .route("/chatbot/settings", put(http::update_settings))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    let cors = cors_layer(state.cors_origin.as_deref());

    Router::new()
        .merge(public)
        .merge(staff)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the server
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Hubly server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
