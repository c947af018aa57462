//! # HTTP API
//!
//! axum router exposing the Arena booking service under `/api/v1`.
//!
//! ## Endpoints
//!
//! | Area | Routes |
//! |------|--------|
//! | Accounts | `POST /users`, `POST /auth/login`, `/users/me`, `/users/all`, `/users/{id}`, `/users/{id}/bookings` |
//! | Facilities | `/facility`, `/facility/all`, `/facility/{id}`, `/facility/{id}/slots` |
//! | Reviews | `/facility/{id}/review`, `/facility/{id}/reviews`, `/facility/{id}/rating`, `/facility/review/{id}` |
//! | Bookings | `/bookings`, `/bookings/cancel/{id}`, `/bookings/facility/{id}` |
//! | Trainers | `/trainers`, `/trainers/{id}` |
//! | Schedules | `/schedules`, `/schedules/{id}`, `/schedules/trainer/{id}`, `/schedules/facility/{id}` |
//! | Sessions | `/sessions`, `/sessions/{id}`, `/sessions/cancel/{id}`, `/sessions/facility/{id}`, `/sessions/trainer/{id}` |
//! | Registrations | `/registrations`, `/registrations/cancel/{id}`, `/registrations/session/{id}`, `/registrations/user/{id}` |
//! | Penalties | `/penalties`, `/penalties/{id}`, `/penalties/user/{id}`, `/penalties/given/{id}`, `/penalties/interval` |
//!
//! `GET /health` sits outside the prefix and needs no token. Everything
//! except sign-up and login requires `Authorization: Bearer <token>`.

pub mod auth;
mod bookings;
mod facilities;
mod penalties;
mod registrations;
pub mod response;
mod reviews;
mod schedules;
mod sessions;
mod trainers;
mod users;

use crate::config::ServerConfig;
use arena_core::Store;
use auth::TokenSigner;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use response::ApiError;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub tokens: Arc<TokenSigner>,
    /// Login attempts per lower-cased email.
    pub login_limiter: Arc<DefaultKeyedRateLimiter<String>>,
}

impl AppState {
    pub fn new(store: Store, config: &ServerConfig) -> Self {
        Self {
            store: Arc::new(store),
            tokens: Arc::new(TokenSigner::new(
                config.token_secret.clone(),
                config.token_ttl,
            )),
            login_limiter: Arc::new(RateLimiter::keyed(Quota::per_minute(
                config.login_per_minute,
            ))),
        }
    }

    /// Run a store call on the blocking pool.
    pub async fn run<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Store) -> arena_core::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| ApiError::Internal(format!("store task failed: {e}")))?
            .map_err(ApiError::from)
    }
}

/// `?offset=` on paginated listings.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub offset: usize,
}

/// `?date=` on per-day listings.
#[derive(Debug, Default, Deserialize)]
pub struct DateQuery {
    pub date: Option<String>,
}

/// Build the full application router.
pub fn create_router(state: AppState, cors_origins: &[String]) -> Router {
    let public = Router::new()
        .route("/users", post(users::register))
        .route("/auth/login", post(users::login));

    let protected = Router::new()
        // Accounts
        .route("/users/me", get(users::me))
        .route("/users/all", get(users::list))
        .route(
            "/users/{id}",
            get(users::get_one)
                .patch(users::update)
                .delete(users::deactivate),
        )
        .route("/users/{id}/bookings", get(bookings::for_user))
        // Facilities and reviews
        .route("/facility", post(facilities::create))
        .route("/facility/all", get(facilities::list))
        .route(
            "/facility/{id}",
            get(facilities::get_one)
                .patch(facilities::update)
                .delete(facilities::remove),
        )
        .route("/facility/{id}/slots", get(facilities::slots))
        .route("/facility/{id}/review", post(reviews::create))
        .route("/facility/{id}/reviews", get(reviews::list))
        .route("/facility/{id}/rating", get(reviews::rating))
        .route("/facility/review/{id}", delete(reviews::remove))
        // Bookings
        .route("/bookings", post(bookings::create).get(bookings::between))
        .route("/bookings/cancel/{id}", post(bookings::cancel))
        .route("/bookings/facility/{id}", get(bookings::for_facility))
        // Trainers
        .route("/trainers", post(trainers::promote).get(trainers::list))
        .route(
            "/trainers/{id}",
            get(trainers::get_one)
                .patch(trainers::update)
                .delete(trainers::demote),
        )
        // Schedules
        .route("/schedules", post(schedules::create))
        .route("/schedules/{id}", delete(schedules::remove))
        .route("/schedules/trainer/{id}", get(schedules::for_trainer))
        .route("/schedules/facility/{id}", get(schedules::for_facility))
        // Sessions
        .route("/sessions", post(sessions::create))
        .route("/sessions/{id}", delete(sessions::remove))
        .route("/sessions/cancel/{id}", post(sessions::cancel))
        .route("/sessions/facility/{id}", get(sessions::for_facility))
        .route("/sessions/trainer/{id}", get(sessions::for_trainer))
        // Registrations
        .route("/registrations", post(registrations::create))
        .route("/registrations/cancel/{id}", post(registrations::cancel))
        .route("/registrations/session/{id}", get(registrations::for_session))
        .route("/registrations/user/{id}", get(registrations::for_user))
        // Penalties
        .route("/penalties", post(penalties::create))
        .route("/penalties/interval", get(penalties::interval))
        .route("/penalties/{id}", delete(penalties::remove))
        .route("/penalties/user/{id}", get(penalties::for_user))
        .route("/penalties/given/{id}", get(penalties::given_by))
        .route_layer(from_fn_with_state(state.clone(), auth::require_auth));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", public.merge(protected))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %o, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([ACCEPT, AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(300))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "success": true, "data": { "status": "ok" } }))
}

/// Bind, serve, and wait for Ctrl-C or SIGTERM.
pub async fn serve(store: Store, config: ServerConfig) -> std::io::Result<()> {
    let state = AppState::new(store, &config);
    let app = create_router(state, &config.cors_origins);

    let listener = TcpListener::bind(config.bind).await?;
    info!(addr = %listener.local_addr()?, db = %config.db.display(), "Arena listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        info!("received Ctrl-C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("received SIGTERM, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
