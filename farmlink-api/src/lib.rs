use axum::{
    http::{HeaderValue, Method},
    Router,
};
use farmlink_store::app_config::CorsConfig;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod error;
pub mod health;
pub mod middleware;
pub mod orders;
pub mod products;
pub mod state;

pub use state::AppState;

/// Build the versioned API router.
pub fn app(state: AppState, cors_config: &CorsConfig) -> Router {
    let allow_origin = if cors_config.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = cors_config
            .allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let api = Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(products::routes())
        .merge(orders::routes());

    Router::new()
        .nest("/api/v1", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
