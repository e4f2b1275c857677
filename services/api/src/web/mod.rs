pub mod envelope;
pub mod middleware;
pub mod rate_limit;
pub mod rest;
pub mod state;

pub use middleware::{best_effort_auth, optional_auth, require_auth};
pub use rest::ApiDoc;

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use rate_limit::{rate_limit, IpRateLimiter};
use rest::{
    get_profile_handler, health_handler, not_found_handler, quota_handler, record_view_handler,
    stats_handler, update_profile_handler,
};
use state::AppState;

const DEV_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:5173"];

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let origins: Vec<HeaderValue> = std::iter::once(frontend_url)
        .chain(DEV_ORIGINS)
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
}

/// Builds the complete application router, Swagger UI included.
pub fn router(state: Arc<AppState>) -> Router {
    let general_limiter = IpRateLimiter::new(
        state.rate_limits.general_per_15_min,
        Duration::from_secs(15 * 60),
        "Too many requests, please try again later.",
    );
    let view_limiter = IpRateLimiter::new(
        state.rate_limits.views_per_minute,
        Duration::from_secs(60),
        "Too many views recorded, please slow down.",
    );

    // Public routes (no auth)
    let public_routes = Router::new().route("/api/health", get(health_handler));

    // Routes that accept, but do not require, a bearer token
    let quota_routes = Router::new()
        .route("/api/user/quota", get(quota_handler))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), optional_auth));

    // The view limiter wraps auth so throttled requests never reach Supabase
    let view_routes = Router::new()
        .route("/api/recipes/view", post(record_view_handler))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), best_effort_auth))
        .route_layer(axum_middleware::from_fn_with_state(view_limiter, rate_limit));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route(
            "/api/user/profile",
            get(get_profile_handler).put(update_profile_handler),
        )
        .route("/api/user/stats", get(stats_handler))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), require_auth));

    let cors = cors_layer(&state.frontend_url);

    let api_router = Router::new()
        .merge(public_routes)
        .merge(quota_routes)
        .merge(view_routes)
        .merge(protected_routes)
        .fallback(not_found_handler)
        .with_state(state);

    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", ApiDoc::openapi()))
        .layer(axum_middleware::from_fn_with_state(general_limiter, rate_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
