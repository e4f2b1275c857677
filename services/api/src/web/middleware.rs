//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.
//!
//! Both middlewares insert a `Viewer` into the request extensions. Handlers
//! behind `require_auth` can rely on it being `Viewer::User`.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chefito_core::domain::{AuthenticatedUser, Viewer};
use chefito_core::ports::PortError;
use std::sync::Arc;
use tracing::{error, warn};

use crate::error::ApiError;
use crate::web::state::AppState;

/// Extracts the token from an `Authorization: Bearer <token>` header.
fn bearer_token(req: &Request) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split_whitespace().nth(1))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Resolves the token into an identity and loads the matching profile.
async fn authenticate(state: &AppState, token: &str) -> Result<AuthenticatedUser, PortError> {
    let identity = state.identity.resolve_token(token).await?;
    let profile = state.profiles.get_profile(&identity.user_id).await?;
    Ok(AuthenticatedUser { identity, profile })
}

/// Works out who is calling. Only a refused token makes the caller anonymous;
/// collaborator failures are returned as errors.
async fn resolve_viewer(state: &AppState, token: Option<String>) -> Result<Viewer, PortError> {
    let Some(token) = token else {
        return Ok(Viewer::Anonymous);
    };
    match authenticate(state, &token).await {
        Ok(user) => Ok(Viewer::User(user)),
        Err(PortError::Unauthorized) => {
            warn!("Ignoring rejected access token");
            Ok(Viewer::Anonymous)
        }
        Err(e) => Err(e),
    }
}

/// Middleware that rejects requests without a valid bearer token.
///
/// Missing token answers 401; a token the identity provider refuses answers 403.
/// Identity or profile lookup failures answer 500.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&req)
        .ok_or_else(|| ApiError::Unauthorized("Access token required".to_string()))?;

    let user = authenticate(&state, &token).await.map_err(|e| match e {
        PortError::Unauthorized => {
            warn!("Rejected access token");
            ApiError::Forbidden("Invalid or expired token".to_string())
        }
        e => ApiError::Port(e),
    })?;

    req.extensions_mut().insert(Viewer::User(user));
    Ok(next.run(req).await)
}

/// Middleware that attaches the caller if a valid token is present and
/// otherwise continues as an anonymous viewer.
///
/// A failing identity provider or profile store fails the request.
pub async fn optional_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&req);
    let viewer = resolve_viewer(&state, token).await?;

    req.extensions_mut().insert(viewer);
    Ok(next.run(req).await)
}

/// Like `optional_auth`, but collaborator failures degrade to an anonymous
/// viewer. Used where the request must succeed without tracking.
pub async fn best_effort_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = bearer_token(&req);
    let viewer = match resolve_viewer(&state, token).await {
        Ok(viewer) => viewer,
        Err(e) => {
            error!("Authentication unavailable, continuing untracked: {}", e);
            Viewer::Anonymous
        }
    };

    req.extensions_mut().insert(viewer);
    next.run(req).await
}
