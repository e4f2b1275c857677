//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::ApiError;
use crate::web::envelope::ApiResponse;
use crate::web::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::Uri,
    Extension, Json,
};
use chefito_core::domain::{Profile, ProfileUpdate, QuotaStatus, Viewer};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};
use validator::Validate;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        quota_handler,
        stats_handler,
        get_profile_handler,
        update_profile_handler,
        record_view_handler,
    ),
    components(
        schemas(
            HealthData,
            QuotaView,
            ProfileView,
            UserSummary,
            ProfileData,
            ProfileUpdateRequest,
            RecordViewRequest,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Chefito API", description = "Recipe view quota and user profile endpoints.")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearerAuth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthData {
    status: String,
    timestamp: DateTime<Utc>,
    version: String,
    database: String,
}

/// The caller's weekly recipe quota.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuotaView {
    viewed_this_week: u32,
    can_view: bool,
    remaining: u32,
    is_premium: bool,
    weekly_limit: u32,
}

impl From<QuotaStatus> for QuotaView {
    fn from(status: QuotaStatus) -> Self {
        Self {
            viewed_this_week: status.viewed_this_week,
            can_view: status.can_view,
            remaining: status.remaining,
            is_premium: status.is_premium,
            weekly_limit: status.weekly_limit,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileView {
    id: String,
    email: String,
    full_name: Option<String>,
    avatar_url: Option<String>,
    #[schema(value_type = Option<Object>)]
    preferences: Option<serde_json::Value>,
    premium: bool,
    premium_until: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<Profile> for ProfileView {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.id,
            email: profile.email,
            full_name: profile.full_name,
            avatar_url: profile.avatar_url,
            preferences: profile.preferences,
            premium: profile.premium,
            premium_until: profile.premium_until,
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserSummary {
    id: String,
    email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileData {
    user: UserSummary,
    profile: Option<ProfileView>,
    quota: QuotaView,
}

/// Fields a user may change on their own profile. Absent fields are left as they are.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ProfileUpdateRequest {
    #[validate(length(min = 1, max = 100, message = "Full name must be 1-100 characters"))]
    pub full_name: Option<String>,
    #[validate(url(message = "Invalid avatar URL"))]
    pub avatar_url: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub preferences: Option<serde_json::Value>,
}

impl ProfileUpdateRequest {
    fn into_update(mut self) -> Result<ProfileUpdate, ApiError> {
        self.full_name = self.full_name.map(|name| name.trim().to_string());
        self.validate()
            .map_err(|e| ApiError::BadRequest(format!("Validation failed: {}", e)))?;

        if self.preferences.as_ref().is_some_and(|p| !p.is_object()) {
            return Err(ApiError::BadRequest(
                "Validation failed: preferences must be a JSON object".to_string(),
            ));
        }

        Ok(ProfileUpdate {
            full_name: self.full_name,
            avatar_url: self.avatar_url,
            preferences: self.preferences,
        })
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RecordViewRequest {
    #[serde(rename = "recipeId")]
    #[validate(length(min = 1, max = 100, message = "Recipe ID must be 1-100 characters"))]
    pub recipe_id: String,
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness and database connectivity.
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "API is running", body = HealthData)
    )
)]
pub async fn health_handler(State(state): State<Arc<AppState>>) -> ApiResponse<HealthData> {
    let database = match state.profiles.ping().await {
        Ok(()) => "Connected",
        Err(e) => {
            warn!("Database ping failed: {}", e);
            "Disconnected"
        }
    };

    ApiResponse::ok(HealthData {
        status: "OK".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
    })
}

/// The caller's recipe quota for the current week.
///
/// Anonymous callers, including callers whose token is refused, get the fixed
/// free-tier quota.
#[utoipa::path(
    get,
    path = "/api/user/quota",
    responses(
        (status = 200, description = "Quota evaluated", body = QuotaView),
        (status = 500, description = "Quota could not be evaluated, try again")
    ),
    security((), ("bearerAuth" = []))
)]
pub async fn quota_handler(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
) -> Result<ApiResponse<QuotaView>, ApiError> {
    let is_premium = viewer
        .user()
        .is_some_and(|user| user.is_premium_at(state.quota.clock().now()));
    let status = state.quota.evaluate(viewer.user_id(), is_premium).await?;
    Ok(ApiResponse::ok(status.into()))
}

/// The authenticated user's recipe view stats for the current week.
#[utoipa::path(
    get,
    path = "/api/user/stats",
    responses(
        (status = 200, description = "Stats fetched", body = QuotaView),
        (status = 401, description = "Access token required"),
        (status = 403, description = "Invalid or expired token"),
        (status = 500, description = "Stats could not be evaluated, try again")
    ),
    security(("bearerAuth" = []))
)]
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
) -> Result<ApiResponse<QuotaView>, ApiError> {
    let user = viewer
        .user()
        .ok_or_else(|| ApiError::Unauthorized("User not authenticated".to_string()))?;
    info!(user_id = %user.identity.user_id, "Fetching user stats");

    let is_premium = user.is_premium_at(state.quota.clock().now());
    let status = state
        .quota
        .evaluate(Some(&user.identity.user_id), is_premium)
        .await?;
    Ok(ApiResponse::ok(status.into()))
}

/// The authenticated user's identity, profile and weekly quota.
#[utoipa::path(
    get,
    path = "/api/user/profile",
    responses(
        (status = 200, description = "Profile fetched", body = ProfileData),
        (status = 401, description = "Access token required"),
        (status = 403, description = "Invalid or expired token")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
) -> Result<ApiResponse<ProfileData>, ApiError> {
    let user = viewer
        .user()
        .ok_or_else(|| ApiError::Unauthorized("User not authenticated".to_string()))?;
    info!(user_id = %user.identity.user_id, "Fetching user profile");

    let is_premium = user.is_premium_at(state.quota.clock().now());
    let quota = state
        .quota
        .evaluate(Some(&user.identity.user_id), is_premium)
        .await?;

    Ok(ApiResponse::ok(ProfileData {
        user: UserSummary {
            id: user.identity.user_id.clone(),
            email: user.identity.email.clone(),
        },
        profile: user.profile.clone().map(ProfileView::from),
        quota: quota.into(),
    }))
}

/// Updates the authenticated user's profile.
#[utoipa::path(
    put,
    path = "/api/user/profile",
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileView),
        (status = 400, description = "Invalid data"),
        (status = 401, description = "Access token required"),
        (status = 403, description = "Invalid or expired token")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    payload: Result<Json<ProfileUpdateRequest>, JsonRejection>,
) -> Result<ApiResponse<ProfileView>, ApiError> {
    let user = viewer
        .user()
        .ok_or_else(|| ApiError::Unauthorized("User not authenticated".to_string()))?;
    let Json(request) = payload?;
    let update = request.into_update()?;

    info!(user_id = %user.identity.user_id, "Updating user profile");
    let profile = state.profiles.upsert_profile(&user.identity, &update).await?;

    Ok(ApiResponse::ok(ProfileView::from(profile)).with_message("Profile updated successfully"))
}

/// Records that the caller opened a recipe.
///
/// Views are only tracked for authenticated callers. A failure to write the
/// view is logged and does not fail the request.
#[utoipa::path(
    post,
    path = "/api/recipes/view",
    request_body = RecordViewRequest,
    responses(
        (status = 200, description = "View recorded"),
        (status = 400, description = "Invalid data"),
        (status = 404, description = "Recipe not found"),
        (status = 429, description = "Too many requests")
    ),
    security((), ("bearerAuth" = []))
)]
pub async fn record_view_handler(
    State(state): State<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    payload: Result<Json<RecordViewRequest>, JsonRejection>,
) -> Result<ApiResponse<()>, ApiError> {
    let Json(request) = payload?;
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(format!("Validation failed: {}", e)))?;
    let recipe_id = request.recipe_id;
    let user_id = viewer.user_id();

    info!(
        recipe_id = %recipe_id,
        user_id = user_id.unwrap_or("anonymous"),
        "Recording recipe view"
    );

    if !state.recipes.recipe_exists(&recipe_id).await? {
        warn!(recipe_id = %recipe_id, "Recipe not found for view recording");
        return Err(ApiError::NotFound("Recipe not found".to_string()));
    }

    match state.quota.record_view(user_id, &recipe_id).await {
        Ok(()) if user_id.is_some() => {
            info!(recipe_id = %recipe_id, "Recipe view recorded for authenticated user")
        }
        Ok(()) => info!(recipe_id = %recipe_id, "Recipe view not tracked for anonymous user"),
        Err(e) => error!(recipe_id = %recipe_id, "Failed to record recipe view: {}", e),
    }

    Ok(ApiResponse::message("Recipe view recorded successfully"))
}

/// Fallback for unknown routes.
pub async fn not_found_handler(uri: Uri) -> ApiError {
    warn!(path = %uri.path(), "Route not found");
    ApiError::NotFound(format!("Route {} not found", uri.path()))
}
