//! crates/chefito_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the quota core.
//! These traits form the boundary of the hexagonal architecture, keeping the
//! core independent of the relational store and the authentication provider.

use async_trait::async_trait;
use crate::clock::WeekStamp;
use crate::domain::{Identity, Profile, ProfileUpdate, RecipeView};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The persisted recipe-view ledger.
///
/// Implementations must enforce uniqueness over
/// (`user_id`, `recipe_id`, `week_number`, `year`).
#[async_trait]
pub trait ViewLedger: Send + Sync {
    /// Inserts the row unless an identical one already exists.
    async fn upsert_view(&self, view: &RecipeView) -> PortResult<()>;

    /// Counts the rows recorded for `user_id` in the given week.
    async fn count_views(&self, user_id: &str, week: WeekStamp) -> PortResult<u32>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Returns `None` when the user has no profile row yet.
    async fn get_profile(&self, user_id: &str) -> PortResult<Option<Profile>>;

    /// Creates the profile if missing, then applies the provided fields.
    async fn upsert_profile(
        &self,
        identity: &Identity,
        update: &ProfileUpdate,
    ) -> PortResult<Profile>;

    /// Connectivity check used by the health route.
    async fn ping(&self) -> PortResult<()>;
}

#[async_trait]
pub trait RecipeCatalog: Send + Sync {
    async fn recipe_exists(&self, recipe_id: &str) -> PortResult<bool>;
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolves a bearer token into the identity it was issued for.
    /// Invalid or expired tokens yield `PortError::Unauthorized`.
    async fn resolve_token(&self, token: &str) -> PortResult<Identity>;
}
