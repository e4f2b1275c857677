//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::{Config, RateLimits};
use chefito_core::ports::{IdentityProvider, ProfileStore, RecipeCatalog};
use chefito_core::QuotaTracker;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub quota: QuotaTracker,
    pub profiles: Arc<dyn ProfileStore>,
    pub recipes: Arc<dyn RecipeCatalog>,
    pub identity: Arc<dyn IdentityProvider>,
    pub frontend_url: String,
    pub rate_limits: RateLimits,
}

impl AppState {
    /// Assembles the state from the loaded configuration and the chosen adapters.
    pub fn new(
        config: &Config,
        quota: QuotaTracker,
        profiles: Arc<dyn ProfileStore>,
        recipes: Arc<dyn RecipeCatalog>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            quota,
            profiles,
            recipes,
            identity,
            frontend_url: config.frontend_url.clone(),
            rate_limits: config.rate_limits,
        }
    }
}
