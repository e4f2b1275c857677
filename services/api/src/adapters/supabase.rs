//! services/api/src/adapters/supabase.rs
//!
//! This module contains the adapter for Supabase Auth. It implements the
//! `IdentityProvider` port by passing the caller's bearer token through to the
//! `/auth/v1/user` endpoint.

use async_trait::async_trait;
use chefito_core::domain::Identity;
use chefito_core::ports::{IdentityProvider, PortError, PortResult};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `IdentityProvider` port using Supabase Auth.
#[derive(Clone)]
pub struct SupabaseAuthAdapter {
    client: Client,
    base_url: String,
    service_key: String,
}

impl SupabaseAuthAdapter {
    /// Creates a new `SupabaseAuthAdapter`.
    pub fn new(client: Client, base_url: String, service_key: String) -> Self {
        Self {
            client,
            base_url,
            service_key,
        }
    }

    fn user_endpoint(&self) -> String {
        format!("{}/auth/v1/user", self.base_url)
    }
}

/// The subset of the Supabase user object this service reads.
#[derive(Deserialize)]
struct SupabaseUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

//=========================================================================================
// `IdentityProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl IdentityProvider for SupabaseAuthAdapter {
    async fn resolve_token(&self, token: &str) -> PortResult<Identity> {
        let response = self
            .client
            .get(self.user_endpoint())
            .header("apikey", &self.service_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Supabase auth request failed: {}", e)))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                debug!("Supabase rejected the access token");
                return Err(PortError::Unauthorized);
            }
            status => {
                return Err(PortError::Unexpected(format!(
                    "Supabase auth answered with status {}",
                    status
                )))
            }
        }

        let user: SupabaseUser = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Invalid Supabase user payload: {}", e)))?;

        Ok(Identity {
            user_id: user.id,
            email: user.email.unwrap_or_default(),
        })
    }
}
