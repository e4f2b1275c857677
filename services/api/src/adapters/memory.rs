//! services/api/src/adapters/memory.rs
//!
//! In-process implementations of the storage and identity ports, for running
//! the router without PostgreSQL or Supabase (integration tests, local demos).
//!
//! The ledger honours the same (user, recipe, week, year) uniqueness rule as
//! the `recipe_views` table.

use async_trait::async_trait;
use chefito_core::clock::WeekStamp;
use chefito_core::domain::{Identity, Profile, ProfileUpdate, RecipeView};
use chefito_core::ports::{
    IdentityProvider, PortError, PortResult, ProfileStore, RecipeCatalog, ViewLedger,
};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Tables {
    profiles: HashMap<String, Profile>,
    recipes: HashSet<String>,
    views: HashSet<RecipeView>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    ledger_down: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> PortResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| PortError::Unexpected("memory store lock poisoned".to_string()))
    }

    fn check_ledger(&self) -> PortResult<()> {
        if self.ledger_down.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("recipe view ledger unavailable".to_string()));
        }
        Ok(())
    }

    pub fn add_recipe(&self, recipe_id: impl Into<String>) {
        if let Ok(mut tables) = self.tables() {
            tables.recipes.insert(recipe_id.into());
        }
    }

    pub fn put_profile(&self, profile: Profile) {
        if let Ok(mut tables) = self.tables() {
            tables.profiles.insert(profile.id.clone(), profile);
        }
    }

    /// Makes every ledger read and write fail until switched back.
    pub fn set_ledger_down(&self, down: bool) {
        self.ledger_down.store(down, Ordering::SeqCst);
    }

    pub fn views(&self) -> Vec<RecipeView> {
        self.tables()
            .map(|tables| tables.views.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ViewLedger for MemoryStore {
    async fn upsert_view(&self, view: &RecipeView) -> PortResult<()> {
        self.check_ledger()?;
        self.tables()?.views.insert(view.clone());
        Ok(())
    }

    async fn count_views(&self, user_id: &str, week: WeekStamp) -> PortResult<u32> {
        self.check_ledger()?;
        let count = self
            .tables()?
            .views
            .iter()
            .filter(|v| v.user_id == user_id && v.week_number == week.week_number && v.year == week.year)
            .count();
        Ok(count as u32)
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_profile(&self, user_id: &str) -> PortResult<Option<Profile>> {
        Ok(self.tables()?.profiles.get(user_id).cloned())
    }

    async fn upsert_profile(
        &self,
        identity: &Identity,
        update: &ProfileUpdate,
    ) -> PortResult<Profile> {
        let now = Utc::now();
        let mut tables = self.tables()?;
        let profile = tables
            .profiles
            .entry(identity.user_id.clone())
            .or_insert_with(|| Profile {
                id: identity.user_id.clone(),
                email: identity.email.clone(),
                full_name: None,
                avatar_url: None,
                preferences: None,
                premium: false,
                premium_until: None,
                created_at: now,
                updated_at: now,
            });

        profile.email = identity.email.clone();
        if let Some(full_name) = &update.full_name {
            profile.full_name = Some(full_name.clone());
        }
        if let Some(avatar_url) = &update.avatar_url {
            profile.avatar_url = Some(avatar_url.clone());
        }
        if let Some(preferences) = &update.preferences {
            profile.preferences = Some(preferences.clone());
        }
        profile.updated_at = now;

        Ok(profile.clone())
    }

    async fn ping(&self) -> PortResult<()> {
        self.tables().map(|_| ())
    }
}

#[async_trait]
impl RecipeCatalog for MemoryStore {
    async fn recipe_exists(&self, recipe_id: &str) -> PortResult<bool> {
        Ok(self.tables()?.recipes.contains(recipe_id))
    }
}

/// An identity provider backed by a fixed token table.
#[derive(Default)]
pub struct StaticIdentityProvider {
    tokens: HashMap<String, Identity>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.tokens.insert(token.into(), identity);
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn resolve_token(&self, token: &str) -> PortResult<Identity> {
        self.tokens.get(token).cloned().ok_or(PortError::Unauthorized)
    }
}
