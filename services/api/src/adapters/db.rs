//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of
//! the `ViewLedger`, `ProfileStore` and `RecipeCatalog` ports from the core
//! crate. It handles all interactions with PostgreSQL using `sqlx`.

use async_trait::async_trait;
use chefito_core::clock::WeekStamp;
use chefito_core::domain::{Identity, Profile, ProfileUpdate, RecipeView};
use chefito_core::ports::{PortError, PortResult, ProfileStore, RecipeCatalog, ViewLedger};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter backed by a PostgreSQL connection pool.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ProfileRecord {
    id: String,
    email: String,
    full_name: Option<String>,
    avatar_url: Option<String>,
    preferences: Option<serde_json::Value>,
    premium: bool,
    premium_until: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl ProfileRecord {
    fn to_domain(self) -> Profile {
        Profile {
            id: self.id,
            email: self.email,
            full_name: self.full_name,
            avatar_url: self.avatar_url,
            preferences: self.preferences,
            premium: self.premium,
            premium_until: self.premium_until,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const PROFILE_COLUMNS: &str =
    "id, email, full_name, avatar_url, preferences, premium, premium_until, created_at, updated_at";

//=========================================================================================
// Port Implementations
//=========================================================================================

#[async_trait]
impl ViewLedger for DbAdapter {
    async fn upsert_view(&self, view: &RecipeView) -> PortResult<()> {
        sqlx::query(
            r#"
            INSERT INTO recipe_views (user_id, recipe_id, week_number, year)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, recipe_id, week_number, year) DO NOTHING
            "#,
        )
        .bind(&view.user_id)
        .bind(&view.recipe_id)
        .bind(view.week_number as i32)
        .bind(view.year)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn count_views(&self, user_id: &str, week: WeekStamp) -> PortResult<u32> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM recipe_views WHERE user_id = $1 AND week_number = $2 AND year = $3",
        )
        .bind(user_id)
        .bind(week.week_number as i32)
        .bind(week.year)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        u32::try_from(count).map_err(|e| PortError::Unexpected(e.to_string()))
    }
}

#[async_trait]
impl ProfileStore for DbAdapter {
    async fn get_profile(&self, user_id: &str) -> PortResult<Option<Profile>> {
        let record = sqlx::query_as::<_, ProfileRecord>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(record.map(ProfileRecord::to_domain))
    }

    async fn upsert_profile(
        &self,
        identity: &Identity,
        update: &ProfileUpdate,
    ) -> PortResult<Profile> {
        let record = sqlx::query_as::<_, ProfileRecord>(&format!(
            r#"
            INSERT INTO profiles (id, email, full_name, avatar_url, preferences)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                email = EXCLUDED.email,
                full_name = COALESCE(EXCLUDED.full_name, profiles.full_name),
                avatar_url = COALESCE(EXCLUDED.avatar_url, profiles.avatar_url),
                preferences = COALESCE(EXCLUDED.preferences, profiles.preferences),
                updated_at = NOW()
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(&identity.user_id)
        .bind(&identity.email)
        .bind(&update.full_name)
        .bind(&update.avatar_url)
        .bind(&update.preferences)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(record.to_domain())
    }

    async fn ping(&self) -> PortResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

#[async_trait]
impl RecipeCatalog for DbAdapter {
    async fn recipe_exists(&self, recipe_id: &str) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM recipes WHERE id = $1)")
            .bind(recipe_id)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)
    }
}
