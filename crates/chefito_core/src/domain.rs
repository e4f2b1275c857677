//! crates/chefito_core/src/domain.rs
//!
//! Defines the pure, core data structures for the quota service.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};

/// A single ledger row: one user opened one recipe during one week.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecipeView {
    pub user_id: String,
    pub recipe_id: String,
    pub week_number: u32,
    pub year: i32,
}

/// The derived quota state of a caller for the current week.
///
/// Computed fresh for every request and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaStatus {
    pub viewed_this_week: u32,
    pub can_view: bool,
    pub remaining: u32,
    pub is_premium: bool,
    pub weekly_limit: u32,
}

impl QuotaStatus {
    /// Builds the status for `viewed` ledger rows against `weekly_limit`.
    pub fn from_count(viewed: u32, weekly_limit: u32, is_premium: bool) -> Self {
        Self {
            viewed_this_week: viewed,
            can_view: viewed < weekly_limit,
            remaining: weekly_limit.saturating_sub(viewed),
            is_premium,
            weekly_limit,
        }
    }
}

/// A user profile row, owned by the profile store.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub preferences: Option<serde_json::Value>,
    pub premium: bool,
    pub premium_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Premium only counts while the flag is set and the expiry lies in the future.
    pub fn is_premium_at(&self, now: DateTime<Utc>) -> bool {
        self.premium && self.premium_until.is_some_and(|until| until > now)
    }
}

/// The fields a user may change on their own profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub preferences: Option<serde_json::Value>,
}

/// The identity returned by the authentication provider for a valid token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
}

/// An authenticated caller together with their profile, if one exists yet.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub identity: Identity,
    pub profile: Option<Profile>,
}

impl AuthenticatedUser {
    pub fn is_premium_at(&self, now: DateTime<Utc>) -> bool {
        self.profile
            .as_ref()
            .is_some_and(|profile| profile.is_premium_at(now))
    }
}

/// Whoever is making the current request.
#[derive(Debug, Clone, Default)]
pub enum Viewer {
    #[default]
    Anonymous,
    User(AuthenticatedUser),
}

impl Viewer {
    pub fn user(&self) -> Option<&AuthenticatedUser> {
        match self {
            Viewer::Anonymous => None,
            Viewer::User(user) => Some(user),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user().map(|user| user.identity.user_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 16, 10, 0, 0).unwrap()
    }

    fn profile(premium: bool, premium_until: Option<DateTime<Utc>>) -> Profile {
        Profile {
            id: "u1".to_string(),
            email: "u1@example.com".to_string(),
            full_name: None,
            avatar_url: None,
            preferences: None,
            premium,
            premium_until,
            created_at: now(),
            updated_at: now(),
        }
    }

    #[test]
    fn premium_needs_flag_and_future_expiry() {
        assert!(profile(true, Some(now() + Duration::days(1))).is_premium_at(now()));
    }

    #[test]
    fn future_expiry_without_flag_is_free() {
        assert!(!profile(false, Some(now() + Duration::days(1))).is_premium_at(now()));
    }

    #[test]
    fn flag_without_expiry_is_free() {
        assert!(!profile(true, None).is_premium_at(now()));
    }

    #[test]
    fn expiry_is_exclusive() {
        assert!(!profile(true, Some(now())).is_premium_at(now()));
        assert!(profile(true, Some(now() + Duration::seconds(1))).is_premium_at(now()));
        assert!(!profile(true, Some(now() - Duration::days(1))).is_premium_at(now()));
    }

    #[test]
    fn users_without_a_profile_are_free() {
        let user = AuthenticatedUser {
            identity: Identity {
                user_id: "u1".to_string(),
                email: "u1@example.com".to_string(),
            },
            profile: None,
        };
        assert!(!user.is_premium_at(now()));
        assert!(!Viewer::Anonymous.user().is_some_and(|u| u.is_premium_at(now())));
        assert_eq!(Viewer::User(user).user_id(), Some("u1"));
    }
}
