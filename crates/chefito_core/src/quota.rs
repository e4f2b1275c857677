//! crates/chefito_core/src/quota.rs
//!
//! The freemium recipe-view quota: evaluation and recording.

use std::sync::Arc;

use tracing::debug;

use crate::clock::{Clock, WeekStamp};
use crate::domain::{QuotaStatus, RecipeView};
use crate::ports::{PortResult, ViewLedger};

pub const DEFAULT_FREE_WEEKLY_LIMIT: u32 = 2;
pub const DEFAULT_PREMIUM_WEEKLY_LIMIT: u32 = 50;

/// Weekly view limits per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaLimits {
    pub free: u32,
    pub premium: u32,
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self {
            free: DEFAULT_FREE_WEEKLY_LIMIT,
            premium: DEFAULT_PREMIUM_WEEKLY_LIMIT,
        }
    }
}

impl QuotaLimits {
    pub fn for_tier(&self, is_premium: bool) -> u32 {
        if is_premium {
            self.premium
        } else {
            self.free
        }
    }

    /// The status reported to anonymous callers. Nothing is tracked for them.
    pub fn anonymous(&self) -> QuotaStatus {
        QuotaStatus::from_count(0, self.free, false)
    }
}

/// Evaluates and records recipe views against the ledger.
#[derive(Clone)]
pub struct QuotaTracker {
    ledger: Arc<dyn ViewLedger>,
    clock: Arc<dyn Clock>,
    limits: QuotaLimits,
}

impl QuotaTracker {
    pub fn new(ledger: Arc<dyn ViewLedger>, clock: Arc<dyn Clock>, limits: QuotaLimits) -> Self {
        Self {
            ledger,
            clock,
            limits,
        }
    }

    pub fn limits(&self) -> QuotaLimits {
        self.limits
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Computes the caller's quota for the current week.
    ///
    /// Anonymous callers (`user_id == None`) get the fixed free-tier status
    /// without a ledger lookup. Ledger failures are returned unchanged.
    pub async fn evaluate(&self, user_id: Option<&str>, is_premium: bool) -> PortResult<QuotaStatus> {
        let Some(user_id) = user_id else {
            return Ok(self.limits.anonymous());
        };

        let week = WeekStamp::current(self.clock.as_ref());
        let viewed = self.ledger.count_views(user_id, week).await?;
        let status = QuotaStatus::from_count(viewed, self.limits.for_tier(is_premium), is_premium);

        debug!(
            user_id,
            week = week.week_number,
            year = week.year,
            viewed,
            remaining = status.remaining,
            "Evaluated weekly quota"
        );
        Ok(status)
    }

    /// Records that `user_id` opened `recipe_id` this week.
    ///
    /// A no-op for anonymous callers. Repeated views within the same week
    /// collapse into one ledger row.
    pub async fn record_view(&self, user_id: Option<&str>, recipe_id: &str) -> PortResult<()> {
        let Some(user_id) = user_id else {
            return Ok(());
        };

        let week = WeekStamp::current(self.clock.as_ref());
        let view = RecipeView {
            user_id: user_id.to_string(),
            recipe_id: recipe_id.to_string(),
            week_number: week.week_number,
            year: week.year,
        };
        self.ledger.upsert_view(&view).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::ports::PortError;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeLedger {
        rows: Mutex<HashSet<RecipeView>>,
        broken: bool,
    }

    impl FakeLedger {
        fn broken() -> Self {
            Self {
                broken: true,
                ..Self::default()
            }
        }

        fn len(&self) -> usize {
            self.rows.lock().unwrap().len()
        }

        fn rows(&self) -> Vec<RecipeView> {
            self.rows.lock().unwrap().iter().cloned().collect()
        }
    }

    #[async_trait]
    impl ViewLedger for FakeLedger {
        async fn upsert_view(&self, view: &RecipeView) -> PortResult<()> {
            if self.broken {
                return Err(PortError::Unexpected("ledger offline".into()));
            }
            self.rows.lock().unwrap().insert(view.clone());
            Ok(())
        }

        async fn count_views(&self, user_id: &str, week: WeekStamp) -> PortResult<u32> {
            if self.broken {
                return Err(PortError::Unexpected("ledger offline".into()));
            }
            let rows = self.rows.lock().unwrap();
            let count = rows
                .iter()
                .filter(|r| r.user_id == user_id && r.week_number == week.week_number && r.year == week.year)
                .count();
            Ok(count as u32)
        }
    }

    /// 2024-01-16 falls into week 3 of 2024.
    fn week_three_2024() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 16, 10, 0, 0).unwrap()
    }

    fn tracker_at(ledger: Arc<FakeLedger>, now: DateTime<Utc>) -> QuotaTracker {
        QuotaTracker::new(ledger, Arc::new(FixedClock(now)), QuotaLimits::default())
    }

    #[tokio::test]
    async fn repeated_view_in_same_week_is_recorded_once() {
        let ledger = Arc::new(FakeLedger::default());
        let tracker = tracker_at(ledger.clone(), week_three_2024());

        tracker.record_view(Some("u1"), "r1").await.unwrap();
        tracker.record_view(Some("u1"), "r1").await.unwrap();

        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn views_from_last_week_do_not_count() {
        let ledger = Arc::new(FakeLedger::default());
        let last_week = tracker_at(ledger.clone(), Utc.with_ymd_and_hms(2024, 1, 9, 10, 0, 0).unwrap());
        last_week.record_view(Some("u1"), "r1").await.unwrap();
        last_week.record_view(Some("u1"), "r2").await.unwrap();
        assert!(!last_week.evaluate(Some("u1"), false).await.unwrap().can_view);

        let this_week = tracker_at(ledger, week_three_2024());
        let status = this_week.evaluate(Some("u1"), false).await.unwrap();

        assert_eq!(status.viewed_this_week, 0);
        assert!(status.can_view);
        assert_eq!(status.remaining, 2);
    }

    #[tokio::test]
    async fn free_tier_boundary() {
        let ledger = Arc::new(FakeLedger::default());
        let tracker = tracker_at(ledger, week_three_2024());

        tracker.record_view(Some("u1"), "r1").await.unwrap();
        let one = tracker.evaluate(Some("u1"), false).await.unwrap();
        assert_eq!(one.remaining, 1);
        assert!(one.can_view);

        tracker.record_view(Some("u1"), "r2").await.unwrap();
        let two = tracker.evaluate(Some("u1"), false).await.unwrap();
        assert_eq!(two.remaining, 0);
        assert!(!two.can_view);
    }

    #[tokio::test]
    async fn premium_changes_only_the_limit() {
        let ledger = Arc::new(FakeLedger::default());
        let tracker = tracker_at(ledger, week_three_2024());
        tracker.record_view(Some("u1"), "r1").await.unwrap();
        tracker.record_view(Some("u1"), "r2").await.unwrap();

        let free = tracker.evaluate(Some("u1"), false).await.unwrap();
        let premium = tracker.evaluate(Some("u1"), true).await.unwrap();

        assert_eq!(free.viewed_this_week, premium.viewed_this_week);
        assert!(!free.can_view);
        assert!(premium.can_view);
        assert_eq!(premium.remaining, 48);
        assert_eq!(premium.weekly_limit, 50);
        assert!(premium.is_premium);
    }

    #[tokio::test]
    async fn anonymous_callers_always_get_the_fixed_quota() {
        let ledger = Arc::new(FakeLedger::broken());
        let tracker = tracker_at(ledger, week_three_2024());

        let status = tracker.evaluate(None, true).await.unwrap();

        assert_eq!(
            status,
            QuotaStatus {
                viewed_this_week: 0,
                can_view: true,
                remaining: 2,
                is_premium: false,
                weekly_limit: 2,
            }
        );
    }

    #[tokio::test]
    async fn anonymous_views_are_not_recorded() {
        let ledger = Arc::new(FakeLedger::default());
        let tracker = tracker_at(ledger.clone(), week_three_2024());

        tracker.record_view(None, "r1").await.unwrap();

        assert_eq!(ledger.len(), 0);
    }

    #[tokio::test]
    async fn ledger_failures_propagate() {
        let ledger = Arc::new(FakeLedger::broken());
        let tracker = tracker_at(ledger, week_three_2024());

        assert!(matches!(
            tracker.evaluate(Some("u1"), false).await,
            Err(PortError::Unexpected(_))
        ));
        assert!(matches!(
            tracker.record_view(Some("u1"), "r1").await,
            Err(PortError::Unexpected(_))
        ));
    }

    #[tokio::test]
    async fn week_three_walkthrough() {
        let ledger = Arc::new(FakeLedger::default());
        let tracker = tracker_at(ledger.clone(), week_three_2024());

        tracker.record_view(Some("u1"), "r1").await.unwrap();
        assert_eq!(ledger.len(), 1);
        let status = tracker.evaluate(Some("u1"), false).await.unwrap();
        assert_eq!(status, QuotaStatus::from_count(1, 2, false));
        assert!(status.can_view);
        assert_eq!(status.remaining, 1);

        tracker.record_view(Some("u1"), "r1").await.unwrap();
        assert_eq!(ledger.len(), 1);

        tracker.record_view(Some("u1"), "r2").await.unwrap();
        assert_eq!(ledger.len(), 2);
        assert!(ledger
            .rows()
            .iter()
            .all(|r| r.week_number == 3 && r.year == 2024));

        let status = tracker.evaluate(Some("u1"), false).await.unwrap();
        assert_eq!(status.viewed_this_week, 2);
        assert!(!status.can_view);
        assert_eq!(status.remaining, 0);
    }

    #[test]
    fn remaining_never_goes_negative() {
        let status = QuotaStatus::from_count(7, 2, false);
        assert_eq!(status.remaining, 0);
        assert!(!status.can_view);
    }
}
