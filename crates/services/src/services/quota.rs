//! Monthly free-offer quota rules.
//!
//! Quota is scoped to the current calendar month, determined at check time
//! against a stored period start. The actual increment is a conditional
//! UPDATE in the database (see `User::try_increment_offer_count`) so the
//! check-then-increment pair cannot race; the functions here hold the pure
//! rules and the period arithmetic.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use db::models::user::SubscriptionTier;

/// Whether a provider may submit a new offer. Paid tiers are never limited;
/// free-tier providers are capped at `monthly_limit` per calendar month.
pub fn can_submit_offer(
    tier: SubscriptionTier,
    current_month_count: i64,
    monthly_limit: i64,
) -> bool {
    if tier != SubscriptionTier::Free {
        return true;
    }
    current_month_count < monthly_limit
}

/// First instant of the calendar month containing `now`, in UTC.
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .expect("first day of month is always a valid timestamp")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_tier_boundary() {
        assert!(can_submit_offer(SubscriptionTier::Free, 2, 3));
        assert!(!can_submit_offer(SubscriptionTier::Free, 3, 3));
        assert!(!can_submit_offer(SubscriptionTier::Free, 4, 3));
    }

    #[test]
    fn paid_tiers_are_unlimited() {
        assert!(can_submit_offer(SubscriptionTier::Premium, 999, 3));
        assert!(can_submit_offer(SubscriptionTier::Business, 999, 3));
    }

    #[test]
    fn month_start_truncates_to_first_instant() {
        let now = Utc.with_ymd_and_hms(2026, 8, 29, 13, 45, 12).unwrap();
        let start = month_start(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn month_start_is_idempotent_at_the_boundary() {
        let first = Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap();
        assert_eq!(month_start(first), first);
    }
}
