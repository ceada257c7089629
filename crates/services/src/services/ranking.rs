//! Read-side projection and ordering of provider listings.
//!
//! A listing is never persisted: it is recomputed on every read from the
//! underlying user, profile, review and promotion rows. Promotion expiry is
//! resolved here during assembly; the sort itself performs no time-based
//! logic and cannot fail.

use chrono::{DateTime, Utc};
use db::models::{
    promotion::PromotionKind,
    provider::ProviderListingRow,
    user::SubscriptionTier,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Composed provider record as displayed in category listings.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ProviderListing {
    pub id: Uuid,
    pub display_name: String,
    pub headline: Option<String>,
    pub city: Option<String>,
    pub verified: bool,
    pub subscription_tier: SubscriptionTier,
    /// Average review rating, 0 with no reviews.
    pub rating: f64,
    pub review_count: i64,
    pub is_seed: bool,
    /// Present only while a promotion is active at assembly time.
    pub promotion: Option<PromotionKind>,
}

impl ProviderListing {
    /// Assemble the displayed record from a raw listing row. A promotion
    /// whose end has already passed at `now` is treated as absent.
    pub fn assemble(row: ProviderListingRow, now: DateTime<Utc>) -> Self {
        let promotion = match (row.promotion_kind, row.promotion_ends_at) {
            (Some(kind), Some(ends_at)) if ends_at > now => Some(kind),
            _ => None,
        };
        Self {
            id: row.id,
            display_name: row.display_name,
            headline: row.headline,
            city: row.city,
            verified: row.verified,
            subscription_tier: row.subscription_tier,
            rating: row.rating,
            review_count: row.review_count,
            is_seed: row.is_seed.unwrap_or(false),
            promotion,
        }
    }
}

/// Sort listings for display: promoted first, then subscription tier
/// weight, then verified, then rating, all descending. The sort is stable
/// so equal keys keep their incoming order and repeated calls with
/// unchanged input paginate consistently.
pub fn rank_providers(listings: &mut [ProviderListing]) {
    listings.sort_by(|a, b| {
        b.promotion
            .is_some()
            .cmp(&a.promotion.is_some())
            .then_with(|| {
                b.subscription_tier
                    .weight()
                    .cmp(&a.subscription_tier.weight())
            })
            .then_with(|| b.verified.cmp(&a.verified))
            .then_with(|| b.rating.total_cmp(&a.rating))
    });
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn listing(
        name: &str,
        promotion: Option<PromotionKind>,
        tier: SubscriptionTier,
        verified: bool,
        rating: f64,
    ) -> ProviderListing {
        ProviderListing {
            id: Uuid::new_v4(),
            display_name: name.to_string(),
            headline: None,
            city: None,
            verified,
            subscription_tier: tier,
            rating,
            review_count: 0,
            is_seed: false,
            promotion,
        }
    }

    fn names(listings: &[ProviderListing]) -> Vec<&str> {
        listings.iter().map(|l| l.display_name.as_str()).collect()
    }

    #[test]
    fn empty_input_stays_empty() {
        let mut listings: Vec<ProviderListing> = Vec::new();
        rank_providers(&mut listings);
        assert!(listings.is_empty());
    }

    #[test]
    fn promotion_dominates_everything_else() {
        let mut listings = vec![
            listing("verified-top", None, SubscriptionTier::Business, true, 5.0),
            listing(
                "promoted-low",
                Some(PromotionKind::Spotlight),
                SubscriptionTier::Free,
                false,
                1.0,
            ),
        ];
        rank_providers(&mut listings);
        assert_eq!(names(&listings), vec!["promoted-low", "verified-top"]);
    }

    #[test]
    fn tier_dominates_given_equal_promotion() {
        let mut listings = vec![
            listing("free", None, SubscriptionTier::Free, true, 5.0),
            listing("premium", None, SubscriptionTier::Premium, false, 1.0),
            listing("business", None, SubscriptionTier::Business, false, 0.0),
        ];
        rank_providers(&mut listings);
        assert_eq!(names(&listings), vec!["business", "premium", "free"]);
    }

    #[test]
    fn verified_breaks_tier_ties() {
        let mut listings = vec![
            listing("unverified", None, SubscriptionTier::Premium, false, 5.0),
            listing("verified", None, SubscriptionTier::Premium, true, 1.0),
        ];
        rank_providers(&mut listings);
        assert_eq!(names(&listings), vec!["verified", "unverified"]);
    }

    #[test]
    fn rating_is_the_final_tiebreak() {
        let mut listings = vec![
            listing("low", None, SubscriptionTier::Free, true, 2.5),
            listing("high", None, SubscriptionTier::Free, true, 4.5),
        ];
        rank_providers(&mut listings);
        assert_eq!(names(&listings), vec!["high", "low"]);
    }

    #[test]
    fn equal_keys_keep_their_incoming_order() {
        let mut listings = vec![
            listing("first", None, SubscriptionTier::Free, true, 4.0),
            listing("second", None, SubscriptionTier::Free, true, 4.0),
            listing("third", None, SubscriptionTier::Free, true, 4.0),
        ];
        rank_providers(&mut listings);
        assert_eq!(names(&listings), vec!["first", "second", "third"]);
    }

    #[test]
    fn all_equal_input_is_unchanged() {
        let mut listings = vec![
            listing("a", None, SubscriptionTier::Free, false, 0.0),
            listing("b", None, SubscriptionTier::Free, false, 0.0),
        ];
        rank_providers(&mut listings);
        assert_eq!(names(&listings), vec!["a", "b"]);
    }

    #[test]
    fn promoted_free_unverified_ranks_above_unpromoted_verified() {
        // End-to-end ordering scenario from the product rules.
        let mut listings = vec![
            listing("organic", None, SubscriptionTier::Free, true, 4.8),
            listing(
                "promoted",
                Some(PromotionKind::CategoryBoost),
                SubscriptionTier::Free,
                false,
                1.0,
            ),
        ];
        rank_providers(&mut listings);
        assert_eq!(names(&listings), vec!["promoted", "organic"]);
    }

    #[test]
    fn assembly_drops_expired_promotions() {
        let now = Utc::now();
        let row = ProviderListingRow {
            id: Uuid::new_v4(),
            display_name: "Jan Novák".to_string(),
            verified: false,
            subscription_tier: SubscriptionTier::Free,
            headline: None,
            city: None,
            is_seed: None,
            rating: 0.0,
            review_count: 0,
            promotion_kind: Some(PromotionKind::Spotlight),
            promotion_ends_at: Some(now - Duration::seconds(1)),
        };
        let assembled = ProviderListing::assemble(row, now);
        assert!(assembled.promotion.is_none());
    }

    #[test]
    fn assembly_keeps_running_promotions() {
        let now = Utc::now();
        let row = ProviderListingRow {
            id: Uuid::new_v4(),
            display_name: "Petr Svoboda".to_string(),
            verified: true,
            subscription_tier: SubscriptionTier::Premium,
            headline: Some("Elektro práce".to_string()),
            city: Some("Brno".to_string()),
            is_seed: Some(false),
            rating: 4.2,
            review_count: 7,
            promotion_kind: Some(PromotionKind::Spotlight),
            promotion_ends_at: Some(now + Duration::days(3)),
        };
        let assembled = ProviderListing::assemble(row, now);
        assert_eq!(assembled.promotion, Some(PromotionKind::Spotlight));
    }
}
