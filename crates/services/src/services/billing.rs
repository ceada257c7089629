//! Promotion purchases, subscription changes and invoicing.

use chrono::{Duration, Utc};
use db::{
    DBService,
    models::{
        invoice::Invoice,
        promotion::{Promotion, PromotionKind},
        user::{SubscriptionTier, User, UserRole},
    },
};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// CZK per day of promotion.
const SPOTLIGHT_PRICE_PER_DAY: i64 = 99;
const CATEGORY_BOOST_PRICE_PER_DAY: i64 = 49;

/// CZK per month of subscription.
const PREMIUM_MONTHLY_PRICE: i64 = 299;
const BUSINESS_MONTHLY_PRICE: i64 = 799;

const MAX_PROMOTION_DAYS: i64 = 90;
const INVOICE_DUE_DAYS: i64 = 14;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("user not found")]
    UserNotFound,
    #[error("only providers can purchase promotions or subscriptions")]
    NotAProvider,
    #[error("promotion duration must be between 1 and {MAX_PROMOTION_DAYS} days")]
    InvalidDuration,
}

pub fn promotion_price(kind: PromotionKind, days: i64) -> i64 {
    let per_day = match kind {
        PromotionKind::Spotlight => SPOTLIGHT_PRICE_PER_DAY,
        PromotionKind::CategoryBoost => CATEGORY_BOOST_PRICE_PER_DAY,
    };
    per_day * days
}

pub fn subscription_price(tier: SubscriptionTier) -> i64 {
    match tier {
        SubscriptionTier::Free => 0,
        SubscriptionTier::Premium => PREMIUM_MONTHLY_PRICE,
        SubscriptionTier::Business => BUSINESS_MONTHLY_PRICE,
    }
}

#[derive(Clone)]
pub struct BillingService {
    db: DBService,
}

impl BillingService {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }

    /// Buy a time-boxed visibility boost. The promotion and its invoice
    /// commit together.
    pub async fn purchase_promotion(
        &self,
        provider_id: Uuid,
        kind: PromotionKind,
        days: i64,
    ) -> Result<(Promotion, Invoice), BillingError> {
        if !(1..=MAX_PROMOTION_DAYS).contains(&days) {
            return Err(BillingError::InvalidDuration);
        }
        let provider = User::find_by_id(&self.db.pool, provider_id)
            .await?
            .ok_or(BillingError::UserNotFound)?;
        if provider.role != UserRole::Provider {
            return Err(BillingError::NotAProvider);
        }

        let now = Utc::now();
        let mut tx = self.db.pool.begin().await?;
        let number = Invoice::next_number(&mut *tx, now).await?;
        let invoice = Invoice::create(
            &mut *tx,
            Uuid::new_v4(),
            &number,
            provider_id,
            promotion_price(kind, days),
            &format!("Propagace profilu ({kind}), {days} dní"),
            now + Duration::days(INVOICE_DUE_DAYS),
        )
        .await?;
        let promotion = Promotion::create(
            &mut *tx,
            Uuid::new_v4(),
            provider_id,
            kind,
            now + Duration::days(days),
        )
        .await?;
        tx.commit().await?;

        info!(
            provider_id = %provider_id,
            promotion_id = %promotion.id,
            invoice = %invoice.number,
            "promotion purchased"
        );
        Ok((promotion, invoice))
    }

    /// Change a provider's subscription tier. Paid tiers are invoiced for
    /// one month; dropping to free is immediate and free of charge. The
    /// tier change and its invoice commit together, so neither can land
    /// without the other.
    pub async fn change_subscription(
        &self,
        provider_id: Uuid,
        tier: SubscriptionTier,
    ) -> Result<(User, Option<Invoice>), BillingError> {
        let provider = User::find_by_id(&self.db.pool, provider_id)
            .await?
            .ok_or(BillingError::UserNotFound)?;
        if provider.role != UserRole::Provider {
            return Err(BillingError::NotAProvider);
        }

        let price = subscription_price(tier);
        let now = Utc::now();
        let mut tx = self.db.pool.begin().await?;
        let user = User::set_subscription_tier(&mut *tx, provider_id, tier)
            .await?
            .ok_or(BillingError::UserNotFound)?;
        let invoice = if price > 0 {
            let number = Invoice::next_number(&mut *tx, now).await?;
            Some(
                Invoice::create(
                    &mut *tx,
                    Uuid::new_v4(),
                    &number,
                    provider_id,
                    price,
                    &format!("Předplatné {tier}, 1 měsíc"),
                    now + Duration::days(INVOICE_DUE_DAYS),
                )
                .await?,
            )
        } else {
            None
        };
        tx.commit().await?;

        info!(provider_id = %provider_id, tier = %tier, "subscription changed");
        Ok((user, invoice))
    }
}

#[cfg(test)]
mod tests {
    use db::models::user::CreateUser;

    use super::*;

    async fn provider(db: &DBService) -> User {
        User::create(
            &db.pool,
            Uuid::new_v4(),
            &CreateUser {
                email: "fachman@example.cz".to_string(),
                password_digest: Some("x$y".to_string()),
                display_name: "Fachman".to_string(),
                role: UserRole::Provider,
            },
        )
        .await
        .unwrap()
    }

    #[test]
    fn price_table() {
        assert_eq!(promotion_price(PromotionKind::Spotlight, 7), 693);
        assert_eq!(promotion_price(PromotionKind::CategoryBoost, 7), 343);
        assert_eq!(subscription_price(SubscriptionTier::Free), 0);
        assert!(subscription_price(SubscriptionTier::Business) > subscription_price(SubscriptionTier::Premium));
    }

    #[tokio::test]
    async fn purchase_creates_active_promotion_and_invoice() {
        let db = DBService::new_in_memory().await.unwrap();
        let provider = provider(&db).await;
        let billing = BillingService::new(db.clone());

        let (promotion, invoice) = billing
            .purchase_promotion(provider.id, PromotionKind::Spotlight, 7)
            .await
            .unwrap();

        assert!(promotion.ends_at > Utc::now());
        assert_eq!(invoice.amount_czk, 693);
        assert!(invoice.number.starts_with(&format!("{}-", Utc::now().format("%Y"))));

        let active = Promotion::find_active_for(&db.pool, provider.id, Utc::now())
            .await
            .unwrap();
        assert!(active.is_some());
    }

    #[tokio::test]
    async fn invoice_numbers_are_sequential() {
        let db = DBService::new_in_memory().await.unwrap();
        let provider = provider(&db).await;
        let billing = BillingService::new(db.clone());
        let (_, first) = billing
            .purchase_promotion(provider.id, PromotionKind::Spotlight, 1)
            .await
            .unwrap();
        let (_, second) = billing
            .purchase_promotion(provider.id, PromotionKind::CategoryBoost, 1)
            .await
            .unwrap();
        assert!(second.number > first.number);
    }

    #[tokio::test]
    async fn upgrade_is_invoiced_downgrade_is_free() {
        let db = DBService::new_in_memory().await.unwrap();
        let provider = provider(&db).await;
        let billing = BillingService::new(db.clone());

        let (user, invoice) = billing
            .change_subscription(provider.id, SubscriptionTier::Premium)
            .await
            .unwrap();
        assert_eq!(user.subscription_tier, SubscriptionTier::Premium);
        assert_eq!(invoice.unwrap().amount_czk, PREMIUM_MONTHLY_PRICE);

        let (user, invoice) = billing
            .change_subscription(provider.id, SubscriptionTier::Free)
            .await
            .unwrap();
        assert_eq!(user.subscription_tier, SubscriptionTier::Free);
        assert!(invoice.is_none());
    }

    #[tokio::test]
    async fn failed_invoice_rolls_back_the_tier_change() {
        use chrono::Datelike;

        let db = DBService::new_in_memory().await.unwrap();
        let provider = provider(&db).await;
        let billing = BillingService::new(db.clone());

        // Occupy the number the next allocation will pick, so the invoice
        // insert inside change_subscription hits the UNIQUE constraint.
        let now = Utc::now();
        Invoice::create(
            &db.pool,
            Uuid::new_v4(),
            &format!("{}-000002", now.year()),
            provider.id,
            1,
            "kolize",
            now,
        )
        .await
        .unwrap();

        let err = billing
            .change_subscription(provider.id, SubscriptionTier::Premium)
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::Database(_)));

        // The tier change must not survive the failed invoice.
        let user = User::find_by_id(&db.pool, provider.id).await.unwrap().unwrap();
        assert_eq!(user.subscription_tier, SubscriptionTier::Free);
    }

    #[tokio::test]
    async fn invalid_duration_is_rejected() {
        let db = DBService::new_in_memory().await.unwrap();
        let provider = provider(&db).await;
        let billing = BillingService::new(db.clone());
        assert!(matches!(
            billing.purchase_promotion(provider.id, PromotionKind::Spotlight, 0).await,
            Err(BillingError::InvalidDuration)
        ));
        assert!(matches!(
            billing.purchase_promotion(provider.id, PromotionKind::Spotlight, 91).await,
            Err(BillingError::InvalidDuration)
        ));
    }
}
