//! Offer submission and the accept/withdraw lifecycle.

use chrono::Utc;
use db::{
    DBService,
    models::{
        notification::NotificationKind,
        offer::{CreateOffer, Offer, OfferStatus},
        request::{RequestStatus, ServiceRequest},
        settings::AppSettings,
        user::{User, UserRole},
    },
};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::{notification::NotificationService, quota};

#[derive(Debug, Error)]
pub enum OfferError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("request not found")]
    RequestNotFound,
    #[error("offer not found")]
    OfferNotFound,
    #[error("request is no longer accepting offers")]
    RequestNotActive,
    #[error("an offer for this request already exists")]
    AlreadyOffered,
    #[error("monthly free offer quota exhausted")]
    QuotaExceeded,
    #[error("only providers can submit offers")]
    NotAProvider,
    #[error("not allowed to act on this offer")]
    Forbidden,
    #[error("offer is not pending")]
    NotPending,
}

#[derive(Clone)]
pub struct OfferService {
    db: DBService,
    notification_service: NotificationService,
}

impl OfferService {
    pub fn new(db: DBService, notification_service: NotificationService) -> Self {
        Self {
            db,
            notification_service,
        }
    }

    /// Submit an offer against an active request.
    ///
    /// The quota period reset and the counter increment run in the same
    /// transaction as the offer insert. The increment is a conditional
    /// UPDATE, so two concurrent submissions from the same free-tier
    /// provider cannot both slip under the limit.
    pub async fn submit(
        &self,
        provider_id: Uuid,
        request_id: Uuid,
        data: &CreateOffer,
    ) -> Result<Offer, OfferError> {
        let now = Utc::now();

        let provider = User::find_by_id(&self.db.pool, provider_id)
            .await?
            .ok_or(OfferError::Forbidden)?;
        if provider.role != UserRole::Provider {
            return Err(OfferError::NotAProvider);
        }

        let request = ServiceRequest::find_by_id(&self.db.pool, request_id)
            .await?
            .ok_or(OfferError::RequestNotFound)?;
        // An expiry timestamp that has passed counts as non-active even if
        // the sweep has not flipped the row yet.
        if !request.is_active(now) {
            return Err(OfferError::RequestNotActive);
        }

        if Offer::exists_for(&self.db.pool, request_id, provider_id).await? {
            return Err(OfferError::AlreadyOffered);
        }

        let settings = AppSettings::get(&self.db.pool).await?;

        let mut tx = self.db.pool.begin().await?;
        User::reset_offer_period_if_due(&mut *tx, provider_id, quota::month_start(now)).await?;
        let updated =
            User::try_increment_offer_count(&mut *tx, provider_id, settings.free_offers_per_month)
                .await?;
        if updated == 0 {
            tx.rollback().await?;
            return Err(OfferError::QuotaExceeded);
        }
        let offer = Offer::create(&mut *tx, Uuid::new_v4(), request_id, provider_id, data)
            .await
            .map_err(|e| {
                if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
                    OfferError::AlreadyOffered
                } else {
                    OfferError::Database(e)
                }
            })?;
        tx.commit().await?;

        info!(offer_id = %offer.id, request_id = %request_id, provider_id = %provider_id, "offer submitted");

        if let Err(e) = self
            .notification_service
            .notify(
                request.customer_id,
                NotificationKind::NewOffer,
                "Nová nabídka",
                &format!(
                    "{} nabízí {} Kč na vaši poptávku '{}'.",
                    provider.display_name, data.price_czk, request.title
                ),
            )
            .await
        {
            warn!(offer_id = %offer.id, "failed to notify customer of new offer: {}", e);
        }

        Ok(offer)
    }

    /// Accept an offer: the offer becomes accepted, pending siblings are
    /// rejected, and the request moves to `assigned`. Only the request's
    /// owner may accept.
    pub async fn accept(&self, customer_id: Uuid, offer_id: Uuid) -> Result<Offer, OfferError> {
        let offer = Offer::find_by_id(&self.db.pool, offer_id)
            .await?
            .ok_or(OfferError::OfferNotFound)?;
        let request = ServiceRequest::find_by_id(&self.db.pool, offer.request_id)
            .await?
            .ok_or(OfferError::RequestNotFound)?;
        if request.customer_id != customer_id {
            return Err(OfferError::Forbidden);
        }
        if !request.is_active(Utc::now()) {
            return Err(OfferError::RequestNotActive);
        }
        if offer.status != OfferStatus::Pending {
            return Err(OfferError::NotPending);
        }

        let mut tx = self.db.pool.begin().await?;
        Offer::update_status(&mut *tx, offer.id, OfferStatus::Accepted).await?;
        let rejected = Offer::reject_siblings(&mut *tx, request.id, offer.id).await?;
        ServiceRequest::update_status(&mut *tx, request.id, RequestStatus::Assigned).await?;
        tx.commit().await?;

        info!(offer_id = %offer.id, request_id = %request.id, "offer accepted");

        if let Err(e) = self
            .notification_service
            .notify(
                offer.provider_id,
                NotificationKind::OfferAccepted,
                "Nabídka přijata",
                &format!("Vaše nabídka na '{}' byla přijata.", request.title),
            )
            .await
        {
            warn!(offer_id = %offer.id, "failed to notify accepted provider: {}", e);
        }
        for sibling in &rejected {
            if let Err(e) = self
                .notification_service
                .notify(
                    sibling.provider_id,
                    NotificationKind::OfferRejected,
                    "Nabídka odmítnuta",
                    &format!("Zákazník vybral jinou nabídku na '{}'.", request.title),
                )
                .await
            {
                warn!(offer_id = %sibling.id, "failed to notify rejected provider: {}", e);
            }
        }

        Offer::find_by_id(&self.db.pool, offer.id)
            .await?
            .ok_or(OfferError::OfferNotFound)
    }

    /// Withdraw a pending offer. Only the offering provider may withdraw.
    pub async fn withdraw(&self, provider_id: Uuid, offer_id: Uuid) -> Result<Offer, OfferError> {
        let offer = Offer::find_by_id(&self.db.pool, offer_id)
            .await?
            .ok_or(OfferError::OfferNotFound)?;
        if offer.provider_id != provider_id {
            return Err(OfferError::Forbidden);
        }
        if offer.status != OfferStatus::Pending {
            return Err(OfferError::NotPending);
        }
        Offer::update_status(&self.db.pool, offer.id, OfferStatus::Withdrawn).await?;
        Offer::find_by_id(&self.db.pool, offer.id)
            .await?
            .ok_or(OfferError::OfferNotFound)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use db::models::{
        category::Category,
        settings::UpdateAppSettings,
        user::{CreateUser, SubscriptionTier},
    };

    use super::*;

    struct Fixture {
        db: DBService,
        service: OfferService,
        customer: User,
        provider: User,
        request: ServiceRequest,
    }

    async fn user(db: &DBService, email: &str, role: UserRole) -> User {
        User::create(
            &db.pool,
            Uuid::new_v4(),
            &CreateUser {
                email: email.to_string(),
                password_digest: Some("x$y".to_string()),
                display_name: email.split('@').next().unwrap().to_string(),
                role,
            },
        )
        .await
        .unwrap()
    }

    async fn fixture() -> Fixture {
        let db = DBService::new_in_memory().await.unwrap();
        let notifications = NotificationService::new(db.clone());
        let service = OfferService::new(db.clone(), notifications);
        let customer = user(&db, "zakaznik@example.cz", UserRole::Customer).await;
        let provider = user(&db, "fachman@example.cz", UserRole::Provider).await;
        let category = Category::find_by_slug(&db.pool, "elektrikar")
            .await
            .unwrap()
            .unwrap();
        let request = ServiceRequest::create(
            &db.pool,
            Uuid::new_v4(),
            customer.id,
            &db::models::request::CreateServiceRequest {
                category_id: category.id,
                title: "Nová zásuvka".to_string(),
                description: "Přidat zásuvku v obýváku".to_string(),
                city: None,
                images: None,
            },
            Utc::now() + Duration::days(30),
        )
        .await
        .unwrap();
        Fixture {
            db,
            service,
            customer,
            provider,
            request,
        }
    }

    fn offer_data(price: i64) -> CreateOffer {
        CreateOffer {
            price_czk: price,
            message: "Mohu přijít zítra.".to_string(),
        }
    }

    #[tokio::test]
    async fn submit_increments_counter_exactly_once() {
        let f = fixture().await;
        f.service
            .submit(f.provider.id, f.request.id, &offer_data(1500))
            .await
            .unwrap();
        let provider = User::find_by_id(&f.db.pool, f.provider.id).await.unwrap().unwrap();
        assert_eq!(provider.free_offers_used, 1);
    }

    #[tokio::test]
    async fn free_tier_hits_the_monthly_limit() {
        let f = fixture().await;
        // Three requests, three offers; the default limit is 3.
        let category = Category::find_by_slug(&f.db.pool, "elektrikar")
            .await
            .unwrap()
            .unwrap();
        for i in 0..3 {
            let request = ServiceRequest::create(
                &f.db.pool,
                Uuid::new_v4(),
                f.customer.id,
                &db::models::request::CreateServiceRequest {
                    category_id: category.id,
                    title: format!("Práce {i}"),
                    description: "...".to_string(),
                    city: None,
                    images: None,
                },
                Utc::now() + Duration::days(30),
            )
            .await
            .unwrap();
            f.service
                .submit(f.provider.id, request.id, &offer_data(100))
                .await
                .unwrap();
        }
        let err = f
            .service
            .submit(f.provider.id, f.request.id, &offer_data(100))
            .await
            .unwrap_err();
        assert!(matches!(err, OfferError::QuotaExceeded));
    }

    #[tokio::test]
    async fn paid_tier_is_never_limited() {
        let f = fixture().await;
        User::set_subscription_tier(&f.db.pool, f.provider.id, SubscriptionTier::Premium)
            .await
            .unwrap();
        // Shrink the limit to zero; a paid tier must still pass.
        db::models::settings::AppSettings::update(
            &f.db.pool,
            &UpdateAppSettings {
                free_offers_per_month: 0,
                request_expiry_days: 30,
                max_images_per_request: 5,
            },
        )
        .await
        .unwrap();
        f.service
            .submit(f.provider.id, f.request.id, &offer_data(900))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn duplicate_offer_is_rejected() {
        let f = fixture().await;
        f.service
            .submit(f.provider.id, f.request.id, &offer_data(100))
            .await
            .unwrap();
        let err = f
            .service
            .submit(f.provider.id, f.request.id, &offer_data(200))
            .await
            .unwrap_err();
        assert!(matches!(err, OfferError::AlreadyOffered));
    }

    #[tokio::test]
    async fn expired_request_rejects_offers_before_any_sweep() {
        let f = fixture().await;
        let category = Category::find_by_slug(&f.db.pool, "elektrikar")
            .await
            .unwrap()
            .unwrap();
        let stale = ServiceRequest::create(
            &f.db.pool,
            Uuid::new_v4(),
            f.customer.id,
            &db::models::request::CreateServiceRequest {
                category_id: category.id,
                title: "Stará poptávka".to_string(),
                description: "...".to_string(),
                city: None,
                images: None,
            },
            Utc::now() - Duration::seconds(1),
        )
        .await
        .unwrap();
        let err = f
            .service
            .submit(f.provider.id, stale.id, &offer_data(100))
            .await
            .unwrap_err();
        assert!(matches!(err, OfferError::RequestNotActive));
        // The failed attempt must not consume quota.
        let provider = User::find_by_id(&f.db.pool, f.provider.id).await.unwrap().unwrap();
        assert_eq!(provider.free_offers_used, 0);
    }

    #[tokio::test]
    async fn accept_rejects_siblings_and_assigns_request() {
        let f = fixture().await;
        let rival = user(&f.db, "rival@example.cz", UserRole::Provider).await;
        let mine = f
            .service
            .submit(f.provider.id, f.request.id, &offer_data(1000))
            .await
            .unwrap();
        let other = f
            .service
            .submit(rival.id, f.request.id, &offer_data(1200))
            .await
            .unwrap();

        let accepted = f.service.accept(f.customer.id, mine.id).await.unwrap();
        assert_eq!(accepted.status, OfferStatus::Accepted);

        let other = Offer::find_by_id(&f.db.pool, other.id).await.unwrap().unwrap();
        assert_eq!(other.status, OfferStatus::Rejected);

        let request = ServiceRequest::find_by_id(&f.db.pool, f.request.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.status, RequestStatus::Assigned);
    }

    #[tokio::test]
    async fn only_the_owner_may_accept() {
        let f = fixture().await;
        let offer = f
            .service
            .submit(f.provider.id, f.request.id, &offer_data(1000))
            .await
            .unwrap();
        let err = f.service.accept(f.provider.id, offer.id).await.unwrap_err();
        assert!(matches!(err, OfferError::Forbidden));
    }

    #[tokio::test]
    async fn withdraw_only_own_pending_offers() {
        let f = fixture().await;
        let offer = f
            .service
            .submit(f.provider.id, f.request.id, &offer_data(1000))
            .await
            .unwrap();
        let err = f.service.withdraw(Uuid::new_v4(), offer.id).await.unwrap_err();
        assert!(matches!(err, OfferError::Forbidden));
        let withdrawn = f.service.withdraw(f.provider.id, offer.id).await.unwrap();
        assert_eq!(withdrawn.status, OfferStatus::Withdrawn);
    }

    #[tokio::test]
    async fn period_rollover_resets_the_counter() {
        let f = fixture().await;
        // Backdate the provider's period to last month with a spent quota.
        sqlx::query(
            "UPDATE users SET free_offers_used = 3,
                 offer_period_start = datetime('now', '-2 months')
             WHERE id = $1",
        )
        .bind(f.provider.id)
        .execute(&f.db.pool)
        .await
        .unwrap();

        f.service
            .submit(f.provider.id, f.request.id, &offer_data(100))
            .await
            .unwrap();
        let provider = User::find_by_id(&f.db.pool, f.provider.id).await.unwrap().unwrap();
        assert_eq!(provider.free_offers_used, 1);
    }
}
