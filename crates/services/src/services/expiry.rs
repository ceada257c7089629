//! Background sweep that resolves expired requests and promotions.
//!
//! Listing queries already exclude actively-expired rows, so the sweep only
//! makes the status column catch up and emits the matching notifications.
//! A failed tick leaves stale rows until the next one; that is tolerated.

use std::time::Duration;

use chrono::Utc;
use db::{
    DBService,
    models::{
        notification::NotificationKind,
        promotion::Promotion,
        request::ServiceRequest,
    },
};
use thiserror::Error;
use tokio::time::interval;
use tracing::{debug, error, info};

use super::notification::NotificationService;

#[derive(Debug, Error)]
pub enum ExpiryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Periodically flips requests past their expiry and promotions past their
/// end to their terminal status.
pub struct RequestExpiryService {
    db: DBService,
    notification_service: NotificationService,
    poll_interval: Duration,
}

impl RequestExpiryService {
    pub async fn spawn(
        db: DBService,
        notification_service: NotificationService,
    ) -> tokio::task::JoinHandle<()> {
        let service = Self {
            db,
            notification_service,
            poll_interval: Duration::from_secs(60),
        };
        tokio::spawn(async move {
            service.start().await;
        })
    }

    async fn start(&self) {
        info!(
            "starting expiry sweep with interval {:?}",
            self.poll_interval
        );
        let mut interval = interval(self.poll_interval);
        loop {
            interval.tick().await;
            if let Err(e) = sweep(&self.db, &self.notification_service).await {
                error!("expiry sweep failed: {}", e);
            }
        }
    }
}

/// One sweep pass. Public so tests and opportunistic callers can resolve
/// expiry without waiting for the background interval.
pub async fn sweep(
    db: &DBService,
    notification_service: &NotificationService,
) -> Result<(), ExpiryError> {
    let now = Utc::now();

    let expired_requests = ServiceRequest::mark_expired_due(&db.pool, now).await?;
    for request in &expired_requests {
        info!(request_id = %request.id, "request expired");
        if let Err(e) = notification_service
            .notify(
                request.customer_id,
                NotificationKind::RequestExpired,
                "Poptávka vypršela",
                &format!("Vaše poptávka '{}' vypršela bez přijaté nabídky.", request.title),
            )
            .await
        {
            error!(request_id = %request.id, "failed to notify owner of expired request: {}", e);
        }
    }

    let expired_promotions = Promotion::mark_expired_due(&db.pool, now).await?;
    for promotion in &expired_promotions {
        info!(promotion_id = %promotion.id, "promotion expired");
        if let Err(e) = notification_service
            .notify(
                promotion.provider_id,
                NotificationKind::PromotionExpired,
                "Propagace skončila",
                "Vaše placená propagace skončila. Profil se opět řadí běžně.",
            )
            .await
        {
            error!(promotion_id = %promotion.id, "failed to notify provider of expired promotion: {}", e);
        }
    }

    if expired_requests.is_empty() && expired_promotions.is_empty() {
        debug!("expiry sweep: nothing due");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;
    use db::models::{
        category::Category,
        request::{CreateServiceRequest, RequestStatus},
        user::{CreateUser, User, UserRole},
    };
    use uuid::Uuid;

    use super::*;

    async fn customer(db: &DBService) -> User {
        User::create(
            &db.pool,
            Uuid::new_v4(),
            &CreateUser {
                email: "karel@example.cz".to_string(),
                password_digest: Some("x$y".to_string()),
                display_name: "Karel".to_string(),
                role: UserRole::Customer,
            },
        )
        .await
        .unwrap()
    }

    async fn request_with_expiry(
        db: &DBService,
        customer_id: Uuid,
        offset_secs: i64,
    ) -> ServiceRequest {
        let category = Category::find_by_slug(&db.pool, "instalater")
            .await
            .unwrap()
            .unwrap();
        ServiceRequest::create(
            &db.pool,
            Uuid::new_v4(),
            customer_id,
            &CreateServiceRequest {
                category_id: category.id,
                title: "Výměna baterie".to_string(),
                description: "Kuchyňská baterie protéká".to_string(),
                city: None,
                images: None,
            },
            Utc::now() + ChronoDuration::seconds(offset_secs),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn sweep_expires_due_requests_and_notifies_owner() {
        let db = DBService::new_in_memory().await.unwrap();
        let notifications = NotificationService::new(db.clone());
        let owner = customer(&db).await;
        let due = request_with_expiry(&db, owner.id, -10).await;
        let fresh = request_with_expiry(&db, owner.id, 3600).await;

        sweep(&db, &notifications).await.unwrap();

        let due = ServiceRequest::find_by_id(&db.pool, due.id).await.unwrap().unwrap();
        assert_eq!(due.status, RequestStatus::Expired);
        let fresh = ServiceRequest::find_by_id(&db.pool, fresh.id).await.unwrap().unwrap();
        assert_eq!(fresh.status, RequestStatus::Active);

        let inbox = db::models::notification::Notification::find_by_user(&db.pool, owner.id, 10)
            .await
            .unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].kind, NotificationKind::RequestExpired);
    }

    #[tokio::test]
    async fn active_listing_never_returns_expired_rows_even_before_sweep() {
        let db = DBService::new_in_memory().await.unwrap();
        let owner = customer(&db).await;
        let _stale = request_with_expiry(&db, owner.id, -10).await;
        let fresh = request_with_expiry(&db, owner.id, 3600).await;

        // No sweep has run: the stale row still has status 'active'.
        let active = ServiceRequest::list_active(&db.pool, Utc::now()).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, fresh.id);
    }
}
