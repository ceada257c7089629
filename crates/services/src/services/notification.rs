//! Persists notifications and fans them out to connected clients.
//!
//! Delivery is push-based and best-effort: a lagging subscriber drops
//! events, and ordering across concurrent inserts is not guaranteed. The
//! database row is the durable record; the broadcast is only a hint to
//! refresh.

use db::{
    DBService,
    models::notification::{Notification, NotificationKind},
};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct NotificationService {
    db: DBService,
    sender: broadcast::Sender<Notification>,
}

impl NotificationService {
    pub fn new(db: DBService) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { db, sender }
    }

    /// Persist a notification, then broadcast it. A failed broadcast (no
    /// subscribers) is not an error.
    pub async fn notify(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        title: &str,
        body: &str,
    ) -> Result<Notification, sqlx::Error> {
        let notification =
            Notification::create(&self.db.pool, user_id, kind, title, body).await?;
        debug!(
            user_id = %user_id,
            kind = %kind,
            "notification created"
        );
        let _ = self.sender.send(notification.clone());
        Ok(notification)
    }

    /// Subscribe to the live stream. Callers filter by user id.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use db::models::user::{CreateUser, User, UserRole};

    use super::*;

    async fn test_user(db: &DBService) -> User {
        User::create(
            &db.pool,
            Uuid::new_v4(),
            &CreateUser {
                email: "zakaznik@example.cz".to_string(),
                password_digest: Some("x$y".to_string()),
                display_name: "Zákazník".to_string(),
                role: UserRole::Customer,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn notify_persists_and_broadcasts() {
        let db = DBService::new_in_memory().await.unwrap();
        let user = test_user(&db).await;
        let service = NotificationService::new(db.clone());
        let mut rx = service.subscribe();

        let created = service
            .notify(user.id, NotificationKind::System, "Vítejte", "Účet byl založen")
            .await
            .unwrap();

        let pushed = rx.recv().await.unwrap();
        assert_eq!(pushed.id, created.id);
        assert_eq!(pushed.user_id, user.id);
        assert!(!pushed.read);

        let stored = Notification::find_by_user(&db.pool, user.id, 10).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].kind, NotificationKind::System);
    }

    #[tokio::test]
    async fn mark_read_is_scoped_to_the_owner() {
        let db = DBService::new_in_memory().await.unwrap();
        let user = test_user(&db).await;
        let service = NotificationService::new(db.clone());
        let created = service
            .notify(user.id, NotificationKind::NewOffer, "Nová nabídka", "...")
            .await
            .unwrap();

        let foreign = Notification::mark_read(&db.pool, created.id, Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(foreign, 0);

        let own = Notification::mark_read(&db.pool, created.id, user.id).await.unwrap();
        assert_eq!(own, 1);
        assert_eq!(Notification::unread_count(&db.pool, user.id).await.unwrap(), 0);
    }
}
