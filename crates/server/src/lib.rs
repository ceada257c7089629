pub mod auth;
pub mod error;
pub mod routes;

use db::DBService;
use services::services::{
    auth::AuthService,
    billing::BillingService,
    notification::NotificationService,
    offers::OfferService,
};

/// Shared handler state. Every service is cheap to clone; they all hold
/// the same pool underneath.
#[derive(Clone)]
pub struct AppState {
    pub db: DBService,
    pub auth: AuthService,
    pub offers: OfferService,
    pub billing: BillingService,
    pub notifications: NotificationService,
    pub jwt_secret: String,
}

impl AppState {
    pub fn new(db: DBService, jwt_secret: String) -> Self {
        let notifications = NotificationService::new(db.clone());
        Self {
            auth: AuthService::new(db.clone(), jwt_secret.clone()),
            offers: OfferService::new(db.clone(), notifications.clone()),
            billing: BillingService::new(db.clone()),
            notifications,
            jwt_secret,
            db,
        }
    }
}
