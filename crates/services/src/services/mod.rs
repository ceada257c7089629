pub mod auth;
pub mod billing;
pub mod expiry;
pub mod notification;
pub mod offers;
pub mod quota;
pub mod ranking;
