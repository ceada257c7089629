pub mod category;
pub mod invoice;
pub mod notification;
pub mod offer;
pub mod post;
pub mod promotion;
pub mod provider;
pub mod request;
pub mod review;
pub mod settings;
pub mod user;
