pub mod auth;
pub mod health;
pub mod mood;
pub mod sleep;
pub mod users;
