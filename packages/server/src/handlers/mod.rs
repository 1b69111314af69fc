pub mod auth;
pub mod comment;
pub mod photo;
pub mod tag;
pub mod user;
