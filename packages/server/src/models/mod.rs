pub mod auth;
pub mod comment;
pub mod photo;
pub mod shared;
pub mod tag;
