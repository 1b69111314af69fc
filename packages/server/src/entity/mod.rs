pub mod blacklist;
pub mod comment;
pub mod like;
pub mod photo;
pub mod photo_tag;
pub mod photo_transfer;
pub mod tag;
pub mod user;
