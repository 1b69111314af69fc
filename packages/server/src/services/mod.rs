pub mod rating;
pub mod search;
pub mod tag;
