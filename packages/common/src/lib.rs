pub mod mail;
pub mod media;
