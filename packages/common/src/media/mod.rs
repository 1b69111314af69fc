mod cloudinary;
mod error;
mod traits;

pub use cloudinary::{CloudinaryClient, CloudinaryConfig};
pub use error::MediaError;
pub use traits::{MediaHost, Transform, UploadedImage};
