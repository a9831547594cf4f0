pub mod credential;
pub mod image;
pub mod message;
pub mod user;

pub use credential::Credential;
pub use image::{ImageRecord, ImageResponse, RemoteImage};
pub use message::{validate_payload_name, PayloadEncoding, UploadIntentMessage};
pub use user::User;
