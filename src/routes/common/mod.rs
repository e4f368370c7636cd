mod handler;

pub use handler::{UploadResponse, upload_video};
