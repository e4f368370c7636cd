mod handler;
mod model;

pub use handler::{block_token, login, private, register, rotate_access_token};
