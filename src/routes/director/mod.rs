mod handler;
mod model;

pub use handler::{create, find_all, find_one, remove, update};
pub use model::{CreateDirectorRequest, Director};
