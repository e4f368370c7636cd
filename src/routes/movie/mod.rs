mod handler;
mod like;
mod model;

pub use handler::{create, dislike, find_all, find_one, find_recent, like, remove, update};
pub use like::{LikeAction, LikeStatus, toggle_like};
pub use model::{CreateMovieRequest, Movie, MovieView, SORT_COLUMNS, UpdateMovieRequest};
