/// 缓存操作
pub mod movie;
pub mod throttle;
pub mod token;

pub use movie::{MOVIE_RECENT_TTL, MovieCacheOperations};
pub use throttle::{THROTTLE_WINDOW, ThrottleCacheOperations};
pub use token::TokenCacheOperations;
