mod auth;
mod error_handler;
mod rate_limit;

pub use auth::bearer_token_middleware;
pub use error_handler::log_requests;
pub use rate_limit::{Throttle, throttle};
