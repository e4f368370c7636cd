//! 认证：Authorization 头解析、JWT 签发验证、请求者提取器

mod extract;
mod header;
mod token;

pub use extract::{AuthUser, MaybeUser, RefreshUser};
pub use header::{BasicCredentials, parse_basic, parse_bearer};
pub use token::{Claims, Role, TokenService, TokenType};
