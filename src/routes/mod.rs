pub mod auth;
pub mod common;
pub mod director;
pub mod genre;
pub mod movie;
pub mod user;
