pub mod cache;
pub mod health;
pub mod rate_limits;
