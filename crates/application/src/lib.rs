//! Application services and ports.

#![forbid(unsafe_code)]

mod cache_service;
mod key_store_ports;
mod rate_limit_service;
mod subject_cache;

#[cfg(test)]
mod test_support;

pub use cache_service::CacheService;
pub use key_store_ports::{KeyStore, KeyTtl};
pub use rate_limit_service::RateLimitService;
pub use subject_cache::{DatedSubjectCache, SubjectCache};
