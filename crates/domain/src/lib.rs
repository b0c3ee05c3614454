//! Domain policies, keys and invariants for admission control and caching.

#![forbid(unsafe_code)]

mod cache;
mod key_pattern;
mod rate_limit;

pub use cache::{
    CACHE_INDEX_REGISTRY_KEY, CacheKey, CacheNamespace, CacheTier, key_namespace,
    namespace_index_key,
};
pub use key_pattern::KeyPattern;
pub use rate_limit::{
    DEFAULT_RATE_LIMIT_MESSAGE, RateLimitAction, RateLimitConfig, RateLimitKey, RateLimitResult,
};
