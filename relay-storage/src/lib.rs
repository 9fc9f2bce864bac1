//! Transit Relay Storage - In-Memory Expiring State
//!
//! The on-demand lookup path keeps two pieces of short-lived state: answers
//! that may be served again until they expire, and the times of recent real
//! fetches. Both are purged lazily; nothing here runs in the background.
//!
//! Neither type is synchronized. Services wrap each one in its own mutex.

pub mod cache;
pub mod limiter;

pub use cache::{CacheEntry, TtlCache};
pub use limiter::SlidingWindowRateLimiter;
