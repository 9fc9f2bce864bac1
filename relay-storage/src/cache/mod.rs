//! Expiring key/value cache.
//!
//! Entries carry an absolute expiry computed when they are saved. Expired
//! entries are never returned, and are dropped either when a read trips over
//! one or when the next write sweeps the map.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use relay_core::ManualClock;
//! use relay_storage::TtlCache;
//!
//! let clock = Arc::new(ManualClock::at_epoch());
//! let mut cache = TtlCache::new(Duration::from_secs(1), clock.clone());
//! cache.save("a".to_string(), 1);
//!
//! clock.set_millis(999);
//! assert_eq!(cache.get("a"), Some(1));
//!
//! clock.set_millis(1001);
//! assert_eq!(cache.get("a"), None);
//! ```

pub mod ttl;

pub use ttl::{CacheEntry, TtlCache};
