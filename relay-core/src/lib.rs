//! Transit Relay Core - Shared Types
//!
//! Data types, clocks, collaborator traits and the error taxonomy shared by
//! every crate in the workspace. Nothing in here performs I/O.

pub mod clock;
pub mod config;
pub mod error;
pub mod health;
pub mod source;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::{
    OnDemandConfig, PollingConfig, DEAD_AFTER_LIFECYCLES, DEFAULT_OUTCOME_CAPACITY, FLAKY_WINDOW,
    STALE_AFTER_LIFECYCLES,
};
pub use error::{ConfigError, FetchError, RelayError, RelayResult, SourceError};
pub use health::{OnDemandHealth, Outcome, PollHealth};
pub use source::{Answer, DataSource, DetailsFetcher};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Opaque digest of a downloaded artifact.
///
/// Engines only ever compare fingerprints for equality; how one is produced
/// is up to the data source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap an already computed digest.
    pub fn new(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    /// Fingerprint raw content with SHA-256, hex encoded.
    pub fn of_content(content: &[u8]) -> Self {
        Self(hex::encode(compute_content_hash(content)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Convert a std duration to a chrono one, saturating at the maximum span.
pub fn to_chrono_duration(duration: std::time::Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

/// Compute SHA-256 hash of content.
pub fn compute_content_hash(content: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_sha256_hex() {
        let fp = Fingerprint::of_content(b"abc");
        assert_eq!(
            fp.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_fingerprint_equality_tracks_content() {
        assert_eq!(
            Fingerprint::of_content(b"{\"a\":1}"),
            Fingerprint::of_content(b"{\"a\":1}")
        );
        assert_ne!(
            Fingerprint::of_content(b"{\"a\":1}"),
            Fingerprint::of_content(b"{\"a\":2}")
        );
    }

    #[test]
    fn test_to_chrono_duration_saturates() {
        assert_eq!(
            to_chrono_duration(std::time::Duration::from_millis(1500)),
            chrono::Duration::milliseconds(1500)
        );
        assert_eq!(
            to_chrono_duration(std::time::Duration::MAX),
            chrono::Duration::MAX
        );
    }

    #[test]
    fn test_fingerprint_serializes_as_plain_string() {
        let fp = Fingerprint::new("deadbeef");
        assert_eq!(serde_json::to_string(&fp).unwrap(), "\"deadbeef\"");
        assert_eq!(fp.to_string(), "deadbeef");
    }
}
