//! Collaborator traits.
//!
//! The engines never talk to the network or the filesystem themselves. A
//! [`DataSource`] downloads and persists a scheduled dataset; a
//! [`DetailsFetcher`] performs one expensive on-demand lookup.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{FetchError, SourceError};
use crate::Fingerprint;

/// A dataset that can be downloaded and persisted on a schedule.
///
/// `download` must be safe to call repeatedly. It returns the fingerprint of
/// what it persisted; on failure the previously persisted artifact must be
/// left in place.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Human readable service name, used in logs and the status surface.
    fn name(&self) -> &str;

    /// Download and persist the dataset, returning its fingerprint.
    async fn download(&self) -> Result<Fingerprint, SourceError>;

    /// Path the persisted dataset is republished at, if any.
    fn public_path(&self) -> Option<&str> {
        None
    }
}

/// Definitive answer from an on-demand lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Answer<P> {
    Found(P),
    NotFound,
}

impl<P> Answer<P> {
    pub fn into_found(self) -> Option<P> {
        match self {
            Answer::Found(payload) => Some(payload),
            Answer::NotFound => None,
        }
    }
}

/// Expensive keyed lookup placed behind the cache and rate limiter.
#[async_trait]
pub trait DetailsFetcher: Send + Sync {
    type Payload: Clone + Send + Sync + 'static;

    async fn fetch_details(&self, key: &str) -> Result<Answer<Self::Payload>, FetchError>;
}

// Boxed collaborators let one engine type hold heterogeneous sources.

#[async_trait]
impl<T: DataSource + ?Sized> DataSource for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn download(&self) -> Result<Fingerprint, SourceError> {
        (**self).download().await
    }

    fn public_path(&self) -> Option<&str> {
        (**self).public_path()
    }
}

#[async_trait]
impl<T: DetailsFetcher + ?Sized> DetailsFetcher for Box<T> {
    type Payload = T::Payload;

    async fn fetch_details(&self, key: &str) -> Result<Answer<Self::Payload>, FetchError> {
        (**self).fetch_details(key).await
    }
}
