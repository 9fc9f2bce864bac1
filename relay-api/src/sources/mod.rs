//! Concrete collaborators for the monitoring engines.
//!
//! - [`HttpJsonSource`]: fetches a JSON document, persists it pretty-printed
//!   into the data directory and fingerprints the persisted bytes.
//! - [`ScriptSource`]: runs a download script and reads the fingerprint it
//!   prints.
//! - [`HttpDetailsFetcher`]: on-demand lookup of a details document.

pub mod details;
pub mod http_json;
pub mod script;

pub use details::HttpDetailsFetcher;
pub use http_json::HttpJsonSource;
pub use script::ScriptSource;

use std::path::{Path, PathBuf};
use std::time::Duration;

use relay_core::SourceError;

/// Shared upstream client with the configured timeout.
pub fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("transit-relay/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Write `contents` to `dir/file_name`, creating `dir` if needed.
///
/// The file is staged in a sibling of `dir` and renamed into place, so a
/// failed write never clobbers the previous copy and a half-written file is
/// never visible under `dir`.
pub(crate) async fn persist(dir: &Path, file_name: &str, contents: &[u8]) -> Result<(), SourceError> {
    let io_err = |path: &Path, e: std::io::Error| SourceError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    };

    let stage = staging_dir(dir);
    for d in [dir, stage.as_path()] {
        tokio::fs::create_dir_all(d)
            .await
            .map_err(|e| io_err(d, e))?;
    }

    let target = dir.join(file_name);
    let staging = stage.join(file_name);
    tokio::fs::write(&staging, contents)
        .await
        .map_err(|e| io_err(&staging, e))?;
    tokio::fs::rename(&staging, &target)
        .await
        .map_err(|e| io_err(&target, e))
}

/// `<parent>/.<dir name>.staging`, next to the served directory.
fn staging_dir(dir: &Path) -> PathBuf {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data".to_string());
    dir.parent()
        .unwrap_or_else(|| Path::new(""))
        .join(format!(".{}.staging", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_persist_creates_dir_and_replaces_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dir = temp.path().join("data");

        persist(&dir, "feed.json", b"one").await.expect("first write");
        persist(&dir, "feed.json", b"two").await.expect("second write");

        let contents = tokio::fs::read(dir.join("feed.json")).await.expect("read");
        assert_eq!(contents, b"two");

        let served: Vec<_> = std::fs::read_dir(&dir)
            .expect("read_dir")
            .map(|entry| entry.expect("entry").file_name())
            .collect();
        assert_eq!(served, vec![std::ffi::OsString::from("feed.json")]);
    }

    #[test]
    fn test_staging_dir_is_outside_served_dir() {
        let staging = staging_dir(Path::new("/srv/relay/data"));
        assert_eq!(staging, PathBuf::from("/srv/relay/.data.staging"));
        assert!(!staging.starts_with("/srv/relay/data"));

        assert_eq!(staging_dir(Path::new("data")), PathBuf::from(".data.staging"));
    }
}
