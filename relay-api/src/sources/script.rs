//! Dataset produced by an external download script.

use std::path::PathBuf;

use async_trait::async_trait;
use relay_core::{DataSource, Fingerprint, SourceError};
use tokio::process::Command;

use crate::config::ScriptFeedConfig;
use crate::constants::GTFS_HASH_LINE_PREFIX;

/// Runs a script that downloads and persists a dataset itself, then prints
/// `The hash is: <hex>` on its own line.
#[derive(Debug, Clone)]
pub struct ScriptSource {
    name: String,
    script: PathBuf,
}

impl ScriptSource {
    pub fn new(config: &ScriptFeedConfig) -> Self {
        Self {
            name: config.name.clone(),
            script: config.script.clone(),
        }
    }

    fn script_err(&self, reason: impl Into<String>) -> SourceError {
        SourceError::Script {
            script: self.script.display().to_string(),
            reason: reason.into(),
        }
    }
}

/// Extract the fingerprint from the script's standard output.
pub fn parse_hash_line(stdout: &str) -> Option<Fingerprint> {
    stdout
        .lines()
        .find_map(|line| line.strip_prefix(GTFS_HASH_LINE_PREFIX))
        .map(str::trim)
        .filter(|hash| !hash.is_empty())
        .map(Fingerprint::new)
}

#[async_trait]
impl DataSource for ScriptSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn download(&self) -> Result<Fingerprint, SourceError> {
        tracing::info!(service = %self.name, script = %self.script.display(), "Running download script");

        let output = Command::new(&self.script)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.script_err(e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        tracing::debug!(service = %self.name, output = %stdout.trim(), "Download script finished");

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.script_err(format!("{}: {}", output.status, stderr.trim())));
        }

        parse_hash_line(&stdout).ok_or_else(|| self.script_err("hash not given in script output"))
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_hash_found_among_noise(
            before in prop::collection::vec("[A-Za-z. ]{0,20}", 0..5),
            after in prop::collection::vec("[A-Za-z. ]{0,20}", 0..5),
            hash in "[0-9a-f]{8,64}",
        ) {
            let mut lines = before;
            lines.push(format!("{} {}", GTFS_HASH_LINE_PREFIX, hash));
            lines.extend(after);
            let parsed = parse_hash_line(&lines.join("\n"));
            prop_assert_eq!(parsed, Some(Fingerprint::new(hash)));
        }
    }
}
