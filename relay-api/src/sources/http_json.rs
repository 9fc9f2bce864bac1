//! JSON feed persisted into the data directory.

use std::path::PathBuf;

use async_trait::async_trait;
use relay_core::{DataSource, Fingerprint, SourceError};

use crate::config::FeedConfig;

/// Downloads a JSON document and republishes it as `/<file_name>`.
///
/// The document is re-encoded pretty-printed before it is written, so
/// fingerprints only change when the content does, not when upstream
/// whitespace does.
#[derive(Debug, Clone)]
pub struct HttpJsonSource {
    name: String,
    url: String,
    header: Option<(String, String)>,
    data_dir: PathBuf,
    file_name: String,
    public_path: String,
    client: reqwest::Client,
}

impl HttpJsonSource {
    pub fn new(config: &FeedConfig, data_dir: impl Into<PathBuf>, client: reqwest::Client) -> Self {
        Self {
            name: config.name.clone(),
            url: config.url.clone(),
            header: config.header.clone(),
            data_dir: data_dir.into(),
            file_name: config.file_name.clone(),
            public_path: format!("/{}", config.file_name),
            client,
        }
    }

    fn http_err(&self, reason: impl ToString) -> SourceError {
        SourceError::Http {
            url: self.url.clone(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl DataSource for HttpJsonSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn download(&self) -> Result<Fingerprint, SourceError> {
        let mut request = self.client.get(&self.url);
        if let Some((name, value)) = &self.header {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| self.http_err(e))?;
        let document: serde_json::Value = response.json().await.map_err(|e| self.http_err(e))?;

        let pretty = serde_json::to_string_pretty(&document).map_err(|e| SourceError::Encode {
            what: self.file_name.clone(),
            reason: e.to_string(),
        })?;
        super::persist(&self.data_dir, &self.file_name, pretty.as_bytes()).await?;

        tracing::debug!(
            service = %self.name,
            file = %self.file_name,
            bytes = pretty.len(),
            "Persisted feed"
        );
        Ok(Fingerprint::of_content(pretty.as_bytes()))
    }

    fn public_path(&self) -> Option<&str> {
        Some(&self.public_path)
    }
}
