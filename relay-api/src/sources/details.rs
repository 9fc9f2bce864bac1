//! On-demand details lookup over HTTP.

use async_trait::async_trait;
use relay_core::{Answer, DetailsFetcher, FetchError};
use reqwest::StatusCode;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct DetailsBody {
    content: String,
}

/// Fetches `{"content": "..."}` from the key URL.
///
/// A 404 or 410 is a definitive "not found". Any other failure to reach the
/// upstream or a non-success status is a transport error, and a body of the
/// wrong shape is a parse error.
#[derive(Debug, Clone)]
pub struct HttpDetailsFetcher {
    client: reqwest::Client,
}

impl HttpDetailsFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DetailsFetcher for HttpDetailsFetcher {
    type Payload = String;

    async fn fetch_details(&self, key: &str) -> Result<Answer<String>, FetchError> {
        let response = self
            .client
            .get(key)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::GONE => return Ok(Answer::NotFound),
            status if !status.is_success() => {
                return Err(FetchError::Transport(format!("upstream returned {}", status)))
            }
            _ => {}
        }

        let text = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let body: DetailsBody =
            serde_json::from_str(&text).map_err(|e| FetchError::Parse(e.to_string()))?;
        Ok(Answer::Found(body.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode as AxumStatus, routing::get, Json, Router};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_classifies_upstream_responses() {
        let app = Router::new()
            .route(
                "/found",
                get(|| async { Json(serde_json::json!({ "content": "Buses replace trains" })) }),
            )
            .route("/wrong-shape", get(|| async { Json(serde_json::json!({ "body": 1 })) }))
            .route("/broken", get(|| async { AxumStatus::BAD_GATEWAY }));
        let base = serve(app).await;
        let fetcher = HttpDetailsFetcher::new(reqwest::Client::new());

        assert_eq!(
            fetcher.fetch_details(&format!("{}/found", base)).await,
            Ok(Answer::Found("Buses replace trains".to_string()))
        );
        assert_eq!(
            fetcher.fetch_details(&format!("{}/missing", base)).await,
            Ok(Answer::NotFound)
        );
        assert!(matches!(
            fetcher.fetch_details(&format!("{}/wrong-shape", base)).await,
            Err(FetchError::Parse(_))
        ));
        assert!(matches!(
            fetcher.fetch_details(&format!("{}/broken", base)).await,
            Err(FetchError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let fetcher = HttpDetailsFetcher::new(reqwest::Client::new());
        let result = fetcher.fetch_details(&format!("http://{}/x", addr)).await;
        assert!(matches!(result, Err(FetchError::Transport(_))));
    }
}
