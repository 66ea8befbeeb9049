//! Upstream HTTP record source
//!
//! Fetches records from a JSON service laid out as
//! `GET {base}/{resource}?parent={id}` and `GET {base}/{resource}/{id}`.
//! Bodies are either an array of objects or a page object with a `list`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::model::{Record, Value};
use crate::source::{records_from_json, FetchRequest, RecordSource, SourceError, SourceResult};

/// Record source backed by an upstream REST service
pub struct HttpSource {
    client: Client,
    base_url: String,
}

impl HttpSource {
    /// Create a source for `base_url`; each request is bounded by `timeout`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> SourceResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Unavailable(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self, request: &FetchRequest) -> String {
        match &request.scope {
            Some(parent) => format!(
                "{}/{}?parent={}",
                self.base_url,
                request.resource,
                urlencoding::encode(parent)
            ),
            None => format!("{}/{}", self.base_url, request.resource),
        }
    }

    async fn get_json(&self, url: &str) -> Result<(StatusCode, serde_json::Value), SourceError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            tracing::warn!(url, error = %e, "Upstream request failed");
            if e.is_timeout() {
                SourceError::Unavailable("request timed out".to_string())
            } else if e.is_connect() {
                SourceError::Unavailable(format!("cannot connect to {}", self.base_url))
            } else {
                SourceError::Unavailable(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_server_error() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(url, status = status.as_u16(), "Upstream server error");
            return Err(SourceError::Unavailable(format!("upstream error {}: {}", status.as_u16(), message)));
        }
        if status == StatusCode::NOT_FOUND {
            return Ok((status, serde_json::Value::Null));
        }
        if !status.is_success() {
            return Err(SourceError::Malformed(format!("unexpected status {}", status.as_u16())));
        }

        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| SourceError::Malformed(e.to_string()))?;
        Ok((status, body))
    }
}

#[async_trait]
impl RecordSource for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, request: &FetchRequest) -> SourceResult<Vec<Record>> {
        let url = self.collection_url(request);
        let (status, body) = self.get_json(&url).await?;
        if status == StatusCode::NOT_FOUND {
            // Collection endpoints that do not exist upstream hold nothing
            return Ok(Vec::new());
        }

        let records = records_from_json(request.resource, &body)?;
        tracing::debug!(url, records = records.len(), "Fetched records");
        Ok(records)
    }

    async fn get(&self, request: &FetchRequest, id: &Value) -> SourceResult<Record> {
        let mut url = format!(
            "{}/{}/{}",
            self.base_url,
            request.resource,
            urlencoding::encode(&id.to_text())
        );
        if let Some(parent) = &request.scope {
            url.push_str("?parent=");
            url.push_str(&urlencoding::encode(parent));
        }
        let (status, body) = self.get_json(&url).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::not_found(request.resource, id));
        }

        Record::from_json(request.resource.schema(), &body)
            .ok_or_else(|| SourceError::Malformed(format!("{} record is not an object", request.resource)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ResourceKind;
    use axum::{http::StatusCode as Status, routing::get, Json, Router};
    use serde_json::json;

    /// Serve canned upstream answers on an ephemeral port
    async fn upstream() -> String {
        let app = Router::new()
            .route("/devices", get(|| async { (Status::BAD_GATEWAY, "gateway down") }))
            .route("/groups", get(|| async { Status::NOT_FOUND }))
            .route("/users/:id", get(|| async { Status::NOT_FOUND }))
            .route("/jobs", get(|| async { "<html>not json</html>" }))
            .route("/alerts", get(|| async { Status::UNAUTHORIZED }))
            .route(
                "/streams",
                get(|| async { Json(json!({"list": [{"id": "s-a"}, {"id": "s-b"}]})) }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_collection_url() {
        let source = HttpSource::new("http://fleet.local/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(source.base_url(), "http://fleet.local/api");

        let plain = FetchRequest::new(ResourceKind::Devices);
        assert_eq!(source.collection_url(&plain), "http://fleet.local/api/devices");

        let scoped = FetchRequest::new(ResourceKind::StreamHistory).scoped("dev/temp 1");
        assert_eq!(
            source.collection_url(&scoped),
            "http://fleet.local/api/stream_history?parent=dev%2Ftemp%201"
        );
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_unavailable() {
        let source = HttpSource::new("http://127.0.0.1:1", Duration::from_millis(500)).unwrap();
        let err = source
            .fetch(&FetchRequest::new(ResourceKind::Devices))
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_upstream_status_mapping() {
        let source = HttpSource::new(upstream().await, Duration::from_secs(5)).unwrap();

        let err = source.fetch(&FetchRequest::new(ResourceKind::Devices)).await.unwrap_err();
        assert!(matches!(err, SourceError::Unavailable(_)), "{:?}", err);

        let groups = source.fetch(&FetchRequest::new(ResourceKind::Groups)).await.unwrap();
        assert!(groups.is_empty());

        let err = source
            .get(&FetchRequest::new(ResourceKind::Users), &Value::Number(7.0))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::NotFound { ref id, .. } if id == "7"), "{:?}", err);

        let err = source.fetch(&FetchRequest::new(ResourceKind::Jobs)).await.unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)), "{:?}", err);

        let err = source.fetch(&FetchRequest::new(ResourceKind::Alerts)).await.unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)), "{:?}", err);

        let streams = source.fetch(&FetchRequest::new(ResourceKind::Streams)).await.unwrap();
        assert_eq!(streams.len(), 2);
    }
}
