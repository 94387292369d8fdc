//! HTTP capability used by the poller and the apps API
//!
//! The workflow never touches reqwest directly. It goes through
//! [`HttpClient`], which the tests replace with [`MockHttpClient`].

use async_trait::async_trait;
use shipit_core::{Result, ShipError};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Status and body of a GET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for issuing HTTP requests (allows mocking in tests)
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// GET `url`; a non-2xx status is returned, not raised
    async fn get(&self, url: &str, headers: &[(&str, &str)], timeout: Duration) -> Result<HttpResponse>;

    /// PUT a JSON body to `url` and return the status code
    async fn put_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<u16>;
}

/// reqwest-backed client
#[derive(Debug, Clone, Default)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_headers(
        mut request: reqwest::RequestBuilder,
        headers: &[(&str, &str)],
    ) -> reqwest::RequestBuilder {
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        request
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str, headers: &[(&str, &str)], timeout: Duration) -> Result<HttpResponse> {
        tracing::debug!("GET {}", url);

        let response = Self::with_headers(self.client.get(url), headers)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ShipError::Http(format!("Failed to send request: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ShipError::Http(format!("Failed to read response: {}", e)))?;

        Ok(HttpResponse { status, body })
    }

    async fn put_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<u16> {
        tracing::debug!("PUT {}", url);

        let response = Self::with_headers(self.client.put(url), headers)
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ShipError::Http(format!("Failed to send request: {}", e)))?;

        Ok(response.status().as_u16())
    }
}

/// A request seen by [`MockHttpClient`]
#[derive(Debug, Clone, PartialEq)]
pub struct HttpCall {
    pub method: &'static str,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub timeout: Duration,
}

impl HttpCall {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Scripted reply of [`MockHttpClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    Status(u16, String),
    /// Transport failure such as a refused connection or a timeout
    Error(String),
}

impl MockReply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self::Status(200, body.into())
    }

    pub fn status(status: u16) -> Self {
        Self::Status(status, String::new())
    }
}

/// Mock HTTP client for testing
///
/// Replies are queued per method and URL. The last queued reply repeats, so a
/// single `Status(503, ..)` answers every probe of a never-ready dashboard.
/// Clones share the call log and the queues.
#[derive(Clone, Default)]
pub struct MockHttpClient {
    replies: Arc<Mutex<HashMap<(&'static str, String), VecDeque<MockReply>>>>,
    calls: Arc<Mutex<Vec<HttpCall>>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_get(self, url: &str, replies: impl IntoIterator<Item = MockReply>) -> Self {
        self.queue("GET", url, replies);
        self
    }

    pub fn on_put(self, url: &str, replies: impl IntoIterator<Item = MockReply>) -> Self {
        self.queue("PUT", url, replies);
        self
    }

    fn queue(&self, method: &'static str, url: &str, replies: impl IntoIterator<Item = MockReply>) {
        if let Ok(mut map) = self.replies.lock() {
            map.entry((method, url.to_string()))
                .or_default()
                .extend(replies);
        }
    }

    pub fn calls(&self) -> Vec<HttpCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn calls_with_method(&self, method: &str) -> Vec<HttpCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method)
            .collect()
    }

    fn reply(&self, call: HttpCall) -> Result<HttpResponse> {
        let key = (call.method, call.url.clone());
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }

        let reply = self.replies.lock().ok().and_then(|mut map| {
            let queue = map.get_mut(&key)?;
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        });

        match reply {
            Some(MockReply::Status(status, body)) => Ok(HttpResponse { status, body }),
            Some(MockReply::Error(message)) => Err(ShipError::Http(message)),
            None => Err(ShipError::Http(format!(
                "No mock response for: {} {}",
                key.0, key.1
            ))),
        }
    }
}

fn owned_headers(headers: &[(&str, &str)]) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, url: &str, headers: &[(&str, &str)], timeout: Duration) -> Result<HttpResponse> {
        self.reply(HttpCall {
            method: "GET",
            url: url.to_string(),
            headers: owned_headers(headers),
            body: None,
            timeout,
        })
    }

    async fn put_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<u16> {
        self.reply(HttpCall {
            method: "PUT",
            url: url.to_string(),
            headers: owned_headers(headers),
            body: Some(body.clone()),
            timeout,
        })
        .map(|response| response.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_replays_queue_and_repeats_last() {
        let mock = MockHttpClient::new().on_get(
            "https://x.test/",
            [MockReply::Error("refused".to_string()), MockReply::ok("hi")],
        );

        let first = mock.get("https://x.test/", &[], Duration::from_secs(5)).await;
        assert!(first.is_err());

        for _ in 0..2 {
            let response = mock
                .get("https://x.test/", &[], Duration::from_secs(5))
                .await
                .unwrap();
            assert_eq!(response, HttpResponse { status: 200, body: "hi".to_string() });
        }
        assert_eq!(mock.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_mock_records_put_body_and_headers() {
        let mock = MockHttpClient::new().on_put("https://x.test/p", [MockReply::status(204)]);
        let body = serde_json::json!({"value": 1});

        let status = mock
            .put_json(
                "https://x.test/p",
                &[("X-API-Key", "k")],
                &body,
                Duration::from_secs(10),
            )
            .await
            .unwrap();

        assert_eq!(status, 204);
        let call = &mock.calls_with_method("PUT")[0];
        assert_eq!(call.body.as_ref(), Some(&body));
        assert_eq!(call.header("x-api-key"), Some("k"));
        assert_eq!(call.timeout, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_mock_unknown_url_errors() {
        let mock = MockHttpClient::new();
        let result = mock.get("https://nowhere.test/", &[], Duration::from_secs(1)).await;
        assert!(matches!(result, Err(ShipError::Http(_))));
    }

    #[test]
    fn test_response_success_range() {
        assert!(HttpResponse { status: 204, body: String::new() }.is_success());
        assert!(!HttpResponse { status: 404, body: String::new() }.is_success());
    }
}
