use std::time::Duration;

use nestbuffer_domain::{NestBufferError, Result};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::arcgis::wire::ErrorEnvelope;
use crate::errors::InfraError;

/// HTTP client with built-in retry and timeout support.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    max_attempts: usize,
    base_backoff: Duration,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    ///
    /// # Errors
    /// Returns `NestBufferError::Network` if the TLS backend cannot be
    /// initialised.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute the provided request builder with retry semantics.
    ///
    /// Connect failures, timeouts and 5xx responses are retried with
    /// exponential backoff; everything else is returned as is.
    ///
    /// # Errors
    /// Returns the mapped transport error once all attempts are exhausted.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let attempts = self.max_attempts.max(1);

        for attempt in 0..attempts {
            let cloned_builder = builder.try_clone().ok_or_else(|| {
                NestBufferError::Internal(
                    "request body cannot be cloned; buffer the body to enable retries".into(),
                )
            })?;

            let request = cloned_builder.build().map_err(|err| NestBufferError::from(InfraError::from(err)))?;

            let method = request.method().clone();
            let url = redacted(request.url());
            debug!(attempt = attempt + 1, %method, %url, "sending HTTP request");

            match self.client.execute(request).await {
                Ok(response) => {
                    let status = response.status();
                    debug!(attempt = attempt + 1, %method, %url, %status, "received HTTP response");

                    if status.is_server_error() && attempt + 1 < attempts {
                        self.sleep_with_backoff(attempt + 1).await;
                        continue;
                    }

                    return Ok(response);
                }
                Err(err) => {
                    debug!(attempt = attempt + 1, %method, %url, error = %err, "HTTP request failed");

                    if attempt + 1 < attempts && should_retry_error(&err) {
                        self.sleep_with_backoff(attempt + 1).await;
                        continue;
                    }

                    return Err(InfraError::from(err).into());
                }
            }
        }

        Err(NestBufferError::Internal("http client exhausted retries without producing a result".into()))
    }

    /// Execute the request exactly once.
    ///
    /// For calls that are not idempotent, where a retry after a lost
    /// response could apply the same edit twice.
    ///
    /// # Errors
    /// Returns the mapped transport error.
    pub async fn send_once(&self, builder: RequestBuilder) -> Result<Response> {
        let request = builder.build().map_err(|err| NestBufferError::from(InfraError::from(err)))?;

        let method = request.method().clone();
        let url = redacted(request.url());
        debug!(%method, %url, "sending HTTP request without retry");

        match self.client.execute(request).await {
            Ok(response) => {
                debug!(%method, %url, status = %response.status(), "received HTTP response");
                Ok(response)
            }
            Err(err) => {
                debug!(%method, %url, error = %err, "HTTP request failed");
                Err(InfraError::from(err).into())
            }
        }
    }

    /// POST a url-encoded form and decode an ArcGIS JSON response.
    ///
    /// ArcGIS reports most failures as `{"error": {...}}` inside an HTTP 200
    /// body; those are turned into `Auth` (invalid or expired token) or
    /// `Remote` errors before `T` is decoded.
    ///
    /// # Errors
    /// Transport and status errors as in [`Self::send`], the error envelope,
    /// or `InvalidData` if the body does not decode as `T`.
    pub async fn post_form<T>(&self, url: &str, form: &[(&str, String)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self.send(self.request(Method::POST, url).form(form)).await?;
        decode_arcgis(response).await
    }

    /// Same as [`Self::post_form`] but never retried. Used for edits.
    ///
    /// # Errors
    /// Transport and status errors as in [`Self::send_once`], the error
    /// envelope, or `InvalidData` if the body does not decode as `T`.
    pub async fn post_form_once<T>(&self, url: &str, form: &[(&str, String)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self.send_once(self.request(Method::POST, url).form(form)).await?;
        decode_arcgis(response).await
    }

    fn backoff_delay(&self, retry_number: usize) -> Duration {
        let shift = retry_number.saturating_sub(1).min(8) as u32;
        let multiplier = 1u32 << shift;
        self.base_backoff.saturating_mul(multiplier)
    }

    async fn sleep_with_backoff(&self, retry_number: usize) {
        let delay = self.backoff_delay(retry_number);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
    user_agent: Option<String>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
            user_agent: Some(concat!("nestbuffer/", env!("CARGO_PKG_VERSION")).to_string()),
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configure the total number of attempts (initial try + retries).
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// # Errors
    /// Returns `NestBufferError::Network` if reqwest cannot build a client.
    pub fn build(self) -> Result<HttpClient> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder.build().map_err(InfraError::from)?;

        Ok(HttpClient { client, max_attempts: self.max_attempts.max(1), base_backoff: self.base_backoff })
    }
}

async fn decode_arcgis<T>(response: Response) -> Result<T>
where
    T: DeserializeOwned,
{
    let response = response.error_for_status().map_err(InfraError::from)?;
    let body = response.text().await.map_err(InfraError::from)?;

    let value: Value = serde_json::from_str(&body).map_err(InfraError::from)?;
    if let Some(error) = ErrorEnvelope::detect(&value) {
        return Err(error.into_domain());
    }

    Ok(serde_json::from_value(value).map_err(InfraError::from)?)
}

fn should_retry_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// URL for logging with any `token` query parameter masked.
fn redacted(url: &reqwest::Url) -> String {
    if !url.query_pairs().any(|(key, _)| key == "token") {
        return url.to_string();
    }

    let mut masked = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            let value = if key == "token" { "***".to_string() } else { value.into_owned() };
            (key.into_owned(), value)
        })
        .collect();
    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use reqwest::{Method, StatusCode};
    use serde::Deserialize;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Echo {
        value: i64,
    }

    fn client_with_defaults() -> HttpClient {
        HttpClient::builder()
            .base_backoff(Duration::from_millis(10))
            .max_attempts(3)
            .build()
            .expect("http client")
    }

    #[tokio::test]
    async fn returns_successful_response_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_with_defaults();
        let response = client.send(client.request(Method::GET, server.uri())).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn retries_server_errors_until_success() {
        let server = MockServer::start().await;
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();
        Mock::given(method("POST"))
            .respond_with(move |_req: &wiremock::Request| -> ResponseTemplate {
                let current = attempts_clone.fetch_add(1, Ordering::SeqCst);
                if current < 2 {
                    ResponseTemplate::new(503)
                } else {
                    ResponseTemplate::new(200).set_body_json(json!({"value": 7}))
                }
            })
            .expect(3)
            .mount(&server)
            .await;

        let client = client_with_defaults();
        let echo: Echo = client
            .post_form(&server.uri(), &[("f", "json".to_string())])
            .await
            .expect("response");

        assert_eq!(echo.value, 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn post_form_once_does_not_retry_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_with_defaults();
        let err = client.post_form_once::<Echo>(&server.uri(), &[("f", "json".to_string())]).await.unwrap_err();

        assert!(matches!(err, NestBufferError::Network(_)));
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_with_defaults();
        let response = client.send(client.request(Method::GET, server.uri())).await.expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn retries_on_network_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener); // release the port so that requests fail with ECONNREFUSED
        let url = format!("http://{addr}");

        let client =
            HttpClient::builder().base_backoff(Duration::from_millis(5)).max_attempts(2).build().expect("http client");

        let result = client.send(client.request(Method::GET, &url)).await;
        match result {
            Err(NestBufferError::Network(msg)) => assert!(msg.to_lowercase().contains("http")),
            other => panic!("expected network error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn post_form_sends_urlencoded_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("where=1%3D1"))
            .and(body_string_contains("f=json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_with_defaults();
        let echo: Echo = client
            .post_form(&server.uri(), &[("f", "json".to_string()), ("where", "1=1".to_string())])
            .await
            .expect("response");
        assert_eq!(echo.value, 1);
    }

    #[tokio::test]
    async fn post_form_surfaces_error_envelope_in_200_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": {"code": 400, "message": "Unable to complete operation.", "details": ["Invalid where clause"]}
            })))
            .mount(&server)
            .await;

        let client = client_with_defaults();
        let err = client.post_form::<Echo>(&server.uri(), &[]).await.unwrap_err();

        match err {
            NestBufferError::Remote(msg) => {
                assert!(msg.contains("Unable to complete operation."));
                assert!(msg.contains("Invalid where clause"));
            }
            other => panic!("expected remote error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn post_form_maps_invalid_token_to_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"error": {"code": 498, "message": "Invalid token."}})),
            )
            .mount(&server)
            .await;

        let client = client_with_defaults();
        let err = client.post_form::<Echo>(&server.uri(), &[]).await.unwrap_err();
        assert!(matches!(err, NestBufferError::Auth(_)));
    }

    #[tokio::test]
    async fn post_form_rejects_non_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let client = client_with_defaults();
        let err = client.post_form::<Echo>(&server.uri(), &[]).await.unwrap_err();
        assert!(matches!(err, NestBufferError::InvalidData(_)));
    }

    #[test]
    fn token_is_masked_in_logged_urls() {
        let url = reqwest::Url::parse("https://example.com/query?f=json&token=secret").unwrap();
        let rendered = redacted(&url);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("f=json"));
    }
}
