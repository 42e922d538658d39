//! Shared HTTP client that sends JSON requests through the retry loop.

use crate::error::RemoteError;
use crate::retry::{with_retry, OnRetry, RetryPolicy};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;

/// `User-Agent` sent with every request.
pub const USER_AGENT: &str = concat!("repolens/", env!("CARGO_PKG_VERSION"));

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP call wrapper with retry/backoff and typed error classification.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct RemoteClient {
    http: Client,
    timeout: Duration,
    policy: RetryPolicy,
    on_retry: Option<OnRetry>,
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("timeout", &self.timeout)
            .field("policy", &self.policy)
            .field("on_retry", &self.on_retry.is_some())
            .finish()
    }
}

impl RemoteClient {
    /// Build a client with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, RemoteError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::transport("HTTP client", e, 0))?;
        Ok(Self {
            http,
            timeout,
            policy: RetryPolicy::default(),
            on_retry: None,
        })
    }

    pub fn with_defaults() -> Result<Self, RemoteError> {
        Self::new(DEFAULT_TIMEOUT)
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Install an observer called before each retry.
    #[must_use]
    pub fn with_on_retry(mut self, on_retry: OnRetry) -> Self {
        self.on_retry = Some(on_retry);
        self
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run an arbitrary fallible operation under this client's retry policy.
    pub async fn call<T, F, Fut>(&self, operation_name: &str, operation: F) -> Result<T, RemoteError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        with_retry(
            &self.policy,
            operation_name,
            self.on_retry.as_ref(),
            operation,
        )
        .await
    }

    /// Send a request built by `build` and decode the JSON body, with retries.
    ///
    /// `build` is invoked once per attempt. `authenticated` tells the status
    /// classifier whether a credential was attached.
    pub async fn send_json<T, B>(
        &self,
        service: &str,
        resource: &str,
        authenticated: bool,
        build: B,
    ) -> Result<T, RemoteError>
    where
        T: DeserializeOwned,
        B: Fn(&Client) -> RequestBuilder,
    {
        self.call(resource, || {
            self.send_once(service, resource, authenticated, build(&self.http))
        })
        .await
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        service: &str,
        resource: &str,
        authenticated: bool,
        request: RequestBuilder,
    ) -> Result<T, RemoteError> {
        let timeout_ms = self.timeout.as_millis() as u64;
        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::transport(service, e, timeout_ms))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::transport(service, e, timeout_ms))?;

        if !status.is_success() {
            return Err(RemoteError::from_response(
                service,
                resource,
                status,
                &headers,
                &body,
                authenticated,
            ));
        }

        serde_json::from_str(&body).map_err(|e| RemoteError::Decode {
            service: service.to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_client() -> RemoteClient {
        RemoteClient::with_defaults()
            .unwrap()
            .with_policy(RetryPolicy::new(3).with_base_delay(Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn transient_server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let client = fast_client().with_on_retry(Arc::new(move |n| sink.lock().push(n.attempt)));

        let url = format!("{}/flaky", server.uri());
        let body: Value = client
            .send_json("Test", "/flaky", true, |http| http.get(&url))
            .await
            .unwrap();

        assert_eq!(body["ok"], true);
        assert_eq!(*seen.lock(), vec![1, 2]);
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/missing", server.uri());
        let err = fast_client()
            .send_json::<Value, _>("GitHub", "/missing", true, |http| http.get(&url))
            .await
            .unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn user_agent_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let url = server.uri();
        let body: Value = fast_client()
            .send_json("Test", "/", true, |http| http.get(&url))
            .await
            .unwrap();
        assert!(body.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_json_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let url = server.uri();
        let err = fast_client()
            .with_policy(RetryPolicy::no_retry())
            .send_json::<Value, _>("Test", "/", true, |http| http.get(&url))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Decode { .. }));
    }
}
