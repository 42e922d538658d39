//! Error taxonomy for remote HTTP calls.

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use thiserror::Error;

/// Maximum characters of a response body kept in a [`RemoteError::Status`].
const BODY_EXCERPT_CHARS: usize = 200;

/// Errors produced by a remote call.
///
/// Every client-error variant renders as `"<service> API error: 4xx ..."`, so a
/// message-level check for `"error: 4"` agrees with [`RemoteError::is_client_error`].
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("{service} API error: {status} rate limit exceeded. {}", rate_limit_hint(.authenticated))]
    RateLimited {
        service: String,
        status: u16,
        authenticated: bool,
    },

    #[error("{service} API error: 404 {resource} not found. Check the name; private repositories also need a token with access.")]
    NotFound { service: String, resource: String },

    #[error("{service} API error: 403 access to {resource} is forbidden. The repository may be private; configure a token that can read it.")]
    Forbidden { service: String, resource: String },

    #[error("{service} API error: 401 credentials were rejected. Check the configured API key.")]
    Unauthorized { service: String },

    #[error("{service} API error: {status} {body}")]
    Status {
        service: String,
        status: u16,
        body: String,
    },

    #[error("{service} request failed: {source}")]
    Network {
        service: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} request timed out after {after_ms} ms")]
    Timeout { service: String, after_ms: u64 },

    #[error("{service} returned an unexpected payload: {message}")]
    Decode { service: String, message: String },
}

fn rate_limit_hint(authenticated: &bool) -> &'static str {
    if *authenticated {
        "The token's quota (~5000 requests/hour) is used up; wait for the limit to reset."
    } else {
        "Unauthenticated requests are limited to ~60/hour; configure a GitHub token to raise the limit to ~5000/hour."
    }
}

/// True when an error message names a 4xx client error.
pub fn is_client_error_message(message: &str) -> bool {
    message.contains("error: 4")
}

impl RemoteError {
    /// Map a non-success HTTP response to an error.
    ///
    /// A 403 counts as rate limiting when the remaining-quota header reads 0
    /// or when the request carried no credential.
    pub fn from_response(
        service: &str,
        resource: &str,
        status: StatusCode,
        headers: &HeaderMap,
        body: &str,
        authenticated: bool,
    ) -> Self {
        let service = service.to_string();
        let quota_exhausted = headers
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim() == "0");

        match status.as_u16() {
            401 => RemoteError::Unauthorized { service },
            403 if quota_exhausted || !authenticated => RemoteError::RateLimited {
                service,
                status: 403,
                authenticated,
            },
            403 => RemoteError::Forbidden {
                service,
                resource: resource.to_string(),
            },
            404 => RemoteError::NotFound {
                service,
                resource: resource.to_string(),
            },
            429 => RemoteError::RateLimited {
                service,
                status: 429,
                authenticated,
            },
            code => RemoteError::Status {
                service,
                status: code,
                body: excerpt(body),
            },
        }
    }

    /// Wrap a transport error, separating timeouts from other failures.
    pub fn transport(service: &str, err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            RemoteError::Timeout {
                service: service.to_string(),
                after_ms: timeout_ms,
            }
        } else {
            RemoteError::Network {
                service: service.to_string(),
                source: err,
            }
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::RateLimited { status, .. } | RemoteError::Status { status, .. } => {
                Some(*status)
            }
            RemoteError::NotFound { .. } => Some(404),
            RemoteError::Forbidden { .. } => Some(403),
            RemoteError::Unauthorized { .. } => Some(401),
            RemoteError::Network { .. } | RemoteError::Timeout { .. } | RemoteError::Decode { .. } => {
                None
            }
        }
    }

    /// 4xx errors are terminal: retrying cannot change the answer.
    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(400..=499))
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RemoteError::RateLimited { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound { .. })
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= BODY_EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(BODY_EXCERPT_CHARS).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers_with_remaining(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn forbidden_with_exhausted_quota_is_rate_limit() {
        let err = RemoteError::from_response(
            "GitHub",
            "/repos/octo/demo",
            StatusCode::FORBIDDEN,
            &headers_with_remaining("0"),
            "",
            true,
        );
        assert!(err.is_rate_limited());
        assert!(err.to_string().contains("5000"));
    }

    #[test]
    fn forbidden_without_token_mentions_unauthenticated_limit() {
        let err = RemoteError::from_response(
            "GitHub",
            "/repos/octo/demo",
            StatusCode::FORBIDDEN,
            &HeaderMap::new(),
            "",
            false,
        );
        assert!(err.is_rate_limited());
        let message = err.to_string();
        assert!(message.contains("~60/hour"), "{message}");
        assert!(message.contains("~5000/hour"), "{message}");
    }

    #[test]
    fn forbidden_with_token_and_quota_is_private_repo() {
        let err = RemoteError::from_response(
            "GitHub",
            "/repos/octo/secret",
            StatusCode::FORBIDDEN,
            &headers_with_remaining("4999"),
            "",
            true,
        );
        assert!(matches!(err, RemoteError::Forbidden { .. }));
        assert!(err.to_string().contains("private"));
    }

    #[test]
    fn client_errors_carry_the_message_marker() {
        let cases = [
            StatusCode::UNAUTHORIZED,
            StatusCode::NOT_FOUND,
            StatusCode::UNPROCESSABLE_ENTITY,
            StatusCode::TOO_MANY_REQUESTS,
        ];
        for status in cases {
            let err =
                RemoteError::from_response("GitHub", "/x", status, &HeaderMap::new(), "{}", true);
            assert!(err.is_client_error(), "{status}");
            assert!(is_client_error_message(&err.to_string()), "{err}");
        }
    }

    #[test]
    fn server_errors_are_not_client_errors() {
        let err = RemoteError::from_response(
            "GitHub",
            "/x",
            StatusCode::BAD_GATEWAY,
            &HeaderMap::new(),
            "upstream",
            true,
        );
        assert!(!err.is_client_error());
        assert!(!is_client_error_message(&err.to_string()));
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(1000);
        let err = RemoteError::from_response(
            "LLM",
            "/chat/completions",
            StatusCode::INTERNAL_SERVER_ERROR,
            &HeaderMap::new(),
            &body,
            true,
        );
        match err {
            RemoteError::Status { body, .. } => assert_eq!(body.len(), BODY_EXCERPT_CHARS + 3),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
