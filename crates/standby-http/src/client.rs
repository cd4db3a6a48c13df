//! Minimal HTTP/1.1 JSON client for the control API.
//!
//! One TCP connection per request, driven by hyper's low-level client.

use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full};
use serde::Deserialize;
use tracing::debug;

use standby_core::{ProviderError, ProviderErrorKind};

/// Error codes that mean "the instance cannot accept this operation now".
const INVALID_STATE_CODES: [&str; 2] = ["InvalidDBInstanceState", "InvalidDBInstanceStateFault"];

/// Client for one control API authority (`host:port`).
#[derive(Debug, Clone)]
pub struct ControlApiClient {
    authority: String,
}

/// Error body returned by the control API on non-2xx responses.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ControlApiClient {
    pub fn new(authority: &str) -> Self {
        Self {
            authority: authority.to_string(),
        }
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Send a request and return the body of a 2xx response.
    ///
    /// Non-2xx responses are classified with [`classify_response`].
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Bytes, ProviderError> {
        let uri = format!("http://{}{path}", self.authority);

        let stream = tokio::net::TcpStream::connect(&self.authority)
            .await
            .map_err(|e| ProviderError::transport(format!("connect {}: {e}", self.authority)))?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| {
                ProviderError::transport(format!("handshake with {}: {e}", self.authority))
            })?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let mut builder = http::Request::builder()
            .method(method.clone())
            .uri(path)
            .header("host", &self.authority)
            .header("user-agent", "standby/0.1")
            .header("accept", "application/json");
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let req = builder
            .body(Full::new(Bytes::from(body.unwrap_or_default())))
            .map_err(|e| ProviderError::rejected(format!("invalid request {uri}: {e}")))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| ProviderError::transport(format!("{method} {uri}: {e}")))?;

        let status = resp.status();
        let bytes = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| ProviderError::transport(format!("reading {uri}: {e}")))?
            .to_bytes();

        debug!(%method, %uri, %status, "control api response");

        if status.is_success() {
            Ok(bytes)
        } else {
            Err(classify_response(status, &bytes))
        }
    }
}

/// Map a non-2xx control API response onto a [`ProviderError`].
///
/// The invalid-state check falls back to matching the message text for
/// providers that do not send a structured code.
pub fn classify_response(status: StatusCode, body: &[u8]) -> ProviderError {
    let parsed: ApiErrorBody = serde_json::from_slice(body).unwrap_or_default();
    let message = parsed
        .message
        .clone()
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());
    let detail = match &parsed.code {
        Some(code) => format!("{status} {code}: {message}"),
        None => format!("{status}: {message}"),
    };

    let invalid_state = parsed
        .code
        .as_deref()
        .is_some_and(|code| INVALID_STATE_CODES.contains(&code))
        || message.to_ascii_lowercase().contains("invalid state");

    let kind = if status == StatusCode::NOT_FOUND {
        ProviderErrorKind::NotFound
    } else if invalid_state || status == StatusCode::CONFLICT {
        ProviderErrorKind::InvalidState
    } else if status == StatusCode::GATEWAY_TIMEOUT || status == StatusCode::REQUEST_TIMEOUT {
        ProviderErrorKind::Timeout
    } else {
        ProviderErrorKind::Rejected
    };

    ProviderError::new(kind, detail)
}
