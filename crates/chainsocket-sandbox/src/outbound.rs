//! Outbound HTTP on behalf of guests.
//!
//! Guests have no network access of their own.  The `http_request` import
//! hands a JSON [`OutboundRequest`] to the host, which checks the target host
//! against the instance's allow-list and performs the request with `reqwest`
//! on the ambient tokio runtime.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, SandboxError};

/// A guest's HTTP request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundRequest {
    #[serde(default = "default_method")]
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".to_owned()
}

/// What the guest gets back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundResponse {
    pub status: u16,
    pub body: String,
}

/// Parse `url` and verify that its host is in `allowed`.
pub fn check_allowed(url: &str, allowed: &BTreeSet<String>) -> Result<Url> {
    let parsed =
        Url::parse(url).map_err(|e| SandboxError::Outbound(format!("invalid url '{url}': {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(SandboxError::Outbound(format!(
                "unsupported url scheme '{other}'"
            )));
        }
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| SandboxError::Outbound(format!("url '{url}' has no host")))?;

    if !allowed.contains(host) {
        return Err(SandboxError::OutboundDenied {
            host: host.to_owned(),
        });
    }

    Ok(parsed)
}

/// Perform `request`, blocking the current thread until the response body is
/// read.
///
/// Must run on a thread where a tokio runtime handle is available but which is
/// not itself driving async tasks (e.g. inside `spawn_blocking`).
pub(crate) fn send(
    client: &reqwest::Client,
    request: OutboundRequest,
    allowed: &BTreeSet<String>,
    timeout: Duration,
) -> Result<OutboundResponse> {
    let url = check_allowed(&request.url, allowed)?;
    let method = reqwest::Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
        .map_err(|e| SandboxError::Outbound(format!("invalid method '{}': {e}", request.method)))?;

    let handle = tokio::runtime::Handle::try_current().map_err(|_| {
        SandboxError::Outbound("no tokio runtime available to drive the request".into())
    })?;

    tracing::debug!(
        method = %method,
        host = url.host_str().unwrap_or_default(),
        "performing outbound request"
    );

    let mut builder = client.request(method, url).timeout(timeout);
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(body) = request.body {
        builder = builder.body(body);
    }

    handle.block_on(async move {
        let response = builder
            .send()
            .await
            .map_err(|e| SandboxError::Outbound(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| SandboxError::Outbound(e.to_string()))?;
        Ok(OutboundResponse { status, body })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allow(hosts: &[&str]) -> BTreeSet<String> {
        hosts.iter().map(|h| (*h).to_owned()).collect()
    }

    #[test]
    fn allowed_host_passes() {
        let url = check_allowed(
            "https://api.openai.com/v1/chat/completions",
            &allow(&["api.openai.com"]),
        )
        .expect("host is on the allow-list");
        assert_eq!(url.path(), "/v1/chat/completions");
    }

    #[test]
    fn unlisted_host_is_denied() {
        let err = check_allowed("https://evil.example/x", &allow(&["api.openai.com"]))
            .expect_err("host is not on the allow-list");
        match err {
            SandboxError::OutboundDenied { host } => assert_eq!(host, "evil.example"),
            other => panic!("expected OutboundDenied, got: {other}"),
        }
    }

    #[test]
    fn subdomains_are_not_implicitly_allowed() {
        let result = check_allowed("https://x.serpapi.com/", &allow(&["serpapi.com"]));
        assert!(matches!(result, Err(SandboxError::OutboundDenied { .. })));
    }

    #[test]
    fn non_http_scheme_is_rejected() {
        let result = check_allowed("file:///etc/passwd", &allow(&["api.openai.com"]));
        assert!(matches!(result, Err(SandboxError::Outbound(_))));
    }

    #[test]
    fn garbage_url_is_rejected() {
        let result = check_allowed("not a url", &allow(&["api.openai.com"]));
        assert!(matches!(result, Err(SandboxError::Outbound(_))));
    }

    #[test]
    fn request_defaults_to_get() {
        let req: OutboundRequest =
            serde_json::from_str(r#"{"url":"https://serpapi.com/search"}"#).unwrap();
        assert_eq!(req.method, "GET");
        assert!(req.headers.is_empty());
        assert!(req.body.is_none());
    }

    #[test]
    fn send_without_runtime_fails_cleanly() {
        let client = reqwest::Client::new();
        let req = OutboundRequest {
            method: "GET".into(),
            url: "https://serpapi.com/search".into(),
            headers: BTreeMap::new(),
            body: None,
        };
        let result = send(
            &client,
            req,
            &allow(&["serpapi.com"]),
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(SandboxError::Outbound(_))));
    }
}
