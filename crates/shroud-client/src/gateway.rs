//! HTTP client for the decryption gateway

use std::time::Duration;

use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ClientError, Result};

/// Response from the public key endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyResponse {
    pub public_key: String,
    #[serde(default)]
    pub public_key_id: Option<String>,
}

/// Body of the decryption status endpoint
///
/// Gateways report progress in slightly different shapes, so every field is
/// optional and classification happens in [`classify_poll`].
#[derive(Debug, Default, Deserialize)]
struct DecryptResponse {
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    rejected: bool,
}

/// Result of a single decryption status poll
#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus {
    /// Plaintext is available
    Ready(Value),
    /// Gateway has not produced a result yet
    Pending,
    /// Gateway refused the request; polling must stop
    Rejected(String),
}

const REJECTED_STATUSES: [&str; 3] = ["rejected", "failed", "invalid"];

/// Gateway client for key distribution and decryption status
#[derive(Clone)]
pub struct GatewayClient {
    http: Client,
    base_url: String,
    base: Url,
}

impl GatewayClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let invalid = |reason: String| ClientError::InvalidGatewayUrl {
            url: base_url.clone(),
            reason,
        };

        let base = Url::parse(&base_url).map_err(|e| invalid(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(invalid("not a hierarchical URL".to_string()));
        }

        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url,
            base,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Append path segments to the base URL, percent-encoding each one
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Fetch the engine public key
    pub async fn fetch_public_key(&self) -> Result<PublicKeyResponse> {
        let url = self.endpoint(&["fhe-key"]).to_string();
        let failed = |reason: String| ClientError::PublicKeyFetchFailed {
            url: url.clone(),
            reason,
        };

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(failed(format!("status {}: {}", status, body)));
        }

        let key: PublicKeyResponse = resp
            .json()
            .await
            .map_err(|e| failed(format!("malformed body: {}", e)))?;

        if key.public_key.trim().is_empty() {
            return Err(failed("empty public key".to_string()));
        }

        crate::metrics::record_key_fetch();
        Ok(key)
    }

    /// Poll the decryption status of one request
    ///
    /// An `Err` here is transient (network failure, unexpected status without
    /// a rejection body); callers keep polling.
    pub async fn poll_decryption(&self, request_id: &str) -> Result<PollStatus> {
        let url = self.endpoint(&["decrypt", request_id]).to_string();
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        classify_poll(status.is_success(), &body).ok_or(ClientError::GatewayStatus {
            status: status.as_u16(),
            url,
        })
    }
}

/// Classify a poll response; `None` means a transient failure
fn classify_poll(success: bool, body: &str) -> Option<PollStatus> {
    let parsed: Option<DecryptResponse> = serde_json::from_str(body).ok();

    let Some(parsed) = parsed else {
        // Unparsable bodies carry no rejection, so a 2xx is still just "not yet"
        return success.then_some(PollStatus::Pending);
    };

    if let Some(value) = parsed.value.filter(|v| !v.is_null()) {
        return Some(PollStatus::Ready(value));
    }

    let status = parsed.status.as_deref().map(str::to_ascii_lowercase);
    let rejected = parsed.rejected
        || status
            .as_deref()
            .is_some_and(|s| REJECTED_STATUSES.contains(&s));
    if rejected {
        let reason = parsed
            .reason
            .or(parsed.error)
            .or(parsed.status)
            .unwrap_or_else(|| "rejected".to_string());
        return Some(PollStatus::Rejected(reason));
    }

    success.then_some(PollStatus::Pending)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_value() {
        assert_eq!(
            classify_poll(true, r#"{"value": 42}"#),
            Some(PollStatus::Ready(json!(42)))
        );
        assert_eq!(
            classify_poll(true, r#"{"value": true, "status": "done"}"#),
            Some(PollStatus::Ready(json!(true)))
        );
    }

    #[test]
    fn test_classify_pending() {
        assert_eq!(classify_poll(true, r#"{"status": "pending"}"#), Some(PollStatus::Pending));
        assert_eq!(classify_poll(true, r#"{"value": null}"#), Some(PollStatus::Pending));
        assert_eq!(classify_poll(true, "not json"), Some(PollStatus::Pending));
    }

    #[test]
    fn test_classify_rejection() {
        assert_eq!(
            classify_poll(false, r#"{"status": "rejected", "reason": "no ACL permission"}"#),
            Some(PollStatus::Rejected("no ACL permission".into()))
        );
        assert_eq!(
            classify_poll(true, r#"{"status": "FAILED", "error": "bad handle"}"#),
            Some(PollStatus::Rejected("bad handle".into()))
        );
        assert_eq!(
            classify_poll(false, r#"{"rejected": true}"#),
            Some(PollStatus::Rejected("rejected".into()))
        );
    }

    #[test]
    fn test_classify_transient() {
        assert_eq!(classify_poll(false, ""), None);
        assert_eq!(classify_poll(false, r#"{"status": "pending"}"#), None);
        assert_eq!(classify_poll(false, "<html>502</html>"), None);
    }

    #[test]
    fn test_base_url_trimmed() {
        let gw = GatewayClient::new("http://localhost:7077/", Duration::from_secs(1)).unwrap();
        assert_eq!(gw.base_url(), "http://localhost:7077");
    }

    #[test]
    fn test_request_id_is_one_path_segment() {
        let gw = GatewayClient::new("http://localhost:7077/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(gw.endpoint(&["fhe-key"]).as_str(), "http://localhost:7077/api/fhe-key");
        assert_eq!(
            gw.endpoint(&["decrypt", "evt/7?x#y"]).as_str(),
            "http://localhost:7077/api/decrypt/evt%2F7%3Fx%23y"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = GatewayClient::new("not a url", Duration::from_secs(1)).err().unwrap();
        assert!(matches!(err, ClientError::InvalidGatewayUrl { .. }));

        let err = GatewayClient::new("mailto:gw@example.com", Duration::from_secs(1)).err().unwrap();
        assert!(matches!(err, ClientError::InvalidGatewayUrl { .. }));
    }
}
