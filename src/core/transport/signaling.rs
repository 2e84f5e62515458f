//! HTTP signaling for the realtime service.
//!
//! The local SDP offer is POSTed as the raw request body to the signaling
//! endpoint (`?model=<model>`), authenticated with a bearer key and the
//! protocol-version header. The response body is the raw SDP answer.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;
use zeroize::Zeroizing;

use super::{SdpKind, SessionDescription, SignalingClient};
use crate::config::SessionConfig;
use crate::core::realtime::{PROTOCOL_VERSION, PROTOCOL_VERSION_HEADER};
use crate::core::session::base::{SessionError, SessionResult};

/// Connect timeout for the signaling request.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Signaling client speaking the SDP-over-HTTP exchange.
pub struct HttpSignalingClient {
    http_client: Client,
    endpoint: Url,
    api_key: Zeroizing<String>,
}

impl HttpSignalingClient {
    /// Create a client for `endpoint` negotiating sessions for `model`.
    pub fn new(
        endpoint: &str,
        model: &str,
        api_key: &str,
        timeout: Duration,
    ) -> SessionResult<Self> {
        let mut endpoint = Url::parse(endpoint).map_err(|e| {
            SessionError::InvalidConfiguration(format!("Invalid signaling URL '{endpoint}': {e}"))
        })?;
        endpoint.query_pairs_mut().append_pair("model", model);

        let http_client = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|e| {
                SessionError::InvalidConfiguration(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            http_client,
            endpoint,
            api_key: Zeroizing::new(api_key.to_string()),
        })
    }

    /// Build a client from session configuration.
    pub fn from_config(config: &SessionConfig) -> SessionResult<Self> {
        Self::new(
            &config.signaling_url,
            config.model.wire_name(),
            config.api_key().unwrap_or_default(),
            config.timing.signaling_timeout,
        )
    }

    /// Full request URL including the model query.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl fmt::Debug for HttpSignalingClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSignalingClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl SignalingClient for HttpSignalingClient {
    async fn exchange(&self, offer: &SessionDescription) -> SessionResult<SessionDescription> {
        if offer.kind != SdpKind::Offer {
            return Err(SessionError::Signaling(
                "Only offers can be exchanged".to_string(),
            ));
        }

        debug!(endpoint = %self.endpoint, bytes = offer.sdp.len(), "Posting SDP offer");

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .header("Authorization", format!("Bearer {}", self.api_key.as_str()))
            .header("Content-Type", "application/sdp")
            .header(PROTOCOL_VERSION_HEADER, PROTOCOL_VERSION)
            .body(offer.sdp.clone())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SessionError::Signaling(format!("Request timed out: {e}"))
                } else {
                    SessionError::Signaling(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SessionError::Signaling(format!("Failed to read answer: {e}")))?;

        if !status.is_success() {
            warn!(%status, "Signaling rejected");
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    SessionError::AuthenticationFailed(format!("{status}: {body}"))
                }
                _ => SessionError::Signaling(format!("{status}: {body}")),
            });
        }

        if body.trim().is_empty() {
            return Err(SessionError::Signaling("Empty SDP answer".to_string()));
        }

        Ok(SessionDescription::answer(body))
    }
}
