// gait-broker/src/source/http.rs
// ============================================================================
// Module: HTTP Credential Source
// Description: Resolves `https://...` broker references by POSTing a scope
// request and parsing a `{credential_ref}` response.
// Purpose: Support an operator-run credential broker service.
// Dependencies: reqwest (blocking, rustls-tls), url
// ============================================================================

//! ## Overview
//! Adapted from the teacher's `decision-gate-broker::source::http::HttpSource`:
//! no redirects followed, a bounded response size, and [`crate::net::HttpSourcePolicy`]
//! enforced before any request is sent. The request/response shape changes
//! from a GET-and-return-bytes payload fetch to a POST-scope-request/
//! JSON-credential-response exchange, since this source grants credentials
//! rather than resolving content.

use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use serde::Deserialize;
use url::Url;

use crate::net::HttpSourcePolicy;
use crate::source::CredentialSource;
use crate::source::SourceError;

/// Maximum broker response body size accepted.
const MAX_RESPONSE_BYTES: u64 = 64 * 1024;

#[derive(Debug, Deserialize)]
struct BrokerResponse {
    credential_ref: String,
}

/// HTTP-backed credential source.
#[derive(Debug, Clone)]
pub struct HttpCredentialSource {
    client: Client,
    policy: HttpSourcePolicy,
}

impl HttpCredentialSource {
    /// Builds an HTTP credential source enforcing `policy`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(policy: HttpSourcePolicy) -> Result<Self, SourceError> {
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|err| SourceError::Http(err.to_string()))?;
        Ok(Self { client, policy })
    }
}

impl CredentialSource for HttpCredentialSource {
    fn resolve(&self, reference: &str, scopes: &[String]) -> Result<String, SourceError> {
        let url = Url::parse(reference).map_err(|err| SourceError::InvalidReference(err.to_string()))?;
        if url.scheme() != "https" {
            return Err(SourceError::UnsupportedScheme(url.scheme().to_string()));
        }
        self.policy.enforce(&url).map_err(|err| SourceError::Policy(err.to_string()))?;

        let body = serde_json::to_vec(&serde_json::json!({ "scopes": scopes })).map_err(|err| SourceError::MalformedResponse(err.to_string()))?;
        let response = self
            .client
            .post(url.as_str())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(|err| SourceError::Http(err.to_string()))?;
        if !response.status().is_success() {
            return Err(SourceError::Http(format!("broker returned status {}", response.status())));
        }
        let mut limited = response.take(MAX_RESPONSE_BYTES + 1);
        let mut bytes = Vec::new();
        limited.read_to_end(&mut bytes).map_err(|err| SourceError::Http(err.to_string()))?;
        if bytes.len() as u64 > MAX_RESPONSE_BYTES {
            return Err(SourceError::MalformedResponse("broker response exceeds size limit".to_string()));
        }
        let parsed: BrokerResponse = serde_json::from_slice(&bytes).map_err(|err| SourceError::MalformedResponse(err.to_string()))?;
        Ok(parsed.credential_ref)
    }
}
