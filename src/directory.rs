//! # Directory Module
//!
//! Sources of allocation-directory entries. Entries are returned raw; the
//! enrichment stage decides which ones are well formed.
//!
//! The HTTP source authenticates against Keycloak with client credentials and
//! then lists every allocation in one request. Failures are not retried; the
//! upstream status is surfaced so the operator can re-run.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{InvoiceError, Result};

pub const DEFAULT_KEYCLOAK_URL: &str = "https://keycloak.mss.mghpcc.org";
pub const DEFAULT_COLDFRONT_URL: &str = "https://coldfront.mss.mghpcc.org/api/allocations";
const TOKEN_PATH: &str = "/auth/realms/mss/protocol/openid-connect/token";
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Anything that can list allocation entries
pub trait AllocationDirectory {
    fn fetch_allocations(&self) -> Result<Vec<Value>>;
}

/// Entries held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    entries: Vec<Value>,
}

impl StaticDirectory {
    pub fn new(entries: Vec<Value>) -> Self {
        StaticDirectory { entries }
    }
}

impl AllocationDirectory for StaticDirectory {
    fn fetch_allocations(&self) -> Result<Vec<Value>> {
        Ok(self.entries.clone())
    }
}

/// A saved directory response, a JSON array of entries
#[derive(Debug, Clone)]
pub struct FileDirectory {
    path: PathBuf,
}

impl FileDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileDirectory { path: path.into() }
    }
}

impl AllocationDirectory for FileDirectory {
    fn fetch_allocations(&self) -> Result<Vec<Value>> {
        tracing::info!(path = %self.path.display(), "using saved allocation directory data");
        let raw = std::fs::read_to_string(&self.path)?;
        let entries: Vec<Value> = serde_json::from_str(&raw)?;
        Ok(entries)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Live directory API behind Keycloak client-credentials auth
#[derive(Debug, Clone)]
pub struct HttpDirectory {
    keycloak_url: String,
    directory_url: String,
    client_id: String,
    client_secret: String,
}

impl HttpDirectory {
    pub fn new(
        keycloak_url: impl Into<String>,
        directory_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        HttpDirectory {
            keycloak_url: keycloak_url.into(),
            directory_url: directory_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    fn agent() -> ureq::Agent {
        ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
            .http_status_as_error(false)
            .build()
            .into()
    }

    fn token_url(&self) -> String {
        format!("{}{TOKEN_PATH}", self.keycloak_url.trim_end_matches('/'))
    }

    fn access_token(&self, agent: &ureq::Agent) -> Result<String> {
        let mut response = agent
            .post(&self.token_url())
            .header(
                "Authorization",
                basic_auth(&self.client_id, &self.client_secret),
            )
            .send_form([("grant_type", "client_credentials")])
            .map_err(|e| transport_error("Keycloak authentication", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.body_mut().read_to_string().unwrap_or_default();
            return Err(InvoiceError::Directory {
                status: status.as_u16().to_string(),
                message: format!("Keycloak authentication failed: {body}"),
            });
        }

        let token: TokenResponse = response
            .body_mut()
            .read_json()
            .map_err(|e| transport_error("Keycloak token response", e))?;
        Ok(token.access_token)
    }
}

/// `client_secret_basic` credentials for the token endpoint
fn basic_auth(client_id: &str, client_secret: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{client_id}:{client_secret}")))
}

fn transport_error(context: &str, err: ureq::Error) -> InvoiceError {
    InvoiceError::Directory {
        status: "transport".to_string(),
        message: format!("{context}: {err}"),
    }
}

impl AllocationDirectory for HttpDirectory {
    fn fetch_allocations(&self) -> Result<Vec<Value>> {
        let agent = Self::agent();
        let token = self.access_token(&agent)?;

        tracing::info!(url = %self.directory_url, "fetching allocations");
        let mut response = agent
            .get(&self.directory_url)
            .query("all", "true")
            .header("Authorization", format!("Bearer {token}"))
            .header("Accept", "application/json")
            .call()
            .map_err(|e| transport_error("allocation request", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.body_mut().read_to_string().unwrap_or_default();
            return Err(InvoiceError::Directory {
                status: status.as_u16().to_string(),
                message: body,
            });
        }

        response
            .body_mut()
            .read_json::<Vec<Value>>()
            .map_err(|e| transport_error("allocation response", e))
    }
}
