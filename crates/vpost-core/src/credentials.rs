//! Access tokens for the upload API.
//!
//! Per-channel credentials live in `<credentials_dir>/<channel>.json`, in the
//! "authorized user" layout written by Google's client libraries. Only the
//! refresh grant is performed here; minting the first refresh token
//! (the consent flow) is left to those tools.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::http::{self, Method, Timeouts};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Refresh this long before the recorded expiry.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Supplies a bearer token valid for at least the next request.
pub trait CredentialProvider {
    fn access_token(&self) -> Result<String, CredentialError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("the credential file {0} does not exist")]
    MissingFile(PathBuf),
    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("credential file {0} has no refresh_token")]
    NoRefreshToken(PathBuf),
    #[error("token refresh request failed: {0}")]
    Transport(#[from] curl::Error),
    #[error("token endpoint returned HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("token endpoint reply is missing access_token: {0}")]
    BadReply(String),
    #[error("write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A fixed token, e.g. from the environment or a test.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl CredentialProvider for StaticToken {
    fn access_token(&self) -> Result<String, CredentialError> {
        Ok(self.0.clone())
    }
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// On-disk authorized-user record. Unknown keys (scopes, account, ...) are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizedUser {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct RefreshReply {
    access_token: Option<String>,
    expires_in: Option<i64>,
}

impl AuthorizedUser {
    /// True when there is no token or it expires within the skew window.
    /// A token without a recorded expiry is trusted as-is.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match (&self.token, self.expiry) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(_), Some(exp)) => now + ChronoDuration::seconds(EXPIRY_SKEW_SECS) >= exp,
        }
    }

    /// Form body of the refresh grant.
    fn refresh_form(&self, refresh_token: &str) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "refresh_token")
            .append_pair("refresh_token", refresh_token)
            .append_pair("client_id", &self.client_id)
            .append_pair("client_secret", &self.client_secret)
            .finish()
    }

    /// Store the token from a token-endpoint reply.
    fn apply_refresh(&mut self, body: &[u8], now: DateTime<Utc>) -> Result<String, CredentialError> {
        let text = String::from_utf8_lossy(body).into_owned();
        let reply: RefreshReply =
            serde_json::from_slice(body).map_err(|_| CredentialError::BadReply(text.clone()))?;
        let token = reply.access_token.ok_or(CredentialError::BadReply(text))?;
        self.expiry = reply
            .expires_in
            .map(|secs| now + ChronoDuration::seconds(secs));
        self.token = Some(token.clone());
        Ok(token)
    }
}

/// Credentials for one channel, refreshed and persisted on demand.
#[derive(Debug, Clone)]
pub struct AuthorizedUserFile {
    path: PathBuf,
    timeouts: Timeouts,
}

impl AuthorizedUserFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            timeouts: Timeouts {
                connect: Duration::from_secs(15),
                total: Duration::from_secs(30),
            },
        }
    }

    /// `<dir>/<channel>.json`.
    pub fn for_channel(dir: &Path, channel: &str) -> Self {
        Self::new(dir.join(format!("{channel}.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<AuthorizedUser, CredentialError> {
        if !self.path.is_file() {
            return Err(CredentialError::MissingFile(self.path.clone()));
        }
        let data = fs::read(&self.path).map_err(|source| CredentialError::Read {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_slice(&data).map_err(|source| CredentialError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Replace the file atomically (temp file in the same directory, then rename).
    pub fn store(&self, user: &AuthorizedUser) -> Result<(), CredentialError> {
        let write_err = |source: std::io::Error| CredentialError::Write {
            path: self.path.clone(),
            source,
        };
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let json = serde_json::to_vec(user).map_err(|e| write_err(e.into()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(&json).map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;
        Ok(())
    }

    fn refresh(&self, user: &mut AuthorizedUser, refresh_token: &str) -> Result<String, CredentialError> {
        tracing::info!(path = %self.path.display(), "refreshing expired access token");
        let form = user.refresh_form(refresh_token);
        let headers = ["Content-Type: application/x-www-form-urlencoded".to_string()];
        let resp = http::send(
            Method::Post,
            &user.token_uri,
            &headers,
            form.as_bytes(),
            self.timeouts,
        )?;
        if resp.status != 200 {
            return Err(CredentialError::Rejected {
                status: resp.status,
                body: resp.body_text(),
            });
        }
        user.apply_refresh(&resp.body, Utc::now())
    }
}

impl CredentialProvider for AuthorizedUserFile {
    fn access_token(&self) -> Result<String, CredentialError> {
        let mut user = self.load()?;
        let refresh_token = user
            .refresh_token
            .clone()
            .ok_or_else(|| CredentialError::NoRefreshToken(self.path.clone()))?;
        if !user.needs_refresh(Utc::now()) {
            if let Some(token) = &user.token {
                return Ok(token.clone());
            }
        }
        let token = self.refresh(&mut user, &refresh_token)?;
        self.store(&user)?;
        tracing::debug!(path = %self.path.display(), "persisted refreshed token");
        Ok(token)
    }
}
