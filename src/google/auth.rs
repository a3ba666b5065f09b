//! OAuth 2.0 installed-application flow for the Photos Library API.
//!
//! The first run prints a consent URL and reads the authorization code from
//! stdin; the resulting token is cached on disk and refreshed as it expires.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CatalogError;

pub const PHOTOS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/photoslibrary.readonly";

/// Refresh this long before the token actually expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Supplies bearer tokens for API calls.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, CatalogError>;
}

/// OAuth client description as downloaded from the Google Cloud console.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

#[derive(Deserialize)]
struct SecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read client secrets from {}", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("invalid client secrets in {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file: SecretsFile = serde_json::from_str(raw)?;
        file.installed
            .or(file.web)
            .ok_or_else(|| anyhow!("expected an \"installed\" or \"web\" client section"))
    }

    fn redirect_uri(&self) -> &str {
        self.redirect_uris
            .first()
            .map(String::as_str)
            .unwrap_or("http://localhost")
    }

    /// Consent page the user has to visit to grant read-only library access.
    pub fn authorization_url(&self) -> Result<Url> {
        Url::parse_with_params(
            &self.auth_uri,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri()),
                ("response_type", "code"),
                ("scope", PHOTOS_READONLY_SCOPE),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", "state-token"),
            ],
        )
        .with_context(|| format!("invalid auth_uri {}", self.auth_uri))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl Token {
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry - ChronoDuration::seconds(EXPIRY_MARGIN_SECS) <= now,
            None => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

impl TokenResponse {
    fn into_token(self, previous_refresh: Option<String>, now: DateTime<Utc>) -> Token {
        Token {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            token_type: self.token_type,
            expiry: self
                .expires_in
                .map(|secs| now + ChronoDuration::seconds(secs)),
        }
    }
}

/// JSON token cache on disk, readable by the owner only.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Token> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read token cache {}", self.path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid token cache {}", self.path.display()))
    }

    pub fn save(&self, token: &Token) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;
        serde_json::to_writer_pretty(&mut file, token)?;
        file.flush()
    }
}

/// Holds the current token and refreshes it on demand.
pub struct Authenticator {
    http: Client,
    secrets: ClientSecrets,
    store: TokenStore,
    token: Mutex<Token>,
}

impl Authenticator {
    pub fn new(http: Client, secrets: ClientSecrets, store: TokenStore, token: Token) -> Self {
        Self {
            http,
            secrets,
            store,
            token: Mutex::new(token),
        }
    }

    /// Loads the cached token, falling back to the interactive consent flow.
    /// Firing `cancel` while waiting for the authorization code aborts setup.
    pub async fn bootstrap(
        http: Client,
        secrets: ClientSecrets,
        store: TokenStore,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let token = match store.load() {
            Ok(token) => {
                debug!(path = %store.path().display(), "loaded cached token");
                token
            }
            Err(err) => {
                info!("no usable cached token ({err:#}); starting authorization");
                let code = prompt_for_code(&secrets.authorization_url()?, cancel).await?;
                let token = exchange_code(&http, &secrets, &code)
                    .await
                    .context("authorization code exchange failed")?;
                println!("Saving credential file to: {}", store.path().display());
                store
                    .save(&token)
                    .with_context(|| format!("failed to save token to {}", store.path().display()))?;
                token
            }
        };
        Ok(Self::new(http, secrets, store, token))
    }

    async fn refresh(&self, current: &Token) -> Result<Token, CatalogError> {
        let refresh_token = current.refresh_token.clone().ok_or_else(|| {
            CatalogError::Unauthorized("token expired and no refresh token is available".into())
        })?;
        let response = self
            .http
            .post(&self.secrets.token_uri)
            .form(&[
                ("client_id", self.secrets.client_id.as_str()),
                ("client_secret", self.secrets.client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;
        let token = parse_token_response(response)
            .await?
            .into_token(Some(refresh_token), Utc::now());
        info!(expiry = ?token.expiry, "access token refreshed");
        Ok(token)
    }
}

#[async_trait]
impl TokenSource for Authenticator {
    async fn access_token(&self) -> Result<String, CatalogError> {
        let mut token = self.token.lock().await;
        if token.needs_refresh(Utc::now()) {
            let fresh = self.refresh(&token).await?;
            if let Err(err) = self.store.save(&fresh) {
                warn!(path = %self.store.path().display(), "failed to persist refreshed token: {err}");
            }
            *token = fresh;
        }
        Ok(token.access_token.clone())
    }
}

async fn exchange_code(
    http: &Client,
    secrets: &ClientSecrets,
    code: &str,
) -> Result<Token, CatalogError> {
    let response = http
        .post(&secrets.token_uri)
        .form(&[
            ("code", code),
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
            ("redirect_uri", secrets.redirect_uri()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await?;
    Ok(parse_token_response(response)
        .await?
        .into_token(None, Utc::now()))
}

async fn parse_token_response(response: reqwest::Response) -> Result<TokenResponse, CatalogError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(CatalogError::from_status(status.as_u16(), body));
    }
    Ok(serde_json::from_str(&body)?)
}

async fn prompt_for_code(url: &Url, cancel: &CancellationToken) -> Result<String> {
    println!(
        "Go to the following link in your browser then type the authorization code:\n{url}"
    );
    await_code(
        || {
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        },
        cancel,
    )
    .await
}

/// Runs `read` on its own thread and waits for the code or for `cancel`.
///
/// A plain thread rather than the blocking pool: a read stuck on stdin must
/// not hold up runtime shutdown once setup is abandoned.
async fn await_code<F>(read: F, cancel: &CancellationToken) -> Result<String>
where
    F: FnOnce() -> io::Result<String> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    std::thread::Builder::new()
        .name("auth-code-reader".into())
        .spawn(move || {
            let _ = tx.send(read());
        })
        .context("failed to start stdin reader")?;

    let line = tokio::select! {
        biased;
        _ = cancel.cancelled() => anyhow::bail!("authorization cancelled"),
        line = rx => line
            .context("stdin reader exited")?
            .context("failed to read authorization code")?,
    };

    let code = line.trim().to_string();
    anyhow::ensure!(!code.is_empty(), "no authorization code entered");
    Ok(code)
}
