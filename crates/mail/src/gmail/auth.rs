//! Access tokens and Gmail sign-in
//!
//! The web API receives tokens obtained by the browser and only verifies
//! them. The CLI signs in on its own with the OAuth2 authorization code flow,
//! receiving the callback on a loopback listener, and keeps the resulting
//! access token in the config directory until it expires or the user logs
//! out. Tokens are never refreshed; an expired session means signing in again.

use anyhow::{Context, Result};
use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};

use super::GmailClient;
use crate::config::GmailCredentials;

/// Bearer credential for Gmail API calls
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Extract the token from an `Authorization: Bearer <token>` header value
    pub fn from_authorization_header(value: &str) -> Option<Self> {
        let token = value.split_once("Bearer ")?.1.trim();
        if token.is_empty() {
            None
        } else {
            Some(Self::new(token))
        }
    }

    pub fn secret(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` request header
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Check a token against Gmail and return the account's email address
pub fn verify_access_token(client: &GmailClient, token: &AccessToken) -> Result<String> {
    let profile = client
        .get_profile(token)
        .context("Access token rejected by Gmail")?;
    Ok(profile.email_address)
}

/// Signed-in state persisted between CLI runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    /// Unix timestamp (seconds) after which the token is no longer usable
    pub expires_at: Option<i64>,
}

impl Session {
    /// Seconds of validity a token must have left to be used
    const EXPIRY_MARGIN_SECS: i64 = 60;

    const SESSION_FILE: &'static str = "session.json";

    /// Session file in the Glance config directory
    pub fn default_path() -> Result<PathBuf> {
        config::config_path(Self::SESSION_FILE).context("Could not determine config directory")
    }

    /// Load the stored session, if there is one that has not expired
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let session: Session = config::load_json_file(path)?;
        if session.is_expired_at(Utc::now().timestamp()) {
            info!("Stored Gmail session has expired");
            return Ok(None);
        }
        Ok(Some(session))
    }

    /// Write the session, readable only by the current user on unix
    pub fn save(&self, path: &Path) -> Result<()> {
        config::save_private_json_file(path, self)
    }

    /// Forget the stored session. Returns whether one existed.
    pub fn clear(path: &Path) -> Result<bool> {
        config::remove_file(path)
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at
            .is_some_and(|at| at <= now + Self::EXPIRY_MARGIN_SECS)
    }

    pub fn token(&self) -> AccessToken {
        AccessToken::new(self.access_token.clone())
    }
}

/// Token response from Google
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
    #[allow(dead_code)]
    token_type: String,
}

/// Browser sign-in for the command line front end
pub struct LocalAuth {
    credentials: GmailCredentials,
}

impl LocalAuth {
    const AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";
    const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    /// Read-only mailbox access is all the viewer needs
    const GMAIL_READONLY_SCOPE: &'static str = "https://www.googleapis.com/auth/gmail.readonly";

    /// Port range to try for the loopback callback listener
    const PORT_RANGE_START: u16 = 8080;
    const PORT_RANGE_END: u16 = 8090;

    pub fn new(credentials: GmailCredentials) -> Self {
        Self { credentials }
    }

    /// Run the authorization code flow and return the new session
    pub fn login(&self) -> Result<Session> {
        let (listener, port) = Self::start_local_server()?;
        let redirect_uri = format!("http://localhost:{}", port);
        let auth_url = self.authorization_url(&redirect_uri);

        println!("Opening browser for Gmail sign-in...");
        println!("If the browser doesn't open, visit: {}", auth_url);
        if let Err(e) = open::that(&auth_url) {
            warn!("Failed to open browser: {}", e);
        }

        let code = Self::wait_for_callback(listener)?;

        info!("Exchanging authorization code for an access token");
        let mut response = ureq::post(Self::TOKEN_URL)
            .send_form([
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("code", code.as_str()),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri.as_str()),
            ])
            .context("Failed to exchange authorization code")?;

        let token: TokenResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse token response")?;

        Ok(Session {
            access_token: token.access_token,
            expires_at: token
                .expires_in
                .map(|secs| Utc::now().timestamp() + secs as i64),
        })
    }

    fn authorization_url(&self, redirect_uri: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}",
            Self::AUTH_URL,
            urlencoding::encode(&self.credentials.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(Self::GMAIL_READONLY_SCOPE),
        )
    }

    fn start_local_server() -> Result<(TcpListener, u16)> {
        for port in Self::PORT_RANGE_START..=Self::PORT_RANGE_END {
            if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)) {
                return Ok((listener, port));
            }
        }
        anyhow::bail!(
            "Could not bind to any port in range {}-{}",
            Self::PORT_RANGE_START,
            Self::PORT_RANGE_END
        )
    }

    /// Accept one callback request and answer the browser
    fn wait_for_callback(listener: TcpListener) -> Result<String> {
        let (mut stream, _) = listener.accept().context("Failed to accept connection")?;

        let mut request_line = String::new();
        BufReader::new(&stream)
            .read_line(&mut request_line)
            .context("Failed to read callback request")?;

        let result = parse_callback(&request_line);
        let (status, body) = if result.is_ok() {
            ("200 OK", "Signed in. You can close this window.")
        } else {
            ("400 Bad Request", "Sign-in failed. Please try again.")
        };
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n<html><body><h1>{}</h1></body></html>",
            status, body
        );
        if let Err(e) = stream.write_all(response.as_bytes()) {
            warn!("Failed to answer OAuth callback: {}", e);
        }

        result
    }
}

/// Pull the authorization code out of a callback request line
/// (`GET /?code=...&scope=... HTTP/1.1`)
fn parse_callback(request_line: &str) -> Result<String> {
    let target = request_line
        .split_whitespace()
        .nth(1)
        .context("Malformed callback request")?;
    let url = url::Url::parse(&format!("http://localhost{}", target))
        .context("Malformed callback URL")?;

    let mut code = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "error" => anyhow::bail!("OAuth error: {}", value),
            "code" => code = Some(value.into_owned()),
            _ => {}
        }
    }
    code.context("No authorization code received")
}
