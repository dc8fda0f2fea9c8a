//! Gmail API HTTP client
//!
//! Provides methods for fetching messages from the Gmail API.
//! Uses synchronous HTTP (ureq) to be executor-agnostic. The access token is
//! passed to every call; the client itself holds no credentials.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use super::AccessToken;
use super::api::{GmailMessage, ListMessagesResponse, ProfileResponse};
use crate::models::MessageId;

/// Gmail API client for fetching messages
#[derive(Debug, Clone)]
pub struct GmailClient {
    base_url: String,
}

impl Default for GmailClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GmailClient {
    /// Gmail API base URL
    pub const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// Create a client for the public Gmail API
    pub fn new() -> Self {
        Self::with_base_url(Self::BASE_URL)
    }

    /// Create a client for another host serving the same API
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List message IDs from the user's mailbox, newest first
    ///
    /// # Arguments
    /// * `token` - Bearer credential for the signed-in user
    /// * `max_results` - Maximum number of messages to return (1-500)
    pub fn list_messages(
        &self,
        token: &AccessToken,
        max_results: usize,
    ) -> Result<ListMessagesResponse> {
        let url = format!(
            "{}/users/me/messages?maxResults={}",
            self.base_url,
            max_results.clamp(1, 500)
        );
        self.get_json(&url, token, "list messages")
    }

    /// Get full message details by ID
    pub fn get_message(&self, token: &AccessToken, id: &MessageId) -> Result<GmailMessage> {
        let url = format!(
            "{}/users/me/messages/{}?format=full",
            self.base_url,
            urlencoding::encode(id.as_str())
        );
        self.get_json(&url, token, "get message")
    }

    /// Get the profile of the account the token belongs to
    pub fn get_profile(&self, token: &AccessToken) -> Result<ProfileResponse> {
        let url = format!("{}/users/me/profile", self.base_url);
        self.get_json(&url, token, "get profile")
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        token: &AccessToken,
        what: &str,
    ) -> Result<T> {
        let mut response = ureq::get(url)
            .header("Authorization", &token.bearer_header())
            .call()
            .with_context(|| format!("Failed to send {} request", what))?;

        response
            .body_mut()
            .read_json()
            .with_context(|| format!("Failed to parse {} response", what))
    }
}
