//! Runtime settings for the glance binary
//!
//! Read from `settings.json` in the Glance config directory when present,
//! then overridden by environment variables:
//! - `GLANCE_ADDR` - listen address for `glance serve`
//! - `GLANCE_GMAIL_API_URL` - Gmail API base URL
//! - `OPENAI_API_KEY` - enables `/api/synthesis`
//! - `OPENAI_BASE_URL` - OpenAI-compatible endpoint for summaries

use anyhow::Result;
use mail::{GmailClient, Summarizer};
use serde::Deserialize;

const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub listen_addr: String,
    pub gmail_api_url: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub summary_model: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:3000".to_string(),
            gmail_api_url: GmailClient::BASE_URL.to_string(),
            openai_api_key: None,
            openai_base_url: None,
            summary_model: None,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let mut settings = if config::config_exists(SETTINGS_FILE) {
            config::load_json(SETTINGS_FILE)?
        } else {
            Self::default()
        };
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Override fields from non-empty variables returned by `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(addr) = var("GLANCE_ADDR") {
            self.listen_addr = addr;
        }
        if let Some(url) = var("GLANCE_GMAIL_API_URL") {
            self.gmail_api_url = url;
        }
        if let Some(key) = var("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Some(url) = var("OPENAI_BASE_URL") {
            self.openai_base_url = Some(url);
        }
    }

    pub fn gmail_client(&self) -> GmailClient {
        GmailClient::with_base_url(&self.gmail_api_url)
    }

    /// Summarizer, if an API key is configured
    pub fn summarizer(&self) -> Option<Summarizer> {
        let key = self.openai_api_key.as_deref()?;
        let mut summarizer = Summarizer::new(key);
        if let Some(url) = &self.openai_base_url {
            summarizer = summarizer.with_base_url(url);
        }
        if let Some(model) = &self.summary_model {
            summarizer = summarizer.with_model(model);
        }
        Some(summarizer)
    }
}
