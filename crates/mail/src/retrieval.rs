//! Retrieval of the signed-in user's most recent messages
//!
//! One list call, then one detail call per id on a dedicated worker pool,
//! then normalization. Output order always follows the list call.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::gmail::api::GmailMessage;
use crate::gmail::{AccessToken, GmailClient, normalize_message, verify_access_token};
use crate::models::{MessageId, NormalizedMessage};

/// Number of recent messages fetched per retrieval
pub const PAGE_SIZE: usize = 10;

/// Source of Gmail messages, abstracted so retrieval can run against fakes
pub trait MailProvider: Send + Sync {
    /// Ids of the newest messages, newest first
    fn list_message_ids(&self, token: &AccessToken, max_results: usize) -> Result<Vec<MessageId>>;

    /// Full message by id
    fn get_message(&self, token: &AccessToken, id: &MessageId) -> Result<GmailMessage>;

    /// Address of the account the token belongs to; fails for rejected tokens
    fn account_email(&self, token: &AccessToken) -> Result<String>;
}

impl MailProvider for GmailClient {
    fn list_message_ids(&self, token: &AccessToken, max_results: usize) -> Result<Vec<MessageId>> {
        let list = self.list_messages(token, max_results)?;
        Ok(list
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|m| MessageId::new(m.id))
            .collect())
    }

    fn get_message(&self, token: &AccessToken, id: &MessageId) -> Result<GmailMessage> {
        GmailClient::get_message(self, token, id)
    }

    fn account_email(&self, token: &AccessToken) -> Result<String> {
        verify_access_token(self, token)
    }
}

/// Why a retrieval produced no messages
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("no access token provided")]
    AuthMissing,
    #[error("failed to fetch message list")]
    List(#[source] anyhow::Error),
    #[error("failed to fetch message {id}")]
    DetailFetch {
        id: MessageId,
        #[source]
        source: anyhow::Error,
    },
}

/// A single message that could not be fetched or parsed
#[derive(Debug)]
pub struct FetchFailure {
    pub id: MessageId,
    pub error: anyhow::Error,
}

impl From<FetchFailure> for RetrievalError {
    fn from(failure: FetchFailure) -> Self {
        RetrievalError::DetailFetch {
            id: failure.id,
            source: failure.error,
        }
    }
}

/// Outcome of a retrieval that tolerates individual message failures
#[derive(Debug, Default)]
pub struct RetrievalReport {
    /// Successfully normalized messages, in list order
    pub messages: Vec<NormalizedMessage>,
    /// Messages that failed, in list order
    pub failures: Vec<FetchFailure>,
}

impl RetrievalReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs the list → detail → normalize pipeline against a [`MailProvider`]
pub struct Retriever<P> {
    provider: P,
    pool: rayon::ThreadPool,
}

impl<P: MailProvider> Retriever<P> {
    /// Create a retriever with one worker per message in a page
    pub fn new(provider: P) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(PAGE_SIZE)
            .thread_name(|i| format!("gmail-fetch-{}", i))
            .build()
            .context("Failed to build fetch thread pool")?;
        Ok(Self { provider, pool })
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Fetch and normalize the most recent messages.
    ///
    /// Fails as a whole if any single message cannot be fetched; the first
    /// failure in list order is reported.
    pub fn fetch_recent(
        &self,
        token: Option<&AccessToken>,
    ) -> Result<Vec<NormalizedMessage>, RetrievalError> {
        let token = token.ok_or(RetrievalError::AuthMissing)?;
        let ids = self.list_ids(token)?;

        let messages = self
            .fetch_all(token, &ids)
            .into_iter()
            .collect::<Result<Vec<_>, FetchFailure>>()?;

        info!("Retrieved {} messages", messages.len());
        Ok(messages)
    }

    /// Like [`fetch_recent`](Self::fetch_recent), but keeps the messages that
    /// did succeed and reports the rest individually.
    ///
    /// A missing token or a failed list call is still fatal.
    pub fn fetch_recent_partial(
        &self,
        token: Option<&AccessToken>,
    ) -> Result<RetrievalReport, RetrievalError> {
        let token = token.ok_or(RetrievalError::AuthMissing)?;
        let ids = self.list_ids(token)?;

        let mut report = RetrievalReport::default();
        for result in self.fetch_all(token, &ids) {
            match result {
                Ok(message) => report.messages.push(message),
                Err(failure) => {
                    warn!("Skipping message {}: {:#}", failure.id, failure.error);
                    report.failures.push(failure);
                }
            }
        }

        info!(
            "Retrieved {} messages ({} failed)",
            report.messages.len(),
            report.failures.len()
        );
        Ok(report)
    }

    fn list_ids(&self, token: &AccessToken) -> Result<Vec<MessageId>, RetrievalError> {
        let ids = self
            .provider
            .list_message_ids(token, PAGE_SIZE)
            .map_err(RetrievalError::List)?;
        debug!("List call returned {} message ids", ids.len());
        Ok(ids)
    }

    /// Fetch every id concurrently; results line up with `ids`
    fn fetch_all(
        &self,
        token: &AccessToken,
        ids: &[MessageId],
    ) -> Vec<Result<NormalizedMessage, FetchFailure>> {
        self.pool
            .install(|| ids.par_iter().map(|id| self.fetch_one(token, id)).collect())
    }

    fn fetch_one(
        &self,
        token: &AccessToken,
        id: &MessageId,
    ) -> Result<NormalizedMessage, FetchFailure> {
        let raw = self
            .provider
            .get_message(token, id)
            .map_err(|error| FetchFailure {
                id: id.clone(),
                error,
            })?;
        normalize_message(raw).map_err(|e| FetchFailure {
            id: id.clone(),
            error: e.into(),
        })
    }
}
