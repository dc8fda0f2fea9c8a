//! Mail crate - Gmail retrieval for Glance
//!
//! This crate provides:
//! - Gmail API client and access token handling
//! - Body decoding, header lookup and message normalization
//! - The retrieval pipeline for the most recent messages
//! - Language-model summaries of single messages
//!
//! It has no server or UI dependencies; the `glance` app puts an HTTP API
//! and a command line in front of it.

pub mod config;
pub mod gmail;
pub mod models;
pub mod retrieval;
pub mod summary;

pub use config::GmailCredentials;
pub use gmail::{AccessToken, GmailClient, LocalAuth, Session, verify_access_token};
pub use models::{EmailAddress, MessageId, NormalizedMessage};
pub use retrieval::{
    FetchFailure, MailProvider, PAGE_SIZE, RetrievalError, RetrievalReport, Retriever,
};
pub use summary::{SummaryError, SummaryRequest, Summarizer};
