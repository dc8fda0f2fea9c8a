//! HTTP API consumed by the web front end
//!
//! Routing is a plain function from [`ApiRequest`] to [`ApiResponse`] so it
//! can be exercised without a socket; `server` does the I/O.

use log::{error, info};
use mail::{AccessToken, MailProvider, RetrievalError, Retriever, SummaryRequest, Summarizer};
use serde::Deserialize;
use serde_json::{Value, json};

/// Shared state handed to every request
pub struct ApiContext<P> {
    pub retriever: Retriever<P>,
    pub summarizer: Option<Summarizer>,
}

/// The parts of an HTTP request the routes look at
#[derive(Debug, Clone, Default)]
pub struct ApiRequest {
    pub method: String,
    /// Path, possibly with a query string
    pub url: String,
    pub authorization: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: json!({ "error": message }),
        }
    }
}

#[derive(Deserialize)]
struct SignInBody {
    access_token: String,
}

pub fn handle<P: MailProvider>(ctx: &ApiContext<P>, request: &ApiRequest) -> ApiResponse {
    let path = request.url.split('?').next().unwrap_or_default();
    match (request.method.as_str(), path) {
        ("GET", "/api/emails") => list_emails(ctx, request),
        ("POST", "/api/auth/google") => sign_in(ctx, request),
        ("POST", "/api/synthesis") => synthesize(ctx, request),
        (_, "/api/emails" | "/api/auth/google" | "/api/synthesis") => {
            ApiResponse::error(405, "Method not allowed")
        }
        _ => ApiResponse::error(404, "Not found"),
    }
}

/// GET /api/emails
fn list_emails<P: MailProvider>(ctx: &ApiContext<P>, request: &ApiRequest) -> ApiResponse {
    let token = request
        .authorization
        .as_deref()
        .and_then(AccessToken::from_authorization_header);

    match ctx.retriever.fetch_recent(token.as_ref()) {
        Ok(messages) => ApiResponse::ok(json!({ "messages": messages })),
        Err(RetrievalError::AuthMissing) => {
            ApiResponse::error(401, "No authorization token provided")
        }
        Err(e) => {
            error!("Error fetching emails: {:#}", anyhow::Error::from(e));
            ApiResponse::error(500, "Failed to fetch emails")
        }
    }
}

/// POST /api/auth/google
fn sign_in<P: MailProvider>(ctx: &ApiContext<P>, request: &ApiRequest) -> ApiResponse {
    let result = serde_json::from_str::<SignInBody>(&request.body)
        .map_err(anyhow::Error::from)
        .and_then(|body| {
            ctx.retriever
                .provider()
                .account_email(&AccessToken::new(body.access_token))
        });

    match result {
        Ok(email) => {
            info!("Signed in as {}", email);
            ApiResponse::ok(json!({ "success": true, "email": email }))
        }
        Err(e) => {
            error!("Google auth error: {:#}", e);
            ApiResponse::error(401, "Authentication failed")
        }
    }
}

/// POST /api/synthesis
fn synthesize<P>(ctx: &ApiContext<P>, request: &ApiRequest) -> ApiResponse {
    let result = serde_json::from_str::<SummaryRequest>(&request.body)
        .map_err(anyhow::Error::from)
        .and_then(|summary_request| {
            let summarizer = ctx
                .summarizer
                .as_ref()
                .ok_or(mail::SummaryError::MissingApiKey)?;
            Ok(summarizer.summarize(&summary_request)?)
        });

    match result {
        Ok(synthesis) => ApiResponse::ok(json!({ "synthesis": synthesis })),
        Err(e) => {
            error!("Synthesis generation error: {:#}", e);
            ApiResponse::error(500, "Failed to generate synthesis")
        }
    }
}
