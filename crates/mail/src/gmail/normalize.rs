//! Gmail API response normalization
//!
//! Converts a full Gmail message into a [`NormalizedMessage`]. Payloads are
//! parsed into [`Payload`] first so body selection never has to probe for
//! optional fields.

use log::warn;

use super::api::{GmailMessage, Header, MessageBody, MessagePart, MessagePayload};
use super::decode::decode_body;
use super::headers;
use crate::models::{MessageId, NormalizedMessage};

/// A message arrived without the payload tree `format=full` always includes
#[derive(Debug, thiserror::Error)]
#[error("message {id} has no payload")]
pub struct MalformedMessage {
    pub id: MessageId,
}

/// Shape of a message payload, decided once at the API boundary
#[derive(Debug)]
pub enum Payload {
    /// Body data sits directly on the payload
    SinglePart {
        headers: Vec<Header>,
        body_data: Option<String>,
    },
    /// Body lives in one of the (non-empty) child parts
    Multipart {
        headers: Vec<Header>,
        parts: Vec<MessagePart>,
    },
}

impl Payload {
    /// Classify a raw payload. An empty `parts` list counts as single-part.
    pub fn from_api(payload: MessagePayload) -> Self {
        let headers = payload.headers.unwrap_or_default();
        match payload.parts {
            Some(parts) if !parts.is_empty() => Payload::Multipart { headers, parts },
            _ => Payload::SinglePart {
                headers,
                body_data: body_data(payload.body.as_ref()).map(str::to_string),
            },
        }
    }

    pub fn headers(&self) -> &[Header] {
        match self {
            Payload::SinglePart { headers, .. } | Payload::Multipart { headers, .. } => headers,
        }
    }

    /// Encoded data of the part chosen as the message body.
    ///
    /// Multipart payloads use the first `text/plain` child, falling back to
    /// the first child whatever its type.
    pub fn body_data(&self) -> Option<&str> {
        match self {
            Payload::SinglePart { body_data, .. } => body_data.as_deref(),
            Payload::Multipart { parts, .. } => {
                let chosen = parts
                    .iter()
                    .find(|p| p.mime_type.as_deref() == Some("text/plain"))
                    .or_else(|| parts.first())?;
                body_data(chosen.body.as_ref())
            }
        }
    }

    /// Decoded body text; empty when there is no data or it fails to decode
    pub fn body_text(&self) -> String {
        let Some(data) = self.body_data() else {
            return String::new();
        };
        decode_body(data).unwrap_or_else(|e| {
            warn!("Failed to decode message body: {}", e);
            String::new()
        })
    }
}

fn body_data(body: Option<&MessageBody>) -> Option<&str> {
    body?.data.as_deref()
}

/// Normalize a Gmail API message into a display record
pub fn normalize_message(gmail_msg: GmailMessage) -> Result<NormalizedMessage, MalformedMessage> {
    let id = MessageId::new(gmail_msg.id);
    let Some(raw_payload) = gmail_msg.payload else {
        return Err(MalformedMessage { id });
    };
    let payload = Payload::from_api(raw_payload);

    Ok(NormalizedMessage {
        id,
        thread_id: gmail_msg.thread_id,
        subject: headers::subject(payload.headers()),
        from: headers::sender(payload.headers()),
        snippet: gmail_msg.snippet,
        body: payload.body_text(),
        date: gmail_msg.internal_date,
        label_ids: gmail_msg.label_ids.unwrap_or_default(),
    })
}
