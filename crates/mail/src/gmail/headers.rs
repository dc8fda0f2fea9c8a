//! Header lookup for display fields

use super::api::Header;

/// Shown when a message carries no `Subject` header
pub const DEFAULT_SUBJECT: &str = "No Subject";

/// Shown when a message carries no `From` header
pub const DEFAULT_SENDER: &str = "Unknown Sender";

/// Find the first header with exactly this name (case-sensitive)
pub fn find_header<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.name == name)
        .map(|h| h.value.as_str())
}

/// Subject line, or [`DEFAULT_SUBJECT`]
pub fn subject(headers: &[Header]) -> String {
    find_header(headers, "Subject")
        .unwrap_or(DEFAULT_SUBJECT)
        .to_string()
}

/// Raw `From` value, or [`DEFAULT_SENDER`]
pub fn sender(headers: &[Header]) -> String {
    find_header(headers, "From")
        .unwrap_or(DEFAULT_SENDER)
        .to_string()
}
