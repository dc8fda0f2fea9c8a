//! Body decoding for Gmail message parts
//!
//! Gmail embeds part bodies as URL-safe base64 (`-` and `_` in place of
//! `+` and `/`), usually with the padding stripped.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use std::string::FromUtf8Error;

/// Standard alphabet, padding optional, unused bits in the last symbol ignored
const BODY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Failure to turn transport-encoded body data into text
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Unpadded length is 1 mod 4, which no amount of padding can fix
    #[error("invalid encoded length {0}")]
    InvalidLength(usize),
    #[error("invalid base64 data: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("decoded body is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] FromUtf8Error),
}

/// Decode URL-safe base64 body data into UTF-8 text.
///
/// Trailing padding is optional on input. Mixed alphabets are accepted since
/// both forms are mapped onto the standard alphabet before decoding. Leftover
/// bits in the final symbol are dropped rather than rejected.
pub fn decode_body(data: &str) -> Result<String, DecodeError> {
    let trimmed = data.trim_end_matches('=');
    if trimmed.len() % 4 == 1 {
        return Err(DecodeError::InvalidLength(trimmed.len()));
    }

    let standard: String = trimmed
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    let bytes = BODY_ENGINE.decode(standard.as_bytes())?;
    Ok(String::from_utf8(bytes)?)
}
