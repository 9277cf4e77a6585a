//! Stream tokens
//!
//! A token is the URL-safe base64 form of `"<chat_id>:<message_id>"`.
//! Tokens are neither signed nor expiring: holding one is enough to
//! stream the file it names.

use crate::error::{Error, Result};
use crate::telegram::MessageRef;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;

/// Encode a message reference into an opaque path token
pub fn encode(chat_id: i64, message_id: i32) -> String {
    URL_SAFE.encode(format!("{}:{}", chat_id, message_id))
}

/// Decode a path token back into the message it names
///
/// Message IDs are 32-bit in Telegram, so a message part outside the
/// `i32` range is rejected as `InvalidToken`.
pub fn decode(token: &str) -> Result<MessageRef> {
    let raw = URL_SAFE.decode(token).map_err(|_| Error::InvalidToken)?;
    let text = String::from_utf8(raw).map_err(|_| Error::InvalidToken)?;

    let mut parts = text.split(':');
    let (chat, message) = match (parts.next(), parts.next(), parts.next()) {
        (Some(chat), Some(message), None) => (chat, message),
        _ => return Err(Error::InvalidToken),
    };

    let chat_id = chat.parse::<i64>().map_err(|_| Error::InvalidToken)?;
    let message_id = message.parse::<i32>().map_err(|_| Error::InvalidToken)?;

    Ok(MessageRef {
        chat_id,
        message_id,
    })
}

/// HTTP path serving the given message
pub fn stream_path(chat_id: i64, message_id: i32) -> String {
    format!("/stream/{}", encode(chat_id, message_id))
}
