//! Remote document locations and the resolver that produces them

use crate::error::Result;
use async_trait::async_trait;

/// A message in a chat, as carried by a stream token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    /// Chat identifier (Bot API form, channels start with -100)
    pub chat_id: i64,
    /// Message identifier within the chat
    pub message_id: i32,
}

/// Everything needed to download a document attached to a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLocation {
    /// Document ID
    pub document_id: i64,
    /// Access hash paired with the document ID
    pub access_hash: i64,
    /// File reference; may go stale, which surfaces as a fetch failure
    pub file_reference: Vec<u8>,
    /// Data center hosting the document
    pub dc_id: i32,
    /// Size in bytes
    pub size: u64,
    /// Declared MIME type
    pub mime_type: String,
    /// File name attribute, when the document has one
    pub file_name: Option<String>,
}

impl RemoteLocation {
    /// Name to present to clients, falling back to the message coordinates
    pub fn display_name(&self, message: MessageRef) -> String {
        match &self.file_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("file_{}_{}", message.chat_id, message.message_id),
        }
    }
}

/// Resolves a message to the location of its document
///
/// Implementations return `Error::RemoteResolutionFailed` when the
/// message is missing or carries no document.
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    async fn resolve(&self, message: MessageRef) -> Result<RemoteLocation>;
}
