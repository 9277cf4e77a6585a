//! Telegram client implementation
//!
//! Uses grammers to sign in as a bot, resolve messages to documents and
//! download document chunks from whichever data center hosts them.

use crate::config::TelegramConfig;
use crate::error::{Error, Result};
use crate::telegram::{
    DcSender, MessageRef, MetadataResolver, RemoteLocation, SenderConnector, SenderError,
    SenderPool, DEFAULT_MIME_TYPE,
};

use async_trait::async_trait;
use grammers_client::{Client, ClientConfiguration};
use grammers_mtsender::{InvocationError, SenderPool as MtSenderPool, SenderPoolHandle};
use grammers_session::storages::SqliteSession;
use grammers_session::Session;
use grammers_tl_types as tl;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Bot API channel IDs are `-100` followed by the MTProto channel ID
const CHANNEL_ID_OFFSET: i64 = 1_000_000_000_000;

/// Signed-in Telegram session
pub struct TelegramBackend {
    client: Client,
    session: Arc<SqliteSession>,
    handle: SenderPoolHandle,
    config: TelegramConfig,
}

impl TelegramBackend {
    /// Open the configured session file and start the connection runner
    pub async fn connect(config: TelegramConfig) -> Result<Self> {
        info!("Connecting to Telegram...");

        if config.api_id == 0 || config.api_hash.is_empty() {
            return Err(Error::TelegramClient(
                "API ID and hash are required. Get them from my.telegram.org".to_string(),
            ));
        }

        if let Some(parent) = config.session_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let session = Arc::new(
            SqliteSession::open(&config.session_file)
                .map_err(|e| Error::TelegramClient(format!("Failed to open session: {}", e)))?,
        );

        let pool = MtSenderPool::new(Arc::clone(&session), config.api_id);
        // Flood waits are surfaced to the chunk fetcher instead of slept on here.
        let client = Client::with_configuration(
            &pool,
            ClientConfiguration {
                flood_sleep_threshold: 0,
            },
        );
        let MtSenderPool { runner, handle, .. } = pool;
        tokio::spawn(runner.run());

        info!("Connected to Telegram");
        Ok(TelegramBackend {
            client,
            session,
            handle,
            config,
        })
    }

    /// Check if the session is authorized
    pub async fn is_authorized(&self) -> Result<bool> {
        self.client
            .is_authorized()
            .await
            .map_err(|e| Error::TelegramClient(e.to_string()))
    }

    /// Sign in with the configured bot token unless already authorized
    pub async fn ensure_bot_session(&self) -> Result<()> {
        if self.is_authorized().await? {
            info!("Loaded existing session");
            return Ok(());
        }

        if self.config.bot_token.is_empty() {
            return Err(Error::TelegramAuthRequired);
        }

        self.client
            .bot_sign_in(&self.config.bot_token, &self.config.api_hash)
            .await
            .map_err(|e| Error::TelegramClient(e.to_string()))?;

        info!("Signed in as bot");
        Ok(())
    }

    /// Data center the session is signed in to
    pub fn home_dc(&self) -> i32 {
        self.session.home_dc_id()
    }

    /// Build the sender pool rooted at this session
    pub fn sender_pool(&self) -> SenderPool {
        let home = GrammersSender {
            client: self.client.clone(),
            dc_id: self.home_dc(),
        };
        let connector = GrammersConnector {
            client: self.client.clone(),
        };
        SenderPool::new(Arc::new(home), Arc::new(connector))
    }

    /// Close every connection
    pub fn disconnect(&self) {
        if self.handle.quit() {
            info!("Disconnected from Telegram");
        }
    }

    async fn fetch_messages(&self, message: MessageRef) -> Result<Vec<tl::enums::Message>> {
        let id = vec![tl::types::InputMessageId {
            id: message.message_id,
        }
        .into()];

        let result = match channel_id(message.chat_id) {
            Some(channel_id) => {
                let request = tl::functions::channels::GetMessages {
                    channel: tl::types::InputChannel {
                        channel_id,
                        access_hash: 0,
                    }
                    .into(),
                    id,
                };
                self.client.invoke(&request).await
            }
            None => {
                self.client
                    .invoke(&tl::functions::messages::GetMessages { id })
                    .await
            }
        };

        let messages = result.map_err(|e| {
            warn!(
                "Failed to get message {} in chat {}: {}",
                message.message_id, message.chat_id, e
            );
            Error::RemoteResolutionFailed {
                chat_id: message.chat_id,
                message_id: message.message_id,
            }
        })?;

        Ok(match messages {
            tl::enums::messages::Messages::Messages(m) => m.messages,
            tl::enums::messages::Messages::Slice(m) => m.messages,
            tl::enums::messages::Messages::ChannelMessages(m) => m.messages,
            tl::enums::messages::Messages::NotModified(_) => Vec::new(),
        })
    }
}

#[async_trait]
impl MetadataResolver for TelegramBackend {
    async fn resolve(&self, message: MessageRef) -> Result<RemoteLocation> {
        let location = self
            .fetch_messages(message)
            .await?
            .into_iter()
            .filter_map(|m| document_of(m, message.message_id))
            .find_map(remote_location);

        match location {
            Some(location) => {
                debug!(
                    "Resolved {}:{} to document {} on DC {} ({} bytes)",
                    message.chat_id,
                    message.message_id,
                    location.document_id,
                    location.dc_id,
                    location.size
                );
                Ok(location)
            }
            None => Err(Error::RemoteResolutionFailed {
                chat_id: message.chat_id,
                message_id: message.message_id,
            }),
        }
    }
}

/// Sender issuing `upload.getFile` to one data center
pub struct GrammersSender {
    client: Client,
    dc_id: i32,
}

#[async_trait]
impl DcSender for GrammersSender {
    fn dc_id(&self) -> i32 {
        self.dc_id
    }

    async fn get_file(
        &self,
        location: &RemoteLocation,
        offset: u64,
        limit: u32,
    ) -> std::result::Result<Vec<u8>, SenderError> {
        let request = tl::functions::upload::GetFile {
            precise: true,
            cdn_supported: false,
            location: tl::types::InputDocumentFileLocation {
                id: location.document_id,
                access_hash: location.access_hash,
                file_reference: location.file_reference.clone(),
                thumb_size: String::new(),
            }
            .into(),
            offset: offset as i64,
            limit: limit as i32,
        };

        match self
            .client
            .invoke_in_dc(self.dc_id, &request)
            .await
            .map_err(classify)?
        {
            tl::enums::upload::File::File(file) => Ok(file.bytes),
            tl::enums::upload::File::CdnRedirect(_) => Err(SenderError::Fatal(
                "expected upload.file, got upload.fileCdnRedirect".to_string(),
            )),
        }
    }
}

/// Authorizes the bot on foreign data centers and hands out senders for them
pub struct GrammersConnector {
    client: Client,
}

#[async_trait]
impl SenderConnector for GrammersConnector {
    async fn connect(&self, dc_id: i32) -> Result<Arc<dyn DcSender>> {
        let tl::enums::auth::ExportedAuthorization::Authorization(exported) = self
            .client
            .invoke(&tl::functions::auth::ExportAuthorization { dc_id })
            .await
            .map_err(|e| Error::TelegramClient(format!("Auth export to DC {}: {}", dc_id, e)))?;

        self.client
            .invoke_in_dc(
                dc_id,
                &tl::functions::auth::ImportAuthorization {
                    id: exported.id,
                    bytes: exported.bytes,
                },
            )
            .await
            .map_err(|e| Error::TelegramClient(format!("Auth import on DC {}: {}", dc_id, e)))?;

        debug!("Authorization copied to DC {}", dc_id);
        Ok(Arc::new(GrammersSender {
            client: self.client.clone(),
            dc_id,
        }))
    }
}

fn classify(err: InvocationError) -> SenderError {
    match err {
        InvocationError::Rpc(rpc) => classify_rpc(&rpc.name, rpc.value, &rpc.to_string()),
        other => SenderError::Transient(other.to_string()),
    }
}

fn classify_rpc(name: &str, value: Option<u32>, description: &str) -> SenderError {
    match name {
        "FLOOD_WAIT" | "FLOOD_PREMIUM_WAIT" => SenderError::RateLimited {
            wait_secs: value.unwrap_or(1) as u64,
        },
        // The data center does not know this session; retrying cannot help.
        "AUTH_KEY_UNREGISTERED" => SenderError::Fatal(description.to_string()),
        _ => SenderError::Transient(description.to_string()),
    }
}

/// MTProto channel ID for a Bot API style chat ID
fn channel_id(chat_id: i64) -> Option<i64> {
    if chat_id < -CHANNEL_ID_OFFSET {
        Some(-chat_id - CHANNEL_ID_OFFSET)
    } else {
        None
    }
}

fn document_of(message: tl::enums::Message, message_id: i32) -> Option<tl::types::Document> {
    let tl::enums::Message::Message(message) = message else {
        return None;
    };
    if message.id != message_id {
        return None;
    }

    match message.media? {
        tl::enums::MessageMedia::Document(media) => match media.document? {
            tl::enums::Document::Document(document) => Some(document),
            tl::enums::Document::Empty(_) => None,
        },
        _ => None,
    }
}

fn remote_location(document: tl::types::Document) -> Option<RemoteLocation> {
    if document.size <= 0 {
        return None;
    }

    let file_name = document.attributes.iter().find_map(|attr| match attr {
        tl::enums::DocumentAttribute::Filename(f) => Some(f.file_name.clone()),
        _ => None,
    });

    let mime_type = if document.mime_type.is_empty() {
        DEFAULT_MIME_TYPE.to_string()
    } else {
        document.mime_type
    };

    Some(RemoteLocation {
        document_id: document.id,
        access_hash: document.access_hash,
        file_reference: document.file_reference,
        dc_id: document.dc_id,
        size: document.size as u64,
        mime_type,
        file_name,
    })
}
