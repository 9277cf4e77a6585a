//! In-memory stand-ins for Telegram used by unit tests

use crate::error::{Error, Result};
use crate::telegram::{
    DcSender, MessageRef, MetadataResolver, RemoteLocation, SenderConnector, SenderError,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Serves a byte buffer as if it were a Telegram document
pub struct MemorySender {
    dc_id: i32,
    data: Arc<Vec<u8>>,
    /// Failures returned before any successful call
    script: Mutex<VecDeque<SenderError>>,
    /// Every (offset, limit) requested
    requests: Mutex<Vec<(u64, u32)>>,
    /// Cut the next successful reply to this many bytes
    truncate: Mutex<Option<usize>>,
    /// Pad short responses with zeros up to `limit`
    pad: bool,
    delay: Option<Duration>,
}

impl MemorySender {
    pub fn new(dc_id: i32, data: Vec<u8>) -> Self {
        Self::shared(dc_id, Arc::new(data))
    }

    pub fn shared(dc_id: i32, data: Arc<Vec<u8>>) -> Self {
        MemorySender {
            dc_id,
            data,
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            truncate: Mutex::new(None),
            pad: false,
            delay: None,
        }
    }

    /// Return these failures, in order, before serving data
    pub fn with_failures(self, failures: impl IntoIterator<Item = SenderError>) -> Self {
        self.script.lock().extend(failures);
        self
    }

    /// Fail the next call with `failure`
    pub fn fail_next(&self, failure: SenderError) {
        self.script.lock().push_front(failure);
    }

    /// Answer the next successful call with at most `len` bytes
    pub fn truncate_next(&self, len: usize) {
        *self.truncate.lock() = Some(len);
    }

    pub fn with_padding(mut self) -> Self {
        self.pad = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<(u64, u32)> {
        self.requests.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl DcSender for MemorySender {
    fn dc_id(&self) -> i32 {
        self.dc_id
    }

    async fn get_file(
        &self,
        _location: &RemoteLocation,
        offset: u64,
        limit: u32,
    ) -> std::result::Result<Vec<u8>, SenderError> {
        self.requests.lock().push((offset, limit));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(failure) = self.script.lock().pop_front() {
            return Err(failure);
        }

        let len = self.data.len() as u64;
        if offset >= len {
            return Ok(Vec::new());
        }

        let end = (offset + limit as u64).min(len);
        let mut bytes = self.data[offset as usize..end as usize].to_vec();
        if self.pad {
            bytes.resize(limit as usize, 0);
        }
        if let Some(len) = self.truncate.lock().take() {
            bytes.truncate(len);
        }
        Ok(bytes)
    }
}

/// Connector handing out `MemorySender`s over the same data
pub struct MemoryConnector {
    data: Arc<Vec<u8>>,
    connects: AtomicUsize,
    fail_first: AtomicUsize,
    delay: Option<Duration>,
}

impl MemoryConnector {
    pub fn new(data: Vec<u8>) -> Self {
        MemoryConnector {
            data: Arc::new(data),
            connects: AtomicUsize::new(0),
            fail_first: AtomicUsize::new(0),
            delay: None,
        }
    }

    pub fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay = Some(Duration::from_millis(ms));
        self
    }

    pub fn failing_first(self, count: usize) -> Self {
        self.fail_first.store(count, Ordering::SeqCst);
        self
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SenderConnector for MemoryConnector {
    async fn connect(&self, dc_id: i32) -> Result<Arc<dyn DcSender>> {
        self.connects.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let pending = self.fail_first.load(Ordering::SeqCst);
        if pending > 0 {
            self.fail_first.store(pending - 1, Ordering::SeqCst);
            return Err(Error::TelegramClient(format!("cannot reach DC {}", dc_id)));
        }

        Ok(Arc::new(MemorySender::shared(dc_id, Arc::clone(&self.data))))
    }
}

/// Resolver backed by a fixed table of messages
#[derive(Default)]
pub struct MemoryResolver {
    entries: HashMap<MessageRef, RemoteLocation>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, message: MessageRef, location: RemoteLocation) -> Self {
        self.entries.insert(message, location);
        self
    }
}

#[async_trait]
impl MetadataResolver for MemoryResolver {
    async fn resolve(&self, message: MessageRef) -> Result<RemoteLocation> {
        self.entries
            .get(&message)
            .cloned()
            .ok_or(Error::RemoteResolutionFailed {
                chat_id: message.chat_id,
                message_id: message.message_id,
            })
    }
}

/// Location describing `size` bytes on `dc_id`
pub fn location(dc_id: i32, size: u64) -> RemoteLocation {
    RemoteLocation {
        document_id: 1,
        access_hash: 2,
        file_reference: vec![0xAB],
        dc_id,
        size,
        mime_type: "video/mp4".to_string(),
        file_name: Some("sample.mp4".to_string()),
    }
}

/// Deterministic, non-repeating-ish test payload
pub fn payload(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i * 31 % 251) as u8).collect()
}
