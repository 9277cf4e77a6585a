//! Data center sender pool
//!
//! One sender per data center for the life of the process. The session's
//! own data center is served by the home sender and never pooled.

use crate::error::Result;
use crate::telegram::{DcSender, SenderConnector};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Process-wide map from data center ID to sender
pub struct SenderPool {
    /// Sender for the data center the session lives in
    home: Arc<dyn DcSender>,
    /// Creates senders for foreign data centers
    connector: Arc<dyn SenderConnector>,
    /// Senders created so far; entries are never evicted
    senders: RwLock<HashMap<i32, Arc<dyn DcSender>>>,
}

impl SenderPool {
    /// Create an empty pool around the session's home sender
    pub fn new(home: Arc<dyn DcSender>, connector: Arc<dyn SenderConnector>) -> Self {
        SenderPool {
            home,
            connector,
            senders: RwLock::new(HashMap::new()),
        }
    }

    /// Sender for `dc_id`, connecting on first use
    pub async fn get_or_create(&self, dc_id: i32) -> Result<Arc<dyn DcSender>> {
        if dc_id == self.home.dc_id() {
            return Ok(Arc::clone(&self.home));
        }

        if let Some(sender) = self.senders.read().await.get(&dc_id) {
            return Ok(Arc::clone(sender));
        }

        // Held across connect so concurrent callers wait for one sender.
        let mut senders = self.senders.write().await;
        if let Some(sender) = senders.get(&dc_id) {
            debug!("Sender for DC {} created by another request", dc_id);
            return Ok(Arc::clone(sender));
        }

        let sender = self.connector.connect(dc_id).await?;
        senders.insert(dc_id, Arc::clone(&sender));
        info!("Created sender for DC {}", dc_id);

        Ok(sender)
    }

    /// Number of pooled foreign senders
    pub async fn len(&self) -> usize {
        self.senders.read().await.len()
    }

    /// Whether no foreign sender has been created yet
    pub async fn is_empty(&self) -> bool {
        self.senders.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::memory::{MemoryConnector, MemorySender};

    fn pool(connector: Arc<MemoryConnector>) -> SenderPool {
        SenderPool::new(Arc::new(MemorySender::new(2, Vec::new())), connector)
    }

    #[tokio::test]
    async fn test_home_dc_is_not_pooled() {
        let connector = Arc::new(MemoryConnector::new(Vec::new()));
        let pool = pool(Arc::clone(&connector));

        let sender = pool.get_or_create(2).await.unwrap();
        assert_eq!(sender.dc_id(), 2);
        assert_eq!(connector.connects(), 0);
        assert!(pool.is_empty().await);
    }

    #[tokio::test]
    async fn test_foreign_dc_created_once() {
        let connector = Arc::new(MemoryConnector::new(Vec::new()));
        let pool = pool(Arc::clone(&connector));

        let first = pool.get_or_create(4).await.unwrap();
        let second = pool.get_or_create(4).await.unwrap();

        assert_eq!(first.dc_id(), 4);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(connector.connects(), 1);
        assert_eq!(pool.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_sender() {
        let connector = Arc::new(MemoryConnector::new(Vec::new()).with_delay_ms(20));
        let pool = Arc::new(pool(Arc::clone(&connector)));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                tokio::spawn(async move { pool.get_or_create(5).await.unwrap() })
            })
            .collect();

        let mut senders = Vec::new();
        for task in tasks {
            senders.push(task.await.unwrap());
        }

        assert_eq!(connector.connects(), 1);
        assert!(senders.iter().all(|s| Arc::ptr_eq(s, &senders[0])));
    }

    #[tokio::test]
    async fn test_distinct_dcs_get_distinct_senders() {
        let connector = Arc::new(MemoryConnector::new(Vec::new()));
        let pool = pool(Arc::clone(&connector));

        let a = pool.get_or_create(1).await.unwrap();
        let b = pool.get_or_create(4).await.unwrap();

        assert_eq!(a.dc_id(), 1);
        assert_eq!(b.dc_id(), 4);
        assert_eq!(connector.connects(), 2);
    }

    #[tokio::test]
    async fn test_connect_failure_is_not_cached() {
        let connector = Arc::new(MemoryConnector::new(Vec::new()).failing_first(1));
        let pool = pool(Arc::clone(&connector));

        assert!(pool.get_or_create(3).await.is_err());
        assert!(pool.is_empty().await);
        assert!(pool.get_or_create(3).await.is_ok());
        assert_eq!(connector.connects(), 2);
    }
}
