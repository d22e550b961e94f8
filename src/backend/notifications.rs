use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::api::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

/// Delivery/ack channel for notifications. The production transport polls the
/// platform API; tests substitute an in-memory fake.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn fetch(&self, learner_id: &str) -> Result<Vec<Notification>, ApiError>;
    async fn ack_read(&self, notification_id: &str) -> Result<(), ApiError>;
    async fn delete(&self, notification_id: &str) -> Result<(), ApiError>;
}

/// reqwest-backed transport for the notification endpoints.
pub struct RestNotificationTransport {
    client: reqwest::Client,
    base_url: String,
}

impl RestNotificationTransport {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl NotificationTransport for RestNotificationTransport {
    async fn fetch(&self, learner_id: &str) -> Result<Vec<Notification>, ApiError> {
        let url = format!("{}/api/notifications?learnerId={learner_id}", self.base_url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        response
            .json::<Vec<Notification>>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn ack_read(&self, notification_id: &str) -> Result<(), ApiError> {
        let url = format!("{}/api/notifications/{notification_id}/read", self.base_url);
        self.client
            .post(url)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, notification_id: &str) -> Result<(), ApiError> {
        let url = format!("{}/api/notifications/{notification_id}", self.base_url);
        self.client
            .delete(url)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(())
    }
}

pub type NotificationHandler = Box<dyn Fn(&[Notification]) + Send + Sync>;

/// Process-scoped notification feed with an explicit lifecycle: `connect`
/// installs a handler and starts delivering, `disconnect` tears it down.
/// Nothing here is a module-level global, so independent sessions get
/// independent feeds and tests get fakes.
///
/// Local mutations (mark read, delete) are optimistic: the handler sees the
/// mutated list immediately, the ack goes out, and a rejected ack replays the
/// inverse mutation.
pub struct NotificationCenter {
    transport: Arc<dyn NotificationTransport>,
    learner_id: String,
    items: Vec<Notification>,
    handler: Option<NotificationHandler>,
}

impl NotificationCenter {
    pub fn new(transport: Arc<dyn NotificationTransport>, learner_id: String) -> Self {
        Self {
            transport,
            learner_id,
            items: Vec::new(),
            handler: None,
        }
    }

    pub fn connect(&mut self, handler: NotificationHandler) {
        self.handler = Some(handler);
        self.emit();
    }

    pub fn disconnect(&mut self) {
        self.handler = None;
    }

    pub fn is_connected(&self) -> bool {
        self.handler.is_some()
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|n| !n.read).count()
    }

    fn emit(&self) {
        if let Some(handler) = &self.handler {
            handler(&self.items);
        }
    }

    /// Pull the current feed. No-op while disconnected.
    pub async fn refresh(&mut self) {
        if self.handler.is_none() {
            return;
        }
        match self.transport.fetch(&self.learner_id).await {
            Ok(items) => {
                self.items = items;
                self.emit();
            }
            Err(e) => tracing::warn!("notification refresh failed: {e}"),
        }
    }

    /// Mark one notification read, optimistically.
    pub async fn mark_read(&mut self, notification_id: &str) -> Result<(), ApiError> {
        let Some(pos) = self
            .items
            .iter()
            .position(|n| n.id == notification_id && !n.read)
        else {
            return Ok(());
        };

        self.items[pos].read = true;
        self.emit();

        if let Err(e) = self.transport.ack_read(notification_id).await {
            tracing::warn!("mark-read rejected for {notification_id}, rolling back: {e}");
            self.items[pos].read = false;
            self.emit();
            return Err(e);
        }
        Ok(())
    }

    /// Remove one notification, optimistically. A rejected delete puts it back
    /// where it was.
    pub async fn delete(&mut self, notification_id: &str) -> Result<(), ApiError> {
        let Some(pos) = self.items.iter().position(|n| n.id == notification_id) else {
            return Ok(());
        };

        let removed = self.items.remove(pos);
        self.emit();

        if let Err(e) = self.transport.delete(notification_id).await {
            tracing::warn!("delete rejected for {notification_id}, rolling back: {e}");
            self.items.insert(pos, removed);
            self.emit();
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    struct FakeTransport {
        items: Mutex<Vec<Notification>>,
        fail_acks: AtomicBool,
    }

    impl FakeTransport {
        fn with_items(items: Vec<Notification>) -> Arc<Self> {
            Arc::new(Self {
                items: Mutex::new(items),
                fail_acks: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl NotificationTransport for FakeTransport {
        async fn fetch(&self, _learner_id: &str) -> Result<Vec<Notification>, ApiError> {
            Ok(self.items.lock().unwrap().clone())
        }

        async fn ack_read(&self, _notification_id: &str) -> Result<(), ApiError> {
            if self.fail_acks.load(Ordering::SeqCst) {
                Err(ApiError::Network("ack failed".into()))
            } else {
                Ok(())
            }
        }

        async fn delete(&self, _notification_id: &str) -> Result<(), ApiError> {
            if self.fail_acks.load(Ordering::SeqCst) {
                Err(ApiError::Network("delete failed".into()))
            } else {
                Ok(())
            }
        }
    }

    fn notification(id: &str) -> Notification {
        Notification {
            id: id.to_string(),
            title: format!("Title {id}"),
            body: "Body".to_string(),
            created_at: Utc::now(),
            read: false,
        }
    }

    fn seen_log() -> (NotificationHandler, Arc<Mutex<Vec<Vec<Notification>>>>) {
        let log: Arc<Mutex<Vec<Vec<Notification>>>> = Arc::new(Mutex::new(Vec::new()));
        let log_clone = log.clone();
        let handler: NotificationHandler =
            Box::new(move |items| log_clone.lock().unwrap().push(items.to_vec()));
        (handler, log)
    }

    #[tokio::test]
    async fn test_refresh_requires_connect() {
        let transport = FakeTransport::with_items(vec![notification("n1")]);
        let mut center = NotificationCenter::new(transport, "learner1".into());

        center.refresh().await;
        assert_eq!(center.unread_count(), 0);

        let (handler, log) = seen_log();
        center.connect(handler);
        center.refresh().await;
        assert_eq!(center.unread_count(), 1);
        assert!(!log.lock().unwrap().is_empty());

        center.disconnect();
        assert!(!center.is_connected());
    }

    #[tokio::test]
    async fn test_mark_read_optimistic() {
        let transport = FakeTransport::with_items(vec![notification("n1"), notification("n2")]);
        let mut center = NotificationCenter::new(transport, "learner1".into());
        let (handler, _log) = seen_log();
        center.connect(handler);
        center.refresh().await;

        center.mark_read("n1").await.unwrap();
        assert_eq!(center.unread_count(), 1);

        // Marking again is a no-op, not a second ack.
        center.mark_read("n1").await.unwrap();
        assert_eq!(center.unread_count(), 1);
    }

    #[tokio::test]
    async fn test_mark_read_rolls_back_on_failure() {
        let transport = FakeTransport::with_items(vec![notification("n1")]);
        let mut center = NotificationCenter::new(transport.clone(), "learner1".into());
        let (handler, log) = seen_log();
        center.connect(handler);
        center.refresh().await;

        transport.fail_acks.store(true, Ordering::SeqCst);
        let err = center.mark_read("n1").await;
        assert!(err.is_err());
        assert_eq!(center.unread_count(), 1);

        // The handler saw the optimistic state and then the rollback.
        let snapshots = log.lock().unwrap();
        let reads: Vec<bool> = snapshots.iter().map(|s| s[0].read).collect();
        assert!(reads.contains(&true));
        assert!(!reads.last().unwrap());
    }

    #[tokio::test]
    async fn test_delete_rolls_back_in_place() {
        let transport =
            FakeTransport::with_items(vec![notification("n1"), notification("n2"), notification("n3")]);
        let mut center = NotificationCenter::new(transport.clone(), "learner1".into());
        let (handler, _log) = seen_log();
        center.connect(handler);
        center.refresh().await;

        transport.fail_acks.store(true, Ordering::SeqCst);
        assert!(center.delete("n2").await.is_err());

        // Replayed inverse mutation restores the original order.
        let ids: Vec<&str> = center.items.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["n1", "n2", "n3"]);
    }
}
