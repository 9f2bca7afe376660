//! Notification collaborator — toast presentation lives in the UI layer.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// A notification handed to the UI layer.
#[derive(Debug, Clone)]
pub struct Toast {
    pub title: String,
    pub description: String,
}

impl Toast {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Notification sink consumed by the coordinator and action applier.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Present a toast; returns an id usable with `close`.
    async fn add(&self, toast: Toast) -> Uuid;
    /// Dismiss a previously added toast. Unknown ids are ignored.
    async fn close(&self, id: Uuid);
}

/// Notifier that logs toasts — stands in for the UI in the demo binary.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn add(&self, toast: Toast) -> Uuid {
        let id = Uuid::new_v4();
        info!(toast_id = %id, title = %toast.title, description = %toast.description, "Toast");
        id
    }

    async fn close(&self, _id: Uuid) {}
}

/// Notifier that records every call — for tests.
#[derive(Default)]
pub struct RecordingNotifier {
    added: Mutex<Vec<(Uuid, Toast)>>,
    closed: Mutex<Vec<Uuid>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn added(&self) -> Vec<(Uuid, Toast)> {
        self.added.lock().await.clone()
    }

    pub async fn closed(&self) -> Vec<Uuid> {
        self.closed.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn add(&self, toast: Toast) -> Uuid {
        let id = Uuid::new_v4();
        self.added.lock().await.push((id, toast));
        id
    }

    async fn close(&self, id: Uuid) {
        self.closed.lock().await.push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_notifier_tracks_adds_and_closes() {
        let notifier = RecordingNotifier::new();
        let id = notifier.add(Toast::new("Title", "Body")).await;
        notifier.close(id).await;

        let added = notifier.added().await;
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].1.title, "Title");
        assert_eq!(notifier.closed().await, vec![id]);
    }
}
