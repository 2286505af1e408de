use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    draft::{DocumentSnapshot, DraftToken},
    transport::{DraftId, DraftTransport, TransportError},
};

/// In-process draft store with optional latency and failure injection.
#[derive(Debug, Default)]
pub struct MemoryDraftStore {
    drafts: Mutex<HashMap<DraftToken, DocumentSnapshot>>,
    latency: Duration,
    create_calls: AtomicUsize,
    update_calls: AtomicUsize,
    failing_creates: AtomicUsize,
    failing_updates: AtomicUsize,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call waits this long before touching the store.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn fail_next_creates(&self, count: usize) {
        self.failing_creates.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_updates(&self, count: usize) {
        self.failing_updates.store(count, Ordering::SeqCst);
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.create_calls() + self.update_calls()
    }

    pub async fn get(&self, token: &DraftToken) -> Option<DocumentSnapshot> {
        self.drafts.lock().await.get(token).cloned()
    }

    pub async fn len(&self) -> usize {
        self.drafts.lock().await.len()
    }

    /// Seeds a draft as if it had been created earlier.
    pub async fn insert(&self, token: DraftToken, snapshot: DocumentSnapshot) {
        self.drafts.lock().await.insert(token, snapshot);
    }

    async fn simulate_network(&self, failing: &AtomicUsize) -> Result<(), TransportError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let should_fail = failing
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(TransportError::Unavailable("injected failure".into()));
        }
        Ok(())
    }
}

impl DraftTransport for MemoryDraftStore {
    async fn create_draft(&self, snapshot: &DocumentSnapshot) -> Result<DraftToken, TransportError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_network(&self.failing_creates).await?;

        let token = DraftToken::from(DraftId::new());
        debug!("Memory store created draft {token}");
        self.drafts
            .lock()
            .await
            .insert(token.clone(), snapshot.clone());
        Ok(token)
    }

    async fn update_draft(
        &self,
        token: &DraftToken,
        snapshot: &DocumentSnapshot,
    ) -> Result<(), TransportError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_network(&self.failing_updates).await?;

        let mut drafts = self.drafts.lock().await;
        match drafts.get_mut(token) {
            Some(stored) => {
                *stored = snapshot.clone();
                Ok(())
            }
            None => Err(TransportError::UnknownDraft(token.clone())),
        }
    }
}
