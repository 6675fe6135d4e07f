//! Draft persistence — durable, per-session storage of in-progress answers.
//!
//! Reads and writes never fail the wizard. A failed read starts an empty
//! session, a failed write leaves the session running in memory; both are
//! logged as persistence failures.
//!
//! Writes go through a [`DraftWriter`], a handle to a background task that
//! applies them in order. Writes queued while one is in flight are collapsed
//! to the most recent, so callers never wait on storage.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::model::AnswerModel;
use crate::error::DatabaseError;
use crate::store::Database;

/// Where a session's draft lives: a namespace plus the acting user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DraftKey {
    pub namespace: String,
    pub user_id: String,
}

impl DraftKey {
    pub fn new(namespace: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            user_id: user_id.into(),
        }
    }
}

impl std::fmt::Display for DraftKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.user_id)
    }
}

/// Key-value slot for drafts. Only get/set/delete semantics are required.
#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn load(&self, key: &DraftKey) -> Result<Option<AnswerModel>, DatabaseError>;

    async fn save(&self, key: &DraftKey, answers: &AnswerModel) -> Result<(), DatabaseError>;

    async fn clear(&self, key: &DraftKey) -> Result<(), DatabaseError>;
}

/// Draft store backed by the `settings` table: the user id is the settings
/// owner and the namespace is the settings key.
pub struct SettingsDraftStore {
    db: Arc<dyn Database>,
}

impl SettingsDraftStore {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DraftStore for SettingsDraftStore {
    async fn load(&self, key: &DraftKey) -> Result<Option<AnswerModel>, DatabaseError> {
        let Some(value) = self.db.get_setting(&key.user_id, &key.namespace).await? else {
            return Ok(None);
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| DatabaseError::Serialization(format!("draft {key}: {e}")))
    }

    async fn save(&self, key: &DraftKey, answers: &AnswerModel) -> Result<(), DatabaseError> {
        let value = serde_json::to_value(answers)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        self.db.set_setting(&key.user_id, &key.namespace, &value).await
    }

    async fn clear(&self, key: &DraftKey) -> Result<(), DatabaseError> {
        self.db.delete_setting(&key.user_id, &key.namespace).await?;
        Ok(())
    }
}

/// Session-scoped draft access: one store, one key.
#[derive(Clone)]
pub struct DraftPersistence {
    store: Arc<dyn DraftStore>,
    key: DraftKey,
}

impl DraftPersistence {
    pub fn new(store: Arc<dyn DraftStore>, key: DraftKey) -> Self {
        Self { store, key }
    }

    pub fn key(&self) -> &DraftKey {
        &self.key
    }

    /// Load the saved draft, if any. Failures are logged and read as "no draft".
    pub async fn load(&self) -> Option<AnswerModel> {
        match self.store.load(&self.key).await {
            Ok(draft) => {
                tracing::debug!(key = %self.key, found = draft.is_some(), "Loaded wizard draft");
                draft
            }
            Err(e) => {
                tracing::warn!(
                    key = %self.key,
                    kind = %e.kind(),
                    error = %e,
                    "Failed to load wizard draft, starting empty"
                );
                None
            }
        }
    }

    /// Spawn the background writer for this session.
    pub fn spawn_writer(&self) -> DraftWriter {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_writer(Arc::clone(&self.store), self.key.clone(), rx));
        DraftWriter {
            tx,
            handle: Arc::new(handle),
        }
    }
}

#[derive(Debug)]
enum DraftWrite {
    Save(Box<AnswerModel>),
    Clear,
}

#[derive(Debug)]
enum WriterOp {
    Write(DraftWrite),
    Flush(oneshot::Sender<()>),
}

/// Non-blocking handle for queuing draft writes.
#[derive(Clone)]
pub struct DraftWriter {
    tx: mpsc::UnboundedSender<WriterOp>,
    handle: Arc<JoinHandle<()>>,
}

impl DraftWriter {
    /// Queue a save of `answers`.
    pub fn save(&self, answers: &AnswerModel) {
        self.send(WriterOp::Write(DraftWrite::Save(Box::new(answers.clone()))));
    }

    /// Queue deletion of the draft.
    pub fn clear(&self) {
        self.send(WriterOp::Write(DraftWrite::Clear));
    }

    /// Wait until every write queued before this call has been applied.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.send(WriterOp::Flush(ack_tx));
        let _ = ack_rx.await;
    }

    /// Whether the background task has exited.
    pub fn is_closed(&self) -> bool {
        self.handle.is_finished()
    }

    fn send(&self, op: WriterOp) {
        if self.tx.send(op).is_err() {
            tracing::debug!("Draft writer is gone, dropping write");
        }
    }
}

async fn run_writer(
    store: Arc<dyn DraftStore>,
    key: DraftKey,
    mut rx: mpsc::UnboundedReceiver<WriterOp>,
) {
    let mut pending: Option<DraftWrite> = None;
    let mut acks: Vec<oneshot::Sender<()>> = Vec::new();

    while let Some(op) = rx.recv().await {
        absorb(op, &mut pending, &mut acks);
        while let Ok(op) = rx.try_recv() {
            absorb(op, &mut pending, &mut acks);
        }

        if let Some(write) = pending.take() {
            apply(store.as_ref(), &key, write).await;
        }
        for ack in acks.drain(..) {
            let _ = ack.send(());
        }
    }
    tracing::debug!(key = %key, "Draft writer stopped");
}

fn absorb(op: WriterOp, pending: &mut Option<DraftWrite>, acks: &mut Vec<oneshot::Sender<()>>) {
    match op {
        WriterOp::Write(write) => *pending = Some(write),
        WriterOp::Flush(ack) => acks.push(ack),
    }
}

async fn apply(store: &dyn DraftStore, key: &DraftKey, write: DraftWrite) {
    let (action, result) = match write {
        DraftWrite::Save(answers) => ("save", store.save(key, &answers).await),
        DraftWrite::Clear => ("clear", store.clear(key).await),
    };
    match result {
        Ok(()) => tracing::debug!(key = %key, action, "Draft written"),
        Err(e) => tracing::warn!(
            key = %key,
            action,
            kind = %e.kind(),
            error = %e,
            "Failed to persist wizard draft, continuing in memory"
        ),
    }
}
