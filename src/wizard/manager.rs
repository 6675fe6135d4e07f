//! WizardManager — one user's wizard session behind an async lock, plus the
//! per-user session registry used by the HTTP layer.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;

use super::catalog::{StepPrompt, SummaryLine, prompt_for, review_summary};
use super::controller::{Advance, WizardController};
use super::draft::{DraftKey, DraftPersistence, DraftStore};
use super::model::{AnswerModel, AnswerUpdate};
use super::record::{FinishedRecord, PlantingArea};
use super::steps::StepId;
use crate::error::StepError;
use crate::store::RecordSink;

/// Snapshot of a session for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct WizardStatus {
    pub user_id: String,
    pub completed: bool,
    pub position: usize,
    pub current_step: StepId,
    pub steps: Vec<StepId>,
    /// `"{current}/{total}"`, counting from one.
    pub progress: String,
    pub percent: u8,
    pub answers: AnswerModel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StepError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<StepPrompt>,
    /// Review lines; empty unless the current step is review.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub summary: Vec<SummaryLine>,
}

impl WizardStatus {
    fn from_controller(user_id: &str, c: &WizardController) -> Self {
        let current_step = c.current_step();
        let progress = c.progress();
        let (prompt, summary) = if c.is_completed() {
            (None, Vec::new())
        } else if current_step.is_terminal() {
            (
                Some(prompt_for(current_step, c.answers())),
                review_summary(c.answers(), c.steps()),
            )
        } else {
            (Some(prompt_for(current_step, c.answers())), Vec::new())
        };

        Self {
            user_id: user_id.to_string(),
            completed: c.is_completed(),
            position: c.position(),
            current_step,
            steps: c.steps().to_vec(),
            progress: progress.to_string(),
            percent: progress.percent(),
            answers: c.answers().clone(),
            error: c.error().cloned(),
            prompt,
            summary,
        }
    }
}

/// Result of an advance request.
#[derive(Debug, Clone, Serialize)]
pub struct AdvanceResponse {
    pub status: WizardStatus,
    /// Set when validation blocked the advance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StepError>,
    /// Set on the advance that completed the wizard.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<FinishedRecord>,
    /// The registered area, if the record sink accepted the record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<PlantingArea>,
}

impl AdvanceResponse {
    pub fn is_blocked(&self) -> bool {
        self.error.is_some()
    }
}

/// Coordinates a single wizard session: controller state, draft writes, and
/// handing the finished record to the sink.
pub struct WizardManager {
    user_id: String,
    controller: RwLock<WizardController>,
    sink: Arc<dyn RecordSink>,
    /// Unix millis of the last request on this session.
    last_active_ms: AtomicI64,
}

impl WizardManager {
    /// Start a session, restoring the saved draft when `persistence` is given.
    pub async fn start(
        user_id: impl Into<String>,
        persistence: Option<DraftPersistence>,
        sink: Arc<dyn RecordSink>,
    ) -> Self {
        let user_id = user_id.into();
        let controller = match persistence {
            Some(p) => {
                let restored = p.load().await;
                let resumed = restored.is_some();
                let c = WizardController::with_draft(restored.unwrap_or_default(), p.spawn_writer());
                tracing::info!(user_id = %user_id, key = %p.key(), resumed, "Wizard session started");
                c
            }
            None => {
                tracing::info!(user_id = %user_id, "Wizard session started without draft persistence");
                WizardController::new(AnswerModel::default())
            }
        };

        Self {
            user_id,
            controller: RwLock::new(controller),
            sink,
            last_active_ms: AtomicI64::new(Utc::now().timestamp_millis()),
        }
    }

    fn touch(&self) {
        self.last_active_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    /// Time since the last request on this session.
    pub fn idle_for(&self) -> Duration {
        let idle_ms = Utc::now().timestamp_millis() - self.last_active_ms.load(Ordering::Relaxed);
        Duration::from_millis(idle_ms.max(0) as u64)
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub async fn is_completed(&self) -> bool {
        self.controller.read().await.is_completed()
    }

    pub async fn get_status(&self) -> WizardStatus {
        self.touch();
        let c = self.controller.read().await;
        WizardStatus::from_controller(&self.user_id, &c)
    }

    pub async fn mutate(&self, update: AnswerUpdate) -> WizardStatus {
        self.touch();
        let mut c = self.controller.write().await;
        c.mutate(update);
        WizardStatus::from_controller(&self.user_id, &c)
    }

    pub async fn retreat(&self) -> WizardStatus {
        self.touch();
        let mut c = self.controller.write().await;
        c.retreat();
        WizardStatus::from_controller(&self.user_id, &c)
    }

    pub async fn jump(&self, step: StepId) -> WizardStatus {
        self.touch();
        let mut c = self.controller.write().await;
        c.jump(step);
        WizardStatus::from_controller(&self.user_id, &c)
    }

    /// Advance the wizard. On completion the record goes to the sink, and the
    /// draft clear is queued only once the sink has accepted it.
    pub async fn advance(&self) -> AdvanceResponse {
        self.touch();
        let mut c = self.controller.write().await;
        match c.advance() {
            Advance::Moved(_) | Advance::AlreadyCompleted => AdvanceResponse {
                status: WizardStatus::from_controller(&self.user_id, &c),
                error: None,
                record: None,
                area: None,
            },
            Advance::Blocked(e) => AdvanceResponse {
                status: WizardStatus::from_controller(&self.user_id, &c),
                error: Some(e),
                record: None,
                area: None,
            },
            Advance::Completed(record) => {
                let area = match self.sink.accept(&self.user_id, &record).await {
                    Ok(area) => {
                        c.discard_draft();
                        tracing::info!(
                            user_id = %self.user_id,
                            area_id = %area.id,
                            hectares = ?record.area_hectares,
                            "Wizard completed"
                        );
                        Some(area)
                    }
                    Err(e) => {
                        tracing::warn!(
                            user_id = %self.user_id,
                            error = %e,
                            "Record sink rejected finished record, keeping draft"
                        );
                        None
                    }
                };
                AdvanceResponse {
                    status: WizardStatus::from_controller(&self.user_id, &c),
                    error: None,
                    record: Some(*record),
                    area,
                }
            }
        }
    }

    /// Wait for queued draft writes to land.
    pub async fn flush(&self) {
        let writer = self.controller.read().await.draft_writer().cloned();
        if let Some(writer) = writer {
            writer.flush().await;
        }
    }
}

/// One wizard session per user.
///
/// A session is started (restoring its draft) on first use. Once a session
/// completes, the next request for that user starts a fresh one. Sessions
/// idle for longer than the configured timeout are dropped by
/// [`prune_idle`](Self::prune_idle); their drafts stay in the store.
pub struct WizardSessions {
    drafts: Arc<dyn DraftStore>,
    sink: Arc<dyn RecordSink>,
    namespace: String,
    sessions: RwLock<HashMap<String, Arc<WizardManager>>>,
}

impl WizardSessions {
    pub fn new(
        drafts: Arc<dyn DraftStore>,
        sink: Arc<dyn RecordSink>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            drafts,
            sink,
            namespace: namespace.into(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Get the live session for `user_id`, starting one if needed.
    pub async fn session(&self, user_id: &str) -> Arc<WizardManager> {
        let existing = self.sessions.read().await.get(user_id).cloned();
        if let Some(existing) = existing {
            if !existing.is_completed().await {
                return existing;
            }
            // The completed session's draft clear must land before the new
            // session reads the slot.
            existing.flush().await;
            tracing::debug!(user_id, "Replacing completed wizard session");
        }

        // Load the draft without holding the registry lock.
        let persistence = DraftPersistence::new(
            Arc::clone(&self.drafts),
            DraftKey::new(self.namespace.clone(), user_id),
        );
        let started = Arc::new(
            WizardManager::start(user_id, Some(persistence), Arc::clone(&self.sink)).await,
        );

        let mut sessions = self.sessions.write().await;
        if let Some(current) = sessions.get(user_id).cloned() {
            // Another request started a session while the draft was loading.
            if !current.is_completed().await {
                return current;
            }
        }
        sessions.insert(user_id.to_string(), Arc::clone(&started));
        started
    }

    /// Drop sessions idle for longer than `idle_timeout`, after letting their
    /// queued draft writes land. Returns how many were removed.
    pub async fn prune_idle(&self, idle_timeout: Duration) -> usize {
        let stale: Vec<(String, Arc<WizardManager>)> = {
            let mut sessions = self.sessions.write().await;
            let ids: Vec<String> = sessions
                .iter()
                .filter(|(_, m)| m.idle_for() >= idle_timeout)
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|id| sessions.remove(&id).map(|m| (id, m)))
                .collect()
        };

        for (user_id, manager) in &stale {
            manager.flush().await;
            tracing::debug!(user_id = %user_id, "Pruned idle wizard session");
        }
        if !stale.is_empty() {
            tracing::info!(count = stale.len(), "Pruned idle wizard sessions");
        }
        stale.len()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Wait for every session's pending draft writes.
    pub async fn flush_all(&self) {
        let managers: Vec<_> = self.sessions.read().await.values().cloned().collect();
        for manager in managers {
            manager.flush().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::error::{DatabaseError, ErrorKind};
    use crate::store::{Database, LibSqlBackend, SettingsRecordSink};
    use crate::wizard::draft::SettingsDraftStore;
    use crate::wizard::model::{
        FertigationChoice, FertilizerKind, MaterialsStatus, PlantingMethod, PropagationMethod,
    };

    struct RejectingSink;

    /// Draft store that stalls `user_id`'s loads or clears.
    struct StallingStore {
        user_id: &'static str,
        on_load: bool,
        on_clear: bool,
    }

    impl StallingStore {
        async fn stall(&self, key: &DraftKey, enabled: bool) {
            if enabled && key.user_id == self.user_id {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
        }
    }

    #[async_trait]
    impl DraftStore for StallingStore {
        async fn load(&self, key: &DraftKey) -> Result<Option<AnswerModel>, DatabaseError> {
            self.stall(key, self.on_load).await;
            Ok(None)
        }

        async fn save(&self, _key: &DraftKey, _answers: &AnswerModel) -> Result<(), DatabaseError> {
            Ok(())
        }

        async fn clear(&self, key: &DraftKey) -> Result<(), DatabaseError> {
            self.stall(key, self.on_clear).await;
            Ok(())
        }
    }

    const QUICK: Duration = Duration::from_secs(2);

    #[async_trait]
    impl RecordSink for RejectingSink {
        async fn accept(
            &self,
            _user_id: &str,
            _record: &FinishedRecord,
        ) -> Result<PlantingArea, DatabaseError> {
            Err(DatabaseError::Query("sink offline".into()))
        }
    }

    async fn setup() -> (Arc<dyn Database>, Arc<SettingsRecordSink>, WizardSessions) {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let sink = Arc::new(SettingsRecordSink::new(Arc::clone(&db)));
        let sessions = WizardSessions::new(
            Arc::new(SettingsDraftStore::new(Arc::clone(&db))),
            sink.clone(),
            "wizard_test",
        );
        (db, sink, sessions)
    }

    fn full_answers() -> Vec<AnswerUpdate> {
        vec![
            AnswerUpdate::AreaValue(Some(dec!(600))),
            AnswerUpdate::Crop(Some("Arugula".into())),
            AnswerUpdate::SoilCorrectionDone(Some(true)),
            AnswerUpdate::PlantingMethod(Some(PlantingMethod::Row)),
            AnswerUpdate::IrrigationUsed(Some(false)),
            AnswerUpdate::Fertigation(Some(FertigationChoice::No)),
            AnswerUpdate::PropagationMethod(Some(PropagationMethod::Seedling)),
            AnswerUpdate::SeedlingVariety(Some("Cultivated".into())),
            AnswerUpdate::SeedlingSupplier(Some("Nursery".into())),
            AnswerUpdate::SeedlingTray(Some(200)),
            AnswerUpdate::LocationLabel(Some("A-01".into())),
            AnswerUpdate::MaterialsStatus(Some(MaterialsStatus::Purchased)),
            AnswerUpdate::FertilizerKind(Some(FertilizerKind::Granular)),
        ]
    }

    /// Fill every answer up front, then advance to the last step.
    async fn fill_and_reach_review(manager: &WizardManager) {
        for update in full_answers() {
            manager.mutate(update).await;
        }
        loop {
            let response = manager.advance().await;
            assert!(!response.is_blocked(), "blocked: {:?}", response.error);
            if response.status.current_step == StepId::Review {
                break;
            }
        }
    }

    #[tokio::test]
    async fn status_carries_prompt_and_progress() {
        let (_db, _sink, sessions) = setup().await;
        let status = sessions.session("alice").await.get_status().await;

        assert_eq!(status.user_id, "alice");
        assert_eq!(status.current_step, StepId::Area);
        assert_eq!(status.progress, "1/11");
        assert_eq!(status.prompt.map(|p| p.step), Some(StepId::Area));
        assert!(status.summary.is_empty());
        assert!(!status.completed);
    }

    #[tokio::test]
    async fn blocked_advance_reports_error() {
        let (_db, _sink, sessions) = setup().await;
        let manager = sessions.session("alice").await;
        manager.mutate(AnswerUpdate::AreaInput("0".into())).await;

        let response = manager.advance().await;
        assert!(response.is_blocked());
        assert_eq!(response.error.map(|e| e.kind), Some(ErrorKind::OutOfRange));
        assert_eq!(response.status.position, 0);
        assert!(response.status.error.is_some());
    }

    #[tokio::test]
    async fn draft_survives_a_new_registry() {
        let (db, sink, sessions) = setup().await;
        let manager = sessions.session("alice").await;
        manager.mutate(AnswerUpdate::Crop(Some("Tomato".into()))).await;
        manager
            .mutate(AnswerUpdate::SoilCorrectionDone(Some(false)))
            .await;
        sessions.flush_all().await;

        let restarted = WizardSessions::new(
            Arc::new(SettingsDraftStore::new(db)),
            sink,
            "wizard_test",
        );
        let status = restarted.session("alice").await.get_status().await;
        assert_eq!(status.answers.crop.as_deref(), Some("Tomato"));
        assert_eq!(status.position, 0);
        assert!(status.steps.contains(&StepId::SoilPendingItems));
    }

    #[tokio::test]
    async fn review_shows_summary_and_completion_registers_area() {
        let (db, sink, sessions) = setup().await;
        let manager = sessions.session("alice").await;
        fill_and_reach_review(&manager).await;

        let status = manager.get_status().await;
        assert!(!status.summary.is_empty());
        assert!(status.summary.iter().all(|l| status.steps.contains(&l.edit)));

        let done = manager.advance().await;
        assert!(done.status.completed);
        assert_eq!(done.status.progress, "14/14");
        assert!(done.status.prompt.is_none());
        let record = done.record.unwrap();
        assert_eq!(record.area_hectares, Some(dec!(0.06)));
        let area = done.area.unwrap();
        assert_eq!(area.name, "A-01");

        assert_eq!(sink.list_areas("alice").await.unwrap(), vec![area]);
        manager.flush().await;
        assert!(db.get_setting("alice", "wizard_test").await.unwrap().is_none());

        // A completed session is replaced with a fresh one.
        let fresh = sessions.session("alice").await.get_status().await;
        assert!(!fresh.completed);
        assert_eq!(fresh.answers, AnswerModel::default());
    }

    #[tokio::test]
    async fn rejected_record_keeps_draft() {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let drafts = Arc::new(SettingsDraftStore::new(Arc::clone(&db)));
        let persistence = DraftPersistence::new(drafts, DraftKey::new("wizard_test", "alice"));
        let manager = WizardManager::start("alice", Some(persistence.clone()), Arc::new(RejectingSink)).await;

        fill_and_reach_review(&manager).await;
        let done = manager.advance().await;
        assert!(done.status.completed);
        assert!(done.record.is_some());
        assert!(done.area.is_none());

        manager.flush().await;
        let draft = persistence.load().await.unwrap();
        assert_eq!(draft.crop.as_deref(), Some("Arugula"));
    }

    #[tokio::test]
    async fn jump_and_back_from_review() {
        let (_db, _sink, sessions) = setup().await;
        let manager = sessions.session("alice").await;
        fill_and_reach_review(&manager).await;

        let status = manager.jump(StepId::Crop).await;
        assert_eq!(status.current_step, StepId::Crop);
        assert!(status.summary.is_empty());

        let status = manager.retreat().await;
        assert_eq!(status.current_step, StepId::Area);

        // Not on review any more, so jumping does nothing.
        let status = manager.jump(StepId::Location).await;
        assert_eq!(status.current_step, StepId::Area);
    }

    #[tokio::test]
    async fn session_without_persistence_still_works() {
        let manager = WizardManager::start("bob", None, Arc::new(RejectingSink)).await;
        manager.mutate(AnswerUpdate::AreaValue(Some(dec!(1)))).await;
        let response = manager.advance().await;
        assert_eq!(response.status.current_step, StepId::Crop);
        manager.flush().await;
    }

    #[tokio::test]
    async fn completion_does_not_wait_for_draft_clear() {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let store = Arc::new(StallingStore {
            user_id: "alice",
            on_load: false,
            on_clear: true,
        });
        let persistence = DraftPersistence::new(store, DraftKey::new("wizard_test", "alice"));
        let manager = WizardManager::start(
            "alice",
            Some(persistence),
            Arc::new(SettingsRecordSink::new(db)),
        )
        .await;
        fill_and_reach_review(&manager).await;

        let done = tokio::time::timeout(QUICK, manager.advance())
            .await
            .expect("completion waited on the draft store");
        assert!(done.status.completed);
        assert!(done.area.is_some());
        let status = tokio::time::timeout(QUICK, manager.get_status())
            .await
            .expect("session stayed locked after completion");
        assert!(status.completed);
    }

    #[tokio::test]
    async fn slow_draft_load_does_not_block_other_users() {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let sessions = Arc::new(WizardSessions::new(
            Arc::new(StallingStore {
                user_id: "slow",
                on_load: true,
                on_clear: false,
            }),
            Arc::new(SettingsRecordSink::new(db)),
            "wizard_test",
        ));

        let stalled = Arc::clone(&sessions);
        let pending = tokio::spawn(async move { stalled.session("slow").await });
        tokio::task::yield_now().await;

        let fast = tokio::time::timeout(QUICK, sessions.session("fast"))
            .await
            .expect("session lookup blocked behind another user's draft load");
        assert_eq!(fast.user_id(), "fast");
        assert!(!pending.is_finished());
        pending.abort();
    }

    #[tokio::test]
    async fn prune_idle_drops_sessions_and_keeps_drafts() {
        let (_db, _sink, sessions) = setup().await;
        let manager = sessions.session("alice").await;
        manager.mutate(AnswerUpdate::Crop(Some("Tomato".into()))).await;
        sessions.session("bob").await;
        assert_eq!(sessions.len().await, 2);

        assert_eq!(sessions.prune_idle(Duration::from_secs(3600)).await, 0);
        assert_eq!(sessions.len().await, 2);

        assert_eq!(sessions.prune_idle(Duration::ZERO).await, 2);
        assert!(sessions.is_empty().await);

        let restored = sessions.session("alice").await.get_status().await;
        assert_eq!(restored.answers.crop.as_deref(), Some("Tomato"));
        assert!(!Arc::ptr_eq(&manager, &sessions.session("alice").await));
    }
}
