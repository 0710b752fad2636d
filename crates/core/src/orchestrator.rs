//! Lifecycle of one analysis request.
//!
//! `submit` runs: archive the image (best-effort) → one call to the backend
//! under a bounded wait → hand a history record to the store (best-effort,
//! success only, not awaited). Nothing is retried; a failure ends the attempt.
//! Blocking file and database work runs on tokio's blocking pool.

use crate::analysis::{AnalysisRequest, AnalysisResult};
use crate::archive::ImageArchive;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::geometry::CaptureRect;
use crate::history::{HistoryStore, NewHistoryRecord, SqliteHistoryStore};
use crate::image_processing::CaptureImage;
use crate::relay::{AnalysisBackend, RelayClient};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::{self, JoinHandle};

pub type DefaultOrchestrator = Orchestrator<RelayClient, SqliteHistoryStore>;

pub struct Orchestrator<B, S> {
    backend: B,
    store: Arc<S>,
    archive: Option<ImageArchive>,
    timeout: Duration,
    /// History writes that may still be running.
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl DefaultOrchestrator {
    /// Relay client, SQLite history and image archive from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Orchestrator::new(
            RelayClient::new(config)?,
            SqliteHistoryStore::open(config.history_path())?,
            config.timeout,
        )
        .with_archive(ImageArchive::new(config.captures_dir())))
    }
}

impl<B: AnalysisBackend, S: HistoryStore + 'static> Orchestrator<B, S> {
    pub fn new(backend: B, store: S, timeout: Duration) -> Self {
        Self {
            backend,
            store: Arc::new(store),
            archive: None,
            timeout,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn with_archive(mut self, archive: ImageArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Sends one capture for analysis.
    ///
    /// Returns as soon as the backend answers; the history record is written
    /// in the background (see [`Orchestrator::flush`]).
    ///
    /// # Errors
    ///
    /// - [`AppError::ServiceUnavailable`] when the relay is not running
    /// - [`AppError::AnalysisTimeout`] when no answer arrives in time
    /// - [`AppError::AnalysisFailed`] for any other backend failure
    pub async fn submit(&self, image: CaptureImage) -> Result<AnalysisResult> {
        let region = image.rect();
        let image_path = self.archive_image(&image).await;

        let request = AnalysisRequest::new(image);
        log::info!(
            "Submitting {}x{} region at ({}, {}) for analysis",
            region.width,
            region.height,
            region.x,
            region.y
        );

        let result = match tokio::time::timeout(self.timeout, self.backend.analyze(&request)).await {
            Ok(outcome) => outcome?,
            Err(_) => return Err(AppError::AnalysisTimeout(self.timeout)),
        };

        self.record(image_path, region, &result, request.submitted_at);
        Ok(result)
    }

    /// Waits for history writes started by earlier submissions.
    pub async fn flush(&self) {
        let handles: Vec<_> = match self.pending.lock() {
            Ok(mut pending) => pending.drain(..).collect(),
            Err(_) => return,
        };
        for handle in handles {
            if let Err(e) = handle.await {
                log::warn!("History write task failed: {}", e);
            }
        }
    }

    async fn archive_image(&self, image: &CaptureImage) -> Option<PathBuf> {
        let archive = self.archive.clone()?;
        let image = image.clone();
        match task::spawn_blocking(move || archive.persist(&image)).await {
            Ok(Ok(path)) => {
                log::debug!("Saved capture to {}", path.display());
                Some(path)
            }
            Ok(Err(e)) => {
                log::warn!("Could not save capture locally, continuing: {}", e);
                None
            }
            Err(e) => {
                log::warn!("Capture archive task failed, continuing: {}", e);
                None
            }
        }
    }

    fn record(
        &self,
        image_path: Option<PathBuf>,
        region: CaptureRect,
        result: &AnalysisResult,
        at: DateTime<Utc>,
    ) {
        let record = match NewHistoryRecord::new(image_path.as_deref(), region, result, at) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("{}", AppError::HistoryWrite(e.to_string()));
                return;
            }
        };

        let store = Arc::clone(&self.store);
        let handle = task::spawn_blocking(move || {
            if let Err(e) = store.append(record) {
                log::warn!("{}", e);
            }
        });
        if let Ok(mut pending) = self.pending.lock() {
            pending.retain(|h| !h.is_finished());
            pending.push(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryRecord;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    /// Shared journal so tests can check the order of side effects.
    type Journal = Arc<Mutex<Vec<String>>>;

    enum Reply {
        Ok(AnalysisResult),
        Refused,
        Fail(&'static str),
        Hang,
    }

    struct FakeBackend {
        reply: Reply,
        journal: Journal,
        archive_dir: Option<std::path::PathBuf>,
    }

    impl AnalysisBackend for FakeBackend {
        async fn analyze(&self, _request: &AnalysisRequest) -> Result<AnalysisResult> {
            let archived = self
                .archive_dir
                .as_ref()
                .map(|dir| std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0))
                .unwrap_or(0);
            self.journal
                .lock()
                .unwrap()
                .push(format!("analyze (archived: {archived})"));
            match &self.reply {
                Reply::Ok(result) => Ok(result.clone()),
                Reply::Refused => Err(AppError::ServiceUnavailable {
                    hint: "start the relay with `npm start`".into(),
                }),
                Reply::Fail(message) => Err(AppError::analysis(*message)),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    unreachable!("the orchestrator gives up first")
                }
            }
        }
    }

    #[derive(Clone, Default)]
    struct MemoryStore {
        records: Arc<Mutex<Vec<HistoryRecord>>>,
        journal: Journal,
        broken: bool,
    }

    impl HistoryStore for MemoryStore {
        fn append(&self, record: NewHistoryRecord) -> Result<HistoryRecord> {
            self.journal.lock().unwrap().push("history".into());
            if self.broken {
                return Err(AppError::HistoryWrite("disk full".into()));
            }
            let mut records = self.records.lock().unwrap();
            let saved = HistoryRecord {
                id: records.len() as u64 + 1,
                image_path: record.image_path,
                region: record.region,
                result: record.result,
                timestamp: record.timestamp,
            };
            records.push(saved.clone());
            Ok(saved)
        }

        fn recent(&self, limit: usize) -> Result<Vec<HistoryRecord>> {
            Ok(self.records.lock().unwrap().iter().rev().take(limit).cloned().collect())
        }
    }

    fn capture() -> CaptureImage {
        // 1x1 PNG
        CaptureImage::new(
            "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==".into(),
            CaptureRect {
                x: 92,
                y: 92,
                width: 57,
                height: 57,
            },
        )
    }

    fn orchestrator(reply: Reply, store: MemoryStore) -> Orchestrator<FakeBackend, MemoryStore> {
        let backend = FakeBackend {
            reply,
            journal: store.journal.clone(),
            archive_dir: None,
        };
        Orchestrator::new(backend, store, Duration::from_secs(30))
    }

    #[tokio::test]
    async fn success_archives_then_analyzes_then_records() {
        let dir = tempdir().unwrap();
        let store = MemoryStore::default();
        let backend = FakeBackend {
            reply: Reply::Ok(AnalysisResult {
                description: Some("A cat".into()),
                ..Default::default()
            }),
            journal: store.journal.clone(),
            archive_dir: Some(dir.path().to_path_buf()),
        };
        let orchestrator = Orchestrator::new(backend, store.clone(), Duration::from_secs(30))
            .with_archive(ImageArchive::new(dir.path()));

        let result = orchestrator.submit(capture()).await.unwrap();
        assert_eq!(result.description.as_deref(), Some("A cat"));
        orchestrator.flush().await;

        assert_eq!(
            *store.journal.lock().unwrap(),
            ["analyze (archived: 1)", "history"]
        );
        let records = store.recent(10).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].image_path.ends_with(".png"));
        assert_eq!(records[0].region().unwrap(), capture().rect());
        assert_eq!(records[0].result().unwrap(), result);
    }

    #[tokio::test]
    async fn refused_connection_writes_no_history() {
        let store = MemoryStore::default();
        let orchestrator = orchestrator(Reply::Refused, store.clone());

        match orchestrator.submit(capture()).await {
            Err(AppError::ServiceUnavailable { hint }) => assert!(hint.contains("npm start")),
            other => panic!("expected ServiceUnavailable, got {other:?}"),
        }
        orchestrator.flush().await;
        assert!(store.recent(10).unwrap().is_empty());
        assert_eq!(*store.journal.lock().unwrap(), ["analyze (archived: 0)"]);
    }

    #[tokio::test]
    async fn backend_failure_passes_through_without_history() {
        let store = MemoryStore::default();
        let orchestrator = orchestrator(Reply::Fail("model crashed"), store.clone());

        match orchestrator.submit(capture()).await {
            Err(AppError::AnalysisFailed(message)) => assert_eq!(message, "model crashed"),
            other => panic!("expected AnalysisFailed, got {other:?}"),
        }
        assert!(store.recent(10).unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_times_out() {
        let store = MemoryStore::default();
        let orchestrator = orchestrator(Reply::Hang, store.clone());

        match orchestrator.submit(capture()).await {
            Err(AppError::AnalysisTimeout(after)) => assert_eq!(after, Duration::from_secs(30)),
            other => panic!("expected AnalysisTimeout, got {other:?}"),
        }
        assert!(store.recent(10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn history_failure_does_not_fail_the_analysis() {
        let store = MemoryStore {
            broken: true,
            ..Default::default()
        };
        let orchestrator = orchestrator(Reply::Ok(AnalysisResult::default()), store.clone());

        assert!(orchestrator.submit(capture()).await.is_ok());
        orchestrator.flush().await;
        assert_eq!(
            *store.journal.lock().unwrap(),
            ["analyze (archived: 0)", "history"]
        );
    }

    #[tokio::test]
    async fn unwritable_archive_does_not_block_analysis() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file in the way").unwrap();

        let store = MemoryStore::default();
        let orchestrator = orchestrator(Reply::Ok(AnalysisResult::default()), store.clone())
            .with_archive(ImageArchive::new(&blocker));

        orchestrator.submit(capture()).await.unwrap();
        orchestrator.flush().await;
        let records = store.recent(1).unwrap();
        assert_eq!(records[0].image_path, "");
    }

    /// Holds every append until the test releases it.
    struct GatedStore {
        gate: Mutex<std::sync::mpsc::Receiver<()>>,
        inner: MemoryStore,
    }

    impl HistoryStore for GatedStore {
        fn append(&self, record: NewHistoryRecord) -> Result<HistoryRecord> {
            let _ = self.gate.lock().unwrap().recv();
            self.inner.append(record)
        }

        fn recent(&self, limit: usize) -> Result<Vec<HistoryRecord>> {
            self.inner.recent(limit)
        }
    }

    #[tokio::test]
    async fn result_is_returned_before_history_write_finishes() {
        let (release, gate) = std::sync::mpsc::channel();
        let inner = MemoryStore::default();
        let store = GatedStore {
            gate: Mutex::new(gate),
            inner: inner.clone(),
        };
        let backend = FakeBackend {
            reply: Reply::Ok(AnalysisResult::default()),
            journal: inner.journal.clone(),
            archive_dir: None,
        };
        let orchestrator = Orchestrator::new(backend, store, Duration::from_secs(30));

        orchestrator.submit(capture()).await.unwrap();
        assert!(inner.recent(10).unwrap().is_empty());

        release.send(()).unwrap();
        orchestrator.flush().await;
        assert_eq!(inner.recent(10).unwrap().len(), 1);
    }
}
