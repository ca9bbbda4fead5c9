//! View-model bookkeeping for analyses and files.
//!
//! The board mirrors what the dashboard would render: records keyed by id,
//! updated from HTTP replies and from push events. Applying a push event
//! yields at most one toast, and a transition the record has already made
//! yields none, so duplicate deliveries stay quiet.

use std::collections::HashMap;
use std::sync::Arc;

use finboard_core::{
    AnalysisId, AnalysisRecord, AnalysisStatus, FileId, FileStatus, PushEvent, Toast, UiSignal,
    UploadedFile, format_duration_ms,
};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::bus::{EventBus, recv_lossy};

/// Analyses and files known to this client.
#[derive(Debug, Default)]
pub struct AnalysisBoard {
    analyses: HashMap<AnalysisId, AnalysisRecord>,
    files: HashMap<FileId, UploadedFile>,
}

impl AnalysisBoard {
    /// Empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an analysis record from an HTTP reply.
    pub fn track_analysis(&mut self, record: AnalysisRecord) {
        let _ = self.analyses.insert(record.id.clone(), record);
    }

    /// Insert or replace a file record from an HTTP reply.
    pub fn track_file(&mut self, file: UploadedFile) {
        let _ = self.files.insert(file.id.clone(), file);
    }

    /// Forget a deleted file.
    pub fn forget_file(&mut self, id: &FileId) -> Option<UploadedFile> {
        self.files.remove(id)
    }

    /// Look up an analysis.
    pub fn analysis(&self, id: &AnalysisId) -> Option<&AnalysisRecord> {
        self.analyses.get(id)
    }

    /// Look up a file.
    pub fn file(&self, id: &FileId) -> Option<&UploadedFile> {
        self.files.get(id)
    }

    /// All analyses, newest first (unknown creation times last), then by id.
    pub fn analyses(&self) -> Vec<&AnalysisRecord> {
        let mut records: Vec<_> = self.analyses.values().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        records
    }

    /// All files, by name.
    pub fn files(&self) -> Vec<&UploadedFile> {
        let mut files: Vec<_> = self.files.values().collect();
        files.sort_by(|a, b| a.filename.cmp(&b.filename).then_with(|| a.id.cmp(&b.id)));
        files
    }

    /// Drop everything (logout).
    pub fn clear(&mut self) {
        self.analyses.clear();
        self.files.clear();
    }

    /// Fold a push event into the board, returning the toast to show.
    pub fn apply(&mut self, event: &PushEvent) -> Option<Toast> {
        match event {
            PushEvent::AnalysisStarted {
                request_id,
                analysis_type,
            } => {
                let record = self.analysis_entry(request_id);
                if record.status.is_terminal() || record.status == AnalysisStatus::Running {
                    return None;
                }
                record.status = AnalysisStatus::Running;
                if let Some(kind) = analysis_type {
                    if record.analysis_type.is_empty() {
                        record.analysis_type.clone_from(kind);
                    }
                }
                Some(Toast::info(format!("Analysis {request_id} started")))
            }
            PushEvent::AnalysisCompleted {
                request_id,
                execution_time_ms,
                results,
            } => {
                let record = self.analysis_entry(request_id);
                if record.status.is_terminal() {
                    return None;
                }
                record.status = AnalysisStatus::Completed;
                record.execution_time_ms = *execution_time_ms;
                record.error = None;
                if results.is_some() {
                    record.results.clone_from(results);
                }
                Some(Toast::success(match execution_time_ms {
                    Some(ms) => format!(
                        "Analysis {request_id} completed in {}",
                        format_duration_ms(*ms)
                    ),
                    None => format!("Analysis {request_id} completed"),
                }))
            }
            PushEvent::AnalysisError { request_id, error } => {
                let record = self.analysis_entry(request_id);
                if record.status.is_terminal() {
                    return None;
                }
                record.status = AnalysisStatus::Failed;
                record.error.clone_from(error);
                Some(Toast::error(match error {
                    Some(reason) => format!("Analysis {request_id} failed: {reason}"),
                    None => format!("Analysis {request_id} failed"),
                }))
            }
            PushEvent::FileProcessed {
                file_id,
                filename,
                status,
            } => {
                let new_status = status
                    .as_deref()
                    .map_or(FileStatus::Processed, FileStatus::from_wire);
                let file = self
                    .files
                    .entry(file_id.clone())
                    .or_insert_with(|| UploadedFile {
                        id: file_id.clone(),
                        filename: filename.clone().unwrap_or_else(|| file_id.to_string()),
                        size_bytes: None,
                        status: FileStatus::Uploaded,
                        uploaded_at: None,
                    });
                if file.status == new_status {
                    return None;
                }
                file.status = new_status;
                Some(if new_status == FileStatus::Failed {
                    Toast::error(format!("File {} could not be processed", file.filename))
                } else {
                    Toast::info(format!("File {} processed", file.filename))
                })
            }
            PushEvent::Unknown => None,
        }
    }

    fn analysis_entry(&mut self, id: &AnalysisId) -> &mut AnalysisRecord {
        self.analyses
            .entry(id.clone())
            .or_insert_with(|| AnalysisRecord::placeholder(id.clone()))
    }
}

/// Keep `board` in sync with the push bus, forwarding toasts to `signals`.
///
/// Exits when the push bus closes.
pub fn spawn_board_sync(
    board: Arc<Mutex<AnalysisBoard>>,
    mut events: broadcast::Receiver<PushEvent>,
    signals: EventBus<UiSignal>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = recv_lossy(&mut events, "board_sync").await {
            let toast = board.lock().apply(&event);
            if let Some(toast) = toast {
                debug!(kind = event.kind(), level = ?toast.level, "board toast");
                let _ = signals.publish(UiSignal::Toast(toast));
            }
        }
        debug!("board sync: push bus closed");
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
