//! Change capture: turns user edits on the home grid into operations.

use crate::collab::{AcquisitionManager, ContextHold};
use crate::context::AppContext;
use crate::error::SubmissionError;
use crate::metrics;
use crate::page::Page;
use crate::resource::LogoFile;
use crate::telemetry::spans;
use crate::view::{ChangeStamp, EditableRecord};
use chrono::{DateTime, Utc};
use dealport_collab::{DocumentContext, Operation, RecordId};
use futures_util::future::join_all;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

/// Outcome of one flush.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlushReport {
    /// Records whose changes were all accepted.
    pub submitted: Vec<RecordId>,
    /// Operations built across all records.
    pub operations: usize,
    /// Logo uploads started.
    pub logos: usize,
    /// Dirty records dropped because no context was held for them.
    pub missing_context: Vec<RecordId>,
    /// Records with at least one failed submission.
    pub failed: usize,
    /// Set when nothing failed.
    pub saved_at: Option<DateTime<Utc>>,
}

impl FlushReport {
    fn outcome(&self) -> &'static str {
        if self.failed > 0 {
            "failed"
        } else if !self.missing_context.is_empty() {
            "partial"
        } else if self.submitted.is_empty() {
            "empty"
        } else {
            "saved"
        }
    }
}

/// A dirty record and the context its changes go to.
struct PendingRecord {
    id: RecordId,
    hold: ContextHold,
    ops: Vec<Operation>,
    logo: Option<LogoFile>,
}

/// Changes captured from the grid in one pass, ready to submit.
struct ChangeBatch {
    since: ChangeStamp,
    records: Vec<PendingRecord>,
    report: FlushReport,
}

/// Collects fields changed since the previous flush and submits them
/// through the acquired company contexts. Cheap to clone; clones share the
/// capture point and never submit concurrently.
#[derive(Clone)]
pub struct ChangeFlusher {
    cx: AppContext,
    contexts: Arc<AcquisitionManager>,
    since: Arc<Mutex<ChangeStamp>>,
    editing: Arc<AtomicBool>,
    serial: Arc<tokio::sync::Mutex<()>>,
}

impl ChangeFlusher {
    pub fn new(cx: AppContext, contexts: Arc<AcquisitionManager>) -> Self {
        Self {
            cx,
            contexts,
            since: Arc::new(Mutex::new(ChangeStamp::ZERO)),
            editing: Arc::new(AtomicBool::new(false)),
            serial: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn start_editing(&self) {
        self.editing.store(true, Ordering::SeqCst);
    }

    pub fn is_editing(&self) -> bool {
        self.editing.load(Ordering::SeqCst)
    }

    /// Submit the edits made since the previous flush. `None` outside edit mode.
    ///
    /// Waits for a flush already in progress, so submissions keep edit order.
    pub async fn flush(&self) -> Option<FlushReport> {
        let _saving = self.cx.saves.begin();
        let _serial = self.serial.lock().await;
        if !self.is_editing() {
            debug!("flush skipped outside edit mode");
            return None;
        }
        let batch = self.capture(&self.cx.page.lock());
        let span = spans::flush(batch.since.get());
        Some(self.submit(batch).instrument(span).await)
    }

    /// Leave edit mode, handing edits not yet flushed to a background save.
    ///
    /// Must be called with the page locked, while the grid and its contexts
    /// are still in place. The captured contexts stay open until the save
    /// completes; `last_save` is left alone.
    pub fn finish(&self, page: &Page) {
        self.editing.store(false, Ordering::SeqCst);
        let batch = self.capture(page);
        if batch.records.is_empty() {
            return;
        }

        info!(records = batch.records.len(), "saving pending edits on leave");
        let saving = self.cx.saves.begin();
        let flusher = self.clone();
        let span = spans::flush(batch.since.get());
        tokio::spawn(
            async move {
                let _saving = saving;
                let _serial = flusher.serial.lock().await;
                flusher.submit(batch).await;
            }
            .instrument(span),
        );
    }

    /// One consistent view of the grid, taken before anything is awaited.
    fn capture(&self, page: &Page) -> ChangeBatch {
        let since = std::mem::replace(&mut *self.since.lock(), ChangeStamp::now());
        let mut batch = ChangeBatch {
            since,
            records: Vec::new(),
            report: FlushReport::default(),
        };
        let Some(home) = page.home() else {
            return batch;
        };
        let acquisition = self.contexts.current();

        for item in home.grid.items() {
            let Some(mut values) = item.values_since(since) else {
                continue;
            };
            let id = item.id().clone();
            let hold = acquisition
                .as_ref()
                .filter(|a| a.contains(&id))
                .and_then(|a| a.registry().hold(&id));
            let Some(hold) = hold else {
                warn!(id = %id, "unable to update company, its collaborative context is missing");
                metrics::record_missing_context();
                batch.report.missing_context.push(id);
                continue;
            };
            let logo = values.take_file();
            let ops = values.to_operations();
            batch.report.operations += ops.len();
            batch.report.logos += usize::from(logo.is_some());
            batch.records.push(PendingRecord { id, hold, ops, logo });
        }
        batch
    }

    async fn submit(&self, batch: ChangeBatch) -> FlushReport {
        let ChangeBatch {
            records, mut report, ..
        } = batch;

        let submissions = records.into_iter().map(|record| self.submit_record(record));
        for (id, errors) in join_all(submissions).await {
            if errors.is_empty() {
                report.submitted.push(id);
                continue;
            }
            report.failed += 1;
            for e in &errors {
                self.cx.exceptions.log_exception(e);
            }
        }

        if report.failed == 0 {
            let now = Utc::now();
            report.saved_at = Some(now);
            if self.is_editing() {
                self.cx.page.lock().last_save = Some(now);
            }
        }

        metrics::record_flush(report.outcome());
        info!(
            submitted = report.submitted.len(),
            operations = report.operations,
            missing = report.missing_context.len(),
            failed = report.failed,
            "flushed changes"
        );
        report
    }

    async fn submit_record(&self, record: PendingRecord) -> (RecordId, Vec<SubmissionError>) {
        let PendingRecord { id, hold, ops, logo } = record;
        let context = hold.context();

        let submit_ops = async {
            if ops.is_empty() {
                return Ok(());
            }
            let count = ops.len();
            context
                .submit_operations(ops)
                .await
                .map(|()| metrics::record_operations(count))
                .map_err(|source| SubmissionError::Operations {
                    id: id.clone(),
                    source,
                })
        };

        let upload = async {
            let Some(file) = logo else {
                return Ok(());
            };
            self.cx
                .resources
                .uploaded_image
                .update_company_logo(&id, file)
                .await
                .map(|url| debug!(id = %id, url = %url, "uploaded logo"))
                .map_err(|source| SubmissionError::Logo {
                    id: id.clone(),
                    source,
                })
        };

        let (ops_result, upload_result) = tokio::join!(submit_ops, upload);
        let errors = [ops_result.err(), upload_result.err()].into_iter().flatten().collect();
        (id, errors)
    }
}
