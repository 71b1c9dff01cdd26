//! Download tracker

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};

use crate::download::{Download, DownloadId, DownloadState};
use crate::error::DownloadError;
use crate::Result;

const UPDATE_CAPACITY: usize = 64;

/// What the engine has to say about a transfer it is writing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadReport {
    /// `total <= 0` means the size is unknown
    Progress { received: i64, total: i64 },
    Finished { success: bool },
    Cancelled,
}

/// Cloneable sender the engine reports through. Sends never block.
///
/// The reporter also carries the stop signal: once the download is over
/// (the user cancelled it, or a final report was applied) the engine must
/// stop writing and remove its partial file.
#[derive(Debug, Clone)]
pub struct DownloadReporter {
    id: DownloadId,
    tx: mpsc::UnboundedSender<(DownloadId, DownloadReport)>,
    stop: watch::Receiver<bool>,
}

impl DownloadReporter {
    pub fn id(&self) -> DownloadId {
        self.id
    }

    /// False when the download is stopped or the tracker is gone; the report
    /// was not queued and the transfer should be abandoned.
    pub fn report(&self, report: DownloadReport) -> bool {
        if self.is_stopped() {
            tracing::debug!(download_id = %self.id, "Download stopped, report not sent");
            return false;
        }
        self.tx.send((self.id, report)).is_ok()
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop.borrow()
    }

    /// Resolves once the download is stopped or the tracker is dropped.
    pub async fn stopped(&self) {
        let mut stop = self.stop.clone();
        // An error means the tracker is gone, which stops the transfer too
        let _ = stop.wait_for(|stopped| *stopped).await;
    }

    pub fn progress(&self, received: i64, total: i64) -> bool {
        self.report(DownloadReport::Progress { received, total })
    }

    pub fn finished(&self, success: bool) -> bool {
        self.report(DownloadReport::Finished { success })
    }

    pub fn cancelled(&self) -> bool {
        self.report(DownloadReport::Cancelled)
    }
}

/// Handed to the engine once the user accepted a download.
#[derive(Debug, Clone)]
pub struct DownloadTicket {
    pub id: DownloadId,
    pub destination: PathBuf,
    pub reporter: DownloadReporter,
}

#[derive(Default)]
struct Records {
    downloads: HashMap<DownloadId, Download>,
    /// Request order
    order: Vec<DownloadId>,
    /// Raised when a download reaches a final state
    stops: HashMap<DownloadId, watch::Sender<bool>>,
}

impl Records {
    fn remove(&mut self, id: DownloadId) {
        self.downloads.remove(&id);
        self.order.retain(|other| *other != id);
        if let Some(stop) = self.stops.remove(&id) {
            stop.send_replace(true);
        }
    }
}

pub struct DownloadTracker {
    records: Arc<RwLock<Records>>,
    reports_tx: mpsc::UnboundedSender<(DownloadId, DownloadReport)>,
    reports_rx: Arc<Mutex<mpsc::UnboundedReceiver<(DownloadId, DownloadReport)>>>,
    updates: broadcast::Sender<Download>,
}

impl DownloadTracker {
    pub fn new() -> Self {
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);

        Self {
            records: Arc::new(RwLock::new(Records::default())),
            reports_tx,
            reports_rx: Arc::new(Mutex::new(reports_rx)),
            updates,
        }
    }

    /// Record a download the engine asked for; it waits for a destination.
    pub fn request_download(
        &self,
        suggested_path: impl Into<PathBuf>,
        source: Option<String>,
    ) -> Download {
        let download = Download::new(suggested_path, source);

        {
            let mut records = self.records.write();
            records.order.push(download.id);
            records.downloads.insert(download.id, download.clone());
            records.stops.insert(download.id, watch::channel(false).0);
        }

        tracing::info!(
            download_id = %download.id,
            suggested_path = %download.suggested_path.display(),
            "Download requested"
        );

        self.publish(&download);
        download
    }

    /// Apply the save dialog answer. `None` declines: nothing was reserved,
    /// no file exists and the record is dropped; the returned value is its
    /// final `Declined` state. A destination starts the transfer.
    pub fn resolve_destination(&self, id: DownloadId, chosen: Option<PathBuf>) -> Result<Download> {
        match chosen {
            None => {
                let download = self.update(id, |d| d.transition_to(DownloadState::Declined))?;
                self.records.write().remove(id);
                tracing::info!(download_id = %id, "Download declined");
                Ok(download)
            }
            Some(path) => {
                let download = self.update(id, |d| {
                    d.transition_to(DownloadState::Accepted)?;
                    d.destination = Some(path);
                    d.transition_to(DownloadState::InProgress)
                })?;
                tracing::info!(
                    download_id = %id,
                    destination = %path_display(download.destination()),
                    "Download started"
                );
                Ok(download)
            }
        }
    }

    /// Ticket for the engine writing an accepted download.
    pub fn ticket(&self, id: DownloadId) -> Result<DownloadTicket> {
        let download = self.get(id)?;

        match (download.state, download.destination) {
            (DownloadState::InProgress, Some(destination)) => Ok(DownloadTicket {
                id,
                destination,
                reporter: self.reporter(id),
            }),
            (state, _) => Err(DownloadError::InvalidTransition {
                from: state,
                to: DownloadState::InProgress,
            }),
        }
    }

    /// Reporter for `id`. For a download the tracker does not know it is
    /// stopped from the start.
    pub fn reporter(&self, id: DownloadId) -> DownloadReporter {
        let stop = match self.records.read().stops.get(&id) {
            Some(stop) => stop.subscribe(),
            None => watch::channel(true).1,
        };

        DownloadReporter {
            id,
            tx: self.reports_tx.clone(),
            stop,
        }
    }

    /// `total <= 0` marks the size as unknown.
    pub fn on_progress(&self, id: DownloadId, received: i64, total: i64) -> Result<Download> {
        self.update(id, |d| {
            d.transition_to(DownloadState::InProgress)?;
            d.received_bytes = u64::try_from(received).unwrap_or(0);
            d.total_bytes = u64::try_from(total).ok().filter(|t| *t > 0);
            Ok(())
        })
    }

    pub fn on_finished(&self, id: DownloadId, success: bool) -> Result<Download> {
        let target = if success {
            DownloadState::Completed
        } else {
            DownloadState::Failed
        };

        let download = self.update(id, |d| {
            d.transition_to(target)?;
            if success {
                if let Some(total) = d.total_bytes {
                    d.received_bytes = d.received_bytes.max(total);
                }
            }
            Ok(())
        })?;

        if success {
            tracing::info!(download_id = %id, "Download completed");
        } else {
            tracing::warn!(download_id = %id, "Download failed");
        }
        Ok(download)
    }

    /// Cancel on the user's behalf. The engine sees it through
    /// [`DownloadReporter::is_stopped`].
    pub fn cancel(&self, id: DownloadId) -> Result<Download> {
        let download = self.update(id, |d| d.transition_to(DownloadState::Cancelled))?;
        tracing::info!(download_id = %id, "Download cancelled");
        Ok(download)
    }

    /// Apply every queued report. Reports that cannot be applied are logged
    /// and dropped. Returns the updated records.
    pub fn process_reports(&self) -> Vec<Download> {
        let mut applied = Vec::new();
        let mut rx = self.reports_rx.lock();

        while let Ok((id, report)) = rx.try_recv() {
            let result = match report {
                DownloadReport::Progress { received, total } => self.on_progress(id, received, total),
                DownloadReport::Finished { success } => self.on_finished(id, success),
                DownloadReport::Cancelled => self.cancel(id),
            };

            match result {
                Ok(download) => applied.push(download),
                Err(e) => {
                    tracing::debug!(download_id = %id, error = %e, "Dropped download report");
                }
            }
        }

        applied
    }

    pub fn get(&self, id: DownloadId) -> Result<Download> {
        self.records
            .read()
            .downloads
            .get(&id)
            .cloned()
            .ok_or(DownloadError::NotFound(id))
    }

    /// All downloads in request order
    pub fn list(&self) -> Vec<Download> {
        let records = self.records.read();
        records
            .order
            .iter()
            .filter_map(|id| records.downloads.get(id).cloned())
            .collect()
    }

    pub fn active(&self) -> Vec<Download> {
        self.list().into_iter().filter(Download::is_active).collect()
    }

    /// Receive every updated record, for the downloads panel.
    pub fn subscribe(&self) -> broadcast::Receiver<Download> {
        self.updates.subscribe()
    }

    /// Forget every download in a terminal state. Returns how many were removed.
    pub fn clear_finished(&self) -> usize {
        let mut records = self.records.write();

        let finished: Vec<_> = records
            .order
            .iter()
            .copied()
            .filter(|id| records.downloads.get(id).map_or(true, |d| d.state.is_terminal()))
            .collect();

        for id in &finished {
            records.remove(*id);
        }

        finished.len()
    }

    /// Mutate one record. On error the record is left untouched.
    fn update<F>(&self, id: DownloadId, f: F) -> Result<Download>
    where
        F: FnOnce(&mut Download) -> Result<()>,
    {
        let download = {
            let mut records = self.records.write();
            let current = records
                .downloads
                .get_mut(&id)
                .ok_or(DownloadError::NotFound(id))?;

            let mut next = current.clone();
            f(&mut next)?;
            *current = next.clone();

            if next.state.is_terminal() {
                if let Some(stop) = records.stops.get(&id) {
                    stop.send_replace(true);
                }
            }
            next
        };

        self.publish(&download);
        Ok(download)
    }

    fn publish(&self, download: &Download) {
        // No receiver is fine
        let _ = self.updates.send(download.clone());
    }
}

impl Default for DownloadTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for DownloadTracker {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
            reports_tx: self.reports_tx.clone(),
            reports_rx: Arc::clone(&self.reports_rx),
            updates: self.updates.clone(),
        }
    }
}

fn path_display(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(tracker: &DownloadTracker) -> Download {
        let download = tracker.request_download("/tmp/file.pdf", Some("https://example.com".into()));
        tracker
            .resolve_destination(download.id, Some(PathBuf::from("/downloads/file.pdf")))
            .unwrap()
    }

    #[test]
    fn test_download_lifecycle() {
        let tracker = DownloadTracker::new();

        let download = tracker.request_download("/tmp/file.pdf", None);
        assert_eq!(download.state, DownloadState::AwaitingDestination);

        let download = tracker
            .resolve_destination(download.id, Some(PathBuf::from("/downloads/file.pdf")))
            .unwrap();
        assert_eq!(download.state, DownloadState::InProgress);
        assert_eq!(download.destination(), Some(Path::new("/downloads/file.pdf")));

        let updated = tracker.on_progress(download.id, 500, 1000).unwrap();
        assert_eq!(updated.received_bytes, 500);
        assert_eq!(updated.progress(), Some(50.0));

        let completed = tracker.on_finished(download.id, true).unwrap();
        assert_eq!(completed.state, DownloadState::Completed);
        assert!(completed.finished_at.is_some());
        assert!(tracker.active().is_empty());
    }

    #[test]
    fn test_declined_download() {
        let tracker = DownloadTracker::new();
        let download = tracker.request_download("/tmp/file.pdf", None);

        let declined = tracker.resolve_destination(download.id, None).unwrap();
        assert_eq!(declined.state, DownloadState::Declined);
        assert!(declined.destination().is_none());

        // Dropped from the tracker; it never gets a ticket
        assert!(tracker.list().is_empty());
        assert_eq!(
            tracker.get(download.id).unwrap_err(),
            DownloadError::NotFound(download.id)
        );
        assert!(tracker.ticket(download.id).is_err());
        assert!(tracker.reporter(download.id).is_stopped());
    }

    #[test]
    fn test_cancel_stops_the_engine() {
        let tracker = DownloadTracker::new();
        let download = started(&tracker);
        let ticket = tracker.ticket(download.id).unwrap();
        assert!(!ticket.reporter.is_stopped());

        tracker.cancel(download.id).unwrap();

        assert!(ticket.reporter.is_stopped());
        assert!(!ticket.reporter.progress(10, 100));
        assert!(!ticket.reporter.finished(true));
        assert!(tracker.process_reports().is_empty());
        assert_eq!(tracker.get(download.id).unwrap().state, DownloadState::Cancelled);
    }

    #[tokio::test]
    async fn test_stopped_resolves_after_cancel() {
        let tracker = DownloadTracker::new();
        let download = started(&tracker);
        let reporter = tracker.ticket(download.id).unwrap().reporter;

        let waiter = tokio::spawn(async move { reporter.stopped().await });
        tracker.cancel(download.id).unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_final_report_stops_reporter() {
        let tracker = DownloadTracker::new();
        let download = started(&tracker);
        let reporter = tracker.ticket(download.id).unwrap().reporter;

        assert!(reporter.finished(true));
        assert!(!reporter.is_stopped());
        tracker.process_reports();
        assert!(reporter.is_stopped());
    }

    #[test]
    fn test_indeterminate_progress() {
        let tracker = DownloadTracker::new();
        let download = started(&tracker);

        let updated = tracker.on_progress(download.id, 4096, 0).unwrap();
        assert_eq!(updated.total_bytes, None);
        assert_eq!(updated.progress(), None);

        let updated = tracker.on_progress(download.id, 8192, -1).unwrap();
        assert_eq!(updated.received_bytes, 8192);
        assert_eq!(updated.progress(), None);
    }

    #[test]
    fn test_terminal_states_reject_transitions() {
        let tracker = DownloadTracker::new();

        let completed = started(&tracker);
        tracker.on_finished(completed.id, true).unwrap();
        let cancelled = started(&tracker);
        tracker.cancel(cancelled.id).unwrap();
        let failed = started(&tracker);
        tracker.on_finished(failed.id, false).unwrap();

        for (id, state) in [
            (completed.id, DownloadState::Completed),
            (cancelled.id, DownloadState::Cancelled),
            (failed.id, DownloadState::Failed),
        ] {
            let before = tracker.get(id).unwrap();

            assert_eq!(
                tracker.on_progress(id, 1, 2).unwrap_err(),
                DownloadError::InvalidTransition {
                    from: state,
                    to: DownloadState::InProgress
                }
            );
            assert!(matches!(
                tracker.on_finished(id, true),
                Err(DownloadError::InvalidTransition { .. })
            ));
            assert!(matches!(
                tracker.cancel(id),
                Err(DownloadError::InvalidTransition { .. })
            ));

            assert_eq!(tracker.get(id).unwrap(), before);
        }
    }

    #[test]
    fn test_resolve_twice_is_rejected() {
        let tracker = DownloadTracker::new();
        let download = started(&tracker);

        let err = tracker.resolve_destination(download.id, None).unwrap_err();
        assert_eq!(
            err,
            DownloadError::InvalidTransition {
                from: DownloadState::InProgress,
                to: DownloadState::Declined
            }
        );
    }

    #[test]
    fn test_reports_are_applied_on_process() {
        let tracker = DownloadTracker::new();
        let download = started(&tracker);
        let ticket = tracker.ticket(download.id).unwrap();
        assert_eq!(ticket.destination, PathBuf::from("/downloads/file.pdf"));

        let reporter = ticket.reporter.clone();
        assert!(reporter.progress(10, 100));
        assert!(reporter.finished(true));
        // Arrives after completion and is dropped
        assert!(reporter.progress(20, 100));

        // Nothing changes until the control thread drains the channel
        assert_eq!(tracker.get(download.id).unwrap().received_bytes, 0);

        let applied = tracker.process_reports();
        assert_eq!(applied.len(), 2);

        let finished = tracker.get(download.id).unwrap();
        assert_eq!(finished.state, DownloadState::Completed);
        assert_eq!(finished.received_bytes, 100);
    }

    #[test]
    fn test_unknown_download() {
        let tracker = DownloadTracker::new();
        let id = DownloadId::new();
        assert_eq!(tracker.get(id).unwrap_err(), DownloadError::NotFound(id));
        assert_eq!(tracker.cancel(id).unwrap_err(), DownloadError::NotFound(id));
    }

    #[test]
    fn test_list_order_and_clear_finished() {
        let tracker = DownloadTracker::new();
        let first = started(&tracker);
        let second = started(&tracker);
        let third = tracker.request_download("/tmp/c.bin", None);

        let ids: Vec<_> = tracker.list().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![first.id, second.id, third.id]);

        tracker.on_finished(first.id, true).unwrap();
        assert_eq!(tracker.clear_finished(), 1);

        let ids: Vec<_> = tracker.list().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![second.id, third.id]);
        assert_eq!(tracker.active().len(), 2);
    }

    #[test]
    fn test_subscribers_see_updates() {
        let tracker = DownloadTracker::new();
        let mut updates = tracker.subscribe();

        let download = started(&tracker);
        tracker.on_progress(download.id, 1, 2).unwrap();

        let states: Vec<_> = std::iter::from_fn(|| updates.try_recv().ok())
            .map(|d| d.state)
            .collect();
        assert_eq!(
            states,
            vec![
                DownloadState::AwaitingDestination,
                DownloadState::InProgress,
                DownloadState::InProgress
            ]
        );
    }

    #[test]
    fn test_clones_share_state() {
        let tracker = DownloadTracker::new();
        let panel = tracker.clone();

        let download = started(&tracker);
        assert_eq!(panel.get(download.id).unwrap().state, DownloadState::InProgress);
    }
}
