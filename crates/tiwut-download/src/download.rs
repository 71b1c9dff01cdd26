//! Download record and state machine
//!
//! ```text
//! AwaitingDestination
//!   ├─ declined ──→ Declined
//!   └─ accepted ──→ Accepted ──→ InProgress
//!                                  ├─→ Completed
//!                                  ├─→ Failed
//!                                  └─→ Cancelled
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DownloadId(Uuid);

impl DownloadId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DownloadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DownloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::str::FromStr for DownloadId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    /// Waiting for the user to pick a destination
    AwaitingDestination,
    /// The user dismissed the save dialog
    Declined,
    /// Destination chosen, transfer not started yet
    Accepted,
    /// The engine is writing the file
    InProgress,
    Completed,
    Failed,
    /// Cancelled by the user
    Cancelled,
}

impl DownloadState {
    pub fn can_transition_to(&self, target: DownloadState) -> bool {
        use DownloadState::*;

        matches!(
            (self, target),
            (AwaitingDestination, Declined)
                | (AwaitingDestination, Accepted)
                | (Accepted, InProgress)
                | (Accepted, Cancelled)
                | (InProgress, InProgress)
                | (InProgress, Completed)
                | (InProgress, Failed)
                | (InProgress, Cancelled)
        )
    }

    /// No transition leaves a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DownloadState::Declined
                | DownloadState::Completed
                | DownloadState::Failed
                | DownloadState::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadState::AwaitingDestination => "awaiting_destination",
            DownloadState::Declined => "declined",
            DownloadState::Accepted => "accepted",
            DownloadState::InProgress => "in_progress",
            DownloadState::Completed => "completed",
            DownloadState::Failed => "failed",
            DownloadState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for DownloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Download {
    pub id: DownloadId,
    /// Path proposed by the engine, shown in the save dialog
    pub suggested_path: PathBuf,
    /// Page the download came from, when known
    pub source: Option<String>,
    pub destination: Option<PathBuf>,
    pub received_bytes: u64,
    /// `None` while the size is unknown
    pub total_bytes: Option<u64>,
    pub state: DownloadState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Download {
    pub fn new(suggested_path: impl Into<PathBuf>, source: Option<String>) -> Self {
        let now = Utc::now();

        Self {
            id: DownloadId::new(),
            suggested_path: suggested_path.into(),
            source,
            destination: None,
            received_bytes: 0,
            total_bytes: None,
            state: DownloadState::AwaitingDestination,
            created_at: now,
            updated_at: now,
            finished_at: None,
        }
    }

    /// Name shown in the downloads panel
    pub fn file_name(&self) -> String {
        self.destination
            .as_deref()
            .unwrap_or(&self.suggested_path)
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| "download".to_string())
    }

    pub fn destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }

    /// Percentage in `0.0..=100.0`, or `None` when the total is unknown.
    pub fn progress(&self) -> Option<f64> {
        match self.total_bytes {
            Some(total) if total > 0 => {
                Some((self.received_bytes as f64 / total as f64 * 100.0).min(100.0))
            }
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.state,
            DownloadState::AwaitingDestination | DownloadState::Accepted | DownloadState::InProgress
        )
    }

    pub(crate) fn transition_to(&mut self, target: DownloadState) -> crate::Result<()> {
        if !self.state.can_transition_to(target) {
            return Err(crate::DownloadError::InvalidTransition {
                from: self.state,
                to: target,
            });
        }

        if self.state != target {
            tracing::debug!(
                download_id = %self.id,
                from = %self.state,
                to = %target,
                "Download state transition"
            );
        }

        let now = Utc::now();
        self.state = target;
        self.updated_at = now;
        if target.is_terminal() {
            self.finished_at = Some(now);
        }

        Ok(())
    }
}
