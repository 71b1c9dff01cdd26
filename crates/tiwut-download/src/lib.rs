//! Tiwut Download Tracker
//!
//! - The user picks a destination (or declines) before anything is written
//! - The engine writes the file and reports through a [`DownloadReporter`]
//! - Reports are applied on the control thread by [`DownloadTracker::process_reports`]
//! - Finished, failed and cancelled downloads never change again, and the
//!   engine is told to stop through the reporter; declined ones are dropped

mod download;
mod error;
mod manager;

pub use download::{Download, DownloadId, DownloadState};
pub use error::DownloadError;
pub use manager::{DownloadReport, DownloadReporter, DownloadTicket, DownloadTracker};

pub type Result<T> = std::result::Result<T, DownloadError>;
