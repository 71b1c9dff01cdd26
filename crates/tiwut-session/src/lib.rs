//! Tiwut Session Persistence
//!
//! - The open tabs are written to `session.open_tabs` at shutdown, only
//!   when `tabs.restore_session` is on; otherwise the value is cleared
//! - At startup the stored addresses come back in tab bar order
//! - A damaged snapshot restores nothing rather than failing

mod snapshot;

pub use snapshot::{restore_snapshot, save_snapshot, Snapshot};
