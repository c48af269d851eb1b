//! `fieldtuner-editor`: the edit workflow over one config file.
//!
//! An [`EditSession`] owns the loaded document and tracks pending changes
//! against the saved file. Saving is guarded by the run-state check and
//! always preceded by a backup.

pub mod session;
pub mod view;

pub use fieldtuner_core::ValidationPolicy;
pub use session::{EditSession, PendingChange, SaveOutcome, SessionParts, SessionState};
pub use view::SettingView;
