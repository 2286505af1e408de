//! The document side of the autosave engine: what gets saved, who it belongs
//! to, and whether it changed.

mod change;
mod identity;
mod snapshot;

pub use change::{ChangeDetector, Observation, UnsavedChanges, has_pending_change};
pub use identity::{DraftToken, SaveIdentity};
pub use snapshot::DocumentSnapshot;
