use chrono::{DateTime, Utc};

use crate::{
    autosave::AutosaveOptions,
    draft::{DocumentSnapshot, SaveIdentity},
};

/// Read-only view of the engine's save state, as published to the host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveStatus {
    pub identity: SaveIdentity,
    pub last_synced: DocumentSnapshot,
    pub last_saved_at: Option<DateTime<Utc>>,
    pub is_saving: bool,
    /// Whether an automatic save is scheduled.
    pub autosave_pending: bool,
    pub ms_until_next_attempt: u64,
    /// 0.0 when the save window opens, 1.0 when it is due.
    pub progress: f64,
    pub enabled: bool,
    /// Live document differs from what was loaded into the editor.
    pub unsaved_changes: bool,
}

impl SaveStatus {
    /// What a freshly spawned engine reports before handling anything.
    pub(super) fn initial(options: &AutosaveOptions) -> Self {
        Self {
            identity: SaveIdentity::from_existing(options.existing_token.clone()),
            enabled: options.enabled,
            ..Default::default()
        }
    }
}
