use chrono::{DateTime, Utc};
use strum::Display;
use tokio::sync::oneshot;

use crate::{
    autosave::SaveStatus,
    draft::{DocumentSnapshot, DraftToken},
    transport::TransportError,
};

pub(super) type ManualSaveReply = oneshot::Sender<Result<SaveOutcome, AutosaveError>>;

#[derive(Debug)]
pub(super) enum Command {
    SnapshotChanged(DocumentSnapshot),
    ManualSave(ManualSaveReply),
    SetEnabled(bool),
    Status(oneshot::Sender<SaveStatus>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SaveTrigger {
    #[strum(to_string = "autosave")]
    Automatic,
    #[strum(to_string = "manual save")]
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SkipReason {
    #[strum(to_string = "another save is in flight")]
    InFlight,
    #[strum(to_string = "the document is empty")]
    EmptyDocument,
}

/// Result of a save request that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// First save of this draft; it is now identified by the token.
    Created(DraftToken),
    Updated,
    /// Nothing was sent. Not an error.
    Skipped(SkipReason),
}

/// Everything the engine reports back to its host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveEvent {
    Saved {
        trigger: SaveTrigger,
        token: DraftToken,
        created: bool,
        at: DateTime<Utc>,
    },
    Failed {
        trigger: SaveTrigger,
        error: String,
    },
    Skipped {
        trigger: SaveTrigger,
        reason: SkipReason,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum AutosaveError {
    #[error("saving the draft failed")]
    Transport(#[from] TransportError),
    #[error("the autosave engine has stopped")]
    Stopped,
}
