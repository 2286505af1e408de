//! Draft autosave engine.
//!
//! An [`Autosave`] watches the snapshots its host feeds it, waits for the
//! document to settle, and then persists it through a [`DraftTransport`]:
//! `create_draft` the first time, `update_draft` with the issued token after
//! that. The host can force a save at any time and reads feedback
//! (countdown, progress, last save) from [`SaveStatus`].
//!
//! The engine is a single tokio task owning all of its state and timers.
//! At most one transport call is in flight; save requests arriving while
//! one is running are dropped, not queued.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{
        mpsc::{self, UnboundedSender},
        oneshot, watch,
    },
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    draft::{DocumentSnapshot, DraftToken, SaveIdentity},
    transport::DraftTransport,
};

mod executor;
mod handler;
mod model;
mod scheduler;
mod state;

pub use model::{AutosaveError, SaveEvent, SaveOutcome, SaveTrigger, SkipReason};
pub use state::SaveStatus;

use self::{executor::SaveExecutor, handler::AutosaveHandler, model::Command};

#[derive(Debug, Clone)]
pub struct AutosaveOptions {
    /// When off, snapshots are recorded but nothing gets scheduled.
    pub enabled: bool,
    /// Time between a detected change and the automatic save.
    pub interval: Duration,
    /// Cadence of the progress updates while a save is scheduled.
    pub progress_tick: Duration,
    /// Binds the engine to a draft that already exists.
    pub existing_token: Option<DraftToken>,
    pub suppress_initial_load: bool,
}

impl AutosaveOptions {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);
    pub const DEFAULT_PROGRESS_TICK: Duration = Duration::from_millis(100);

    pub fn with_existing_token(mut self, token: Option<DraftToken>) -> Self {
        self.existing_token = token;
        self
    }
}

impl Default for AutosaveOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Self::DEFAULT_INTERVAL,
            progress_tick: Self::DEFAULT_PROGRESS_TICK,
            existing_token: None,
            suppress_initial_load: true,
        }
    }
}

/// Handle to a running autosave engine.
///
/// Dropping the handle stops the engine; [`Autosave::dispose`] additionally
/// waits until it has released its timers.
pub struct Autosave {
    cmd_tx: UnboundedSender<Command>,
    status_rx: watch::Receiver<SaveStatus>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Autosave {
    /// Starts the engine on the current tokio runtime.
    pub fn spawn<T: DraftTransport>(
        transport: Arc<T>,
        options: AutosaveOptions,
        events: UnboundedSender<SaveEvent>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SaveStatus::initial(&options));
        let cancel = CancellationToken::new();
        let handler = AutosaveHandler::new(
            SaveExecutor::new(transport),
            options,
            cmd_rx,
            events,
            status_tx,
            cancel.clone(),
        );
        let task = tokio::spawn(handler.run());
        Self {
            cmd_tx,
            status_rx,
            cancel,
            task: Some(task),
        }
    }

    /// Feeds the latest document state. Only the most recent one matters.
    pub fn on_snapshot_changed(&self, snapshot: DocumentSnapshot) {
        self.send(Command::SnapshotChanged(snapshot));
    }

    /// Saves right away, replacing any scheduled autosave.
    ///
    /// Resolves with [`SaveOutcome::Skipped`] if another save is in flight.
    pub async fn request_manual_save(&self) -> Result<SaveOutcome, AutosaveError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if !self.send(Command::ManualSave(reply_tx)) {
            return Err(AutosaveError::Stopped);
        }
        reply_rx.await.map_err(|_| AutosaveError::Stopped)?
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.send(Command::SetEnabled(enabled));
    }

    /// Last published status. Commands sent just before may not be reflected
    /// yet; see [`Autosave::current_status`].
    pub fn status(&self) -> SaveStatus {
        self.status_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status_rx.clone()
    }

    /// Status after every previously sent command has been handled.
    pub async fn current_status(&self) -> SaveStatus {
        let (reply_tx, reply_rx) = oneshot::channel();
        if !self.send(Command::Status(reply_tx)) {
            return self.status();
        }
        match reply_rx.await {
            Ok(status) => status,
            Err(_) => self.status(),
        }
    }

    pub fn identity(&self) -> SaveIdentity {
        self.status_rx.borrow().identity.clone()
    }

    /// Whether the live document differs from what was loaded into the editor.
    pub async fn has_unsaved_changes(&self) -> bool {
        self.current_status().await.unsaved_changes
    }

    /// Stops the engine and waits for it to release every timer.
    pub async fn dispose(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(err) = task.await
        {
            warn!("Autosave task ended abnormally: {err}");
        }
    }

    fn send(&self, cmd: Command) -> bool {
        match self.cmd_tx.send(cmd) {
            Ok(()) => true,
            Err(err) => {
                debug!("Autosave engine is gone, dropping {:?}", err.0);
                false
            }
        }
    }
}

impl Drop for Autosave {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests;
