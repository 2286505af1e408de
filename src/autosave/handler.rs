use chrono::{DateTime, Utc};
use tokio::{
    select,
    sync::{
        mpsc::{UnboundedReceiver, UnboundedSender},
        watch,
    },
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    autosave::{
        AutosaveOptions, SaveStatus,
        executor::{Finished, Persisted, SaveExecutor, SaveRequest},
        model::{AutosaveError, Command, ManualSaveReply, SaveEvent, SaveOutcome, SaveTrigger, SkipReason},
        scheduler::{SaveScheduler, Tick},
    },
    draft::{ChangeDetector, DocumentSnapshot, Observation, SaveIdentity, UnsavedChanges, has_pending_change},
    transport::DraftTransport,
};

/// The engine task. Owns every piece of save state; the `Autosave` handle
/// only talks to it through channels.
pub(super) struct AutosaveHandler<T> {
    pub cmd_rx: UnboundedReceiver<Command>,
    pub evt_tx: UnboundedSender<SaveEvent>,
    pub status_tx: watch::Sender<SaveStatus>,
    pub cancel: CancellationToken,

    detector: ChangeDetector,
    scheduler: SaveScheduler,
    executor: SaveExecutor<T>,
    unsaved: UnsavedChanges,

    identity: SaveIdentity,
    enabled: bool,
    latest: DocumentSnapshot,
    last_synced: DocumentSnapshot,
    last_saved_at: Option<DateTime<Utc>>,
}

impl<T: DraftTransport> AutosaveHandler<T> {
    pub fn new(
        executor: SaveExecutor<T>,
        options: AutosaveOptions,
        cmd_rx: UnboundedReceiver<Command>,
        evt_tx: UnboundedSender<SaveEvent>,
        status_tx: watch::Sender<SaveStatus>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            cmd_rx,
            evt_tx,
            status_tx,
            cancel,
            detector: ChangeDetector::new(options.suppress_initial_load),
            scheduler: SaveScheduler::new(options.interval, options.progress_tick),
            executor,
            unsaved: UnsavedChanges::default(),
            identity: SaveIdentity::from_existing(options.existing_token),
            enabled: options.enabled,
            latest: DocumentSnapshot::default(),
            last_synced: DocumentSnapshot::default(),
            last_saved_at: None,
        }
    }

    pub async fn run(mut self) {
        self.publish();
        loop {
            select! {
                biased; // Teardown should take prio
                _ = self.cancel.cancelled() => {
                    debug!("Autosave cancelled, shutting down...");
                    break;
                },
                cmd_opt = self.cmd_rx.recv() => {
                    let Some(cmd) = cmd_opt else {
                        debug!("Autosave handle dropped, shutting down...");
                        break;
                    };
                    self.handle(cmd);
                },
                finished = self.executor.finished() => self.on_save_finished(finished),
                tick = self.scheduler.next_tick() => self.on_tick(tick),
            }
        }
        self.teardown();
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::SnapshotChanged(snapshot) => self.on_snapshot_changed(snapshot),
            Command::ManualSave(reply) => self.request_manual_save(reply),
            Command::SetEnabled(enabled) => self.set_enabled(enabled),
            Command::Status(reply) => {
                if reply.send(self.status()).is_err() {
                    debug!("Status requester went away");
                }
            }
        }
    }

    fn on_snapshot_changed(&mut self, snapshot: DocumentSnapshot) {
        self.latest = snapshot;
        if self.enabled {
            self.evaluate_latest();
        }
        self.publish();
    }

    fn evaluate_latest(&mut self) {
        match self.detector.observe(&self.latest) {
            Observation::Unchanged => {}
            Observation::AbsorbedInitialLoad => {
                debug!("Absorbed initially loaded content, not scheduling a save");
                self.last_synced = self.latest.clone();
                self.unsaved.reset(self.latest.clone());
            }
            Observation::Pending if self.executor.is_saving() => {
                debug!("Change while saving, rescheduling once the save completes");
            }
            Observation::Pending => {
                self.scheduler.start();
                debug!("Pending change, autosave in {:?}", self.scheduler.remaining());
            }
        }
    }

    fn on_tick(&mut self, tick: Tick) {
        if tick == Tick::Due {
            if self.latest.has_content() {
                self.begin_save(SaveTrigger::Automatic, None);
            } else {
                debug!("Autosave due, but the document is empty");
                self.emit(SaveEvent::Skipped {
                    trigger: SaveTrigger::Automatic,
                    reason: SkipReason::EmptyDocument,
                });
            }
        }
        self.publish();
    }

    fn request_manual_save(&mut self, reply: ManualSaveReply) {
        if self.scheduler.cancel_all() {
            debug!("Manual save replaces the scheduled autosave");
        }
        self.begin_save(SaveTrigger::Manual, Some(reply));
        self.publish();
    }

    fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        if enabled {
            debug!("Autosave enabled");
            self.evaluate_latest();
        } else {
            debug!("Autosave disabled");
            self.scheduler.cancel_all();
        }
        self.publish();
    }

    fn begin_save(&mut self, trigger: SaveTrigger, reply: Option<ManualSaveReply>) {
        let request = SaveRequest {
            trigger,
            snapshot: self.latest.clone(),
            reply,
        };
        let Err(rejected) = self.executor.start(request, &self.identity) else {
            return;
        };
        debug!("Dropping {trigger}, another save is in flight");
        let reason = SkipReason::InFlight;
        if let Some(reply) = rejected.reply {
            let _ = reply.send(Ok(SaveOutcome::Skipped(reason)));
        }
        self.emit(SaveEvent::Skipped { trigger, reason });
    }

    fn on_save_finished(&mut self, finished: Finished) {
        let Finished { request, result } = finished;
        let SaveRequest {
            trigger,
            snapshot,
            reply,
        } = request;

        let reply_result = match result {
            Ok(persisted) => {
                let created = matches!(persisted, Persisted::Created(_));
                let outcome = match persisted {
                    Persisted::Created(token) => {
                        if self.identity.identify(token.clone()) {
                            info!("Draft is now identified as {token}");
                        }
                        SaveOutcome::Created(token)
                    }
                    Persisted::Updated => SaveOutcome::Updated,
                };
                let at = Utc::now();
                self.last_synced = snapshot.clone();
                self.last_saved_at = Some(at);
                info!("Draft saved ({trigger})");
                if let Some(token) = self.identity.token() {
                    self.emit(SaveEvent::Saved {
                        trigger,
                        token: token.clone(),
                        created,
                        at,
                    });
                }
                Ok(outcome)
            }
            Err(err) => {
                warn!("Saving draft failed ({trigger}): {err}");
                self.detector.reset_baseline(self.last_synced.clone());
                self.emit(SaveEvent::Failed {
                    trigger,
                    error: err.to_string(),
                });
                Err(AutosaveError::Transport(err))
            }
        };

        if self.enabled
            && self.latest != snapshot
            && has_pending_change(&self.latest, &self.last_synced)
        {
            debug!("Document changed while saving, restarting the save window");
            self.detector.reset_baseline(self.latest.clone());
            self.scheduler.start();
        }
        self.publish();

        if let Some(reply) = reply
            && reply.send(reply_result).is_err()
        {
            debug!("Manual save requester went away");
        }
    }

    fn teardown(&mut self) {
        self.scheduler.cancel_all();
        if let Some(request) = self.executor.abort() {
            debug!("Abandoning in-flight {}", request.trigger);
            if let Some(reply) = request.reply {
                let _ = reply.send(Err(AutosaveError::Stopped));
            }
        }
        self.publish();
    }

    fn emit(&self, event: SaveEvent) {
        if let Err(err) = self.evt_tx.send(event) {
            debug!("Unable to send save event: {err:?}");
        }
    }

    fn status(&self) -> SaveStatus {
        SaveStatus {
            identity: self.identity.clone(),
            last_synced: self.last_synced.clone(),
            last_saved_at: self.last_saved_at,
            is_saving: self.executor.is_saving(),
            autosave_pending: self.scheduler.is_armed(),
            ms_until_next_attempt: u64::try_from(self.scheduler.remaining().as_millis())
                .unwrap_or(u64::MAX),
            progress: self.scheduler.progress(),
            enabled: self.enabled,
            unsaved_changes: self.unsaved.is_dirty(&self.latest),
        }
    }

    fn publish(&self) {
        self.status_tx.send_replace(self.status());
    }
}
