use std::sync::Arc;

use color_eyre::{Result, eyre::WrapErr};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    select, signal,
    sync::{
        mpsc::{self, UnboundedReceiver, UnboundedSender},
        watch,
    },
};
use tracing::{debug, info, warn};

use crate::{
    action::Action,
    autosave::{Autosave, SaveEvent, SaveOutcome, SaveStatus},
    cli::Cli,
    config::Config,
    draft::DraftToken,
    editor::Editor,
    statusbar::StatusBar,
    transport::{FileDraftStore, MemoryDraftStore},
};

const HELP: &str = "\
Type to append to the body. Commands:
  :title <text>   set the title
  :tags <a, b>    set the tags
  :body           clear the body
  :save           save now
  :status         show the save status
  :quit           leave";

pub struct App {
    autosave: Autosave,
    editor: Editor,
    statusbar: StatusBar,
    should_quit: bool,
    action_tx: UnboundedSender<Action>,
    action_rx: UnboundedReceiver<Action>,
    save_rx: UnboundedReceiver<SaveEvent>,
    status_rx: watch::Receiver<SaveStatus>,
}

impl App {
    pub async fn new(args: &Cli, config: &Config) -> Result<Self> {
        let mut autosave_config = config.autosave.clone();
        if let Some(interval_ms) = args.interval_ms {
            autosave_config.interval_ms = interval_ms;
        }
        let (save_tx, save_rx) = mpsc::unbounded_channel();

        let (autosave, editor) = if args.memory {
            let store = Arc::new(MemoryDraftStore::new());
            let autosave = Autosave::spawn(store, autosave_config.to_options(None), save_tx);
            (autosave, Editor::default())
        } else {
            let store = FileDraftStore::new(config.drafts_dir());
            let (token, editor) = match &args.resume {
                Some(token) => {
                    let token = DraftToken::from(token.as_str());
                    let stored = store
                        .load(&token)
                        .await
                        .wrap_err_with(|| format!("Failed to resume draft {token}"))?;
                    info!("Resuming draft {token}");
                    (Some(token), Editor::load(&stored.snapshot))
                }
                None => (None, Editor::default()),
            };
            let autosave = Autosave::spawn(
                Arc::new(store),
                autosave_config.to_options(token),
                save_tx,
            );
            (autosave, editor)
        };
        // Resumed content goes in as the initial load.
        autosave.on_snapshot_changed(editor.snapshot());

        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let status_rx = autosave.subscribe();
        Ok(Self {
            autosave,
            editor,
            statusbar: StatusBar::default(),
            should_quit: false,
            action_tx,
            action_rx,
            save_rx,
            status_rx,
        })
    }

    pub async fn run(mut self) -> Result<()> {
        println!("{HELP}");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let ctrl_c = signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            select! {
                line = lines.next_line() => {
                    let action = match line.wrap_err("Failed to read input")? {
                        Some(line) => Action::parse_line(&line),
                        None => Action::Quit,
                    };
                    self.action_tx.send(action)?;
                },
                Some(event) = self.save_rx.recv() => self.handle_save_event(event),
                Ok(()) = self.status_rx.changed() => self.handle_status(),
                _ = &mut ctrl_c => self.action_tx.send(Action::Quit)?,
            }
            self.handle_actions().await?;
            if self.should_quit {
                break;
            }
        }
        self.shutdown().await;
        Ok(())
    }

    async fn handle_actions(&mut self) -> Result<()> {
        while let Ok(action) = self.action_rx.try_recv() {
            debug!("{action:?}");
            match action {
                Action::Save => self.save().await,
                Action::PrintStatus => {
                    let status = self.autosave.current_status().await;
                    println!("{}", StatusBar::render(&status));
                }
                Action::Quit => self.should_quit = true,
                Action::Error(msg) => eprintln!("Error: {msg}"),
                edit => {
                    if self.editor.apply(&edit) {
                        self.autosave.on_snapshot_changed(self.editor.snapshot());
                    }
                }
            }
        }
        Ok(())
    }

    async fn save(&mut self) {
        match self.autosave.request_manual_save().await {
            Ok(SaveOutcome::Created(token)) => println!("Saved as {token}"),
            Ok(SaveOutcome::Updated) => println!("Saved"),
            Ok(SaveOutcome::Skipped(reason)) => println!("Not saved: {reason}"),
            Err(err) => {
                if let Err(err) = self.action_tx.send(Action::Error(format!("Saving failed: {err}"))) {
                    debug!("Unable to report save failure: {err:?}");
                }
            }
        }
    }

    fn handle_save_event(&mut self, event: SaveEvent) {
        match event {
            SaveEvent::Saved { trigger, token, .. } => debug!("{trigger} stored {token}"),
            SaveEvent::Failed { trigger, error } => warn!("{trigger} failed: {error}"),
            SaveEvent::Skipped { trigger, reason } => debug!("{trigger} skipped: {reason}"),
        }
    }

    fn handle_status(&mut self) {
        let status = self.status_rx.borrow_and_update().clone();
        if let Some(line) = self.statusbar.update(&status) {
            println!("{line}");
        }
    }

    async fn shutdown(self) {
        // Content that already reached the store doesn't count.
        let unsaved = self.autosave.has_unsaved_changes().await
            && self.autosave.status().last_synced != self.editor.snapshot();
        self.autosave.dispose().await;
        if unsaved {
            eprintln!("Warning: leaving with unsaved changes");
        }
    }
}

/// Prints the drafts kept in the data directory, newest first.
pub async fn print_drafts(config: &Config) -> Result<()> {
    let store = FileDraftStore::new(config.drafts_dir());
    let drafts = store
        .list()
        .await
        .wrap_err_with(|| format!("Failed to list drafts in {}", store.dir().display()))?;
    if drafts.is_empty() {
        println!("No drafts in {}", store.dir().display());
    }
    for draft in drafts {
        let title = match draft.snapshot.title.as_str() {
            "" => "(untitled)",
            title => title,
        };
        println!(
            "{}  {}  {title}",
            draft.token,
            draft.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}
