use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

use crate::editing::{Cmd, EditSession, Patch, ScrollOffsets};
use crate::model::{BlockId, ChangeType, Document};
use crate::session::state::{SaveStatus, SessionState, SessionView};
use crate::sync::{
    ChangeBuffer, DEFAULT_QUIET_PERIOD, NextWrite, NoopNotifier, Persister, RemoteListener,
    RemoteOrigin, RestoreRequest, SharedHistory, SharedNotifier, SharedStore, WriteKind,
    WriteOutcome, classify,
};

/// Owner of template release sheets unless configured otherwise
pub const DEFAULT_TEMPLATE_ARTIST_ID: &str = "templates";

/// Notice shown while a document that should be live has no feed
pub const LIVE_UPDATES_UNAVAILABLE: &str = "Live updates unavailable";

#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    /// Idle time after the last edit before an autosave
    pub quiet_period: Duration,
    /// Documents owned by this artist are templates and get no live feed
    pub template_artist_id: String,
    /// Extra subscribe attempts when the live feed fails
    pub resubscribe_attempts: u32,
    /// Recorded on history versions
    pub author: Option<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            quiet_period: DEFAULT_QUIET_PERIOD,
            template_artist_id: DEFAULT_TEMPLATE_ARTIST_ID.to_string(),
            resubscribe_attempts: 1,
            author: None,
        }
    }
}

/// Backends a session talks to
#[derive(Clone)]
pub struct Collaborators {
    pub store: SharedStore,
    pub history: SharedHistory,
    pub notifier: SharedNotifier,
}

impl Collaborators {
    pub fn new(store: SharedStore, history: SharedHistory) -> Self {
        Self {
            store,
            history,
            notifier: Arc::new(NoopNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: SharedNotifier) -> Self {
        self.notifier = notifier;
        self
    }
}

#[derive(Debug)]
pub(crate) enum Command {
    Edit(Cmd, oneshot::Sender<Patch>),
    Blur,
    Save,
    SetFocus(bool),
    SetCaret(Option<usize>),
    SetScroll(ScrollOffsets),
    ToggleEmbed(BlockId),
    Restore(RestoreRequest),
    Close,
}

/// Event loop of one editor session.
///
/// Everything that touches the session runs here, one event at a time:
/// UI commands, write completions, remote snapshots and the autosave
/// timer. Writes run on spawned tasks and report back through the outcome
/// channel, so the loop never blocks on the network.
pub(crate) struct SessionController {
    session: EditSession,
    buffer: ChangeBuffer<RestoreRequest>,
    persister: Persister,
    listener: RemoteListener,
    store: SharedStore,
    outcomes: mpsc::UnboundedReceiver<WriteOutcome>,
    /// Remote snapshots received while a write was in flight
    pending_remote: VecDeque<Document>,
    view: watch::Sender<SessionView>,
    last_error: Option<String>,
    message: Option<String>,
    closed: bool,
}

impl SessionController {
    pub(crate) fn new(
        session: EditSession,
        quiet_period: Duration,
        persister: Persister,
        listener: RemoteListener,
        store: SharedStore,
        outcomes: mpsc::UnboundedReceiver<WriteOutcome>,
        view: watch::Sender<SessionView>,
    ) -> Self {
        Self {
            session,
            buffer: ChangeBuffer::new(quiet_period),
            persister,
            listener,
            store,
            outcomes,
            pending_remote: VecDeque::new(),
            view,
            last_error: None,
            message: None,
            closed: false,
        }
    }

    pub(crate) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        log::info!(
            "Opened editor session for {} (live: {})",
            self.session.document_id(),
            self.listener.is_live()
        );
        if self.listener.is_unavailable() {
            self.message = Some(LIVE_UPDATES_UNAVAILABLE.to_string());
        }
        self.publish();

        loop {
            let deadline = self.buffer.deadline();
            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(Command::Close) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(outcome) = self.outcomes.recv() => self.handle_outcome(outcome),
                remote = self.listener.next() => self.handle_remote(remote).await,
                () = wait_until(deadline) => self.buffer.quiet_period_elapsed(),
            }
            self.pump();
            self.publish();
        }

        self.shutdown().await;
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Edit(cmd, reply) => {
                let patch = self.session.apply_local(cmd);
                if !patch.is_noop() {
                    self.buffer.notify_changed();
                    if self.message.as_deref() != Some(LIVE_UPDATES_UNAVAILABLE) {
                        self.message = None;
                    }
                }
                let _ = reply.send(patch);
            }
            Command::Blur => {
                self.session.set_focus(false);
                self.buffer.flush_now(ChangeType::Manual);
            }
            Command::Save => self.buffer.flush_now(ChangeType::Manual),
            Command::SetFocus(focused) => self.session.set_focus(focused),
            Command::SetCaret(offset) => self.session.set_caret(offset),
            Command::SetScroll(scroll) => self.session.set_scroll(scroll),
            Command::ToggleEmbed(id) => {
                if self.session.toggle_embed(&id).is_none() {
                    log::debug!("Ignoring embed toggle for unknown block {id}");
                }
            }
            Command::Restore(request) => {
                // unsaved edits go into history before the restore replaces them
                if self.session.is_dirty() {
                    self.buffer.flush_now(ChangeType::Manual);
                }
                self.buffer.queue_restore(request);
            }
            Command::Close => {}
        }
    }

    fn handle_outcome(&mut self, outcome: WriteOutcome) {
        self.buffer.finish();

        match outcome {
            WriteOutcome::Persisted {
                result: Ok(doc), ..
            } => {
                self.session.record_own_write(&doc);
                self.last_error = None;
            }
            WriteOutcome::Persisted {
                sent,
                result: Err(e),
                ..
            } => {
                log::warn!("Saving {} failed: {e}", self.session.document_id());
                self.session.restore_dirty(sent);
                self.last_error = Some(e.to_string());
            }
            WriteOutcome::Restored {
                request,
                result: Ok(doc),
            } => {
                self.session.apply_restored(&doc);
                if !self.session.is_dirty() {
                    self.buffer.cancel_timer();
                }
                let _ = request.reply.send(Ok(doc));
            }
            WriteOutcome::Restored {
                request,
                result: Err(e),
            } => {
                log::warn!("Restoring {} failed: {e}", self.session.document_id());
                self.message = Some(format!("Restore failed: {e}"));
                let _ = request.reply.send(Err(e));
            }
        }

        // the write's stamp is known now, so echoes can be told apart
        while let Some(doc) = self.pending_remote.pop_front() {
            self.apply_remote(doc);
        }
    }

    async fn handle_remote(&mut self, remote: Option<Document>) {
        match remote {
            Some(doc) if !self.buffer.is_idle() => self.pending_remote.push_back(doc),
            Some(doc) => self.apply_remote(doc),
            None => {
                if !self.listener.recover(&self.store).await {
                    self.message = Some(LIVE_UPDATES_UNAVAILABLE.to_string());
                } else if self.message.as_deref() == Some(LIVE_UPDATES_UNAVAILABLE) {
                    self.message = None;
                }
            }
        }
    }

    fn apply_remote(&mut self, doc: Document) {
        if classify(self.session.last_own_write_at(), &doc) == RemoteOrigin::Echo {
            log::debug!("Suppressed echo of own write to {}", doc.id);
            return;
        }
        if doc.updated_at <= self.session.base().updated_at {
            log::debug!("Ignoring stale snapshot of {} from {}", doc.id, doc.updated_at);
            return;
        }

        log::debug!("Applying remote change to {} from {}", doc.id, doc.updated_at);
        self.session.apply_remote(&doc);
        if !self.session.is_dirty() {
            self.buffer.cancel_timer();
        }
    }

    /// Start the next queued write, if nothing is in flight
    fn pump(&mut self) {
        loop {
            match self.buffer.next_write() {
                None => return,
                Some(NextWrite::Flush(change)) => match self.session.take_patch() {
                    Some((patch, sent)) => {
                        self.persister.persist(patch, sent, change);
                        return;
                    }
                    None => self.buffer.finish(),
                },
                Some(NextWrite::Restore(request)) => {
                    self.persister.restore(request);
                    return;
                }
            }
        }
    }

    fn publish(&self) {
        let dirty = self.session.is_dirty();
        let state = if self.closed {
            SessionState::Closed
        } else {
            SessionState::Open {
                editing: dirty || self.buffer.deadline().is_some(),
                syncing: !self.buffer.is_idle(),
            }
        };
        let save_status = match (&self.last_error, self.buffer.in_flight()) {
            (_, Some(WriteKind::Persist(_))) => SaveStatus::Saving,
            (Some(e), _) if dirty => SaveStatus::Failed(e.clone()),
            _ if dirty => SaveStatus::Unsaved,
            _ => SaveStatus::Saved,
        };
        let view = self.session.view();

        self.view.send_replace(SessionView {
            document_id: self.session.document_id().clone(),
            state,
            save_status,
            title: self.session.title().to_string(),
            status: self.session.status(),
            tags: self.session.tags().to_vec(),
            due_date: self.session.due_date(),
            rendered: self.session.rendered().clone(),
            focused: view.focused,
            caret: view.caret.clone(),
            scroll: view.scroll,
            live: self.listener.is_live(),
            last_saved_at: self.session.last_saved_at(),
            message: self.message.clone(),
            version: self.session.version(),
        });
    }

    /// Close path: wait for the write in flight, flush what is left,
    /// release the live feed. Queued restores are dropped.
    async fn shutdown(&mut self) {
        log::debug!("Closing editor session for {}", self.session.document_id());
        self.buffer.cancel_timer();
        let dropped = self.buffer.drain_restores().count();
        if dropped > 0 {
            log::debug!("Dropped {dropped} queued restores on close");
        }
        self.buffer.flush_now(ChangeType::Manual);

        loop {
            self.pump();
            if self.buffer.is_idle() {
                break;
            }
            match self.outcomes.recv().await {
                Some(outcome) => self.handle_outcome(outcome),
                None => break,
            }
        }

        if self.session.is_dirty() {
            log::warn!(
                "Closed {} with unsaved changes",
                self.session.document_id()
            );
        }
        self.listener.unsubscribe();
        self.closed = true;
        self.publish();
        log::info!("Closed editor session for {}", self.session.document_id());
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
