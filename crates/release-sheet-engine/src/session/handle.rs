use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::editing::{Cmd, EditSession, Patch, ScrollOffsets};
use crate::model::{BlockId, Document, DocumentId, VersionId, VersionSnapshot};
use crate::session::controller::{Collaborators, Command, SessionController, SessionOptions};
use crate::session::state::SessionView;
use crate::sync::{HistoryError, Persister, RemoteListener, RestoreRequest, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to load document: {0}")]
    Load(#[source] StoreError),
    #[error("Restore failed: {0}")]
    Restore(#[source] HistoryError),
    #[error("History unavailable: {0}")]
    History(#[source] HistoryError),
    #[error("Editor session is closed")]
    Closed,
}

/// Open a document for editing.
///
/// Loads the document, subscribes to its remote changes (templates
/// excepted) and starts the session's event loop. Load failures are
/// returned; a failed subscription only leaves the session without live
/// updates.
pub async fn open(
    document_id: DocumentId,
    collaborators: Collaborators,
    options: SessionOptions,
) -> Result<EditorHandle, SessionError> {
    let Collaborators {
        store,
        history,
        notifier,
    } = collaborators;

    let doc = store.get(&document_id).await.map_err(SessionError::Load)?;

    let listener = if doc.is_template(&options.template_artist_id) {
        log::debug!("{document_id} is a template, not subscribing");
        RemoteListener::disabled(document_id.clone())
    } else {
        RemoteListener::subscribe(&store, document_id.clone(), options.resubscribe_attempts).await
    };

    let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
    let persister = Persister::new(
        document_id.clone(),
        store.clone(),
        history.clone(),
        notifier,
        options.author.clone(),
        outcome_tx,
    );

    let (view_tx, view_rx) = watch::channel(SessionView::loading(document_id.clone()));
    let controller = SessionController::new(
        EditSession::open(doc),
        options.quiet_period,
        persister,
        listener,
        store,
        outcome_rx,
        view_tx,
    );

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(controller.run(command_rx));

    Ok(EditorHandle {
        document_id,
        commands: command_tx,
        view: view_rx,
        history,
        task: Arc::new(Mutex::new(Some(task))),
    })
}

/// Handle the UI holds on an open session.
///
/// Cheap to clone. When the last handle is dropped the session runs the
/// same close path as `close`, in the background.
#[derive(Clone)]
pub struct EditorHandle {
    document_id: DocumentId,
    commands: mpsc::UnboundedSender<Command>,
    view: watch::Receiver<SessionView>,
    history: crate::sync::SharedHistory,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl EditorHandle {
    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    /// Apply a local edit and restart the autosave timer
    pub async fn edit(&self, cmd: Cmd) -> Result<Patch, SessionError> {
        let (reply, patch) = oneshot::channel();
        self.send(Command::Edit(cmd, reply))?;
        patch.await.map_err(|_| SessionError::Closed)
    }

    /// Focus left the editor: save now
    pub fn blur(&self) -> Result<(), SessionError> {
        self.send(Command::Blur)
    }

    /// Explicit save
    pub fn save(&self) -> Result<(), SessionError> {
        self.send(Command::Save)
    }

    pub fn set_focus(&self, focused: bool) -> Result<(), SessionError> {
        self.send(Command::SetFocus(focused))
    }

    pub fn set_caret(&self, offset: Option<usize>) -> Result<(), SessionError> {
        self.send(Command::SetCaret(offset))
    }

    pub fn set_scroll(&self, scroll: ScrollOffsets) -> Result<(), SessionError> {
        self.send(Command::SetScroll(scroll))
    }

    pub fn toggle_embed(&self, id: BlockId) -> Result<(), SessionError> {
        self.send(Command::ToggleEmbed(id))
    }

    /// Restore a previous version's content. Runs after any write in
    /// flight and after unsaved edits are flushed.
    pub async fn restore(&self, version_id: VersionId) -> Result<Document, SessionError> {
        let (reply, result) = oneshot::channel();
        self.send(Command::Restore(RestoreRequest { version_id, reply }))?;
        match result.await {
            Ok(Ok(doc)) => Ok(doc),
            Ok(Err(e)) => Err(SessionError::Restore(e)),
            Err(_) => Err(SessionError::Closed),
        }
    }

    /// Retained versions, newest first
    pub async fn versions(&self) -> Result<Vec<VersionSnapshot>, SessionError> {
        self.history
            .list(&self.document_id)
            .await
            .map_err(SessionError::History)
    }

    /// Latest published view
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// Wait for the next published view
    pub async fn changed(&mut self) -> Result<SessionView, SessionError> {
        self.view.changed().await.map_err(|_| SessionError::Closed)?;
        Ok(self.view.borrow_and_update().clone())
    }

    /// Wait until the view satisfies `predicate`
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&SessionView) -> bool,
    ) -> Result<SessionView, SessionError> {
        self.view
            .wait_for(predicate)
            .await
            .map(|view| view.clone())
            .map_err(|_| SessionError::Closed)
    }

    /// Flush pending edits, release the live feed and stop the session.
    /// Returns once the final save has completed or failed.
    pub async fn close(self) -> Result<(), SessionError> {
        let _ = self.commands.send(Command::Close);
        let task = self.task.lock().await.take();
        if let Some(task) = task {
            task.await.map_err(|_| SessionError::Closed)?;
        }
        Ok(())
    }

    fn send(&self, command: Command) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .map_err(|_| SessionError::Closed)
    }
}
