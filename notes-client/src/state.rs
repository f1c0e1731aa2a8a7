//! Client-side view of the notes collection.
//!
//! [`NotesState`] is only ever changed through [`NotesState::apply`].
//! Commands run on a [`NotesController`], which reports progress as
//! [`Action`]s over an mpsc channel; a [`NotesView`] owns the receiving end,
//! applies the actions in order and schedules notice expiry.

use std::{fmt::Write as _, time::Duration};

use chrono::Local;
use tokio::sync::mpsc;

use crate::{
    api::NotesApi,
    model::{Note, NoteDraft},
};

pub const NOTE_CREATED: &str = "Note created successfully!";
pub const NOTE_UPDATED: &str = "Note updated successfully!";
pub const NOTE_DELETED: &str = "Note deleted successfully!";

const ACTION_BUFFER: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Load,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InFlight {
    pub creating: bool,
    pub updating: bool,
    pub deleting: bool,
}

/// A transient success message. `id` tells a stale expiry apart from the
/// notice currently shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Started(Operation),
    Loaded(Vec<Note>),
    Created(Note),
    Updated(Note),
    Deleted(i64),
    /// The server answered 2xx but did not report success.
    Unconfirmed(Operation),
    Failed(Operation, String),
    NoticeExpired(u64),
}

/// Follow-up work requested by a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    ExpireNotice(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesState {
    pub notes: Vec<Note>,
    pub loading: bool,
    pub error: Option<String>,
    pub in_flight: InFlight,
    pub notice: Option<Notice>,
    next_notice_id: u64,
}

impl Default for NotesState {
    fn default() -> Self {
        Self {
            notes: Vec::new(),
            loading: true,
            error: None,
            in_flight: InFlight::default(),
            notice: None,
            next_notice_id: 0,
        }
    }
}

impl NotesState {
    pub fn apply(&mut self, action: Action) -> Effect {
        match action {
            Action::Started(op) => {
                self.error = None;
                self.set_busy(op, true);
                Effect::None
            }
            Action::Loaded(notes) => {
                self.notes = notes;
                self.loading = false;
                Effect::None
            }
            Action::Created(note) => {
                self.notes.insert(0, note);
                self.in_flight.creating = false;
                self.show_notice(NOTE_CREATED)
            }
            Action::Updated(note) => {
                if let Some(slot) = self.notes.iter_mut().find(|n| n.id == note.id) {
                    *slot = note;
                }
                self.in_flight.updating = false;
                self.show_notice(NOTE_UPDATED)
            }
            Action::Deleted(id) => {
                self.notes.retain(|n| n.id != id);
                self.in_flight.deleting = false;
                self.show_notice(NOTE_DELETED)
            }
            Action::Unconfirmed(op) => {
                self.set_busy(op, false);
                Effect::None
            }
            Action::Failed(op, message) => {
                self.error = Some(message);
                self.set_busy(op, false);
                Effect::None
            }
            Action::NoticeExpired(id) => {
                if self.notice.as_ref().is_some_and(|n| n.id == id) {
                    self.notice = None;
                }
                Effect::None
            }
        }
    }

    const fn set_busy(&mut self, op: Operation, busy: bool) {
        match op {
            Operation::Load => self.loading = busy,
            Operation::Create => self.in_flight.creating = busy,
            Operation::Update => self.in_flight.updating = busy,
            Operation::Delete => self.in_flight.deleting = busy,
        }
    }

    fn show_notice(&mut self, message: &str) -> Effect {
        self.next_notice_id += 1;
        let id = self.next_notice_id;
        self.notice = Some(Notice {
            id,
            message: message.to_string(),
        });
        Effect::ExpireNotice(id)
    }
}

/// Owns the state and the receiving end of the action channel.
pub struct NotesView {
    state: NotesState,
    tx: mpsc::Sender<Action>,
    rx: mpsc::Receiver<Action>,
    notice_ttl: Duration,
}

impl NotesView {
    pub fn new(notice_ttl: Duration) -> Self {
        let (tx, rx) = mpsc::channel(ACTION_BUFFER);
        Self {
            state: NotesState::default(),
            tx,
            rx,
            notice_ttl,
        }
    }

    pub fn sender(&self) -> mpsc::Sender<Action> {
        self.tx.clone()
    }

    pub const fn state(&self) -> &NotesState {
        &self.state
    }

    pub fn dispatch(&mut self, action: Action) {
        tracing::debug!("dispatch {:?}", action);
        if let Effect::ExpireNotice(id) = self.state.apply(action) {
            self.schedule_notice_expiry(id);
        }
    }

    /// Applies every action already queued without waiting for more.
    pub fn drain(&mut self) {
        while let Ok(action) = self.rx.try_recv() {
            self.dispatch(action);
        }
    }

    /// Waits for the next action and applies it.
    pub async fn next(&mut self) {
        if let Some(action) = self.rx.recv().await {
            self.dispatch(action);
        }
    }

    fn schedule_notice_expiry(&self, id: u64) {
        let tx = self.tx.clone();
        let ttl = self.notice_ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            // The view may be gone by now.
            let _ = tx.send(Action::NoticeExpired(id)).await;
        });
    }
}

/// Runs commands against the API and reports their progress as actions.
#[derive(Clone)]
pub struct NotesController {
    api: NotesApi,
    actions: mpsc::Sender<Action>,
}

impl NotesController {
    pub fn new(api: NotesApi, actions: mpsc::Sender<Action>) -> Self {
        Self { api, actions }
    }

    pub async fn refresh(&self) {
        self.emit(Action::Started(Operation::Load)).await;

        let action = match self.api.list().await {
            Ok(envelope) if envelope.success => Action::Loaded(envelope.data.unwrap_or_default()),
            Ok(_) => Action::Unconfirmed(Operation::Load),
            Err(e) => Action::Failed(Operation::Load, e.to_string()),
        };
        self.emit(action).await;
    }

    pub async fn create(&self, draft: NoteDraft) {
        self.emit(Action::Started(Operation::Create)).await;

        let draft = match draft.checked() {
            Ok(draft) => draft,
            Err(message) => return self.emit(Action::Failed(Operation::Create, message)).await,
        };
        let action = match self.api.create(&draft).await {
            Ok(envelope) => match envelope.data {
                Some(note) if envelope.success => Action::Created(note),
                _ => Action::Unconfirmed(Operation::Create),
            },
            Err(e) => Action::Failed(Operation::Create, e.to_string()),
        };
        self.emit(action).await;
    }

    pub async fn update(&self, id: i64, draft: NoteDraft) {
        self.emit(Action::Started(Operation::Update)).await;

        let draft = match draft.checked() {
            Ok(draft) => draft,
            Err(message) => return self.emit(Action::Failed(Operation::Update, message)).await,
        };
        let action = match self.api.update(id, &draft).await {
            Ok(envelope) => match envelope.data {
                Some(note) if envelope.success => Action::Updated(note),
                _ => Action::Unconfirmed(Operation::Update),
            },
            Err(e) => Action::Failed(Operation::Update, e.to_string()),
        };
        self.emit(action).await;
    }

    pub async fn delete(&self, id: i64) {
        self.emit(Action::Started(Operation::Delete)).await;

        let action = match self.api.delete(id).await {
            Ok(envelope) if envelope.success => Action::Deleted(id),
            Ok(_) => Action::Unconfirmed(Operation::Delete),
            Err(e) => Action::Failed(Operation::Delete, e.to_string()),
        };
        self.emit(action).await;
    }

    async fn emit(&self, action: Action) {
        if self.actions.send(action).await.is_err() {
            tracing::warn!("notes view closed, dropping action");
        }
    }
}

pub fn format_note(note: &Note) -> String {
    let created = note.created_at.map_or_else(
        || "unknown".to_string(),
        |t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
    );
    format!("#{} {}\n    {}\n    created {}", note.id, note.title, note.content, created)
}

pub fn render(state: &NotesState) -> String {
    let mut out = String::new();

    if let Some(notice) = &state.notice {
        let _ = writeln!(out, "{}", notice.message);
    }
    if let Some(error) = &state.error {
        let _ = writeln!(out, "Error: {error}");
    }

    let busy = [
        (state.in_flight.creating, "Creating..."),
        (state.in_flight.updating, "Saving..."),
        (state.in_flight.deleting, "Deleting..."),
    ];
    for (_, label) in busy.iter().filter(|(on, _)| *on) {
        let _ = writeln!(out, "{label}");
    }

    if state.loading {
        out.push_str("Loading notes...\n");
    } else if state.notes.is_empty() {
        out.push_str("No notes yet.\n");
    } else {
        for note in &state.notes {
            let _ = writeln!(out, "{}", format_note(note));
        }
    }

    out
}
