//! # Undo/Redo History
//!
//! Snapshot-based history over both element layers.
//!
//! ## Recording policy
//!
//! ```text
//! auto_save      skipped within auto_save_delay_ms of the last save,
//!                or while a drag is in progress
//! other actions  skipped when the previous save had the same label and
//!                happened within same_action_window_ms
//! all            skipped while an undo/redo is being applied, and when the
//!                snapshot equals the top of the undo stack
//! ```
//!
//! Continuous manipulations are bracketed: [`History::drag_start`] captures
//! the state before the gesture and [`History::drag_end`] records it together
//! with the state after, so one drag is one undoable step no matter how many
//! frames it spanned.
//!
//! ## Restoring
//!
//! [`History::undo`] and [`History::redo`] hand back the snapshot to apply and
//! leave the history in a restoring state. Saves are ignored until the owner
//! calls [`History::finish_restore`] once the restored elements are in place.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::config::HistoryConfig;
use crate::store::ElementSnapshot;
use crate::timer::IdleTimer;

const REDO_PREFIX: &str = "redo_";
const UNDO_PREFIX: &str = "undo_";

/// Label of a history entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HistoryAction {
    /// Snapshot taken by the idle timer.
    AutoSave,
    /// A text overlay was added.
    AddText,
    /// A text overlay was edited in the text editor.
    EditText,
    /// A text overlay was deleted.
    DeleteText,
    /// A text overlay was duplicated.
    DuplicateText,
    /// A text overlay's style changed.
    StyleText,
    /// An image overlay was added.
    AddImage,
    /// An image overlay was edited in the image editor.
    EditImage,
    /// An image overlay was deleted.
    DeleteImage,
    /// An image overlay was duplicated.
    DuplicateImage,
    /// An image overlay's opacity changed.
    OpacityImage,
    /// An image overlay's crop changed.
    CropImage,
    /// State before a drag or resize.
    MoveStart,
    /// State after a drag or resize.
    MoveEnd,
    /// State saved to the redo stack by an undo.
    Redo(Box<HistoryAction>),
    /// State saved back to the undo stack by a redo.
    Undo(Box<HistoryAction>),
    /// Any other host-defined label.
    Custom(String),
}

impl HistoryAction {
    fn simple_label(&self) -> Option<&'static str> {
        let label = match self {
            Self::AutoSave => "auto_save",
            Self::AddText => "add_text",
            Self::EditText => "edit_text",
            Self::DeleteText => "delete_text",
            Self::DuplicateText => "duplicate_text",
            Self::StyleText => "style_text",
            Self::AddImage => "add_image",
            Self::EditImage => "edit_image",
            Self::DeleteImage => "delete_image",
            Self::DuplicateImage => "duplicate_image",
            Self::OpacityImage => "opacity_image",
            Self::CropImage => "crop_image",
            Self::MoveStart => "move_start",
            Self::MoveEnd => "move_end",
            Self::Redo(_) | Self::Undo(_) | Self::Custom(_) => return None,
        };
        Some(label)
    }

    /// Label for the redo entry created when undoing this action.
    #[must_use]
    pub fn for_redo(self) -> Self {
        Self::Redo(Box::new(self))
    }

    /// Label for the undo entry created when redoing an entry labelled
    /// `self`: a `redo_` prefix becomes `undo_`, anything else is kept.
    #[must_use]
    pub fn for_undo(self) -> Self {
        match self {
            Self::Redo(inner) => Self::Undo(inner),
            other => other,
        }
    }

    /// Whether this is the idle-timer label.
    #[must_use]
    pub const fn is_auto_save(&self) -> bool {
        matches!(self, Self::AutoSave)
    }
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(label) = self.simple_label() {
            return f.write_str(label);
        }
        match self {
            Self::Redo(inner) => write!(f, "{REDO_PREFIX}{inner}"),
            Self::Undo(inner) => write!(f, "{UNDO_PREFIX}{inner}"),
            Self::Custom(label) => f.write_str(label),
            _ => Ok(()),
        }
    }
}

impl FromStr for HistoryAction {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix(REDO_PREFIX) {
            return Ok(Self::Redo(Box::new(rest.parse()?)));
        }
        if let Some(rest) = s.strip_prefix(UNDO_PREFIX) {
            return Ok(Self::Undo(Box::new(rest.parse()?)));
        }
        let action = match s {
            "auto_save" => Self::AutoSave,
            "add_text" => Self::AddText,
            "edit_text" => Self::EditText,
            "delete_text" => Self::DeleteText,
            "duplicate_text" => Self::DuplicateText,
            "style_text" => Self::StyleText,
            "add_image" => Self::AddImage,
            "edit_image" => Self::EditImage,
            "delete_image" => Self::DeleteImage,
            "duplicate_image" => Self::DuplicateImage,
            "opacity_image" => Self::OpacityImage,
            "crop_image" => Self::CropImage,
            "move_start" => Self::MoveStart,
            "move_end" => Self::MoveEnd,
            other => Self::Custom(other.to_string()),
        };
        Ok(action)
    }
}

impl TryFrom<String> for HistoryAction {
    type Error = std::convert::Infallible;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<HistoryAction> for String {
    fn from(action: HistoryAction) -> Self {
        action.to_string()
    }
}

/// One recorded state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Both element layers at the time of recording.
    pub snapshot: ElementSnapshot,
    /// When the entry was recorded (ms).
    pub timestamp_ms: u64,
    /// What the entry is for.
    pub action: HistoryAction,
}

/// What a save request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A new entry was pushed.
    Saved,
    /// Ignored because an undo/redo is being applied.
    Restoring,
    /// Auto-save ignored because the last save is too recent.
    TooSoon,
    /// Auto-save ignored because a drag is in progress.
    DragInProgress,
    /// Ignored as a rapid repeat of the previous action.
    Coalesced,
    /// Ignored because nothing changed since the top entry.
    Unchanged,
}

impl SaveOutcome {
    /// Whether an entry was pushed.
    #[must_use]
    pub const fn is_saved(self) -> bool {
        matches!(self, Self::Saved)
    }
}

/// Undo/redo stacks with debounced, drag-aware recording.
#[derive(Debug)]
pub struct History {
    config: HistoryConfig,
    clock: Arc<dyn Clock>,
    undo_stack: VecDeque<HistoryEntry>,
    redo_stack: VecDeque<HistoryEntry>,
    restoring: bool,
    last_save_ms: Option<u64>,
    last_action: Option<HistoryAction>,
    dragging: bool,
    drag_start: Option<ElementSnapshot>,
    idle: IdleTimer,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// Create a history on the system clock with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(HistoryConfig::default(), Arc::new(SystemClock))
    }

    /// Create with custom configuration and time source.
    #[must_use]
    pub fn with_config(config: HistoryConfig, clock: Arc<dyn Clock>) -> Self {
        let idle = IdleTimer::new(config.auto_save_delay_ms);
        Self {
            config,
            clock,
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            restoring: false,
            last_save_ms: None,
            last_action: None,
            dragging: false,
            drag_start: None,
            idle,
        }
    }

    /// Get the current configuration.
    #[must_use]
    pub const fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Record `current` under `action`, subject to the recording policy.
    pub fn save_state(&mut self, action: HistoryAction, current: &ElementSnapshot) -> SaveOutcome {
        if self.restoring {
            tracing::debug!("Skipping save of {action}: restoring");
            return SaveOutcome::Restoring;
        }

        let now = self.clock.now_ms();
        let elapsed = self.last_save_ms.map(|last| now.saturating_sub(last));
        let within = |window: u64| elapsed.is_some_and(|e| e < window);

        if action.is_auto_save() {
            if self.dragging {
                tracing::debug!("Skipping auto-save: drag in progress");
                return SaveOutcome::DragInProgress;
            }
            if within(self.config.auto_save_delay_ms) {
                tracing::debug!("Skipping auto-save: last save {elapsed:?}ms ago");
                return SaveOutcome::TooSoon;
            }
        } else if self.last_action.as_ref() == Some(&action)
            && within(self.config.same_action_window_ms)
        {
            tracing::debug!("Coalescing repeated {action}");
            return SaveOutcome::Coalesced;
        }

        if self.top_matches(current) {
            tracing::debug!("Skipping save of {action}: state unchanged");
            return SaveOutcome::Unchanged;
        }

        tracing::info!("State saved to undo stack: {action}");
        self.push_undo(HistoryEntry {
            snapshot: current.clone(),
            timestamp_ms: now,
            action: action.clone(),
        });
        self.redo_stack.clear();
        self.last_save_ms = Some(now);
        self.last_action = Some(action);
        SaveOutcome::Saved
    }

    /// Start a drag bracket. A second call before [`History::drag_end`] is
    /// ignored, so the first captured state wins.
    pub fn drag_start(&mut self, current: &ElementSnapshot) -> bool {
        if self.dragging {
            return false;
        }
        self.drag_start = Some(current.clone());
        self.dragging = true;
        tracing::debug!("Drag started");
        true
    }

    /// Close the drag bracket opened by [`History::drag_start`].
    ///
    /// When the drag changed anything, the start state is pushed as
    /// `move_start` (unless it already is the top entry) and `current` is
    /// saved as `move_end`. Returns the outcome of the `move_end` save, or
    /// `None` when no drag was open or nothing changed.
    pub fn drag_end(&mut self, current: &ElementSnapshot) -> Option<SaveOutcome> {
        let was_dragging = std::mem::take(&mut self.dragging);
        let start = self.drag_start.take();
        if !was_dragging {
            return None;
        }
        let start = start?;
        if start == *current {
            tracing::debug!("Drag ended without changes");
            return None;
        }
        if self.restoring {
            return Some(SaveOutcome::Restoring);
        }

        if !self.top_matches(&start) {
            let timestamp_ms = self
                .clock
                .now_ms()
                .saturating_sub(self.config.move_start_backdate_ms);
            self.push_undo(HistoryEntry {
                snapshot: start,
                timestamp_ms,
                action: HistoryAction::MoveStart,
            });
            self.redo_stack.clear();
        }
        Some(self.save_state(HistoryAction::MoveEnd, current))
    }

    /// Abandon an open drag bracket without recording anything.
    pub fn cancel_drag(&mut self) {
        if std::mem::take(&mut self.dragging) {
            tracing::debug!("Drag cancelled");
        }
        self.drag_start = None;
    }

    /// Whether a drag bracket is open.
    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Step back. Pushes `current` onto the redo stack and returns the
    /// snapshot to restore; `None` when there is nothing to undo or a
    /// restore is still pending. An open drag bracket is abandoned.
    pub fn undo(&mut self, current: &ElementSnapshot) -> Option<ElementSnapshot> {
        if self.restoring {
            tracing::debug!("Ignoring undo: restore pending");
            return None;
        }
        let entry = self.undo_stack.pop_back()?;
        self.restoring = true;
        self.cancel_drag();
        self.push_redo(HistoryEntry {
            snapshot: current.clone(),
            timestamp_ms: self.clock.now_ms(),
            action: entry.action.clone().for_redo(),
        });
        tracing::info!(
            "Undo: {}, undo stack size: {}",
            entry.action,
            self.undo_stack.len()
        );
        Some(entry.snapshot)
    }

    /// Step forward. Pushes `current` back onto the undo stack and returns
    /// the snapshot to restore; `None` when there is nothing to redo or a
    /// restore is still pending. An open drag bracket is abandoned.
    pub fn redo(&mut self, current: &ElementSnapshot) -> Option<ElementSnapshot> {
        if self.restoring {
            tracing::debug!("Ignoring redo: restore pending");
            return None;
        }
        let entry = self.redo_stack.pop_back()?;
        self.restoring = true;
        self.cancel_drag();
        self.push_undo(HistoryEntry {
            snapshot: current.clone(),
            timestamp_ms: self.clock.now_ms(),
            action: entry.action.clone().for_undo(),
        });
        tracing::info!(
            "Redo: {}, redo stack size: {}",
            entry.action,
            self.redo_stack.len()
        );
        Some(entry.snapshot)
    }

    /// Acknowledge that the snapshot returned by the last undo/redo has been
    /// applied. Recording resumes.
    pub fn finish_restore(&mut self) {
        self.restoring = false;
    }

    /// Whether an undo/redo is waiting for [`History::finish_restore`].
    #[must_use]
    pub const fn is_restoring(&self) -> bool {
        self.restoring
    }

    /// Re-arm the idle timer after an element change.
    pub fn notify_change(&mut self) {
        self.idle.rearm(self.clock.now_ms());
    }

    /// Drop any pending idle save.
    pub fn cancel_auto_save(&mut self) {
        self.idle.cancel();
    }

    /// When the pending idle save is due, if one is armed.
    #[must_use]
    pub const fn auto_save_deadline(&self) -> Option<u64> {
        self.idle.deadline()
    }

    /// Run the idle save if its timer is due. Returns `None` when the timer
    /// did not fire.
    pub fn poll_auto_save(&mut self, current: &ElementSnapshot) -> Option<SaveOutcome> {
        if !self.idle.poll(self.clock.now_ms()) {
            return None;
        }
        if self.dragging {
            tracing::debug!("Idle timer fired during drag");
            return Some(SaveOutcome::DragInProgress);
        }
        Some(self.save_state(HistoryAction::AutoSave, current))
    }

    /// Whether there is anything to undo.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Whether there is anything to redo.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of undo entries.
    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    /// Number of redo entries.
    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Undo entries, oldest first.
    pub fn undo_entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.undo_stack.iter()
    }

    /// Redo entries, oldest first.
    pub fn redo_entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.redo_stack.iter()
    }

    /// Label of the last recorded save.
    #[must_use]
    pub fn last_action(&self) -> Option<&HistoryAction> {
        self.last_action.as_ref()
    }

    /// Forget everything, including any open drag and pending restore.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.restoring = false;
        self.last_save_ms = None;
        self.last_action = None;
        self.dragging = false;
        self.drag_start = None;
        self.idle.cancel();
    }

    fn top_matches(&self, snapshot: &ElementSnapshot) -> bool {
        self.undo_stack
            .back()
            .is_some_and(|top| top.snapshot == *snapshot)
    }

    fn push_undo(&mut self, entry: HistoryEntry) {
        self.undo_stack.push_back(entry);
        while self.undo_stack.len() > self.config.max_entries {
            self.undo_stack.pop_front();
        }
    }

    fn push_redo(&mut self, entry: HistoryEntry) {
        self.redo_stack.push_back(entry);
        while self.redo_stack.len() > self.config.max_entries {
            self.redo_stack.pop_front();
        }
    }
}
