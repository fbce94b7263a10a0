use std::time::Instant;

/// Interaction modes. Keys are scoped to the current mode; a key not
/// bound in the current mode is ignored, never falls through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Manage,
    Git,
    Filter,
}

/// Non-modal overlay views layered over the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    Help,
    Status,
    History,
    StashList,
}

/// Modal prompts that capture input until confirmed or cancelled.
pub enum Prompt {
    AddWorktree {
        buffer: String,
    },
    ConfirmRemove {
        name: String,
        force: bool,
    },
    ConfirmTeleport {
        target: String,
    },
    CommitMessage {
        worktree: String,
        buffer: String,
    },
}

/// Transient footer message, cleared after a few ticks.
pub struct StatusLine {
    pub message: String,
    pub is_error: bool,
    pub expires_at: Instant,
}
