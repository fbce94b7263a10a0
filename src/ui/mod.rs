/// UI layer: rendering for the main screen, overlays and modals.
/// Kept free of application state mutation so every function here is
/// a pure projection of what the app layer hands it.
pub mod helpers;
pub mod modals;
pub mod render;

pub use helpers::{centered_rect, format_log_entry, mode_label};
pub use modals::{
    render_confirm_modal, render_history_overlay, render_input_modal, render_modal,
    render_stash_overlay, render_status_overlay,
};
pub use render::{help_lines, render_footer, render_header, render_table, WorktreeRow};
