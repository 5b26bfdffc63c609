//! Shared crate-wide constants.

/// Default frame interval for the shell's event loop, in milliseconds.
pub const DEFAULT_FRAME_MS: u64 = 16;

/// Frames the in-memory backend waits before answering a request.
///
/// Long enough that a dialog is visibly open (and can be closed) before its
/// content arrives.
pub const DEFAULT_BACKEND_LATENCY_FRAMES: u32 = 20;

/// Rows given to the log pane at the bottom of the shell.
pub const LOG_PANE_HEIGHT: u16 = 6;

pub const TOOLBAR_HEIGHT: u16 = 1;
pub const STATUS_HEIGHT: u16 = 1;
