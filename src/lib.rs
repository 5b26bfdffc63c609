pub mod constants;
pub mod debug_log;
pub mod dom;
pub mod drivers;
pub mod error;
pub mod event_loop;
pub mod keybindings;
pub mod overlay;
pub mod scheduler;
pub mod shell;
pub mod tracing_sub;
pub mod ui;

pub use dom::{Document, ElementKind, NodeId};
pub use error::DomError;
pub use overlay::{OverlayConfig, OverlayHost, OverlayKind};
