//! Overlay lifecycle: focus containment, scroll locking, outside dismissal,
//! and the host that composes them per overlay instance.

pub mod focus_trap;
pub mod focusable;
pub mod host;
pub mod outside;
pub mod scroll_lock;
pub mod session;

pub use focus_trap::{CloseCallback, FocusTrapEngine, TrapPhase};
pub use focusable::FocusableSetResolver;
pub use host::{OverlayConfig, OverlayHost, OverlayKind};
pub use outside::{
    DismissCallback, DismissReason, OutsideInteractionController, OutsideInteractionSubscription,
    OutsideOptions,
};
pub use scroll_lock::{ScrollLockManager, ScrollLockToken};
pub use session::{OverlaySession, SessionId};
