//! One overlay instance: portal mounting plus the per-session controllers.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::dom::{Document, ElementKind, NodeId};
use crate::overlay::focus_trap::{CloseCallback, FocusTrapEngine, TrapPhase};
use crate::overlay::outside::{
    DismissCallback, OutsideInteractionController, OutsideInteractionSubscription, OutsideOptions,
};
use crate::overlay::scroll_lock::ScrollLockToken;
use crate::overlay::session::{OverlaySession, SessionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayKind {
    /// Dialog: traps focus and locks page scrolling.
    #[default]
    Modal,
    /// Dropdown or menu: dismissible, but focus and scrolling stay free.
    Popover,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayConfig {
    pub kind: OverlayKind,
    pub close_on_outside_activation: bool,
    pub initial_focus_target: Option<NodeId>,
    pub return_focus_target: Option<NodeId>,
    pub outside_exempt: Vec<NodeId>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            kind: OverlayKind::Modal,
            close_on_outside_activation: true,
            initial_focus_target: None,
            return_focus_target: None,
            outside_exempt: Vec::new(),
        }
    }
}

impl OverlayConfig {
    pub fn modal() -> Self {
        Self::default()
    }

    pub fn popover() -> Self {
        Self {
            kind: OverlayKind::Popover,
            ..Self::default()
        }
    }

    pub fn with_initial_focus(mut self, node: NodeId) -> Self {
        self.initial_focus_target = Some(node);
        self
    }

    pub fn with_return_focus(mut self, node: NodeId) -> Self {
        self.return_focus_target = Some(node);
        self
    }

    pub fn with_exempt(mut self, node: NodeId) -> Self {
        self.outside_exempt.push(node);
        self
    }

    pub fn close_on_outside_activation(mut self, enabled: bool) -> Self {
        self.close_on_outside_activation = enabled;
        self
    }

    fn outside_options(&self) -> OutsideOptions {
        let options = match self.kind {
            // the trap owns Escape for dialogs; the pointer guard stays even
            // when outside clicks do not dismiss
            OverlayKind::Modal => OutsideOptions::modal(self.close_on_outside_activation),
            OverlayKind::Popover => OutsideOptions {
                pointer: self.close_on_outside_activation,
                ..OutsideOptions::default()
            },
        };
        OutsideOptions {
            exempt: self.outside_exempt.clone(),
            ..options
        }
    }
}

struct OpenOverlay {
    session: OverlaySession,
    portal: NodeId,
    scroll: Option<ScrollLockToken>,
    outside: OutsideInteractionSubscription,
    close_requested: Rc<Cell<bool>>,
}

/// Mounts `content` into a portal while open and composes the scroll lock,
/// focus trap and outside-interaction controllers around it.
///
/// The host never closes itself. Escape and outside clicks invoke `on_close`
/// (at most once per session); the owner answers with `set_open(false)`.
pub struct OverlayHost {
    doc: Document,
    content: NodeId,
    config: OverlayConfig,
    on_close: CloseCallback,
    trap: FocusTrapEngine,
    open: Option<OpenOverlay>,
}

impl OverlayHost {
    pub fn new(doc: &Document, content: NodeId, config: OverlayConfig, on_close: CloseCallback) -> Self {
        Self {
            doc: doc.clone(),
            content,
            config,
            on_close,
            trap: FocusTrapEngine::new(doc),
            open: None,
        }
    }

    pub fn content(&self) -> NodeId {
        self.content
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Replace the configuration used by the next open.
    pub fn set_config(&mut self, config: OverlayConfig) {
        self.config = config;
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn session(&self) -> Option<SessionId> {
        self.open.as_ref().map(|open| open.session.id())
    }

    pub fn portal(&self) -> Option<NodeId> {
        self.open.as_ref().map(|open| open.portal)
    }

    pub fn trap_phase(&self) -> TrapPhase {
        self.trap.phase()
    }

    /// Whether `on_close` already fired for the current session.
    pub fn close_requested(&self) -> bool {
        self.open
            .as_ref()
            .is_some_and(|open| open.close_requested.get())
    }

    pub fn set_open(&mut self, open: bool) {
        match (open, self.open.is_some()) {
            (true, false) => self.mount(),
            (false, true) => self.unmount(),
            _ => {}
        }
    }

    fn mount(&mut self) {
        let portal = self.doc.create_element(ElementKind::Container, "overlay-portal");
        let mounted = self
            .doc
            .append_child(self.doc.body(), portal)
            .and_then(|()| self.doc.append_child(portal, self.content));
        if let Err(err) = mounted {
            tracing::warn!(content = %self.content, error = %err, "overlay mount failed");
            self.doc.remove(portal);
            return;
        }

        let mut session = OverlaySession::new(
            self.content,
            self.config.initial_focus_target,
            self.config.return_focus_target,
        );
        let close_requested = Rc::new(Cell::new(false));
        let request_close: CloseCallback = {
            let flag = Rc::clone(&close_requested);
            let on_close = Rc::clone(&self.on_close);
            let id = session.id();
            Rc::new(move || {
                if flag.replace(true) {
                    tracing::trace!(session = %id, "close already requested");
                    return;
                }
                on_close();
            })
        };

        let modal = self.config.kind == OverlayKind::Modal;
        let scroll = modal.then(|| self.doc.scroll_lock().acquire());
        if modal {
            self.trap.open(&mut session, Rc::clone(&request_close));
        }
        let outside = {
            let request_close = Rc::clone(&request_close);
            let on_dismiss: DismissCallback = Rc::new(move |_reason| request_close());
            OutsideInteractionController::subscribe(
                &self.doc,
                self.content,
                self.config.outside_options(),
                on_dismiss,
            )
        };

        tracing::debug!(
            session = %session.id(),
            kind = ?self.config.kind,
            portal = %portal,
            "overlay opened"
        );
        self.open = Some(OpenOverlay {
            session,
            portal,
            scroll,
            outside,
            close_requested,
        });
    }

    fn unmount(&mut self) {
        let Some(OpenOverlay {
            session,
            portal,
            scroll,
            mut outside,
            close_requested: _,
        }) = self.open.take()
        else {
            return;
        };
        outside.teardown();
        self.trap.close(session.id());
        if let Some(mut token) = scroll {
            token.release();
        }
        self.doc.remove(portal);
        tracing::debug!(
            session = %session.id(),
            open_for = ?session.opened_at().elapsed(),
            "overlay closed"
        );
    }
}

impl Drop for OverlayHost {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl fmt::Debug for OverlayHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayHost")
            .field("content", &self.content)
            .field("kind", &self.config.kind)
            .field("session", &self.session())
            .field("trap", &self.trap)
            .finish()
    }
}
