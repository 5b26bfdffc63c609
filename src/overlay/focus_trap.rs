//! Keyboard focus containment for one overlay instance.
//!
//! The engine moves through three phases:
//!
//! - `Closed`: no listeners installed.
//! - `Open`: a session was handed to [`FocusTrapEngine::open`]; prior focus is
//!   captured, the Tab and Escape interceptors are live, and the initial focus
//!   move is waiting for the next frame.
//! - `Trapping`: the initial focus move has run.
//!
//! Deferred work (initial focus, focus restoration) is checked against the
//! engine's lifecycle when it fires rather than cancelled up front. A task
//! scheduled for one session can therefore never move focus on behalf of a
//! later one.

use std::cell::Cell;
use std::rc::Rc;

use crate::dom::{Document, KeyDispatch, ListenerGuard, NodeId};
use crate::keybindings::Action;
use crate::overlay::focusable::FocusableSetResolver;
use crate::overlay::session::{OverlaySession, SessionId};

/// Caller-supplied close request. The caller decides whether to actually
/// flip the overlay closed.
pub type CloseCallback = Rc<dyn Fn()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapPhase {
    Closed,
    Open,
    Trapping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Live(SessionId),
    Closed(SessionId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TabDecision {
    /// Focus belongs to something outside this trap (e.g. a stacked overlay).
    Outside,
    /// Nothing to move to; swallow the key.
    Hold,
    MoveTo(NodeId),
    /// Interior element; regular traversal stays inside the root.
    Default,
}

fn decide_tab(doc: &Document, root: NodeId, forward: bool) -> TabDecision {
    let active = doc.active_element();
    if let Some(active) = active
        && !doc.contains(root, active)
    {
        return TabDecision::Outside;
    }
    let set = FocusableSetResolver::resolve(doc, root);
    let (Some(&first), Some(&last)) = (set.first(), set.last()) else {
        return TabDecision::Hold;
    };
    // nothing focused, the root itself, or an untabbable node inside the root
    let Some(active) = active.filter(|node| set.contains(node)) else {
        return TabDecision::MoveTo(if forward { first } else { last });
    };
    if forward && active == last {
        TabDecision::MoveTo(first)
    } else if !forward && active == first {
        TabDecision::MoveTo(last)
    } else {
        TabDecision::Default
    }
}

struct ActiveTrap {
    session: OverlaySession,
    tab: ListenerGuard,
    escape: ListenerGuard,
}

pub struct FocusTrapEngine {
    doc: Document,
    active: Option<ActiveTrap>,
    lifecycle: Rc<Cell<Lifecycle>>,
    phase: Rc<Cell<TrapPhase>>,
}

impl FocusTrapEngine {
    pub fn new(doc: &Document) -> Self {
        Self {
            doc: doc.clone(),
            active: None,
            lifecycle: Rc::new(Cell::new(Lifecycle::Idle)),
            phase: Rc::new(Cell::new(TrapPhase::Closed)),
        }
    }

    pub fn phase(&self) -> TrapPhase {
        self.phase.get()
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    pub fn session(&self) -> Option<SessionId> {
        self.active.as_ref().map(|trap| trap.session.id())
    }

    /// Start trapping focus inside `session.root()`.
    ///
    /// Records the prior focus into `session` unless it carries an explicit
    /// return target. Reopening with the session that is already active does
    /// nothing; opening a different session first closes the current one.
    pub fn open(&mut self, session: &mut OverlaySession, on_close: CloseCallback) {
        if let Some(current) = self.session() {
            if current == session.id() {
                return;
            }
            tracing::warn!(
                current = %current,
                next = %session.id(),
                "focus trap reopened without close; closing previous session"
            );
            self.close(current);
        }
        let id = session.id();
        let root = session.root();

        if session.return_focus_target().is_none() {
            session.set_prior_focus(self.doc.active_element());
        }
        if let Some(target) = session.initial_focus_target()
            && !self.doc.contains(root, target)
        {
            tracing::warn!(
                session = %id,
                target = %target,
                root = %root,
                "initial focus target is outside the overlay root"
            );
        }
        self.lifecycle.set(Lifecycle::Live(id));
        self.phase.set(TrapPhase::Open);

        let tab = self.install_tab_interceptor(id, root);
        let escape = self.install_escape_interceptor(id, on_close);
        self.schedule_initial_focus(session);

        tracing::debug!(
            session = %id,
            root = %root,
            prior_focus = ?session.prior_focus(),
            "focus trap opened"
        );
        self.active = Some(ActiveTrap {
            session: session.clone(),
            tab,
            escape,
        });
    }

    /// Stop trapping and schedule focus restoration. Returns `false` (and does
    /// nothing) unless `session` is the one currently open.
    pub fn close(&mut self, session: SessionId) -> bool {
        if self.session() != Some(session) {
            tracing::trace!(session = %session, "close ignored; session not active");
            return false;
        }
        let Some(ActiveTrap {
            session: closed,
            tab,
            escape,
        }) = self.active.take()
        else {
            return false;
        };
        // listeners go first so no key can reach a half-restored trap
        tab.remove();
        escape.remove();
        self.lifecycle.set(Lifecycle::Closed(session));
        self.phase.set(TrapPhase::Closed);
        self.schedule_restore(closed);
        tracing::debug!(session = %session, "focus trap closed");
        true
    }

    fn install_tab_interceptor(&self, id: SessionId, root: NodeId) -> ListenerGuard {
        let weak = self.doc.downgrade();
        let lifecycle = Rc::clone(&self.lifecycle);
        self.doc.add_key_listener(move |dispatch: &mut KeyDispatch| {
            if lifecycle.get() != Lifecycle::Live(id) {
                return;
            }
            let Some(doc) = weak.upgrade() else {
                return;
            };
            let key = *dispatch.key();
            let forward = if doc.bindings().matches(Action::FocusNext, &key) {
                true
            } else if doc.bindings().matches(Action::FocusPrev, &key) {
                false
            } else {
                return;
            };
            match decide_tab(&doc, root, forward) {
                TabDecision::Outside | TabDecision::Default => {}
                TabDecision::Hold => dispatch.prevent_default(),
                TabDecision::MoveTo(node) => {
                    doc.focus(node);
                    dispatch.prevent_default();
                }
            }
        })
    }

    fn install_escape_interceptor(&self, id: SessionId, on_close: CloseCallback) -> ListenerGuard {
        let weak = self.doc.downgrade();
        let lifecycle = Rc::clone(&self.lifecycle);
        self.doc.add_key_listener(move |dispatch: &mut KeyDispatch| {
            if lifecycle.get() != Lifecycle::Live(id) {
                return;
            }
            let Some(doc) = weak.upgrade() else {
                return;
            };
            if !doc.bindings().matches(Action::Dismiss, dispatch.key()) {
                return;
            }
            dispatch.prevent_default();
            dispatch.stop_propagation();
            tracing::debug!(session = %id, "escape inside focus trap");
            on_close();
        })
    }

    fn schedule_initial_focus(&self, session: &OverlaySession) {
        let weak = self.doc.downgrade();
        let lifecycle = Rc::clone(&self.lifecycle);
        let phase = Rc::clone(&self.phase);
        let id = session.id();
        let root = session.root();
        let initial = session.initial_focus_target();
        self.doc.scheduler().request_frame(move || {
            if lifecycle.get() != Lifecycle::Live(id) {
                tracing::trace!(session = %id, "initial focus skipped; session gone");
                return;
            }
            let Some(doc) = weak.upgrade() else {
                return;
            };
            phase.set(TrapPhase::Trapping);
            let target = initial
                .filter(|node| doc.is_focusable(*node))
                .or_else(|| FocusableSetResolver::resolve(&doc, root).first().copied());
            match target {
                Some(node) if doc.focus(node) => {
                    tracing::debug!(session = %id, node = %node, "initial focus placed");
                }
                _ => {
                    doc.make_programmatically_focusable(root);
                    doc.focus(root);
                    tracing::debug!(session = %id, "no focusable content; focused overlay root");
                }
            }
        });
    }

    fn schedule_restore(&self, session: OverlaySession) {
        let weak = self.doc.downgrade();
        let lifecycle = Rc::clone(&self.lifecycle);
        let id = session.id();
        self.doc.scheduler().request_frame(move || {
            if lifecycle.get() != Lifecycle::Closed(id) {
                tracing::trace!(session = %id, "focus restore skipped; trap moved on");
                return;
            }
            let Some(doc) = weak.upgrade() else {
                return;
            };
            match session.restore_target(&doc) {
                Some(node) if doc.focus(node) => {
                    tracing::debug!(session = %id, node = %node, "focus restored");
                }
                Some(node) => {
                    tracing::trace!(session = %id, node = %node, "restore target refused focus");
                }
                None => tracing::trace!(session = %id, "restore target detached; skipped"),
            }
        });
    }
}

impl Drop for FocusTrapEngine {
    fn drop(&mut self) {
        if let Some(id) = self.session() {
            self.close(id);
        }
    }
}

impl std::fmt::Debug for FocusTrapEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FocusTrapEngine")
            .field("phase", &self.phase.get())
            .field("session", &self.session())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug_log::LogHandle;
    use crate::dom::ElementKind;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::layout::Rect;

    struct Fixture {
        doc: Document,
        trigger: NodeId,
        root: NodeId,
        closes: Rc<Cell<usize>>,
    }

    impl Fixture {
        fn new() -> Self {
            let doc = Document::new();
            let trigger = doc.create_element(ElementKind::Button, "trigger");
            doc.set_rect(trigger, Rect::new(0, 0, 8, 1));
            doc.append_child(doc.body(), trigger).unwrap();
            let root = doc.create_element(ElementKind::Container, "dialog");
            doc.set_rect(root, Rect::new(10, 5, 30, 8));
            doc.append_child(doc.body(), root).unwrap();
            assert!(doc.focus(trigger));
            Self {
                doc,
                trigger,
                root,
                closes: Rc::new(Cell::new(0)),
            }
        }

        fn button(&self, label: &str, x: u16) -> NodeId {
            let id = self.doc.create_element(ElementKind::Button, label);
            self.doc.set_rect(id, Rect::new(x, 6, 4, 1));
            self.doc.append_child(self.root, id).unwrap();
            id
        }

        fn on_close(&self) -> CloseCallback {
            let closes = Rc::clone(&self.closes);
            Rc::new(move || closes.set(closes.get() + 1))
        }

        fn key(&self, code: KeyCode) {
            self.doc.dispatch_key(KeyEvent::new(code, KeyModifiers::NONE));
        }
    }

    #[test]
    fn initial_focus_waits_one_frame() {
        let fx = Fixture::new();
        let ok = fx.button("ok", 12);
        let mut engine = FocusTrapEngine::new(&fx.doc);
        let mut session = OverlaySession::new(fx.root, None, None);
        engine.open(&mut session, fx.on_close());
        assert_eq!(session.prior_focus(), Some(fx.trigger));
        assert_eq!(engine.phase(), TrapPhase::Open);
        assert_eq!(fx.doc.active_element(), Some(fx.trigger));
        fx.doc.scheduler().run_frame();
        assert_eq!(engine.phase(), TrapPhase::Trapping);
        assert_eq!(fx.doc.active_element(), Some(ok));
    }

    #[test]
    fn explicit_initial_target_wins() {
        let fx = Fixture::new();
        let _first = fx.button("first", 12);
        let second = fx.button("second", 18);
        let mut engine = FocusTrapEngine::new(&fx.doc);
        let mut session = OverlaySession::new(fx.root, Some(second), None);
        engine.open(&mut session, fx.on_close());
        fx.doc.scheduler().run_frame();
        assert_eq!(fx.doc.active_element(), Some(second));
    }

    #[test]
    fn empty_trap_focuses_root_and_holds_tab() {
        let fx = Fixture::new();
        let mut engine = FocusTrapEngine::new(&fx.doc);
        let mut session = OverlaySession::new(fx.root, None, None);
        engine.open(&mut session, fx.on_close());
        fx.doc.scheduler().run_frame();
        assert_eq!(fx.doc.active_element(), Some(fx.root));
        fx.key(KeyCode::Tab);
        assert_eq!(fx.doc.active_element(), Some(fx.root));
        fx.key(KeyCode::BackTab);
        assert_eq!(fx.doc.active_element(), Some(fx.root));
    }

    #[test]
    fn tab_from_root_enters_content_loaded_later() {
        let fx = Fixture::new();
        let mut engine = FocusTrapEngine::new(&fx.doc);
        let mut session = OverlaySession::new(fx.root, None, None);
        engine.open(&mut session, fx.on_close());
        fx.doc.scheduler().run_frame();
        let a = fx.button("a", 12);
        let b = fx.button("b", 18);
        fx.key(KeyCode::BackTab);
        assert_eq!(fx.doc.active_element(), Some(b));
        fx.key(KeyCode::Tab);
        assert_eq!(fx.doc.active_element(), Some(a));
    }

    #[test]
    fn escape_requests_close_and_stops_propagation() {
        let fx = Fixture::new();
        let mut engine = FocusTrapEngine::new(&fx.doc);
        let mut session = OverlaySession::new(fx.root, None, None);
        engine.open(&mut session, fx.on_close());
        let outcome = fx
            .doc
            .dispatch_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
        assert!(outcome.default_prevented);
        assert!(outcome.propagation_stopped);
        assert_eq!(fx.closes.get(), 1);
        // the engine only reports; it stays open until the owner closes it
        assert!(engine.is_open());
    }

    #[test]
    fn close_removes_listeners_and_restores_next_frame() {
        let fx = Fixture::new();
        fx.button("ok", 12);
        let mut engine = FocusTrapEngine::new(&fx.doc);
        let mut session = OverlaySession::new(fx.root, None, None);
        engine.open(&mut session, fx.on_close());
        assert_eq!(fx.doc.listener_count(), 2);
        fx.doc.scheduler().run_frame();
        assert!(engine.close(session.id()));
        assert_eq!(fx.doc.listener_count(), 0);
        assert!(!engine.close(session.id()));
        fx.doc.scheduler().run_frame();
        assert_eq!(fx.doc.active_element(), Some(fx.trigger));
    }

    #[test]
    fn closing_before_first_frame_skips_initial_focus() {
        let fx = Fixture::new();
        fx.button("ok", 12);
        let mut engine = FocusTrapEngine::new(&fx.doc);
        let mut session = OverlaySession::new(fx.root, None, None);
        engine.open(&mut session, fx.on_close());
        engine.close(session.id());
        fx.doc.scheduler().run_frame();
        assert_eq!(fx.doc.active_element(), Some(fx.trigger));
        assert_eq!(engine.phase(), TrapPhase::Closed);
    }

    #[test]
    fn stale_restore_does_not_override_newer_session() {
        let fx = Fixture::new();
        let ok = fx.button("ok", 12);
        let mut engine = FocusTrapEngine::new(&fx.doc);
        let mut first = OverlaySession::new(fx.root, None, None);
        engine.open(&mut first, fx.on_close());
        fx.doc.scheduler().run_frame();
        engine.close(first.id());
        // reopened in the same turn, before the restore task fired
        let mut second = OverlaySession::new(fx.root, None, None);
        engine.open(&mut second, fx.on_close());
        fx.doc.scheduler().run_frame();
        assert_eq!(fx.doc.active_element(), Some(ok));
        assert_eq!(engine.session(), Some(second.id()));
    }

    #[test]
    fn detached_prior_focus_is_not_restored() {
        let fx = Fixture::new();
        let ok = fx.button("ok", 12);
        let mut engine = FocusTrapEngine::new(&fx.doc);
        let mut session = OverlaySession::new(fx.root, None, None);
        engine.open(&mut session, fx.on_close());
        fx.doc.scheduler().run_frame();
        fx.doc.remove(fx.trigger);
        engine.close(session.id());
        fx.doc.scheduler().run_frame();
        assert_eq!(fx.doc.active_element(), Some(ok));
    }

    #[test]
    fn return_target_skips_prior_focus_capture() {
        let fx = Fixture::new();
        let other = fx.doc.create_element(ElementKind::Button, "other");
        fx.doc.set_rect(other, Rect::new(0, 1, 5, 1));
        fx.doc.append_child(fx.doc.body(), other).unwrap();
        let mut engine = FocusTrapEngine::new(&fx.doc);
        let mut session = OverlaySession::new(fx.root, None, Some(other));
        engine.open(&mut session, fx.on_close());
        assert_eq!(session.prior_focus(), None);
        fx.doc.scheduler().run_frame();
        engine.close(session.id());
        fx.doc.scheduler().run_frame();
        assert_eq!(fx.doc.active_element(), Some(other));
    }

    #[test]
    fn initial_target_outside_root_is_honored_with_warning() {
        let fx = Fixture::new();
        fx.button("ok", 12);
        let outside = fx.doc.create_element(ElementKind::Button, "outside");
        fx.doc.set_rect(outside, Rect::new(0, 2, 7, 1));
        fx.doc.append_child(fx.doc.body(), outside).unwrap();
        let mut engine = FocusTrapEngine::new(&fx.doc);
        let mut session = OverlaySession::new(fx.root, Some(outside), None);

        let log = LogHandle::new(20);
        let sink = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.writer())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            engine.open(&mut session, fx.on_close());
        });
        assert!(
            log.tail(20)
                .iter()
                .any(|line| line.contains("initial focus target is outside the overlay root"))
        );

        fx.doc.scheduler().run_frame();
        assert_eq!(fx.doc.active_element(), Some(outside));
    }

    #[test]
    fn disabled_initial_target_falls_back_to_first_focusable() {
        let fx = Fixture::new();
        let first = fx.button("first", 12);
        let disabled = fx.button("disabled", 18);
        fx.doc.set_disabled(disabled, true);
        let mut engine = FocusTrapEngine::new(&fx.doc);
        let mut session = OverlaySession::new(fx.root, Some(disabled), None);
        engine.open(&mut session, fx.on_close());
        fx.doc.scheduler().run_frame();
        assert_eq!(fx.doc.active_element(), Some(first));
    }

    #[test]
    fn disabled_initial_target_without_content_focuses_root() {
        let fx = Fixture::new();
        let disabled = fx.button("disabled", 12);
        fx.doc.set_disabled(disabled, true);
        let mut engine = FocusTrapEngine::new(&fx.doc);
        let mut session = OverlaySession::new(fx.root, Some(disabled), None);
        engine.open(&mut session, fx.on_close());
        fx.doc.scheduler().run_frame();
        assert_eq!(fx.doc.active_element(), Some(fx.root));
        fx.key(KeyCode::Tab);
        assert_eq!(fx.doc.active_element(), Some(fx.root));
    }

    #[test]
    fn lower_trap_leaves_tab_to_the_stacked_one() {
        let fx = Fixture::new();
        let lower_ok = fx.button("lower", 12);
        let upper = fx.doc.create_element(ElementKind::Container, "upper");
        fx.doc.set_rect(upper, Rect::new(20, 8, 15, 4));
        fx.doc.append_child(fx.doc.body(), upper).unwrap();
        let mut upper_buttons = Vec::new();
        for (label, x) in [("yes", 21), ("no", 27)] {
            let id = fx.doc.create_element(ElementKind::Button, label);
            fx.doc.set_rect(id, Rect::new(x, 9, 4, 1));
            fx.doc.append_child(upper, id).unwrap();
            upper_buttons.push(id);
        }

        let mut lower = FocusTrapEngine::new(&fx.doc);
        let mut lower_session = OverlaySession::new(fx.root, None, None);
        lower.open(&mut lower_session, fx.on_close());
        fx.doc.scheduler().run_frame();
        assert_eq!(fx.doc.active_element(), Some(lower_ok));

        let mut stacked = FocusTrapEngine::new(&fx.doc);
        let mut stacked_session = OverlaySession::new(upper, None, None);
        stacked.open(&mut stacked_session, fx.on_close());
        fx.doc.scheduler().run_frame();
        assert_eq!(fx.doc.active_element(), Some(upper_buttons[0]));

        assert_eq!(decide_tab(&fx.doc, fx.root, true), TabDecision::Outside);
        fx.key(KeyCode::Tab);
        assert_eq!(fx.doc.active_element(), Some(upper_buttons[1]));
        fx.key(KeyCode::Tab);
        assert_eq!(fx.doc.active_element(), Some(upper_buttons[0]));
        fx.key(KeyCode::BackTab);
        assert_eq!(fx.doc.active_element(), Some(upper_buttons[1]));

        stacked.close(stacked_session.id());
        fx.doc.scheduler().run_frame();
        assert_eq!(fx.doc.active_element(), Some(lower_ok));
        assert_eq!(decide_tab(&fx.doc, fx.root, true), TabDecision::MoveTo(lower_ok));
    }
}
