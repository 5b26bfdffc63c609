use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::dom::{Document, NodeId};

/// Identity of one open/close cycle. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// State owned by one open overlay.
///
/// Node references here are lookups, not ownership. `prior_focus` and
/// `return_focus_target` may point at nodes that have since been removed;
/// [`OverlaySession::restore_target`] re-validates before handing one out.
#[derive(Debug, Clone)]
pub struct OverlaySession {
    id: SessionId,
    root: NodeId,
    opened_at: Instant,
    prior_focus: Option<NodeId>,
    initial_focus_target: Option<NodeId>,
    return_focus_target: Option<NodeId>,
}

impl OverlaySession {
    pub fn new(
        root: NodeId,
        initial_focus_target: Option<NodeId>,
        return_focus_target: Option<NodeId>,
    ) -> Self {
        Self {
            id: SessionId::next(),
            root,
            opened_at: Instant::now(),
            prior_focus: None,
            initial_focus_target,
            return_focus_target,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn opened_at(&self) -> Instant {
        self.opened_at
    }

    pub fn prior_focus(&self) -> Option<NodeId> {
        self.prior_focus
    }

    pub(crate) fn set_prior_focus(&mut self, node: Option<NodeId>) {
        self.prior_focus = node;
    }

    pub fn initial_focus_target(&self) -> Option<NodeId> {
        self.initial_focus_target
    }

    pub fn return_focus_target(&self) -> Option<NodeId> {
        self.return_focus_target
    }

    /// Where focus should go once this session closes: the explicit return
    /// target if one was given, otherwise the element focused before open.
    /// `None` if that node is no longer attached.
    pub fn restore_target(&self, doc: &Document) -> Option<NodeId> {
        self.return_focus_target
            .or(self.prior_focus)
            .filter(|node| doc.is_attached(*node))
    }
}
