use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::dom::{Document, KeyDispatch, ListenerGuard, NodeId, PointerDispatch};
use crate::keybindings::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissReason {
    OutsidePointer,
    EscapeKey,
}

pub type DismissCallback = Rc<dyn Fn(DismissReason)>;

/// Which interactions count as a dismissal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutsideOptions {
    pub pointer: bool,
    pub escape: bool,
    /// Swallow pointer-downs outside the root so nothing beneath a modal can
    /// take focus or activate. Pointer-downs inside the root stop there and
    /// never reach overlays stacked below.
    pub block_outside_pointer: bool,
    /// Nodes outside the root that may be clicked without dismissing, such as
    /// the toolbar button that toggles a dropdown.
    pub exempt: Vec<NodeId>,
}

impl Default for OutsideOptions {
    fn default() -> Self {
        Self {
            pointer: true,
            escape: true,
            block_outside_pointer: false,
            exempt: Vec::new(),
        }
    }
}

impl OutsideOptions {
    pub fn pointer_only() -> Self {
        Self {
            escape: false,
            ..Self::default()
        }
    }

    /// Pointer guard for a dialog. Outside clicks are always blocked and only
    /// dismiss when `dismiss_on_pointer` is set; Escape is left to the trap.
    pub fn modal(dismiss_on_pointer: bool) -> Self {
        Self {
            pointer: dismiss_on_pointer,
            escape: false,
            block_outside_pointer: true,
            exempt: Vec::new(),
        }
    }

    pub fn with_exempt(mut self, node: NodeId) -> Self {
        self.exempt.push(node);
        self
    }
}

pub struct OutsideInteractionController;

impl OutsideInteractionController {
    /// Watch for dismissal of `root`. The returned subscription owns the
    /// listeners; dropping it stops watching.
    pub fn subscribe(
        doc: &Document,
        root: NodeId,
        options: OutsideOptions,
        on_dismiss: DismissCallback,
    ) -> OutsideInteractionSubscription {
        let active = Rc::new(Cell::new(true));
        let dismiss_on_pointer = options.pointer;
        let block = options.block_outside_pointer;
        let pointer = (dismiss_on_pointer || block).then(|| {
            let weak = doc.downgrade();
            let active = Rc::clone(&active);
            let on_dismiss = Rc::clone(&on_dismiss);
            let exempt = options.exempt.clone();
            doc.add_pointer_listener(move |dispatch: &mut PointerDispatch| {
                if !active.get() {
                    return;
                }
                let Some(doc) = weak.upgrade() else {
                    return;
                };
                if !doc.is_attached(root) {
                    return;
                }
                let target = dispatch.target();
                if doc.contains(root, target) {
                    if block {
                        dispatch.stop_propagation();
                    }
                    return;
                }
                if exempt.iter().any(|node| doc.contains(*node, target)) {
                    return;
                }
                if block {
                    dispatch.prevent_default();
                }
                if dismiss_on_pointer {
                    tracing::debug!(root = %root, target = %target, "pointer down outside overlay");
                    on_dismiss(DismissReason::OutsidePointer);
                } else {
                    tracing::trace!(root = %root, target = %target, "pointer down outside modal blocked");
                }
            })
        });
        let escape = options.escape.then(|| {
            let weak = doc.downgrade();
            let active = Rc::clone(&active);
            let on_dismiss = Rc::clone(&on_dismiss);
            doc.add_key_listener(move |dispatch: &mut KeyDispatch| {
                if !active.get() {
                    return;
                }
                let Some(doc) = weak.upgrade() else {
                    return;
                };
                if !doc.is_attached(root) || !doc.bindings().matches(Action::Dismiss, dispatch.key()) {
                    return;
                }
                dispatch.prevent_default();
                dispatch.stop_propagation();
                tracing::debug!(root = %root, "escape dismisses overlay");
                on_dismiss(DismissReason::EscapeKey);
            })
        });
        OutsideInteractionSubscription {
            root,
            pointer,
            escape,
            active,
        }
    }
}

/// Live registration returned by [`OutsideInteractionController::subscribe`].
#[must_use = "dropping the subscription stops watching immediately"]
pub struct OutsideInteractionSubscription {
    root: NodeId,
    pointer: Option<ListenerGuard>,
    escape: Option<ListenerGuard>,
    active: Rc<Cell<bool>>,
}

impl OutsideInteractionSubscription {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Unregister both listeners. Safe to call more than once.
    pub fn teardown(&mut self) {
        if !self.active.replace(false) {
            return;
        }
        self.pointer.take();
        self.escape.take();
        tracing::trace!(root = %self.root, "outside interaction subscription torn down");
    }
}

impl Drop for OutsideInteractionSubscription {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for OutsideInteractionSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutsideInteractionSubscription")
            .field("root", &self.root)
            .field("active", &self.active.get())
            .finish()
    }
}
