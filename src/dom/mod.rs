//! Retained element tree that overlays and toolbars render from.
//!
//! `Document` is a cheap, cloneable handle. Node handles ([`NodeId`]) are
//! plain lookups: a node that has been removed from the tree keeps its id
//! and its properties, it is simply no longer attached to `body`. Anything
//! that holds a `NodeId` across frames must re-check [`Document::is_attached`]
//! before acting on it.

mod events;

pub use events::{DispatchOutcome, KeyDispatch, ListenerGuard, ListenerId, PointerDispatch};

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crossterm::event::{Event, KeyEvent, KeyEventKind, MouseEventKind};
use ratatui::layout::{Position, Rect};

use crate::error::DomError;
use crate::keybindings::{Action, KeyBindings};
use crate::overlay::focusable::{FocusableSetResolver, step_in_order};
use crate::overlay::scroll_lock::{ScrollLockManager, ScrollLockState};
use crate::scheduler::FrameScheduler;
use events::{Handler, KeyHandler, ListenerTable, PointerHandler};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    Body,
    Container,
    Text,
    Button,
    Link { href: Option<String> },
    Input(InputKind),
    Select,
    TextArea,
}

impl ElementKind {
    /// Kinds that take keyboard focus without an explicit tab index.
    pub fn is_interactive(&self) -> bool {
        match self {
            ElementKind::Button | ElementKind::Select | ElementKind::TextArea => true,
            ElementKind::Link { href } => href.is_some(),
            ElementKind::Input(kind) => *kind != InputKind::Hidden,
            ElementKind::Body | ElementKind::Container | ElementKind::Text => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    Checkbox,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overflow {
    #[default]
    Auto,
    Hidden,
    Scroll,
}

/// Scroll-related style of the page body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollStyle {
    pub overflow: Overflow,
    pub padding_right: u16,
}

impl ScrollStyle {
    pub fn scrollable(&self) -> bool {
        self.overflow != Overflow::Hidden
    }
}

#[derive(Debug, Clone)]
struct Element {
    kind: ElementKind,
    label: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    disabled: bool,
    tab_index: Option<i32>,
    editable: bool,
    rect: Rect,
}

impl Element {
    fn new(kind: ElementKind, label: String) -> Self {
        Self {
            kind,
            label,
            parent: None,
            children: Vec::new(),
            disabled: false,
            tab_index: None,
            editable: false,
            rect: Rect::default(),
        }
    }
}

#[derive(Debug)]
struct Tree {
    nodes: Vec<Element>,
    body: NodeId,
    active: Option<NodeId>,
    scroll_style: ScrollStyle,
}

impl Tree {
    fn new() -> Self {
        Self {
            nodes: vec![Element::new(ElementKind::Body, "body".to_string())],
            body: NodeId(0),
            active: None,
            scroll_style: ScrollStyle::default(),
        }
    }

    fn get(&self, id: NodeId) -> Option<&Element> {
        self.nodes.get(id.0)
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        self.nodes.get_mut(id.0)
    }

    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        if self.get(node).is_none() {
            return false;
        }
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self.get(id).and_then(|el| el.parent);
        }
        false
    }

    fn is_attached(&self, node: NodeId) -> bool {
        self.contains(self.body, node)
    }

    fn preorder(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let Some(el) = self.get(root) else {
            return out;
        };
        let mut stack: Vec<NodeId> = el.children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(el) = self.get(id) {
                stack.extend(el.children.iter().rev().copied());
            }
        }
        out
    }

    fn is_focusable(&self, id: NodeId) -> bool {
        let Some(el) = self.get(id) else {
            return false;
        };
        id != self.body
            && self.is_attached(id)
            && !el.disabled
            && (el.kind.is_interactive() || el.editable || el.tab_index.is_some())
    }

    fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.get(node).and_then(|el| el.parent) else {
            return;
        };
        if let Some(parent) = self.get_mut(parent) {
            parent.children.retain(|child| *child != node);
        }
        if let Some(el) = self.get_mut(node) {
            el.parent = None;
        }
    }
}

struct DocumentInner {
    tree: RefCell<Tree>,
    listeners: Rc<RefCell<ListenerTable>>,
    scroll_lock: RefCell<ScrollLockState>,
    scheduler: FrameScheduler,
    bindings: KeyBindings,
}

/// Handle to the element tree, its focus state, and its document-level
/// listeners.
#[derive(Clone)]
pub struct Document {
    inner: Rc<DocumentInner>,
}

/// Non-owning document handle for closures stored inside the document.
#[derive(Clone)]
pub struct WeakDocument {
    inner: Weak<DocumentInner>,
}

impl WeakDocument {
    pub fn upgrade(&self) -> Option<Document> {
        self.inner.upgrade().map(|inner| Document { inner })
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self::with_bindings(KeyBindings::default())
    }

    pub fn with_bindings(bindings: KeyBindings) -> Self {
        Self {
            inner: Rc::new(DocumentInner {
                tree: RefCell::new(Tree::new()),
                listeners: Rc::new(RefCell::new(ListenerTable::default())),
                scroll_lock: RefCell::new(ScrollLockState::default()),
                scheduler: FrameScheduler::new(),
                bindings,
            }),
        }
    }

    pub fn downgrade(&self) -> WeakDocument {
        WeakDocument {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn body(&self) -> NodeId {
        self.inner.tree.borrow().body
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.inner.bindings
    }

    pub fn scheduler(&self) -> FrameScheduler {
        self.inner.scheduler.clone()
    }

    pub fn scroll_lock(&self) -> ScrollLockManager {
        ScrollLockManager::new(self.clone())
    }

    pub(crate) fn scroll_lock_state(&self) -> &RefCell<ScrollLockState> {
        &self.inner.scroll_lock
    }

    /// Create a detached element.
    pub fn create_element(&self, kind: ElementKind, label: impl Into<String>) -> NodeId {
        let mut tree = self.inner.tree.borrow_mut();
        let id = NodeId(tree.nodes.len());
        tree.nodes.push(Element::new(kind, label.into()));
        id
    }

    /// Append `child` as the last child of `parent`, moving it if it already
    /// has a parent.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let mut tree = self.inner.tree.borrow_mut();
        if tree.get(parent).is_none() {
            return Err(DomError::UnknownNode(parent));
        }
        if tree.get(child).is_none() {
            return Err(DomError::UnknownNode(child));
        }
        if child == tree.body {
            return Err(DomError::BodyImmovable);
        }
        if tree.contains(child, parent) {
            return Err(DomError::Cycle { parent, child });
        }
        tree.detach(child);
        if let Some(el) = tree.get_mut(child) {
            el.parent = Some(parent);
        }
        if let Some(el) = tree.get_mut(parent) {
            el.children.push(child);
        }
        Ok(())
    }

    /// Detach `node` and its subtree. Focus inside the subtree is dropped.
    pub fn remove(&self, node: NodeId) {
        let mut tree = self.inner.tree.borrow_mut();
        if node == tree.body {
            return;
        }
        if let Some(active) = tree.active
            && tree.contains(node, active)
        {
            tree.active = None;
        }
        tree.detach(node);
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.tree.borrow().get(node).and_then(|el| el.parent)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner
            .tree
            .borrow()
            .get(node)
            .map(|el| el.children.clone())
            .unwrap_or_default()
    }

    /// Inclusive containment: a node contains itself.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.inner.tree.borrow().contains(ancestor, node)
    }

    pub fn is_attached(&self, node: NodeId) -> bool {
        self.inner.tree.borrow().is_attached(node)
    }

    /// Depth-first, source-order descendants of `root` (excluding `root`).
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        self.inner.tree.borrow().preorder(root)
    }

    pub fn node_count(&self) -> usize {
        self.inner.tree.borrow().nodes.len()
    }

    pub fn kind(&self, node: NodeId) -> Option<ElementKind> {
        self.inner.tree.borrow().get(node).map(|el| el.kind.clone())
    }

    pub fn label(&self, node: NodeId) -> Option<String> {
        self.inner.tree.borrow().get(node).map(|el| el.label.clone())
    }

    pub fn set_label(&self, node: NodeId, label: impl Into<String>) {
        if let Some(el) = self.inner.tree.borrow_mut().get_mut(node) {
            el.label = label.into();
        }
    }

    pub fn rect(&self, node: NodeId) -> Rect {
        self.inner
            .tree
            .borrow()
            .get(node)
            .map(|el| el.rect)
            .unwrap_or_default()
    }

    pub fn set_rect(&self, node: NodeId, rect: Rect) {
        if let Some(el) = self.inner.tree.borrow_mut().get_mut(node) {
            el.rect = rect;
        }
    }

    pub fn is_disabled(&self, node: NodeId) -> bool {
        self.inner
            .tree
            .borrow()
            .get(node)
            .is_some_and(|el| el.disabled)
    }

    pub fn set_disabled(&self, node: NodeId, disabled: bool) {
        if let Some(el) = self.inner.tree.borrow_mut().get_mut(node) {
            el.disabled = disabled;
        }
    }

    pub fn tab_index(&self, node: NodeId) -> Option<i32> {
        self.inner.tree.borrow().get(node).and_then(|el| el.tab_index)
    }

    pub fn set_tab_index(&self, node: NodeId, tab_index: Option<i32>) {
        if let Some(el) = self.inner.tree.borrow_mut().get_mut(node) {
            el.tab_index = tab_index;
        }
    }

    pub fn is_editable(&self, node: NodeId) -> bool {
        self.inner
            .tree
            .borrow()
            .get(node)
            .is_some_and(|el| el.editable)
    }

    pub fn set_editable(&self, node: NodeId, editable: bool) {
        if let Some(el) = self.inner.tree.borrow_mut().get_mut(node) {
            el.editable = editable;
        }
    }

    /// Whether [`Document::focus`] would accept `node` right now.
    pub fn is_focusable(&self, node: NodeId) -> bool {
        self.inner.tree.borrow().is_focusable(node)
    }

    /// Give `node` a `-1` tab index if it cannot otherwise take focus, so it
    /// accepts programmatic focus without joining sequential navigation.
    pub fn make_programmatically_focusable(&self, node: NodeId) {
        let mut tree = self.inner.tree.borrow_mut();
        let needs_index = tree
            .get(node)
            .is_some_and(|el| !el.kind.is_interactive() && !el.editable && el.tab_index.is_none());
        if needs_index && let Some(el) = tree.get_mut(node) {
            el.tab_index = Some(-1);
        }
    }

    /// The focused element, or `None` when focus rests on the document itself.
    pub fn active_element(&self) -> Option<NodeId> {
        let tree = self.inner.tree.borrow();
        tree.active.filter(|id| tree.is_attached(*id))
    }

    /// Move focus to `node`. Returns `false` without side effects if the node
    /// cannot take focus.
    pub fn focus(&self, node: NodeId) -> bool {
        let mut tree = self.inner.tree.borrow_mut();
        if !tree.is_focusable(node) {
            tracing::trace!(node = %node, "focus rejected");
            return false;
        }
        if tree.active != Some(node) {
            tracing::trace!(node = %node, "focus moved");
        }
        tree.active = Some(node);
        true
    }

    pub fn blur(&self) {
        self.inner.tree.borrow_mut().active = None;
    }

    pub fn scroll_style(&self) -> ScrollStyle {
        self.inner.tree.borrow().scroll_style
    }

    pub fn set_scroll_style(&self, style: ScrollStyle) {
        self.inner.tree.borrow_mut().scroll_style = style;
    }

    /// Topmost attached node under the cell, falling back to `body`.
    ///
    /// Later nodes in document order paint over earlier ones, so the last
    /// match wins. Zero-sized nodes are never hit.
    pub fn hit_test(&self, column: u16, row: u16) -> NodeId {
        let tree = self.inner.tree.borrow();
        let point = Position::new(column, row);
        tree.preorder(tree.body)
            .into_iter()
            .rev()
            .find(|id| {
                tree.get(*id).is_some_and(|el| {
                    el.rect.width > 0 && el.rect.height > 0 && el.rect.contains(point)
                })
            })
            .unwrap_or(tree.body)
    }

    pub fn add_key_listener(&self, listener: impl FnMut(&mut KeyDispatch) + 'static) -> ListenerGuard {
        let handler: KeyHandler = Rc::new(RefCell::new(listener));
        let id = self.inner.listeners.borrow_mut().insert(Handler::Key(handler));
        ListenerGuard::new(id, &self.inner.listeners)
    }

    pub fn add_pointer_listener(
        &self,
        listener: impl FnMut(&mut PointerDispatch) + 'static,
    ) -> ListenerGuard {
        let handler: PointerHandler = Rc::new(RefCell::new(listener));
        let id = self
            .inner
            .listeners
            .borrow_mut()
            .insert(Handler::Pointer(handler));
        ListenerGuard::new(id, &self.inner.listeners)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Feed a raw terminal event. Key presses and mouse-down events are
    /// dispatched; everything else is ignored.
    pub fn dispatch_event(&self, event: &Event) -> DispatchOutcome {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => self.dispatch_key(*key),
            Event::Mouse(mouse) if matches!(mouse.kind, MouseEventKind::Down(_)) => {
                self.dispatch_pointer_down(mouse.column, mouse.row)
            }
            _ => DispatchOutcome::default(),
        }
    }

    pub fn dispatch_key(&self, key: KeyEvent) -> DispatchOutcome {
        let mut dispatch = KeyDispatch::new(key);
        let listeners_run = events::run_key_listeners(&self.inner.listeners, &mut dispatch);
        if !dispatch.default_prevented() {
            self.default_key_action(&key);
        }
        DispatchOutcome {
            default_prevented: dispatch.default_prevented(),
            propagation_stopped: dispatch.propagation_stopped(),
            target: None,
            listeners_run,
        }
    }

    pub fn dispatch_pointer_down(&self, column: u16, row: u16) -> DispatchOutcome {
        let target = self.hit_test(column, row);
        let mut dispatch = PointerDispatch::new(target, column, row);
        let listeners_run = events::run_pointer_listeners(&self.inner.listeners, &mut dispatch);
        if !dispatch.default_prevented() && self.is_focusable(target) {
            self.focus(target);
        }
        DispatchOutcome {
            default_prevented: dispatch.default_prevented(),
            propagation_stopped: dispatch.propagation_stopped(),
            target: Some(target),
            listeners_run,
        }
    }

    fn default_key_action(&self, key: &KeyEvent) {
        let forward = if self.inner.bindings.matches(Action::FocusNext, key) {
            true
        } else if self.inner.bindings.matches(Action::FocusPrev, key) {
            false
        } else {
            return;
        };
        let order = FocusableSetResolver::resolve(self, self.body());
        if let Some(next) = step_in_order(&order, self.active_element(), forward) {
            self.focus(next);
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.inner.tree.borrow();
        f.debug_struct("Document")
            .field("nodes", &tree.nodes.len())
            .field("active", &tree.active)
            .field("scroll_style", &tree.scroll_style)
            .field("listeners", &self.inner.listeners.borrow().len())
            .finish()
    }
}
