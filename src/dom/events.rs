//! Document-level listener registration and dispatch.
//!
//! Listeners are registered through [`crate::dom::Document`] and handed back a
//! [`ListenerGuard`]. The guard is the only way to keep a listener alive:
//! removing or dropping it unregisters the listener, so a listener can never
//! outlive the object that installed it.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crossterm::event::KeyEvent;

use super::NodeId;

pub(crate) type KeyHandler = Rc<RefCell<dyn FnMut(&mut KeyDispatch)>>;
pub(crate) type PointerHandler = Rc<RefCell<dyn FnMut(&mut PointerDispatch)>>;

#[derive(Clone)]
pub(crate) enum Handler {
    Key(KeyHandler),
    Pointer(PointerHandler),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

#[derive(Default)]
pub(crate) struct ListenerTable {
    next_id: u64,
    entries: Vec<(ListenerId, Handler)>,
}

impl ListenerTable {
    pub(crate) fn insert(&mut self, handler: Handler) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.entries.push((id, handler));
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub(crate) fn contains(&self, id: ListenerId) -> bool {
        self.entries.iter().any(|(entry, _)| *entry == id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn key_handlers_newest_first(&self) -> Vec<(ListenerId, KeyHandler)> {
        self.entries
            .iter()
            .rev()
            .filter_map(|(id, handler)| match handler {
                Handler::Key(h) => Some((*id, Rc::clone(h))),
                Handler::Pointer(_) => None,
            })
            .collect()
    }

    fn pointer_handlers_newest_first(&self) -> Vec<(ListenerId, PointerHandler)> {
        self.entries
            .iter()
            .rev()
            .filter_map(|(id, handler)| match handler {
                Handler::Pointer(h) => Some((*id, Rc::clone(h))),
                Handler::Key(_) => None,
            })
            .collect()
    }
}

/// Shared by both dispatch payloads so one loop can drive either kind.
trait Propagation {
    fn propagation_stopped(&self) -> bool;
}

/// A key press travelling through the document listeners.
#[derive(Debug, Clone)]
pub struct KeyDispatch {
    key: KeyEvent,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl KeyDispatch {
    pub(crate) fn new(key: KeyEvent) -> Self {
        Self {
            key,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn key(&self) -> &KeyEvent {
        &self.key
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

impl Propagation for KeyDispatch {
    fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// A pointer-down travelling through the document listeners.
#[derive(Debug, Clone)]
pub struct PointerDispatch {
    target: NodeId,
    column: u16,
    row: u16,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl PointerDispatch {
    pub(crate) fn new(target: NodeId, column: u16, row: u16) -> Self {
        Self {
            target,
            column,
            row,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    /// Topmost node under the pointer.
    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn position(&self) -> (u16, u16) {
        (self.column, self.row)
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

impl Propagation for PointerDispatch {
    fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Summary of a dispatch, returned to whoever fed the event in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub default_prevented: bool,
    pub propagation_stopped: bool,
    /// Pointer target, `None` for key events.
    pub target: Option<NodeId>,
    pub listeners_run: usize,
}

fn run_listeners<D: Propagation + ?Sized>(
    table: &RefCell<ListenerTable>,
    handlers: Vec<(ListenerId, Rc<RefCell<dyn FnMut(&mut D)>>)>,
    dispatch: &mut D,
) -> usize {
    let mut ran = 0;
    for (id, handler) in handlers {
        // A listener removed by an earlier listener in this same dispatch must not fire.
        if !table.borrow().contains(id) {
            continue;
        }
        let Ok(mut callback) = handler.try_borrow_mut() else {
            tracing::trace!(listener = ?id, "skipping re-entrant listener");
            continue;
        };
        (&mut *callback)(dispatch);
        ran += 1;
        if Propagation::propagation_stopped(dispatch) {
            break;
        }
    }
    ran
}

pub(crate) fn run_key_listeners(table: &RefCell<ListenerTable>, dispatch: &mut KeyDispatch) -> usize {
    let handlers = table.borrow().key_handlers_newest_first();
    run_listeners(table, handlers, dispatch)
}

pub(crate) fn run_pointer_listeners(
    table: &RefCell<ListenerTable>,
    dispatch: &mut PointerDispatch,
) -> usize {
    let handlers = table.borrow().pointer_handlers_newest_first();
    run_listeners(table, handlers, dispatch)
}

/// Scoped registration of one document-level listener.
#[must_use = "dropping a ListenerGuard unregisters its listener"]
pub struct ListenerGuard {
    id: ListenerId,
    table: Weak<RefCell<ListenerTable>>,
}

impl ListenerGuard {
    pub(crate) fn new(id: ListenerId, table: &Rc<RefCell<ListenerTable>>) -> Self {
        Self {
            id,
            table: Rc::downgrade(table),
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn is_registered(&self) -> bool {
        self.table
            .upgrade()
            .is_some_and(|table| table.borrow().contains(self.id))
    }

    /// Unregister now instead of waiting for the guard to fall out of scope.
    pub fn remove(self) {
        drop(self);
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        let Some(table) = self.table.upgrade() else {
            return;
        };
        match table.try_borrow_mut() {
            Ok(mut table) => {
                table.remove(self.id);
            }
            Err(_) => tracing::warn!(listener = ?self.id, "listener table busy; listener leaked"),
        }
    }
}

impl std::fmt::Debug for ListenerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerGuard")
            .field("id", &self.id)
            .field("registered", &self.is_registered())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};
    use std::cell::Cell;

    fn key_handler(f: impl FnMut(&mut KeyDispatch) + 'static) -> Handler {
        let handler: KeyHandler = Rc::new(RefCell::new(f));
        Handler::Key(handler)
    }

    #[test]
    fn newest_listener_runs_first_and_can_stop_propagation() {
        let table = Rc::new(RefCell::new(ListenerTable::default()));
        let order = Rc::new(RefCell::new(Vec::new()));
        let o1 = Rc::clone(&order);
        let o2 = Rc::clone(&order);
        table
            .borrow_mut()
            .insert(key_handler(move |_| o1.borrow_mut().push("old")));
        table.borrow_mut().insert(key_handler(move |d| {
            o2.borrow_mut().push("new");
            d.stop_propagation();
        }));
        let mut dispatch = KeyDispatch::new(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
        let ran = run_key_listeners(&table, &mut dispatch);
        assert_eq!(ran, 1);
        assert_eq!(*order.borrow(), vec!["new"]);
    }

    #[test]
    fn guard_drop_unregisters() {
        let table = Rc::new(RefCell::new(ListenerTable::default()));
        let id = table.borrow_mut().insert(key_handler(|_| {}));
        let guard = ListenerGuard::new(id, &table);
        assert!(guard.is_registered());
        guard.remove();
        assert_eq!(table.borrow().len(), 0);
    }

    #[test]
    fn listener_removed_mid_dispatch_does_not_fire() {
        let table = Rc::new(RefCell::new(ListenerTable::default()));
        let fired = Rc::new(Cell::new(false));
        let fired_in = Rc::clone(&fired);
        let old_id = table
            .borrow_mut()
            .insert(key_handler(move |_| fired_in.set(true)));
        let victim = Rc::new(RefCell::new(Some(ListenerGuard::new(old_id, &table))));
        let victim_in = Rc::clone(&victim);
        table.borrow_mut().insert(key_handler(move |_| {
            victim_in.borrow_mut().take();
        }));
        let mut dispatch = KeyDispatch::new(KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE));
        run_key_listeners(&table, &mut dispatch);
        assert!(!fired.get());
        assert_eq!(table.borrow().len(), 1);
    }
}
