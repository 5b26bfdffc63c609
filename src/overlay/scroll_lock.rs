use std::fmt;

use crate::dom::{Document, Overflow, ScrollStyle};

/// Counter and saved style shared by every overlay on one document.
#[derive(Debug, Default)]
pub(crate) struct ScrollLockState {
    count: usize,
    saved: Option<ScrollStyle>,
    next_token: u64,
}

/// Reference-counted lock on page scrolling.
///
/// The first `acquire` records the body's scroll style and hides overflow;
/// the last `release` puts back exactly what was recorded. Overlays may be
/// released in any order.
#[derive(Clone)]
pub struct ScrollLockManager {
    doc: Document,
}

impl ScrollLockManager {
    pub(crate) fn new(doc: Document) -> Self {
        Self { doc }
    }

    pub fn acquire(&self) -> ScrollLockToken {
        let mut state = self.doc.scroll_lock_state().borrow_mut();
        if state.count == 0 {
            let current = self.doc.scroll_style();
            state.saved = Some(current);
            self.doc.set_scroll_style(ScrollStyle {
                overflow: Overflow::Hidden,
                ..current
            });
            tracing::debug!(saved = ?current, "page scroll locked");
        }
        state.count += 1;
        let id = state.next_token;
        state.next_token = state.next_token.wrapping_add(1);
        tracing::trace!(token = id, holders = state.count, "scroll lock acquired");
        ScrollLockToken {
            id,
            manager: self.clone(),
            consumed: false,
        }
    }

    /// Release `token`. Returns `false` if it had already been released.
    pub fn release(&self, token: &mut ScrollLockToken) -> bool {
        token.release()
    }

    fn release_one(&self, id: u64) {
        let mut state = self.doc.scroll_lock_state().borrow_mut();
        state.count = state.count.saturating_sub(1);
        tracing::trace!(token = id, holders = state.count, "scroll lock released");
        if state.count == 0
            && let Some(saved) = state.saved.take()
        {
            self.doc.set_scroll_style(saved);
            tracing::debug!(restored = ?saved, "page scroll unlocked");
        }
    }

    pub fn is_locked(&self) -> bool {
        self.lock_count() > 0
    }

    pub fn lock_count(&self) -> usize {
        self.doc.scroll_lock_state().borrow().count
    }
}

impl fmt::Debug for ScrollLockManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollLockManager")
            .field("count", &self.lock_count())
            .finish()
    }
}

/// Proof of one outstanding scroll lock. Dropping it releases the lock.
#[must_use = "dropping a ScrollLockToken releases the lock immediately"]
pub struct ScrollLockToken {
    id: u64,
    manager: ScrollLockManager,
    consumed: bool,
}

impl ScrollLockToken {
    pub fn release(&mut self) -> bool {
        if self.consumed {
            return false;
        }
        self.consumed = true;
        self.manager.release_one(self.id);
        true
    }

    pub fn is_released(&self) -> bool {
        self.consumed
    }
}

impl Drop for ScrollLockToken {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ScrollLockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollLockToken")
            .field("id", &self.id)
            .field("released", &self.consumed)
            .finish()
    }
}
