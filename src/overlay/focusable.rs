use crate::dom::{Document, NodeId};

/// Computes which elements under a root take part in sequential keyboard
/// navigation.
///
/// Results are never cached. Overlay content can change while the overlay
/// is open (rows arrive from the backend after the dialog is shown), so every
/// Tab press asks again.
pub struct FocusableSetResolver;

impl FocusableSetResolver {
    /// Eligible descendants of `root` in depth-first source order.
    ///
    /// Positive tab indices do not reorder the result; inside a trap the
    /// visual order is the one users expect.
    pub fn resolve(doc: &Document, root: NodeId) -> Vec<NodeId> {
        if !doc.is_attached(root) {
            return Vec::new();
        }
        doc.descendants(root)
            .into_iter()
            .filter(|id| Self::is_eligible(doc, *id))
            .collect()
    }

    pub fn is_eligible(doc: &Document, node: NodeId) -> bool {
        let Some(kind) = doc.kind(node) else {
            return false;
        };
        let tab_index = doc.tab_index(node);
        let tabbable = kind.is_interactive()
            || doc.is_editable(node)
            || tab_index.is_some_and(|index| index >= 0);
        if !tabbable || doc.is_disabled(node) || tab_index.is_some_and(|index| index < 0) {
            return false;
        }
        // zero-size elements are treated as hidden
        let rect = doc.rect(node);
        rect.width > 0 && rect.height > 0
    }
}

/// Step one position through `order`, wrapping at both ends.
///
/// With nothing focused (or focus outside `order`) a forward step lands on
/// the first entry and a backward step on the last.
pub fn step_in_order(order: &[NodeId], current: Option<NodeId>, forward: bool) -> Option<NodeId> {
    if order.is_empty() {
        return None;
    }
    let Some(idx) = current.and_then(|id| order.iter().position(|item| *item == id)) else {
        return if forward { order.first() } else { order.last() }.copied();
    };
    let step = if forward { 1isize } else { -1isize };
    let next = (idx as isize + step).rem_euclid(order.len() as isize) as usize;
    Some(order[next])
}
