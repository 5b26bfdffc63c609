use thiserror::Error;

use crate::dom::NodeId;

/// Errors raised while editing the document tree.
///
/// The overlay engine never surfaces these to the host; they only come back
/// from structural calls such as [`crate::dom::Document::append_child`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DomError {
    #[error("node {0} does not exist in this document")]
    UnknownNode(NodeId),
    #[error("the document body cannot be re-parented")]
    BodyImmovable,
    #[error("cannot insert {child} under {parent}: {parent} is inside {child}")]
    Cycle { parent: NodeId, child: NodeId },
}
