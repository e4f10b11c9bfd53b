use std::fmt;

use crate::error::HostError;
use crate::props::{EventHandler, PropValue};

/// Kind of output node to create.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind<'a> {
    Element(&'a str),
    Text,
}

/// Mutation primitives of the output tree the engine renders into.
///
/// The engine only calls these from two places: node creation while a pass
/// is in progress (nodes are still detached), and the commit phase. A host
/// that fails a call gets the error back unchanged; the engine never retries.
pub trait HostAdapter {
    type Node: Clone + PartialEq + fmt::Debug;

    fn create_node(&mut self, kind: NodeKind<'_>) -> Result<Self::Node, HostError>;

    fn set_prop(
        &mut self,
        node: &Self::Node,
        name: &str,
        value: &PropValue,
    ) -> Result<(), HostError>;

    fn remove_prop(&mut self, node: &Self::Node, name: &str) -> Result<(), HostError>;

    fn add_listener(
        &mut self,
        node: &Self::Node,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError>;

    fn remove_listener(
        &mut self,
        node: &Self::Node,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError>;

    fn append_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<(), HostError>;

    fn remove_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<(), HostError>;

    /// The engine is done with `node` and everything under it: it was
    /// removed by a commit, or created for a pass that never committed. It
    /// will not be passed to the host again.
    fn release_node(&mut self, _node: &Self::Node) {}

    /// Whether `tag` names an element this host can create. Checked while
    /// reconciling, before any node is requested.
    fn supports_kind(&self, tag: &str) -> bool {
        is_valid_tag(tag)
    }
}

/// ASCII letter followed by letters, digits or `-`.
pub fn is_valid_tag(tag: &str) -> bool {
    let mut chars = tag.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}
