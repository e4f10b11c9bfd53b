//! In-memory output tree.
//!
//! `Document` is a small DOM: element and text nodes in a slot map, string
//! keyed attributes, listeners per event name. It implements [`HostAdapter`]
//! so the engine can render into it, and it can print itself as markup for
//! tests and headless runs.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use ember_core::{Event, EventHandler, HostAdapter, HostError, NODE_VALUE, NodeKind, PropValue};
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    pub struct NodeId;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeData {
    Element { tag: String },
    Text,
}

pub struct DomNode {
    pub data: NodeData,
    attrs: BTreeMap<String, PropValue>,
    listeners: Vec<(String, EventHandler)>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl DomNode {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            attrs: BTreeMap::new(),
            listeners: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

#[derive(Default)]
pub struct Document {
    nodes: SlotMap<NodeId, DomNode>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a detached element to render into. Unlike nodes created by
    /// the engine, the tag is not validated.
    pub fn create_container(&mut self, tag: &str) -> NodeId {
        self.nodes.insert(DomNode::new(NodeData::Element {
            tag: tag.to_string(),
        }))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&DomNode> {
        self.nodes.get(id)
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes.get(id)?.data {
            NodeData::Element { tag } => Some(tag),
            NodeData::Text => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&PropValue> {
        self.nodes.get(id)?.attrs.get(name)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map_or(&[], |n| &n.children)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id)?.parent
    }

    pub fn listener_count(&self, id: NodeId, event: &str) -> usize {
        self.nodes.get(id).map_or(0, |n| {
            n.listeners.iter().filter(|(name, _)| name == event).count()
        })
    }

    /// Concatenated text of every text node under `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        match node.data {
            NodeData::Text => {
                if let Some(value) = node.attrs.get(NODE_VALUE) {
                    let _ = write!(out, "{value}");
                }
            }
            NodeData::Element { .. } => {
                for child in &node.children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// First element with `tag` under `root`, depth first, `root` included.
    pub fn find_by_tag(&self, root: NodeId, tag: &str) -> Option<NodeId> {
        if self.tag(root) == Some(tag) {
            return Some(root);
        }
        self.children(root)
            .iter()
            .find_map(|child| self.find_by_tag(*child, tag))
    }

    /// Calls every listener registered on `id` for `event.name`. Returns how
    /// many ran. Events do not bubble.
    pub fn dispatch(&self, id: NodeId, event: &Event) -> usize {
        let handlers: Vec<EventHandler> = self
            .nodes
            .get(id)
            .map(|n| {
                n.listeners
                    .iter()
                    .filter(|(name, _)| *name == event.name)
                    .map(|(_, h)| h.clone())
                    .collect()
            })
            .unwrap_or_default();
        if handlers.is_empty() {
            log::debug!("no `{}` listener on {id:?}", event.name);
        }
        for handler in &handlers {
            handler.call(event);
        }
        handlers.len()
    }

    /// `id` and its subtree as markup. Listeners are not printed.
    pub fn to_markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_markup(id, &mut out);
        out
    }

    /// Markup of the children of `id`, without `id` itself.
    pub fn inner_markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.write_markup(*child, &mut out);
        }
        out
    }

    fn write_markup(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        match &node.data {
            NodeData::Text => {
                if let Some(value) = node.attrs.get(NODE_VALUE) {
                    escape_into(&value.to_string(), out);
                }
            }
            NodeData::Element { tag } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in &node.attrs {
                    let _ = write!(out, " {name}=\"");
                    escape_into(&value.to_string(), out);
                    out.push('"');
                }
                out.push('>');
                for child in &node.children {
                    self.write_markup(*child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut DomNode, HostError> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| HostError::UnknownNode(format!("{id:?}")))
    }

    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.nodes.get_mut(child).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(parent) = self.nodes.get_mut(parent) {
            parent.children.retain(|c| *c != child);
        }
    }
}

fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

impl HostAdapter for Document {
    type Node = NodeId;

    fn create_node(&mut self, kind: NodeKind<'_>) -> Result<NodeId, HostError> {
        let data = match kind {
            NodeKind::Element(tag) => {
                if !self.supports_kind(tag) {
                    return Err(HostError::UnsupportedKind(tag.to_string()));
                }
                NodeData::Element {
                    tag: tag.to_string(),
                }
            }
            NodeKind::Text => NodeData::Text,
        };
        Ok(self.nodes.insert(DomNode::new(data)))
    }

    fn set_prop(&mut self, node: &NodeId, name: &str, value: &PropValue) -> Result<(), HostError> {
        self.get_mut(*node)?
            .attrs
            .insert(name.to_string(), value.clone());
        Ok(())
    }

    fn remove_prop(&mut self, node: &NodeId, name: &str) -> Result<(), HostError> {
        self.get_mut(*node)?.attrs.remove(name);
        Ok(())
    }

    fn add_listener(
        &mut self,
        node: &NodeId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError> {
        self.get_mut(*node)?
            .listeners
            .push((event.to_string(), handler.clone()));
        Ok(())
    }

    fn remove_listener(
        &mut self,
        node: &NodeId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError> {
        let listeners = &mut self.get_mut(*node)?.listeners;
        let before = listeners.len();
        listeners.retain(|(name, h)| !(name == event && h == handler));
        if listeners.len() == before {
            log::warn!("remove_listener: no `{event}` handler to remove on {node:?}");
        }
        Ok(())
    }

    fn append_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), HostError> {
        if !self.nodes.contains_key(*child) {
            return Err(HostError::UnknownNode(format!("{child:?}")));
        }
        if self.get_mut(*parent)?.data == NodeData::Text {
            return Err(HostError::Rejected(format!(
                "text node {parent:?} cannot have children"
            )));
        }
        // a node lives in one place; appending moves it
        self.detach(*child);
        self.get_mut(*parent)?.children.push(*child);
        self.get_mut(*child)?.parent = Some(*parent);
        Ok(())
    }

    fn remove_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), HostError> {
        let node = self.get_mut(*parent)?;
        let Some(pos) = node.children.iter().position(|c| c == child) else {
            return Err(HostError::NotAChild {
                parent: format!("{parent:?}"),
                child: format!("{child:?}"),
            });
        };
        node.children.remove(pos);
        self.get_mut(*child)?.parent = None;
        Ok(())
    }

    /// Frees `node` and its subtree. Unknown nodes are ignored.
    fn release_node(&mut self, node: &NodeId) {
        self.detach(*node);
        let mut stack = vec![*node];
        while let Some(id) = stack.pop() {
            if let Some(freed) = self.nodes.remove(id) {
                stack.extend(freed.children);
            }
        }
    }
}
