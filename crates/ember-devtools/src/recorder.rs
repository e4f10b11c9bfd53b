use std::fmt;

use ember_core::{EventHandler, HostAdapter, HostError, NodeKind, PropValue};

bitflags::bitflags! {
    /// Categories of host calls a [`Recorder`] keeps.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MutationMask: u8 {
        /// Node creation.
        const CREATE = 1 << 0;
        /// Attribute sets and removals.
        const PROPS = 1 << 1;
        const LISTENERS = 1 << 2;
        /// Appends and removals of children.
        const TREE = 1 << 3;
    }
}

/// One successful host call. Nodes are recorded by their `Debug` form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    Create { kind: String },
    SetProp {
        node: String,
        name: String,
        value: String,
    },
    RemoveProp { node: String, name: String },
    AddListener { node: String, event: String },
    RemoveListener { node: String, event: String },
    Append { parent: String, child: String },
    Remove { parent: String, child: String },
    Release { node: String },
}

impl Mutation {
    pub fn category(&self) -> MutationMask {
        match self {
            Mutation::Create { .. } => MutationMask::CREATE,
            Mutation::SetProp { .. } | Mutation::RemoveProp { .. } => MutationMask::PROPS,
            Mutation::AddListener { .. } | Mutation::RemoveListener { .. } => {
                MutationMask::LISTENERS
            }
            Mutation::Append { .. } | Mutation::Remove { .. } | Mutation::Release { .. } => {
                MutationMask::TREE
            }
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::Create { kind } => write!(f, "create {kind}"),
            Mutation::SetProp { node, name, value } => write!(f, "set {node}.{name} = {value:?}"),
            Mutation::RemoveProp { node, name } => write!(f, "unset {node}.{name}"),
            Mutation::AddListener { node, event } => write!(f, "listen {node} {event}"),
            Mutation::RemoveListener { node, event } => write!(f, "unlisten {node} {event}"),
            Mutation::Append { parent, child } => write!(f, "append {child} to {parent}"),
            Mutation::Remove { parent, child } => write!(f, "remove {child} from {parent}"),
            Mutation::Release { node } => write!(f, "release {node}"),
        }
    }
}

/// Host wrapper that forwards every call to `inner` and keeps a log of the
/// calls that succeeded, filtered by a [`MutationMask`].
pub struct Recorder<H> {
    inner: H,
    mask: MutationMask,
    log: Vec<Mutation>,
}

impl<H: HostAdapter> Recorder<H> {
    pub fn new(inner: H) -> Self {
        Self::with_mask(inner, MutationMask::all())
    }

    pub fn with_mask(inner: H, mask: MutationMask) -> Self {
        Self {
            inner,
            mask,
            log: Vec::new(),
        }
    }

    pub fn mask(&self) -> MutationMask {
        self.mask
    }

    pub fn set_mask(&mut self, mask: MutationMask) {
        self.mask = mask;
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.log
    }

    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.log)
    }

    /// Recorded mutations falling in any category of `mask`.
    pub fn count(&self, mask: MutationMask) -> usize {
        self.log
            .iter()
            .filter(|m| mask.intersects(m.category()))
            .count()
    }

    pub fn clear(&mut self) {
        self.log.clear();
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut H {
        &mut self.inner
    }

    pub fn into_inner(self) -> H {
        self.inner
    }

    fn record(&mut self, mutation: Mutation) {
        if self.mask.contains(mutation.category()) {
            log::trace!("{mutation}");
            self.log.push(mutation);
        }
    }
}

fn node_name(node: &impl fmt::Debug) -> String {
    format!("{node:?}")
}

impl<H: HostAdapter> HostAdapter for Recorder<H> {
    type Node = H::Node;

    fn create_node(&mut self, kind: NodeKind<'_>) -> Result<H::Node, HostError> {
        let node = self.inner.create_node(kind)?;
        let kind = match kind {
            NodeKind::Element(tag) => tag.to_string(),
            NodeKind::Text => "#text".to_string(),
        };
        self.record(Mutation::Create { kind });
        Ok(node)
    }

    fn set_prop(&mut self, node: &H::Node, name: &str, value: &PropValue) -> Result<(), HostError> {
        self.inner.set_prop(node, name, value)?;
        self.record(Mutation::SetProp {
            node: node_name(node),
            name: name.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn remove_prop(&mut self, node: &H::Node, name: &str) -> Result<(), HostError> {
        self.inner.remove_prop(node, name)?;
        self.record(Mutation::RemoveProp {
            node: node_name(node),
            name: name.to_string(),
        });
        Ok(())
    }

    fn add_listener(
        &mut self,
        node: &H::Node,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError> {
        self.inner.add_listener(node, event, handler)?;
        self.record(Mutation::AddListener {
            node: node_name(node),
            event: event.to_string(),
        });
        Ok(())
    }

    fn remove_listener(
        &mut self,
        node: &H::Node,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError> {
        self.inner.remove_listener(node, event, handler)?;
        self.record(Mutation::RemoveListener {
            node: node_name(node),
            event: event.to_string(),
        });
        Ok(())
    }

    fn append_child(&mut self, parent: &H::Node, child: &H::Node) -> Result<(), HostError> {
        self.inner.append_child(parent, child)?;
        self.record(Mutation::Append {
            parent: node_name(parent),
            child: node_name(child),
        });
        Ok(())
    }

    fn remove_child(&mut self, parent: &H::Node, child: &H::Node) -> Result<(), HostError> {
        self.inner.remove_child(parent, child)?;
        self.record(Mutation::Remove {
            parent: node_name(parent),
            child: node_name(child),
        });
        Ok(())
    }

    fn release_node(&mut self, node: &H::Node) {
        self.inner.release_node(node);
        self.record(Mutation::Release {
            node: node_name(node),
        });
    }

    fn supports_kind(&self, tag: &str) -> bool {
        self.inner.supports_kind(tag)
    }
}
