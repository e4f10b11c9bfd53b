//! # Fiber tree
//!
//! Fibers are both the unit of work of a render pass and the persistent
//! render tree. They live in a [`FiberTree`] arena and refer to each other by
//! [`FiberId`]: `parent`, first `child`, next `sibling`, and `alternate`, the
//! fiber at the same position in the other generation.
//!
//! Two generations are alive while a pass runs: the committed one and the
//! work-in-progress one. After each commit the arena is swept, so anything
//! not reachable from the new committed root (the previous generation,
//! deleted fibers, abandoned passes) is freed together with its hook cells.

use std::any::Any;
use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

use crate::element::{Component, ElementKind};
use crate::props::Props;

new_key_type! {
    pub struct FiberId;
}

#[derive(Clone, Debug, PartialEq)]
pub enum FiberKind {
    /// Owns the container node handed to `render`.
    Root,
    Host(Cow<'static, str>),
    Text,
    Component(Component),
}

impl FiberKind {
    pub fn matches(&self, kind: &ElementKind) -> bool {
        match (self, kind) {
            (FiberKind::Host(a), ElementKind::Host(b)) => a == b,
            (FiberKind::Text, ElementKind::Text) => true,
            (FiberKind::Component(a), ElementKind::Component(b)) => a == b,
            _ => false,
        }
    }

    pub fn is_component(&self) -> bool {
        matches!(self, FiberKind::Component(_))
    }

    pub fn label(&self) -> &str {
        match self {
            FiberKind::Root => "#root",
            FiberKind::Host(tag) => tag,
            FiberKind::Text => "#text",
            FiberKind::Component(c) => c.name(),
        }
    }
}

impl From<&ElementKind> for FiberKind {
    fn from(kind: &ElementKind) -> Self {
        match kind {
            ElementKind::Host(tag) => FiberKind::Host(tag.clone()),
            ElementKind::Text => FiberKind::Text,
            ElementKind::Component(c) => FiberKind::Component(c.clone()),
        }
    }
}

/// What commit has to do with a fiber of the work-in-progress generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectTag {
    Placement,
    Update,
    Deletion,
}

pub struct Fiber<N> {
    pub(crate) kind: FiberKind,
    pub(crate) props: Rc<Props>,
    pub(crate) dom: Option<N>,
    pub(crate) parent: Option<FiberId>,
    pub(crate) child: Option<FiberId>,
    pub(crate) sibling: Option<FiberId>,
    pub(crate) alternate: Option<FiberId>,
    pub(crate) effect: Option<EffectTag>,
    pub(crate) hooks: Vec<Rc<dyn Any>>,
}

impl<N> Fiber<N> {
    pub(crate) fn new(kind: FiberKind, props: Rc<Props>, parent: Option<FiberId>) -> Self {
        Self {
            kind,
            props,
            dom: None,
            parent,
            child: None,
            sibling: None,
            alternate: None,
            effect: None,
            hooks: Vec::new(),
        }
    }

    pub fn kind(&self) -> &FiberKind {
        &self.kind
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn dom(&self) -> Option<&N> {
        self.dom.as_ref()
    }

    pub fn parent(&self) -> Option<FiberId> {
        self.parent
    }

    pub fn child(&self) -> Option<FiberId> {
        self.child
    }

    pub fn sibling(&self) -> Option<FiberId> {
        self.sibling
    }

    pub fn alternate(&self) -> Option<FiberId> {
        self.alternate
    }

    pub fn effect(&self) -> Option<EffectTag> {
        self.effect
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }
}

impl<N: fmt::Debug> fmt::Debug for Fiber<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fiber")
            .field("kind", &self.kind.label())
            .field("dom", &self.dom)
            .field("parent", &self.parent)
            .field("child", &self.child)
            .field("sibling", &self.sibling)
            .field("alternate", &self.alternate)
            .field("effect", &self.effect)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

pub struct FiberTree<N> {
    fibers: SlotMap<FiberId, Fiber<N>>,
}

impl<N> Default for FiberTree<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> FiberTree<N> {
    pub fn new() -> Self {
        Self {
            fibers: SlotMap::with_key(),
        }
    }

    pub(crate) fn insert(&mut self, fiber: Fiber<N>) -> FiberId {
        self.fibers.insert(fiber)
    }

    pub fn get(&self, id: FiberId) -> Option<&Fiber<N>> {
        self.fibers.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: FiberId) -> Option<&mut Fiber<N>> {
        self.fibers.get_mut(id)
    }

    pub fn contains(&self, id: FiberId) -> bool {
        self.fibers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.fibers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fibers.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.fibers.clear();
    }

    /// Depth-first successor: first child, else the nearest sibling found
    /// walking up through parents. `None` once the walk climbs past the root.
    pub fn next_unit(&self, id: FiberId) -> Option<FiberId> {
        let fiber = self.get(id)?;
        if let Some(child) = fiber.child {
            return Some(child);
        }
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let fiber = self.get(current)?;
            if let Some(sibling) = fiber.sibling {
                return Some(sibling);
            }
            cursor = fiber.parent;
        }
        None
    }

    /// Closest ancestor of `id` that owns an output node.
    pub fn host_parent(&self, id: FiberId) -> Option<FiberId> {
        let mut cursor = self.get(id)?.parent;
        while let Some(current) = cursor {
            let fiber = self.get(current)?;
            if fiber.dom.is_some() {
                return Some(current);
            }
            cursor = fiber.parent;
        }
        None
    }

    pub fn children(&self, id: FiberId) -> Children<'_, N> {
        Children {
            tree: self,
            next: self.get(id).and_then(|f| f.child),
        }
    }

    /// Pre-order walk of the subtree under `root`, yielding `(id, depth)`.
    /// Siblings of `root` itself are not visited.
    pub fn preorder(&self, root: FiberId) -> Preorder<'_, N> {
        let mut stack = SmallVec::new();
        if self.contains(root) {
            stack.push((root, 0));
        }
        Preorder {
            tree: self,
            root,
            stack,
        }
    }

    /// Takes `id` out of its parent's child chain. The fiber itself stays in
    /// the arena until the next sweep.
    pub(crate) fn unlink(&mut self, id: FiberId) {
        let Some((Some(parent), sibling)) = self.get(id).map(|f| (f.parent, f.sibling)) else {
            return;
        };
        let mut cursor = self.get(parent).and_then(|f| f.child);
        if cursor == Some(id) {
            if let Some(parent) = self.get_mut(parent) {
                parent.child = sibling;
            }
            return;
        }
        while let Some(current) = cursor {
            let next = self.get(current).and_then(|f| f.sibling);
            if next == Some(id) {
                if let Some(prev) = self.get_mut(current) {
                    prev.sibling = sibling;
                }
                return;
            }
            cursor = next;
        }
    }

    /// Frees every fiber not reachable from `root` and clears the alternate
    /// links of the survivors. Returns how many fibers were freed.
    pub(crate) fn sweep(&mut self, root: FiberId) -> usize {
        let live: HashSet<FiberId> = self.preorder(root).map(|(id, _)| id).collect();
        let before = self.fibers.len();
        self.fibers.retain(|id, _| live.contains(&id));
        for fiber in self.fibers.values_mut() {
            fiber.alternate = None;
        }
        before - self.fibers.len()
    }
}

pub struct Children<'a, N> {
    tree: &'a FiberTree<N>,
    next: Option<FiberId>,
}

impl<N> Iterator for Children<'_, N> {
    type Item = FiberId;

    fn next(&mut self) -> Option<FiberId> {
        let id = self.next?;
        self.next = self.tree.get(id).and_then(|f| f.sibling);
        Some(id)
    }
}

pub struct Preorder<'a, N> {
    tree: &'a FiberTree<N>,
    root: FiberId,
    stack: SmallVec<[(FiberId, usize); 16]>,
}

impl<N> Iterator for Preorder<'_, N> {
    type Item = (FiberId, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let (id, depth) = self.stack.pop()?;
        if let Some(fiber) = self.tree.get(id) {
            if id != self.root
                && let Some(sibling) = fiber.sibling
            {
                self.stack.push((sibling, depth));
            }
            if let Some(child) = fiber.child {
                self.stack.push((child, depth + 1));
            }
        }
        Some((id, depth))
    }
}
