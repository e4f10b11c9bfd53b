//! # Reconciler
//!
//! Diffs the new child elements of a work-in-progress fiber against the
//! child chain of its alternate. Matching is positional: the Nth element is
//! compared with the Nth old fiber, and only their kinds decide the outcome.
//!
//! | element | old fiber | same kind | result |
//! | --- | --- | --- | --- |
//! | yes | yes | yes | `Update` fiber reusing the old output node |
//! | yes | any | no | `Placement` fiber without output node |
//! | any | yes | no | old fiber tagged `Deletion` and queued |
//!
//! Reordering a list therefore shows up as a run of updates and content
//! changes rather than moves.

use crate::element::{Element, ElementKind};
use crate::error::EngineError;
use crate::fiber::{EffectTag, Fiber, FiberId, FiberKind};
use crate::host::HostAdapter;
use crate::runtime::Engine;

impl<H: HostAdapter> Engine<H> {
    pub(crate) fn reconcile_children(
        &mut self,
        wip: FiberId,
        elements: &[Element],
    ) -> Result<(), EngineError> {
        let mut old = self
            .tree
            .get(wip)
            .and_then(|f| f.alternate)
            .and_then(|alt| self.tree.get(alt))
            .and_then(|alt| alt.child);
        let mut prev: Option<FiberId> = None;
        let mut index = 0;

        while index < elements.len() || old.is_some() {
            let element = elements.get(index);
            let old_fiber = old.and_then(|id| {
                self.tree
                    .get(id)
                    .map(|f| (id, f.kind.clone(), f.dom.clone(), f.sibling))
            });
            let same_kind = match (element, &old_fiber) {
                (Some(el), Some((_, kind, _, _))) => kind.matches(el.kind()),
                _ => false,
            };

            let new_fiber = match (element, &old_fiber) {
                (Some(el), Some((old_id, kind, dom, _))) if same_kind => {
                    let mut next = Fiber::new(kind.clone(), el.shared_props().clone(), Some(wip));
                    next.dom = dom.clone();
                    next.alternate = Some(*old_id);
                    next.effect = Some(EffectTag::Update);
                    Some(next)
                }
                (Some(el), _) => {
                    if let ElementKind::Host(tag) = el.kind()
                        && !self.host.supports_kind(tag)
                    {
                        return Err(EngineError::UnsupportedElement {
                            tag: tag.to_string(),
                        });
                    }
                    let kind = FiberKind::from(el.kind());
                    let mut next = Fiber::new(kind, el.shared_props().clone(), Some(wip));
                    next.effect = Some(EffectTag::Placement);
                    Some(next)
                }
                (None, _) => None,
            };

            if let (false, Some((old_id, ..))) = (same_kind, &old_fiber) {
                if let Some(fiber) = self.tree.get_mut(*old_id) {
                    fiber.effect = Some(EffectTag::Deletion);
                }
                self.deletions.push(*old_id);
            }

            old = old_fiber.and_then(|(_, _, _, sibling)| sibling);

            if let Some(fiber) = new_fiber {
                let id = self.tree.insert(fiber);
                let link = match prev {
                    None => self.tree.get_mut(wip).map(|f| &mut f.child),
                    Some(prev) => self.tree.get_mut(prev).map(|f| &mut f.sibling),
                };
                if let Some(link) = link {
                    *link = Some(id);
                }
                prev = Some(id);
            }
            index += 1;
        }
        Ok(())
    }
}
