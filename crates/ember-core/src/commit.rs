use std::rc::Rc;

use smallvec::SmallVec;

use crate::error::{EngineError, HostError};
use crate::fiber::{EffectTag, FiberId};
use crate::host::HostAdapter;
use crate::props::{Props, apply_patch, diff_props};
use crate::runtime::Engine;
use crate::scheduler::SchedulerState;

/// What a commit did to the output tree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Output nodes appended under their parent.
    pub placed: usize,
    /// Fibers tagged `Update` that own an output node.
    pub updated: usize,
    /// Of those, how many had at least one prop change applied.
    pub patched: usize,
    /// Deleted fibers (each may remove more than one output node).
    pub deleted: usize,
    /// Units of work performed by the pass.
    pub units: usize,
    /// Work-loop calls the pass spanned.
    pub slices: usize,
    /// Fibers reclaimed from the previous generation.
    pub reclaimed: usize,
}

impl CommitReport {
    pub fn mutated_output(&self) -> bool {
        self.placed > 0 || self.patched > 0 || self.deleted > 0
    }
}

/// Effects of a commit that already reached the host.
struct Applied<N> {
    deletions: Vec<FiberId>,
    placements: Vec<(N, N)>,
    /// Committed fiber and the props now reflected by its output node.
    updates: Vec<(FiberId, Rc<Props>)>,
}

impl<N> Default for Applied<N> {
    fn default() -> Self {
        Self {
            deletions: Vec::new(),
            placements: Vec::new(),
            updates: Vec::new(),
        }
    }
}

impl<H: HostAdapter> Engine<H> {
    /// Applies the finished pass to the host and promotes it to current.
    ///
    /// The first host error stops the commit: remaining effects are skipped,
    /// the pass is dropped, and the previous generation stays current. What
    /// was already applied is folded back so the committed tree describes
    /// the output again.
    pub(crate) fn commit_root(&mut self) -> Result<CommitReport, EngineError> {
        let Some(root) = self.wip_root else {
            return Ok(CommitReport::default());
        };

        let mut applied = Applied::default();
        let mut report = match self.commit_effects(root, &mut applied) {
            Ok(report) => report,
            Err(err) => {
                let err = match err {
                    EngineError::Host(source) => EngineError::Commit { source },
                    other => other,
                };
                self.recover_partial_commit(applied);
                self.abort_pass(&err);
                return Err(err);
            }
        };

        self.current_root = Some(root);
        self.wip_root = None;
        self.state = SchedulerState::Idle;
        report.units = self.pass.units;
        report.slices = self.pass.slices;
        report.reclaimed = self.tree.sweep(root);
        self.commits += 1;

        log::debug!(
            "commit #{}: placed={} updated={} patched={} deleted={} units={} slices={} reclaimed={}",
            self.commits,
            report.placed,
            report.updated,
            report.patched,
            report.deleted,
            report.units,
            report.slices,
            report.reclaimed
        );
        self.last_commit = Some(report.clone());
        Ok(report)
    }

    fn commit_effects(
        &mut self,
        root: FiberId,
        applied: &mut Applied<H::Node>,
    ) -> Result<CommitReport, EngineError> {
        let mut report = CommitReport::default();

        for id in std::mem::take(&mut self.deletions) {
            let parent = self.host_parent_node(id)?;
            self.commit_deletion(id, &parent)?;
            applied.deletions.push(id);
            report.deleted += 1;
        }

        let mut next = self.tree.get(root).and_then(|f| f.child);
        while let Some(id) = next {
            let fiber = self.tree.get(id).ok_or(EngineError::MissingFiber(id))?;
            match (fiber.effect, fiber.dom.clone()) {
                (Some(EffectTag::Placement), Some(dom)) => {
                    let parent = self.host_parent_node(id)?;
                    self.host.append_child(&parent, &dom)?;
                    applied.placements.push((parent, dom));
                    report.placed += 1;
                }
                (Some(EffectTag::Update), Some(dom)) => {
                    let alternate = fiber.alternate.ok_or(EngineError::MissingFiber(id))?;
                    let prev = self
                        .tree
                        .get(alternate)
                        .ok_or(EngineError::MissingFiber(alternate))?;
                    let patches = diff_props(&prev.props, &fiber.props);
                    if !patches.is_empty() {
                        let props = fiber.props.clone();
                        apply_patch(&mut self.host, &dom, &patches)?;
                        applied.updates.push((alternate, props));
                        report.patched += 1;
                    }
                    report.updated += 1;
                }
                _ => {}
            }
            next = self.tree.next_unit(id);
        }

        Ok(report)
    }

    /// Brings the committed generation back in line with the output after a
    /// commit stopped half way: removed subtrees are unlinked so the next
    /// pass places them again, appended nodes are taken out again, and
    /// patched fibers take the props their nodes now carry.
    fn recover_partial_commit(&mut self, applied: Applied<H::Node>) {
        for id in applied.deletions {
            self.tree.unlink(id);
        }
        for (parent, node) in applied.placements.into_iter().rev() {
            if let Err(err) = self.host.remove_child(&parent, &node) {
                log::warn!("could not take back placement of {node:?}: {err}");
            }
        }
        for (id, props) in applied.updates {
            if let Some(fiber) = self.tree.get_mut(id) {
                fiber.props = props;
            }
        }
    }

    fn host_parent_node(&self, id: FiberId) -> Result<H::Node, EngineError> {
        self.tree
            .host_parent(id)
            .and_then(|parent| self.tree.get(parent))
            .and_then(|parent| parent.dom.clone())
            .ok_or_else(|| {
                HostError::Rejected(format!("fiber {id:?} has no output-owning ancestor")).into()
            })
    }

    /// Removes the output nodes of a deleted subtree: its own node, or the
    /// nearest node-owning descendants of a component fiber.
    fn commit_deletion(&mut self, id: FiberId, parent: &H::Node) -> Result<(), EngineError> {
        let fiber = self.tree.get(id).ok_or(EngineError::MissingFiber(id))?;
        if let Some(dom) = fiber.dom.clone() {
            self.host.remove_child(parent, &dom)?;
            self.host.release_node(&dom);
            return Ok(());
        }
        let children: SmallVec<[FiberId; 4]> = self.tree.children(id).collect();
        for child in children {
            self.commit_deletion(child, parent)?;
        }
        Ok(())
    }
}
