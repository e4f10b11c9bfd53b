//! # Work loop
//!
//! A render pass walks the work-in-progress tree one fiber at a time. Each
//! unit renders a component or prepares a host node, reconciles its children,
//! and hands back the next fiber in depth-first order. The loop checks the
//! [`Deadline`] after every unit and yields to the host when the slice is
//! spent; the next call resumes where it stopped. When the walk is complete
//! the pass is committed in one go.

use crate::element::Component;
use crate::error::{EngineError, HookError};
use crate::fiber::{FiberId, FiberKind};
use crate::hooks::render_component;
use crate::host::{HostAdapter, NodeKind};
use crate::props::{Props, apply_patch, diff_props};
use crate::runtime::Engine;
use crate::slice::{Deadline, Unbounded};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Working,
}

/// Outcome of one [`Engine::work_loop`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkStatus {
    /// Nothing left to do until the next `render` or state update.
    Idle,
    /// The slice ran out, or a new pass was queued; call again.
    Pending,
}

impl<H: HostAdapter> Engine<H> {
    /// Performs units of work until the pass completes or `deadline` runs
    /// low, committing if the pass completed.
    pub fn work_loop(&mut self, deadline: &dyn Deadline) -> Result<WorkStatus, EngineError> {
        self.ensure_live()?;
        self.take_render_request();

        if self.next_unit.is_some() {
            self.pass.slices += 1;
        }
        while let Some(unit) = self.next_unit {
            match self.perform_unit_of_work(unit) {
                Ok(next) => self.next_unit = next,
                Err(err) => {
                    self.abort_pass(&err);
                    return Err(err);
                }
            }
            self.pass.units += 1;
            self.take_render_request();
            if deadline.time_remaining() < self.config.yield_threshold {
                break;
            }
        }

        if self.next_unit.is_none() && self.wip_root.is_some() {
            self.commit_root()?;
            // setters called before anything was committed
            self.take_render_request();
        }

        Ok(if self.next_unit.is_some() {
            WorkStatus::Pending
        } else {
            WorkStatus::Idle
        })
    }

    /// Runs every pending pass to completion without yielding.
    pub fn flush_sync(&mut self) -> Result<(), EngineError> {
        while self.work_loop(&Unbounded)? == WorkStatus::Pending {}
        Ok(())
    }

    /// Honours a pending state update by restarting from the committed root.
    /// The pass in progress, if any, is discarded rather than merged.
    fn take_render_request(&mut self) {
        if !self.request.is_pending() {
            return;
        }
        if self.current_root.is_some() {
            self.request.take();
            self.restart_from_current();
        } else if self.wip_root.is_none() {
            log::debug!("state update with nothing rendered; ignored");
            self.request.take();
        }
        // otherwise the first pass is still running; retried after it commits
    }

    pub(crate) fn perform_unit_of_work(
        &mut self,
        id: FiberId,
    ) -> Result<Option<FiberId>, EngineError> {
        let kind = self
            .tree
            .get(id)
            .map(|f| f.kind.clone())
            .ok_or(EngineError::MissingFiber(id))?;
        log::trace!("unit of work: {} {id:?}", kind.label());

        match kind {
            FiberKind::Component(component) => self.update_function_component(id, &component)?,
            _ => self.update_host_component(id)?,
        }
        Ok(self.tree.next_unit(id))
    }

    fn update_function_component(
        &mut self,
        id: FiberId,
        component: &Component,
    ) -> Result<(), EngineError> {
        let fiber = self.tree.get(id).ok_or(EngineError::MissingFiber(id))?;
        let props = fiber.props.clone();
        let previous = fiber
            .alternate
            .and_then(|alt| self.tree.get(alt))
            .map(|alt| alt.hooks.clone());
        let expected = previous.as_ref().map(Vec::len);

        let (element, hooks) = render_component(
            component,
            &props,
            previous.unwrap_or_default(),
            self.request.clone(),
        )?;
        if let Some(expected) = expected
            && expected != hooks.len()
        {
            return Err(HookError::CountMismatch {
                component: component.name(),
                expected,
                found: hooks.len(),
            }
            .into());
        }

        let fiber = self.tree.get_mut(id).ok_or(EngineError::MissingFiber(id))?;
        fiber.hooks = hooks;
        self.reconcile_children(id, &[element])
    }

    fn update_host_component(&mut self, id: FiberId) -> Result<(), EngineError> {
        let fiber = self.tree.get(id).ok_or(EngineError::MissingFiber(id))?;
        let props = fiber.props.clone();

        if fiber.dom.is_none() {
            let node = match &fiber.kind {
                FiberKind::Host(tag) => self.host.create_node(NodeKind::Element(tag))?,
                FiberKind::Text => self.host.create_node(NodeKind::Text)?,
                FiberKind::Root => return Err(EngineError::NotAHostFiber(id, "root")),
                FiberKind::Component(_) => {
                    return Err(EngineError::NotAHostFiber(id, "component"));
                }
            };
            apply_patch(&mut self.host, &node, &diff_props(&Props::new(), &props))?;
            if let Some(fiber) = self.tree.get_mut(id) {
                fiber.dom = Some(node);
            }
        }

        self.reconcile_children(id, props.children())
    }
}
