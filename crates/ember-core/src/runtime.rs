use std::rc::Rc;
use std::time::Duration;

use crate::commit::CommitReport;
use crate::element::Element;
use crate::error::EngineError;
use crate::fiber::{EffectTag, Fiber, FiberId, FiberKind, FiberTree, Preorder};
use crate::hooks::RenderRequest;
use crate::host::HostAdapter;
use crate::props::Props;
use crate::scheduler::SchedulerState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// The work loop yields once the deadline reports less than this.
    pub yield_threshold: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            yield_threshold: Duration::from_millis(1),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct PassStats {
    pub units: usize,
    pub slices: usize,
}

/// Owns the fiber generations and drives render passes into a host.
///
/// Lifecycle: [`Engine::new`] → [`Engine::render`] → repeated
/// [`Engine::work_loop`] calls (one per slice granted by the host) →
/// [`Engine::teardown`].
pub struct Engine<H: HostAdapter> {
    pub(crate) host: H,
    pub(crate) config: EngineConfig,
    pub(crate) tree: FiberTree<H::Node>,
    pub(crate) current_root: Option<FiberId>,
    pub(crate) wip_root: Option<FiberId>,
    pub(crate) deletions: Vec<FiberId>,
    pub(crate) next_unit: Option<FiberId>,
    pub(crate) request: Rc<RenderRequest>,
    pub(crate) state: SchedulerState,
    pub(crate) pass: PassStats,
    pub(crate) last_commit: Option<CommitReport>,
    pub(crate) commits: u64,
    pub(crate) torn_down: bool,
}

impl<H: HostAdapter> Engine<H> {
    pub fn new(host: H) -> Self {
        Self::with_config(host, EngineConfig::default())
    }

    pub fn with_config(host: H, config: EngineConfig) -> Self {
        Self {
            host,
            config,
            tree: FiberTree::new(),
            current_root: None,
            wip_root: None,
            deletions: Vec::new(),
            next_unit: None,
            request: Rc::new(RenderRequest::new()),
            state: SchedulerState::Idle,
            pass: PassStats::default(),
            last_commit: None,
            commits: 0,
            torn_down: false,
        }
    }

    /// Starts a pass rendering `element` into `container`. Nothing touches the
    /// container until the pass commits. Rendering again diffs against the
    /// last committed tree.
    pub fn render(&mut self, element: Element, container: H::Node) -> Result<(), EngineError> {
        self.ensure_live()?;
        let mut props = Props::new();
        props.push_child(element);
        let mut root = Fiber::new(FiberKind::Root, Rc::new(props), None);
        root.dom = Some(container);
        root.alternate = self.current_root;
        let root = self.tree.insert(root);
        self.start_pass(root);
        Ok(())
    }

    /// Stops all work and frees every fiber. The output tree is left as it
    /// was after the last commit. Further calls fail with
    /// [`EngineError::TornDown`].
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        log::debug!(
            "tearing down engine after {} commits ({} fibers live)",
            self.commits,
            self.tree.len()
        );
        self.torn_down = true;
        if let Some(root) = self.wip_root {
            self.release_pass_nodes(root);
        }
        self.tree.clear();
        self.current_root = None;
        self.wip_root = None;
        self.next_unit = None;
        self.deletions.clear();
        self.request.take();
        self.state = SchedulerState::Idle;
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn current_root(&self) -> Option<FiberId> {
        self.current_root
    }

    pub fn wip_root(&self) -> Option<FiberId> {
        self.wip_root
    }

    pub fn fiber(&self, id: FiberId) -> Option<&Fiber<H::Node>> {
        self.tree.get(id)
    }

    pub fn tree(&self) -> &FiberTree<H::Node> {
        &self.tree
    }

    /// Pre-order walk of the committed tree, root first.
    pub fn fibers(&self) -> Option<Preorder<'_, H::Node>> {
        self.current_root.map(|root| self.tree.preorder(root))
    }

    /// Fibers marked for deletion by the pass in progress.
    pub fn pending_deletions(&self) -> &[FiberId] {
        &self.deletions
    }

    pub fn render_request(&self) -> &Rc<RenderRequest> {
        &self.request
    }

    pub fn has_pending_work(&self) -> bool {
        !self.torn_down
            && (self.next_unit.is_some() || self.wip_root.is_some() || self.request.is_pending())
    }

    pub fn last_commit(&self) -> Option<&CommitReport> {
        self.last_commit.as_ref()
    }

    pub fn commit_count(&self) -> u64 {
        self.commits
    }

    pub(crate) fn ensure_live(&self) -> Result<(), EngineError> {
        if self.torn_down {
            Err(EngineError::TornDown)
        } else {
            Ok(())
        }
    }

    pub(crate) fn start_pass(&mut self, root: FiberId) {
        if let Some(discarded) = self.wip_root.replace(root) {
            log::warn!("discarding uncommitted render pass");
            self.release_pass_nodes(discarded);
        }
        self.deletions.clear();
        self.next_unit = Some(root);
        self.state = SchedulerState::Working;
        self.pass = PassStats::default();
        log::debug!("render pass started at {root:?}");
    }

    /// New root pass against the committed tree, as requested by a state
    /// setter. Returns `false` when nothing has been committed yet.
    pub(crate) fn restart_from_current(&mut self) -> bool {
        let Some(current) = self.current_root else {
            return false;
        };
        let Some((dom, props)) = self
            .tree
            .get(current)
            .map(|f| (f.dom.clone(), f.props.clone()))
        else {
            return false;
        };
        let mut root = Fiber::new(FiberKind::Root, props, None);
        root.dom = dom;
        root.alternate = Some(current);
        let root = self.tree.insert(root);
        self.start_pass(root);
        true
    }

    /// Hands back to the host the nodes created for a pass that will never
    /// commit. Nodes reused from the committed tree are left alone.
    fn release_pass_nodes(&mut self, root: FiberId) {
        let created: Vec<H::Node> = self
            .tree
            .preorder(root)
            .filter_map(|(id, _)| self.tree.get(id))
            .filter(|f| f.effect == Some(EffectTag::Placement))
            .filter_map(|f| f.dom.clone())
            .collect();
        for node in &created {
            self.host.release_node(node);
        }
    }

    /// Drops the pass in progress after a failure.
    pub(crate) fn abort_pass(&mut self, err: &EngineError) {
        log::error!("render pass aborted: {err}");
        if let Some(root) = self.wip_root.take() {
            self.release_pass_nodes(root);
        }
        self.next_unit = None;
        self.deletions.clear();
        self.state = SchedulerState::Idle;
    }
}
