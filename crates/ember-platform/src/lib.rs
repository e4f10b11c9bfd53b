//! Headless platform for Ember: an in-memory [`Document`] host and a
//! [`Runner`] that feeds the engine wall-clock slices until it settles.

pub mod document;

use std::time::Duration;

use anyhow::Context;
use ember_core::*;
use web_time::Instant;

pub use document::{Document, DomNode, NodeData, NodeId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Length of each slice handed to the work loop.
    pub slice_budget: Duration,
    /// Give up after this many slices without settling. `None` never gives up.
    pub max_slices: Option<usize>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            slice_budget: Duration::from_millis(5),
            max_slices: None,
        }
    }
}

impl RunnerConfig {
    /// Defaults overridden by `EMBER_SLICE_BUDGET_MS` and `EMBER_MAX_SLICES`.
    /// Values that do not parse are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(ms) = parse_var::<u64>(&lookup, "EMBER_SLICE_BUDGET_MS") {
            config.slice_budget = Duration::from_millis(ms);
        }
        if let Some(max) = parse_var::<usize>(&lookup, "EMBER_MAX_SLICES") {
            config.max_slices = Some(max);
        }
        config
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("ignoring {key}={raw:?}: not a non-negative integer");
            None
        }
    }
}

/// Owns an engine rendering into a [`Document`] container and drives it.
pub struct Runner {
    engine: Engine<Document>,
    container: NodeId,
    config: RunnerConfig,
    slices: usize,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        Self::with_engine_config(config, EngineConfig::default())
    }

    pub fn with_engine_config(config: RunnerConfig, engine_config: EngineConfig) -> Self {
        let mut document = Document::new();
        let container = document.create_container("root");
        Self {
            engine: Engine::with_config(document, engine_config),
            container,
            config,
            slices: 0,
        }
    }

    /// Starts rendering `root` into the container. Call [`Runner::run_until_idle`]
    /// or [`Runner::tick`] to make progress.
    pub fn mount(&mut self, root: Element) -> Result<(), EngineError> {
        self.engine.render(root, self.container)
    }

    /// Runs one slice of at most `slice_budget`.
    pub fn tick(&mut self) -> Result<WorkStatus, EngineError> {
        self.slices += 1;
        self.engine
            .work_loop(&SliceBudget::new(self.config.slice_budget))
    }

    /// Ticks until no work is left. Returns the number of slices used.
    pub fn run_until_idle(&mut self) -> anyhow::Result<usize> {
        let started = Instant::now();
        let mut slices = 0;
        while self.engine.has_pending_work() {
            if let Some(max) = self.config.max_slices
                && slices >= max
            {
                anyhow::bail!("work still pending after {slices} slices");
            }
            self.tick().context("render pass failed")?;
            slices += 1;
        }
        if slices > 0 {
            log::debug!("settled in {slices} slices ({:?})", started.elapsed());
        }
        Ok(slices)
    }

    /// Delivers `event` to the listeners on `node`. State updates made by
    /// the handlers are rendered by the next tick.
    pub fn dispatch(&self, node: NodeId, event: &str) -> usize {
        self.engine.host().dispatch(node, &Event::new(event))
    }

    pub fn teardown(&mut self) {
        log::info!("runner teardown after {} slices", self.slices);
        self.engine.teardown();
    }

    pub fn document(&self) -> &Document {
        self.engine.host()
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn engine(&self) -> &Engine<Document> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine<Document> {
        &mut self.engine
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Slices requested over the runner's lifetime.
    pub fn slices(&self) -> usize {
        self.slices
    }

    /// Rendered markup of everything under the container.
    pub fn markup(&self) -> String {
        self.document().inner_markup(self.container)
    }

    pub fn into_document(self) -> Document {
        self.engine.into_host()
    }
}

/// Mounts `root` in a fresh headless runner configured from the environment
/// and renders it to completion.
pub fn run_headless_app(root: Element) -> anyhow::Result<Runner> {
    let config = RunnerConfig::from_env();
    log::info!(
        "headless runner: slice budget {:?}, max slices {:?}",
        config.slice_budget,
        config.max_slices
    );
    let mut runner = Runner::new(config);
    runner.mount(root).context("mounting root element")?;
    runner.run_until_idle()?;
    Ok(runner)
}
