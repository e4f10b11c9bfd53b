//! Debugging aids: a mutation-recording host wrapper and fiber tree dumps.

mod recorder;

use std::fmt::Write as _;

use web_time::Instant;

use ember_core::{
    CommitReport, Engine, FiberKind, HostAdapter, NODE_VALUE, is_event_key, is_property_key,
};

pub use recorder::{Mutation, MutationMask, Recorder};

/// Running commit statistics.
pub struct Hud {
    commit_count: u64,
    last_commit: Option<Instant>,
    rate_smooth: f32,
    pub metrics: Option<Metrics>,
}

impl Default for Hud {
    fn default() -> Self {
        Self::new()
    }
}

impl Hud {
    pub fn new() -> Self {
        Self {
            commit_count: 0,
            last_commit: None,
            rate_smooth: 0.0,
            metrics: None,
        }
    }

    pub fn commit(&mut self, report: &CommitReport, live_fibers: usize) {
        self.commit_count += 1;
        let now = Instant::now();
        if let Some(prev) = self.last_commit.replace(now) {
            let gap = (now - prev).as_secs_f32();
            if gap > 0.0 {
                self.rate_smooth = smooth_rate(self.rate_smooth, 1.0 / gap);
            }
        }
        self.metrics = Some(Metrics {
            units: report.units,
            slices: report.slices,
            live_fibers,
        });
    }

    pub fn commit_count(&self) -> u64 {
        self.commit_count
    }

    pub fn line(&self) -> String {
        let mut lines = vec![
            format!("commits: {}", self.commit_count),
            format!("rate: {:.1}/s", self.rate_smooth),
        ];
        if let Some(m) = &self.metrics {
            lines.push(format!("units: {} in {} slices", m.units, m.slices));
            lines.push(format!("fibers: {}", m.live_fibers));
        }
        lines.join("  |  ")
    }
}

/// Weight of the newest sample in the commit-rate average.
const RATE_SMOOTHING: f32 = 0.2;

/// Exponential moving average seeded by the first sample.
fn smooth_rate(average: f32, sample: f32) -> f32 {
    if average == 0.0 {
        sample
    } else {
        average + RATE_SMOOTHING * (sample - average)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metrics {
    pub units: usize,
    pub slices: usize,
    pub live_fibers: usize,
}

pub struct Inspector {
    pub hud: Hud,
    pub enabled: bool,
}

impl Default for Inspector {
    fn default() -> Self {
        Self::new()
    }
}

impl Inspector {
    pub fn new() -> Self {
        Self {
            hud: Hud::new(),
            enabled: true,
        }
    }

    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }

    /// Feeds the engine's latest commit into the HUD, if there is one the
    /// HUD has not seen yet.
    pub fn observe<H: HostAdapter>(&mut self, engine: &Engine<H>) {
        if !self.enabled || engine.commit_count() == self.hud.commit_count {
            return;
        }
        if let Some(report) = engine.last_commit() {
            self.hud.commit(report, engine.tree().len());
            log::debug!("{}", Self::summary(report));
        }
    }

    /// One-line metrics of a commit.
    pub fn summary(report: &CommitReport) -> String {
        format!(
            "placed {} / updated {} ({} patched) / deleted {} | {} units in {} slices | reclaimed {}",
            report.placed,
            report.updated,
            report.patched,
            report.deleted,
            report.units,
            report.slices,
            report.reclaimed
        )
    }

    /// Indented dump of the committed fiber tree, one fiber per line.
    /// Empty when nothing has been committed.
    pub fn dump_fibers<H: HostAdapter>(engine: &Engine<H>) -> String {
        let mut out = String::new();
        let Some(fibers) = engine.fibers() else {
            return out;
        };
        for (id, depth) in fibers {
            let Some(fiber) = engine.fiber(id) else {
                continue;
            };
            for _ in 0..depth {
                out.push_str("  ");
            }
            let props = fiber.props();
            match fiber.kind() {
                FiberKind::Text => {
                    let text = props
                        .get(NODE_VALUE)
                        .map(|v| v.to_string())
                        .unwrap_or_default();
                    let _ = write!(out, "{text:?}");
                }
                FiberKind::Component(c) => {
                    let _ = write!(out, "<{}> hooks={}", c.name(), fiber.hook_count());
                }
                kind => {
                    out.push_str(kind.label());
                    for (key, value) in props.iter() {
                        if is_property_key(key) {
                            let _ = write!(out, " {key}=\"{value}\"");
                        } else if is_event_key(key) {
                            let _ = write!(out, " {key}");
                        }
                    }
                }
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_average_starts_at_first_sample() {
        assert_eq!(smooth_rate(0.0, 60.0), 60.0);
    }

    #[test]
    fn rate_average_moves_toward_new_samples() {
        let next = smooth_rate(60.0, 30.0);
        assert!((next - 54.0).abs() < 1e-4);
        assert_eq!(smooth_rate(60.0, 60.0), 60.0);
    }
}
