#![allow(non_snake_case)]

use ember_core::prelude::*;
use ember_devtools::Inspector;
use ember_platform::{Runner, RunnerConfig};

fn Counter(_: &Props) -> Element {
    let (count, set_count) = use_state(0);
    Element::host("h1")
        .on("click", move |_| set_count.update(|c| c + 1))
        .with_children(children!["Count: ", count])
}

fn app() -> Element {
    create_element(
        "section",
        Some(Props::new().with("class", "panel")),
        children![
            create_element("h2", None, children!["Title"]),
            Element::component(Counter, Props::new()),
        ],
    )
}

#[test]
fn dump_lists_committed_fibers() {
    let mut runner = Runner::new(RunnerConfig::default());
    assert_eq!(Inspector::dump_fibers(runner.engine()), "");

    runner.mount(app()).unwrap();
    runner.run_until_idle().unwrap();

    let expected = [
        "#root",
        "  section class=\"panel\"",
        "    h2",
        "      \"Title\"",
        "    <Counter> hooks=1",
        "      h1 onClick",
        "        \"Count: \"",
        "        \"0\"",
    ];
    let dump = Inspector::dump_fibers(runner.engine());
    assert_eq!(dump.lines().collect::<Vec<_>>(), expected);
}

#[test]
fn summary_is_one_line() {
    let report = CommitReport {
        placed: 3,
        updated: 1,
        patched: 1,
        deleted: 2,
        units: 9,
        slices: 2,
        reclaimed: 4,
    };
    insta::assert_snapshot!(
        Inspector::summary(&report),
        @"placed 3 / updated 1 (1 patched) / deleted 2 | 9 units in 2 slices | reclaimed 4"
    );
}

#[test]
fn observe_tracks_new_commits_once() {
    let mut runner = Runner::new(RunnerConfig::default());
    let mut inspector = Inspector::new();
    runner.mount(app()).unwrap();
    runner.run_until_idle().unwrap();

    inspector.observe(runner.engine());
    inspector.observe(runner.engine());
    assert_eq!(inspector.hud.commit_count(), 1);
    let metrics = inspector.hud.metrics.clone().unwrap();
    assert_eq!(metrics.live_fibers, runner.engine().tree().len());
    assert_eq!(metrics.live_fibers, 8);
    assert!(inspector.hud.line().starts_with("commits: 1"));

    let h1 = runner
        .document()
        .find_by_tag(runner.container(), "h1")
        .unwrap();
    runner.dispatch(h1, "click");
    runner.run_until_idle().unwrap();
    inspector.toggle();
    inspector.observe(runner.engine());
    assert_eq!(inspector.hud.commit_count(), 1);

    inspector.toggle();
    inspector.observe(runner.engine());
    assert_eq!(inspector.hud.commit_count(), 2);
}
