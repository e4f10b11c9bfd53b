#![allow(non_snake_case)]

use anyhow::Context;
use ember_core::prelude::*;
use ember_devtools::Inspector;
use ember_platform::run_headless_app;

fn Counter(props: &Props) -> Element {
    let step = match props.get("step") {
        Some(PropValue::Int(step)) => *step,
        _ => 1,
    };
    let (count, set_count) = use_state(0i64);
    create_element(
        "div",
        None,
        children![
            Element::host("h1").with_children(children!["Count: ", count]),
            Element::host("button")
                .with_prop("id", "inc")
                .on("click", {
                    let set_count = set_count.clone();
                    move |_| set_count.update(move |c| c + step)
                })
                .child("Increment"),
            Element::host("button")
                .with_prop("id", "dec")
                .on("click", move |_| set_count.update(move |c| c - step))
                .child("Decrement"),
        ],
    )
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let mut runner = run_headless_app(Element::component(Counter, Props::new().with("step", 1)))?;
    let mut inspector = Inspector::new();
    inspector.observe(runner.engine());
    println!("{}", runner.markup());

    let buttons = runner.document().children(
        runner
            .document()
            .find_by_tag(runner.container(), "div")
            .context("counter did not render")?,
    );
    let (inc, dec) = match buttons {
        [_, inc, dec] => (*inc, *dec),
        _ => anyhow::bail!("unexpected counter markup: {}", runner.markup()),
    };

    for node in [inc, inc, inc, dec] {
        runner.dispatch(node, "click");
        runner.run_until_idle()?;
        inspector.observe(runner.engine());
        println!("{}", runner.markup());
    }

    println!("{}", inspector.hud.line());
    print!("{}", Inspector::dump_fibers(runner.engine()));
    runner.teardown();
    Ok(())
}
