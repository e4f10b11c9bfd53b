#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    use crate::fiber::Fiber;
    use crate::prelude::*;
    use crate::props::{NODE_VALUE, PropPatch, diff_props};

    struct TestNode {
        kind: String,
        props: BTreeMap<String, String>,
        listeners: Vec<(String, EventHandler)>,
        children: Vec<usize>,
    }

    #[derive(Default)]
    struct TestHost {
        nodes: Vec<TestNode>,
        log: Vec<String>,
        released: Vec<usize>,
        fail_appends: bool,
        /// Appends allowed before the host starts refusing them.
        appends_left: Option<usize>,
    }

    impl TestHost {
        fn node(&mut self, id: usize) -> Result<&mut TestNode, HostError> {
            self.nodes
                .get_mut(id)
                .ok_or_else(|| HostError::UnknownNode(id.to_string()))
        }

        fn text(&self, id: usize) -> String {
            let node = &self.nodes[id];
            if node.kind == "#text" {
                return node.props.get(NODE_VALUE).cloned().unwrap_or_default();
            }
            node.children.iter().map(|c| self.text(*c)).collect()
        }

        fn dispatch(&self, id: usize, event: &str) {
            let handlers: Vec<EventHandler> = self.nodes[id]
                .listeners
                .iter()
                .filter(|(name, _)| name == event)
                .map(|(_, h)| h.clone())
                .collect();
            for h in handlers {
                h.call(&Event::new(event));
            }
        }
    }

    impl HostAdapter for TestHost {
        type Node = usize;

        fn create_node(&mut self, kind: NodeKind<'_>) -> Result<usize, HostError> {
            let kind = match kind {
                NodeKind::Element(tag) => tag.to_string(),
                NodeKind::Text => "#text".to_string(),
            };
            self.log.push(format!("create {kind}"));
            self.nodes.push(TestNode {
                kind,
                props: BTreeMap::new(),
                listeners: Vec::new(),
                children: Vec::new(),
            });
            Ok(self.nodes.len() - 1)
        }

        fn set_prop(
            &mut self,
            node: &usize,
            name: &str,
            value: &PropValue,
        ) -> Result<(), HostError> {
            self.node(*node)?
                .props
                .insert(name.to_string(), value.to_string());
            self.log.push(format!("set {node}.{name}={value}"));
            Ok(())
        }

        fn remove_prop(&mut self, node: &usize, name: &str) -> Result<(), HostError> {
            self.node(*node)?.props.remove(name);
            self.log.push(format!("unset {node}.{name}"));
            Ok(())
        }

        fn add_listener(
            &mut self,
            node: &usize,
            event: &str,
            handler: &EventHandler,
        ) -> Result<(), HostError> {
            self.node(*node)?
                .listeners
                .push((event.to_string(), handler.clone()));
            self.log.push(format!("listen {node}.{event}"));
            Ok(())
        }

        fn remove_listener(
            &mut self,
            node: &usize,
            event: &str,
            handler: &EventHandler,
        ) -> Result<(), HostError> {
            self.node(*node)?
                .listeners
                .retain(|(name, h)| !(name == event && h == handler));
            self.log.push(format!("unlisten {node}.{event}"));
            Ok(())
        }

        fn append_child(&mut self, parent: &usize, child: &usize) -> Result<(), HostError> {
            if self.fail_appends || self.appends_left == Some(0) {
                return Err(HostError::Rejected("appends disabled".into()));
            }
            if let Some(left) = &mut self.appends_left {
                *left -= 1;
            }
            self.node(*parent)?.children.push(*child);
            self.log.push(format!("append {parent}<-{child}"));
            Ok(())
        }

        fn remove_child(&mut self, parent: &usize, child: &usize) -> Result<(), HostError> {
            let node = self.node(*parent)?;
            let pos = node
                .children
                .iter()
                .position(|c| c == child)
                .ok_or_else(|| HostError::NotAChild {
                    parent: parent.to_string(),
                    child: child.to_string(),
                })?;
            node.children.remove(pos);
            self.log.push(format!("remove {parent}-{child}"));
            Ok(())
        }

        fn release_node(&mut self, node: &usize) {
            self.released.push(*node);
        }
    }

    fn engine() -> (Engine<TestHost>, usize) {
        let mut host = TestHost::default();
        let container = host.create_node(NodeKind::Element("main")).unwrap();
        host.log.clear();
        (Engine::new(host), container)
    }

    fn list(len: usize) -> Element {
        create_element(
            "ul",
            None,
            (0..len).map(|i| create_element("li", None, children![format!("item {i}")])),
        )
    }

    fn output_nodes(engine: &Engine<TestHost>) -> Vec<usize> {
        engine
            .fibers()
            .unwrap()
            .filter_map(|(id, _)| engine.fiber(id).and_then(|f| f.dom().copied()))
            .collect()
    }

    fn Counter(_: &Props) -> Element {
        let (count, set_count) = use_state(0);
        Element::host("h1")
            .on("click", move |_| set_count.update(|c| c + 1))
            .with_children(children!["Count: ", count])
    }

    fn Wrapper(props: &Props) -> Element {
        let label = props
            .get("label")
            .map(|v| v.to_string())
            .unwrap_or_default();
        create_element("span", None, children![label])
    }

    #[test]
    fn test_value_children_become_text_elements() {
        let el = create_element("p", None, children!["a", 1, true]);

        assert_eq!(el.children().len(), 3);
        let values: Vec<_> = el
            .children()
            .iter()
            .map(|c| {
                assert_eq!(c.kind(), &ElementKind::Text);
                assert!(c.children().is_empty());
                c.props().get(NODE_VALUE).cloned()
            })
            .collect();
        assert_eq!(
            values,
            vec![
                Some(PropValue::Str("a".into())),
                Some(PropValue::Int(1)),
                Some(PropValue::Bool(true)),
            ]
        );
    }

    #[test]
    fn test_missing_props_default_to_empty() {
        let el = create_element("div", None, children![]);
        assert!(el.children().is_empty());
        assert_eq!(el.props().iter().count(), 0);

        let props = Props::new().with("id", "x");
        let with_props = create_element("div", Some(props), children!["t"]);
        assert_eq!(with_props.props().get("id"), Some(&PropValue::from("x")));
        assert_eq!(with_props.children().len(), 1);
    }

    #[test]
    fn test_component_identity_follows_function() {
        let a = Component::new(Counter);
        let b = Component::new(Counter);
        let c = Component::new(Wrapper);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.name(), "Counter");
    }

    #[test]
    fn test_first_render_commits_tree() {
        let (mut engine, root) = engine();
        engine.render(list(2), root).unwrap();

        assert!(engine.host().nodes[root].children.is_empty());
        engine.flush_sync().unwrap();

        let report = engine.last_commit().unwrap();
        assert_eq!(report.placed, 5);
        assert_eq!(report.deleted, 0);
        assert_eq!(engine.host().text(root), "item 0item 1");
        assert_eq!(engine.state(), SchedulerState::Idle);
        assert!(!engine.has_pending_work());
    }

    #[test]
    fn test_component_fibers_own_no_output_node() {
        let (mut engine, root) = engine();
        let app = create_element(
            "section",
            None,
            children![Element::component(Wrapper, Props::new().with("label", "hi"))],
        );
        engine.render(app, root).unwrap();
        engine.flush_sync().unwrap();

        let component = engine
            .fibers()
            .unwrap()
            .map(|(id, _)| id)
            .find(|id| engine.fiber(*id).unwrap().kind().is_component())
            .unwrap();
        let fiber = engine.fiber(component).unwrap();
        assert!(fiber.dom().is_none());

        // the span attaches to the section, skipping the component
        let section = engine.host().nodes[root].children[0];
        let span_fiber = engine.fiber(fiber.child().unwrap()).unwrap();
        let span = *span_fiber.dom().unwrap();
        assert_eq!(engine.host().nodes[section].children, vec![span]);
        assert_eq!(engine.host().text(root), "hi");
    }

    #[test]
    fn test_rendering_same_tree_twice_only_updates() {
        let (mut engine, root) = engine();
        engine.render(list(3), root).unwrap();
        engine.flush_sync().unwrap();
        let before = output_nodes(&engine);
        let log_len = engine.host().log.len();

        engine.render(list(3), root).unwrap();
        engine.flush_sync().unwrap();

        for (id, depth) in engine.fibers().unwrap() {
            if depth > 0 {
                assert_eq!(engine.fiber(id).unwrap().effect(), Some(EffectTag::Update));
            }
        }
        let report = engine.last_commit().unwrap();
        assert_eq!(report.placed, 0);
        assert_eq!(report.deleted, 0);
        assert_eq!(report.patched, 0);
        assert!(!report.mutated_output());
        assert_eq!(output_nodes(&engine), before);
        assert_eq!(engine.host().log.len(), log_len);
    }

    #[test]
    fn test_shrinking_children_deletes_tail() {
        let (mut engine, root) = engine();
        engine.render(list(5), root).unwrap();
        engine.flush_sync().unwrap();

        let old_ul = engine
            .fiber(engine.current_root().unwrap())
            .unwrap()
            .child()
            .unwrap();
        let old_items: Vec<FiberId> = engine.tree().children(old_ul).collect();
        let ul_node = engine.host().nodes[root].children[0];
        let kept: Vec<usize> = engine.host().nodes[ul_node].children[..2].to_vec();

        engine.render(list(2), root).unwrap();
        // root, then the list: its children are reconciled in the second unit
        assert_eq!(engine.work_loop(&UnitBudget::new(2)).unwrap(), WorkStatus::Pending);
        assert_eq!(engine.pending_deletions(), &old_items[2..]);
        for id in &old_items[2..] {
            assert_eq!(engine.fiber(*id).unwrap().effect(), Some(EffectTag::Deletion));
        }

        engine.flush_sync().unwrap();
        assert_eq!(engine.last_commit().unwrap().deleted, 3);
        assert_eq!(engine.host().nodes[ul_node].children, kept);
        assert!(engine.pending_deletions().is_empty());
        assert_eq!(engine.host().text(root), "item 0item 1");
    }

    #[test]
    fn test_kind_change_replaces_node() {
        let (mut engine, root) = engine();
        let span = create_element("span", None, children!["a"]);
        engine.render(create_element("div", None, children![span]), root).unwrap();
        engine.flush_sync().unwrap();
        let div = engine.host().nodes[root].children[0];
        let span = engine.host().nodes[div].children[0];

        let p = create_element("p", None, children!["a"]);
        engine.render(create_element("div", None, children![p]), root).unwrap();
        engine.flush_sync().unwrap();

        let report = engine.last_commit().unwrap();
        assert_eq!((report.placed, report.deleted), (2, 1));
        let children = &engine.host().nodes[div].children;
        assert_eq!(children.len(), 1);
        assert_ne!(children[0], span);
        assert_eq!(engine.host().nodes[children[0]].kind, "p");
    }

    #[test]
    fn test_deleting_component_removes_its_output() {
        let (mut engine, root) = engine();
        let with = create_element(
            "div",
            None,
            children![Element::component(Wrapper, Props::new().with("label", "x"))],
        );
        engine.render(with, root).unwrap();
        engine.flush_sync().unwrap();
        let div = engine.host().nodes[root].children[0];
        assert_eq!(engine.host().nodes[div].children.len(), 1);

        engine.render(create_element("div", None, children![]), root).unwrap();
        engine.flush_sync().unwrap();
        assert!(engine.host().nodes[div].children.is_empty());
        assert_eq!(engine.last_commit().unwrap().deleted, 1);
    }

    #[test]
    fn test_previous_generation_is_reclaimed() {
        let (mut engine, root) = engine();
        for len in [4, 1, 3] {
            engine.render(list(len), root).unwrap();
            engine.flush_sync().unwrap();
            let live = engine.fibers().unwrap().count();
            assert_eq!(engine.tree().len(), live);
        }
        assert!(engine.last_commit().unwrap().reclaimed > 0);
    }

    #[test]
    fn test_work_loop_yields_between_units() {
        let (mut engine, root) = engine();
        engine.render(list(3), root).unwrap();

        assert_eq!(engine.work_loop(&UnitBudget::new(1)).unwrap(), WorkStatus::Pending);
        assert_eq!(engine.state(), SchedulerState::Working);
        assert!(engine.host().nodes[root].children.is_empty());
        assert!(engine.current_root().is_none());

        assert_eq!(engine.work_loop(&UnitBudget::new(3)).unwrap(), WorkStatus::Pending);
        assert!(engine.host().nodes[root].children.is_empty());

        engine.flush_sync().unwrap();
        let report = engine.last_commit().unwrap();
        assert_eq!(report.slices, 3);
        assert_eq!(report.units, 8);
        assert_eq!(engine.host().text(root), "item 0item 1item 2");
    }

    #[test]
    fn test_click_updates_counter() {
        let (mut engine, root) = engine();
        engine.render(Element::component(Counter, Props::new()), root).unwrap();
        engine.flush_sync().unwrap();
        assert_eq!(engine.host().text(root), "Count: 0");

        let h1 = engine.host().nodes[root].children[0];
        engine.host().dispatch(h1, "click");
        assert!(engine.has_pending_work());
        engine.flush_sync().unwrap();

        assert_eq!(engine.host().text(root), "Count: 1");
        assert_eq!(engine.host().nodes[root].children, vec![h1]);
    }

    #[test]
    fn test_queued_updates_fold_in_order() {
        let setter: Rc<RefCell<Option<SetState<i32>>>> = Rc::default();
        let app = {
            let setter = setter.clone();
            move || {
                let setter = setter.clone();
                Element::component(
                    move |_: &Props| {
                        let (value, set) = use_state(1);
                        *setter.borrow_mut() = Some(set);
                        create_element("b", None, children![value])
                    },
                    Props::new(),
                )
            }
        };
        let (mut engine, root) = engine();
        engine.render(app(), root).unwrap();
        engine.flush_sync().unwrap();

        let set = setter.borrow().clone().unwrap();
        set.update(|v| v + 1);
        engine.flush_sync().unwrap();
        assert_eq!(engine.host().text(root), "2");

        let set = setter.borrow().clone().unwrap();
        set.update(|v| v + 1);
        set.update(|v| v * 10);
        assert_eq!(set.queued(), 2);
        engine.flush_sync().unwrap();
        assert_eq!(engine.host().text(root), "30");

        let set = setter.borrow().clone().unwrap();
        set.set(7);
        engine.flush_sync().unwrap();
        assert_eq!(engine.host().text(root), "7");
    }

    #[test]
    fn test_state_update_discards_pass_in_progress() {
        let (mut engine, root) = engine();
        let app = create_element(
            "div",
            None,
            children![Element::component(Counter, Props::new()), list(3)],
        );
        engine.render(app, root).unwrap();
        engine.flush_sync().unwrap();
        let commits = engine.commit_count();

        let div = engine.host().nodes[root].children[0];
        let h1 = engine.host().nodes[div].children[0];
        engine.host().dispatch(h1, "click");
        assert_eq!(engine.work_loop(&UnitBudget::new(2)).unwrap(), WorkStatus::Pending);
        let first = engine.wip_root().unwrap();

        // the committed handler is still the live one
        engine.host().dispatch(h1, "click");
        assert_eq!(engine.work_loop(&UnitBudget::new(1)).unwrap(), WorkStatus::Pending);
        assert_ne!(engine.wip_root().unwrap(), first);

        engine.flush_sync().unwrap();
        assert_eq!(engine.commit_count(), commits + 1);
        assert_eq!(engine.host().text(h1), "Count: 2");
    }

    #[test]
    fn test_state_update_during_first_pass_waits_for_commit() {
        let (mut engine, root) = engine();
        engine.render(Element::component(Counter, Props::new()), root).unwrap();
        engine.work_loop(&UnitBudget::new(1)).unwrap();
        engine.render_request().request();

        engine.flush_sync().unwrap();
        assert_eq!(engine.commit_count(), 2);
        assert!(!engine.render_request().is_pending());
    }

    fn Flaky(props: &Props) -> Element {
        let (a, _) = use_state(1);
        let mut sum = a;
        if props.get("extra") == Some(&PropValue::Bool(true)) {
            let (b, _) = use_state(2);
            sum += b;
        }
        create_element("i", None, children![sum])
    }

    #[test]
    fn test_hook_count_mismatch_aborts_pass() {
        let (mut engine, root) = engine();
        engine
            .render(Element::component(Flaky, Props::new().with("extra", false)), root)
            .unwrap();
        engine.flush_sync().unwrap();

        engine
            .render(Element::component(Flaky, Props::new().with("extra", true)), root)
            .unwrap();
        let err = engine.flush_sync().unwrap_err();
        assert!(matches!(
            err,
            EngineError::Hook(HookError::CountMismatch {
                expected: 1,
                found: 2,
                ..
            })
        ));
        assert!(engine.wip_root().is_none());
        assert_eq!(engine.state(), SchedulerState::Idle);
        assert_eq!(engine.host().text(root), "1");
    }

    fn Shifty(props: &Props) -> Element {
        if props.contains("text") {
            let (s, _) = use_state(String::from("s"));
            create_element("i", None, children![s])
        } else {
            let (n, _) = use_state(0);
            create_element("i", None, children![n])
        }
    }

    #[test]
    fn test_hook_kind_mismatch_aborts_pass() {
        let (mut engine, root) = engine();
        engine.render(Element::component(Shifty, Props::new()), root).unwrap();
        engine.flush_sync().unwrap();

        engine
            .render(Element::component(Shifty, Props::new().with("text", true)), root)
            .unwrap();
        let err = engine.flush_sync().unwrap_err();
        assert!(matches!(
            err,
            EngineError::Hook(HookError::KindMismatch { index: 0, .. })
        ));
        assert_eq!(engine.host().text(root), "0");
    }

    #[test]
    fn test_hooks_outside_render() {
        assert!(!crate::hooks::is_rendering());
        assert_eq!(try_use_state(0).unwrap_err(), HookError::OutsideRender);
    }

    #[test]
    #[should_panic(expected = "while a component is rendering")]
    fn test_use_state_outside_render_panics() {
        let _ = use_state(0);
    }

    #[test]
    fn test_unsupported_element_kind() {
        let (mut engine, root) = engine();
        let bogus = create_element("no such tag", None, children![]);
        engine.render(create_element("div", None, children![bogus]), root).unwrap();
        let err = engine.flush_sync().unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedElement { ref tag } if tag == "no such tag"));
        assert!(engine.host().nodes[root].children.is_empty());
        assert!(engine.current_root().is_none());
    }

    #[test]
    fn test_commit_failure_aborts_remaining_effects() {
        let (mut engine, root) = engine();
        engine.host_mut().fail_appends = true;
        engine.render(list(2), root).unwrap();

        let err = engine.flush_sync().unwrap_err();
        assert!(matches!(err, EngineError::Commit { .. }));
        assert!(engine.current_root().is_none());
        assert!(engine.wip_root().is_none());
        assert!(!engine.host().log.iter().any(|l| l.starts_with("append")));

        engine.host_mut().fail_appends = false;
        engine.render(list(2), root).unwrap();
        engine.flush_sync().unwrap();
        assert_eq!(engine.host().text(root), "item 0item 1");
    }

    fn letters(tags: [&'static str; 3], labelled: bool) -> Element {
        let items = tags.iter().zip(["a", "b", "c"]).map(|(tag, label)| {
            let text = labelled || *tag != "li";
            create_element(*tag, None, text.then_some(label))
        });
        create_element("ul", None, items)
    }

    #[test]
    fn test_failed_commit_keeps_committed_tree_in_sync() {
        let (mut engine, root) = engine();
        engine.render(letters(["li"; 3], true), root).unwrap();
        engine.flush_sync().unwrap();
        assert_eq!(engine.host().text(root), "abc");

        // removals go through before the first append fails
        engine.host_mut().fail_appends = true;
        engine.render(letters(["li", "li", "p"], false), root).unwrap();
        let err = engine.flush_sync().unwrap_err();
        assert!(matches!(err, EngineError::Commit { .. }));
        assert_eq!(engine.host().text(root), "");

        engine.host_mut().fail_appends = false;
        engine.render(letters(["li"; 3], true), root).unwrap();
        engine.flush_sync().unwrap();
        assert_eq!(engine.host().text(root), "abc");
        let report = engine.last_commit().unwrap();
        assert_eq!((report.placed, report.deleted), (4, 0));
    }

    #[test]
    fn test_failed_commit_takes_back_appended_nodes() {
        let (mut engine, root) = engine();
        engine.render(create_element("div", None, children![]), root).unwrap();
        engine.flush_sync().unwrap();
        let div = engine.host().nodes[root].children[0];

        // the span lands, then its text child is refused
        engine.host_mut().appends_left = Some(1);
        let span = create_element("span", None, children!["x"]);
        engine.render(create_element("div", None, children![span]), root).unwrap();
        assert!(engine.flush_sync().is_err());
        assert!(engine.host().nodes[div].children.is_empty());
        assert_eq!(engine.host().released.len(), 2);

        engine.host_mut().appends_left = None;
        let span = create_element("span", None, children!["x"]);
        engine.render(create_element("div", None, children![span]), root).unwrap();
        engine.flush_sync().unwrap();
        assert_eq!(engine.host().text(root), "x");
        assert_eq!(engine.host().nodes[div].children.len(), 1);
    }

    #[test]
    fn test_deleted_and_discarded_nodes_are_released() {
        let (mut engine, root) = engine();
        engine.render(list(3), root).unwrap();
        engine.flush_sync().unwrap();
        let ul = engine.host().nodes[root].children[0];
        let tail: Vec<usize> = engine.host().nodes[ul].children[1..].to_vec();

        engine.render(list(1), root).unwrap();
        engine.flush_sync().unwrap();
        assert_eq!(engine.host().released, tail);

        // a pass dropped before commit hands back what it created
        engine.host_mut().released.clear();
        engine.render(list(2), root).unwrap();
        // root, list, first item and its text, then the new item
        engine.work_loop(&UnitBudget::new(5)).unwrap();
        let new_item = engine.host().nodes.len() - 1;
        assert_eq!(engine.host().nodes[new_item].kind, "li");
        engine.render(list(1), root).unwrap();
        engine.flush_sync().unwrap();
        assert_eq!(engine.host().released, vec![new_item]);
        assert_eq!(engine.host().text(root), "item 0");
    }

    #[test]
    fn test_root_without_container_cannot_own_a_node() {
        let (mut engine, _) = engine();
        let root = Fiber::new(FiberKind::Root, Rc::new(Props::new()), None);
        let id = engine.tree.insert(root);

        let err = engine.perform_unit_of_work(id).unwrap_err();
        assert!(matches!(err, EngineError::NotAHostFiber(fiber, "root") if fiber == id));
        assert!(err.to_string().ends_with("(root) cannot own an output node"));
        assert!(engine.host().log.is_empty());
    }

    #[test]
    fn test_prop_patch_order() {
        let prev = Props::new()
            .on("click", |_| {})
            .with("title", "a")
            .with("stale", "x");
        let next = Props::new()
            .on("click", |_| {})
            .with("title", "b")
            .with("children", "ignored");

        let kinds: Vec<&str> = diff_props(&prev, &next)
            .iter()
            .map(|p| match p {
                PropPatch::RemoveListener { .. } => "remove-listener",
                PropPatch::RemoveAttr { .. } => "remove-attr",
                PropPatch::SetAttr { .. } => "set-attr",
                PropPatch::AddListener { .. } => "add-listener",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["remove-listener", "remove-attr", "set-attr", "add-listener"]
        );

        assert!(diff_props(&next, &next).is_empty());
    }

    #[test]
    fn test_event_key_naming() {
        assert!(crate::props::is_event_key("onClick"));
        assert!(!crate::props::is_event_key("on"));
        assert!(!crate::props::is_property_key("children"));
        assert_eq!(crate::props::event_name("onMouseDown"), "mousedown");
        assert_eq!(crate::props::event_key("click"), "onClick");
    }

    #[test]
    fn test_teardown_stops_engine() {
        let (mut engine, root) = engine();
        engine.render(list(2), root).unwrap();
        engine.teardown();

        assert!(engine.is_torn_down());
        assert!(!engine.has_pending_work());
        assert!(engine.tree().is_empty());
        assert!(matches!(engine.render(list(1), root), Err(EngineError::TornDown)));
        assert!(matches!(
            engine.work_loop(&Unbounded),
            Err(EngineError::TornDown)
        ));
    }
}
