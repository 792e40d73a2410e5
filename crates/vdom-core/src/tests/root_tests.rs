use super::*;
use crate::component::{Component, ComponentHandle, Context, Lifecycle};
use crate::element::Props;
use crate::host::{HostNodeId, HostOp, MemoryHost};
use crate::value::{Event, EventHandler, Value};
use crate::NODE_VALUE;

thread_local! {
    static EVENTS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    static EAGER_RESULT: RefCell<Option<Result<(), RenderError>>> = const { RefCell::new(None) };
    static REENTRANT_RESULT: RefCell<Option<Result<(), RenderError>>> = const { RefCell::new(None) };
    static SHARED_ROOT: RefCell<Option<Rc<Root<MemoryHost>>>> = const { RefCell::new(None) };
}

fn record(entry: String) {
    EVENTS.with(|events| events.borrow_mut().push(entry));
}

fn take_events() -> Vec<String> {
    EVENTS.with(|events| std::mem::take(&mut *events.borrow_mut()))
}

fn memory_root() -> (Root<MemoryHost>, HostNodeId) {
    let (host, mount) = MemoryHost::with_container("root");
    (Root::new(host, mount), mount)
}

fn take_ops(root: &Root<MemoryHost>) -> Vec<HostOp> {
    root.with_host_mut(MemoryHost::take_ops).unwrap()
}

fn text_of(root: &Root<MemoryHost>) -> String {
    let mount = root.mount_node();
    root.with_host(|host| host.text_content(mount)).unwrap()
}

fn top_handle(root: &Root<MemoryHost>) -> ComponentHandle {
    let id = root.current().expect("something rendered");
    root.with_store(|store| {
        store
            .get(id)
            .unwrap()
            .component()
            .expect("class instance")
            .context()
            .handle()
    })
    .unwrap()
}

fn click(root: &Root<MemoryHost>, node: HostNodeId) {
    let listeners = root.with_host(|host| host.listeners(node, "click")).unwrap();
    for listener in listeners {
        listener.call(&Event::new("click"));
    }
}

/// Shows state keys `a` and `b` as `a-b`.
struct Probe;

impl Component for Probe {
    fn create(_props: &Props) -> Self {
        Probe
    }

    fn initial_state(&self) -> State {
        State::new().with("a", 1)
    }

    fn render(&self, cx: &Context) -> Element {
        let a = cx.state().get("a").cloned().unwrap_or_default();
        let b = cx.state().get("b").cloned().unwrap_or_default();
        Element::host("p").child(format!("{a}-{b}")).build()
    }
}

/// Records every lifecycle hook under its `name` prop.
struct Logged {
    name: String,
}

impl Component for Logged {
    fn create(props: &Props) -> Self {
        Self {
            name: props.get("name").map(ToString::to_string).unwrap_or_default(),
        }
    }

    fn render(&self, cx: &Context) -> Element {
        Element::host("section")
            .children(cx.props().children().iter().cloned())
            .build()
    }

    fn component_will_mount(&mut self, _cx: &Context) {
        record(format!("will_mount:{}", self.name));
    }

    fn component_did_mount(&mut self, _cx: &Context) {
        record(format!("did_mount:{}", self.name));
    }

    fn component_did_update(&mut self, _cx: &Context) {
        record(format!("did_update:{}", self.name));
    }

    fn component_will_unmount(&mut self, _cx: &Context) {
        record(format!("will_unmount:{}", self.name));
    }
}

struct Counter;

impl Component for Counter {
    fn create(_props: &Props) -> Self {
        Counter
    }

    fn initial_state(&self) -> State {
        State::new().with("count", 0)
    }

    fn render(&self, cx: &Context) -> Element {
        let count = cx.state().get("count").and_then(Value::as_int).unwrap_or(0);
        let handle = cx.handle();
        Element::host("button")
            .on("click", move |_| {
                handle
                    .set_state(State::new().with("count", count + 1))
                    .expect("click updates state");
            })
            .child(count)
            .build()
    }
}

/// Never re-renders after mounting.
struct Frozen;

impl Component for Frozen {
    fn create(_props: &Props) -> Self {
        Frozen
    }

    fn render(&self, cx: &Context) -> Element {
        Element::host("p")
            .child(cx.props().get("label").cloned().unwrap_or_default())
            .build()
    }

    fn should_component_update(&self, _cx: &Context, _next_props: &Props) -> bool {
        false
    }

    fn component_did_update(&mut self, _cx: &Context) {
        record("did_update:frozen".into());
    }
}

/// Asks for a state change as soon as it is mounted.
struct SelfStarting;

impl Component for SelfStarting {
    fn create(_props: &Props) -> Self {
        SelfStarting
    }

    fn render(&self, cx: &Context) -> Element {
        let ready = cx.state().get("ready").and_then(Value::as_bool).unwrap_or(false);
        Element::host("p")
            .child(if ready { "ready" } else { "waiting" })
            .build()
    }

    fn component_will_mount(&mut self, cx: &Context) {
        EAGER_RESULT.with(|slot| *slot.borrow_mut() = Some(cx.set_state(State::new())));
    }

    fn component_did_mount(&mut self, cx: &Context) {
        cx.set_state(State::new().with("ready", true))
            .expect("queued during the pass");
        record("did_mount:self_starting".into());
    }

    fn component_did_update(&mut self, _cx: &Context) {
        record("did_update:self_starting".into());
    }
}

/// Asks for a state change from its first render.
struct Eager;

impl Component for Eager {
    fn create(_props: &Props) -> Self {
        Eager
    }

    fn render(&self, cx: &Context) -> Element {
        if cx.handle().lifecycle() == Lifecycle::Constructed {
            let result = cx.set_state(State::new().with("n", 7));
            EAGER_RESULT.with(|slot| *slot.borrow_mut() = Some(result));
        }
        let n = cx.state().get("n").and_then(Value::as_int).unwrap_or(0);
        Element::host("p").child(n).build()
    }
}

/// Swaps its output element type when `wide` is set.
struct Toggle;

impl Component for Toggle {
    fn create(_props: &Props) -> Self {
        Toggle
    }

    fn render(&self, cx: &Context) -> Element {
        let wide = cx.state().get("wide").and_then(Value::as_bool).unwrap_or(false);
        Element::host(if wide { "section" } else { "p" })
            .child("body")
            .build()
    }
}

/// Tries to render its own root from inside a hook.
struct Reentrant;

impl Component for Reentrant {
    fn create(_props: &Props) -> Self {
        Reentrant
    }

    fn render(&self, _cx: &Context) -> Element {
        Element::host("div").build()
    }

    fn component_did_mount(&mut self, _cx: &Context) {
        let result = SHARED_ROOT.with(|slot| {
            slot.borrow()
                .as_ref()
                .map(|root| root.render(Element::host("p")))
        });
        REENTRANT_RESULT.with(|slot| *slot.borrow_mut() = result);
    }
}

#[test]
fn text_update_sets_node_value_in_place() {
    let (root, mount) = memory_root();
    root.render(Element::host("div").child("hello")).unwrap();
    let div = root.root_host_node().unwrap().unwrap();
    let text = root.with_host(|host| host.children(div)[0]).unwrap();
    take_ops(&root);

    root.render(Element::host("div").child("world")).unwrap();

    assert_eq!(
        take_ops(&root),
        vec![HostOp::SetProperty {
            node: text,
            name: NODE_VALUE.into()
        }]
    );
    assert_eq!(root.with_host(|host| host.children(mount)).unwrap(), vec![div]);
    assert_eq!(text_of(&root), "world");
}

#[test]
fn rendering_the_same_tree_twice_is_free() {
    let (root, _) = memory_root();
    let tree = || {
        Element::host("div")
            .prop("className", "top")
            .child(Element::host("h3").child("title"))
            .child(Element::host("span").prop("className", "desc").child(3))
            .build()
    };
    root.render(tree()).unwrap();
    take_ops(&root);

    root.render(tree()).unwrap();

    assert!(take_ops(&root).is_empty());
}

#[test]
fn attribute_changes_touch_only_that_attribute() {
    let (root, _) = memory_root();
    root.render(Element::host("div").prop("id", "a").prop("title", "t"))
        .unwrap();
    let div = root.root_host_node().unwrap().unwrap();
    take_ops(&root);

    root.render(Element::host("div").prop("id", "b")).unwrap();

    assert_eq!(
        take_ops(&root),
        vec![
            HostOp::ClearProperty {
                node: div,
                name: "title".into()
            },
            HostOp::SetProperty {
                node: div,
                name: "id".into()
            },
        ]
    );
}

#[test]
fn replacing_a_handler_leaves_only_the_new_one() {
    let (root, _) = memory_root();
    let first = EventHandler::new(|_| record("first".into()));
    let second = EventHandler::new(|_| record("second".into()));
    root.render(Element::host("button").prop("onClick", first))
        .unwrap();
    let button = root.root_host_node().unwrap().unwrap();

    root.render(Element::host("button").prop("onClick", second))
        .unwrap();
    click(&root, button);

    assert_eq!(take_events(), vec!["second"]);
}

#[test]
fn set_state_merges_shallowly() {
    let (root, _) = memory_root();
    root.render(Element::class::<Probe>()).unwrap();
    assert_eq!(text_of(&root), "1-");
    let handle = top_handle(&root);

    handle.set_state(State::new().with("b", 2)).unwrap();
    assert_eq!(text_of(&root), "1-2");

    handle.set_state(State::new().with("a", 5)).unwrap();
    assert_eq!(text_of(&root), "5-2");
}

#[test]
fn set_state_rerenders_with_a_single_text_mutation() {
    let (root, _) = memory_root();
    root.render(Element::class::<Probe>()).unwrap();
    let p = root.root_host_node().unwrap().unwrap();
    let text = root.with_host(|host| host.children(p)[0]).unwrap();
    take_ops(&root);

    top_handle(&root)
        .set_state(State::new().with("b", 7))
        .unwrap();

    assert_eq!(
        take_ops(&root),
        vec![HostOp::SetProperty {
            node: text,
            name: NODE_VALUE.into()
        }]
    );
}

#[test]
fn event_handlers_drive_state_updates() {
    let (root, _) = memory_root();
    root.render(Element::class::<Counter>()).unwrap();
    let button = root.root_host_node().unwrap().unwrap();

    click(&root, button);
    click(&root, button);

    assert_eq!(text_of(&root), "2");
    assert_eq!(root.root_host_node().unwrap(), Some(button));
    assert_eq!(
        root.with_host(|host| host.listeners(button, "click").len())
            .unwrap(),
        1
    );
}

#[test]
fn set_state_before_mount_is_rejected() {
    let (root, _) = memory_root();

    root.render(Element::class::<SelfStarting>()).unwrap();

    let eager = EAGER_RESULT.with(|slot| slot.borrow_mut().take());
    assert!(matches!(
        eager,
        Some(Err(RenderError::InvalidLifecycleState {
            status: Lifecycle::Constructed,
            ..
        }))
    ));
}

#[test]
fn set_state_from_the_first_render_is_rejected() {
    let (root, _) = memory_root();

    root.render(Element::class::<Eager>()).unwrap();

    let eager = EAGER_RESULT.with(|slot| slot.borrow_mut().take());
    assert!(matches!(
        eager,
        Some(Err(RenderError::InvalidLifecycleState {
            status: Lifecycle::Constructed,
            ..
        }))
    ));
    assert_eq!(text_of(&root), "0");
}

#[test]
fn set_state_during_did_mount_commits_after_the_pass() {
    let (root, _) = memory_root();

    root.render(Element::class::<SelfStarting>()).unwrap();

    assert_eq!(text_of(&root), "ready");
    assert_eq!(
        take_events(),
        vec!["did_mount:self_starting", "did_update:self_starting"]
    );
}

#[test]
fn set_state_after_unmount_is_rejected() {
    let (root, mount) = memory_root();
    root.render(Element::class::<Probe>()).unwrap();
    let handle = top_handle(&root);

    root.unmount().unwrap();

    assert_eq!(handle.lifecycle(), Lifecycle::Unmounted);
    let err = handle.set_state(State::new().with("b", 1)).unwrap_err();
    assert_eq!(
        err,
        RenderError::InvalidLifecycleState {
            id: handle.id(),
            status: Lifecycle::Unmounted
        }
    );
    assert!(root.with_host(|host| host.children(mount)).unwrap().is_empty());
    assert_eq!(root.current(), None);
}

#[test]
fn set_state_after_the_root_is_gone_is_rejected() {
    let (root, _) = memory_root();
    root.render(Element::class::<Probe>()).unwrap();
    let handle = top_handle(&root);

    drop(root);

    assert!(matches!(
        handle.set_state(State::new()),
        Err(RenderError::InvalidLifecycleState { .. })
    ));
}

#[test]
fn lifecycle_hooks_fire_in_tree_order() {
    let (root, _) = memory_root();
    let tree = || {
        Element::class::<Logged>()
            .prop("name", "outer")
            .child(Element::class::<Logged>().prop("name", "inner"))
    };

    root.render(tree()).unwrap();
    assert_eq!(
        take_events(),
        vec![
            "will_mount:outer",
            "will_mount:inner",
            "did_mount:inner",
            "did_mount:outer"
        ]
    );

    root.render(tree()).unwrap();
    assert_eq!(take_events(), vec!["did_update:inner", "did_update:outer"]);

    root.unmount().unwrap();
    assert_eq!(
        take_events(),
        vec!["will_unmount:outer", "will_unmount:inner"]
    );
}

#[test]
fn update_guard_keeps_output_but_takes_new_props() {
    let (root, _) = memory_root();
    root.render(Element::class::<Frozen>().prop("label", "a"))
        .unwrap();
    take_ops(&root);

    root.render(Element::class::<Frozen>().prop("label", "b"))
        .unwrap();

    assert!(take_ops(&root).is_empty());
    assert_eq!(text_of(&root), "a");
    assert!(take_events().is_empty());
    let id = root.current().unwrap();
    let label = root
        .with_store(|store| {
            store
                .get(id)
                .unwrap()
                .component()
                .unwrap()
                .context()
                .props()
                .get("label")
                .cloned()
        })
        .unwrap();
    assert_eq!(label, Some(Value::from("b")));
}

#[test]
fn component_output_type_change_replaces_under_the_mount() {
    let (root, mount) = memory_root();
    root.render(Element::class::<Toggle>()).unwrap();
    let id = root.current();
    let before = root.root_host_node().unwrap().unwrap();
    take_ops(&root);

    top_handle(&root)
        .set_state(State::new().with("wide", true))
        .unwrap();

    let after = root.root_host_node().unwrap().unwrap();
    let replaces: Vec<_> = take_ops(&root)
        .into_iter()
        .filter(|op| matches!(op, HostOp::Replace { .. }))
        .collect();
    assert_eq!(
        replaces,
        vec![HostOp::Replace {
            parent: mount,
            old: before,
            new: after
        }]
    );
    assert_eq!(root.current(), id);
    let tag = root
        .with_host(|host| host.tag(after).map(str::to_owned))
        .unwrap();
    assert_eq!(tag.as_deref(), Some("section"));
}

#[test]
fn same_function_component_is_updated_not_replaced() {
    fn greeting(props: &Props) -> Element {
        Element::host("span")
            .child(props.get("name").cloned().unwrap_or_default())
            .build()
    }
    let (root, _) = memory_root();
    root.render(Element::function(greeting).prop("name", "ann"))
        .unwrap();
    let id = root.current();

    root.render(Element::function(greeting).prop("name", "bob"))
        .unwrap();

    assert_eq!(root.current(), id);
    assert_eq!(text_of(&root), "bob");
}

#[test]
fn switching_component_types_unmounts_the_old_one() {
    let (root, _) = memory_root();
    root.render(Element::class::<Logged>().prop("name", "old"))
        .unwrap();
    let old = root.current();
    take_events();

    root.render(Element::class::<Probe>()).unwrap();

    assert_ne!(root.current(), old);
    assert_eq!(take_events(), vec!["will_unmount:old"]);
    assert_eq!(text_of(&root), "1-");
}

#[test]
fn rendering_from_inside_a_pass_is_rejected() {
    let (host, mount) = MemoryHost::with_container("root");
    let root = Rc::new(Root::new(host, mount));
    SHARED_ROOT.with(|slot| *slot.borrow_mut() = Some(Rc::clone(&root)));

    root.render(Element::class::<Reentrant>()).unwrap();

    let result = REENTRANT_RESULT.with(|slot| slot.borrow_mut().take());
    assert_eq!(result, Some(Err(RenderError::ReentrantRender)));
    SHARED_ROOT.with(|slot| slot.borrow_mut().take());
}

#[test]
fn failed_pass_leaves_the_root_usable() {
    let (root, _) = memory_root();
    root.render(Element::host("div").child("kept")).unwrap();

    let err = root.render(Element::host("not a tag")).unwrap_err();
    assert!(matches!(err, RenderError::UnrecognizedElementType { .. }));

    root.render(Element::host("div").child("again")).unwrap();
    assert!(text_of(&root).contains("again"));
}

#[test]
fn failed_child_update_keeps_the_tree_consistent() {
    let (root, _) = memory_root();
    root.render(Element::host("div").child(Element::host("a")).child(Element::host("b")))
        .unwrap();

    let err = root
        .render(
            Element::host("div")
                .child(Element::host("p"))
                .child(Element::host("bad tag")),
        )
        .unwrap_err();
    assert!(matches!(err, RenderError::UnrecognizedElementType { .. }));

    root.render(Element::host("div").child("ok")).unwrap();
    assert_eq!(text_of(&root), "ok");
    root.unmount().unwrap();
    assert!(root.with_store(|store| store.is_empty()).unwrap());
}

#[test]
fn roots_are_independent() {
    let (first, _) = memory_root();
    let (second, _) = memory_root();

    first.render(Element::host("p").child("one")).unwrap();
    second.render(Element::host("p").child("two")).unwrap();
    first.render(Element::host("p").child("uno")).unwrap();

    assert_eq!(text_of(&first), "uno");
    assert_eq!(text_of(&second), "two");
}
