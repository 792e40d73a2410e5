use vdom_core::{
    create_element, Child, Component, Context, Element, Event, MemoryHost, Props, RenderError,
    Root, State, Value, NODE_VALUE, TEXT_ELEMENT,
};

/// The sample document: a titled `div` with an empty description.
fn tree_data() -> Element {
    create_element(
        "div",
        Props::new().with("id", "div1").with("className", "top-level"),
        [
            create_element(
                "h3",
                Props::new().with("name", "h3"),
                [create_element(
                    TEXT_ELEMENT,
                    Props::new().with(NODE_VALUE, "Webpack"),
                    Vec::<Child>::new(),
                )],
            ),
            create_element(
                "span",
                Props::new().with("className", "desc"),
                [create_element(TEXT_ELEMENT, Props::new(), Vec::<Child>::new())],
            ),
        ],
    )
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
        let label = cx.props().get("label").cloned().unwrap_or_default();
        let handle = cx.handle();
        Element::host("div")
            .prop("className", "counter")
            .child(Element::host("span").child(label))
            .child(
                Element::host("button")
                    .on("click", move |_| {
                        if let Err(err) = handle.set_state(State::new().with("count", count + 1)) {
                            log::error!("counter update failed: {err}");
                        }
                    })
                    .child(count),
            )
            .build()
    }

    fn component_did_mount(&mut self, cx: &Context) {
        log::info!("counter {} mounted", cx.handle().id());
    }

    fn component_did_update(&mut self, cx: &Context) {
        log::debug!(
            "counter now at {}",
            cx.state().get("count").cloned().unwrap_or_default()
        );
    }
}

fn click_all(root: &Root<MemoryHost>, tag: &str) -> Result<usize, RenderError> {
    let mount = root.mount_node();
    let handlers = root.with_host(|host| {
        let mut handlers = Vec::new();
        let mut stack = vec![mount];
        while let Some(node) = stack.pop() {
            if host.tag(node) == Some(tag) {
                handlers.extend(host.listeners(node, "click"));
            }
            stack.extend(host.children(node));
        }
        handlers
    })?;
    let event = Event::new("click");
    for handler in &handlers {
        handler.call(&event);
    }
    Ok(handlers.len())
}

fn run() -> Result<(), RenderError> {
    let (host, mount) = MemoryHost::with_container("app");
    let root = Root::new(host, mount);

    println!("=== vdom tree demo ===");
    root.render(tree_data())?;
    let created = root.with_host(|host| host.mutation_count())?;
    println!("{}", root.with_host(|host| host.dump_tree(Some(mount)))?);
    println!("initial render: {created} host operations");
    root.with_host_mut(MemoryHost::take_ops)?;

    root.render(tree_data())?;
    let repeated = root.with_host(|host| host.mutation_count())?;
    println!("identical re-render: {repeated} host operations");

    root.render(Element::class::<Counter>().prop("label", "clicks: "))?;
    root.with_host_mut(MemoryHost::take_ops)?;
    for _ in 0..3 {
        click_all(&root, "button")?;
    }
    let ops = root.with_host_mut(MemoryHost::take_ops)?;
    println!("{}", root.with_host(|host| host.dump_tree(Some(mount)))?);
    println!("three clicks: {} host operations", ops.len());
    println!(
        "instances: {}",
        root.with_store(|store| store.dump_tree(root.current()))?
    );

    root.unmount()?;
    println!(
        "after unmount: {}",
        root.with_host(|host| host.dump_tree(Some(mount)))?
    );
    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(err) = run() {
        log::error!("demo failed: {err}");
        std::process::exit(1);
    }
}
