use vdom_core::{
    ComponentHandle, Element, Event, HostNodeId, HostOp, InstanceId, MemoryHost, RenderError,
    Root,
};

/// Headless harness for exercising render roots in tests.
///
/// `TestRoot` owns a [`Root`] over a [`MemoryHost`] with a `root` container
/// and keeps the content builder around so the same tree can be rendered
/// again without the test rebuilding it.
pub struct TestRoot {
    root: Root<MemoryHost>,
    content: Option<Box<dyn Fn() -> Element>>, // Rebuilt on every rerender.
}

impl TestRoot {
    pub fn new() -> Self {
        let (host, mount) = MemoryHost::with_container("root");
        Self {
            root: Root::new(host, mount),
            content: None,
        }
    }

    /// Install `content` and render it.
    pub fn set_content(&mut self, content: impl Fn() -> Element + 'static) -> Result<(), RenderError> {
        self.content = Some(Box::new(content));
        self.rerender()
    }

    /// Render the installed content again.
    pub fn rerender(&mut self) -> Result<(), RenderError> {
        match self.content.as_ref() {
            Some(content) => self.root.render(content()),
            None => Ok(()),
        }
    }

    /// Render a one-off element; installed content is left as is.
    pub fn render(&self, element: impl Into<Element>) -> Result<(), RenderError> {
        self.root.render(element)
    }

    pub fn unmount(&mut self) -> Result<(), RenderError> {
        self.content = None;
        self.root.unmount()
    }

    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }

    pub fn root(&self) -> &Root<MemoryHost> {
        &self.root
    }

    pub fn mount_node(&self) -> HostNodeId {
        self.root.mount_node()
    }

    /// Host node of whatever is rendered at the top.
    pub fn root_node(&self) -> Option<HostNodeId> {
        self.root.root_host_node().ok().flatten()
    }

    pub fn current(&self) -> Option<InstanceId> {
        self.root.current()
    }

    /// Handle of the top-level class component, if one is rendered there.
    pub fn top_handle(&self) -> Option<ComponentHandle> {
        let id = self.root.current()?;
        self.handle_of(id)
    }

    pub fn handle_of(&self, id: InstanceId) -> Option<ComponentHandle> {
        self.root
            .with_store(|store| {
                store
                    .get(id)
                    .ok()
                    .and_then(|instance| instance.component())
                    .map(|state| state.context().handle())
            })
            .ok()
            .flatten()
    }

    pub fn host<R>(&self, f: impl FnOnce(&MemoryHost) -> R) -> R {
        match self.root.with_host(f) {
            Ok(value) => value,
            Err(err) => panic!("host is busy: {err}"),
        }
    }

    pub fn take_ops(&self) -> Vec<HostOp> {
        match self.root.with_host_mut(MemoryHost::take_ops) {
            Ok(ops) => ops,
            Err(err) => panic!("host is busy: {err}"),
        }
    }

    pub fn text_content(&self) -> String {
        let mount = self.mount_node();
        self.host(|host| host.text_content(mount))
    }

    pub fn dump_tree(&self) -> String {
        let mount = self.mount_node();
        self.host(|host| host.dump_tree(Some(mount)))
    }

    /// Host nodes below the mount node carrying `tag`, in document order.
    pub fn find_by_tag(&self, tag: &str) -> Vec<HostNodeId> {
        let mount = self.mount_node();
        self.host(|host| {
            let mut found = Vec::new();
            let mut stack = host.children(mount);
            stack.reverse();
            while let Some(node) = stack.pop() {
                if host.tag(node) == Some(tag) {
                    found.push(node);
                }
                stack.extend(host.children(node).into_iter().rev());
            }
            found
        })
    }

    /// Calls every handler subscribed to `event` on `node`. Returns how many
    /// ran. Handlers are collected first so they are free to re-render.
    pub fn dispatch(&self, node: HostNodeId, event: &str) -> usize {
        let listeners = self.host(|host| host.listeners(node, event));
        let payload = Event::new(event);
        log::trace!("dispatching {event} to {} handler(s) on {node}", listeners.len());
        for listener in &listeners {
            listener.call(&payload);
        }
        listeners.len()
    }
}

impl Default for TestRoot {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for tests that only need temporary access to a
/// `TestRoot`.
pub fn run_test_root<R>(f: impl FnOnce(&mut TestRoot) -> R) -> R {
    let mut root = TestRoot::new();
    f(&mut root)
}
