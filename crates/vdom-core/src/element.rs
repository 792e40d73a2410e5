//! Immutable element descriptions.
//!
//! An [`Element`] describes what should be on screen for one render pass.
//! Elements are cheap to clone and are never mutated after construction;
//! every pass builds a fresh tree and hands it to the reconciler.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::component::{Component, ComponentClass, FunctionComponent};
use crate::value::{Event, EventHandler, Value};

/// Name used for the text marker in debug output.
pub const TEXT_ELEMENT: &str = "TEXT_ELEMENT";

/// Property name carrying the content of a text element.
pub const NODE_VALUE: &str = "nodeValue";

pub(crate) const CHILDREN: &str = "children";

#[derive(Clone, PartialEq)]
pub enum ElementType {
    Host(String),
    Text,
    Function(FunctionComponent),
    Class(ComponentClass),
}

impl ElementType {
    pub fn is_composite(&self) -> bool {
        matches!(self, ElementType::Function(_) | ElementType::Class(_))
    }

    pub fn name(&self) -> &str {
        match self {
            ElementType::Host(tag) => tag,
            ElementType::Text => TEXT_ELEMENT,
            ElementType::Function(function) => function.name(),
            ElementType::Class(class) => class.name(),
        }
    }
}

impl fmt::Debug for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Host(tag) => write!(f, "Host({tag:?})"),
            ElementType::Text => f.write_str("Text"),
            ElementType::Function(function) => write!(f, "Function({})", function.name()),
            ElementType::Class(class) => write!(f, "Class({})", class.name()),
        }
    }
}

/// Strings name host tags, except the text marker which names [`ElementType::Text`].
impl From<&str> for ElementType {
    fn from(tag: &str) -> Self {
        if tag == TEXT_ELEMENT {
            ElementType::Text
        } else {
            ElementType::Host(tag.to_owned())
        }
    }
}

impl From<String> for ElementType {
    fn from(tag: String) -> Self {
        if tag == TEXT_ELEMENT {
            ElementType::Text
        } else {
            ElementType::Host(tag)
        }
    }
}

/// Element properties: an insertion-ordered map of named values plus the
/// ordered child sequence. `children` is never stored as a plain property.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props {
    values: IndexMap<String, Value>,
    children: Vec<Element>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        if name == CHILDREN {
            log::warn!("ignoring `children` set as a plain property; pass children explicitly");
            return;
        }
        self.values.insert(name, value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Named properties in insertion order, `children` excluded.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub(crate) fn set_children(&mut self, children: Vec<Element>) {
        self.children = children;
    }
}

struct ElementInner {
    element_type: ElementType,
    props: Props,
}

#[derive(Clone)]
pub struct Element {
    inner: Rc<ElementInner>, // FUTURE(no_std): replace Rc with arena-backed element storage.
}

impl Element {
    pub fn new(element_type: ElementType, props: Props) -> Self {
        Self {
            inner: Rc::new(ElementInner {
                element_type,
                props,
            }),
        }
    }

    pub fn host(tag: impl Into<String>) -> ElementBuilder {
        ElementBuilder::new(ElementType::from(tag.into()))
    }

    /// Component identity is the type of `render`. Pass a fn item or a
    /// closure: every `fn(&Props) -> Element` pointer shares one type, so
    /// switching between two such pointers updates instead of replacing.
    pub fn function<F>(render: F) -> ElementBuilder
    where
        F: Fn(&Props) -> Element + 'static,
    {
        ElementBuilder::new(ElementType::Function(FunctionComponent::new(render)))
    }

    pub fn class<C: Component>() -> ElementBuilder {
        ElementBuilder::new(ElementType::Class(ComponentClass::of::<C>()))
    }

    pub fn element_type(&self) -> &ElementType {
        &self.inner.element_type
    }

    pub fn props(&self) -> &Props {
        &self.inner.props
    }

    pub fn children(&self) -> &[Element] {
        self.inner.props.children()
    }

    pub fn is_text(&self) -> bool {
        matches!(self.inner.element_type, ElementType::Text)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.inner.element_type == other.inner.element_type
                && self.inner.props == other.inner.props)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("type", &self.inner.element_type)
            .field("props", &self.inner.props)
            .finish()
    }
}

/// One entry of a child list before normalisation.
#[derive(Debug, Clone)]
pub enum Child {
    Element(Element),
    Text(Value),
    Empty,
}

impl From<Element> for Child {
    fn from(element: Element) -> Self {
        Child::Element(element)
    }
}

impl From<ElementBuilder> for Child {
    fn from(builder: ElementBuilder) -> Self {
        Child::Element(builder.build())
    }
}

impl<T: Into<Child>> From<Option<T>> for Child {
    fn from(child: Option<T>) -> Self {
        child.map_or(Child::Empty, Into::into)
    }
}

impl From<Value> for Child {
    fn from(value: Value) -> Self {
        match value {
            Value::Null | Value::Bool(false) => Child::Empty,
            Value::Handler(_) => {
                log::warn!("dropping an event handler passed as a child");
                Child::Empty
            }
            other => Child::Text(other),
        }
    }
}

macro_rules! text_child_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Child {
                fn from(value: $ty) -> Self {
                    Child::from(Value::from(value))
                }
            }
        )*
    };
}

text_child_from!(&str, String, &String, bool, i32, i64, usize, f64);

/// Builds an element of `element_type`, normalising `children`: empty and
/// `false` entries are dropped, scalars are wrapped as text elements.
pub fn create_element<I>(element_type: impl Into<ElementType>, mut props: Props, children: I) -> Element
where
    I: IntoIterator,
    I::Item: Into<Child>,
{
    let children = children
        .into_iter()
        .filter_map(|child| match child.into() {
            Child::Element(element) => Some(element),
            Child::Text(value) => Some(create_text_element(value)),
            Child::Empty => None,
        })
        .collect();
    props.set_children(children);
    Element::new(element_type.into(), props)
}

pub fn create_text_element(value: impl Into<Value>) -> Element {
    let mut props = Props::new();
    props.insert(NODE_VALUE, value);
    Element::new(ElementType::Text, props)
}

/// Fluent construction used by components and tests.
#[derive(Debug, Clone)]
pub struct ElementBuilder {
    element_type: ElementType,
    props: Props,
    children: Vec<Child>,
}

impl ElementBuilder {
    fn new(element_type: ElementType) -> Self {
        Self {
            element_type,
            props: Props::new(),
            children: Vec::new(),
        }
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(name, value);
        self
    }

    pub fn props(mut self, props: Props) -> Self {
        for (name, value) in props.iter() {
            self.props.insert(name, value.clone());
        }
        self.children
            .extend(props.children().iter().cloned().map(Child::Element));
        self
    }

    /// Subscribes `handler` to `event`, stored as `on` + capitalised event
    /// name (`click` becomes `onClick`).
    pub fn on(mut self, event: &str, handler: impl Fn(&Event) + 'static) -> Self {
        self.props
            .insert(handler_prop_name(event), EventHandler::new(handler));
        self
    }

    pub fn child(mut self, child: impl Into<Child>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Child>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Element {
        create_element(self.element_type, self.props, self.children)
    }
}

impl From<ElementBuilder> for Element {
    fn from(builder: ElementBuilder) -> Self {
        builder.build()
    }
}

fn handler_prop_name(event: &str) -> String {
    let mut chars = event.chars();
    let mut name = String::with_capacity(event.len() + 2);
    name.push_str("on");
    if let Some(first) = chars.next() {
        name.extend(first.to_uppercase());
        name.push_str(chars.as_str());
    }
    name
}

#[cfg(test)]
#[path = "tests/element_tests.rs"]
mod tests;
