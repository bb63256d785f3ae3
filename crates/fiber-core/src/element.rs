//! Immutable node descriptions and the `make_node` factory.
//!
//! An [`Element`] is what render functions return and what callers hand to
//! [`Root::render`](crate::Root::render). It is never mutated after creation;
//! the reconciler only reads it.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::hooks::HookScope;
use crate::NodeId;

/// Property key holding the literal content of a text element.
pub const NODE_VALUE: &str = "nodeValue";
/// Property key carrying an identity key. Carried, never used for matching.
pub const KEY: &str = "key";
/// Reserved key for child descriptions; never written as an attribute.
pub const CHILDREN: &str = "children";

/// Payload passed to event listeners when a host dispatches an event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub name: String,
    pub target: NodeId,
}

/// Shared event listener. Two handlers are equal only when they are the
/// same allocation, so a freshly created closure always counts as changed.
#[derive(Clone)]
pub struct EventHandler(Rc<dyn Fn(&Event)>);

impl EventHandler {
    pub fn new(handler: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(handler))
    }

    pub fn call(&self, event: &Event) {
        (self.0)(event)
    }
}

impl PartialEq for EventHandler {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl Eq for EventHandler {}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHandler({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

/// A single property value. Comparison is by value for scalars and by
/// identity for handlers; there is no deep equality.
#[derive(Clone, Debug, PartialEq)]
pub enum PropValue {
    Str(Rc<str>),
    Int(i64),
    Float(f64),
    Bool(bool),
    Handler(EventHandler),
}

impl PropValue {
    /// String form written to the host for attributes and text content.
    /// Handlers have no attribute form.
    pub fn to_attribute(&self) -> Option<String> {
        match self {
            PropValue::Str(value) => Some(value.to_string()),
            PropValue::Int(value) => Some(value.to_string()),
            PropValue::Float(value) => Some(value.to_string()),
            PropValue::Bool(value) => Some(value.to_string()),
            PropValue::Handler(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_handler(&self) -> Option<&EventHandler> {
        match self {
            PropValue::Handler(handler) => Some(handler),
            _ => None,
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(Rc::from(value))
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(Rc::from(value))
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Int(i64::from(value))
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Float(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<EventHandler> for PropValue {
    fn from(handler: EventHandler) -> Self {
        PropValue::Handler(handler)
    }
}

/// Ordered property bag. Attribute order is preserved so hosts see
/// attributes in the order the description declared them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Props {
    values: IndexMap<Rc<str>, PropValue>,
    children: Vec<Element>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Props::insert`].
    pub fn with(mut self, key: &str, value: impl Into<PropValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Registers `handler` under `key`, which should follow the `onEvent`
    /// naming convention.
    pub fn with_handler(self, key: &str, handler: impl Fn(&Event) + 'static) -> Self {
        self.with(key, EventHandler::new(handler))
    }

    pub fn insert(&mut self, key: &str, value: impl Into<PropValue>) {
        if key == CHILDREN {
            log::warn!("ignoring `{CHILDREN}` property; pass children to make_node instead");
            return;
        }
        self.values.insert(Rc::from(key), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PropValue::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.values.iter().map(|(key, value)| (&**key, value))
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

    pub(crate) fn with_children(children: Vec<Element>) -> Self {
        Self {
            values: IndexMap::new(),
            children,
        }
    }
}

type RenderFn = dyn Fn(&mut HookScope<'_>, &Props) -> Element;

/// A user-defined render function. Identity is the allocation: clone a
/// `Component` to reuse it, since two separately constructed components are
/// always different types to the reconciler.
#[derive(Clone)]
pub struct Component {
    name: &'static str,
    render: Rc<RenderFn>,
}

impl Component {
    pub fn new(
        name: &'static str,
        render: impl Fn(&mut HookScope<'_>, &Props) -> Element + 'static,
    ) -> Self {
        Self {
            name,
            render: Rc::new(render),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn render(&self, scope: &mut HookScope<'_>, props: &Props) -> Element {
        (self.render)(scope, props)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.render), Rc::as_ptr(&other.render))
    }
}

impl Eq for Component {}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Component").field(&self.name).finish()
    }
}

/// Type tag of a description.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ElementType {
    Host(Rc<str>),
    Text,
    Component(Component),
}

impl From<&str> for ElementType {
    fn from(tag: &str) -> Self {
        ElementType::Host(Rc::from(tag))
    }
}

impl From<Component> for ElementType {
    fn from(component: Component) -> Self {
        ElementType::Component(component)
    }
}

impl From<&Component> for ElementType {
    fn from(component: &Component) -> Self {
        ElementType::Component(component.clone())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    kind: ElementType,
    props: Rc<Props>,
}

impl Element {
    pub fn kind(&self) -> &ElementType {
        &self.kind
    }

    pub fn props(&self) -> &Rc<Props> {
        &self.props
    }

    pub fn children(&self) -> &[Element] {
        self.props.children()
    }

    /// The identity key, if one was declared.
    pub fn key(&self) -> Option<&PropValue> {
        self.props.get(KEY)
    }

    /// Literal content of a text element.
    pub fn text_value(&self) -> Option<String> {
        match self.kind {
            ElementType::Text => self.props.get(NODE_VALUE).and_then(PropValue::to_attribute),
            _ => None,
        }
    }
}

/// A child argument to [`make_node`]. Lists are flattened and scalars are
/// wrapped into text elements.
#[derive(Clone, Debug)]
pub enum Child {
    Element(Element),
    Value(PropValue),
    List(Vec<Child>),
}

impl From<Element> for Child {
    fn from(element: Element) -> Self {
        Child::Element(element)
    }
}

impl From<&str> for Child {
    fn from(value: &str) -> Self {
        Child::Value(value.into())
    }
}

impl From<String> for Child {
    fn from(value: String) -> Self {
        Child::Value(value.into())
    }
}

impl From<i64> for Child {
    fn from(value: i64) -> Self {
        Child::Value(value.into())
    }
}

impl From<i32> for Child {
    fn from(value: i32) -> Self {
        Child::Value(value.into())
    }
}

impl From<f64> for Child {
    fn from(value: f64) -> Self {
        Child::Value(value.into())
    }
}

impl From<bool> for Child {
    fn from(value: bool) -> Self {
        Child::Value(value.into())
    }
}

impl<C: Into<Child>> From<Vec<C>> for Child {
    fn from(children: Vec<C>) -> Self {
        Child::List(children.into_iter().map(Into::into).collect())
    }
}

fn flatten_into(child: Child, out: &mut Vec<Element>) {
    match child {
        Child::Element(element) => out.push(element),
        Child::Value(value) => out.push(text(value)),
        Child::List(children) => {
            for child in children {
                flatten_into(child, out);
            }
        }
    }
}

/// Builds a description. Nested child lists are flattened in order and any
/// non-element child becomes a text element.
pub fn make_node<C: Into<Child>>(
    kind: impl Into<ElementType>,
    props: Props,
    children: impl IntoIterator<Item = C>,
) -> Element {
    let mut flat = Vec::new();
    for child in children {
        flatten_into(child.into(), &mut flat);
    }
    let Props { values, .. } = props;
    Element {
        kind: kind.into(),
        props: Rc::new(Props {
            values,
            children: flat,
        }),
    }
}

/// A text element holding `value` as its literal content.
pub fn text(value: impl Into<PropValue>) -> Element {
    let mut props = Props::new();
    props.insert(NODE_VALUE, value);
    Element {
        kind: ElementType::Text,
        props: Rc::new(props),
    }
}
