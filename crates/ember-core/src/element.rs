//! # Elements
//!
//! An [`Element`] is the immutable description of one node in the UI tree:
//! what it is ([`ElementKind`]) and its [`Props`], children included. A fresh
//! element tree is built on every render and thrown away once the reconciler
//! has turned it into fibers, so elements are cheap to clone (props are
//! shared behind an `Rc`).
//!
//! ```rust
//! use ember_core::*;
//!
//! let heading = create_element("h1", None, children!["Count: ", 3]);
//! assert_eq!(heading.children().len(), 2);
//! assert_eq!(heading.children()[1].kind(), &ElementKind::Text);
//! ```

use std::any::{TypeId, type_name};
use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use crate::props::{Event, EventHandler, NODE_VALUE, PropValue, Props, event_key};

/// A function component: renders its props into exactly one element.
///
/// Identity is the Rust type of the render function, so building a new
/// `Component` from the same function on every render keeps the fiber (and
/// its state) in place.
#[derive(Clone)]
pub struct Component {
    id: TypeId,
    name: &'static str,
    render: Rc<dyn Fn(&Props) -> Element>,
}

impl Component {
    pub fn new<F>(render: F) -> Self
    where
        F: Fn(&Props) -> Element + 'static,
    {
        let full = type_name::<F>();
        Self {
            id: TypeId::of::<F>(),
            name: full.rsplit("::").next().unwrap_or(full),
            render: Rc::new(render),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn render(&self, props: &Props) -> Element {
        (self.render)(props)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({})", self.name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ElementKind {
    /// Output node named by tag, e.g. `div`.
    Host(Cow<'static, str>),
    Text,
    Component(Component),
}

impl From<&'static str> for ElementKind {
    fn from(tag: &'static str) -> Self {
        ElementKind::Host(Cow::Borrowed(tag))
    }
}

impl From<String> for ElementKind {
    fn from(tag: String) -> Self {
        ElementKind::Host(Cow::Owned(tag))
    }
}

impl From<Component> for ElementKind {
    fn from(c: Component) -> Self {
        ElementKind::Component(c)
    }
}

#[derive(Clone, Debug)]
pub struct Element {
    kind: ElementKind,
    props: Rc<Props>,
}

impl Element {
    pub fn new(kind: impl Into<ElementKind>, props: Props) -> Self {
        Self {
            kind: kind.into(),
            props: Rc::new(props),
        }
    }

    pub fn host(tag: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ElementKind::Host(tag.into()), Props::new())
    }

    pub fn text(value: impl Into<PropValue>) -> Self {
        create_text_element(value)
    }

    pub fn component<F>(render: F, props: Props) -> Self
    where
        F: Fn(&Props) -> Element + 'static,
    {
        Self::new(Component::new(render), props)
    }

    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub(crate) fn shared_props(&self) -> &Rc<Props> {
        &self.props
    }

    pub fn children(&self) -> &[Element] {
        self.props.children()
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        Rc::make_mut(&mut self.props).set(key, value);
        self
    }

    pub fn on(mut self, event: &str, f: impl Fn(&Event) + 'static) -> Self {
        Rc::make_mut(&mut self.props).set(event_key(event), EventHandler::new(f));
        self
    }

    pub fn child(mut self, child: impl Into<Child>) -> Self {
        Rc::make_mut(&mut self.props).push_child(child.into().into_element());
        self
    }

    pub fn with_children<I, C>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Child>,
    {
        let children = children
            .into_iter()
            .map(|c| c.into().into_element())
            .collect();
        Rc::make_mut(&mut self.props).set_children(children);
        self
    }
}

/// Anything accepted as a child: an element, or a value that becomes a text
/// element.
#[derive(Clone, Debug)]
pub enum Child {
    Element(Element),
    Value(PropValue),
}

impl Child {
    pub fn into_element(self) -> Element {
        match self {
            Child::Element(e) => e,
            Child::Value(v) => create_text_element(v),
        }
    }
}

impl From<Element> for Child {
    fn from(e: Element) -> Self {
        Child::Element(e)
    }
}

impl From<PropValue> for Child {
    fn from(v: PropValue) -> Self {
        Child::Value(v)
    }
}

macro_rules! child_from_value {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Child {
            fn from(v: $ty) -> Self {
                Child::Value(v.into())
            }
        })*
    };
}

child_from_value!(&str, String, i32, i64, u32, f32, f64, bool);

/// Builds an element; non-element children become text elements. `props`
/// may be absent, and `children` ends up as a (possibly empty) sequence.
pub fn create_element<I, C>(
    kind: impl Into<ElementKind>,
    props: Option<Props>,
    children: I,
) -> Element
where
    I: IntoIterator<Item = C>,
    C: Into<Child>,
{
    let mut props = props.unwrap_or_default();
    props.set_children(
        children
            .into_iter()
            .map(|c| c.into().into_element())
            .collect(),
    );
    Element::new(kind, props)
}

pub fn create_text_element(value: impl Into<PropValue>) -> Element {
    Element::new(ElementKind::Text, Props::new().with(NODE_VALUE, value))
}

/// Heterogeneous child list for [`create_element`].
#[macro_export]
macro_rules! children {
    () => {
        ::std::vec::Vec::<$crate::Child>::new()
    };
    ($($child:expr),+ $(,)?) => {
        ::std::vec![$($crate::Child::from($child)),+]
    };
}
