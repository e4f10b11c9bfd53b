//! # Props and prop reconciliation
//!
//! Every element carries a [`Props`] bag: named attribute values, event
//! handlers, and the ordered list of child elements. Keys that start with
//! `on` are event keys (`onClick` listens for `click`); everything else except
//! `children` is a plain attribute.
//!
//! [`diff_props`] turns an old/new pair into an ordered [`PropPatch`] list
//! that [`apply_patch`] replays against a [`HostAdapter`]. The order is always
//! remove listeners, remove attributes, set attributes, add listeners, so a
//! changed listener is never registered twice at once.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::element::Element;
use crate::error::HostError;
use crate::host::HostAdapter;

/// Reserved key for the child list. Never applied as an attribute.
pub const CHILDREN: &str = "children";
/// Key holding the text of a text element.
pub const NODE_VALUE: &str = "nodeValue";

/// An event delivered to a listener by the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub name: String,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Shared event callback. Two handlers are equal only if they are the same
/// allocation, which is what lets the prop diff notice a re-created closure.
#[derive(Clone)]
pub struct EventHandler(Rc<dyn Fn(&Event)>);

impl EventHandler {
    pub fn new(f: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, event: &Event) {
        (self.0)(event)
    }
}

impl PartialEq for EventHandler {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHandler({:p})", Rc::as_ptr(&self.0))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PropValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Handler(EventHandler),
}

impl PropValue {
    pub fn as_handler(&self) -> Option<&EventHandler> {
        match self {
            PropValue::Handler(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Str(s) => f.write_str(s),
            PropValue::Int(i) => write!(f, "{i}"),
            PropValue::Float(v) => write!(f, "{v}"),
            PropValue::Bool(b) => write!(f, "{b}"),
            PropValue::Handler(_) => f.write_str("[handler]"),
        }
    }
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        PropValue::Str(v.to_string())
    }
}

impl From<String> for PropValue {
    fn from(v: String) -> Self {
        PropValue::Str(v)
    }
}

impl From<i32> for PropValue {
    fn from(v: i32) -> Self {
        PropValue::Int(v.into())
    }
}

impl From<i64> for PropValue {
    fn from(v: i64) -> Self {
        PropValue::Int(v)
    }
}

impl From<u32> for PropValue {
    fn from(v: u32) -> Self {
        PropValue::Int(v.into())
    }
}

impl From<f32> for PropValue {
    fn from(v: f32) -> Self {
        PropValue::Float(v.into())
    }
}

impl From<f64> for PropValue {
    fn from(v: f64) -> Self {
        PropValue::Float(v)
    }
}

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        PropValue::Bool(v)
    }
}

impl From<EventHandler> for PropValue {
    fn from(v: EventHandler) -> Self {
        PropValue::Handler(v)
    }
}

pub fn is_event_key(key: &str) -> bool {
    key.len() > 2 && key.starts_with("on")
}

pub fn is_property_key(key: &str) -> bool {
    key != CHILDREN && !is_event_key(key)
}

/// `onClick` -> `click`
pub fn event_name(key: &str) -> String {
    key.get(2..).unwrap_or_default().to_ascii_lowercase()
}

/// `click` -> `onClick`
pub fn event_key(event: &str) -> String {
    let mut chars = event.chars();
    match chars.next() {
        Some(first) => format!("on{}{}", first.to_ascii_uppercase(), chars.as_str()),
        None => "on".to_string(),
    }
}

/// Attribute/handler map plus ordered children of one element.
#[derive(Clone, Debug, Default)]
pub struct Props {
    attrs: BTreeMap<String, PropValue>,
    children: Vec<Element>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Registers `f` under the event key for `event` (`"click"` -> `onClick`).
    pub fn on(mut self, event: &str, f: impl Fn(&Event) + 'static) -> Self {
        self.set(event_key(event), EventHandler::new(f));
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PropValue>) {
        self.attrs.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<PropValue> {
        self.attrs.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.attrs.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.attrs.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn set_children(&mut self, children: Vec<Element>) {
        self.children = children;
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(child);
    }
}

/// One output-tree operation produced by [`diff_props`].
#[derive(Clone, Debug, PartialEq)]
pub enum PropPatch {
    RemoveListener {
        event: String,
        handler: EventHandler,
    },
    RemoveAttr { name: String },
    SetAttr { name: String, value: PropValue },
    AddListener {
        event: String,
        handler: EventHandler,
    },
}

pub type PropPatches = SmallVec<[PropPatch; 8]>;

pub fn diff_props(prev: &Props, next: &Props) -> PropPatches {
    let mut out = PropPatches::new();
    let changed = |key: &str, value: &PropValue| next.get(key) != Some(value);

    for (key, value) in prev.iter().filter(|(k, _)| is_event_key(k)) {
        if changed(key, value) {
            match value.as_handler() {
                Some(handler) => out.push(PropPatch::RemoveListener {
                    event: event_name(key),
                    handler: handler.clone(),
                }),
                None => log::warn!("event key `{key}` holds a non-handler value; skipped"),
            }
        }
    }

    for (key, _) in prev.iter().filter(|(k, _)| is_property_key(k)) {
        if !next.contains(key) {
            out.push(PropPatch::RemoveAttr {
                name: key.to_string(),
            });
        }
    }

    for (key, value) in next.iter().filter(|(k, _)| is_property_key(k)) {
        if prev.get(key) != Some(value) {
            out.push(PropPatch::SetAttr {
                name: key.to_string(),
                value: value.clone(),
            });
        }
    }

    for (key, value) in next.iter().filter(|(k, _)| is_event_key(k)) {
        if prev.get(key) != Some(value) {
            match value.as_handler() {
                Some(handler) => out.push(PropPatch::AddListener {
                    event: event_name(key),
                    handler: handler.clone(),
                }),
                None => log::warn!("event key `{key}` holds a non-handler value; skipped"),
            }
        }
    }

    out
}

/// Replays `patches` on `node`, stopping at the first host failure.
pub fn apply_patch<H: HostAdapter + ?Sized>(
    host: &mut H,
    node: &H::Node,
    patches: &[PropPatch],
) -> Result<(), HostError> {
    for patch in patches {
        match patch {
            PropPatch::RemoveListener { event, handler } => {
                host.remove_listener(node, event, handler)?
            }
            PropPatch::RemoveAttr { name } => host.remove_prop(node, name)?,
            PropPatch::SetAttr { name, value } => host.set_prop(node, name, value)?,
            PropPatch::AddListener { event, handler } => host.add_listener(node, event, handler)?,
        }
    }
    Ok(())
}
