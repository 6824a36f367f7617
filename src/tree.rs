//! The host element tree the inspector operates on.
//!
//! A [`Document`] owns a root [`Element`] plus a mutation sink. Elements are
//! shared single-threaded handles; [`WeakElement`] handles never keep a
//! detached element alive. Mutating operations (attributes, text, child
//! list) feed [`MutationRecord`]s into the document's sink while an observer
//! is connected, in delivery order.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::fiber::FiberNode;
use crate::geometry::Rect;

/// Out-of-band element property. Unlike attributes these are not strings on
/// the markup; they carry component metadata and framework tree handles.
#[derive(Debug, Clone)]
pub enum PropValue {
    Str(String),
    Bool(bool),
    Fiber(FiberNode),
}

struct ElementData {
    tag: String,
    attributes: HashMap<String, String>,
    properties: HashMap<String, PropValue>,
    parent: Weak<RefCell<ElementData>>,
    children: Vec<Element>,
    rect: Rect,
    text: String,
    connected: bool,
    overlay_owned: bool,
    hit_testable: bool,
    sink: Option<Rc<MutationSink>>,
}

/// Shared handle to one element in the tree.
#[derive(Clone)]
pub struct Element(Rc<RefCell<ElementData>>);

/// Non-owning element handle.
#[derive(Debug, Clone, Default)]
pub struct WeakElement(Weak<RefCell<ElementData>>);

impl WeakElement {
    pub fn upgrade(&self) -> Option<Element> {
        self.0.upgrade().map(Element)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Attributes,
    CharacterData,
    ChildList,
}

#[derive(Clone)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: Element,
    pub added: Vec<Element>,
    pub old_value: Option<String>,
}

/// Collects mutation records while an observer is connected.
pub struct MutationSink {
    enabled: Cell<bool>,
    capture_old_values: Cell<bool>,
    queue: RefCell<Vec<MutationRecord>>,
}

impl MutationSink {
    fn new() -> Rc<Self> {
        Rc::new(Self {
            enabled: Cell::new(false),
            capture_old_values: Cell::new(false),
            queue: RefCell::new(Vec::new()),
        })
    }

    fn push(&self, record: MutationRecord) {
        if self.enabled.get() {
            self.queue.borrow_mut().push(record);
        }
    }
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self(Rc::new(RefCell::new(ElementData {
            tag: tag.to_string(),
            attributes: HashMap::new(),
            properties: HashMap::new(),
            parent: Weak::new(),
            children: Vec::new(),
            rect: Rect::default(),
            text: String::new(),
            connected: false,
            overlay_owned: false,
            hit_testable: true,
            sink: None,
        })))
    }

    pub fn downgrade(&self) -> WeakElement {
        WeakElement(Rc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn tag(&self) -> String {
        self.0.borrow().tag.clone()
    }

    pub fn rect(&self) -> Rect {
        self.0.borrow().rect
    }

    /// Geometry updates are not mutations; the overlay re-reads rects every
    /// tick instead.
    pub fn set_rect(&self, rect: Rect) {
        self.0.borrow_mut().rect = rect;
    }

    pub fn connected(&self) -> bool {
        self.0.borrow().connected
    }

    pub fn is_overlay_owned(&self) -> bool {
        self.0.borrow().overlay_owned
    }

    pub fn set_overlay_owned(&self, owned: bool) {
        self.0.borrow_mut().overlay_owned = owned;
    }

    pub fn hit_testable(&self) -> bool {
        self.0.borrow().hit_testable
    }

    pub fn set_hit_testable(&self, testable: bool) {
        self.0.borrow_mut().hit_testable = testable;
    }

    pub fn parent(&self) -> Option<Element> {
        self.0.borrow().parent.upgrade().map(Element)
    }

    pub fn children(&self) -> Vec<Element> {
        self.0.borrow().children.clone()
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.0.borrow().attributes.get(name).cloned()
    }

    pub fn set_attribute(&self, name: &str, value: &str) {
        let (sink, old_value) = {
            let mut data = self.0.borrow_mut();
            let old = data.attributes.insert(name.to_string(), value.to_string());
            (data.sink.clone(), old)
        };
        self.record(sink, MutationKind::Attributes, Vec::new(), old_value);
    }

    pub fn remove_attribute(&self, name: &str) {
        let (sink, old_value) = {
            let mut data = self.0.borrow_mut();
            let old = data.attributes.remove(name);
            (data.sink.clone(), old)
        };
        if old_value.is_some() {
            self.record(sink, MutationKind::Attributes, Vec::new(), old_value);
        }
    }

    pub fn property(&self, name: &str) -> Option<PropValue> {
        self.0.borrow().properties.get(name).cloned()
    }

    pub fn set_property(&self, name: &str, value: PropValue) {
        self.0
            .borrow_mut()
            .properties
            .insert(name.to_string(), value);
    }

    pub fn property_str(&self, name: &str) -> Option<String> {
        match self.property(name) {
            Some(PropValue::Str(value)) => Some(value),
            _ => None,
        }
    }

    pub fn property_bool(&self, name: &str) -> Option<bool> {
        match self.property(name) {
            Some(PropValue::Bool(value)) => Some(value),
            _ => None,
        }
    }

    /// Property keys, for prefix scans over framework-attached handles.
    pub fn property_keys(&self) -> Vec<String> {
        self.0.borrow().properties.keys().cloned().collect()
    }

    pub fn text(&self) -> String {
        self.0.borrow().text.clone()
    }

    pub fn set_text(&self, value: &str) {
        let (sink, old_value) = {
            let mut data = self.0.borrow_mut();
            let old = std::mem::replace(&mut data.text, value.to_string());
            (data.sink.clone(), Some(old))
        };
        self.record(sink, MutationKind::CharacterData, Vec::new(), old_value);
    }

    pub fn append_child(&self, child: &Element) {
        let (sink, connected) = {
            let data = self.0.borrow();
            (data.sink.clone(), data.connected)
        };
        {
            let mut child_data = child.0.borrow_mut();
            child_data.parent = Rc::downgrade(&self.0);
        }
        child.propagate(sink.clone(), connected);
        self.0.borrow_mut().children.push(child.clone());
        if connected {
            self.record(sink, MutationKind::ChildList, vec![child.clone()], None);
        }
    }

    /// Detach this element (and its subtree) from the tree.
    pub fn detach(&self) {
        let parent = self.parent();
        if let Some(parent) = &parent {
            let sink = parent.0.borrow().sink.clone();
            parent
                .0
                .borrow_mut()
                .children
                .retain(|child| !child.ptr_eq(self));
            parent.record(sink, MutationKind::ChildList, Vec::new(), None);
        }
        self.0.borrow_mut().parent = Weak::new();
        self.propagate(None, false);
    }

    /// Nearest ancestor-or-self carrying `attribute`, bounded by `cap` hops.
    pub fn closest(&self, attribute: &str, cap: usize) -> Option<Element> {
        let mut cursor = Some(self.clone());
        let mut hops = 0;
        while let Some(element) = cursor {
            if element.attribute(attribute).is_some() {
                return Some(element);
            }
            hops += 1;
            if hops >= cap {
                return None;
            }
            cursor = element.parent();
        }
        None
    }

    fn propagate(&self, sink: Option<Rc<MutationSink>>, connected: bool) {
        let children = {
            let mut data = self.0.borrow_mut();
            data.sink = sink.clone();
            data.connected = connected;
            data.children.clone()
        };
        for child in children {
            child.propagate(sink.clone(), connected);
        }
    }

    fn record(
        &self,
        sink: Option<Rc<MutationSink>>,
        kind: MutationKind,
        added: Vec<Element>,
        old_value: Option<String>,
    ) {
        let Some(sink) = sink else { return };
        if !self.connected() {
            return;
        }
        let old_value = if sink.capture_old_values.get() {
            old_value
        } else {
            None
        };
        sink.push(MutationRecord {
            kind,
            target: self.clone(),
            added,
            old_value,
        });
    }
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.try_borrow() {
            Ok(data) => f
                .debug_struct("Element")
                .field("tag", &data.tag)
                .field("connected", &data.connected)
                .finish_non_exhaustive(),
            Err(_) => f.write_str("Element(<borrowed>)"),
        }
    }
}

/// A root element plus the mutation sink observers read from.
#[derive(Clone)]
pub struct Document {
    root: Element,
    sink: Rc<MutationSink>,
}

impl Document {
    pub fn new(viewport: Rect) -> Self {
        let root = Element::new("root");
        let sink = MutationSink::new();
        {
            let mut data = root.0.borrow_mut();
            data.connected = true;
            data.rect = viewport;
            data.sink = Some(Rc::clone(&sink));
        }
        Self { root, sink }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Start observing mutations (attributes, character data, child list,
    /// the whole subtree), optionally capturing old values.
    pub fn observe(&self, capture_old_values: bool) {
        self.sink.capture_old_values.set(capture_old_values);
        self.sink.enabled.set(true);
    }

    pub fn disconnect_observer(&self) {
        self.sink.enabled.set(false);
        self.sink.queue.borrow_mut().clear();
    }

    pub fn observing(&self) -> bool {
        self.sink.enabled.get()
    }

    /// Drain pending mutation records in delivery order.
    pub fn take_records(&self) -> Vec<MutationRecord> {
        std::mem::take(&mut *self.sink.queue.borrow_mut())
    }
}

/// Topmost, deepest hit-testable element containing `(x, y)`.
///
/// Later siblings paint above earlier ones, so children are scanned in
/// reverse. Elements with hit testing disabled are transparent to the
/// query, as are their descendants only through their own rects.
pub fn element_from_point(root: &Element, x: f32, y: f32) -> Option<Element> {
    let children = root.children();
    for child in children.iter().rev() {
        if let Some(hit) = element_from_point(child, x, y) {
            return Some(hit);
        }
    }
    if root.hit_testable() && root.rect().contains(x, y) {
        return Some(root.clone());
    }
    None
}
