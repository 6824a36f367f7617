//! Read-only view of a host UI framework's private render tree.
//!
//! Elements produced by a framework carry a property whose key starts with
//! [`FRAMEWORK_PROP_PREFIX`]; its value is a tree node exposing a type, a
//! parent link and memoized props. The shapes here are undocumented and may
//! change under us, so everything in this module is best-effort and
//! fail-closed: an unrecognised shape yields `None`, never a panic.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// Property-key prefix identifying the framework-attached tree node on an
/// element.
pub const FRAMEWORK_PROP_PREFIX: &str = "__frameworkNode$";

/// Maximum unwrap depth for nested wrapper types.
const MAX_UNWRAP_DEPTH: usize = 8;

/// The "type" slot of a framework tree node.
///
/// Host elements carry a plain tag string and never name a logical
/// component. The three wrapper shapes each need their own unwrap rule.
#[derive(Debug, Clone)]
pub enum FiberType {
    /// A plain function or class component; `None` when anonymous.
    Component { name: Option<String> },
    /// A host element (string type). Skipped during name resolution.
    HostTag(String),
    /// A render-forwarding wrapper; the inner render function carries the
    /// name.
    ForwardRender { render_name: Option<String> },
    /// A memoizing wrapper around another type.
    Memo { inner: Box<FiberType> },
    /// A lazy-loading wrapper; unresolved until the module loads.
    Lazy { resolved: Option<Box<FiberType>> },
    /// Anything we do not recognise.
    Foreign,
}

impl FiberType {
    pub fn is_host(&self) -> bool {
        matches!(self, FiberType::HostTag(_))
    }
}

/// Resolve a display name from a type shape, or `None` for host tags,
/// anonymous components and foreign shapes.
pub fn display_name(node_type: &FiberType) -> Option<String> {
    display_name_bounded(node_type, 0)
}

fn display_name_bounded(node_type: &FiberType, depth: usize) -> Option<String> {
    if depth >= MAX_UNWRAP_DEPTH {
        return None;
    }
    match node_type {
        FiberType::Component { name } => name.clone().filter(|n| !n.is_empty()),
        FiberType::HostTag(_) => None,
        FiberType::ForwardRender { render_name } => {
            render_name.clone().filter(|n| !n.is_empty())
        }
        FiberType::Memo { inner } => display_name_bounded(inner, depth + 1),
        FiberType::Lazy { resolved } => resolved
            .as_deref()
            .and_then(|inner| display_name_bounded(inner, depth + 1)),
        FiberType::Foreign => None,
    }
}

struct FiberData {
    node_type: FiberType,
    parent: Option<FiberNode>,
    child: Option<Weak<RefCell<FiberData>>>,
    memoized_props: HashMap<String, String>,
}

/// Shared handle to one framework tree node.
#[derive(Clone)]
pub struct FiberNode(Rc<RefCell<FiberData>>);

impl FiberNode {
    pub fn new(node_type: FiberType) -> Self {
        Self(Rc::new(RefCell::new(FiberData {
            node_type,
            parent: None,
            child: None,
            memoized_props: HashMap::new(),
        })))
    }

    pub fn ptr_eq(&self, other: &FiberNode) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Link `self` under `parent` and record `self` as the parent's first
    /// child. The child link is weak so synthetic trees do not leak.
    pub fn attach_to(&self, parent: &FiberNode) {
        if let Ok(mut data) = self.0.try_borrow_mut() {
            data.parent = Some(parent.clone());
        }
        if let Ok(mut data) = parent.0.try_borrow_mut() {
            data.child = Some(Rc::downgrade(&self.0));
        }
    }

    /// Force the parent link; used by tests to build degenerate chains.
    pub fn set_parent(&self, parent: Option<FiberNode>) {
        if let Ok(mut data) = self.0.try_borrow_mut() {
            data.parent = parent;
        }
    }

    pub fn parent(&self) -> Option<FiberNode> {
        self.0.try_borrow().ok()?.parent.clone()
    }

    pub fn first_child(&self) -> Option<FiberNode> {
        let weak = self.0.try_borrow().ok()?.child.clone()?;
        weak.upgrade().map(FiberNode)
    }

    pub fn node_type(&self) -> Option<FiberType> {
        Some(self.0.try_borrow().ok()?.node_type.clone())
    }

    pub fn memoized_prop(&self, key: &str) -> Option<String> {
        self.0.try_borrow().ok()?.memoized_props.get(key).cloned()
    }

    pub fn set_memoized_prop(&self, key: &str, value: &str) {
        if let Ok(mut data) = self.0.try_borrow_mut() {
            data.memoized_props.insert(key.to_string(), value.to_string());
        }
    }
}

impl std::fmt::Debug for FiberNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.try_borrow() {
            Ok(data) => f
                .debug_struct("FiberNode")
                .field("node_type", &data.node_type)
                .finish_non_exhaustive(),
            Err(_) => f.write_str("FiberNode(<borrowed>)"),
        }
    }
}
