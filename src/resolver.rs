//! Maps an arbitrary on-screen element to a logical component identity.
//!
//! Two strategies are tried in fixed priority order: an explicit marker
//! attribute on the element or its nearest ancestor, then a walk of the
//! host framework's private render tree. Resolution failure is a value
//! (`None`), never an error; both strategies cap their traversals and fail
//! closed on any unexpected shape.

use crate::fiber::{self, FiberNode, FRAMEWORK_PROP_PREFIX};
use crate::tree::{element_from_point, Element, PropValue, WeakElement};

/// Hard cap on ancestor/parent traversal in either strategy.
pub const MAX_TRAVERSAL_HOPS: usize = 500;

/// Marker attribute declaring a component boundary; its value is the
/// display name.
pub const MARKER_ATTRIBUTE: &str = "data-component";

/// Companion element properties read off a marked element.
pub const PROP_SOURCE_PATH: &str = "source_path";
pub const PROP_SOURCE_LINE: &str = "source_line";
pub const PROP_FILENAME: &str = "filename";
pub const PROP_EXPLICITLY_MARKED: &str = "explicitly_marked";

/// Resolved identity of an element as a logical component.
///
/// Created on each resolution call and never cached across frames; the
/// element handle is non-owning and must be re-validated before use.
#[derive(Debug, Clone)]
pub struct ComponentRecord {
    element: WeakElement,
    pub name: String,
    pub source_path: Option<String>,
    pub source_line: Option<String>,
    pub is_framework_managed: bool,
    pub is_explicitly_marked: bool,
    fiber: Option<FiberNode>,
}

impl ComponentRecord {
    /// The live element, if it still exists and is connected.
    pub fn element(&self) -> Option<Element> {
        let element = self.element.upgrade()?;
        element.connected().then_some(element)
    }

    pub fn weak_element(&self) -> WeakElement {
        self.element.clone()
    }

    pub fn has_source(&self) -> bool {
        self.source_path.is_some()
    }
}

/// One way of attributing an element to a component.
pub trait IdentityStrategy {
    fn name(&self) -> &'static str;

    fn resolve(&self, element: &Element) -> Option<ComponentRecord>;

    /// Whether `record` was produced by this strategy, for parent lookups.
    fn owns(&self, record: &ComponentRecord) -> bool;

    /// The logical parent of `record`, using this strategy's own notion of
    /// the ancestor chain.
    fn parent_of(&self, record: &ComponentRecord) -> Option<ComponentRecord>;
}

/// Resolves via the explicit marker attribute on the element or its nearest
/// ancestor.
pub struct AttributeStrategy {
    marker: String,
}

impl AttributeStrategy {
    pub fn new(marker: &str) -> Self {
        Self {
            marker: marker.to_string(),
        }
    }

    fn record_for(&self, element: &Element, name: String) -> ComponentRecord {
        // `filename` stands in when no full source path is attached, and the
        // marker-implied flag can be overridden by generated markup that
        // declares itself machine-placed.
        ComponentRecord {
            element: element.downgrade(),
            name,
            source_path: element
                .property_str(PROP_SOURCE_PATH)
                .or_else(|| element.property_str(PROP_FILENAME)),
            source_line: element.property_str(PROP_SOURCE_LINE),
            is_framework_managed: false,
            is_explicitly_marked: element
                .property_bool(PROP_EXPLICITLY_MARKED)
                .unwrap_or(true),
            fiber: None,
        }
    }
}

impl IdentityStrategy for AttributeStrategy {
    fn name(&self) -> &'static str {
        "attribute-marker"
    }

    fn resolve(&self, element: &Element) -> Option<ComponentRecord> {
        if !element.connected() {
            return None;
        }
        let marked = element.closest(&self.marker, MAX_TRAVERSAL_HOPS)?;
        let name = marked.attribute(&self.marker)?;
        if name.is_empty() {
            return None;
        }
        Some(self.record_for(&marked, name))
    }

    fn owns(&self, record: &ComponentRecord) -> bool {
        record.is_explicitly_marked
    }

    fn parent_of(&self, record: &ComponentRecord) -> Option<ComponentRecord> {
        let element = record.element()?;
        let parent = element.parent()?;
        let marked = parent.closest(&self.marker, MAX_TRAVERSAL_HOPS)?;
        let name = marked.attribute(&self.marker)?;
        if name.is_empty() {
            return None;
        }
        Some(self.record_for(&marked, name))
    }
}

/// Resolves by locating the framework-attached tree node on the element and
/// walking its parent links, skipping host nodes.
pub struct FrameworkTreeStrategy;

impl FrameworkTreeStrategy {
    fn fiber_of(element: &Element) -> Option<FiberNode> {
        let mut cursor = Some(element.clone());
        let mut hops = 0;
        while let Some(current) = cursor {
            for key in current.property_keys() {
                if !key.starts_with(FRAMEWORK_PROP_PREFIX) {
                    continue;
                }
                if let Some(PropValue::Fiber(node)) = current.property(&key) {
                    return Some(node);
                }
            }
            hops += 1;
            if hops >= MAX_TRAVERSAL_HOPS {
                return None;
            }
            cursor = current.parent();
        }
        None
    }

    /// Walk upward from `start` until a node resolves to a display name,
    /// skipping host nodes. Bounded; fails closed on unrecognised shapes.
    fn walk_to_named(start: FiberNode) -> Option<(FiberNode, String)> {
        let mut cursor = Some(start);
        for _ in 0..MAX_TRAVERSAL_HOPS {
            let node = cursor?;
            let node_type = node.node_type()?;
            if !node_type.is_host() {
                if let Some(name) = fiber::display_name(&node_type) {
                    return Some((node, name));
                }
            }
            cursor = node.parent();
        }
        None
    }

    fn record_for(element: &Element, node: FiberNode, name: String) -> ComponentRecord {
        ComponentRecord {
            element: element.downgrade(),
            name,
            source_path: node.memoized_prop(PROP_SOURCE_PATH),
            source_line: node.memoized_prop(PROP_SOURCE_LINE),
            is_framework_managed: true,
            is_explicitly_marked: false,
            fiber: Some(node),
        }
    }
}

impl IdentityStrategy for FrameworkTreeStrategy {
    fn name(&self) -> &'static str {
        "framework-tree"
    }

    fn resolve(&self, element: &Element) -> Option<ComponentRecord> {
        if !element.connected() {
            return None;
        }
        let fiber = Self::fiber_of(element)?;
        let (node, name) = Self::walk_to_named(fiber)?;
        Some(Self::record_for(element, node, name))
    }

    fn owns(&self, record: &ComponentRecord) -> bool {
        record.is_framework_managed
    }

    /// Parent lookup starts from the resolved node's own parent link, not
    /// the element's DOM parent.
    fn parent_of(&self, record: &ComponentRecord) -> Option<ComponentRecord> {
        let element = record.element()?;
        let parent = record.fiber.as_ref()?.parent()?;
        let (node, name) = Self::walk_to_named(parent)?;
        Some(Self::record_for(&element, node, name))
    }
}

/// Tries each strategy in fixed priority order.
pub struct IdentityResolver {
    strategies: Vec<Box<dyn IdentityStrategy>>,
}

impl IdentityResolver {
    pub fn new(marker: &str) -> Self {
        Self {
            strategies: vec![
                Box::new(AttributeStrategy::new(marker)),
                Box::new(FrameworkTreeStrategy),
            ],
        }
    }

    pub fn with_strategies(strategies: Vec<Box<dyn IdentityStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn resolve(&self, element: &Element) -> Option<ComponentRecord> {
        for strategy in &self.strategies {
            if let Some(record) = strategy.resolve(element) {
                tracing::trace!(
                    strategy = strategy.name(),
                    component = %record.name,
                    "resolved element"
                );
                return Some(record);
            }
        }
        None
    }

    /// Hit-test `root` at a screen point, then resolve.
    pub fn resolve_at(&self, root: &Element, x: f32, y: f32) -> Option<ComponentRecord> {
        let element = element_from_point(root, x, y)?;
        self.resolve(&element)
    }

    /// Parent of `record` per the strategy that produced it.
    pub fn parent_of(&self, record: &ComponentRecord) -> Option<ComponentRecord> {
        self.strategies
            .iter()
            .find(|strategy| strategy.owns(record))
            .and_then(|strategy| strategy.parent_of(record))
    }

    /// Loose display name used by the mutation overlay: marker first, then
    /// the framework tree, else the host tag name.
    pub fn display_name_for(&self, element: &Element) -> String {
        self.resolve(element)
            .map(|record| record.name)
            .unwrap_or_else(|| element.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fiber::FiberType;
    use crate::geometry::Rect;
    use crate::tree::Document;

    fn document() -> Document {
        Document::new(Rect::new(0.0, 0.0, 800.0, 600.0))
    }

    #[test]
    fn own_marker_beats_ancestor_marker() {
        let doc = document();
        let outer = Element::new("section");
        outer.set_attribute(MARKER_ATTRIBUTE, "Bar");
        let inner = Element::new("div");
        inner.set_attribute(MARKER_ATTRIBUTE, "Foo");
        outer.append_child(&inner);
        doc.root().append_child(&outer);

        let resolver = IdentityResolver::new(MARKER_ATTRIBUTE);
        let record = resolver.resolve(&inner).expect("record");
        assert_eq!(record.name, "Foo");
        assert!(record.is_explicitly_marked);
        assert!(!record.is_framework_managed);
    }

    #[test]
    fn unmarked_descendant_resolves_to_nearest_marked_ancestor() {
        let doc = document();
        let marked = Element::new("section");
        marked.set_attribute(MARKER_ATTRIBUTE, "Bar");
        let mid = Element::new("div");
        let deep = Element::new("span");
        marked.append_child(&mid);
        mid.append_child(&deep);
        doc.root().append_child(&marked);

        let resolver = IdentityResolver::new(MARKER_ATTRIBUTE);
        let record = resolver.resolve(&deep).expect("record");
        assert_eq!(record.name, "Bar");
    }

    #[test]
    fn filename_property_backfills_a_missing_source_path() {
        let doc = document();
        let element = Element::new("div");
        element.set_attribute(MARKER_ATTRIBUTE, "Card");
        element.set_property(PROP_FILENAME, PropValue::Str("src/card.rs".into()));
        doc.root().append_child(&element);

        let resolver = IdentityResolver::new(MARKER_ATTRIBUTE);
        let record = resolver.resolve(&element).expect("record");
        assert_eq!(record.source_path.as_deref(), Some("src/card.rs"));

        // A full source path wins over the filename shorthand.
        element.set_property(PROP_SOURCE_PATH, PropValue::Str("crates/ui/card.rs".into()));
        let record = resolver.resolve(&element).expect("record");
        assert_eq!(record.source_path.as_deref(), Some("crates/ui/card.rs"));
    }

    #[test]
    fn marked_flag_property_overrides_the_marker_default() {
        let doc = document();
        let element = Element::new("div");
        element.set_attribute(MARKER_ATTRIBUTE, "Generated");
        element.set_property(PROP_EXPLICITLY_MARKED, PropValue::Bool(false));
        doc.root().append_child(&element);

        let resolver = IdentityResolver::new(MARKER_ATTRIBUTE);
        let record = resolver.resolve(&element).expect("record");
        assert!(!record.is_explicitly_marked);
    }

    #[test]
    fn detached_elements_do_not_resolve() {
        let element = Element::new("div");
        element.set_attribute(MARKER_ATTRIBUTE, "Loose");
        let resolver = IdentityResolver::new(MARKER_ATTRIBUTE);
        assert!(resolver.resolve(&element).is_none());
    }

    #[test]
    fn framework_walk_skips_host_nodes() {
        let doc = document();
        let element = Element::new("div");
        doc.root().append_child(&element);

        let component = FiberNode::new(FiberType::Component {
            name: Some("Toolbar".into()),
        });
        let host = FiberNode::new(FiberType::HostTag("div".into()));
        host.attach_to(&component);
        element.set_property(
            &format!("{FRAMEWORK_PROP_PREFIX}abc123"),
            PropValue::Fiber(host),
        );

        let resolver = IdentityResolver::new(MARKER_ATTRIBUTE);
        let record = resolver.resolve(&element).expect("record");
        assert_eq!(record.name, "Toolbar");
        assert!(record.is_framework_managed);
    }

    #[test]
    fn cyclic_parent_chain_fails_closed() {
        let doc = document();
        let element = Element::new("div");
        doc.root().append_child(&element);

        let a = FiberNode::new(FiberType::HostTag("div".into()));
        let b = FiberNode::new(FiberType::HostTag("span".into()));
        a.set_parent(Some(b.clone()));
        b.set_parent(Some(a.clone()));
        element.set_property(
            &format!("{FRAMEWORK_PROP_PREFIX}cycle"),
            PropValue::Fiber(a),
        );

        let resolver = IdentityResolver::new(MARKER_ATTRIBUTE);
        assert!(resolver.resolve(&element).is_none());
    }

    #[test]
    fn framework_parent_lookup_uses_tree_links_not_dom() {
        let doc = document();
        let element = Element::new("div");
        doc.root().append_child(&element);

        let app = FiberNode::new(FiberType::Component {
            name: Some("App".into()),
        });
        let host = FiberNode::new(FiberType::HostTag("main".into()));
        host.attach_to(&app);
        let widget = FiberNode::new(FiberType::Component {
            name: Some("Widget".into()),
        });
        widget.attach_to(&host);
        element.set_property(
            &format!("{FRAMEWORK_PROP_PREFIX}root"),
            PropValue::Fiber(widget),
        );

        let resolver = IdentityResolver::new(MARKER_ATTRIBUTE);
        let record = resolver.resolve(&element).expect("record");
        assert_eq!(record.name, "Widget");
        let parent = resolver.parent_of(&record).expect("parent");
        assert_eq!(parent.name, "App");
        assert!(resolver.parent_of(&parent).is_none());
    }

    #[test]
    fn display_name_falls_back_to_tag() {
        let doc = document();
        let plain = Element::new("canvas");
        doc.root().append_child(&plain);
        let resolver = IdentityResolver::new(MARKER_ATTRIBUTE);
        assert_eq!(resolver.display_name_for(&plain), "canvas");
    }
}
