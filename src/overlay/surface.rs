//! Overlay draw surfaces and the event-catcher plane.
//!
//! Each logical purpose gets at most one surface; creation checks for an
//! existing marked surface element first so repeated activation is
//! idempotent. Surfaces never receive pointer input; the event catcher is
//! the only overlay element with hit testing enabled, and it turns itself
//! off for the duration of an under-cursor query.

use crate::geometry::Rect;
use crate::overlay::paint::DisplayList;
use crate::tree::{element_from_point, Element, WeakElement};

/// Marker attribute identifying overlay-owned surface elements.
pub const SURFACE_MARKER: &str = "data-glasspane-surface";
pub const CATCHER_MARKER: &str = "data-glasspane-catcher";

pub const RESIZE_DEBOUNCE_MS: u64 = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfacePurpose {
    Inspection,
    Mutation,
}

impl SurfacePurpose {
    fn marker_value(self) -> &'static str {
        match self {
            SurfacePurpose::Inspection => "inspection",
            SurfacePurpose::Mutation => "mutation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub device_pixel_ratio: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32, device_pixel_ratio: f32) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }
}

/// One transparent full-viewport draw surface.
pub struct OverlaySurface {
    purpose: SurfacePurpose,
    element: Element,
    pub display: DisplayList,
    /// Whole-surface opacity, used by the deactivation fade.
    pub opacity: f32,
}

impl OverlaySurface {
    pub fn purpose(&self) -> SurfacePurpose {
        self.purpose
    }

    pub fn element(&self) -> &Element {
        &self.element
    }
}

/// The one overlay element allowed to receive pointer events.
pub struct EventCatcher {
    element: Element,
}

impl EventCatcher {
    pub fn element(&self) -> &Element {
        &self.element
    }

    /// Find the true page element beneath the cursor. Hit testing on the
    /// catcher itself is disabled for the synchronous query and re-enabled
    /// before returning.
    pub fn element_beneath(&self, root: &Element, x: f32, y: f32) -> Option<Element> {
        self.element.set_hit_testable(false);
        let hit = element_from_point(root, x, y);
        self.element.set_hit_testable(true);
        hit
    }
}

/// Owns the surface singletons and the catcher plane for one document.
pub struct SurfaceRegistry {
    root: WeakElement,
    viewport: Viewport,
    surfaces: Vec<OverlaySurface>,
    catcher: Option<EventCatcher>,
}

impl SurfaceRegistry {
    pub fn new(root: &Element, viewport: Viewport) -> Self {
        Self {
            root: root.downgrade(),
            viewport,
            surfaces: Vec::new(),
            catcher: None,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Get or create the surface for `purpose`. An existing marked element
    /// under the root is adopted rather than duplicated.
    pub fn acquire(&mut self, purpose: SurfacePurpose) -> Option<&mut OverlaySurface> {
        let root = self.root.upgrade()?;
        if let Some(index) = self.surfaces.iter().position(|s| s.purpose == purpose) {
            return Some(&mut self.surfaces[index]);
        }
        let element = find_marked(&root, SURFACE_MARKER, purpose.marker_value())
            .unwrap_or_else(|| {
                let element = Element::new("overlay-surface");
                element.set_overlay_owned(true);
                element.set_hit_testable(false);
                element.set_attribute(SURFACE_MARKER, purpose.marker_value());
                root.append_child(&element);
                element
            });
        element.set_rect(self.viewport.rect());
        self.surfaces.push(OverlaySurface {
            purpose,
            element,
            display: DisplayList::default(),
            opacity: 1.0,
        });
        self.surfaces.last_mut()
    }

    pub fn surface(&self, purpose: SurfacePurpose) -> Option<&OverlaySurface> {
        self.surfaces.iter().find(|s| s.purpose == purpose)
    }

    pub fn surface_mut(&mut self, purpose: SurfacePurpose) -> Option<&mut OverlaySurface> {
        self.surfaces.iter_mut().find(|s| s.purpose == purpose)
    }

    /// Get or create the event catcher, above every surface.
    pub fn acquire_catcher(&mut self) -> Option<&EventCatcher> {
        let root = self.root.upgrade()?;
        if self.catcher.is_none() {
            let element = find_marked(&root, CATCHER_MARKER, "true").unwrap_or_else(|| {
                let element = Element::new("event-catcher");
                element.set_overlay_owned(true);
                element.set_attribute(CATCHER_MARKER, "true");
                root.append_child(&element);
                element
            });
            element.set_hit_testable(true);
            element.set_rect(self.viewport.rect());
            self.catcher = Some(EventCatcher { element });
        }
        self.catcher.as_ref()
    }

    pub fn catcher(&self) -> Option<&EventCatcher> {
        self.catcher.as_ref()
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        for surface in &mut self.surfaces {
            surface.opacity = opacity;
        }
    }

    /// Re-apply viewport size and scale to every overlay element.
    pub fn apply_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        let rect = viewport.rect();
        for surface in &mut self.surfaces {
            surface.element.set_rect(rect);
        }
        if let Some(catcher) = &self.catcher {
            catcher.element.set_rect(rect);
        }
        tracing::debug!(
            width = viewport.width,
            height = viewport.height,
            dpr = viewport.device_pixel_ratio,
            "overlay surfaces resized"
        );
    }

    /// Fully detach every overlay element from the tree. Hiding is not
    /// enough; repeated toggles must not accumulate nodes.
    pub fn detach_all(&mut self) {
        for surface in self.surfaces.drain(..) {
            surface.element.detach();
        }
        if let Some(catcher) = self.catcher.take() {
            catcher.element.detach();
        }
    }

    /// Number of marked surface elements actually present under the root.
    pub fn surface_element_count(&self) -> usize {
        self.marked_count(SURFACE_MARKER)
    }

    pub fn catcher_element_count(&self) -> usize {
        self.marked_count(CATCHER_MARKER)
    }

    fn marked_count(&self, marker: &str) -> usize {
        let Some(root) = self.root.upgrade() else {
            return 0;
        };
        root.children()
            .iter()
            .filter(|child| child.attribute(marker).is_some())
            .count()
    }
}

fn find_marked(root: &Element, marker: &str, value: &str) -> Option<Element> {
    root.children()
        .into_iter()
        .find(|child| child.attribute(marker).as_deref() == Some(value))
}

/// Coalesces resize bursts into one viewport application.
#[derive(Debug, Default)]
pub struct ResizeDebouncer {
    pending: Option<(Viewport, u64)>,
}

impl ResizeDebouncer {
    /// Each new size re-arms the deadline; repeating the pending size does
    /// not, so callers firing every frame cannot starve `poll`.
    pub fn request(&mut self, viewport: Viewport, now_ms: u64) {
        if let Some((pending, _)) = self.pending {
            if pending == viewport {
                return;
            }
        }
        self.pending = Some((viewport, now_ms + RESIZE_DEBOUNCE_MS));
    }

    /// The settled viewport, once the debounce window has passed.
    pub fn poll(&mut self, now_ms: u64) -> Option<Viewport> {
        match self.pending {
            Some((viewport, deadline)) if now_ms >= deadline => {
                self.pending = None;
                Some(viewport)
            }
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Document;

    fn viewport() -> Viewport {
        Viewport::new(800.0, 600.0, 2.0)
    }

    fn document() -> Document {
        Document::new(viewport().rect())
    }

    #[test]
    fn acquire_is_idempotent_per_purpose() {
        let doc = document();
        let mut registry = SurfaceRegistry::new(doc.root(), viewport());
        registry.acquire(SurfacePurpose::Inspection).expect("surface");
        registry.acquire(SurfacePurpose::Inspection).expect("surface");
        registry.acquire(SurfacePurpose::Mutation).expect("surface");
        assert_eq!(registry.surface_element_count(), 2);

        registry.acquire_catcher().expect("catcher");
        registry.acquire_catcher().expect("catcher");
        assert_eq!(registry.catcher_element_count(), 1);
    }

    #[test]
    fn existing_marked_element_is_adopted_not_duplicated() {
        let doc = document();
        {
            let mut registry = SurfaceRegistry::new(doc.root(), viewport());
            registry.acquire(SurfacePurpose::Inspection);
        }
        // A fresh registry over the same tree must adopt the leftover node.
        let mut registry = SurfaceRegistry::new(doc.root(), viewport());
        registry.acquire(SurfacePurpose::Inspection);
        assert_eq!(registry.surface_element_count(), 1);
    }

    #[test]
    fn detach_all_removes_overlay_nodes() {
        let doc = document();
        let mut registry = SurfaceRegistry::new(doc.root(), viewport());
        registry.acquire(SurfacePurpose::Inspection);
        registry.acquire(SurfacePurpose::Mutation);
        registry.acquire_catcher();
        registry.detach_all();
        assert_eq!(registry.surface_element_count(), 0);
        assert_eq!(registry.catcher_element_count(), 0);
        assert_eq!(doc.root().children().len(), 0);
    }

    #[test]
    fn catcher_query_sees_through_overlay() {
        let doc = document();
        let page = Element::new("button");
        page.set_rect(Rect::new(10.0, 10.0, 50.0, 20.0));
        doc.root().append_child(&page);

        let mut registry = SurfaceRegistry::new(doc.root(), viewport());
        registry.acquire(SurfacePurpose::Inspection);
        let catcher = registry.acquire_catcher().expect("catcher");

        // The catcher covers the viewport and would otherwise win the hit
        // test; the query must return the page element instead.
        let hit = catcher.element_beneath(doc.root(), 20.0, 15.0).expect("hit");
        assert!(hit.ptr_eq(&page));
        assert!(catcher.element().hit_testable());
    }

    #[test]
    fn resize_debounce_coalesces_bursts() {
        let mut debouncer = ResizeDebouncer::default();
        debouncer.request(Viewport::new(100.0, 100.0, 1.0), 0);
        debouncer.request(Viewport::new(200.0, 150.0, 1.0), 40);
        assert!(debouncer.poll(100).is_none());
        let settled = debouncer.poll(40 + RESIZE_DEBOUNCE_MS).expect("viewport");
        assert_eq!(settled.size(), (200.0, 150.0));
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn repeated_identical_requests_do_not_push_the_deadline() {
        let size = Viewport::new(640.0, 480.0, 1.0);
        let mut debouncer = ResizeDebouncer::default();
        debouncer.request(size, 0);
        // A caller re-requesting the same size every frame must still let
        // the original deadline pass.
        let mut now = 16;
        while now < RESIZE_DEBOUNCE_MS {
            debouncer.request(size, now);
            assert!(debouncer.poll(now).is_none());
            now += 16;
        }
        debouncer.request(size, now);
        let settled = debouncer.poll(RESIZE_DEBOUNCE_MS).expect("viewport");
        assert_eq!(settled.size(), (640.0, 480.0));
    }
}
