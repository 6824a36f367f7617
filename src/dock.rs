//! Drag-to-corner docking for the overlay's chrome panel.
//!
//! Pointer movement below the drag-start threshold stays invisible; past
//! it the panel follows the pointer, throttled to one transform update per
//! frame. On release the total displacement either snaps the panel back to
//! its current corner or reclassifies a new one, and any corner change is
//! emitted for the persistence collaborator.

use serde::{Deserialize, Serialize};

/// Movement below this many pixels never starts a drag.
pub const DRAG_START_PX: f32 = 5.0;
/// Total displacement below this snaps back without redocking.
pub const SNAP_DISTANCE_PX: f32 = 60.0;
/// Per-axis displacement beyond this wins corner classification.
pub const DIRECTION_PX: f32 = 40.0;
/// Redock/snap-back transform animation length.
pub const REDOCK_ANIM_MS: u64 = 220;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PanelCorner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl PanelCorner {
    pub fn is_right(self) -> bool {
        matches!(self, PanelCorner::TopRight | PanelCorner::BottomRight)
    }

    pub fn is_bottom(self) -> bool {
        matches!(self, PanelCorner::BottomLeft | PanelCorner::BottomRight)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PanelCorner::TopLeft => "top-left",
            PanelCorner::TopRight => "top-right",
            PanelCorner::BottomLeft => "bottom-left",
            PanelCorner::BottomRight => "bottom-right",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "top-left" => Some(PanelCorner::TopLeft),
            "top-right" => Some(PanelCorner::TopRight),
            "bottom-left" => Some(PanelCorner::BottomLeft),
            "bottom-right" => Some(PanelCorner::BottomRight),
            _ => None,
        }
    }

    fn from_halves(right: bool, bottom: bool) -> Self {
        match (right, bottom) {
            (false, false) => PanelCorner::TopLeft,
            (true, false) => PanelCorner::TopRight,
            (false, true) => PanelCorner::BottomLeft,
            (true, true) => PanelCorner::BottomRight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockPhase {
    Idle,
    PendingDrag,
    Dragging,
    SnapBack,
    Redock,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DockEvent {
    DragStarted,
    PositionChanged {
        old: PanelCorner,
        new: PanelCorner,
    },
}

/// Ephemeral state between pointer-down and pointer-up/cancel.
#[derive(Debug, Clone, Copy)]
struct DragSession {
    origin_x: f32,
    origin_y: f32,
    start_offset: (f32, f32),
    moved: bool,
    pointer_id: u64,
}

#[derive(Debug, Clone, Copy)]
struct TransformAnim {
    from: (f32, f32),
    to: (f32, f32),
    start_ms: u64,
    duration_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafeAreaInsets {
    pub x: f32,
    pub y: f32,
}

impl Default for SafeAreaInsets {
    fn default() -> Self {
        Self { x: 16.0, y: 16.0 }
    }
}

/// Classify the release into a corner. Each axis uses the drag direction
/// when its displacement crosses the direction threshold, otherwise the
/// half of the viewport the release point falls in; with neither axis
/// crossing, this degenerates to a plain quadrant test on the release
/// point.
pub fn classify_corner(
    delta: (f32, f32),
    release: (f32, f32),
    viewport: (f32, f32),
) -> PanelCorner {
    let (dx, dy) = delta;
    let right = if dx.abs() >= DIRECTION_PX {
        dx > 0.0
    } else {
        release.0 > viewport.0 / 2.0
    };
    let bottom = if dy.abs() >= DIRECTION_PX {
        dy > 0.0
    } else {
        release.1 > viewport.1 / 2.0
    };
    PanelCorner::from_halves(right, bottom)
}

/// Panel translation when docked at `corner`, honoring safe-area insets.
pub fn corner_offset(
    corner: PanelCorner,
    viewport: (f32, f32),
    panel_size: (f32, f32),
    insets: SafeAreaInsets,
) -> (f32, f32) {
    let x = if corner.is_right() {
        viewport.0 - panel_size.0 - insets.x
    } else {
        insets.x
    };
    let y = if corner.is_bottom() {
        viewport.1 - panel_size.1 - insets.y
    } else {
        insets.y
    };
    (x, y)
}

pub struct DockController {
    corner: PanelCorner,
    phase: DockPhase,
    session: Option<DragSession>,
    offset: (f32, f32),
    pending_offset: Option<(f32, f32)>,
    anim: Option<TransformAnim>,
    viewport: (f32, f32),
    panel_size: (f32, f32),
    insets: SafeAreaInsets,
    events: Vec<DockEvent>,
}

impl DockController {
    pub fn new(corner: PanelCorner, viewport: (f32, f32), panel_size: (f32, f32)) -> Self {
        let insets = SafeAreaInsets::default();
        Self {
            corner,
            phase: DockPhase::Idle,
            session: None,
            offset: corner_offset(corner, viewport, panel_size, insets),
            pending_offset: None,
            anim: None,
            viewport,
            panel_size,
            insets,
            events: Vec::new(),
        }
    }

    pub fn corner(&self) -> PanelCorner {
        self.corner
    }

    pub fn phase(&self) -> DockPhase {
        self.phase
    }

    /// Current top-left translation of the panel.
    pub fn offset(&self) -> (f32, f32) {
        self.offset
    }

    pub fn dragging(&self) -> bool {
        self.phase == DockPhase::Dragging
    }

    /// Whether the upcoming release of `pointer_id` belongs to this panel.
    /// Hosts sharing one pointer stream check this before routing the
    /// release anywhere else.
    pub fn owns_release(&self, pointer_id: u64) -> bool {
        self.session
            .map(|session| session.pointer_id == pointer_id)
            .unwrap_or(false)
    }

    pub fn drain_events(&mut self) -> Vec<DockEvent> {
        std::mem::take(&mut self.events)
    }

    /// Programmatic moves (window resize) reposition instantly, unless a
    /// drag is in flight.
    pub fn set_viewport(&mut self, viewport: (f32, f32)) {
        self.viewport = viewport;
        if matches!(self.phase, DockPhase::Idle) {
            self.offset = corner_offset(self.corner, viewport, self.panel_size, self.insets);
        }
    }

    pub fn set_panel_size(&mut self, panel_size: (f32, f32)) {
        self.panel_size = panel_size;
        if matches!(self.phase, DockPhase::Idle) {
            self.offset =
                corner_offset(self.corner, self.viewport, self.panel_size, self.insets);
        }
    }

    pub fn on_pointer_down(&mut self, x: f32, y: f32, pointer_id: u64) {
        if self.phase != DockPhase::Idle {
            return;
        }
        self.session = Some(DragSession {
            origin_x: x,
            origin_y: y,
            start_offset: self.offset,
            moved: false,
            pointer_id,
        });
        self.phase = DockPhase::PendingDrag;
    }

    pub fn on_pointer_move(&mut self, x: f32, y: f32, pointer_id: u64) {
        let Some(session) = self.session else { return };
        if session.pointer_id != pointer_id {
            return;
        }
        let dx = x - session.origin_x;
        let dy = y - session.origin_y;

        if self.phase == DockPhase::PendingDrag {
            if (dx * dx + dy * dy).sqrt() < DRAG_START_PX {
                return;
            }
            self.phase = DockPhase::Dragging;
            self.events.push(DockEvent::DragStarted);
            if let Some(session) = self.session.as_mut() {
                session.moved = true;
            }
            tracing::debug!("panel drag started");
        }
        if self.phase == DockPhase::Dragging {
            // Throttled: one pending transform applied on the next tick.
            self.pending_offset =
                Some((session.start_offset.0 + dx, session.start_offset.1 + dy));
        }
    }

    pub fn on_pointer_up(&mut self, x: f32, y: f32, pointer_id: u64, now_ms: u64) {
        let Some(session) = self.session.take() else { return };
        if session.pointer_id != pointer_id {
            self.session = Some(session);
            return;
        }
        let dx = x - session.origin_x;
        let dy = y - session.origin_y;
        let distance = (dx * dx + dy * dy).sqrt();

        if self.phase == DockPhase::PendingDrag {
            // Never crossed the drag-start threshold: a click, not a drag.
            self.phase = DockPhase::Idle;
            return;
        }

        self.pending_offset = None;
        if distance < SNAP_DISTANCE_PX {
            self.phase = DockPhase::SnapBack;
            self.animate_to_corner(self.corner, now_ms);
            return;
        }

        let new_corner = classify_corner((dx, dy), (x, y), self.viewport);
        if new_corner != self.corner {
            let old = self.corner;
            self.corner = new_corner;
            self.events.push(DockEvent::PositionChanged {
                old,
                new: new_corner,
            });
            tracing::debug!(?old, new = ?new_corner, "panel redocked");
        }
        self.phase = DockPhase::Redock;
        self.animate_to_corner(self.corner, now_ms);
    }

    pub fn on_pointer_cancel(&mut self, pointer_id: u64, now_ms: u64) {
        let Some(session) = self.session.take() else { return };
        if session.pointer_id != pointer_id {
            self.session = Some(session);
            return;
        }
        self.pending_offset = None;
        if self.phase == DockPhase::Dragging {
            self.phase = DockPhase::SnapBack;
            self.animate_to_corner(self.corner, now_ms);
        } else {
            self.phase = DockPhase::Idle;
        }
    }

    fn animate_to_corner(&mut self, corner: PanelCorner, now_ms: u64) {
        let to = corner_offset(corner, self.viewport, self.panel_size, self.insets);
        self.anim = Some(TransformAnim {
            from: self.offset,
            to,
            start_ms: now_ms,
            duration_ms: REDOCK_ANIM_MS,
        });
    }

    /// Advance one frame: apply the throttled drag transform and the
    /// redock/snap-back animation. Returns whether another frame is needed.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        if let Some(offset) = self.pending_offset.take() {
            self.offset = offset;
        }
        if let Some(anim) = self.anim {
            let elapsed = now_ms.saturating_sub(anim.start_ms);
            if elapsed >= anim.duration_ms {
                self.offset = anim.to;
                // Clear the transition so later programmatic moves are
                // instantaneous.
                self.anim = None;
                self.phase = DockPhase::Idle;
            } else {
                let t = elapsed as f32 / anim.duration_ms as f32;
                let eased = t * t * (3.0 - 2.0 * t);
                self.offset = (
                    anim.from.0 + (anim.to.0 - anim.from.0) * eased,
                    anim.from.1 + (anim.to.1 - anim.from.1) * eased,
                );
            }
        }
        self.anim.is_some() || self.pending_offset.is_some() || self.phase == DockPhase::Dragging
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: (f32, f32) = (1000.0, 800.0);
    const PANEL: (f32, f32) = (120.0, 48.0);

    fn controller() -> DockController {
        DockController::new(PanelCorner::TopLeft, VIEWPORT, PANEL)
    }

    #[test]
    fn sub_threshold_jiggle_emits_nothing() {
        let mut dock = controller();
        dock.on_pointer_down(30.0, 30.0, 1);
        dock.on_pointer_move(33.0, 30.0, 1);
        dock.on_pointer_up(33.0, 30.0, 1, 0);
        assert_eq!(dock.phase(), DockPhase::Idle);
        assert!(dock.drain_events().is_empty());
    }

    #[test]
    fn long_rightward_drag_released_low_redocks_bottom_right() {
        let mut dock = controller();
        dock.on_pointer_down(30.0, 500.0, 1);
        dock.on_pointer_move(110.0, 500.0, 1);
        dock.on_pointer_up(110.0, 500.0, 1, 0);

        assert_eq!(dock.corner(), PanelCorner::BottomRight);
        let events = dock.drain_events();
        assert_eq!(events[0], DockEvent::DragStarted);
        assert_eq!(
            events[1],
            DockEvent::PositionChanged {
                old: PanelCorner::TopLeft,
                new: PanelCorner::BottomRight,
            }
        );
    }

    #[test]
    fn short_drag_snaps_back_without_position_event() {
        let mut dock = controller();
        dock.on_pointer_down(30.0, 30.0, 1);
        dock.on_pointer_move(60.0, 30.0, 1);
        dock.on_pointer_up(60.0, 30.0, 1, 0);

        assert_eq!(dock.corner(), PanelCorner::TopLeft);
        assert_eq!(dock.phase(), DockPhase::SnapBack);
        let events = dock.drain_events();
        assert_eq!(events, vec![DockEvent::DragStarted]);
    }

    #[test]
    fn quadrant_fallback_when_neither_axis_crosses() {
        // 42px total, diagonally: below the direction threshold per axis.
        let corner = classify_corner((30.0, 30.0), (900.0, 100.0), VIEWPORT);
        assert_eq!(corner, PanelCorner::TopRight);
    }

    #[test]
    fn redock_animation_settles_then_clears_transition() {
        let mut dock = controller();
        dock.on_pointer_down(30.0, 30.0, 1);
        dock.on_pointer_move(130.0, 30.0, 1);
        dock.on_pointer_up(130.0, 30.0, 1, 1_000);
        assert_eq!(dock.phase(), DockPhase::Redock);

        assert!(dock.tick(1_000));
        assert!(dock.tick(1_000 + REDOCK_ANIM_MS / 2));
        assert!(!dock.tick(1_000 + REDOCK_ANIM_MS));
        assert_eq!(dock.phase(), DockPhase::Idle);

        let expected = corner_offset(dock.corner(), VIEWPORT, PANEL, SafeAreaInsets::default());
        assert_eq!(dock.offset(), expected);

        // Post-animation programmatic moves are instantaneous.
        dock.set_viewport((600.0, 400.0));
        let expected = corner_offset(dock.corner(), (600.0, 400.0), PANEL, SafeAreaInsets::default());
        assert_eq!(dock.offset(), expected);
    }

    #[test]
    fn drag_transform_is_throttled_to_one_frame() {
        let mut dock = controller();
        dock.on_pointer_down(30.0, 30.0, 1);
        dock.on_pointer_move(80.0, 30.0, 1);
        dock.on_pointer_move(120.0, 60.0, 1);
        let before = dock.offset();
        assert_eq!(before, corner_offset(PanelCorner::TopLeft, VIEWPORT, PANEL, SafeAreaInsets::default()));
        dock.tick(0);
        // Only the latest pending transform applies.
        let (x, y) = dock.offset();
        assert_eq!((x - before.0, y - before.1), (90.0, 30.0));
    }

    #[test]
    fn release_ownership_tracks_the_active_session() {
        let mut dock = controller();
        assert!(!dock.owns_release(1));

        // A pointer-down on the panel claims the release even before the
        // drag threshold, so a click on the chrome never leaks elsewhere.
        dock.on_pointer_down(30.0, 30.0, 1);
        assert!(dock.owns_release(1));
        assert!(!dock.owns_release(2));

        dock.on_pointer_move(130.0, 30.0, 1);
        assert!(dock.owns_release(1));
        dock.on_pointer_up(130.0, 30.0, 1, 0);
        assert!(!dock.owns_release(1));
    }

    #[test]
    fn foreign_pointer_ids_are_ignored() {
        let mut dock = controller();
        dock.on_pointer_down(30.0, 30.0, 1);
        dock.on_pointer_move(200.0, 200.0, 2);
        dock.on_pointer_up(200.0, 200.0, 2, 0);
        assert_eq!(dock.phase(), DockPhase::PendingDrag);
        assert!(dock.drain_events().is_empty());
    }
}
