//! Hover/focus state machine: pointer tracking, keyboard navigation of the
//! ancestor chain, and the "open source" action.
//!
//! All focus state lives in this one object; every input event funnels
//! through a single transition function per event type. While inactive,
//! every handler is a no-op.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::geometry::TrackedRect;
use crate::highlight::HighlightEngine;
use crate::ide::IdeOpener;
use crate::overlay::paint::{draw_target, ColorClass, TextMeasure, STROKE_WIDTH};
use crate::overlay::surface::{
    ResizeDebouncer, SurfacePurpose, SurfaceRegistry, Viewport,
};
use crate::resolver::{ComponentRecord, IdentityResolver};
use crate::settings::InspectorSettings;
use crate::store::{KvStore, KEY_ENABLED};
use crate::tick::{JobId, JobStatus, TickSource};
use crate::tree::{Document, Element, WeakElement};

/// Surfaces fade for this long before they are detached.
pub const DEACTIVATE_FADE_MS: u64 = 150;
/// Length of the boundary pulse/shake feedback animations.
pub const FEEDBACK_DURATION_MS: u64 = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectorPhase {
    Inactive,
    /// Active with nothing focused.
    ActiveIdle,
    /// Active and tracking a focused component.
    ActiveTracking,
}

/// Non-navigating animation played when keyboard navigation hits the top
/// (pulse) or bottom (shake) of the ancestor chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    Pulse,
    Shake,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    ArrowUp,
    ArrowDown,
    Enter,
    Escape,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InspectorEvent {
    ActivationChanged(bool),
    SourceOpened {
        path: String,
        line: Option<String>,
    },
}

/// One step of the focus lineage, valid only until the pointer moves.
pub struct FocusHistoryEntry {
    element: WeakElement,
    pub name: String,
    pub is_framework_managed: bool,
}

struct FocusState {
    record: ComponentRecord,
    tracked: TrackedRect,
}

fn ensure_job<F>(ticks: &mut TickSource, slot: &Rc<Cell<Option<JobId>>>, job: F)
where
    F: FnMut(u64) -> JobStatus + 'static,
{
    if slot.get().is_some() {
        return;
    }
    let slot_clone = Rc::clone(slot);
    let mut job = job;
    let id = ticks.register(Box::new(move |now| {
        let status = job(now);
        if status == JobStatus::Finished {
            slot_clone.set(None);
        }
        status
    }));
    slot.set(Some(id));
}

pub struct Inspector {
    phase: InspectorPhase,
    document: Document,
    resolver: IdentityResolver,
    surfaces: Rc<RefCell<SurfaceRegistry>>,
    highlights: Rc<RefCell<HighlightEngine>>,
    focus: Rc<RefCell<Option<FocusState>>>,
    history: Vec<FocusHistoryEntry>,
    feedback: Rc<Cell<Option<(FeedbackKind, u64)>>>,
    fade_started: Rc<Cell<Option<u64>>>,
    resize: Rc<RefCell<ResizeDebouncer>>,
    ticks: TickSource,
    anim_job: Rc<Cell<Option<JobId>>>,
    highlight_job: Rc<Cell<Option<JobId>>>,
    feedback_job: Rc<Cell<Option<JobId>>>,
    fade_job: Rc<Cell<Option<JobId>>>,
    resize_job: Rc<Cell<Option<JobId>>>,
    ide: Box<dyn IdeOpener>,
    store: Option<Rc<dyn KvStore>>,
    events: Vec<InspectorEvent>,
    lerp_speed: f32,
}

impl Inspector {
    pub fn new(
        document: Document,
        settings: &InspectorSettings,
        viewport: Viewport,
        ide: Box<dyn IdeOpener>,
        store: Option<Rc<dyn KvStore>>,
    ) -> Self {
        let surfaces = SurfaceRegistry::new(document.root(), viewport);
        Self {
            phase: InspectorPhase::Inactive,
            resolver: IdentityResolver::new(&settings.marker_attribute),
            surfaces: Rc::new(RefCell::new(surfaces)),
            highlights: Rc::new(RefCell::new(HighlightEngine::new(
                settings.highlight_duration_ms,
                settings.lerp_speed,
            ))),
            focus: Rc::new(RefCell::new(None)),
            history: Vec::new(),
            feedback: Rc::new(Cell::new(None)),
            fade_started: Rc::new(Cell::new(None)),
            resize: Rc::new(RefCell::new(ResizeDebouncer::default())),
            ticks: TickSource::new(),
            anim_job: Rc::new(Cell::new(None)),
            highlight_job: Rc::new(Cell::new(None)),
            feedback_job: Rc::new(Cell::new(None)),
            fade_job: Rc::new(Cell::new(None)),
            resize_job: Rc::new(Cell::new(None)),
            ide,
            store,
            events: Vec::new(),
            document,
            lerp_speed: settings.lerp_speed,
        }
    }

    pub fn phase(&self) -> InspectorPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase != InspectorPhase::Inactive
    }

    pub fn drain_events(&mut self) -> Vec<InspectorEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn focused_name(&self) -> Option<String> {
        self.focus
            .borrow()
            .as_ref()
            .map(|state| state.record.name.clone())
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn feedback_kind(&self) -> Option<FeedbackKind> {
        self.feedback.get().map(|(kind, _)| kind)
    }

    pub fn surface_element_count(&self) -> usize {
        self.surfaces.borrow().surface_element_count()
    }

    pub fn catcher_element_count(&self) -> usize {
        self.surfaces.borrow().catcher_element_count()
    }

    pub fn highlight_count(&self) -> usize {
        self.highlights.borrow().entry_count()
    }

    /// Create (or re-adopt) the overlay surfaces and event catcher, start
    /// the mutation observer and emit the activation change. Calling this
    /// twice without a deactivate is a no-op.
    pub fn activate(&mut self, _now_ms: u64) {
        if self.is_active() {
            return;
        }
        if let Some(id) = self.fade_job.take() {
            self.ticks.cancel(id);
        }
        self.fade_started.set(None);
        {
            let mut surfaces = self.surfaces.borrow_mut();
            surfaces.acquire(SurfacePurpose::Inspection);
            surfaces.acquire(SurfacePurpose::Mutation);
            surfaces.acquire_catcher();
            surfaces.set_opacity(1.0);
        }
        self.document.observe(true);
        self.phase = InspectorPhase::ActiveIdle;
        if let Some(store) = &self.store {
            store.set_bool(KEY_ENABLED, true);
        }
        self.events.push(InspectorEvent::ActivationChanged(true));
        tracing::info!("inspector activated");
    }

    /// Tear down: stop the observer, cancel every scheduled job, clear
    /// focus and history, and fade the surfaces out before detaching them.
    pub fn deactivate(&mut self, now_ms: u64) {
        if !self.is_active() {
            return;
        }
        self.document.disconnect_observer();
        self.ticks.clear();
        for slot in [
            &self.anim_job,
            &self.highlight_job,
            &self.feedback_job,
            &self.fade_job,
            &self.resize_job,
        ] {
            slot.set(None);
        }
        *self.focus.borrow_mut() = None;
        self.history.clear();
        self.feedback.set(None);
        self.highlights.borrow_mut().clear();
        self.phase = InspectorPhase::Inactive;
        if let Some(store) = &self.store {
            store.set_bool(KEY_ENABLED, false);
        }
        self.events.push(InspectorEvent::ActivationChanged(false));

        self.fade_started.set(Some(now_ms));
        let fade_started = Rc::clone(&self.fade_started);
        let surfaces = Rc::clone(&self.surfaces);
        ensure_job(&mut self.ticks, &self.fade_job, move |now| {
            let Some(start) = fade_started.get() else {
                return JobStatus::Finished;
            };
            let elapsed = now.saturating_sub(start);
            if elapsed >= DEACTIVATE_FADE_MS {
                surfaces.borrow_mut().detach_all();
                fade_started.set(None);
                JobStatus::Finished
            } else {
                let t = elapsed as f32 / DEACTIVATE_FADE_MS as f32;
                surfaces.borrow_mut().set_opacity(1.0 - t);
                JobStatus::Running
            }
        });
        tracing::info!("inspector deactivated");
    }

    pub fn toggle(&mut self, now_ms: u64) {
        if self.is_active() {
            self.deactivate(now_ms);
        } else {
            self.activate(now_ms);
        }
    }

    fn element_beneath(&self, x: f32, y: f32) -> Option<Element> {
        let surfaces = self.surfaces.borrow();
        let catcher = surfaces.catcher()?;
        catcher.element_beneath(self.document.root(), x, y)
    }

    fn clear_focus(&mut self) {
        *self.focus.borrow_mut() = None;
        self.phase = InspectorPhase::ActiveIdle;
    }

    fn focus_record(&mut self, record: ComponentRecord) {
        let Some(element) = record.element() else {
            self.clear_focus();
            return;
        };
        let target = element.rect();
        let tracked = match self.focus.borrow().as_ref() {
            Some(previous) => TrackedRect::gliding(previous.tracked.current, target),
            None => TrackedRect::pinned(target),
        };
        *self.focus.borrow_mut() = Some(FocusState { record, tracked });
        self.phase = InspectorPhase::ActiveTracking;

        let focus = Rc::clone(&self.focus);
        let speed = self.lerp_speed;
        ensure_job(&mut self.ticks, &self.anim_job, move |_now| {
            let mut focus = focus.borrow_mut();
            match focus.as_mut() {
                Some(state) => {
                    if !state.tracked.step(speed) {
                        JobStatus::Running
                    } else {
                        JobStatus::Finished
                    }
                }
                None => JobStatus::Finished,
            }
        });
    }

    /// Pointer movement: re-resolve the element under the cursor. The
    /// focus history only describes the lineage of the last pointer
    /// resolution, so any focus change here clears it.
    pub fn on_pointer_move(&mut self, x: f32, y: f32, _now_ms: u64) {
        if !self.is_active() {
            return;
        }
        let under = self.element_beneath(x, y);
        let record = match under {
            Some(element) if !element.is_overlay_owned() => self.resolver.resolve(&element),
            _ => None,
        };
        let Some(record) = record else {
            self.clear_focus();
            return;
        };

        let same = {
            let focus = self.focus.borrow();
            match (focus.as_ref().and_then(|s| s.record.element()), record.element()) {
                (Some(current), Some(next)) => current.ptr_eq(&next),
                _ => false,
            }
        };
        if same {
            return;
        }
        self.history.clear();
        self.feedback.set(None);
        self.focus_record(record);
    }

    /// Click: resolve under the pointer and open the component's source if
    /// it has any, deactivating either way once a component was found.
    /// Clicks on overlay-owned chrome pass through untouched.
    pub fn on_click(&mut self, x: f32, y: f32, now_ms: u64) {
        if !self.is_active() {
            return;
        }
        let Some(element) = self.element_beneath(x, y) else {
            return;
        };
        if element.is_overlay_owned() {
            return;
        }
        let Some(record) = self.resolver.resolve(&element) else {
            return;
        };
        self.open_or_dismiss(record, now_ms);
    }

    fn open_or_dismiss(&mut self, record: ComponentRecord, now_ms: u64) {
        if let Some(path) = record.source_path.clone() {
            let line = record.source_line.clone();
            if let Err(err) = self.ide.open(&path, line.as_deref()) {
                tracing::warn!(%err, "open in IDE failed");
            }
            self.events.push(InspectorEvent::SourceOpened { path, line });
        }
        self.deactivate(now_ms);
    }

    pub fn on_key(&mut self, key: KeyInput, now_ms: u64) {
        if !self.is_active() {
            return;
        }
        match key {
            KeyInput::Escape => self.deactivate(now_ms),
            KeyInput::ArrowUp => self.focus_parent(now_ms),
            KeyInput::ArrowDown => self.focus_previous_child(now_ms),
            KeyInput::Enter => {
                let record = self
                    .focus
                    .borrow()
                    .as_ref()
                    .map(|state| state.record.clone());
                if let Some(record) = record {
                    self.open_or_dismiss(record, now_ms);
                }
            }
        }
    }

    fn focus_parent(&mut self, now_ms: u64) {
        let record = self
            .focus
            .borrow()
            .as_ref()
            .map(|state| state.record.clone());
        let Some(record) = record else { return };
        match self.resolver.parent_of(&record) {
            Some(parent) => {
                self.history.push(FocusHistoryEntry {
                    element: record.weak_element(),
                    name: record.name.clone(),
                    is_framework_managed: record.is_framework_managed,
                });
                self.focus_record(parent);
            }
            None => self.start_feedback(FeedbackKind::Pulse, now_ms),
        }
    }

    fn focus_previous_child(&mut self, now_ms: u64) {
        loop {
            let Some(entry) = self.history.pop() else {
                self.start_feedback(FeedbackKind::Shake, now_ms);
                return;
            };
            let record = entry
                .element
                .upgrade()
                .filter(|element| element.connected())
                .and_then(|element| self.resolver.resolve(&element));
            if let Some(record) = record {
                self.focus_record(record);
                return;
            }
            // Stale entry (element vanished since it was pushed): keep
            // popping.
        }
    }

    fn start_feedback(&mut self, kind: FeedbackKind, now_ms: u64) {
        self.feedback.set(Some((kind, now_ms)));
        let feedback = Rc::clone(&self.feedback);
        ensure_job(&mut self.ticks, &self.feedback_job, move |now| {
            match feedback.get() {
                Some((_, start)) if now.saturating_sub(start) < FEEDBACK_DURATION_MS => {
                    JobStatus::Running
                }
                _ => {
                    feedback.set(None);
                    JobStatus::Finished
                }
            }
        });
    }

    /// Viewport resize, debounced before size and scale are re-applied.
    pub fn on_resize(&mut self, viewport: Viewport, now_ms: u64) {
        self.resize.borrow_mut().request(viewport, now_ms);
        let resize = Rc::clone(&self.resize);
        let surfaces = Rc::clone(&self.surfaces);
        ensure_job(&mut self.ticks, &self.resize_job, move |now| {
            match resize.borrow_mut().poll(now) {
                Some(viewport) => {
                    surfaces.borrow_mut().apply_viewport(viewport);
                    JobStatus::Finished
                }
                None => JobStatus::Running,
            }
        });
    }

    /// One cooperative frame: drain pending mutation records, then run
    /// every scheduled job. Returns whether another frame is needed.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        if self.is_active() {
            let records = self.document.take_records();
            if !records.is_empty() {
                let has_entries = self.highlights.borrow_mut().on_mutations(
                    &records,
                    &self.resolver,
                    now_ms,
                );
                if has_entries {
                    let highlights = Rc::clone(&self.highlights);
                    ensure_job(&mut self.ticks, &self.highlight_job, move |now| {
                        if highlights.borrow_mut().step(now) {
                            JobStatus::Running
                        } else {
                            JobStatus::Finished
                        }
                    });
                }
            }
        }
        self.ticks.tick(now_ms)
    }

    pub fn needs_frame(&self) -> bool {
        self.ticks.has_work()
    }

    /// Rebuild the surfaces' display lists for this frame. While inactive
    /// the lists are left as-is so the deactivation fade has something to
    /// dim.
    pub fn render(&self, now_ms: u64, measure: &dyn TextMeasure) {
        if !self.is_active() {
            return;
        }
        let mut surfaces = self.surfaces.borrow_mut();
        let viewport = surfaces.viewport().size();

        if let Some(surface) = surfaces.surface_mut(SurfacePurpose::Inspection) {
            surface.display.clear();
            let focus = self.focus.borrow();
            if let Some(state) = focus.as_ref() {
                if state.record.element().is_some() {
                    let (alpha, stroke, label_dx) =
                        feedback_effects(self.feedback.get(), now_ms);
                    draw_target(
                        &mut surface.display,
                        state.tracked.current,
                        &state.record.name,
                        ColorClass::for_record(&state.record),
                        alpha,
                        stroke,
                        label_dx,
                        viewport,
                        measure,
                    );
                }
            }
        }

        if let Some(surface) = surfaces.surface_mut(SurfacePurpose::Mutation) {
            self.highlights
                .borrow()
                .render(&mut surface.display, now_ms, viewport, measure);
        }
    }

    /// Shared access to the surfaces for the paint backend.
    pub fn surfaces(&self) -> Rc<RefCell<SurfaceRegistry>> {
        Rc::clone(&self.surfaces)
    }
}

/// Stroke/alpha/label modifiers for the boundary feedback animations:
/// a pulsing border for the top of the chain, a shaking label for the
/// bottom.
fn feedback_effects(feedback: Option<(FeedbackKind, u64)>, now_ms: u64) -> (f32, f32, f32) {
    match feedback {
        Some((FeedbackKind::Pulse, start)) => {
            let elapsed = now_ms.saturating_sub(start) as f32;
            let wave = (elapsed * 0.03).sin().abs();
            (0.55 + 0.45 * wave, STROKE_WIDTH + 1.5 * wave, 0.0)
        }
        Some((FeedbackKind::Shake, start)) => {
            let elapsed = now_ms.saturating_sub(start) as f32;
            let offset = 6.0 * (elapsed * 0.06).sin();
            (1.0, STROKE_WIDTH, offset)
        }
        None => (1.0, STROKE_WIDTH, 0.0),
    }
}
