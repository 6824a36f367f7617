//! Mutation-triggered highlights with time decay.
//!
//! Every mutation record registers or refreshes an entry for the mutated
//! element (and any newly added elements). Entries fade out over the decay
//! window, follow their element's latest bounding box, and merge with
//! neighbours at the same rounded screen position for labeling so rapid
//! repeats show one multiplied label instead of a stack.

use std::collections::HashMap;

use crate::geometry::{step_rect, Rect};
use crate::overlay::paint::{
    draw_target, ColorClass, DisplayList, TextMeasure, STROKE_WIDTH,
};
use crate::resolver::IdentityResolver;
use crate::tree::{Element, MutationRecord, WeakElement};

pub const HIGHLIGHT_DURATION_MS: u64 = 750;

pub struct HighlightEntry {
    element: WeakElement,
    pub name: String,
    pub current: Rect,
    pub target: Rect,
    pub start_ms: u64,
    pub occurrence_count: u32,
    pub color_class: ColorClass,
}

impl HighlightEntry {
    pub fn alpha(&self, now_ms: u64, duration_ms: u64) -> f32 {
        if duration_ms == 0 {
            return 0.0;
        }
        let elapsed = now_ms.saturating_sub(self.start_ms) as f32;
        (1.0 - elapsed / duration_ms as f32).clamp(0.0, 1.0)
    }
}

/// One merged label covering every entry at the same rounded position.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedLabel {
    pub anchor: Rect,
    pub text: String,
    pub alpha: f32,
    pub color_class: ColorClass,
}

pub struct HighlightEngine {
    entries: Vec<HighlightEntry>,
    duration_ms: u64,
    lerp_speed: f32,
}

impl HighlightEngine {
    pub fn new(duration_ms: u64, lerp_speed: f32) -> Self {
        Self {
            entries: Vec::new(),
            duration_ms,
            lerp_speed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[HighlightEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Ingest one observer callback's records, in delivery order. Returns
    /// true when the active set is non-empty afterwards (the caller should
    /// ensure a tick job is running).
    pub fn on_mutations(
        &mut self,
        records: &[MutationRecord],
        resolver: &IdentityResolver,
        now_ms: u64,
    ) -> bool {
        for record in records {
            self.touch(&record.target, resolver, now_ms);
            for added in &record.added {
                self.touch(added, resolver, now_ms);
            }
        }
        !self.entries.is_empty()
    }

    fn touch(&mut self, element: &Element, resolver: &IdentityResolver, now_ms: u64) {
        if element.is_overlay_owned() || !element.connected() {
            return;
        }
        let rect = element.rect();
        if rect.is_empty() {
            return;
        }
        // Match against the live handle; a dead entry must never swallow a
        // fresh element's first highlight.
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.element.upgrade().is_some_and(|live| live.ptr_eq(element)))
        {
            entry.target = rect;
            entry.start_ms = now_ms;
            entry.occurrence_count += 1;
            return;
        }
        let (name, color_class) = match resolver.resolve(element) {
            Some(record) => {
                let class = ColorClass::for_record(&record);
                (record.name, class)
            }
            None => (element.tag(), ColorClass::Plain),
        };
        self.entries.push(HighlightEntry {
            element: element.downgrade(),
            name,
            current: rect,
            target: rect,
            start_ms: now_ms,
            occurrence_count: 1,
            color_class,
        });
    }

    /// One decay sweep: drop dead or fully faded entries, then move each
    /// survivor toward its element's latest bounding box. Returns whether
    /// entries remain (false tells the tick job to finish).
    pub fn step(&mut self, now_ms: u64) -> bool {
        let duration = self.duration_ms;
        let speed = self.lerp_speed;
        self.entries.retain_mut(|entry| {
            let Some(element) = entry.element.upgrade() else {
                return false;
            };
            if !element.connected() {
                return false;
            }
            if entry.alpha(now_ms, duration) <= 0.0 {
                return false;
            }
            entry.target = element.rect();
            let (next, _) = step_rect(entry.current, entry.target, speed);
            entry.current = next;
            true
        });
        !self.entries.is_empty()
    }

    /// Labels for the current entry set, merged by rounded screen position:
    /// occurrence counts combine, the strongest alpha wins.
    pub fn labels(&self, now_ms: u64) -> Vec<MergedLabel> {
        let mut groups: Vec<((i64, i64), MergedLabel, u32, String)> = Vec::new();
        let mut index: HashMap<(i64, i64), usize> = HashMap::new();
        for entry in &self.entries {
            let key = entry.current.rounded_key();
            let alpha = entry.alpha(now_ms, self.duration_ms);
            match index.get(&key) {
                Some(&slot) => {
                    let (_, label, count, name) = &mut groups[slot];
                    *count += entry.occurrence_count;
                    if alpha > label.alpha {
                        label.alpha = alpha;
                        label.color_class = entry.color_class;
                        *name = entry.name.clone();
                        label.anchor = entry.current;
                    }
                }
                None => {
                    index.insert(key, groups.len());
                    groups.push((
                        key,
                        MergedLabel {
                            anchor: entry.current,
                            text: String::new(),
                            alpha,
                            color_class: entry.color_class,
                        },
                        entry.occurrence_count,
                        entry.name.clone(),
                    ));
                }
            }
        }
        groups
            .into_iter()
            .map(|(_, mut label, count, name)| {
                label.text = if count > 1 {
                    format!("{name} \u{00d7}{count}")
                } else {
                    name
                };
                label
            })
            .collect()
    }

    /// Build the mutation overlay's display list for this frame.
    pub fn render(
        &self,
        list: &mut DisplayList,
        now_ms: u64,
        viewport: (f32, f32),
        measure: &dyn TextMeasure,
    ) {
        list.clear();
        for entry in &self.entries {
            let alpha = entry.alpha(now_ms, self.duration_ms);
            if alpha <= 0.0 {
                continue;
            }
            // Rect strokes are per entry; labels are merged below.
            let mut rect_only = DisplayList::default();
            draw_target(
                &mut rect_only,
                entry.current,
                "",
                entry.color_class,
                alpha,
                STROKE_WIDTH,
                0.0,
                viewport,
                measure,
            );
            for cmd in rect_only.cmds() {
                if !matches!(cmd, crate::overlay::paint::PaintCmd::Label { .. }) {
                    list.push(cmd.clone());
                }
            }
        }
        for label in self.labels(now_ms) {
            if label.alpha <= 0.0 {
                continue;
            }
            let pill = crate::overlay::paint::label_rect(
                label.anchor,
                &label.text,
                viewport,
                measure,
            );
            list.push(crate::overlay::paint::PaintCmd::Label {
                rect: pill,
                text: label.text,
                color: label.color_class,
                alpha: label.alpha,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{IdentityResolver, MARKER_ATTRIBUTE};
    use crate::tree::Document;

    fn setup() -> (Document, IdentityResolver, HighlightEngine) {
        let doc = Document::new(Rect::new(0.0, 0.0, 800.0, 600.0));
        let resolver = IdentityResolver::new(MARKER_ATTRIBUTE);
        let engine = HighlightEngine::new(HIGHLIGHT_DURATION_MS, crate::geometry::LERP_SPEED);
        (doc, resolver, engine)
    }

    fn element_in(doc: &Document, tag: &str, rect: Rect) -> Element {
        let element = Element::new(tag);
        element.set_rect(rect);
        doc.root().append_child(&element);
        element
    }

    #[test]
    fn entry_decays_and_expires() {
        let (doc, resolver, mut engine) = setup();
        let element = element_in(&doc, "row", Rect::new(10.0, 10.0, 100.0, 20.0));
        doc.observe(false);
        element.set_attribute("state", "dirty");
        engine.on_mutations(&doc.take_records(), &resolver, 1_000);

        assert_eq!(engine.entry_count(), 1);
        let entry = &engine.entries()[0];
        assert!((entry.alpha(1_000, HIGHLIGHT_DURATION_MS) - 1.0).abs() < f32::EPSILON);
        assert!(entry.alpha(1_000 + HIGHLIGHT_DURATION_MS, HIGHLIGHT_DURATION_MS) <= 0.0);

        assert!(engine.step(1_100));
        assert!(!engine.step(1_000 + HIGHLIGHT_DURATION_MS + 1));
        assert!(engine.is_empty());
    }

    #[test]
    fn repeat_mutation_refreshes_entry() {
        let (doc, resolver, mut engine) = setup();
        let element = element_in(&doc, "row", Rect::new(10.0, 10.0, 100.0, 20.0));
        doc.observe(false);

        element.set_attribute("state", "a");
        engine.on_mutations(&doc.take_records(), &resolver, 1_000);
        element.set_attribute("state", "b");
        engine.on_mutations(&doc.take_records(), &resolver, 1_400);

        assert_eq!(engine.entry_count(), 1);
        let entry = &engine.entries()[0];
        assert_eq!(entry.occurrence_count, 2);
        assert_eq!(entry.start_ms, 1_400);
    }

    #[test]
    fn disconnected_elements_are_swept() {
        let (doc, resolver, mut engine) = setup();
        let element = element_in(&doc, "row", Rect::new(10.0, 10.0, 100.0, 20.0));
        doc.observe(false);
        element.set_attribute("state", "dirty");
        engine.on_mutations(&doc.take_records(), &resolver, 0);
        assert_eq!(engine.entry_count(), 1);

        element.detach();
        assert!(!engine.step(10));
        assert!(engine.is_empty());
    }

    #[test]
    fn dropped_element_entry_does_not_absorb_a_new_element() {
        let (doc, resolver, mut engine) = setup();
        let rect = Rect::new(10.0, 10.0, 100.0, 20.0);
        let first = element_in(&doc, "row", rect);
        doc.observe(false);
        first.set_attribute("state", "a");
        engine.on_mutations(&doc.take_records(), &resolver, 0);
        first.detach();
        drop(first);

        // A replacement at the same position must get its own fresh entry,
        // not refresh the dead one.
        let second = element_in(&doc, "row", rect);
        let _ = doc.take_records();
        second.set_attribute("state", "a");
        engine.on_mutations(&doc.take_records(), &resolver, 500);
        let fresh = engine
            .entries()
            .iter()
            .find(|entry| entry.start_ms == 500)
            .expect("fresh entry");
        assert_eq!(fresh.occurrence_count, 1);

        // The dead entry is swept on the next step; the fresh one survives.
        assert!(engine.step(510));
        assert_eq!(engine.entry_count(), 1);
    }

    #[test]
    fn overlay_owned_elements_are_ignored() {
        let (doc, resolver, mut engine) = setup();
        let element = element_in(&doc, "overlay-surface", Rect::new(0.0, 0.0, 800.0, 600.0));
        element.set_overlay_owned(true);
        doc.observe(false);
        element.set_attribute("state", "dirty");
        engine.on_mutations(&doc.take_records(), &resolver, 0);
        assert!(engine.is_empty());
    }

    #[test]
    fn added_elements_register_entries() {
        let (doc, resolver, mut engine) = setup();
        let panel = element_in(&doc, "panel", Rect::new(0.0, 0.0, 200.0, 200.0));
        doc.observe(false);

        let child = Element::new("row");
        child.set_rect(Rect::new(5.0, 5.0, 50.0, 10.0));
        panel.append_child(&child);
        engine.on_mutations(&doc.take_records(), &resolver, 0);
        // One entry for the panel (child list target), one for the new row.
        assert_eq!(engine.entry_count(), 2);
    }

    #[test]
    fn same_position_entries_merge_for_labels() {
        let (doc, resolver, mut engine) = setup();
        let rect = Rect::new(40.0, 40.0, 80.0, 16.0);
        let first = element_in(&doc, "cell", rect);
        let second = element_in(&doc, "cell", rect);
        doc.observe(false);

        first.set_attribute("v", "1");
        first.set_attribute("v", "2");
        second.set_attribute("v", "1");
        engine.on_mutations(&doc.take_records(), &resolver, 0);

        let labels = engine.labels(0);
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].text, "cell \u{00d7}3");
    }

    #[test]
    fn distinct_positions_keep_separate_labels() {
        let (doc, resolver, mut engine) = setup();
        let first = element_in(&doc, "cell", Rect::new(40.0, 40.0, 80.0, 16.0));
        let second = element_in(&doc, "cell", Rect::new(300.0, 40.0, 80.0, 16.0));
        doc.observe(false);

        first.set_attribute("v", "1");
        second.set_attribute("v", "1");
        engine.on_mutations(&doc.take_records(), &resolver, 0);
        assert_eq!(engine.labels(0).len(), 2);
    }
}
