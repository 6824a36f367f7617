//! Pure drawing layer: converts target rectangles and labels into a
//! display list. Backend painters replay the list; nothing here touches a
//! real surface, which keeps placement logic testable.

use crate::geometry::Rect;
use crate::resolver::ComponentRecord;

pub const LABEL_PADDING_X: f32 = 6.0;
pub const LABEL_PADDING_Y: f32 = 4.0;
pub const LABEL_MARGIN: f32 = 6.0;
pub const DASH_LENGTH: f32 = 4.0;
pub const STROKE_WIDTH: f32 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorClass {
    FrameworkManaged,
    ExplicitlyMarked,
    Plain,
}

impl ColorClass {
    pub fn for_record(record: &ComponentRecord) -> Self {
        if record.is_explicitly_marked {
            ColorClass::ExplicitlyMarked
        } else if record.is_framework_managed {
            ColorClass::FrameworkManaged
        } else {
            ColorClass::Plain
        }
    }

    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            ColorClass::FrameworkManaged => (142, 97, 227),
            ColorClass::ExplicitlyMarked => (66, 184, 131),
            ColorClass::Plain => (120, 144, 156),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCmd {
    DashedRect {
        rect: Rect,
        color: ColorClass,
        alpha: f32,
        stroke_width: f32,
    },
    FillRect {
        rect: Rect,
        color: ColorClass,
        alpha: f32,
    },
    Label {
        rect: Rect,
        text: String,
        color: ColorClass,
        alpha: f32,
    },
}

#[derive(Debug, Default, Clone)]
pub struct DisplayList {
    cmds: Vec<PaintCmd>,
}

impl DisplayList {
    pub fn clear(&mut self) {
        self.cmds.clear();
    }

    pub fn push(&mut self, cmd: PaintCmd) {
        self.cmds.push(cmd);
    }

    pub fn cmds(&self) -> &[PaintCmd] {
        &self.cmds
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }
}

/// Text measurement seam so placement stays backend-independent.
pub trait TextMeasure {
    /// Width and height of `text` at the label font size.
    fn measure(&self, text: &str) -> (f32, f32);
}

/// Character-count estimate used by tests and headless callers.
pub struct ApproxMeasure;

impl TextMeasure for ApproxMeasure {
    fn measure(&self, text: &str) -> (f32, f32) {
        (text.chars().count() as f32 * 7.2, 14.0)
    }
}

/// Place a label pill near `target`: above when there is room, else below,
/// else inside, finally clamped to the viewport on both axes.
pub fn place_label(target: Rect, label_w: f32, label_h: f32, viewport: (f32, f32)) -> Rect {
    let (view_w, view_h) = viewport;
    let left = target.left.clamp(0.0, (view_w - label_w).max(0.0));

    let above = target.top - label_h - LABEL_MARGIN;
    let below = target.bottom() + LABEL_MARGIN;
    let top = if above >= 0.0 {
        above
    } else if below + label_h <= view_h {
        below
    } else {
        target.top + LABEL_MARGIN
    };
    let top = top.clamp(0.0, (view_h - label_h).max(0.0));

    Rect::new(left, top, label_w, label_h)
}

/// Pill geometry for `text`, including padding.
pub fn label_rect(
    target: Rect,
    text: &str,
    viewport: (f32, f32),
    measure: &dyn TextMeasure,
) -> Rect {
    let (text_w, text_h) = measure.measure(text);
    let label_w = text_w + LABEL_PADDING_X * 2.0;
    let label_h = text_h + LABEL_PADDING_Y * 2.0;
    place_label(target, label_w, label_h, viewport)
}

/// Emit one inspection target: dashed stroke, translucent fill, label pill.
#[allow(clippy::too_many_arguments)]
pub fn draw_target(
    list: &mut DisplayList,
    rect: Rect,
    label: &str,
    color: ColorClass,
    alpha: f32,
    stroke_width: f32,
    label_offset_x: f32,
    viewport: (f32, f32),
    measure: &dyn TextMeasure,
) {
    if rect.is_empty() || alpha <= 0.0 {
        return;
    }
    list.push(PaintCmd::FillRect {
        rect,
        color,
        alpha: alpha * 0.12,
    });
    list.push(PaintCmd::DashedRect {
        rect,
        color,
        alpha,
        stroke_width,
    });
    let mut pill = label_rect(rect, label, viewport, measure);
    pill.left = (pill.left + label_offset_x).clamp(0.0, (viewport.0 - pill.width).max(0.0));
    list.push(PaintCmd::Label {
        rect: pill,
        text: label.to_string(),
        color,
        alpha,
    });
}
