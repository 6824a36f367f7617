//! Replays a [`DisplayList`] onto an `egui` painter.

use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rounding, Stroke};

use crate::geometry::Rect;
use crate::overlay::paint::{
    ColorClass, DisplayList, PaintCmd, TextMeasure, DASH_LENGTH, LABEL_PADDING_X, LABEL_PADDING_Y,
};

const LABEL_FONT_SIZE: f32 = 12.0;

fn to_egui(rect: Rect) -> egui::Rect {
    egui::Rect::from_min_size(
        Pos2::new(rect.left, rect.top),
        egui::Vec2::new(rect.width, rect.height),
    )
}

fn color(class: ColorClass, alpha: f32) -> Color32 {
    let (r, g, b) = class.rgb();
    let a = (alpha.clamp(0.0, 1.0) * 255.0) as u8;
    Color32::from_rgba_unmultiplied(r, g, b, a)
}

/// Paint one display list at a whole-surface `opacity`. No-ops on an
/// empty list, and every command is a plain shape emission; nothing here
/// can fail.
pub fn paint_display_list(painter: &egui::Painter, list: &DisplayList, opacity: f32) {
    if opacity <= 0.0 {
        return;
    }
    for cmd in list.cmds() {
        match cmd {
            PaintCmd::FillRect { rect, color: class, alpha } => {
                painter.rect_filled(
                    to_egui(*rect),
                    Rounding::ZERO,
                    color(*class, *alpha * opacity),
                );
            }
            PaintCmd::DashedRect {
                rect,
                color: class,
                alpha,
                stroke_width,
            } => {
                let stroke = Stroke::new(*stroke_width, color(*class, *alpha * opacity));
                let corners = [
                    Pos2::new(rect.left, rect.top),
                    Pos2::new(rect.right(), rect.top),
                    Pos2::new(rect.right(), rect.bottom()),
                    Pos2::new(rect.left, rect.bottom()),
                    Pos2::new(rect.left, rect.top),
                ];
                painter.extend(egui::Shape::dashed_line(
                    &corners,
                    stroke,
                    DASH_LENGTH,
                    DASH_LENGTH,
                ));
            }
            PaintCmd::Label {
                rect,
                text,
                color: class,
                alpha,
            } => {
                painter.rect_filled(
                    to_egui(*rect),
                    Rounding::same(4.0),
                    color(*class, *alpha * opacity),
                );
                painter.text(
                    Pos2::new(rect.left + LABEL_PADDING_X, rect.top + LABEL_PADDING_Y),
                    Align2::LEFT_TOP,
                    text,
                    FontId::proportional(LABEL_FONT_SIZE),
                    Color32::from_rgba_unmultiplied(
                        255,
                        255,
                        255,
                        ((alpha * opacity).clamp(0.0, 1.0) * 255.0) as u8,
                    ),
                );
            }
        }
    }
}

/// Text measurement backed by the egui font system.
pub struct EguiTextMeasure<'a> {
    ctx: &'a egui::Context,
}

impl<'a> EguiTextMeasure<'a> {
    pub fn new(ctx: &'a egui::Context) -> Self {
        Self { ctx }
    }
}

impl TextMeasure for EguiTextMeasure<'_> {
    fn measure(&self, text: &str) -> (f32, f32) {
        self.ctx.fonts(|fonts| {
            let galley = fonts.layout_no_wrap(
                text.to_owned(),
                FontId::proportional(LABEL_FONT_SIZE),
                Color32::WHITE,
            );
            (galley.size().x, galley.size().y)
        })
    }
}
