pub mod egui_surface;
pub mod paint;
pub mod surface;
