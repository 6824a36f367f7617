//! Demo shell: a small egui app whose widgets are mirrored into a
//! glasspane document tree. F12 toggles the inspector; drag the chrome
//! panel to redock it.

use std::rc::Rc;

use eframe::egui;

use glasspane::dock::{DockController, DockEvent, PanelCorner};
use glasspane::geometry::Rect;
use glasspane::hover::{Inspector, KeyInput};
use glasspane::ide::EditorUriOpener;
use glasspane::overlay::egui_surface::{paint_display_list, EguiTextMeasure};
use glasspane::overlay::surface::{SurfacePurpose, Viewport};
use glasspane::resolver::{MARKER_ATTRIBUTE, PROP_SOURCE_LINE, PROP_SOURCE_PATH};
use glasspane::settings::InspectorSettings;
use glasspane::store::{JsonFileStore, KvStore, KEY_CORNER};
use glasspane::tree::{Document, Element, PropValue};

const PANEL_SIZE: (f32, f32) = (160.0, 56.0);

fn main() -> eframe::Result<()> {
    let settings = InspectorSettings::default();
    glasspane::logging::init(settings.debug_logging);
    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "glasspane demo",
        options,
        Box::new(|_cc| Box::new(DemoApp::new())),
    )
}

struct DemoApp {
    document: Document,
    inspector: Inspector,
    dock: DockController,
    store: Rc<JsonFileStore>,
    sidebar: Element,
    editor: Element,
    status: Element,
    viewport: Viewport,
    frames: u64,
}

impl DemoApp {
    fn new() -> Self {
        let settings = InspectorSettings::default();
        let viewport = Viewport::new(1024.0, 768.0, 1.0);
        let document = Document::new(viewport.rect());

        let sidebar = component(&document, "Sidebar", "src/demo/sidebar.rs", "12");
        let editor = component(&document, "Editor", "src/demo/editor.rs", "48");
        let status = Element::new("status-line");
        editor.append_child(&status);

        let store_path = glasspane::store::default_store_path();
        let store = Rc::new(match JsonFileStore::load(store_path) {
            Ok(store) => store,
            Err(err) => {
                tracing::warn!(%err, "store unreadable, starting empty");
                JsonFileStore::empty(store_path)
            }
        });
        let corner = store
            .get(KEY_CORNER)
            .and_then(|value| PanelCorner::parse(&value))
            .unwrap_or(settings.default_corner);

        let inspector = Inspector::new(
            document.clone(),
            &settings,
            viewport,
            Box::new(EditorUriOpener::new(&settings.editor_scheme)),
            Some(store.clone() as Rc<dyn KvStore>),
        );
        let dock = DockController::new(corner, viewport.size(), PANEL_SIZE);

        Self {
            document,
            inspector,
            dock,
            store,
            sidebar,
            editor,
            status,
            viewport,
            frames: 0,
        }
    }

    fn now_ms(ctx: &egui::Context) -> u64 {
        ctx.input(|i| (i.time * 1000.0) as u64)
    }

    fn forward_input(&mut self, ctx: &egui::Context, now: u64) {
        let (hover, pressed, released) = ctx.input(|i| {
            (
                i.pointer.hover_pos(),
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
            )
        });

        if ctx.input(|i| i.key_pressed(egui::Key::F12)) {
            self.inspector.toggle(now);
        }
        for (key, input) in [
            (egui::Key::ArrowUp, KeyInput::ArrowUp),
            (egui::Key::ArrowDown, KeyInput::ArrowDown),
            (egui::Key::Enter, KeyInput::Enter),
            (egui::Key::Escape, KeyInput::Escape),
        ] {
            if ctx.input(|i| i.key_pressed(key)) {
                self.inspector.on_key(input, now);
            }
        }

        if let Some(pos) = hover {
            self.inspector.on_pointer_move(pos.x, pos.y, now);

            let (dock_x, dock_y) = self.dock.offset();
            let panel = Rect::new(dock_x, dock_y, PANEL_SIZE.0, PANEL_SIZE.1);
            if pressed && panel.contains(pos.x, pos.y) {
                self.dock.on_pointer_down(pos.x, pos.y, 0);
            }
            self.dock.on_pointer_move(pos.x, pos.y, 0);
            if released {
                // A release that ends a panel interaction is the dock's;
                // it must not double as an inspect click.
                let panel_release = self.dock.owns_release(0);
                self.dock.on_pointer_up(pos.x, pos.y, 0, now);
                if !panel_release {
                    self.inspector.on_click(pos.x, pos.y, now);
                }
            }
        }

        for event in self.dock.drain_events() {
            if let DockEvent::PositionChanged { new, .. } = event {
                self.store.set(KEY_CORNER, new.as_str());
            }
        }
    }

    fn sync_tree(&mut self, ctx: &egui::Context, now: u64) {
        let screen = ctx.screen_rect();
        let viewport = Viewport::new(screen.width(), screen.height(), ctx.pixels_per_point());
        self.document
            .root()
            .set_rect(Rect::new(0.0, 0.0, screen.width(), screen.height()));
        // Only actual changes go to the debouncer, so its deadline can pass.
        if viewport != self.viewport {
            self.viewport = viewport;
            self.inspector.on_resize(viewport, now);
            self.dock.set_viewport((screen.width(), screen.height()));
        }
    }
}

fn component(document: &Document, name: &str, path: &str, line: &str) -> Element {
    let element = Element::new("panel");
    element.set_attribute(MARKER_ATTRIBUTE, name);
    element.set_property(PROP_SOURCE_PATH, PropValue::Str(path.to_string()));
    element.set_property(PROP_SOURCE_LINE, PropValue::Str(line.to_string()));
    document.root().append_child(&element);
    element
}

impl eframe::App for DemoApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Self::now_ms(ctx);
        self.frames += 1;
        self.sync_tree(ctx, now);
        self.forward_input(ctx, now);

        egui::SidePanel::left("sidebar").show(ctx, |ui| {
            ui.heading("Demo sidebar");
            let rect = ui.max_rect();
            self.sidebar
                .set_rect(Rect::new(rect.left(), rect.top(), rect.width(), rect.height()));
        });
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Demo editor");
            let status = format!("frame {}", self.frames / 60);
            let response = ui.label(&status);
            let rect = ui.max_rect();
            self.editor
                .set_rect(Rect::new(rect.left(), rect.top(), rect.width(), rect.height()));
            let label = response.rect;
            self.status.set_rect(Rect::new(
                label.left(),
                label.top(),
                label.width(),
                label.height(),
            ));
            // Churn once a second so the mutation overlay has something to
            // show while the inspector is active.
            if self.frames % 60 == 0 {
                self.status.set_text(&status);
            }
        });

        egui::Area::new(egui::Id::new("glasspane-panel"))
            .fixed_pos(egui::pos2(self.dock.offset().0, self.dock.offset().1))
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.set_min_size(egui::vec2(PANEL_SIZE.0, PANEL_SIZE.1));
                    ui.label(if self.inspector.is_active() {
                        "inspecting (F12 to stop)"
                    } else {
                        "F12 to inspect"
                    });
                    if let Some(name) = self.inspector.focused_name() {
                        ui.label(name);
                    }
                });
            });

        let more_dock = self.dock.tick(now);
        let more_inspector = self.inspector.tick(now);
        self.inspector.render(now, &EguiTextMeasure::new(ctx));

        let painter = ctx.layer_painter(egui::LayerId::new(
            egui::Order::Foreground,
            egui::Id::new("glasspane-overlay"),
        ));
        let surfaces = self.inspector.surfaces();
        let surfaces = surfaces.borrow();
        for purpose in [SurfacePurpose::Mutation, SurfacePurpose::Inspection] {
            if let Some(surface) = surfaces.surface(purpose) {
                paint_display_list(&painter, &surface.display, surface.opacity);
            }
        }

        if more_dock || more_inspector {
            ctx.request_repaint();
        }
    }
}
