use serde::{Deserialize, Serialize};

use crate::dock::PanelCorner;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InspectorSettings {
    /// Attribute declaring an explicit component boundary.
    #[serde(default = "default_marker_attribute")]
    pub marker_attribute: String,
    /// URI scheme used for the "open in IDE" action.
    #[serde(default = "default_editor_scheme")]
    pub editor_scheme: String,
    /// How long a mutation highlight lives, in milliseconds.
    #[serde(default = "default_highlight_duration_ms")]
    pub highlight_duration_ms: u64,
    /// Per-tick interpolation factor for animated rectangles.
    #[serde(default = "default_lerp_speed")]
    pub lerp_speed: f32,
    /// Corner the chrome panel docks to when no stored position exists.
    #[serde(default = "default_corner")]
    pub default_corner: PanelCorner,
    /// When enabled the logger is initialised at debug level.
    #[serde(default)]
    pub debug_logging: bool,
}

fn default_marker_attribute() -> String {
    crate::resolver::MARKER_ATTRIBUTE.to_string()
}

fn default_editor_scheme() -> String {
    crate::ide::DEFAULT_SCHEME.to_string()
}

fn default_highlight_duration_ms() -> u64 {
    crate::highlight::HIGHLIGHT_DURATION_MS
}

fn default_lerp_speed() -> f32 {
    crate::geometry::LERP_SPEED
}

fn default_corner() -> PanelCorner {
    PanelCorner::BottomRight
}

impl Default for InspectorSettings {
    fn default() -> Self {
        Self {
            marker_attribute: default_marker_attribute(),
            editor_scheme: default_editor_scheme(),
            highlight_duration_ms: default_highlight_duration_ms(),
            lerp_speed: default_lerp_speed(),
            default_corner: default_corner(),
            debug_logging: false,
        }
    }
}

impl InspectorSettings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
