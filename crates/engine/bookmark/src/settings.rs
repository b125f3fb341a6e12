//! Physical bookmark settings: size, base plate, per-layer heights

use crate::types::PALETTE_SIZE;
use serde::{Deserialize, Serialize};

/// Canvas resolution in pixels per millimeter
pub const PIXELS_PER_MM: f32 = 4.0;

/// Layer height used for every slot in flat mode
pub const FLAT_LAYER_HEIGHT_MM: f32 = 0.2;

/// Physical bookmark dimensions and layer configuration
///
/// Values are not range-checked. Zero or negative sizes simply produce
/// degenerate geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmarkSettings {
    #[serde(default = "default_width_mm")]
    pub width_mm: f32,
    #[serde(default = "default_height_mm")]
    pub height_mm: f32,
    #[serde(default = "default_base_thickness_mm")]
    pub base_thickness_mm: f32,
    /// Extrusion height above the base plate, per palette slot
    #[serde(default = "default_layer_heights_mm")]
    pub layer_heights_mm: [f32; PALETTE_SIZE],
    /// Flat mode: every layer uses [`FLAT_LAYER_HEIGHT_MM`]
    #[serde(default)]
    pub flat: bool,
    #[serde(default)]
    pub smoothing_passes: u32,
    /// Output name of the slot 0 layer
    #[serde(default = "default_base_name")]
    pub base_name: String,
}

fn default_width_mm() -> f32 {
    50.0
}

fn default_height_mm() -> f32 {
    150.0
}

fn default_base_thickness_mm() -> f32 {
    1.0
}

fn default_layer_heights_mm() -> [f32; PALETTE_SIZE] {
    [0.6; PALETTE_SIZE]
}

fn default_base_name() -> String {
    "Base".to_string()
}

impl Default for BookmarkSettings {
    fn default() -> Self {
        Self {
            width_mm: default_width_mm(),
            height_mm: default_height_mm(),
            base_thickness_mm: default_base_thickness_mm(),
            layer_heights_mm: default_layer_heights_mm(),
            flat: false,
            smoothing_passes: 0,
            base_name: default_base_name(),
        }
    }
}

impl BookmarkSettings {
    /// Per-slot heights after applying flat mode
    pub fn effective_layer_heights(&self) -> [f32; PALETTE_SIZE] {
        if self.flat {
            [FLAT_LAYER_HEIGHT_MM; PALETTE_SIZE]
        } else {
            self.layer_heights_mm
        }
    }

    /// Canvas size in pixels for the configured physical size
    pub fn canvas_size(&self) -> (usize, usize) {
        let px = |mm: f32| ((mm * PIXELS_PER_MM).round() as usize).max(1);
        (px(self.width_mm), px(self.height_mm))
    }

    /// Output name for a palette slot
    pub fn layer_name(&self, slot: usize) -> String {
        if slot == 0 {
            self.base_name.clone()
        } else {
            format!("Color_{}", slot + 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_mode_overrides_heights() {
        let mut settings = BookmarkSettings {
            layer_heights_mm: [1.0, 2.0, 3.0, 4.0],
            ..Default::default()
        };
        assert_eq!(settings.effective_layer_heights(), [1.0, 2.0, 3.0, 4.0]);

        settings.flat = true;
        assert_eq!(
            settings.effective_layer_heights(),
            [FLAT_LAYER_HEIGHT_MM; PALETTE_SIZE]
        );
    }

    #[test]
    fn test_canvas_size() {
        let settings = BookmarkSettings::default();
        assert_eq!(settings.canvas_size(), (200, 600));

        let tiny = BookmarkSettings {
            width_mm: 0.0,
            height_mm: -3.0,
            ..Default::default()
        };
        assert_eq!(tiny.canvas_size(), (1, 1));
    }

    #[test]
    fn test_layer_names() {
        let settings = BookmarkSettings::default();
        assert_eq!(settings.layer_name(0), "Base");
        assert_eq!(settings.layer_name(1), "Color_2");
        assert_eq!(settings.layer_name(3), "Color_4");
    }

    #[test]
    fn test_toml_defaults_fill_missing_keys() {
        let settings: BookmarkSettings = toml::from_str("width_mm = 40.0\nflat = true\n").unwrap();
        assert_eq!(settings.width_mm, 40.0);
        assert!(settings.flat);
        assert_eq!(settings.height_mm, 150.0);
        assert_eq!(settings.base_name, "Base");
        assert_eq!(settings.layer_heights_mm, [0.6; PALETTE_SIZE]);
    }
}
