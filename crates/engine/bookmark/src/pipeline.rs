//! End-to-end pipeline over one quantized image
//!
//! Quantization is the only expensive step, so [`Bookmark`] keeps the palette
//! and the raw index map and rederives everything else from them on demand.

use crate::color_quantizer::{quantize, RandomSource};
use crate::io::{export_stl_set, serialize_3mf};
use crate::mesh::{build_layers, LayerAssignment};
use crate::settings::BookmarkSettings;
use crate::smooth::smooth;
use crate::types::{IndexMap, Palette, Raster, Result};
use std::collections::BTreeMap;

/// Quantized source image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    palette: Palette,
    raw: IndexMap,
}

impl Bookmark {
    /// Quantize a raster once; the result is reused for every later generation
    pub fn from_raster<R: RandomSource + ?Sized>(raster: &Raster, rng: &mut R) -> Self {
        let quantized = quantize(raster, rng);
        Self {
            palette: quantized.palette,
            raw: quantized.index_map,
        }
    }

    /// Wrap an existing palette and raw index map
    pub fn from_parts(palette: Palette, raw: IndexMap) -> Self {
        Self { palette, raw }
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn raw_index_map(&self) -> &IndexMap {
        &self.raw
    }

    /// Smoothed index map, always computed from the raw map
    pub fn index_map(&self, passes: u32) -> IndexMap {
        smooth(&self.raw, passes)
    }

    /// Populated layer meshes for the given settings
    pub fn layers(&self, settings: &BookmarkSettings) -> Vec<LayerAssignment> {
        build_layers(&self.index_map(settings.smoothing_passes), settings)
    }

    /// One binary STL per populated layer
    pub fn stl_files(&self, settings: &BookmarkSettings) -> BTreeMap<String, Vec<u8>> {
        export_stl_set(&self.layers(settings))
    }

    /// Single 3MF package with all layers, the palette and a thumbnail
    pub fn package_3mf(
        &self,
        settings: &BookmarkSettings,
        thumbnail_base64: &str,
    ) -> Result<Vec<u8>> {
        serialize_3mf(&self.layers(settings), &self.palette, thumbnail_base64)
    }

    /// Flat-color preview of the smoothed map
    pub fn preview(&self, settings: &BookmarkSettings) -> Raster {
        render_preview(&self.index_map(settings.smoothing_passes), &self.palette)
    }
}

/// Paint every pixel with its palette color
pub fn render_preview(map: &IndexMap, palette: &Palette) -> Raster {
    let pixels = map
        .as_slice()
        .iter()
        .map(|&slot| palette.color(slot as usize))
        .collect();
    Raster::from_valid(map.width(), map.height(), pixels)
}
