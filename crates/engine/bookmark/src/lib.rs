//! Multi-color bookmark generation for FDM printers
//!
//! This crate turns a flat-color raster into a stack of extruded solids, one
//! per palette color, ready for multi-material slicing.
//!
//! # Pipeline
//!
//! - **Color quantization**: k-means++ with a medoid pick that favors vivid and
//!   near-black / near-white colors ([`color_quantizer`])
//! - **Smoothing**: 3×3 majority filter over the index map ([`smooth`])
//! - **Meshing**: row-run box extrusion with vertex deduplication ([`mesh`])
//! - **Export**: binary STL per layer or one 3MF package ([`io`])
//!
//! # Example
//!
//! ```
//! use bookmark::{Bookmark, BookmarkSettings, Raster, Rgb};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let raster = Raster::from_fn(8, 8, |x, _| {
//!     if x < 4 { Rgb::WHITE } else { Rgb::new(200, 0, 0) }
//! })?;
//! let bookmark = Bookmark::from_raster(&raster, &mut StdRng::seed_from_u64(1));
//!
//! let settings = BookmarkSettings { width_mm: 8.0, height_mm: 8.0, ..Default::default() };
//! let files = bookmark.stl_files(&settings);
//! assert!(files.contains_key("Base.stl"));
//! # Ok::<(), bookmark::BookmarkError>(())
//! ```

pub mod color_quantizer;
pub mod io;
pub mod mesh;
pub mod pipeline;
pub mod settings;
pub mod smooth;
pub mod types;

pub use color_quantizer::{quantize, Quantized, RandomSource};
pub use mesh::{build_layer, build_layers, LayerAssignment, LayerGeometry, Mesh};
pub use pipeline::{render_preview, Bookmark};
pub use settings::{BookmarkSettings, FLAT_LAYER_HEIGHT_MM, PIXELS_PER_MM};
pub use smooth::smooth;
pub use types::{BookmarkError, IndexMap, Palette, Raster, Result, Rgb, PALETTE_SIZE};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::color_quantizer::{quantize, RandomSource};
    pub use crate::io::{export_stl_set, serialize_3mf, serialize_stl};
    pub use crate::mesh::{build_layers, LayerAssignment, Mesh};
    pub use crate::pipeline::Bookmark;
    pub use crate::settings::BookmarkSettings;
    pub use crate::types::{BookmarkError, IndexMap, Palette, Raster, Rgb};
}
