//! Building blocks for the `bookmarkgen` CLI
//!
//! File loading, config merging and output writing live here so they can be
//! exercised from tests without spawning the binary.

use anyhow::{bail, Context, Result};
use base64::Engine;
use bookmark::io::parse_stl;
use bookmark::{Bookmark, BookmarkSettings, Raster, PALETTE_SIZE};
use clap::{Args, ValueEnum};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::info;

/// Output container
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One binary STL per layer
    Stl,
    /// Single 3MF package with colors and thumbnail
    #[value(name = "3mf")]
    ThreeMf,
}

/// Command-line values that take precedence over the config file
#[derive(Debug, Clone, Default, Args)]
pub struct SettingsOverrides {
    /// Bookmark width in millimeters
    #[arg(long)]
    pub width: Option<f32>,

    /// Bookmark height in millimeters
    #[arg(long)]
    pub height: Option<f32>,

    /// Base plate thickness in millimeters
    #[arg(long)]
    pub base_thickness: Option<f32>,

    /// Per-slot layer heights in millimeters, comma separated (4 values)
    #[arg(long, value_delimiter = ',')]
    pub layer_heights: Option<Vec<f32>>,

    /// Use the fixed flat layer height for every slot
    #[arg(long)]
    pub flat: bool,

    /// Number of 3x3 majority smoothing passes
    #[arg(long)]
    pub smoothing: Option<u32>,

    /// Name of the base layer output
    #[arg(long)]
    pub base_name: Option<String>,
}

impl SettingsOverrides {
    pub fn apply(&self, settings: &mut BookmarkSettings) -> Result<()> {
        if let Some(width) = self.width {
            settings.width_mm = width;
        }
        if let Some(height) = self.height {
            settings.height_mm = height;
        }
        if let Some(thickness) = self.base_thickness {
            settings.base_thickness_mm = thickness;
        }
        if let Some(heights) = &self.layer_heights {
            settings.layer_heights_mm = match heights.as_slice().try_into() {
                Ok(heights) => heights,
                Err(_) => bail!(
                    "Expected {} layer heights, got {}",
                    PALETTE_SIZE,
                    heights.len()
                ),
            };
        }
        if self.flat {
            settings.flat = true;
        }
        if let Some(passes) = self.smoothing {
            settings.smoothing_passes = passes;
        }
        if let Some(name) = &self.base_name {
            settings.base_name = name.clone();
        }
        Ok(())
    }
}

/// Load settings from a TOML file; missing keys take their defaults
pub fn load_settings(path: Option<&Path>) -> Result<BookmarkSettings> {
    let Some(path) = path else {
        return Ok(BookmarkSettings::default());
    };
    let config_str = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let settings: BookmarkSettings = toml::from_str(&config_str)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    Ok(settings)
}

/// Decode an image, drop alpha and resample it onto the bookmark canvas
///
/// Nearest-neighbour sampling keeps flat-color artwork free of blended edge
/// colors.
pub fn load_raster(path: &Path, settings: &BookmarkSettings) -> Result<Raster> {
    let image =
        image::open(path).with_context(|| format!("Failed to open image {}", path.display()))?;
    let (width, height) = settings.canvas_size();

    let rgb = image.to_rgb8();
    info!(
        "Loaded {} ({}x{}), resampling to {}x{}",
        path.display(),
        rgb.width(),
        rgb.height(),
        width,
        height
    );
    let resized = imageops::resize(&rgb, width as u32, height as u32, FilterType::Nearest);

    Ok(Raster::from_rgb_bytes(width, height, resized.as_raw())?)
}

/// Encode a raster as PNG
pub fn encode_png(raster: &Raster) -> Result<Vec<u8>> {
    let image = RgbImage::from_raw(
        raster.width() as u32,
        raster.height() as u32,
        raster.to_rgb_bytes(),
    )
    .context("Raster buffer does not match its dimensions")?;

    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// PNG bytes as a `data:` URI
pub fn png_data_uri(png: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png)
    )
}

/// Where and how to write generated files
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub out_dir: PathBuf,
    pub format: OutputFormat,
    /// File stem of the 3MF package and the preview image
    pub name: String,
    /// PNG to embed in the 3MF; the rendered preview when absent
    pub thumbnail: Option<PathBuf>,
    /// Also write `<name>_preview.png`
    pub write_preview: bool,
}

/// Generate all outputs for a quantized image and return the written paths
pub fn write_outputs(
    bookmark: &Bookmark,
    settings: &BookmarkSettings,
    options: &OutputOptions,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(&options.out_dir)
        .with_context(|| format!("Failed to create {}", options.out_dir.display()))?;

    let mut written = Vec::new();
    let mut write = |name: &str, bytes: &[u8]| -> Result<()> {
        let path = options.out_dir.join(name);
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {} ({} bytes)", path.display(), bytes.len());
        written.push(path);
        Ok(())
    };

    let preview = bookmark.preview(settings);

    match options.format {
        OutputFormat::Stl => {
            for (name, bytes) in bookmark.stl_files(settings) {
                write(&name, &bytes)?;
            }
        }
        OutputFormat::ThreeMf => {
            let png = match &options.thumbnail {
                Some(path) => std::fs::read(path)
                    .with_context(|| format!("Failed to read thumbnail {}", path.display()))?,
                None => encode_png(&preview)?,
            };
            let package = bookmark.package_3mf(settings, &png_data_uri(&png))?;
            write(&format!("{}.3mf", options.name), &package)?;
        }
    }

    if options.write_preview {
        write(&format!("{}_preview.png", options.name), &encode_png(&preview)?)?;
    }

    Ok(written)
}

/// Summary of a binary STL file
#[derive(Debug, Clone, PartialEq)]
pub struct StlSummary {
    pub triangles: usize,
    pub min: [f32; 3],
    pub max: [f32; 3],
}

pub fn inspect_stl(path: &Path) -> Result<StlSummary> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let triangles = parse_stl(&data)?;

    let mut min = [f32::MAX; 3];
    let mut max = [f32::MIN; 3];
    for vertex in triangles.iter().flatten() {
        for axis in 0..3 {
            min[axis] = min[axis].min(vertex[axis]);
            max[axis] = max[axis].max(vertex[axis]);
        }
    }
    if triangles.is_empty() {
        min = [0.0; 3];
        max = [0.0; 3];
    }

    Ok(StlSummary {
        triangles: triangles.len(),
        min,
        max,
    })
}
