//! Shared types for the bookmark pipeline: colors, rasters, index maps

use std::fmt;
use thiserror::Error;

/// Number of palette slots (and output layers)
pub const PALETTE_SIZE: usize = 4;

/// Bookmark pipeline error types
#[derive(Debug, Error)]
pub enum BookmarkError {
    #[error("Raster has no pixels")]
    EmptyRaster,

    #[error("Raster size mismatch: expected {expected} samples, got {actual}")]
    RasterSize { expected: usize, actual: usize },

    #[error("Index {value} is outside the 4-slot palette")]
    InvalidIndex { value: u8 },

    #[error("Thumbnail decode error: {0}")]
    Thumbnail(#[from] base64::DecodeError),

    #[error("Packaging error: {0}")]
    Package(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Truncated STL data: expected {expected_bytes} bytes, got {available_bytes}")]
    TruncatedStl {
        expected_bytes: usize,
        available_bytes: usize,
    },
}

/// Result type alias for bookmark operations that may fail
pub type Result<T> = std::result::Result<T, BookmarkError>;

/// 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Squared Euclidean distance in RGB space
    pub fn distance_squared(self, other: Rgb) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }

    /// `(max - min) / max` over the channels, 0 for black
    pub fn saturation(self) -> f64 {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        if max == 0 {
            return 0.0;
        }
        (max - min) as f64 / max as f64
    }

    /// Perceptual luminance normalized to [0, 1]
    pub fn luminance(self) -> f64 {
        (0.299 * self.r as f64 + 0.587 * self.g as f64 + 0.114 * self.b as f64) / 255.0
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Row-major RGB raster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: usize,
    height: usize,
    pixels: Vec<Rgb>,
}

impl Raster {
    /// Create a raster, rejecting empty or mis-sized sample buffers
    pub fn new(width: usize, height: usize, pixels: Vec<Rgb>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(BookmarkError::EmptyRaster);
        }
        let expected = width * height;
        if pixels.len() != expected {
            return Err(BookmarkError::RasterSize {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub(crate) fn from_valid(width: usize, height: usize, pixels: Vec<Rgb>) -> Self {
        debug_assert_eq!(pixels.len(), width * height);
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Create a raster from tightly packed RGB bytes
    pub fn from_rgb_bytes(width: usize, height: usize, bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 3 != 0 {
            return Err(BookmarkError::RasterSize {
                expected: width * height * 3,
                actual: bytes.len(),
            });
        }
        let pixels = bytes
            .chunks_exact(3)
            .map(|c| Rgb::new(c[0], c[1], c[2]))
            .collect();
        Self::new(width, height, pixels)
    }

    /// Build a raster by evaluating `f(x, y)` for every pixel
    pub fn from_fn(
        width: usize,
        height: usize,
        mut f: impl FnMut(usize, usize) -> Rgb,
    ) -> Result<Self> {
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self::new(width, height, pixels)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    pub fn get(&self, x: usize, y: usize) -> Rgb {
        self.pixels[y * self.width + x]
    }

    /// Packed RGB bytes, row-major
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|p| p.to_array()).collect()
    }
}

/// Per-pixel palette slot labels, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMap {
    width: usize,
    height: usize,
    indices: Vec<u8>,
}

impl IndexMap {
    /// Create an index map; every value must address a palette slot
    pub fn new(width: usize, height: usize, indices: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(BookmarkError::EmptyRaster);
        }
        let expected = width * height;
        if indices.len() != expected {
            return Err(BookmarkError::RasterSize {
                expected,
                actual: indices.len(),
            });
        }
        if let Some(&value) = indices.iter().find(|&&v| v as usize >= PALETTE_SIZE) {
            return Err(BookmarkError::InvalidIndex { value });
        }
        Ok(Self {
            width,
            height,
            indices,
        })
    }

    /// Build from rows of slot labels (mostly for fixtures)
    pub fn from_rows(rows: &[&[u8]]) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.len());
        let indices: Vec<u8> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Self::new(width, height, indices)
    }

    /// Crate-internal constructor for maps whose values are already known valid
    pub(crate) fn from_valid(width: usize, height: usize, indices: Vec<u8>) -> Self {
        debug_assert_eq!(indices.len(), width * height);
        Self {
            width,
            height,
            indices,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.indices[y * self.width + x]
    }

    pub fn row(&self, y: usize) -> &[u8] {
        &self.indices[y * self.width..(y + 1) * self.width]
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.indices
    }

    /// Number of pixels assigned to each slot
    pub fn histogram(&self) -> [usize; PALETTE_SIZE] {
        let mut counts = [0; PALETTE_SIZE];
        for &i in &self.indices {
            counts[i as usize] += 1;
        }
        counts
    }
}

/// Ordered palette of exactly four colors; slot 0 is the most frequent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub colors: [Rgb; PALETTE_SIZE],
    /// Cluster member counts at quantization time, same order as `colors`
    pub counts: [usize; PALETTE_SIZE],
}

impl Palette {
    pub fn new(colors: [Rgb; PALETTE_SIZE]) -> Self {
        Self {
            colors,
            counts: [0; PALETTE_SIZE],
        }
    }

    pub fn color(&self, slot: usize) -> Rgb {
        self.colors[slot]
    }

    pub fn len(&self) -> usize {
        PALETTE_SIZE
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}
