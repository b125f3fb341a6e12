//! Color quantization: k-means++ seeding, Lloyd refinement and a biased medoid pick
//!
//! The palette is built in four steps:
//!
//! 1. k-means++ seeding over the pixel population
//! 2. Up to [`MAX_ITERATIONS`] Lloyd passes with integer-rounded centroids
//! 3. Medoid substitution: each cluster is represented by one of its own pixels,
//!    scored by distance to the centroid minus a bonus for vivid colors and for
//!    near-black / near-white colors
//! 4. Slots sorted by descending cluster size, so slot 0 is the most common color

use crate::types::{IndexMap, Palette, Raster, Rgb, PALETTE_SIZE};
use tracing::debug;

/// Maximum number of Lloyd refinement passes
pub const MAX_ITERATIONS: usize = 15;

/// Weight applied to the saturation and luminance bonuses
pub const BONUS_WEIGHT: f64 = 3000.0;

/// Bonus (before weighting) for colors with extreme luminance
pub const EXTREME_LUMINANCE_BONUS: f64 = 0.5;

const DARK_LUMINANCE: f64 = 0.15;
const LIGHT_LUMINANCE: f64 = 0.85;

/// Source of randomness for k-means++ seeding
///
/// Implemented for every [`rand::Rng`], so a seeded `StdRng` gives
/// reproducible palettes.
pub trait RandomSource {
    /// Uniform index in `0..len` (`len > 0`)
    fn next_index(&mut self, len: usize) -> usize;

    /// Uniform value in `[0, 1)`
    fn next_unit(&mut self) -> f64;
}

impl<R: rand::Rng> RandomSource for R {
    fn next_index(&mut self, len: usize) -> usize {
        self.random_range(0..len)
    }

    fn next_unit(&mut self) -> f64 {
        self.random::<f64>()
    }
}

/// Output of [`quantize`]: the ordered palette and the raw index map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quantized {
    pub palette: Palette,
    pub index_map: IndexMap,
}

/// Quantize a raster into a four-color palette and a per-pixel index map
pub fn quantize<R: RandomSource + ?Sized>(raster: &Raster, rng: &mut R) -> Quantized {
    let pixels = raster.pixels();

    let seeds = seed_centroids(pixels, rng);
    let (centroids, assignments) = refine(pixels, seeds);
    let medoids = pick_medoids(pixels, &centroids, &assignments);

    let mut counts = [0usize; PALETTE_SIZE];
    for &a in &assignments {
        counts[a as usize] += 1;
    }

    // Stable sort: equal counts keep cluster order
    let mut order: Vec<usize> = (0..PALETTE_SIZE).collect();
    order.sort_by(|&a, &b| counts[b].cmp(&counts[a]));

    let mut remap = [0u8; PALETTE_SIZE];
    let mut colors = [Rgb::BLACK; PALETTE_SIZE];
    let mut sorted_counts = [0usize; PALETTE_SIZE];
    for (slot, &cluster) in order.iter().enumerate() {
        remap[cluster] = slot as u8;
        colors[slot] = medoids[cluster];
        sorted_counts[slot] = counts[cluster];
    }

    let indices = assignments.iter().map(|&a| remap[a as usize]).collect();

    debug!(
        "Quantized {} pixels into palette {:?} (counts {:?})",
        pixels.len(),
        colors.map(|c| c.to_string()),
        sorted_counts
    );

    Quantized {
        palette: Palette {
            colors,
            counts: sorted_counts,
        },
        index_map: IndexMap::from_valid(raster.width(), raster.height(), indices),
    }
}

/// k-means++ seeding with distance-squared weighted sampling
fn seed_centroids<R: RandomSource + ?Sized>(
    pixels: &[Rgb],
    rng: &mut R,
) -> [Rgb; PALETTE_SIZE] {
    let mut centroids = [pixels[rng.next_index(pixels.len())]; PALETTE_SIZE];
    let mut distances = vec![0.0f64; pixels.len()];

    for chosen in 1..PALETTE_SIZE {
        let mut total = 0.0;
        for (distance, pixel) in distances.iter_mut().zip(pixels) {
            *distance = centroids[..chosen]
                .iter()
                .map(|c| pixel.distance_squared(*c))
                .min()
                .unwrap_or(0) as f64;
            total += *distance;
        }

        let mut target = rng.next_unit() * total;
        // Falls back to the last pixel when rounding keeps target above zero
        let mut pick = pixels.len() - 1;
        for (i, distance) in distances.iter().enumerate() {
            target -= distance;
            if target <= 0.0 {
                pick = i;
                break;
            }
        }
        centroids[chosen] = pixels[pick];
    }

    centroids
}

/// Nearest centroid by squared distance; ties go to the lowest index
fn nearest(pixel: Rgb, centroids: &[Rgb; PALETTE_SIZE]) -> u8 {
    let mut best_index = 0;
    let mut best_distance = u32::MAX;
    for (i, centroid) in centroids.iter().enumerate() {
        let distance = pixel.distance_squared(*centroid);
        if distance < best_distance {
            best_distance = distance;
            best_index = i;
        }
    }
    best_index as u8
}

/// Lloyd iterations; returns final centroids and the matching assignments
fn refine(
    pixels: &[Rgb],
    mut centroids: [Rgb; PALETTE_SIZE],
) -> ([Rgb; PALETTE_SIZE], Vec<u8>) {
    let mut assignments = vec![0u8; pixels.len()];

    for iteration in 0..MAX_ITERATIONS {
        for (assignment, pixel) in assignments.iter_mut().zip(pixels) {
            *assignment = nearest(*pixel, &centroids);
        }

        let mut sums = [[0u64; 3]; PALETTE_SIZE];
        let mut counts = [0u64; PALETTE_SIZE];
        for (&a, pixel) in assignments.iter().zip(pixels) {
            let sum = &mut sums[a as usize];
            sum[0] += pixel.r as u64;
            sum[1] += pixel.g as u64;
            sum[2] += pixel.b as u64;
            counts[a as usize] += 1;
        }

        let mut updated = centroids;
        for (cluster, centroid) in updated.iter_mut().enumerate() {
            let count = counts[cluster];
            if count == 0 {
                continue;
            }
            let mean = |sum: u64| (sum as f64 / count as f64).round() as u8;
            let sum = sums[cluster];
            *centroid = Rgb::new(mean(sum[0]), mean(sum[1]), mean(sum[2]));
        }

        if updated == centroids {
            debug!("Lloyd refinement converged after {} iterations", iteration + 1);
            break;
        }
        centroids = updated;
    }

    (centroids, assignments)
}

/// Medoid score: lower is a better cluster representative
fn medoid_score(pixel: Rgb, centroid: Rgb) -> f64 {
    let luminance = pixel.luminance();
    let extreme = if luminance < DARK_LUMINANCE || luminance > LIGHT_LUMINANCE {
        EXTREME_LUMINANCE_BONUS
    } else {
        0.0
    };
    pixel.distance_squared(centroid) as f64
        - pixel.saturation() * BONUS_WEIGHT
        - extreme * BONUS_WEIGHT
}

/// Pick one member pixel per cluster; empty clusters keep their centroid
fn pick_medoids(
    pixels: &[Rgb],
    centroids: &[Rgb; PALETTE_SIZE],
    assignments: &[u8],
) -> [Rgb; PALETTE_SIZE] {
    let mut best: [Option<(f64, Rgb)>; PALETTE_SIZE] = [None; PALETTE_SIZE];

    for (&a, &pixel) in assignments.iter().zip(pixels) {
        let cluster = a as usize;
        let score = medoid_score(pixel, centroids[cluster]);
        match best[cluster] {
            Some((best_score, _)) if best_score <= score => {}
            _ => best[cluster] = Some((score, pixel)),
        }
    }

    let mut medoids = *centroids;
    for (medoid, candidate) in medoids.iter_mut().zip(best) {
        if let Some((_, pixel)) = candidate {
            *medoid = pixel;
        }
    }
    medoids
}
