//! Majority-vote smoothing of index maps
//!
//! Each pass replaces every pixel with the most frequent slot in its 3×3
//! neighborhood. Coordinates outside the image are clamped to the border, so
//! edge pixels are counted more than once. Ties go to the lowest slot.

use crate::types::{IndexMap, PALETTE_SIZE};
use tracing::debug;

/// Apply `passes` rounds of 3×3 majority filtering
///
/// Every pass reads the previous pass's output. Zero passes returns a copy of
/// the input. Callers that expose a smoothing control should always start from
/// the raw quantizer output, never from a previously smoothed map.
pub fn smooth(map: &IndexMap, passes: u32) -> IndexMap {
    let mut current = map.clone();
    for _ in 0..passes {
        current = smooth_pass(&current);
    }
    if passes > 0 {
        debug!(
            "Smoothed {}x{} index map with {} passes",
            map.width(),
            map.height(),
            passes
        );
    }
    current
}

fn smooth_pass(map: &IndexMap) -> IndexMap {
    let width = map.width();
    let height = map.height();
    let mut out = Vec::with_capacity(map.len());

    for y in 0..height {
        for x in 0..width {
            out.push(majority(map, x, y));
        }
    }

    IndexMap::from_valid(width, height, out)
}

fn majority(map: &IndexMap, x: usize, y: usize) -> u8 {
    let max_x = map.width() as isize - 1;
    let max_y = map.height() as isize - 1;
    let mut counts = [0u8; PALETTE_SIZE];

    for dy in -1isize..=1 {
        for dx in -1isize..=1 {
            let nx = (x as isize + dx).clamp(0, max_x) as usize;
            let ny = (y as isize + dy).clamp(0, max_y) as usize;
            counts[map.get(nx, ny) as usize] += 1;
        }
    }

    // Strict comparison keeps the lowest slot on ties
    let mut best = 0;
    for slot in 1..PALETTE_SIZE {
        if counts[slot] > counts[best] {
            best = slot;
        }
    }
    best as u8
}
