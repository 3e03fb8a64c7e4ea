//! Region flood fill for "color by click" activities.
//!
//! The traversal is an iterative DFS over a Vec stack of packed linear
//! indices; recursion is off the table because a single uniform worksheet
//! region at full resolution can span millions of pixels.

use image::Rgba;
use serde::{Deserialize, Serialize};

use crate::canvas::PixelBuffer;

/// Tuning knobs for the fill, persisted alongside the product's other
/// settings rather than baked in as constants.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FillConfig {
    /// Maximum per-channel distance from the seed color for a neighbor to
    /// count as the same region (0–255 scale).
    pub tolerance: f32,
    /// Alpha written to filled pixels.  Opaque for "color the picture";
    /// recognition activities use a semi-transparent overlay so the
    /// underlying artwork stays readable.
    pub fill_alpha: u8,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self { tolerance: 32.0, fill_alpha: 255 }
    }
}

impl FillConfig {
    /// Semi-transparent variant for recognition overlays.
    pub fn overlay() -> Self {
        Self { fill_alpha: 150, ..Self::default() }
    }
}

/// The set of pixels a fill touched.
///
/// `mask` is width*height bytes (255 = filled) and doubles as the visited
/// array during traversal; `bbox` is (min_x, min_y, max_x, max_y), `None`
/// when nothing was filled.
pub struct FillOutcome {
    pub mask: Vec<u8>,
    pub bbox: Option<(u32, u32, u32, u32)>,
    pub filled: usize,
    width: u32,
}

impl FillOutcome {
    fn empty(width: u32, height: u32) -> Self {
        Self {
            mask: vec![0u8; (width as usize) * (height as usize)],
            bbox: None,
            filled: 0,
            width,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Whether the fill touched (x, y).
    pub fn contains(&self, x: u32, y: u32) -> bool {
        self.mask
            .get((y * self.width + x) as usize)
            .is_some_and(|&m| m != 0)
    }
}

// Inline pixel fetch from the flat RGBA buffer.
#[inline(always)]
fn pix(flat: &[u8], idx: usize) -> [u8; 4] {
    let o = idx * 4;
    [flat[o], flat[o + 1], flat[o + 2], flat[o + 3]]
}

// Tight per-channel color match.  Two fully transparent pixels always
// match so transparent areas flood as one region; a transparent pixel
// against an opaque one is compared on alpha alone.
#[inline(always)]
fn matches(p: [u8; 4], seed: [u8; 4], tol: f32) -> bool {
    if seed[3] == 0 && p[3] == 0 {
        return true;
    }
    if seed[3] == 0 || p[3] == 0 {
        return (seed[3] as f32 - p[3] as f32).abs() <= tol;
    }
    let r = (seed[0] as f32 - p[0] as f32).abs();
    let g = (seed[1] as f32 - p[1] as f32).abs();
    let b = (seed[2] as f32 - p[2] as f32).abs();
    let a = (seed[3] as f32 - p[3] as f32).abs();
    r.max(g).max(b).max(a) <= tol
}

/// Compute the maximal 4-connected region of pixels within tolerance of
/// the seed's color, without mutating the buffer.
///
/// Every comparison is against the seed's *original* color; comparing
/// against freshly-written pixels instead is how fills run away through
/// regions that merely resemble the destination color.
pub fn flood_region(
    buffer: &PixelBuffer,
    seed_x: u32,
    seed_y: u32,
    config: &FillConfig,
) -> FillOutcome {
    let (w, h) = (buffer.width, buffer.height);
    let mut out = FillOutcome::empty(w, h);
    if seed_x >= w || seed_y >= h {
        return out;
    }

    let wu = w as usize;
    let flat = buffer.as_raw();
    let seed_idx = seed_y as usize * wu + seed_x as usize;
    let seed = pix(flat, seed_idx);
    let tol = config.tolerance;

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (seed_x, seed_y, seed_x, seed_y);

    // Packed flat indices keep the stack at 4 bytes per entry; a flat
    // index is y * w + x which stays well under u32::MAX at the clamped
    // maximum buffer size.
    let mut stack: Vec<u32> = Vec::with_capacity(4096);
    out.mask[seed_idx] = 255;
    out.filled = 1;
    stack.push(seed_idx as u32);

    while let Some(idx) = stack.pop() {
        let x = (idx as usize % wu) as u32;
        let y = (idx as usize / wu) as u32;

        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);

        // Check 4 neighbors, push unvisited matching ones
        if x > 0 {
            let ni = idx as usize - 1;
            if out.mask[ni] == 0 && matches(pix(flat, ni), seed, tol) {
                out.mask[ni] = 255;
                out.filled += 1;
                stack.push(ni as u32);
            }
        }
        if x + 1 < w {
            let ni = idx as usize + 1;
            if out.mask[ni] == 0 && matches(pix(flat, ni), seed, tol) {
                out.mask[ni] = 255;
                out.filled += 1;
                stack.push(ni as u32);
            }
        }
        if y > 0 {
            let ni = idx as usize - wu;
            if out.mask[ni] == 0 && matches(pix(flat, ni), seed, tol) {
                out.mask[ni] = 255;
                out.filled += 1;
                stack.push(ni as u32);
            }
        }
        if y + 1 < h {
            let ni = idx as usize + wu;
            if out.mask[ni] == 0 && matches(pix(flat, ni), seed, tol) {
                out.mask[ni] = 255;
                out.filled += 1;
                stack.push(ni as u32);
            }
        }
    }

    out.bbox = Some((min_x, min_y, max_x, max_y));
    out
}

/// Stamp `color` (at `alpha`) onto every masked pixel of `target`.
pub fn apply_mask(target: &mut PixelBuffer, outcome: &FillOutcome, color: Rgba<u8>, alpha: u8) {
    let Some((min_x, min_y, max_x, max_y)) = outcome.bbox else {
        return;
    };
    let written = Rgba([color[0], color[1], color[2], alpha]);
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            if outcome.contains(x, y) {
                target.set(x, y, written);
            }
        }
    }
}

/// Recolor the contiguous region under the seed, in place.
///
/// Returns the changed-pixel set.  Out-of-bounds seeds and fills where the
/// seed already carries the exact fill color are no-ops with an empty
/// outcome, so repeated clicks on a finished region cost nothing.
pub fn flood_fill(
    buffer: &mut PixelBuffer,
    seed_x: u32,
    seed_y: u32,
    color: Rgba<u8>,
    config: &FillConfig,
) -> FillOutcome {
    if seed_x >= buffer.width || seed_y >= buffer.height {
        return FillOutcome::empty(buffer.width, buffer.height);
    }
    let written = Rgba([color[0], color[1], color[2], config.fill_alpha]);
    if buffer.get(seed_x, seed_y) == written {
        return FillOutcome::empty(buffer.width, buffer.height);
    }
    let outcome = flood_region(buffer, seed_x, seed_y, config);
    apply_mask(buffer, &outcome, color, config.fill_alpha);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    /// White 10×10 with a black 3×3 square at (4,4)-(6,6).
    fn square_buffer() -> PixelBuffer {
        let mut buf = PixelBuffer::filled(10, 10, WHITE);
        for y in 4..=6 {
            for x in 4..=6 {
                buf.set(x, y, BLACK);
            }
        }
        buf
    }

    #[test]
    fn fill_is_contained_to_the_connected_region() {
        let mut buf = square_buffer();
        let cfg = FillConfig { tolerance: 10.0, fill_alpha: 255 };
        let outcome = flood_fill(&mut buf, 5, 5, RED, &cfg);

        assert_eq!(outcome.filled, 9);
        assert_eq!(outcome.bbox, Some((4, 4, 6, 6)));
        for y in 0..10 {
            for x in 0..10 {
                let expected = if (4..=6).contains(&x) && (4..=6).contains(&y) {
                    RED
                } else {
                    WHITE
                };
                assert_eq!(buf.get(x, y), expected, "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn refilling_with_the_same_color_is_a_noop() {
        let mut buf = square_buffer();
        let cfg = FillConfig { tolerance: 10.0, fill_alpha: 255 };
        flood_fill(&mut buf, 5, 5, RED, &cfg);
        let again = flood_fill(&mut buf, 5, 5, RED, &cfg);
        assert!(again.is_empty());
        assert_eq!(again.bbox, None);
    }

    #[test]
    fn out_of_bounds_seed_is_a_noop() {
        let mut buf = square_buffer();
        let before = buf.as_raw().to_vec();
        let outcome = flood_fill(&mut buf, 10, 3, RED, &FillConfig::default());
        assert!(outcome.is_empty());
        assert_eq!(buf.as_raw(), before.as_slice());
    }

    #[test]
    fn tolerance_is_measured_against_the_seed_color() {
        // Horizontal ramp stepping by 20 per column; with tolerance 30 the
        // fill from column 0 must stop once a column drifts more than 30
        // from the seed, even though each adjacent step is only 20.
        let mut buf = PixelBuffer::new(6, 1);
        for x in 0..6 {
            let v = (x * 20) as u8;
            buf.set(x, 0, Rgba([v, v, v, 255]));
        }
        let cfg = FillConfig { tolerance: 30.0, fill_alpha: 255 };
        let outcome = flood_fill(&mut buf, 0, 0, RED, &cfg);
        // columns 0 and 20 are within 30 of the seed; 40 is not
        assert_eq!(outcome.filled, 2);
        assert_eq!(buf.get(0, 0), RED);
        assert_eq!(buf.get(1, 0), RED);
        assert_eq!(buf.get(2, 0), Rgba([40, 40, 40, 255]));
    }

    #[test]
    fn diagonal_pixels_are_not_connected() {
        // Two black pixels touching only at a corner: filling one must not
        // leak into the other (4-connectivity).
        let mut buf = PixelBuffer::filled(4, 4, WHITE);
        buf.set(1, 1, BLACK);
        buf.set(2, 2, BLACK);
        let cfg = FillConfig { tolerance: 10.0, fill_alpha: 255 };
        let outcome = flood_fill(&mut buf, 1, 1, RED, &cfg);
        assert_eq!(outcome.filled, 1);
        assert_eq!(buf.get(2, 2), BLACK);
    }

    #[test]
    fn overlay_alpha_is_written_as_configured() {
        let mut buf = square_buffer();
        let cfg = FillConfig { tolerance: 10.0, fill_alpha: 150 };
        flood_fill(&mut buf, 5, 5, RED, &cfg);
        assert_eq!(buf.get(5, 5), Rgba([255, 0, 0, 150]));
    }

    #[test]
    fn flood_region_leaves_the_buffer_untouched() {
        let buf = square_buffer();
        let before = buf.as_raw().to_vec();
        let outcome = flood_region(&buf, 0, 0, &FillConfig { tolerance: 10.0, fill_alpha: 255 });
        assert_eq!(outcome.filled, 100 - 9);
        assert_eq!(buf.as_raw(), before.as_slice());
    }
}
