use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::ops::strokes::{self, Stroke};

/// A pixel with zero alpha, returned by value for out-of-range reads.
static TRANSPARENT_PIXEL: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Letterbox color for the margins around a scaled-to-fit worksheet.
const LETTERBOX: Rgba<u8> = Rgba([255, 255, 255, 255]);

// ============================================================================
// PIXEL BUFFER – flat RGBA storage
// ============================================================================

/// Flat RGBA byte buffer addressable by (x, y).
///
/// `data.len() == width * height * 4` always holds; both accessors are
/// bounds-checked so pointer coordinates that land past the edges during
/// fast gestures are harmless.
#[derive(Clone)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Create a fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, TRANSPARENT_PIXEL)
    }

    /// Create a buffer filled with `color`.
    pub fn filled(width: u32, height: u32, color: Rgba<u8>) -> Self {
        // Sanity: clamp dimensions to prevent overflow (max ~256 megapixels)
        let (width, height) = {
            let total = (width as u64) * (height as u64);
            if total > 256_000_000 || width == 0 || height == 0 {
                eprintln!(
                    "PixelBuffer::filled: dimensions {}×{} rejected, clamped to 1×1",
                    width, height
                );
                (1, 1)
            } else {
                (width, height)
            }
        };
        let mut data = vec![0u8; (width * height * 4) as usize];
        if color != TRANSPARENT_PIXEL {
            for px in data.chunks_exact_mut(4) {
                px.copy_from_slice(&color.0);
            }
        }
        Self { width, height, data }
    }

    /// Wrap a decoded image's pixels.
    pub fn from_image(img: &RgbaImage) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            data: img.as_raw().clone(),
        }
    }

    /// Copy the buffer out as an owned image (for encoding / display upload).
    pub fn to_image(&self) -> RgbaImage {
        RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y * self.width + x) as usize * 4
    }

    #[inline]
    pub fn in_bounds(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    /// Read the pixel at (x, y).  Out-of-range coordinates return the
    /// transparent sentinel instead of panicking.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Rgba<u8> {
        if !self.in_bounds(x, y) {
            return TRANSPARENT_PIXEL;
        }
        let o = self.offset(x, y);
        Rgba([self.data[o], self.data[o + 1], self.data[o + 2], self.data[o + 3]])
    }

    /// Write the pixel at (x, y).  Out-of-range coordinates are a no-op.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, px: Rgba<u8>) {
        if !self.in_bounds(x, y) {
            return;
        }
        let o = self.offset(x, y);
        self.data[o..o + 4].copy_from_slice(&px.0);
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

// ============================================================================
// FIT TRANSFORM – native ↔ display coordinate mapping
// ============================================================================

/// Uniform scale + centering offset that fits one rectangle inside another
/// while preserving aspect ratio (letterboxing).
///
/// The same transform serves rendering and hit-testing, so `to_native` and
/// `to_display` must stay exact inverses of each other.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitTransform {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl FitTransform {
    /// Identity mapping (content shown 1:1 at the frame origin).
    pub fn identity() -> Self {
        Self { scale: 1.0, offset_x: 0.0, offset_y: 0.0 }
    }

    /// Fit `content` inside `frame`, centered.
    pub fn fit(content_w: f32, content_h: f32, frame_w: f32, frame_h: f32) -> Self {
        if content_w <= 0.0 || content_h <= 0.0 || frame_w <= 0.0 || frame_h <= 0.0 {
            return Self::identity();
        }
        let scale = (frame_w / content_w).min(frame_h / content_h);
        Self {
            scale,
            offset_x: (frame_w - content_w * scale) / 2.0,
            offset_y: (frame_h - content_h * scale) / 2.0,
        }
    }

    /// Display (frame) coordinates → native (content) coordinates.
    #[inline]
    pub fn to_native(&self, display: (f32, f32)) -> (f32, f32) {
        (
            (display.0 - self.offset_x) / self.scale,
            (display.1 - self.offset_y) / self.scale,
        )
    }

    /// Native (content) coordinates → display (frame) coordinates.
    #[inline]
    pub fn to_display(&self, native: (f32, f32)) -> (f32, f32) {
        (
            native.0 * self.scale + self.offset_x,
            native.1 * self.scale + self.offset_y,
        )
    }
}

// ============================================================================
// CANVAS SURFACE – background artwork + foreground paint
// ============================================================================

/// Two-layer drawing surface.
///
/// The background holds the worksheet artwork (mutated only by opaque
/// region fills); the foreground holds everything the user paints.  Both
/// layers share the surface's native pixel dimensions; answer-zone
/// rectangles are expressed in the same native space.
pub struct CanvasSurface {
    pub width: u32,
    pub height: u32,
    background: PixelBuffer,
    /// Pristine background bytes as of the last successful load, so
    /// `clear` can drop fill mutations along with the strokes.
    loaded: Vec<u8>,
    foreground: PixelBuffer,
    strokes: Vec<Stroke>,
    view: FitTransform,
}

impl CanvasSurface {
    /// Blank surface at the given native size (white page, nothing drawn).
    pub fn new(width: u32, height: u32) -> Self {
        let background = PixelBuffer::filled(width, height, LETTERBOX);
        let loaded = background.as_raw().to_vec();
        // filled() may have clamped; mirror its final dimensions
        let (width, height) = (background.width, background.height);
        Self {
            width,
            height,
            background,
            loaded,
            foreground: PixelBuffer::new(width, height),
            strokes: Vec::new(),
            view: FitTransform::identity(),
        }
    }

    /// Install the decoded worksheet artwork as the background layer.
    ///
    /// The image is drawn scaled-to-fit and centered into the surface's
    /// native dimensions, then the foreground layer and stroke history are
    /// reset.  Decode failures never reach this method, which is what keeps
    /// the previous page intact when a load goes wrong upstream.
    pub fn load_background(&mut self, img: &RgbaImage) {
        let mut page = RgbaImage::from_pixel(self.width, self.height, LETTERBOX);
        let fit = FitTransform::fit(
            img.width() as f32,
            img.height() as f32,
            self.width as f32,
            self.height as f32,
        );
        let scaled_w = (img.width() as f32 * fit.scale).round().max(1.0) as u32;
        let scaled_h = (img.height() as f32 * fit.scale).round().max(1.0) as u32;
        if (scaled_w, scaled_h) == (img.width(), img.height()) {
            imageops::overlay(&mut page, img, fit.offset_x as i64, fit.offset_y as i64);
        } else {
            let scaled = imageops::resize(img, scaled_w, scaled_h, FilterType::Triangle);
            imageops::overlay(&mut page, &scaled, fit.offset_x as i64, fit.offset_y as i64);
        }

        self.background = PixelBuffer::from_image(&page);
        self.loaded = self.background.as_raw().to_vec();
        self.reset_foreground();
    }

    /// Discard the foreground layer and any fill mutations, restoring the
    /// freshly-loaded background state.
    pub fn clear(&mut self) {
        self.background.as_raw_mut().copy_from_slice(&self.loaded);
        self.reset_foreground();
    }

    fn reset_foreground(&mut self) {
        self.foreground = PixelBuffer::new(self.width, self.height);
        self.strokes.clear();
    }

    // ---- coordinate transforms ---------------------------------------------

    /// Declare the on-screen viewport size; recomputes the fit transform
    /// used by `to_native` / `to_display`.
    pub fn set_display_size(&mut self, display_w: f32, display_h: f32) {
        self.view = FitTransform::fit(
            self.width as f32,
            self.height as f32,
            display_w,
            display_h,
        );
    }

    pub fn view(&self) -> FitTransform {
        self.view
    }

    pub fn to_native(&self, display: (f32, f32)) -> (f32, f32) {
        self.view.to_native(display)
    }

    pub fn to_display(&self, native: (f32, f32)) -> (f32, f32) {
        self.view.to_display(native)
    }

    // ---- layer access ------------------------------------------------------

    pub fn background(&self) -> &PixelBuffer {
        &self.background
    }

    pub fn background_mut(&mut self) -> &mut PixelBuffer {
        &mut self.background
    }

    pub fn foreground(&self) -> &PixelBuffer {
        &self.foreground
    }

    pub fn foreground_mut(&mut self) -> &mut PixelBuffer {
        &mut self.foreground
    }

    /// Committed strokes, in pointer-event arrival order.
    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    /// Record a stroke whose pixels were already stamped incrementally
    /// during the gesture.
    pub fn push_stroke(&mut self, stroke: Stroke) {
        self.strokes.push(stroke);
    }

    /// Render a fully-built stroke onto the foreground, then record it.
    /// Used when strokes arrive as data rather than live pointer events.
    pub fn commit_stroke(&mut self, stroke: Stroke) {
        strokes::render(&mut self.foreground, &stroke);
        self.strokes.push(stroke);
    }

    // ---- compositing -------------------------------------------------------

    /// Flatten foreground over background at full native resolution.
    ///
    /// This is the downloadable image: pixel-identical to what is shown,
    /// untouched canvases flatten to exactly the loaded background.
    pub fn composite(&self) -> RgbaImage {
        let row = self.width as usize * 4;
        let mut out = self.background.as_raw().to_vec();
        out.par_chunks_exact_mut(row)
            .zip(self.foreground.as_raw().par_chunks_exact(row))
            .for_each(|(bg_row, fg_row)| {
                for x in 0..fg_row.len() / 4 {
                    let o = x * 4;
                    let fa = fg_row[o + 3] as u32;
                    if fa == 0 {
                        continue;
                    }
                    if fa == 255 {
                        bg_row[o..o + 4].copy_from_slice(&fg_row[o..o + 4]);
                        continue;
                    }
                    let ia = 255 - fa;
                    for c in 0..3 {
                        let blended =
                            fg_row[o + c] as u32 * fa + bg_row[o + c] as u32 * ia;
                        bg_row[o + c] = ((blended + 127) / 255) as u8;
                    }
                    let alpha = fa + (bg_row[o + 3] as u32 * ia + 127) / 255;
                    bg_row[o + 3] = alpha.min(255) as u8;
                }
            });
        RgbaImage::from_raw(self.width, self.height, out)
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }
}
