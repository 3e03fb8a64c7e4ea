//! Pointer-event tool controller.
//!
//! Three tools share one dispatch point: freehand paint, erase (paint with
//! transparency at a wider default width), and region fill.  Transitions
//! happen only through explicit tool selection; a selection arriving while
//! a gesture is in flight commits the gesture first so the stroke record
//! always matches the stamped pixels.

use image::Rgba;

use crate::canvas::CanvasSurface;
use crate::ops::fill::{self, FillConfig};
use crate::ops::strokes::{self, Stroke, StrokeMode};

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum Tool {
    #[default]
    Brush,
    Eraser,
    Fill,
}

/// Which layer a region fill recolors.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum FillTarget {
    /// Recolor the worksheet artwork itself ("color the picture").
    #[default]
    Artwork,
    /// Detect the region on the artwork but paint onto the foreground
    /// overlay, leaving the artwork untouched underneath.  Recognition
    /// activities use this so their answer key stays intact.
    Overlay,
}

#[derive(Clone, Copy, Debug)]
pub struct ToolProperties {
    pub color: Rgba<u8>,
    pub brush_size: f32,
    /// Erasing a stray line takes a fatter tip than drawing it did.
    pub eraser_size: f32,
}

impl Default for ToolProperties {
    fn default() -> Self {
        Self {
            color: Rgba([40, 40, 40, 255]),
            brush_size: 6.0,
            eraser_size: 24.0,
        }
    }
}

/// What a pointer event did to the surface, so the caller knows how much
/// to re-render.
#[derive(Debug, PartialEq)]
pub enum GestureEffect {
    /// Nothing visible changed.
    None,
    /// The in-flight stroke stamped new pixels.
    StrokeExtended,
    /// A finished stroke was committed to the foreground layer.
    StrokeCommitted,
    /// A region fill ran; `filled` pixels changed.
    Filled { filled: usize },
}

pub struct DrawingToolController {
    tool: Tool,
    pub properties: ToolProperties,
    pub fill_config: FillConfig,
    pub fill_target: FillTarget,
    active: Option<Stroke>,
}

impl Default for DrawingToolController {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawingToolController {
    pub fn new() -> Self {
        Self {
            tool: Tool::default(),
            properties: ToolProperties::default(),
            fill_config: FillConfig::default(),
            fill_target: FillTarget::default(),
            active: None,
        }
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Carry tool selection and brush properties over from another
    /// controller (the outgoing page's).  Gesture state and per-activity
    /// fill settings never carry over.
    pub fn adopt_settings(&mut self, other: &DrawingToolController) {
        self.tool = other.tool;
        self.properties = other.properties;
    }

    /// True between pointer-down and pointer-up of a brush/eraser gesture.
    pub fn gesture_in_flight(&self) -> bool {
        self.active.is_some()
    }

    /// Select a tool.  An in-flight stroke is committed first, so a tool
    /// change can never leave stamped pixels without a stroke record.
    pub fn set_tool(&mut self, surface: &mut CanvasSurface, tool: Tool) {
        if tool != self.tool && self.active.is_some() {
            self.finish_stroke(surface);
        }
        self.tool = tool;
    }

    fn stroke_params(&self) -> (Rgba<u8>, f32, StrokeMode) {
        match self.tool {
            Tool::Eraser => (Rgba([0, 0, 0, 0]), self.properties.eraser_size, StrokeMode::Erase),
            _ => (self.properties.color, self.properties.brush_size, StrokeMode::Paint),
        }
    }

    pub fn pointer_down(
        &mut self,
        surface: &mut CanvasSurface,
        display: (f32, f32),
    ) -> GestureEffect {
        let native = surface.to_native(display);
        match self.tool {
            Tool::Brush | Tool::Eraser => {
                // A down while a gesture is somehow still open replaces it
                if self.active.is_some() {
                    self.finish_stroke(surface);
                }
                let (color, width, mode) = self.stroke_params();
                strokes::stamp_circle(surface.foreground_mut(), native, color, width, mode);
                self.active = Some(Stroke::begin(native, color, width, mode));
                GestureEffect::StrokeExtended
            }
            Tool::Fill => self.click_fill(surface, native),
        }
    }

    pub fn pointer_move(
        &mut self,
        surface: &mut CanvasSurface,
        display: (f32, f32),
    ) -> GestureEffect {
        let native = surface.to_native(display);
        let Some(stroke) = self.active.as_mut() else {
            return GestureEffect::None;
        };
        if let Some(last) = stroke.last_point() {
            strokes::stamp_segment(
                surface.foreground_mut(),
                last,
                native,
                stroke.color,
                stroke.width,
                stroke.mode,
            );
        }
        stroke.push_point(native);
        GestureEffect::StrokeExtended
    }

    pub fn pointer_up(
        &mut self,
        surface: &mut CanvasSurface,
        display: (f32, f32),
    ) -> GestureEffect {
        if self.active.is_none() {
            return GestureEffect::None;
        }
        self.pointer_move(surface, display);
        self.finish_stroke(surface)
    }

    /// Pointer left the canvas mid-gesture: commit what was drawn so far.
    pub fn pointer_leave(&mut self, surface: &mut CanvasSurface) -> GestureEffect {
        if self.active.is_none() {
            return GestureEffect::None;
        }
        self.finish_stroke(surface)
    }

    fn finish_stroke(&mut self, surface: &mut CanvasSurface) -> GestureEffect {
        match self.active.take() {
            Some(stroke) => {
                // Pixels were stamped incrementally during the gesture;
                // only the record needs to land on the surface here.
                surface.push_stroke(stroke);
                GestureEffect::StrokeCommitted
            }
            None => GestureEffect::None,
        }
    }

    fn click_fill(&self, surface: &mut CanvasSurface, native: (f32, f32)) -> GestureEffect {
        // Clicks in the letterbox margin map to negative native space
        if native.0 < 0.0 || native.1 < 0.0 {
            return GestureEffect::None;
        }
        let (x, y) = (native.0 as u32, native.1 as u32);
        if !surface.background().in_bounds(x, y) {
            return GestureEffect::None;
        }
        let color = self.properties.color;
        let outcome = match self.fill_target {
            FillTarget::Artwork => fill::flood_fill(
                surface.background_mut(),
                x,
                y,
                color,
                &self.fill_config,
            ),
            FillTarget::Overlay => {
                let region = fill::flood_region(surface.background(), x, y, &self.fill_config);
                fill::apply_mask(
                    surface.foreground_mut(),
                    &region,
                    color,
                    self.fill_config.fill_alpha,
                );
                region
            }
        };
        if outcome.is_empty() {
            GestureEffect::None
        } else {
            GestureEffect::Filled { filled: outcome.filled }
        }
    }
}
