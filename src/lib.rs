//! ColorSlate — an interactive-canvas engine for children's worksheet
//! activities: click-to-color region fills, freehand tracing, and
//! rectangular answer zones for recognition/quiz pages.
//!
//! The engine owns raster pixel data and gesture/zone state only.  Page
//! chrome, accounts, persistence, and asset delivery live in the
//! surrounding product, which talks to this crate through
//! [`worksheet::WorksheetNavigator`] and the exchange functions in [`io`].

#![allow(clippy::too_many_arguments)]

pub mod canvas;
pub mod cli;
pub mod error;
pub mod io;
pub mod logger;
pub mod ops;
pub mod tools;
pub mod worksheet;
pub mod zones;

pub use canvas::{CanvasSurface, FitTransform, PixelBuffer};
pub use error::SlateError;
pub use ops::fill::{FillConfig, FillOutcome};
pub use ops::strokes::{Stroke, StrokeMode};
pub use tools::{DrawingToolController, FillTarget, GestureEffect, Tool, ToolProperties};
pub use worksheet::{
    ActivityKind, ImageSource, WorksheetNavigator, WorksheetPage, WorksheetSession,
};
pub use zones::{
    AnswerZone, AnswerZoneModel, CorrectAnswer, MatchResult, ScoreSummary, StudentInput,
    ZoneConfig, ZoneRect, ZoneRole,
};
