pub mod fill;
pub mod strokes;
