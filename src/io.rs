//! Exchange boundary: worksheet image decode, flattened PNG export, and
//! the zone-definition payload the Authoring role exports and the Matching
//! role imports.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::canvas::CanvasSurface;
use crate::error::SlateError;
use crate::worksheet::ImageSource;
use crate::zones::{AnswerZoneModel, CorrectAnswer, ZoneRect};

// ============================================================================
// WORKSHEET IMAGE LOADING
// ============================================================================

/// Decode a page's background artwork to RGBA.
///
/// The one failure path that matters: a bad file surfaces as
/// `ResourceLoad` and nothing downstream is touched.
pub fn load_worksheet_image(source: &ImageSource) -> Result<RgbaImage, SlateError> {
    match source {
        ImageSource::Memory(img) => Ok(img.clone()),
        ImageSource::Path(path) => match image::open(path) {
            Ok(img) => Ok(img.to_rgba8()),
            Err(e) => {
                crate::log_err!("worksheet image '{}' failed to load: {}", path.display(), e);
                Err(SlateError::ResourceLoad { path: path.clone(), source: e })
            }
        },
    }
}

// ============================================================================
// COMPOSITE EXPORT
// ============================================================================

/// Encode the flattened canvas as lossless PNG at full native resolution
/// (never the display-scaled size).
pub fn encode_composite_png<W: Write>(
    surface: &CanvasSurface,
    writer: W,
) -> Result<(), SlateError> {
    let flat = surface.composite();
    PngEncoder::new(writer)
        .write_image(flat.as_raw(), flat.width(), flat.height(), ColorType::Rgba8)
        .map_err(SlateError::Encode)
}

/// Flatten and write the canvas to `path` as PNG.
pub fn export_composite_png(surface: &CanvasSurface, path: &Path) -> Result<(), SlateError> {
    let file = File::create(path).map_err(|e| SlateError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    encode_composite_png(surface, BufWriter::new(file))
}

// ============================================================================
// ZONE-DEFINITION PAYLOAD
// ============================================================================

pub const PAYLOAD_VERSION: u32 = 1;

/// One authored zone as it travels in the document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoneRecord {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(rename = "correctAnswer")]
    pub answer: CorrectAnswer,
}

/// The zone-definition document: page id → ordered zone records.
///
/// Pages sit in a `BTreeMap` so serialization order is stable and an
/// import/export cycle reproduces the document exactly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZonePayload {
    pub version: u32,
    pub pages: BTreeMap<String, Vec<ZoneRecord>>,
}

impl Default for ZonePayload {
    fn default() -> Self {
        Self::new()
    }
}

impl ZonePayload {
    pub fn new() -> Self {
        Self { version: PAYLOAD_VERSION, pages: BTreeMap::new() }
    }

    /// Records for one page; unknown ids are an empty page, not an error.
    pub fn records_for(&self, page_id: &str) -> &[ZoneRecord] {
        self.pages.get(page_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Page records in the form `WorksheetPage` and `AnswerZoneModel`
    /// consume.
    pub fn zone_data(&self, page_id: &str) -> Vec<(ZoneRect, CorrectAnswer)> {
        self.records_for(page_id)
            .iter()
            .map(|r| (ZoneRect::new(r.x, r.y, r.width, r.height), r.answer.clone()))
            .collect()
    }

    /// Replace one page's records with the zones currently in `model`
    /// (authoring export).  Zone order in the model is creation order,
    /// which is exactly the order the document stores.
    pub fn set_page_from_model(&mut self, page_id: impl Into<String>, model: &AnswerZoneModel) {
        let records = model
            .zones()
            .iter()
            .map(|z| ZoneRecord {
                x: z.rect.x,
                y: z.rect.y,
                width: z.rect.width,
                height: z.rect.height,
                answer: z.answer.clone(),
            })
            .collect();
        self.pages.insert(page_id.into(), records);
    }
}

/// Parse and validate a payload document.
pub fn parse_zone_payload(text: &str) -> Result<ZonePayload, SlateError> {
    let payload: ZonePayload = serde_json::from_str(text)?;
    if payload.version != PAYLOAD_VERSION {
        return Err(SlateError::PayloadInvalid(format!(
            "unsupported payload version {} (expected {})",
            payload.version, PAYLOAD_VERSION
        )));
    }
    for (page_id, records) in &payload.pages {
        for (i, r) in records.iter().enumerate() {
            if r.width <= 0.0 || r.height <= 0.0 {
                return Err(SlateError::PayloadInvalid(format!(
                    "page '{}' zone {} has non-positive size {}×{}",
                    page_id, i, r.width, r.height
                )));
            }
        }
    }
    Ok(payload)
}

pub fn serialize_zone_payload(payload: &ZonePayload) -> Result<String, SlateError> {
    Ok(serde_json::to_string_pretty(payload)?)
}

pub fn read_zone_payload(path: &Path) -> Result<ZonePayload, SlateError> {
    let text = fs::read_to_string(path).map_err(|e| SlateError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_zone_payload(&text)
}

pub fn write_zone_payload(path: &Path, payload: &ZonePayload) -> Result<(), SlateError> {
    let text = serialize_zone_payload(payload)?;
    fs::write(path, text).map_err(|e| SlateError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zones::{ZoneConfig, ZoneRole};
    use image::Rgba;
    use std::path::PathBuf;

    fn sample_payload() -> ZonePayload {
        let mut payload = ZonePayload::new();
        payload.pages.insert(
            "clock-1".into(),
            vec![ZoneRecord {
                x: 10.0,
                y: 20.0,
                width: 64.0,
                height: 48.0,
                answer: CorrectAnswer::Text("3 o'clock".into()),
            }],
        );
        payload.pages.insert(
            "count-apples".into(),
            vec![
                ZoneRecord {
                    x: 0.0,
                    y: 0.0,
                    width: 100.0,
                    height: 100.0,
                    answer: CorrectAnswer::Boolean(true),
                },
                ZoneRecord {
                    x: 50.0,
                    y: 0.0,
                    width: 100.0,
                    height: 100.0,
                    answer: CorrectAnswer::Tag("vowel".into()),
                },
            ],
        );
        payload
    }

    #[test]
    fn payload_round_trips_exactly() {
        let payload = sample_payload();
        let text = serialize_zone_payload(&payload).unwrap();
        let reparsed = parse_zone_payload(&text).unwrap();
        assert_eq!(reparsed, payload);
        // byte-for-byte stable across an import/export cycle
        assert_eq!(serialize_zone_payload(&reparsed).unwrap(), text);
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut payload = sample_payload();
        payload.version = 99;
        let text = serde_json::to_string(&payload).unwrap();
        assert!(matches!(
            parse_zone_payload(&text),
            Err(SlateError::PayloadInvalid(_))
        ));
    }

    #[test]
    fn non_positive_zone_size_is_rejected() {
        let mut payload = sample_payload();
        payload.pages.get_mut("clock-1").unwrap()[0].width = 0.0;
        let text = serde_json::to_string(&payload).unwrap();
        assert!(matches!(
            parse_zone_payload(&text),
            Err(SlateError::PayloadInvalid(_))
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            parse_zone_payload("{ not json"),
            Err(SlateError::PayloadParse(_))
        ));
    }

    #[test]
    fn authored_zones_export_and_reimport() {
        let mut model = AnswerZoneModel::new(0, ZoneRole::Authoring, ZoneConfig::default());
        model.begin_drag(10.0, 10.0);
        model.end_drag(60.0, 40.0, CorrectAnswer::Text("seven".into()));
        model.begin_drag(80.0, 10.0);
        model.end_drag(130.0, 40.0, CorrectAnswer::Boolean(false));

        let mut payload = ZonePayload::new();
        payload.set_page_from_model("numbers-1", &model);

        let data = payload.zone_data("numbers-1");
        assert_eq!(data.len(), 2);
        assert_eq!(data[0].0, ZoneRect::new(10.0, 10.0, 50.0, 30.0));
        assert_eq!(data[0].1, CorrectAnswer::Text("seven".into()));
        assert_eq!(data[1].1, CorrectAnswer::Boolean(false));
        assert!(payload.zone_data("unknown-page").is_empty());
    }

    #[test]
    fn exported_png_decodes_back_to_the_composite() {
        let mut surface = CanvasSurface::new(8, 8);
        surface.background_mut().set(3, 3, Rgba([12, 34, 56, 255]));
        let mut bytes = Vec::new();
        encode_composite_png(&surface, &mut bytes).unwrap();

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.as_raw(), surface.composite().as_raw());
        assert_eq!(*decoded.get_pixel(3, 3), Rgba([12, 34, 56, 255]));
    }

    #[test]
    fn missing_image_file_surfaces_as_resource_load() {
        let source = ImageSource::Path(PathBuf::from("/no/such/worksheet.png"));
        assert!(matches!(
            load_worksheet_image(&source),
            Err(SlateError::ResourceLoad { .. })
        ));
    }
}
