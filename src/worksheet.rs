//! Worksheet pages and the navigator that sequences through them.
//!
//! The navigator owns the whole per-page session (surface, tools, zones)
//! and tears it down on every page change: strokes, fills, and matching
//! results belong to one page visit, while tool selection and brush color
//! follow the user across pages.

use std::path::PathBuf;

use image::RgbaImage;

use crate::canvas::CanvasSurface;
use crate::error::SlateError;
use crate::io;
use crate::ops::fill::FillConfig;
use crate::tools::{DrawingToolController, FillTarget};
use crate::zones::{AnswerZoneModel, CorrectAnswer, ZoneConfig, ZoneRect, ZoneRole};

/// Where a page's background artwork comes from.  The surrounding product
/// resolves its opaque worksheet handles to one of these.
#[derive(Clone, Debug)]
pub enum ImageSource {
    Path(PathBuf),
    /// Already-decoded artwork (embedded assets, tests).
    Memory(RgbaImage),
}

/// The activity archetypes the engine is configured by.  Counting,
/// clock-reading, and alphabet worksheets are all `Recognition` with
/// different zone payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivityKind {
    /// Click-to-fill the artwork itself.
    Coloring,
    /// Freehand tracing/drawing over the artwork.
    Tracing,
    /// Answer zones over the artwork; fills go to a translucent overlay so
    /// the artwork underneath stays readable.
    Recognition,
}

impl ActivityKind {
    pub fn fill_target(self) -> FillTarget {
        match self {
            ActivityKind::Recognition => FillTarget::Overlay,
            _ => FillTarget::Artwork,
        }
    }

    pub fn fill_config(self) -> FillConfig {
        match self {
            ActivityKind::Recognition => FillConfig::overlay(),
            _ => FillConfig::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct WorksheetPage {
    /// Stable identifier, also the page's key in the zone payload.
    pub id: String,
    pub image: ImageSource,
    pub activity: ActivityKind,
    /// Authored zone data for this page, in order.
    pub zones: Vec<(ZoneRect, CorrectAnswer)>,
}

impl WorksheetPage {
    pub fn new(id: impl Into<String>, image: ImageSource, activity: ActivityKind) -> Self {
        Self { id: id.into(), image, activity, zones: Vec::new() }
    }

    pub fn with_zones(mut self, zones: Vec<(ZoneRect, CorrectAnswer)>) -> Self {
        self.zones = zones;
        self
    }
}

/// Everything owned by the active page visit.
pub struct WorksheetSession {
    pub surface: CanvasSurface,
    pub tools: DrawingToolController,
    pub zones: AnswerZoneModel,
}

pub struct WorksheetNavigator {
    pages: Vec<WorksheetPage>,
    index: usize,
    canvas_size: (u32, u32),
    display_size: Option<(f32, f32)>,
    role: ZoneRole,
    zone_config: ZoneConfig,
    session: WorksheetSession,
}

impl WorksheetNavigator {
    /// Build a navigator over `pages` and load the first page.
    pub fn new(
        pages: Vec<WorksheetPage>,
        canvas_w: u32,
        canvas_h: u32,
        role: ZoneRole,
        zone_config: ZoneConfig,
    ) -> Result<Self, SlateError> {
        if pages.is_empty() {
            return Err(SlateError::PageOutOfRange { index: 0, len: 0 });
        }
        let session = build_session(
            &pages[0],
            0,
            (canvas_w, canvas_h),
            role,
            zone_config,
            None,
        )?;
        Ok(Self {
            pages,
            index: 0,
            canvas_size: (canvas_w, canvas_h),
            display_size: None,
            role,
            zone_config,
            session,
        })
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn page(&self) -> &WorksheetPage {
        &self.pages[self.index]
    }

    pub fn session(&self) -> &WorksheetSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut WorksheetSession {
        &mut self.session
    }

    /// Forwarded to the active surface and remembered, so the fit
    /// transform survives page changes.
    pub fn set_display_size(&mut self, w: f32, h: f32) {
        self.display_size = Some((w, h));
        self.session.surface.set_display_size(w, h);
    }

    /// Advance one page.  `Ok(false)` at the last page; never wraps.
    pub fn next(&mut self) -> Result<bool, SlateError> {
        if self.index + 1 >= self.pages.len() {
            return Ok(false);
        }
        self.change_to(self.index + 1)?;
        Ok(true)
    }

    /// Go back one page.  `Ok(false)` at the first page; never wraps.
    pub fn previous(&mut self) -> Result<bool, SlateError> {
        if self.index == 0 {
            return Ok(false);
        }
        self.change_to(self.index - 1)?;
        Ok(true)
    }

    /// Jump directly to a page index.
    pub fn jump_to(&mut self, index: usize) -> Result<bool, SlateError> {
        if index >= self.pages.len() {
            return Err(SlateError::PageOutOfRange { index, len: self.pages.len() });
        }
        if index == self.index {
            return Ok(false);
        }
        self.change_to(index)?;
        Ok(true)
    }

    /// Swap in a freshly-built session for the target page.  The old
    /// session is dropped only after the new page's background loaded, so
    /// a failed load leaves the current page fully intact.
    fn change_to(&mut self, index: usize) -> Result<(), SlateError> {
        let session = build_session(
            &self.pages[index],
            index,
            self.canvas_size,
            self.role,
            self.zone_config,
            Some(&self.session.tools),
        )?;
        self.session = session;
        self.index = index;
        if let Some((w, h)) = self.display_size {
            self.session.surface.set_display_size(w, h);
        }
        crate::log_info!(
            "worksheet page {} of {} ('{}') loaded",
            index + 1,
            self.pages.len(),
            self.pages[index].id
        );
        Ok(())
    }
}

fn build_session(
    page: &WorksheetPage,
    page_index: usize,
    canvas_size: (u32, u32),
    role: ZoneRole,
    zone_config: ZoneConfig,
    outgoing_tools: Option<&DrawingToolController>,
) -> Result<WorksheetSession, SlateError> {
    let img = io::load_worksheet_image(&page.image)?;

    let mut surface = CanvasSurface::new(canvas_size.0, canvas_size.1);
    surface.load_background(&img);

    let mut tools = DrawingToolController::new();
    tools.fill_target = page.activity.fill_target();
    tools.fill_config = page.activity.fill_config();
    if let Some(outgoing) = outgoing_tools {
        tools.adopt_settings(outgoing);
    }

    let mut zones =
        AnswerZoneModel::from_records(page_index, page.zones.iter().cloned(), zone_config);
    if role != zones.role() {
        zones.set_role(role);
    }

    Ok(WorksheetSession { surface, tools, zones })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Tool;
    use crate::zones::StudentInput;
    use image::Rgba;

    fn memory_page(id: &str, color: Rgba<u8>, activity: ActivityKind) -> WorksheetPage {
        WorksheetPage::new(
            id,
            ImageSource::Memory(RgbaImage::from_pixel(16, 16, color)),
            activity,
        )
    }

    fn two_page_navigator() -> WorksheetNavigator {
        WorksheetNavigator::new(
            vec![
                memory_page("p-one", Rgba([250, 250, 250, 255]), ActivityKind::Coloring),
                memory_page("p-two", Rgba([200, 220, 240, 255]), ActivityKind::Coloring),
            ],
            16,
            16,
            ZoneRole::Matching,
            ZoneConfig::default(),
        )
        .expect("pages load")
    }

    #[test]
    fn empty_worksheet_is_rejected() {
        let result =
            WorksheetNavigator::new(vec![], 16, 16, ZoneRole::Matching, ZoneConfig::default());
        assert!(matches!(result, Err(SlateError::PageOutOfRange { .. })));
    }

    #[test]
    fn boundaries_are_noops_and_never_wrap() {
        let mut nav = two_page_navigator();
        assert!(!nav.previous().unwrap());
        assert_eq!(nav.index(), 0);

        assert!(nav.next().unwrap());
        assert!(!nav.next().unwrap());
        assert_eq!(nav.index(), 1);

        assert!(!nav.jump_to(1).unwrap());
        assert!(matches!(nav.jump_to(5), Err(SlateError::PageOutOfRange { index: 5, len: 2 })));
        assert_eq!(nav.index(), 1);
    }

    #[test]
    fn revisited_page_comes_back_fresh() {
        let mut nav = two_page_navigator();
        let pristine = nav.session().surface.background().as_raw().to_vec();

        // paint a stroke and poke the artwork on page one
        {
            let WorksheetSession { surface, tools, .. } = nav.session_mut();
            tools.properties.color = Rgba([255, 0, 0, 255]);
            tools.pointer_down(surface, (3.0, 3.0));
            tools.pointer_up(surface, (9.0, 9.0));
            surface.background_mut().set(2, 2, Rgba([1, 2, 3, 255]));
        }
        assert_ne!(nav.session().surface.background().as_raw(), pristine.as_slice());

        nav.next().unwrap();
        nav.previous().unwrap();

        let surface = &nav.session().surface;
        assert_eq!(surface.background().as_raw(), pristine.as_slice());
        assert!(surface.strokes().is_empty());
        assert!(surface.foreground().as_raw().iter().all(|&b| b == 0));
    }

    #[test]
    fn tool_selection_and_color_follow_the_user() {
        let mut nav = two_page_navigator();
        {
            let WorksheetSession { surface, tools, .. } = nav.session_mut();
            tools.set_tool(surface, Tool::Fill);
            tools.properties.color = Rgba([9, 99, 199, 255]);
        }
        nav.next().unwrap();
        let tools = &nav.session().tools;
        assert_eq!(tools.tool(), Tool::Fill);
        assert_eq!(tools.properties.color, Rgba([9, 99, 199, 255]));
    }

    #[test]
    fn matching_results_do_not_survive_page_changes() {
        let zone = (ZoneRect::new(0.0, 0.0, 10.0, 10.0), CorrectAnswer::Boolean(true));
        let mut nav = WorksheetNavigator::new(
            vec![
                memory_page("a", Rgba([255, 255, 255, 255]), ActivityKind::Recognition)
                    .with_zones(vec![zone.clone()]),
                memory_page("b", Rgba([255, 255, 255, 255]), ActivityKind::Recognition),
            ],
            16,
            16,
            ZoneRole::Matching,
            ZoneConfig::default(),
        )
        .unwrap();

        nav.session_mut().zones.submit_at(5.0, 5.0, StudentInput::Click);
        assert_eq!(nav.session().zones.score().correct_count, 1);

        nav.next().unwrap();
        nav.previous().unwrap();
        assert_eq!(nav.session().zones.score().correct_count, 0);
        assert_eq!(nav.session().zones.len(), 1);
    }

    #[test]
    fn recognition_pages_fill_the_overlay() {
        let nav = WorksheetNavigator::new(
            vec![memory_page("r", Rgba([255, 255, 255, 255]), ActivityKind::Recognition)],
            16,
            16,
            ZoneRole::Matching,
            ZoneConfig::default(),
        )
        .unwrap();
        let tools = &nav.session().tools;
        assert_eq!(tools.fill_target, FillTarget::Overlay);
        assert!(tools.fill_config.fill_alpha < 255);
    }

    #[test]
    fn failed_load_leaves_the_current_page_intact() {
        let mut nav = WorksheetNavigator::new(
            vec![
                memory_page("ok", Rgba([255, 255, 255, 255]), ActivityKind::Coloring),
                WorksheetPage::new(
                    "missing",
                    ImageSource::Path(PathBuf::from("/definitely/not/here.png")),
                    ActivityKind::Coloring,
                ),
            ],
            16,
            16,
            ZoneRole::Matching,
            ZoneConfig::default(),
        )
        .unwrap();

        nav.session_mut().surface.background_mut().set(1, 1, Rgba([7, 7, 7, 255]));
        let before = nav.session().surface.background().as_raw().to_vec();

        let err = nav.next();
        assert!(matches!(err, Err(SlateError::ResourceLoad { .. })));
        assert_eq!(nav.index(), 0);
        assert_eq!(nav.session().surface.background().as_raw(), before.as_slice());
    }
}
