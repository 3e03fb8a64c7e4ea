//! Answer zones: axis-aligned rectangles over the worksheet artwork, each
//! carrying the answer that makes it "correct".
//!
//! The same rectangle data serves two roles.  An administrator drags zones
//! into place (Authoring); a learner's clicks and typed answers are tested
//! against them (Matching).  The roles are never active simultaneously for
//! one page instance.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Rectangle in native image space.  Containment is inclusive on all four
/// edges so zones drawn flush against each other leave no dead gap lines.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoneRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ZoneRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Normalize a drag between two corners into an origin + size rect,
    /// whichever direction the drag ran.
    pub fn from_drag(a: (f32, f32), b: (f32, f32)) -> Self {
        Self {
            x: a.0.min(b.0),
            y: a.1.min(b.1),
            width: (a.0 - b.0).abs(),
            height: (a.1 - b.1).abs(),
        }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

/// The expected answer attached to a zone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum CorrectAnswer {
    /// Typed answer, compared case-insensitively and trimmed.
    Text(String),
    /// Click-to-identify: `true` zones are the ones that should be clicked.
    Boolean(bool),
    /// Category tag, compared exactly (e.g. "vowel", "o-clock-3").
    Tag(String),
}

/// A learner's input event against a zone.
#[derive(Clone, Debug, PartialEq)]
pub enum StudentInput {
    /// A bare click/tap on the zone.
    Click,
    Text(String),
    Boolean(bool),
    Tag(String),
}

impl CorrectAnswer {
    pub fn accepts(&self, input: &StudentInput) -> bool {
        match (self, input) {
            (CorrectAnswer::Text(want), StudentInput::Text(got)) => {
                want.trim().eq_ignore_ascii_case(got.trim())
            }
            // Clicking a zone asserts "this one" - correct exactly when the
            // zone is a should-be-clicked zone.
            (CorrectAnswer::Boolean(want), StudentInput::Click) => *want,
            (CorrectAnswer::Boolean(want), StudentInput::Boolean(got)) => want == got,
            (CorrectAnswer::Tag(want), StudentInput::Tag(got)) => want == got,
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnswerZone {
    pub id: Uuid,
    /// Page the zone belongs to, by index; zones never hold page pointers
    /// so pages serialize independently.
    pub page: usize,
    pub rect: ZoneRect,
    /// Creation order.  Overlap ties during matching resolve to the lowest
    /// order, which is the only deterministic rule once authoring allows
    /// overlapping boxes.
    pub order: usize,
    pub answer: CorrectAnswer,
}

/// Authoring-time validation knob, a setting rather than a constant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// Drags whose width or height do not exceed this are accidental
    /// micro-drags and are discarded without comment.
    pub min_zone_size: f32,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self { min_zone_size: 10.0 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoneRole {
    Authoring,
    Matching,
}

/// Outcome of testing one input against the zone set.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchResult {
    pub zone_id: Uuid,
    pub order: usize,
    pub correct: bool,
    /// The zone was already satisfied before this input; the tally did not
    /// move.
    pub already_satisfied: bool,
}

/// Running tally for the current page, handed upstream for persistence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScoreSummary {
    pub correct_count: usize,
    pub incorrect_count: usize,
    pub total_zones: usize,
}

pub struct AnswerZoneModel {
    role: ZoneRole,
    page: usize,
    /// Kept sorted by `order`; deletion leaves the surviving orders as-is.
    zones: Vec<AnswerZone>,
    config: ZoneConfig,
    /// Next order to assign; never reused after deletions.
    next_order: usize,
    drag: Option<((f32, f32), (f32, f32))>,
    satisfied: HashSet<Uuid>,
    incorrect_count: usize,
}

impl AnswerZoneModel {
    pub fn new(page: usize, role: ZoneRole, config: ZoneConfig) -> Self {
        Self {
            role,
            page,
            zones: Vec::new(),
            config,
            next_order: 0,
            drag: None,
            satisfied: HashSet::new(),
            incorrect_count: 0,
        }
    }

    /// Build a Matching-role model from previously authored zone data.
    pub fn from_records(
        page: usize,
        records: impl IntoIterator<Item = (ZoneRect, CorrectAnswer)>,
        config: ZoneConfig,
    ) -> Self {
        let mut model = Self::new(page, ZoneRole::Matching, config);
        for (rect, answer) in records {
            let order = model.next_order;
            model.next_order += 1;
            model.zones.push(AnswerZone {
                id: Uuid::new_v4(),
                page,
                rect,
                order,
                answer,
            });
        }
        model
    }

    pub fn role(&self) -> ZoneRole {
        self.role
    }

    /// Switch roles; any live drag and all matching results are dropped.
    pub fn set_role(&mut self, role: ZoneRole) {
        self.role = role;
        self.drag = None;
        self.reset_results();
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn zones(&self) -> &[AnswerZone] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    // ---- authoring role ----------------------------------------------------

    /// Start a drag at (x, y).  Ignored outside the Authoring role.
    pub fn begin_drag(&mut self, x: f32, y: f32) {
        if self.role != ZoneRole::Authoring {
            return;
        }
        self.drag = Some(((x, y), (x, y)));
    }

    /// Move the live corner; returns the preview rectangle to render.
    /// Nothing is committed yet.
    pub fn update_drag(&mut self, x: f32, y: f32) -> Option<ZoneRect> {
        let (start, current) = self.drag.as_mut()?;
        *current = (x, y);
        Some(ZoneRect::from_drag(*start, *current))
    }

    /// Finish the drag.  The zone is committed only when both dimensions
    /// exceed the configured minimum; accidental micro-drags vanish
    /// silently.
    pub fn end_drag(&mut self, x: f32, y: f32, answer: CorrectAnswer) -> Option<&AnswerZone> {
        let (start, _) = self.drag.take()?;
        let rect = ZoneRect::from_drag(start, (x, y));
        if rect.width <= self.config.min_zone_size || rect.height <= self.config.min_zone_size {
            return None;
        }
        let order = self.next_order;
        self.next_order += 1;
        self.zones.push(AnswerZone {
            id: Uuid::new_v4(),
            page: self.page,
            rect,
            order,
            answer,
        });
        self.zones.last()
    }

    /// Remove one zone by id.  Only that id is invalidated; every other
    /// zone keeps its order.
    pub fn delete_zone(&mut self, id: Uuid) -> bool {
        if self.role != ZoneRole::Authoring {
            return false;
        }
        let before = self.zones.len();
        self.zones.retain(|z| z.id != id);
        self.satisfied.remove(&id);
        before != self.zones.len()
    }

    // ---- matching role -----------------------------------------------------

    /// First zone (by order index) whose rectangle contains the point.
    pub fn zone_at(&self, x: f32, y: f32) -> Option<&AnswerZone> {
        self.zones.iter().find(|z| z.rect.contains(x, y))
    }

    /// Test an input delivered at a point; `None` when the point misses
    /// every zone (which is neither correct nor incorrect).
    pub fn submit_at(&mut self, x: f32, y: f32, input: StudentInput) -> Option<MatchResult> {
        if self.role != ZoneRole::Matching {
            return None;
        }
        let (id, order, correct) = {
            let zone = self.zone_at(x, y)?;
            (zone.id, zone.order, zone.answer.accepts(&input))
        };
        Some(self.record(id, order, correct))
    }

    /// Test an input addressed to a zone directly (text entry widgets know
    /// which zone they sit in).
    pub fn submit_for(&mut self, id: Uuid, input: StudentInput) -> Option<MatchResult> {
        if self.role != ZoneRole::Matching {
            return None;
        }
        let (order, correct) = {
            let zone = self.zones.iter().find(|z| z.id == id)?;
            (zone.order, zone.answer.accepts(&input))
        };
        Some(self.record(id, order, correct))
    }

    fn record(&mut self, id: Uuid, order: usize, correct: bool) -> MatchResult {
        let already_satisfied = self.satisfied.contains(&id);
        if correct {
            self.satisfied.insert(id);
        } else {
            self.incorrect_count += 1;
        }
        MatchResult { zone_id: id, order, correct, already_satisfied }
    }

    pub fn score(&self) -> ScoreSummary {
        ScoreSummary {
            correct_count: self.satisfied.len(),
            incorrect_count: self.incorrect_count,
            total_zones: self.zones.len(),
        }
    }

    /// Drop all matching results (page change, retry).
    pub fn reset_results(&mut self) {
        self.satisfied.clear();
        self.incorrect_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authoring() -> AnswerZoneModel {
        AnswerZoneModel::new(0, ZoneRole::Authoring, ZoneConfig::default())
    }

    #[test]
    fn micro_drag_is_discarded() {
        let mut model = authoring();
        model.begin_drag(20.0, 20.0);
        model.update_drag(23.0, 24.0);
        let committed = model.end_drag(25.0, 25.0, CorrectAnswer::Boolean(true));
        assert!(committed.is_none());
        assert_eq!(model.len(), 0);
    }

    #[test]
    fn drag_exceeding_the_minimum_commits_one_zone() {
        let mut model = authoring();
        model.begin_drag(10.0, 10.0);
        let zone = model
            .end_drag(60.0, 40.0, CorrectAnswer::Text("seven".into()))
            .cloned();
        let zone = zone.expect("zone should commit");
        assert_eq!(zone.rect, ZoneRect::new(10.0, 10.0, 50.0, 30.0));
        assert_eq!(zone.order, 0);
        assert_eq!(model.len(), 1);
    }

    #[test]
    fn drag_direction_does_not_matter() {
        let mut model = authoring();
        model.begin_drag(60.0, 40.0);
        let zone = model.end_drag(10.0, 10.0, CorrectAnswer::Boolean(true)).cloned();
        assert_eq!(zone.map(|z| z.rect), Some(ZoneRect::new(10.0, 10.0, 50.0, 30.0)));
    }

    #[test]
    fn update_drag_previews_without_committing() {
        let mut model = authoring();
        model.begin_drag(0.0, 0.0);
        let preview = model.update_drag(30.0, 30.0);
        assert_eq!(preview, Some(ZoneRect::new(0.0, 0.0, 30.0, 30.0)));
        assert_eq!(model.len(), 0);
    }

    #[test]
    fn orders_count_up_and_survive_deletion() {
        let mut model = authoring();
        for i in 0..3 {
            model.begin_drag(0.0, i as f32 * 40.0);
            model.end_drag(30.0, i as f32 * 40.0 + 30.0, CorrectAnswer::Boolean(true));
        }
        let middle = model.zones()[1].id;
        assert!(model.delete_zone(middle));
        assert_eq!(model.len(), 2);
        assert_eq!(model.zones()[0].order, 0);
        assert_eq!(model.zones()[1].order, 2);
        assert!(!model.delete_zone(middle));
    }

    fn matching_two_overlapping() -> AnswerZoneModel {
        AnswerZoneModel::from_records(
            0,
            [
                (ZoneRect::new(0.0, 0.0, 50.0, 50.0), CorrectAnswer::Boolean(true)),
                (ZoneRect::new(25.0, 25.0, 50.0, 50.0), CorrectAnswer::Boolean(false)),
            ],
            ZoneConfig::default(),
        )
    }

    #[test]
    fn overlap_resolves_to_the_earliest_order() {
        let model = matching_two_overlapping();
        // (30, 30) is inside both rectangles
        let hit = model.zone_at(30.0, 30.0).expect("point is covered");
        assert_eq!(hit.order, 0);
    }

    #[test]
    fn containment_is_inclusive_of_edges() {
        let model = matching_two_overlapping();
        assert!(model.zone_at(0.0, 0.0).is_some());
        assert!(model.zone_at(50.0, 50.0).is_some());
        assert!(model.zone_at(75.0, 75.0).is_some());
        assert!(model.zone_at(75.1, 75.0).is_none());
    }

    #[test]
    fn repeated_correct_hits_do_not_double_count() {
        let mut model = matching_two_overlapping();
        let first = model.submit_at(10.0, 10.0, StudentInput::Click).unwrap();
        assert!(first.correct);
        assert!(!first.already_satisfied);

        let second = model.submit_at(10.0, 10.0, StudentInput::Click).unwrap();
        assert!(second.correct);
        assert!(second.already_satisfied);

        assert_eq!(model.score().correct_count, 1);
    }

    #[test]
    fn incorrect_inputs_raise_the_incorrect_tally() {
        let mut model = matching_two_overlapping();
        // (60, 60) only falls in the order-1 zone, whose answer is false
        let miss = model.submit_at(60.0, 60.0, StudentInput::Click).unwrap();
        assert!(!miss.correct);
        assert_eq!(
            model.score(),
            ScoreSummary { correct_count: 0, incorrect_count: 1, total_zones: 2 }
        );
    }

    #[test]
    fn click_outside_every_zone_is_neither() {
        let mut model = matching_two_overlapping();
        assert!(model.submit_at(200.0, 200.0, StudentInput::Click).is_none());
        assert_eq!(model.score().incorrect_count, 0);
    }

    #[test]
    fn text_answers_compare_trimmed_case_insensitive() {
        let mut model = AnswerZoneModel::from_records(
            0,
            [(ZoneRect::new(0.0, 0.0, 40.0, 40.0), CorrectAnswer::Text("Seven".into()))],
            ZoneConfig::default(),
        );
        let id = model.zones()[0].id;
        let result = model
            .submit_for(id, StudentInput::Text("  seven ".into()))
            .unwrap();
        assert!(result.correct);
        assert!(!model
            .submit_for(id, StudentInput::Text("eight".into()))
            .unwrap()
            .correct);
    }

    #[test]
    fn roles_guard_their_operations() {
        let mut model = matching_two_overlapping();
        // matching role: authoring drags are ignored
        model.begin_drag(0.0, 0.0);
        assert!(model.end_drag(100.0, 100.0, CorrectAnswer::Boolean(true)).is_none());
        assert_eq!(model.len(), 2);
        assert!(!model.delete_zone(model.zones()[0].id));

        // authoring role: submissions are ignored
        let mut author = authoring();
        author.begin_drag(0.0, 0.0);
        author.end_drag(40.0, 40.0, CorrectAnswer::Boolean(true));
        assert!(author.submit_at(5.0, 5.0, StudentInput::Click).is_none());
    }

    #[test]
    fn set_role_drops_results() {
        let mut model = matching_two_overlapping();
        model.submit_at(10.0, 10.0, StudentInput::Click);
        assert_eq!(model.score().correct_count, 1);
        model.set_role(ZoneRole::Authoring);
        model.set_role(ZoneRole::Matching);
        assert_eq!(model.score().correct_count, 0);
    }
}
