use crate::config::{TagEditorConfig, UnresolvedDrop};
use crate::document::{Document, Segment};
use crate::geometry::{find_line_gap, first_node_below, Point, PositionResolver};
use crate::models::{find_suggestion, Chip, DragPayload, PayloadError, PlacedTag, Suggestion, TagInstanceId};

/// Where a line break would go while a drag hovers between two lines.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HoverLine {
    pub show: bool,
    /// Offset from the surface's top edge.
    pub top: f64,
}

impl HoverLine {
    pub const HIDDEN: Self = Self { show: false, top: 0.0 };

    pub fn at(top: f64) -> Self {
        Self { show: true, top }
    }
}

/// Handle of one scheduled deferred hide. Only the most recent ticket may fire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlurTicket(u64);

/// A tag to delete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TagRef {
    Instance(TagInstanceId),
    /// The first chip, in document order, created from this suggestion.
    Suggestion(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropOutcome {
    Inserted(TagInstanceId),
    Moved(TagInstanceId),
}

#[derive(Debug, thiserror::Error)]
pub enum DropError {
    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error("no chip `{0}` in this editor")]
    UnknownChip(TagInstanceId),

    #[error("no drop target under the pointer")]
    UnresolvedTarget,
}

#[derive(Clone, Debug)]
pub struct TagEditorState {
    /// Placed tags in drop order.
    pub tags: Vec<PlacedTag>,
    /// Free text of the surface, chips left out.
    pub input_value: String,
    pub show_suggestions: bool,
    pub hover_line: HoverLine,
    pub document: Document,
    pub caret: Option<usize>,

    config: TagEditorConfig,
    /// Bumped on every edit that needs the surface re-rendered.
    revision: u64,
    blur_generation: u64,
}

impl TagEditorState {
    pub fn new(config: TagEditorConfig) -> Self {
        Self {
            tags: vec![],
            input_value: String::new(),
            show_suggestions: false,
            hover_line: HoverLine::HIDDEN,
            document: Document::new(),
            caret: None,
            config,
            revision: 0,
            blur_generation: 0,
        }
    }

    /// Start with one chip (plus a trailing NBSP) per known suggestion id.
    pub fn with_initial_tags(config: TagEditorConfig, suggestion_ids: &[String]) -> Self {
        let mut state = Self::new(config);
        for id in suggestion_ids {
            let Some(s) = find_suggestion(&state.config.suggestions, id).cloned() else {
                leptos::logging::warn!("tag editor: unknown initial tag {id:?}");
                continue;
            };
            let end = state.document.len();
            state.place(&s, end, vec![]);
        }
        state.caret = None;
        state
    }

    pub fn config(&self) -> &TagEditorConfig {
        &self.config
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.config.suggestions
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Focus or pointer-enter on the surface.
    pub fn reveal_suggestions(&mut self) {
        self.show_suggestions = true;
        self.blur_generation += 1;
    }

    /// Blur of the surface. Returns a ticket for a deferred hide unless focus
    /// stayed inside the widget.
    pub fn blur(&mut self, focus_within: bool) -> Option<BlurTicket> {
        if focus_within {
            return None;
        }
        self.blur_generation += 1;
        Some(BlurTicket(self.blur_generation))
    }

    /// Run a deferred hide. Stale tickets (a focus or hover happened since) and
    /// a pointer still over the surface keep the panel open.
    pub fn fire_blur_hide(&mut self, ticket: BlurTicket, pointer_over: bool) -> bool {
        if ticket.0 != self.blur_generation || pointer_over {
            return false;
        }
        self.show_suggestions = false;
        true
    }

    pub fn drag_over(&mut self, pointer: Point, layout: &impl PositionResolver) -> HoverLine {
        let top = layout.surface_top();
        let y = pointer.y - top;
        self.hover_line = match find_line_gap(&layout.node_boxes(), top, y, self.config.hover_tolerance_px) {
            Some(mid) => HoverLine::at(mid),
            None => HoverLine::HIDDEN,
        };
        self.hover_line
    }

    pub fn drag_leave(&mut self) {
        self.hover_line = HoverLine::HIDDEN;
    }

    /// Handle a drop of `raw` (the transferred `text/plain`) at `pointer`.
    ///
    /// Whatever the outcome, the hover line and the suggestion panel are
    /// cleared afterwards.
    pub fn drop(
        &mut self,
        raw: &str,
        pointer: Point,
        layout: &impl PositionResolver,
    ) -> Result<DropOutcome, DropError> {
        let result = DragPayload::decode(raw)
            .map_err(DropError::from)
            .and_then(|payload| match payload {
                DragPayload::Internal(id) => self.drop_internal(id, pointer, layout),
                DragPayload::Suggestion(s) => self.drop_suggestion(&s, pointer, layout),
            });

        self.hover_line = HoverLine::HIDDEN;
        self.show_suggestions = false;
        result
    }

    fn drop_internal(
        &mut self,
        id: TagInstanceId,
        pointer: Point,
        layout: &impl PositionResolver,
    ) -> Result<DropOutcome, DropError> {
        if self.document.chip_position(&id).is_none() {
            return Err(DropError::UnknownChip(id));
        }
        // No caret: the chip stays where it is.
        let pos = layout.caret_at(pointer).ok_or(DropError::UnresolvedTarget)?;
        let caret = self
            .document
            .move_chip(&id, pos)
            .ok_or_else(|| DropError::UnknownChip(id.clone()))?;
        self.caret = Some(caret);
        self.input_value = self.document.plain_text();
        self.revision += 1;
        Ok(DropOutcome::Moved(id))
    }

    fn drop_suggestion(
        &mut self,
        suggestion: &Suggestion,
        pointer: Point,
        layout: &impl PositionResolver,
    ) -> Result<DropOutcome, DropError> {
        let (pos, framed) = if self.hover_line.show {
            let target = first_node_below(&layout.node_boxes(), layout.surface_top(), self.hover_line.top);
            (target, true)
        } else {
            (layout.caret_at(pointer), false)
        };

        let pos = match (pos, self.config.unresolved_drop) {
            (Some(p), _) => p,
            (None, UnresolvedDrop::Append) => self.document.len(),
            (None, UnresolvedDrop::Discard) => return Err(DropError::UnresolvedTarget),
        };

        let id = if framed {
            self.place(suggestion, pos, vec![Segment::LineBreak])
        } else {
            self.place(suggestion, pos, vec![])
        };
        Ok(DropOutcome::Inserted(id))
    }

    /// Insert a fresh chip and a trailing NBSP at `pos`, wrapped in `frame`
    /// on both sides. The caret ends up after the NBSP.
    fn place(&mut self, suggestion: &Suggestion, pos: usize, frame: Vec<Segment>) -> TagInstanceId {
        let chip = Chip::place(suggestion);
        let id = chip.instance.clone();
        self.tags.push(PlacedTag::from(&chip));

        let mut items = frame.clone();
        items.push(Segment::Chip(chip));
        items.push(Segment::nbsp());
        let caret = self.document.insert(pos, items);
        if !frame.is_empty() {
            self.document.insert(caret, frame);
        }

        self.caret = Some(caret);
        self.input_value = self.document.plain_text();
        self.revision += 1;
        id
    }

    /// Enter key: a blank line at `pos` instead of a single break.
    pub fn enter(&mut self, pos: usize) -> usize {
        let caret = self.document.insert_paragraph_break(pos);
        self.caret = Some(caret);
        self.input_value = self.document.plain_text();
        self.revision += 1;
        caret
    }

    /// Remove one tag from both the tag list and the document. Returns whether
    /// anything changed.
    pub fn delete_tag(&mut self, tag: &TagRef) -> bool {
        let instance = match tag {
            TagRef::Instance(id) => Some(id.clone()),
            TagRef::Suggestion(sid) => self.document.first_chip_for(sid).map(|c| c.instance.clone()),
        };

        let Some(instance) = instance else {
            // No chip to remove; the list is still updated.
            let TagRef::Suggestion(sid) = tag else {
                return false;
            };
            let Some(idx) = self.tags.iter().position(|t| &t.suggestion_id == sid) else {
                return false;
            };
            self.tags.remove(idx);
            return true;
        };

        let listed = self.tags.iter().position(|t| t.instance == instance);
        if let Some(idx) = listed {
            self.tags.remove(idx);
        }

        let removed = self.document.remove_chip(&instance);
        if let Some((pos, _)) = removed {
            self.caret = self.caret.map(|c| if c > pos { c - 1 } else { c });
            self.input_value = self.document.plain_text();
            self.revision += 1;
        }

        listed.is_some() || removed.is_some()
    }

    /// Adopt the document read back from the surface after user input.
    ///
    /// Tags whose chip disappeared are dropped from the list, and chips that
    /// showed up (pasted or duplicated) are appended in document order.
    /// Repeated instance ids are re-minted, which is the only case that
    /// requests a re-render.
    pub fn sync_from_surface(&mut self, mut document: Document, caret: Option<usize>) {
        if document.remint_duplicate_chips() {
            self.revision += 1;
        }
        self.tags
            .retain(|t| document.chip_position(&t.instance).is_some());
        let unlisted: Vec<PlacedTag> = document
            .chips()
            .filter(|c| !self.tags.iter().any(|t| t.instance == c.instance))
            .map(PlacedTag::from)
            .collect();
        self.tags.extend(unlisted);
        self.input_value = document.plain_text();
        self.document = document;
        self.caret = caret;
    }
}

impl Default for TagEditorState {
    fn default() -> Self {
        Self::new(TagEditorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::NBSP;
    use crate::geometry::FixedLayout;

    fn ask_ai() -> String {
        r#"{"id":"ask-ai","label":"Ask AI","icon":"🤖"}"#.to_string()
    }

    fn internal(id: &TagInstanceId) -> String {
        DragPayload::Internal(id.clone()).encode()
    }

    fn text_state(text: &str) -> TagEditorState {
        let mut s = TagEditorState::default();
        s.sync_from_surface(Document::from_segments(vec![Segment::text(text)]), None);
        s
    }

    fn chip_ids(s: &TagEditorState) -> Vec<String> {
        s.document.chips().map(|c| c.suggestion_id.clone()).collect()
    }

    #[test]
    fn test_drop_suggestion_at_caret() {
        let mut s = text_state("hello world");
        let layout = FixedLayout::default().with_caret(Some(6));

        let out = s.drop(&ask_ai(), Point::new(1.0, 1.0), &layout).expect("drop should place");

        let DropOutcome::Inserted(id) = out else {
            panic!("expected an insertion");
        };
        assert_eq!(s.tags.len(), 1);
        assert_eq!(s.tags[0].suggestion_id, "ask-ai");
        assert_eq!(s.tags[0].instance, id);

        let segs = s.document.segments();
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[0], Segment::text("hello "));
        let Segment::Chip(chip) = &segs[1] else {
            panic!("expected a chip");
        };
        assert_eq!(chip.icon, "🤖");
        assert_eq!(chip.label, "Ask AI");
        assert_eq!(segs[2], Segment::Text(format!("{NBSP}world")));
        assert_eq!(s.caret, Some(8));
    }

    #[test]
    fn test_same_suggestion_twice_gives_two_distinct_chips() {
        let mut s = TagEditorState::default();
        let layout = FixedLayout::default().with_caret(Some(0));

        s.drop(&ask_ai(), Point::default(), &layout).expect("first drop");
        s.drop(&ask_ai(), Point::default(), &layout).expect("second drop");

        assert_eq!(chip_ids(&s), vec!["ask-ai", "ask-ai"]);
        assert_eq!(s.tags.len(), 2);
        assert_ne!(s.tags[0].instance, s.tags[1].instance);
    }

    #[test]
    fn test_delete_by_suggestion_removes_first_chip_only() {
        let mut s = TagEditorState::default();
        s.drop(&ask_ai(), Point::default(), &FixedLayout::default().with_caret(Some(0)))
            .expect("first drop");
        let end = s.document.len();
        s.drop(&ask_ai(), Point::default(), &FixedLayout::default().with_caret(Some(end)))
            .expect("second drop");
        let second = s.document.chips().nth(1).map(|c| c.instance.clone()).expect("two chips");

        assert!(s.delete_tag(&TagRef::Suggestion("ask-ai".to_string())));

        assert_eq!(s.tags.len(), 1);
        let left: Vec<_> = s.document.chips().map(|c| c.instance.clone()).collect();
        assert_eq!(left, vec![second.clone()]);
        assert_eq!(s.tags[0].instance, second);
    }

    #[test]
    fn test_delete_by_instance() {
        let mut s = TagEditorState::with_initial_tags(
            TagEditorConfig::default(),
            &["input".to_string(), "perplexity".to_string()],
        );
        let rev = s.revision();
        let id = s.tags[0].instance.clone();

        assert!(s.delete_tag(&TagRef::Instance(id)));
        assert_eq!(chip_ids(&s), vec!["perplexity"]);
        assert_eq!(s.tags.len(), 1);
        assert!(s.revision() > rev);
    }

    #[test]
    fn test_delete_without_chip_updates_list_only() {
        let mut s = TagEditorState::with_initial_tags(TagEditorConfig::default(), &["input".to_string()]);
        // The chip was removed from the surface by hand but the list still has it.
        let doc = s.document.clone();
        s.document = Document::new();
        let rev = s.revision();

        assert!(s.delete_tag(&TagRef::Suggestion("input".to_string())));
        assert!(s.tags.is_empty());
        assert_eq!(s.revision(), rev);
        assert_ne!(doc, s.document);
    }

    #[test]
    fn test_delete_unknown_tag_is_noop() {
        let mut s = TagEditorState::default();
        assert!(!s.delete_tag(&TagRef::Suggestion("input".to_string())));
        assert!(!s.delete_tag(&TagRef::Instance(TagInstanceId::from("chip-0"))));
    }

    #[test]
    fn test_drag_over_shows_and_hides_hover_line() {
        let mut s = TagEditorState::default();
        // Lines at 100..120 and 130..150: gap midpoint 125, i.e. 25 relative.
        let mut layout = FixedLayout::lines(100.0, 20.0, &[0, 4]);
        layout.boxes[1].top = 130.0;
        layout.boxes[1].bottom = 150.0;

        let line = s.drag_over(Point::new(10.0, 127.0), &layout);
        assert_eq!(line, HoverLine::at(25.0));
        assert_eq!(s.hover_line, HoverLine { show: true, top: 25.0 });

        s.drag_over(Point::new(10.0, 140.0), &layout);
        assert!(!s.hover_line.show);
    }

    #[test]
    fn test_drag_leave_hides_hover_line() {
        let mut s = TagEditorState::default();
        s.hover_line = HoverLine::at(12.0);
        s.drag_leave();
        assert_eq!(s.hover_line, HoverLine::HIDDEN);
    }

    #[test]
    fn test_drop_on_hover_line_frames_chip_with_breaks() {
        let mut s = text_state("ab");
        // Children: "a" at position 0 (line 0..20), "b" at position 1 (line 30..50).
        let layout = FixedLayout {
            top: 0.0,
            boxes: vec![
                crate::geometry::NodeBox { position: 0, top: 0.0, bottom: 20.0 },
                crate::geometry::NodeBox { position: 1, top: 30.0, bottom: 50.0 },
            ],
            caret: Some(0),
        };
        s.drag_over(Point::new(0.0, 25.0), &layout);
        assert!(s.hover_line.show);

        s.drop(&ask_ai(), Point::new(0.0, 25.0), &layout).expect("drop should place");

        let segs = s.document.segments();
        assert_eq!(segs[0], Segment::text("a"));
        assert_eq!(segs[1], Segment::LineBreak);
        assert!(matches!(segs[2], Segment::Chip(_)));
        assert_eq!(segs[3], Segment::nbsp());
        assert_eq!(segs[4], Segment::LineBreak);
        assert_eq!(segs[5], Segment::text("b"));
        assert_eq!(s.caret, Some(4));
        assert_eq!(s.hover_line, HoverLine::HIDDEN);
    }

    #[test]
    fn test_hover_line_without_child_below_appends_by_default() {
        let mut s = text_state("ab");
        s.hover_line = HoverLine::at(500.0);
        let layout = FixedLayout::lines(0.0, 20.0, &[0]);

        s.drop(&ask_ai(), Point::default(), &layout).expect("appended");

        assert_eq!(s.document.segments().last(), Some(&Segment::LineBreak));
        assert_eq!(s.tags.len(), 1);
    }

    #[test]
    fn test_unresolved_caret_discard_mode() {
        let cfg = TagEditorConfig {
            unresolved_drop: UnresolvedDrop::Discard,
            ..Default::default()
        };
        let mut s = TagEditorState::new(cfg);
        s.show_suggestions = true;

        let err = s.drop(&ask_ai(), Point::default(), &FixedLayout::default()).unwrap_err();

        assert!(matches!(err, DropError::UnresolvedTarget));
        assert!(s.tags.is_empty());
        assert!(s.document.is_empty());
        assert!(!s.show_suggestions);
    }

    #[test]
    fn test_unresolved_caret_append_mode() {
        let mut s = text_state("ab");
        s.drop(&ask_ai(), Point::default(), &FixedLayout::default()).expect("appended");
        assert_eq!(chip_ids(&s), vec!["ask-ai"]);
        assert_eq!(s.caret, Some(s.document.len()));
    }

    #[test]
    fn test_internal_drop_moves_chip() {
        let mut s = TagEditorState::with_initial_tags(TagEditorConfig::default(), &["input".to_string()]);
        let end = s.document.len();
        s.document.insert(end, vec![Segment::text("xyz")]);
        let id = s.tags[0].instance.clone();
        let total = s.document.len();

        let out = s
            .drop(&internal(&id), Point::default(), &FixedLayout::default().with_caret(Some(total)))
            .expect("move");

        assert_eq!(out, DropOutcome::Moved(id.clone()));
        assert_eq!(s.document.chip_position(&id), Some(total - 1));
        assert_eq!(s.tags.len(), 1);
        assert_eq!(s.caret, Some(s.document.len()));
        assert_eq!(s.input_value, s.document.plain_text());
        assert_eq!(s.input_value, format!("{NBSP}xyz{NBSP}"));
    }

    #[test]
    fn test_internal_drop_without_caret_keeps_chip() {
        let mut s = TagEditorState::with_initial_tags(TagEditorConfig::default(), &["input".to_string()]);
        let before = s.document.clone();
        let id = s.tags[0].instance.clone();

        let err = s.drop(&internal(&id), Point::default(), &FixedLayout::default()).unwrap_err();

        assert!(matches!(err, DropError::UnresolvedTarget));
        assert_eq!(s.document, before);
    }

    #[test]
    fn test_internal_drop_for_missing_chip_is_noop() {
        let mut s = text_state("abc");
        s.show_suggestions = true;
        let before = s.document.clone();
        let rev = s.revision();

        let err = s
            .drop(
                &internal(&TagInstanceId::from("chip-gone")),
                Point::default(),
                &FixedLayout::default().with_caret(Some(1)),
            )
            .unwrap_err();

        assert!(matches!(err, DropError::UnknownChip(_)));
        assert_eq!(s.document, before);
        assert_eq!(s.revision(), rev);
        assert!(!s.show_suggestions);
    }

    #[test]
    fn test_malformed_payload_still_resets_ui() {
        let mut s = TagEditorState::default();
        s.show_suggestions = true;
        s.hover_line = HoverLine::at(10.0);

        let err = s
            .drop("not json", Point::default(), &FixedLayout::default().with_caret(Some(0)))
            .unwrap_err();

        assert!(matches!(err, DropError::Payload(PayloadError::Json(_))));
        assert!(!s.show_suggestions);
        assert_eq!(s.hover_line, HoverLine::HIDDEN);
        assert!(s.tags.is_empty());
    }

    #[test]
    fn test_enter_inserts_blank_line() {
        let mut s = text_state("ab");
        let caret = s.enter(1);
        assert_eq!(caret, 3);
        assert_eq!(s.caret, Some(3));
        assert_eq!(s.input_value, "a\n\nb");
        assert_eq!(
            &s.document.segments()[1..3],
            &[Segment::LineBreak, Segment::LineBreak]
        );
    }

    #[test]
    fn test_blur_inside_widget_keeps_panel() {
        let mut s = TagEditorState::default();
        s.reveal_suggestions();
        assert!(s.blur(true).is_none());
        assert!(s.show_suggestions);
    }

    #[test]
    fn test_deferred_hide_fires() {
        let mut s = TagEditorState::default();
        s.reveal_suggestions();
        let ticket = s.blur(false).expect("ticket");
        assert!(s.fire_blur_hide(ticket, false));
        assert!(!s.show_suggestions);
    }

    #[test]
    fn test_deferred_hide_respects_hover() {
        let mut s = TagEditorState::default();
        s.reveal_suggestions();
        let ticket = s.blur(false).expect("ticket");
        assert!(!s.fire_blur_hide(ticket, true));
        assert!(s.show_suggestions);
    }

    #[test]
    fn test_refocus_cancels_pending_hide() {
        let mut s = TagEditorState::default();
        s.reveal_suggestions();
        let ticket = s.blur(false).expect("ticket");
        s.reveal_suggestions();
        assert!(!s.fire_blur_hide(ticket, false));
        assert!(s.show_suggestions);
    }

    #[test]
    fn test_sync_from_surface_drops_vanished_chips() {
        let mut s = TagEditorState::with_initial_tags(
            TagEditorConfig::default(),
            &["input".to_string(), "ask-ai".to_string()],
        );
        let kept: Vec<Segment> = s
            .document
            .segments()
            .iter()
            .filter(|seg| !matches!(seg, Segment::Chip(c) if c.suggestion_id == "input"))
            .cloned()
            .collect();
        let rev = s.revision();

        s.sync_from_surface(Document::from_segments(kept), Some(1));

        assert_eq!(s.tags.len(), 1);
        assert_eq!(s.tags[0].suggestion_id, "ask-ai");
        assert_eq!(s.caret, Some(1));
        assert_eq!(s.revision(), rev);
    }

    #[test]
    fn test_sync_from_surface_lists_pasted_chips() {
        let mut s = TagEditorState::with_initial_tags(TagEditorConfig::default(), &["input".to_string()]);
        let original = s.document.chips().next().cloned().expect("seeded chip");
        let foreign = Chip::place(&Suggestion::new("perplexity", "Perplexity", "🔄"));
        let rev = s.revision();

        s.sync_from_surface(
            Document::from_segments(vec![
                Segment::Chip(original.clone()),
                Segment::nbsp(),
                Segment::Chip(original.clone()),
                Segment::Chip(foreign.clone()),
            ]),
            None,
        );

        let chips: Vec<Chip> = s.document.chips().cloned().collect();
        assert_eq!(chips.len(), 3);
        assert_eq!(s.tags.len(), 3);
        for (tag, chip) in s.tags.iter().zip(&chips) {
            assert_eq!(tag.instance, chip.instance);
        }
        assert_eq!(chips[0].instance, original.instance);
        assert_ne!(chips[1].instance, original.instance);
        assert_eq!(chips[2].instance, foreign.instance);
        assert_eq!(s.revision(), rev + 1);
    }

    #[test]
    fn test_initial_tags_skip_unknown_ids() {
        let s = TagEditorState::with_initial_tags(
            TagEditorConfig::default(),
            &["ask-ai".to_string(), "nope".to_string(), "perplexity".to_string()],
        );
        assert_eq!(chip_ids(&s), vec!["ask-ai", "perplexity"]);
        assert_eq!(s.document.len(), 4);
        assert!(s.caret.is_none());
    }
}
