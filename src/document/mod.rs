//! Ordered segment model of the editable surface.
//!
//! Positions are flat unit offsets: every char of a text run counts one unit,
//! every line break and every chip counts one unit. A caret is a position in
//! `0..=len()`. Because merging two adjacent text runs does not change any
//! position, edits can normalize freely without invalidating carets.

use std::collections::HashSet;

use crate::models::{Chip, TagInstanceId};
use crate::util::char_idx_to_byte_idx;

pub const NBSP: char = '\u{00A0}';

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    LineBreak,
    Chip(Chip),
}

impl Segment {
    pub fn text(s: &str) -> Self {
        Self::Text(s.to_string())
    }

    pub fn nbsp() -> Self {
        Self::Text(NBSP.to_string())
    }

    pub fn units(&self) -> usize {
        match self {
            Self::Text(t) => t.chars().count(),
            Self::LineBreak | Self::Chip(_) => 1,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Document {
    segments: Vec<Segment>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<Segment>) -> Self {
        let mut doc = Self { segments };
        doc.normalize();
        doc
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.iter().map(Segment::units).sum()
    }

    pub fn chips(&self) -> impl Iterator<Item = &Chip> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Chip(c) => Some(c),
            _ => None,
        })
    }

    /// Position where segment `index` starts; `segments().len()` maps to the end.
    pub fn segment_start(&self, index: usize) -> usize {
        self.segments.iter().take(index).map(Segment::units).sum()
    }

    pub fn chip_position(&self, id: &TagInstanceId) -> Option<usize> {
        let idx = self
            .segments
            .iter()
            .position(|s| matches!(s, Segment::Chip(c) if &c.instance == id))?;
        Some(self.segment_start(idx))
    }

    /// First chip in document order created from `suggestion_id`.
    pub fn first_chip_for(&self, suggestion_id: &str) -> Option<&Chip> {
        self.chips().find(|c| c.suggestion_id == suggestion_id)
    }

    /// Free text of the document: text runs and line breaks, chips left out.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for s in &self.segments {
            match s {
                Segment::Text(t) => out.push_str(t),
                Segment::LineBreak => out.push('\n'),
                Segment::Chip(_) => {}
            }
        }
        out
    }

    /// Insert `items` at `pos` (clamped to the end). Returns the caret right
    /// after the inserted items.
    pub fn insert(&mut self, pos: usize, items: Vec<Segment>) -> usize {
        let pos = pos.min(self.len());
        let added: usize = items.iter().map(Segment::units).sum();
        let idx = self.split_at(pos);
        self.segments.splice(idx..idx, items);
        self.normalize();
        pos + added
    }

    /// Two line breaks at `pos`, which renders as a blank line between paragraphs.
    pub fn insert_paragraph_break(&mut self, pos: usize) -> usize {
        self.insert(pos, vec![Segment::LineBreak, Segment::LineBreak])
    }

    /// Remove a chip, returning it together with the position it occupied.
    pub fn remove_chip(&mut self, id: &TagInstanceId) -> Option<(usize, Chip)> {
        let idx = self
            .segments
            .iter()
            .position(|s| matches!(s, Segment::Chip(c) if &c.instance == id))?;
        let pos = self.segment_start(idx);
        let Segment::Chip(chip) = self.segments.remove(idx) else {
            return None;
        };
        self.normalize();
        Some((pos, chip))
    }

    /// Detach a chip and reinsert it at `pos` (measured before the detach),
    /// followed by one NBSP. Returns the caret after the NBSP.
    ///
    /// Dropping a chip onto itself leaves the document alone when its NBSP is
    /// already there.
    pub fn move_chip(&mut self, id: &TagInstanceId, pos: usize) -> Option<usize> {
        let idx = self
            .segments
            .iter()
            .position(|s| matches!(s, Segment::Chip(c) if &c.instance == id))?;
        let at = self.segment_start(idx);
        let followed_by_nbsp = matches!(
            self.segments.get(idx + 1),
            Some(Segment::Text(t)) if t.starts_with(NBSP)
        );
        if (pos == at || pos == at + 1) && followed_by_nbsp {
            return Some(at + 2);
        }

        let (from, chip) = self.remove_chip(id)?;
        let target = if pos > from { pos - 1 } else { pos };
        Some(self.insert(target, vec![Segment::Chip(chip), Segment::nbsp()]))
    }

    /// Give every repeated chip instance (a pasted or duplicated chip) a fresh
    /// id. Returns whether any chip was re-minted.
    pub fn remint_duplicate_chips(&mut self) -> bool {
        let mut seen = HashSet::new();
        let mut changed = false;
        for seg in &mut self.segments {
            if let Segment::Chip(chip) = seg {
                if !seen.insert(chip.instance.clone()) {
                    chip.instance = TagInstanceId::mint();
                    seen.insert(chip.instance.clone());
                    changed = true;
                }
            }
        }
        changed
    }

    /// Make sure a segment boundary exists at `pos`; returns the index of the
    /// segment that starts there.
    fn split_at(&mut self, pos: usize) -> usize {
        let mut start = 0;
        for i in 0..self.segments.len() {
            if pos == start {
                return i;
            }
            let units = self.segments[i].units();
            if pos < start + units {
                // Only text runs span more than one unit.
                if let Segment::Text(t) = &mut self.segments[i] {
                    let at = char_idx_to_byte_idx(t, pos - start);
                    let tail = t.split_off(at);
                    self.segments.insert(i + 1, Segment::Text(tail));
                }
                return i + 1;
            }
            start += units;
        }
        self.segments.len()
    }

    fn normalize(&mut self) {
        let mut out: Vec<Segment> = Vec::with_capacity(self.segments.len());
        for seg in self.segments.drain(..) {
            match seg {
                Segment::Text(t) if t.is_empty() => {}
                Segment::Text(t) => {
                    if let Some(Segment::Text(prev)) = out.last_mut() {
                        prev.push_str(&t);
                    } else {
                        out.push(Segment::Text(t));
                    }
                }
                other => out.push(other),
            }
        }
        self.segments = out;
    }
}
