//! Bridge between the segment model and the contenteditable surface.
//!
//! `render` is the only place that builds surface nodes; `read_back` and
//! `dom_position` walk the surface the same way, so positions computed from the
//! DOM always agree with the model.

use crate::document::{Document, Segment};
use crate::geometry::{NodeBox, Point, PositionResolver};
use crate::models::{Chip, TagInstanceId};
use crate::util::{char_idx_to_utf16, utf16_to_char_idx};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, Node};

pub(crate) const CHIP_ID_ATTR: &str = "data-tag-id";
const CHIP_SUGGESTION_ATTR: &str = "data-suggestion-id";
const CHIP_LABEL_ATTR: &str = "data-label";
const CHIP_ICON_ATTR: &str = "data-icon";
pub(crate) const CHIP_SELECTOR: &str = "[data-tag-id]";

const CHIP_CLASS: &str = "tag inline-flex items-center gap-1 rounded-md border border-border bg-muted px-1.5 py-0.5 mx-0.5 text-sm align-baseline cursor-grab select-none";

const BLOCK_TAGS: [&str; 3] = ["DIV", "P", "LI"];

fn document() -> Option<web_sys::Document> {
    web_sys::window().and_then(|w| w.document())
}

fn chip_node(doc: &web_sys::Document, chip: &Chip) -> Result<Element, JsValue> {
    let el = doc.create_element("span")?;
    el.set_class_name(CHIP_CLASS);
    el.set_attribute(CHIP_ID_ATTR, chip.instance.as_str())?;
    el.set_attribute(CHIP_SUGGESTION_ATTR, &chip.suggestion_id)?;
    el.set_attribute(CHIP_LABEL_ATTR, &chip.label)?;
    el.set_attribute(CHIP_ICON_ATTR, &chip.icon)?;
    el.set_attribute("contenteditable", "false")?;
    el.set_attribute("draggable", "true")?;

    let icon = doc.create_element("span")?;
    icon.set_class_name("tag-icon");
    icon.set_text_content(Some(&chip.icon));
    let label = doc.create_element("span")?;
    label.set_class_name("tag-label");
    label.set_text_content(Some(&chip.label));

    el.append_child(&icon)?;
    el.append_child(&label)?;
    Ok(el)
}

fn chip_from_element(el: &Element) -> Option<Chip> {
    let instance = el.get_attribute(CHIP_ID_ATTR)?;
    Some(Chip {
        instance: TagInstanceId::from(instance.as_str()),
        suggestion_id: el.get_attribute(CHIP_SUGGESTION_ATTR).unwrap_or_default(),
        label: el.get_attribute(CHIP_LABEL_ATTR).unwrap_or_default(),
        icon: el.get_attribute(CHIP_ICON_ATTR).unwrap_or_default(),
    })
}

/// Replace the surface's children with the nodes of `doc`, one child per segment.
pub(crate) fn render(surface: &Element, doc: &Document) -> Result<(), JsValue> {
    let Some(dom) = document() else {
        return Ok(());
    };

    surface.set_text_content(None);
    for seg in doc.segments() {
        let node: Node = match seg {
            Segment::Text(t) => dom.create_text_node(t).into(),
            Segment::LineBreak => dom.create_element("br")?.into(),
            Segment::Chip(chip) => chip_node(&dom, chip)?.into(),
        };
        surface.append_child(&node)?;
    }
    Ok(())
}

/// Walks the surface in document order, collecting segments and optionally
/// resolving a DOM caret (node, UTF-16 offset) to a document position.
struct Scan<'a> {
    target: Option<(&'a Node, u32)>,
    segments: Vec<Segment>,
    pos: usize,
    found: Option<usize>,
}

impl<'a> Scan<'a> {
    fn new(target: Option<(&'a Node, u32)>) -> Self {
        Self {
            target,
            segments: vec![],
            pos: 0,
            found: None,
        }
    }

    fn is_target(&self, node: &Node) -> bool {
        self.target.is_some_and(|(t, _)| t.is_same_node(Some(node)))
    }

    fn push(&mut self, seg: Segment) {
        self.pos += seg.units();
        self.segments.push(seg);
    }

    fn children(&mut self, parent: &Node) {
        let children = parent.child_nodes();
        let len = children.length();
        let parent_is_target = self.is_target(parent);
        for i in 0..len {
            if parent_is_target && self.found.is_none() && self.target.is_some_and(|(_, off)| off == i) {
                self.found = Some(self.pos);
            }
            if let Some(child) = children.item(i) {
                self.node(&child);
            }
        }
        if parent_is_target && self.found.is_none() {
            self.found = Some(self.pos);
        }
    }

    fn node(&mut self, node: &Node) {
        match node.node_type() {
            Node::TEXT_NODE => {
                let text = node.node_value().unwrap_or_default();
                if self.found.is_none() {
                    if let Some((t, off)) = self.target {
                        if t.is_same_node(Some(node)) {
                            self.found = Some(self.pos + utf16_to_char_idx(&text, off));
                        }
                    }
                }
                self.push(Segment::Text(text));
            }
            Node::ELEMENT_NODE => {
                let el: &Element = node.unchecked_ref();
                if let Some(chip) = chip_from_element(el) {
                    // A caret inside a chip resolves to just before it.
                    if self.found.is_none() && self.target.is_some_and(|(t, _)| node.contains(Some(t))) {
                        self.found = Some(self.pos);
                    }
                    self.push(Segment::Chip(chip));
                } else if el.tag_name().eq_ignore_ascii_case("br") {
                    if self.found.is_none() && self.is_target(node) {
                        self.found = Some(self.pos);
                    }
                    self.push(Segment::LineBreak);
                } else {
                    // Some browsers wrap typed lines in block elements.
                    let tag = el.tag_name().to_ascii_uppercase();
                    let starts_line = BLOCK_TAGS.contains(&tag.as_str())
                        && !self.segments.is_empty()
                        && !matches!(self.segments.last(), Some(Segment::LineBreak));
                    if starts_line {
                        self.push(Segment::LineBreak);
                    }
                    self.children(node);
                }
            }
            _ => {}
        }
    }
}

/// Rebuild the model from whatever the surface currently shows.
pub(crate) fn read_back(surface: &Element) -> Document {
    let mut scan = Scan::new(None);
    scan.children(surface);
    Document::from_segments(scan.segments)
}

/// Document position of a DOM caret inside the surface.
pub(crate) fn dom_position(surface: &Element, node: &Node, offset: u32) -> Option<usize> {
    if !surface.contains(Some(node)) {
        return None;
    }
    let mut scan = Scan::new(Some((node, offset)));
    scan.children(surface);
    scan.found
}

/// Document position of the current selection's anchor, if it is in the surface.
pub(crate) fn selection_position(surface: &Element) -> Option<usize> {
    let selection = web_sys::window()?.get_selection().ok().flatten()?;
    let node = selection.anchor_node()?;
    dom_position(surface, &node, selection.anchor_offset())
}

/// Put a collapsed selection at `pos`. Expects a freshly rendered surface
/// (one child per segment).
pub(crate) fn place_caret(surface: &Element, pos: usize) -> Option<()> {
    let dom = document()?;
    let children = surface.child_nodes();
    let mut start = 0;
    let mut at: Option<(Node, u32)> = None;

    for i in 0..children.length() {
        let child = children.item(i)?;
        if child.node_type() == Node::TEXT_NODE {
            let text = child.node_value().unwrap_or_default();
            let len = text.chars().count();
            if pos <= start + len {
                let off = char_idx_to_utf16(&text, pos - start);
                at = Some((child, off));
                break;
            }
            start += len;
        } else {
            if pos == start {
                at = Some((surface.clone().into(), i));
                break;
            }
            start += 1;
        }
    }
    let (node, offset) = at.unwrap_or_else(|| (surface.clone().into(), children.length()));

    let range = dom.create_range().ok()?;
    range.set_start(&node, offset).ok()?;
    range.collapse_with_to_start(true);
    let selection = web_sys::window()?.get_selection().ok().flatten()?;
    selection.remove_all_ranges().ok()?;
    selection.add_range(&range).ok()
}

/// `caretRangeFromPoint` where available, `caretPositionFromPoint` otherwise.
fn caret_from_point(x: f64, y: f64) -> Option<(Node, u32)> {
    let dom = document()?;
    let dom: &JsValue = dom.as_ref();

    let call = |name: &str| -> Option<JsValue> {
        let f = js_sys::Reflect::get(dom, &name.into()).ok()?;
        let f = f.dyn_ref::<js_sys::Function>()?;
        let out = f.call2(dom, &x.into(), &y.into()).ok()?;
        (!out.is_null() && !out.is_undefined()).then_some(out)
    };

    if let Some(range) = call("caretRangeFromPoint") {
        let range: web_sys::Range = range.dyn_into().ok()?;
        return Some((range.start_container().ok()?, range.start_offset().ok()?));
    }

    let pos = call("caretPositionFromPoint")?;
    let node: Node = js_sys::Reflect::get(&pos, &"offsetNode".into())
        .ok()?
        .dyn_into()
        .ok()?;
    let offset = js_sys::Reflect::get(&pos, &"offset".into()).ok()?.as_f64()?;
    Some((node, offset as u32))
}

/// Live layout of a mounted surface.
pub(crate) struct DomLayout {
    surface: Element,
}

impl DomLayout {
    pub(crate) fn new(surface: Element) -> Self {
        Self { surface }
    }
}

impl PositionResolver for DomLayout {
    fn surface_top(&self) -> f64 {
        self.surface.get_bounding_client_rect().top()
    }

    fn node_boxes(&self) -> Vec<NodeBox> {
        let Some(dom) = document() else {
            return vec![];
        };
        let surface_node: &Node = self.surface.as_ref();
        let children = self.surface.child_nodes();

        (0..children.length())
            .filter_map(|i| {
                let child = children.item(i)?;
                let range = dom.create_range().ok()?;
                range.select_node(&child).ok()?;
                let rect = range.get_bounding_client_rect();
                let position = dom_position(&self.surface, surface_node, i)?;
                Some(NodeBox {
                    position,
                    top: rect.top(),
                    bottom: rect.bottom(),
                })
            })
            .collect()
    }

    fn caret_at(&self, point: Point) -> Option<usize> {
        let (node, offset) = caret_from_point(point.x, point.y)?;
        dom_position(&self.surface, &node, offset)
    }
}
