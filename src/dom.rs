//! Minimal element tree used by the views.
//!
//! Elements live in an arena addressed by [`ElementId`]. The tree can be
//! rendered to HTML on the server and cloned to stand in for the markup a
//! client receives; hydration then looks elements up by class instead of
//! creating them. [`Dom::created_count`] counts every element construction,
//! which is how hydration is verified not to build new nodes.

use crate::error::HydrateError;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

/// Handle of an element in a [`Dom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u32);

#[derive(Debug, Clone)]
struct Element {
    tag: String,
    classes: Vec<String>,
    attrs: BTreeMap<String, String>,
    text: String,
    children: Vec<ElementId>,
    parent: Option<ElementId>,
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            classes: Vec::new(),
            attrs: BTreeMap::new(),
            text: String::new(),
            children: Vec::new(),
            parent: None,
        }
    }
}

/// Arena of elements with one `body` root.
#[derive(Debug, Clone)]
pub struct Dom {
    elements: HashMap<ElementId, Element>,
    root: ElementId,
    next_id: u32,
    created: usize,
    scrolled_into_view: Option<ElementId>,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    pub fn new() -> Self {
        let root = ElementId(0);
        let mut elements = HashMap::new();
        elements.insert(root, Element::new("body"));
        Self {
            elements,
            root,
            next_id: 1,
            created: 0,
            scrolled_into_view: None,
        }
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    /// Create a detached element, optionally with one class.
    pub fn create(&mut self, tag: &str, class: Option<&str>) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.created += 1;
        let mut element = Element::new(tag);
        if let Some(class) = class {
            element.classes.push(class.to_string());
        }
        self.elements.insert(id, element);
        id
    }

    /// Number of elements created since construction or the last reset.
    pub fn created_count(&self) -> usize {
        self.created
    }

    pub fn reset_created_count(&mut self) {
        self.created = 0;
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    /// Number of live elements, root included.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn tag(&self, id: ElementId) -> Option<&str> {
        self.elements.get(&id).map(|e| e.tag.as_str())
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.elements.get(&id).and_then(|e| e.parent)
    }

    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.elements.get(&id).map(|e| e.children.as_slice()).unwrap_or(&[])
    }

    /// Append `child` as last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: ElementId, child: ElementId) {
        self.insert_child(parent, child, None);
    }

    /// Insert `child` before `reference` (or append when `reference` is not a child of `parent`).
    pub fn insert_before(&mut self, parent: ElementId, child: ElementId, reference: ElementId) {
        self.insert_child(parent, child, Some(reference));
    }

    fn insert_child(&mut self, parent: ElementId, child: ElementId, reference: Option<ElementId>) {
        if parent == child || !self.contains(parent) || !self.contains(child) {
            return;
        }
        self.detach(child);
        if let Some(p) = self.elements.get_mut(&parent) {
            let index = reference
                .and_then(|r| p.children.iter().position(|c| *c == r))
                .unwrap_or(p.children.len());
            p.children.insert(index, child);
        }
        if let Some(c) = self.elements.get_mut(&child) {
            c.parent = Some(parent);
        }
    }

    fn detach(&mut self, id: ElementId) {
        let parent = self.elements.get_mut(&id).and_then(|e| e.parent.take());
        if let Some(parent) = parent {
            if let Some(p) = self.elements.get_mut(&parent) {
                p.children.retain(|c| *c != id);
            }
        }
    }

    /// Detach `id` and drop it with its whole subtree. The root cannot be removed.
    pub fn remove_node(&mut self, id: ElementId) {
        if id == self.root || !self.contains(id) {
            return;
        }
        self.detach(id);
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(element) = self.elements.remove(&next) {
                stack.extend(element.children);
            }
            if self.scrolled_into_view == Some(next) {
                self.scrolled_into_view = None;
            }
        }
    }

    // ------------------------------------------------------------------------
    // Classes and attributes
    // ------------------------------------------------------------------------

    pub fn has_class(&self, id: ElementId, class: &str) -> bool {
        self.elements
            .get(&id)
            .is_some_and(|e| e.classes.iter().any(|c| c == class))
    }

    pub fn add_class(&mut self, id: ElementId, class: &str) {
        self.toggle_class(id, class, true);
    }

    pub fn toggle_class(&mut self, id: ElementId, class: &str, on: bool) {
        if let Some(e) = self.elements.get_mut(&id) {
            let present = e.classes.iter().any(|c| c == class);
            if on && !present {
                e.classes.push(class.to_string());
            } else if !on && present {
                e.classes.retain(|c| c != class);
            }
        }
    }

    pub fn attr(&self, id: ElementId, name: &str) -> Option<&str> {
        self.elements
            .get(&id)
            .and_then(|e| e.attrs.get(name))
            .map(String::as_str)
    }

    pub fn set_attr(&mut self, id: ElementId, name: &str, value: impl Into<String>) {
        if let Some(e) = self.elements.get_mut(&id) {
            e.attrs.insert(name.to_string(), value.into());
        }
    }

    pub fn remove_attr(&mut self, id: ElementId, name: &str) {
        if let Some(e) = self.elements.get_mut(&id) {
            e.attrs.remove(name);
        }
    }

    // ------------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------------

    /// Text content of `id` and its descendants.
    pub fn text(&self, id: ElementId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: ElementId, out: &mut String) {
        if let Some(e) = self.elements.get(&id) {
            out.push_str(&e.text);
            for child in &e.children {
                self.collect_text(*child, out);
            }
        }
    }

    /// Replace the content of `id` with `text`, dropping its children.
    pub fn set_text(&mut self, id: ElementId, text: impl Into<String>) {
        let children = match self.elements.get_mut(&id) {
            Some(e) => {
                e.text = text.into();
                std::mem::take(&mut e.children)
            }
            None => return,
        };
        for child in children {
            if let Some(c) = self.elements.get_mut(&child) {
                c.parent = None;
            }
            self.remove_node(child);
        }
    }

    // ------------------------------------------------------------------------
    // Selection (`> .class` relative to a parent)
    // ------------------------------------------------------------------------

    /// First direct child of `parent` carrying `class`.
    pub fn select_child(&self, parent: ElementId, class: &str) -> Option<ElementId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|c| self.has_class(*c, class))
    }

    /// All direct children of `parent` carrying `class`, in document order.
    pub fn select_children(&self, parent: ElementId, class: &str) -> Vec<ElementId> {
        self.children(parent)
            .iter()
            .copied()
            .filter(|c| self.has_class(*c, class))
            .collect()
    }

    /// Follow `> .a > .b > ...` from `parent`.
    pub fn select_path(&self, parent: ElementId, classes: &[&str]) -> Option<ElementId> {
        classes
            .iter()
            .try_fold(parent, |current, class| self.select_child(current, class))
    }

    /// Like [`Dom::select_path`] but reports the selector on failure.
    pub fn assert_path(&self, parent: ElementId, classes: &[&str]) -> Result<ElementId, HydrateError> {
        self.select_path(parent, classes)
            .ok_or_else(|| HydrateError::MissingElement {
                selector: classes
                    .iter()
                    .map(|c| format!("> .{c}"))
                    .collect::<Vec<_>>()
                    .join(" "),
            })
    }

    // ------------------------------------------------------------------------
    // Scrolling and rendering
    // ------------------------------------------------------------------------

    pub fn scroll_into_view(&mut self, id: ElementId) {
        if self.contains(id) {
            self.scrolled_into_view = Some(id);
        }
    }

    pub fn scrolled_into_view(&self) -> Option<ElementId> {
        self.scrolled_into_view
    }

    /// Serialize the subtree at `id` to HTML.
    pub fn to_html(&self, id: ElementId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    fn write_html(&self, id: ElementId, out: &mut String) {
        let Some(e) = self.elements.get(&id) else {
            return;
        };
        let _ = write!(out, "<{}", e.tag);
        if !e.classes.is_empty() {
            let _ = write!(out, " class=\"{}\"", escape(&e.classes.join(" ")));
        }
        for (name, value) in &e.attrs {
            let _ = write!(out, " {}=\"{}\"", name, escape(value));
        }
        out.push('>');
        out.push_str(&escape(&e.text).replace('\n', "<br/>"));
        for child in &e.children {
            self.write_html(*child, out);
        }
        let _ = write!(out, "</{}>", e.tag);
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
