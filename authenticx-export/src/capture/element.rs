//! Retained element tree for render surfaces.
//!
//! Elements flow top to bottom inside column blocks and left to right inside
//! row blocks. Sizes are CSS pixels; computed styles are plain strings.

use image::RgbaImage;
use std::collections::BTreeMap;
use std::sync::Arc;

pub type ElementId = u32;

/// Child arrangement inside a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    #[default]
    Column,
    Row,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Block(Flow),
    Text(String),
    /// A drawing surface whose pixels only exist in the live tree.
    Canvas(Arc<RgbaImage>),
    Image(Arc<RgbaImage>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub id: ElementId,
    /// Region identifier, like an HTML `id` attribute.
    pub name: Option<String>,
    pub kind: ElementKind,
    pub style: BTreeMap<String, String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub padding: u32,
    /// `Some(expanded)` for collapsible containers.
    pub expanded: Option<bool>,
    pub children: Vec<Element>,
}

impl Element {
    fn with_kind(kind: ElementKind) -> Self {
        Self {
            id: 0,
            name: None,
            kind,
            style: BTreeMap::new(),
            width: None,
            height: None,
            padding: 0,
            expanded: None,
            children: Vec::new(),
        }
    }

    pub fn block() -> Self {
        Self::with_kind(ElementKind::Block(Flow::Column))
    }

    pub fn row() -> Self {
        Self::with_kind(ElementKind::Block(Flow::Row))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::with_kind(ElementKind::Text(text.into()))
    }

    /// A canvas sized to its bitmap.
    pub fn canvas(bitmap: RgbaImage) -> Self {
        let (w, h) = bitmap.dimensions();
        Self::with_kind(ElementKind::Canvas(Arc::new(bitmap))).size(w, h)
    }

    pub fn image(image: Arc<RgbaImage>) -> Self {
        Self::with_kind(ElementKind::Image(image))
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.style.insert(property.into(), value.into());
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }

    pub fn collapsible(mut self, expanded: bool) -> Self {
        self.expanded = Some(expanded);
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    /// Children that take part in rendering.
    pub fn visible_children(&self) -> &[Element] {
        match self.expanded {
            Some(false) => &[],
            _ => &self.children,
        }
    }

    /// Number ids depth-first starting at `next`; returns the next free id.
    pub fn assign_ids(&mut self, next: ElementId) -> ElementId {
        self.id = next;
        let mut next = next + 1;
        for child in &mut self.children {
            next = child.assign_ids(next);
        }
        next
    }

    /// Depth-first, pre-order walk including `self`.
    pub fn descendants(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(el) = stack.pop() {
            out.push(el);
            stack.extend(el.children.iter().rev());
        }
        out
    }

    pub fn find(&self, id: ElementId) -> Option<&Element> {
        self.descendants().into_iter().find(|e| e.id == id)
    }

    pub fn find_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    pub fn find_named(&self, name: &str) -> Option<&Element> {
        self.descendants()
            .into_iter()
            .find(|e| e.name.as_deref() == Some(name))
    }

    /// Apply `f` to this element and every descendant.
    pub fn visit_mut(&mut self, f: &mut impl FnMut(&mut Element)) {
        f(self);
        for child in &mut self.children {
            child.visit_mut(f);
        }
    }
}
