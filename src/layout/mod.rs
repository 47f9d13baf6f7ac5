//! # Page-Aware Record Layout
//!
//! Lays a [`FormRecord`] out INTO fixed-size pages. There is no infinite
//! canvas that gets sliced afterwards: every block asks the page flow for
//! room before it is placed, and the flow opens a new page when it has none.
//!
//! ## Two passes
//!
//! 1. **Draft.** [`compose::DocumentComposer`] walks the sections in their
//!    fixed order and produces body content for as many pages as it needs.
//!    Each page gets a minimal header (band and title only), because the
//!    total page count is not known yet.
//! 2. **Finalize.** [`finalize::finalize`] revisits every page, clears the
//!    header band and stamps the full header and footer with
//!    "Página i de N". It only ever replaces a page's `header` and `footer`
//!    lists; body elements are never touched.
//!
//! Geometry is in millimetres with a top-left origin and y growing down.
//! Text elements are positioned by baseline.

pub mod compose;
pub mod finalize;
pub mod page_break;
pub mod primitives;

use crate::error::RncError;
use crate::font::StandardFont;
use crate::image_loader::LoadedImage;
use crate::model::{FormRecord, Orientation};
use crate::style::{Color, LayoutConfig, PageGeometry};

use compose::DocumentComposer;
use finalize::DocumentStamp;

/// One finished page. Drawn in order: body, header, footer.
#[derive(Debug, Clone)]
pub struct LayoutPage {
    pub width: f64,
    pub height: f64,
    pub elements: Vec<LayoutElement>,
    pub header: Vec<LayoutElement>,
    pub footer: Vec<LayoutElement>,
}

impl LayoutPage {
    pub fn new(geometry: &PageGeometry) -> Self {
        Self {
            width: geometry.width,
            height: geometry.height,
            elements: Vec::new(),
            header: Vec::new(),
            footer: Vec::new(),
        }
    }

    /// Every element on the page in paint order.
    pub fn draw_order(&self) -> impl Iterator<Item = &LayoutElement> {
        self.elements
            .iter()
            .chain(self.header.iter())
            .chain(self.footer.iter())
    }

    /// Body elements tagged with `node_type`.
    pub fn find<'a>(&'a self, node_type: &'a str) -> impl Iterator<Item = &'a LayoutElement> {
        self.elements
            .iter()
            .filter(move |e| e.node_type == Some(node_type))
    }
}

/// A positioned element on a page.
#[derive(Debug, Clone)]
pub struct LayoutElement {
    /// Top-left corner. For text, `y` is the first baseline.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub draw: DrawCommand,
    /// Logical kind (e.g. "Checkbox", "TableRow") for inspection and tests.
    pub node_type: Option<&'static str>,
}

impl LayoutElement {
    pub fn new(x: f64, y: f64, width: f64, height: f64, draw: DrawCommand) -> Self {
        Self {
            x,
            y,
            width,
            height,
            draw,
            node_type: None,
        }
    }

    pub fn tagged(mut self, node_type: &'static str) -> Self {
        self.node_type = Some(node_type);
        self
    }

    /// Concatenated text of a text element, lines joined by '\n'.
    pub fn text(&self) -> Option<String> {
        match &self.draw {
            DrawCommand::Text { lines, .. } => Some(
                lines
                    .iter()
                    .map(|l| l.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            _ => None,
        }
    }
}

/// Stroke colour and width (mm).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
}

impl Stroke {
    pub fn new(color: Color, width: f64) -> Self {
        Self { color, width }
    }
}

/// What to actually draw for an element.
#[derive(Debug, Clone)]
pub enum DrawCommand {
    /// Filled and/or outlined rectangle covering the element box.
    Rect {
        background: Option<Color>,
        border: Option<Stroke>,
    },
    /// Straight line from `(x, y)` to `(x + width, y + height)`.
    Line { stroke: Stroke },
    Text {
        lines: Vec<TextLine>,
        font: StandardFont,
        font_size: f64,
        color: Color,
    },
    /// The selection glyph. Checked boxes are filled and carry a tick mark.
    Checkbox {
        checked: bool,
        fill: Color,
        mark: Color,
        border: Stroke,
    },
    /// A raster stretched over the element box.
    Image {
        image_data: LoadedImage,
        border: Option<Stroke>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub x: f64,
    /// Baseline.
    pub y: f64,
    pub text: String,
}

/// Where the next block goes: vertical offset on a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutCursor {
    pub y: f64,
    pub page_index: usize,
}

impl LayoutCursor {
    /// The same position moved down by `dy`.
    pub fn advance(self, dy: f64) -> Self {
        Self {
            y: self.y + dy,
            ..self
        }
    }
}

/// Runs both layout passes for one record.
pub struct LayoutEngine<'a> {
    config: &'a LayoutConfig,
}

impl<'a> LayoutEngine<'a> {
    pub fn new(config: &'a LayoutConfig) -> Self {
        Self { config }
    }

    /// Draft-compose the record, then stamp headers and footers.
    pub fn layout(
        &self,
        record: &FormRecord,
        orientation: Orientation,
        stamp: &DocumentStamp,
    ) -> Result<Vec<LayoutPage>, RncError> {
        let mut pages = DocumentComposer::new(record, self.config, orientation).compose()?;
        log::debug!("Draft pass produced {} page(s)", pages.len());
        finalize::finalize(&mut pages, self.config, stamp);
        Ok(pages)
    }
}
