//! # Layout Configuration
//!
//! Every geometry and colour constant the composer uses lives in one
//! immutable [`LayoutConfig`] value that is passed in at call time. The
//! defaults reproduce the corporate RNC layout; tests substitute alternate
//! geometries (tiny pages, different split thresholds) to hit overflow edge
//! cases deterministically.
//!
//! Lengths are millimetres, font sizes are points.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RncError;
use crate::model::Orientation;

/// An RGBA color.
///
/// Config files may write it as `"#RRGGBB"`, `"#RGB"` or as an `{r, g, b, a}`
/// object with channels in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ColorRepr")]
pub struct Color {
    pub r: f64, // 0.0 - 1.0
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Hex(String),
    Channels {
        r: f64,
        g: f64,
        b: f64,
        #[serde(default = "opaque")]
        a: f64,
    },
}

fn opaque() -> f64 {
    1.0
}

impl TryFrom<ColorRepr> for Color {
    type Error = String;

    fn try_from(repr: ColorRepr) -> Result<Self, Self::Error> {
        match repr {
            ColorRepr::Hex(hex) => Color::hex(&hex),
            ColorRepr::Channels { r, g, b, a } => Ok(Color { r, g, b, a }),
        }
    }
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };

    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Build from 8-bit channels.
    pub fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
            a: 1.0,
        }
    }

    /// Parse `#RRGGBB` or `#RGB`; the `#` is optional.
    pub fn hex(hex: &str) -> Result<Self, String> {
        let digits = hex.trim_start_matches('#');
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("invalid hex colour '{hex}'"));
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|e| format!("'{hex}': {e}"));
        match digits.len() {
            3 => Ok(Self::rgb8(
                channel(&digits[0..1].repeat(2))?,
                channel(&digits[1..2].repeat(2))?,
                channel(&digits[2..3].repeat(2))?,
            )),
            6 => Ok(Self::rgb8(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            )),
            _ => Err(format!("hex colour '{hex}' must have 3 or 6 digits")),
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

/// Page margins in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Edges {
    pub fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }
}

/// Corporate colour scheme.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Palette {
    /// Banners, stripes, labels.
    pub primary: Color,
    /// Rules, borders, placeholder lines.
    pub secondary: Color,
    /// Light fills: header band, zebra rows, signature panels.
    pub tertiary: Color,
    /// Very light fill behind the info/classification panels.
    pub panel: Color,
    pub text: Color,
    pub text_muted: Color,
    /// Checked checkbox fill, document id.
    pub accent: Color,
    /// Page background, used to clear the header band.
    pub background: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            primary: Color::rgb8(61, 0, 255),
            secondary: Color::rgb8(100, 116, 139),
            tertiary: Color::rgb8(241, 245, 249),
            panel: Color::rgb8(248, 250, 252),
            text: Color::rgb8(15, 23, 42),
            text_muted: Color::rgb8(71, 85, 105),
            accent: Color::rgb8(61, 0, 255),
            background: Color::WHITE,
        }
    }
}

/// Placement of one classification category's checkbox grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSpec {
    /// Offset of the first checkbox column from the panel's left edge.
    pub offset: f64,
    /// Checkboxes per grid row.
    pub columns: usize,
    /// Horizontal distance between checkbox columns.
    pub spacing: f64,
}

impl GridSpec {
    pub const fn new(offset: f64, columns: usize, spacing: f64) -> Self {
        Self {
            offset,
            columns,
            spacing,
        }
    }

    /// Grid rows needed for `options` checkboxes.
    pub fn rows(&self, options: usize) -> usize {
        let columns = self.columns.max(1);
        options.div_ceil(columns).max(1)
    }
}

/// Grid constants for the four classification categories.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassificationGrid {
    pub nc_type: GridSpec,
    pub nature: GridSpec,
    pub work_category: GridSpec,
    pub grade: GridSpec,
    /// Baseline distance between rows of the same category.
    pub row_pitch: f64,
    /// Baseline distance from a category's last row to the next category.
    pub category_gap: f64,
}

impl Default for ClassificationGrid {
    fn default() -> Self {
        Self {
            nc_type: GridSpec::new(15.0, 2, 25.0),
            nature: GridSpec::new(30.0, 3, 40.0),
            work_category: GridSpec::new(30.0, 4, 32.0),
            grade: GridSpec::new(20.0, 4, 35.0),
            row_pitch: 5.0,
            category_gap: 10.0,
        }
    }
}

/// What a table row does when a cell wraps past the fixed row height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RowOverflow {
    /// Keep the fixed row height; lines past the row are not drawn.
    Clip,
    /// Grow the row to fit the tallest wrapped cell.
    #[default]
    Grow,
}

/// What to do with an atomic block taller than an empty page body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverflowPolicy {
    /// Place it anyway at the top of the page and let the page edge clip it.
    #[default]
    ForcePlace,
    /// Abort generation with [`RncError::LayoutOverflow`].
    Error,
}

/// The complete set of layout parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    /// Portrait page size (width, height). Landscape swaps them.
    pub page_size: (f64, f64),
    pub margin: Edges,
    /// Body content starts at `margin.top + header_height` on every page.
    pub header_height: f64,
    /// Height of the header band that the finalize pass overpaints.
    pub header_band_height: f64,
    /// Extra space kept free above the bottom margin before breaking.
    pub safety_margin: f64,
    /// Footer baseline distance from the page bottom.
    pub footer_offset: f64,

    pub line_height: f64,
    pub body_font_size: f64,
    pub label_font_size: f64,
    pub small_font_size: f64,

    pub banner_height: f64,
    /// Gap after a banner before the block content.
    pub block_gap: f64,
    /// Space below free text and before the signature panels.
    pub paragraph_gap: f64,
    /// Space below the evidence images and the actions table.
    pub section_gap: f64,
    pub checkbox_size: f64,
    /// Height returned by an empty labeled field.
    pub empty_field_height: f64,
    /// Extra height below a filled labeled field.
    pub field_padding: f64,

    /// Fixed height of the general-information panel (before cascading).
    pub info_panel_height: f64,
    pub grid: ClassificationGrid,

    /// Problem descriptions longer than this many lines are split.
    pub long_text_split_lines: usize,

    pub image_height: f64,

    pub table_row_height: f64,
    pub table_line_height: f64,
    pub table_column_fractions: [f64; 3],
    pub row_overflow: RowOverflow,
    /// Space requested before the corrective-actions block.
    pub actions_block_height: f64,

    /// Space requested before the signatures block.
    pub signatures_block_height: f64,
    pub signature_panel_height: f64,
    pub draw_signatures: bool,

    pub overflow_policy: OverflowPolicy,
    pub palette: Palette,
    /// Contracting party, printed in the header and the info block.
    pub brand: String,
    /// Header logo as a data URI, base64 or file path. The brand text is
    /// drawn instead when absent or undecodable.
    pub logo: Option<String>,
    pub title: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_size: (210.0, 297.0),
            margin: Edges::uniform(20.0),
            header_height: 30.0,
            header_band_height: 40.0,
            safety_margin: 10.0,
            footer_offset: 15.0,
            line_height: 4.0,
            body_font_size: 9.0,
            label_font_size: 8.0,
            small_font_size: 7.0,
            banner_height: 8.0,
            block_gap: 5.0,
            paragraph_gap: 10.0,
            section_gap: 15.0,
            checkbox_size: 3.0,
            empty_field_height: 4.0,
            field_padding: 2.0,
            info_panel_height: 60.0,
            grid: ClassificationGrid::default(),
            long_text_split_lines: 15,
            image_height: 60.0,
            table_row_height: 8.0,
            table_line_height: 3.5,
            table_column_fractions: [0.6, 0.2, 0.2],
            row_overflow: RowOverflow::default(),
            actions_block_height: 100.0,
            signatures_block_height: 120.0,
            signature_panel_height: 100.0,
            draw_signatures: true,
            overflow_policy: OverflowPolicy::default(),
            palette: Palette::default(),
            brand: "BRK".to_string(),
            logo: None,
            title: "REGISTRO DE NÃO CONFORMIDADE".to_string(),
        }
    }
}

impl LayoutConfig {
    /// Load a config from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, RncError> {
        serde_json::from_str(json).map_err(|e| RncError::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, RncError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| RncError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Resolve page geometry for an orientation.
    pub fn geometry(&self, orientation: Orientation) -> PageGeometry {
        let (w, h) = self.page_size;
        let (width, height) = match orientation {
            Orientation::Portrait => (w.min(h), w.max(h)),
            Orientation::Landscape => (w.max(h), w.min(h)),
        };
        PageGeometry {
            width,
            height,
            orientation,
            content_x: self.margin.left,
            content_width: width - self.margin.horizontal(),
            content_top: self.margin.top + self.header_height,
            flow_limit: height - self.margin.bottom - self.safety_margin,
        }
    }
}

/// Page dimensions resolved for one orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
    pub orientation: Orientation,
    pub content_x: f64,
    pub content_width: f64,
    /// Cursor value right below the header on every page.
    pub content_top: f64,
    /// Blocks must end at or above this offset.
    pub flow_limit: f64,
}

impl PageGeometry {
    /// Vertical space available to body content on an empty page.
    pub fn body_height(&self) -> f64 {
        self.flow_limit - self.content_top
    }
}
