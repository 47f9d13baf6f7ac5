//! # Pagination Finalizer
//!
//! Second layout pass. The page count is only known once the composer has
//! finished, but every header and footer has to print it, so headers start
//! out as a minimal draft and are replaced here.
//!
//! [`finalize`] only writes each page's `header` and `footer` lists. It
//! rebuilds them from scratch each time, so running it twice leaves the same
//! result as running it once.

use chrono::NaiveDateTime;
use log::warn;

use super::primitives::{panel, rule, text_line};
use super::{DrawCommand, LayoutElement, LayoutPage, Stroke};
use crate::font::StandardFont;
use crate::image_loader::{self, LoadedImage};
use crate::style::{LayoutConfig, PageGeometry};

const STRIPE_HEIGHT: f64 = 5.0;
const BRAND_BASELINE: f64 = 20.0;
const LOGO_TOP: f64 = 10.0;
const LOGO_SIZE: (f64, f64) = (40.0, 20.0);
const TITLE_BASELINE: f64 = 18.0;
const DATE_BASELINE: f64 = 30.0;
const PAGE_NUMBER_BASELINE: f64 = 35.0;
const FOOTER_FONT_SIZE: f64 = 8.0;

/// Identity of one generated document, shared by every page.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentStamp {
    /// `RNC-YYYYMMDD-NNNN`.
    pub document_id: String,
    pub generated_at: NaiveDateTime,
}

impl DocumentStamp {
    pub fn new(document_id: impl Into<String>, generated_at: NaiveDateTime) -> Self {
        Self {
            document_id: document_id.into(),
            generated_at,
        }
    }

    /// A fresh stamp for the current local time.
    pub fn now() -> Self {
        let generated_at = chrono::Local::now().naive_local();
        Self::new(crate::generate_document_id(generated_at), generated_at)
    }

    /// `dd/mm/yyyy`.
    pub fn date(&self) -> String {
        self.generated_at.format("%d/%m/%Y").to_string()
    }

    /// `dd/mm/yyyy, HH:MM`.
    pub fn timestamp(&self) -> String {
        self.generated_at.format("%d/%m/%Y, %H:%M").to_string()
    }
}

/// "Página i de N".
pub fn page_label(page_number: usize, total_pages: usize) -> String {
    format!("Página {} de {}", page_number, total_pages)
}

/// Header for a page whose number is not known yet: band, stripe, title.
pub fn draft_header(config: &LayoutConfig, geometry: &PageGeometry) -> Vec<LayoutElement> {
    let mut out = Vec::new();
    band(&mut out, config, geometry.width);
    title(&mut out, config, geometry.width);
    out
}

/// Stamp the full header and the footer on every page.
pub fn finalize(pages: &mut [LayoutPage], config: &LayoutConfig, stamp: &DocumentStamp) {
    let logo = config
        .logo
        .as_deref()
        .and_then(|src| match image_loader::load_image(src) {
            Ok(image) => Some(image),
            Err(e) => {
                warn!("{}; using the brand text as logo", e);
                None
            }
        });

    let total = pages.len();
    for (i, page) in pages.iter_mut().enumerate() {
        page.header = full_header(config, logo.as_ref(), page.width, i + 1, total, stamp);
        page.footer = footer(config, page.width, page.height, i + 1, total, stamp);
    }
}

fn band(out: &mut Vec<LayoutElement>, config: &LayoutConfig, page_width: f64) {
    let palette = &config.palette;
    panel(out, 0.0, 0.0, page_width, config.header_band_height, Some(palette.tertiary), None);
    panel(out, 0.0, 0.0, page_width, STRIPE_HEIGHT, Some(palette.primary), None);
}

fn title(out: &mut Vec<LayoutElement>, config: &LayoutConfig, page_width: f64) {
    let w = StandardFont::HelveticaBold.measure_mm(&config.title, 16.0);
    text_line(
        out,
        (page_width - w) / 2.0,
        TITLE_BASELINE,
        &config.title,
        StandardFont::HelveticaBold,
        16.0,
        config.palette.primary,
    );
}

fn right_aligned(
    out: &mut Vec<LayoutElement>,
    right_edge: f64,
    baseline: f64,
    content: &str,
    font: StandardFont,
    font_size: f64,
    color: crate::style::Color,
) -> usize {
    let w = font.measure_mm(content, font_size);
    text_line(out, right_edge - w, baseline, content, font, font_size, color);
    out.len() - 1
}

fn full_header(
    config: &LayoutConfig,
    logo: Option<&LoadedImage>,
    page_width: f64,
    page_number: usize,
    total_pages: usize,
    stamp: &DocumentStamp,
) -> Vec<LayoutElement> {
    let palette = &config.palette;
    let left = config.margin.left;
    let right = page_width - config.margin.right;
    let mut out = Vec::new();

    // Clears whatever the draft left in the band.
    panel(&mut out, 0.0, 0.0, page_width, config.header_band_height, Some(palette.background), None);
    band(&mut out, config, page_width);

    match logo {
        Some(image) => out.push(
            LayoutElement::new(
                left,
                LOGO_TOP,
                LOGO_SIZE.0,
                LOGO_SIZE.1,
                DrawCommand::Image {
                    image_data: image.clone(),
                    border: None,
                },
            )
            .tagged("Logo"),
        ),
        None => {
            text_line(
                &mut out,
                left,
                BRAND_BASELINE,
                &config.brand,
                StandardFont::HelveticaBold,
                14.0,
                palette.primary,
            );
        }
    }
    title(&mut out, config, page_width);
    text_line(
        &mut out,
        left,
        DATE_BASELINE,
        &format!("Data: {}", stamp.date()),
        StandardFont::Helvetica,
        10.0,
        palette.text_muted,
    );
    right_aligned(
        &mut out,
        right,
        DATE_BASELINE,
        &format!("ID: {}", stamp.document_id),
        StandardFont::HelveticaBold,
        11.0,
        palette.accent,
    );
    let idx = right_aligned(
        &mut out,
        right,
        PAGE_NUMBER_BASELINE,
        &page_label(page_number, total_pages),
        StandardFont::Helvetica,
        10.0,
        palette.text_muted,
    );
    out[idx].node_type = Some("PageNumber");

    rule(
        &mut out,
        left,
        config.header_band_height,
        right,
        config.header_band_height,
        Stroke::new(palette.secondary, 0.2),
    );
    out
}

fn footer(
    config: &LayoutConfig,
    page_width: f64,
    page_height: f64,
    page_number: usize,
    total_pages: usize,
    stamp: &DocumentStamp,
) -> Vec<LayoutElement> {
    let palette = &config.palette;
    let left = config.margin.left;
    let right = page_width - config.margin.right;
    let baseline = page_height - config.footer_offset;
    let mut out = Vec::new();

    rule(&mut out, left, baseline - 5.0, right, baseline - 5.0, Stroke::new(palette.secondary, 0.2));
    text_line(
        &mut out,
        left,
        baseline,
        &format!("Documento gerado em: {}", stamp.timestamp()),
        StandardFont::Helvetica,
        FOOTER_FONT_SIZE,
        palette.text_muted,
    );
    text_line(
        &mut out,
        page_width / 2.0 - 25.0,
        baseline,
        &format!("{} - Registro de Não Conformidade", config.brand),
        StandardFont::Helvetica,
        FOOTER_FONT_SIZE,
        palette.text_muted,
    );
    let idx = right_aligned(
        &mut out,
        right,
        baseline,
        &page_label(page_number, total_pages),
        StandardFont::Helvetica,
        FOOTER_FONT_SIZE,
        palette.text_muted,
    );
    out[idx].node_type = Some("PageNumber");
    out
}
