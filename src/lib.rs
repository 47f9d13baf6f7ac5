//! # RNC
//!
//! Paginated PDF generation for Non-Conformity Records.
//!
//! A record is a flat set of form fields: status, classification checkboxes,
//! free text, two evidence photos, a four-row corrective-action table, dates
//! and signatures. This crate lays it out INTO fixed-size A4 pages. Every
//! block is measured before it is placed and the page flow decides whether it
//! still fits, so nothing is drawn across a page edge and sliced afterwards.
//!
//! ## Architecture
//!
//! ```text
//! FormRecord (JSON/API)
//!       ↓
//!   [model]    — FormRecord, option enumerations, orientation
//!       ↓
//!   [text]     — Measure and wrap over [font] metrics
//!       ↓
//!   [layout]   — Draft pass (compose) + finalize pass (page numbers)
//!       ↓
//!   [pdf]      — Serialize to PDF bytes
//! ```

pub mod error;
pub mod font;
pub mod image_loader;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod style;
pub mod text;

use chrono::NaiveDateTime;
use log::info;

pub use error::RncError;
pub use layout::finalize::DocumentStamp;
pub use layout::{LayoutEngine, LayoutPage};
pub use model::{FormRecord, Orientation};
pub use style::LayoutConfig;

use pdf::{DocumentInfo, PdfWriter};

/// Everything that can vary between two renders of the same record.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub orientation: Orientation,
    pub config: LayoutConfig,
    /// Fixed id and timestamp. A fresh one is drawn when `None`.
    pub stamp: Option<DocumentStamp>,
}

/// A finished document.
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub document_id: String,
    /// `<document id>.pdf`.
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// Build a document id of the form `RNC-YYYYMMDD-NNNN`.
pub fn generate_document_id(at: NaiveDateTime) -> String {
    let suffix = uuid::Uuid::new_v4().as_u128() % 10_000;
    format!("RNC-{}-{:04}", at.format("%Y%m%d"), suffix)
}

/// Render a record to PDF with the default layout.
///
/// This is the primary entry point.
pub fn render(record: &FormRecord, orientation: Orientation) -> Result<GeneratedDocument, RncError> {
    render_with(
        record,
        &RenderOptions {
            orientation,
            ..RenderOptions::default()
        },
    )
}

/// Render a record to PDF with explicit options.
pub fn render_with(record: &FormRecord, options: &RenderOptions) -> Result<GeneratedDocument, RncError> {
    let stamp = options.stamp.clone().unwrap_or_else(DocumentStamp::now);
    info!(
        "Generating {} ({:?})",
        stamp.document_id, options.orientation
    );

    let pages = layout_with_stamp(record, options, &stamp)?;
    let info = DocumentInfo {
        title: Some(stamp.document_id.clone()),
        author: Some(options.config.brand.clone()),
        subject: Some(options.config.title.clone()),
        created: Some(stamp.generated_at),
    };
    let bytes = PdfWriter::new().write(&pages, &info)?;

    info!(
        "Generated {}: {} page(s), {} bytes",
        stamp.document_id,
        pages.len(),
        bytes.len()
    );
    Ok(GeneratedDocument {
        file_name: format!("{}.pdf", stamp.document_id),
        document_id: stamp.document_id,
        bytes,
        page_count: pages.len(),
    })
}

/// Parse a record from JSON and render it.
pub fn render_json(json: &str, options: &RenderOptions) -> Result<GeneratedDocument, RncError> {
    let record = FormRecord::from_json(json)?;
    render_with(&record, options)
}

/// Run both layout passes without producing PDF bytes.
pub fn layout(record: &FormRecord, options: &RenderOptions) -> Result<Vec<LayoutPage>, RncError> {
    let stamp = options.stamp.clone().unwrap_or_else(DocumentStamp::now);
    layout_with_stamp(record, options, &stamp)
}

fn layout_with_stamp(
    record: &FormRecord,
    options: &RenderOptions,
    stamp: &DocumentStamp,
) -> Result<Vec<LayoutPage>, RncError> {
    LayoutEngine::new(&options.config).layout(record, options.orientation, stamp)
}
