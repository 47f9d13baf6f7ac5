//! Integration tests for the RNC generation pipeline.
//!
//! These tests go from a form record (struct or JSON) through both layout
//! passes to PDF bytes. They verify:
//! - every selection renders with the right checked state, in order
//! - page numbering is consistent after the finalize pass
//! - the evidence section always starts a page of its own
//! - long problem descriptions split after 15 lines and keep flowing
//! - the actions table always has 4 zebra-striped rows
//! - images embed, and broken payloads fall back to placeholders

use base64::Engine;

use rnc::layout::finalize::page_label;
use rnc::layout::{DrawCommand, LayoutElement, LayoutPage};
use rnc::model::*;
use rnc::style::*;
use rnc::{DocumentStamp, RenderOptions, RncError};

// ─── Helpers ────────────────────────────────────────────────────

fn stamp() -> DocumentStamp {
    let at = chrono::NaiveDate::from_ymd_opt(2026, 10, 18)
        .unwrap()
        .and_hms_opt(8, 15, 0)
        .unwrap();
    DocumentStamp::new("RNC-20261018-0731", at)
}

fn options(orientation: Orientation) -> RenderOptions {
    RenderOptions {
        orientation,
        config: LayoutConfig::default(),
        stamp: Some(stamp()),
    }
}

fn layout(record: &FormRecord) -> Vec<LayoutPage> {
    rnc::layout(record, &options(Orientation::Portrait)).unwrap()
}

/// Titles of every section banner on a page, top to bottom.
fn banners(page: &LayoutPage) -> Vec<String> {
    let els = &page.elements;
    els.iter()
        .enumerate()
        .filter(|(_, e)| e.node_type == Some("SectionBanner"))
        .filter_map(|(i, _)| els.get(i + 1).and_then(LayoutElement::text))
        .collect()
}

fn page_with_banner(pages: &[LayoutPage], title: &str) -> usize {
    pages
        .iter()
        .position(|p| banners(p).iter().any(|t| t == title))
        .unwrap_or_else(|| panic!("no page with banner {title}"))
}

/// (label, checked) for every checkbox in document order.
fn checkbox_states(pages: &[LayoutPage]) -> Vec<(String, bool)> {
    let mut out = Vec::new();
    for page in pages {
        let els = &page.elements;
        for (i, e) in els.iter().enumerate() {
            if let DrawCommand::Checkbox { checked, .. } = &e.draw {
                let label = els.get(i + 1).and_then(LayoutElement::text).unwrap();
                out.push((label, *checked));
            }
        }
    }
    out
}

fn expected<C: Choice>(is_selected: impl Fn(C) -> bool) -> Vec<(String, bool)> {
    C::ALL
        .iter()
        .map(|&c| (c.label().to_string(), is_selected(c)))
        .collect()
}

fn problem_lines_per_page(pages: &[LayoutPage]) -> Vec<(usize, Vec<String>)> {
    pages
        .iter()
        .enumerate()
        .filter_map(|(i, p)| {
            let lines: Vec<String> = p
                .find("ProblemText")
                .filter_map(LayoutElement::text)
                .flat_map(|t| t.split('\n').map(str::to_string).collect::<Vec<_>>())
                .collect();
            (!lines.is_empty()).then_some((i, lines))
        })
        .collect()
}

fn numbered_problem(lines: usize) -> String {
    (1..=lines)
        .map(|i| format!("Linha {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn png_data_uri(width: u32, height: u32, rgba: [u8; 4]) -> String {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    image::ImageEncoder::write_image(encoder, img.as_raw(), width, height, image::ColorType::Rgba8)
        .unwrap();
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(buf)
    )
}

fn jpeg_data_uri(width: u32, height: u32) -> String {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([120, 90, 60]));
    let mut buf = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new(&mut buf);
    image::ImageEncoder::write_image(encoder, img.as_raw(), width, height, image::ColorType::Rgb8)
        .unwrap();
    format!(
        "data:image/jpeg;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(buf)
    )
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

// ─── Selections ─────────────────────────────────────────────────

#[test]
fn test_checkbox_fidelity() {
    let record = FormRecord {
        activity_status: Some(ActivityStatus::Suspended),
        nc_types: [NcType::Saa, NcType::Ses].into_iter().collect(),
        natures: [Nature::Quality, Nature::Other, Nature::Behaviour].into_iter().collect(),
        work_categories: [WorkCategory::Other, WorkCategory::Paving].into_iter().collect(),
        grade: Some(Grade::Medium),
        disposition: Some(Disposition::Inform),
        ..FormRecord::default()
    };
    let states = checkbox_states(&layout(&record));

    let mut want = expected(|s: ActivityStatus| record.activity_status == Some(s));
    want.extend(expected(|t: NcType| record.nc_types.contains(&t)));
    want.extend(expected(|n: Nature| record.natures.contains(&n)));
    want.extend(expected(|w: WorkCategory| record.work_categories.contains(&w)));
    want.extend(expected(|g: Grade| record.grade == Some(g)));
    want.extend(expected(|d: Disposition| record.disposition == Some(d)));

    assert_eq!(states, want);
    assert_eq!(states.len(), 3 + 2 + 9 + 13 + 4 + 4);
}

#[test]
fn test_empty_record_all_unchecked() {
    let states = checkbox_states(&layout(&FormRecord::default()));
    assert_eq!(states.len(), 35);
    assert!(states.iter().all(|(_, checked)| !checked));
}

// ─── Pagination ─────────────────────────────────────────────────

#[test]
fn test_page_numbers_are_consistent() {
    let record = FormRecord {
        problem: numbered_problem(100),
        ..FormRecord::default()
    };
    let pages = layout(&record);
    let total = pages.len();
    assert!(total > 3);

    for (i, page) in pages.iter().enumerate() {
        let want = page_label(i + 1, total);
        let in_header: Vec<String> = page
            .header
            .iter()
            .filter(|e| e.node_type == Some("PageNumber"))
            .filter_map(LayoutElement::text)
            .collect();
        let in_footer: Vec<String> = page
            .footer
            .iter()
            .filter(|e| e.node_type == Some("PageNumber"))
            .filter_map(LayoutElement::text)
            .collect();
        assert_eq!(in_header, vec![want.clone()]);
        assert_eq!(in_footer, vec![want]);
    }
}

#[test]
fn test_header_carries_id_and_date() {
    let pages = layout(&FormRecord::default());
    for page in &pages {
        let texts: Vec<String> = page.header.iter().filter_map(LayoutElement::text).collect();
        assert!(texts.contains(&"ID: RNC-20261018-0731".to_string()));
        assert!(texts.contains(&"Data: 18/10/2026".to_string()));
        assert!(texts.contains(&"BRK".to_string()));
    }
}

#[test]
fn test_evidence_starts_fresh_page_for_empty_problem() {
    let pages = layout(&FormRecord::default());
    let evidence = page_with_banner(&pages, "EVIDÊNCIAS");
    let problem = page_with_banner(&pages, "PROBLEMA IDENTIFICADO");
    assert!(evidence > problem);

    let first = &pages[evidence].elements[0];
    assert_eq!(first.node_type, Some("SectionBanner"));
    assert_eq!(first.y, 50.0);
    assert_eq!(banners(&pages[evidence])[0], "EVIDÊNCIAS");
}

#[test]
fn test_evidence_starts_fresh_page_after_long_problem() {
    let record = FormRecord {
        problem: numbered_problem(100),
        ..FormRecord::default()
    };
    let pages = layout(&record);
    let evidence = page_with_banner(&pages, "EVIDÊNCIAS");
    let last_problem_page = problem_lines_per_page(&pages).last().unwrap().0;
    assert_eq!(evidence, last_problem_page + 1);
    assert_eq!(banners(&pages[evidence])[0], "EVIDÊNCIAS");
}

#[test]
fn test_long_problem_splits_after_fifteen_lines() {
    let record = FormRecord {
        problem: numbered_problem(20),
        ..FormRecord::default()
    };
    let pages = layout(&record);
    let runs = problem_lines_per_page(&pages);

    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].1.len(), 15);
    assert_eq!(runs[1].1.len(), 5);
    assert_eq!(runs[1].0, runs[0].0 + 1);
    assert_eq!(runs[0].1[0], "Linha 1");
    assert_eq!(runs[1].1[0], "Linha 16");
}

#[test]
fn test_very_long_problem_keeps_every_line_in_order() {
    let record = FormRecord {
        problem: numbered_problem(100),
        ..FormRecord::default()
    };
    let pages = layout(&record);
    let runs = problem_lines_per_page(&pages);
    assert!(runs.len() >= 3);
    assert_eq!(runs[0].1.len(), 15);

    let all: Vec<String> = runs.into_iter().flat_map(|(_, lines)| lines).collect();
    let want: Vec<String> = (1..=100).map(|i| format!("Linha {i}")).collect();
    assert_eq!(all, want);

    // Nothing runs past the flow limit.
    for page in &pages {
        for e in page.find("ProblemText") {
            if let DrawCommand::Text { lines, .. } = &e.draw {
                assert!(lines.iter().all(|l| l.y <= 267.0));
            }
        }
    }
}

#[test]
fn test_short_problem_is_not_split() {
    let record = FormRecord {
        problem: numbered_problem(15),
        ..FormRecord::default()
    };
    let runs = problem_lines_per_page(&layout(&record));
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].1.len(), 15);
}

// ─── Actions table ──────────────────────────────────────────────

#[test]
fn test_actions_table_keeps_empty_third_row() {
    let mut record = FormRecord::default();
    for (i, item) in record.actions.iter_mut().enumerate() {
        if i != 2 {
            item.action = format!("Ação {}", i + 1);
            item.responsible = "Encarregado".to_string();
            item.due_date = "30/10/2026".to_string();
        }
    }
    let pages = layout(&record);
    let rows: Vec<&LayoutElement> = pages.iter().flat_map(|p| p.find("TableRow")).collect();
    assert_eq!(rows.len(), 4);

    let striped: Vec<bool> = rows
        .iter()
        .map(|e| matches!(e.draw, DrawCommand::Rect { background: Some(_), .. }))
        .collect();
    assert_eq!(striped, vec![true, false, true, false]);

    for pair in rows.windows(2) {
        assert_eq!(pair[1].y, pair[0].y + pair[0].height);
    }
    assert_eq!(rows[2].height, LayoutConfig::default().table_row_height);
}

#[test]
fn test_actions_json_with_empty_row() {
    let json = r#"{
        "actions": [
            { "action": "Refazer a vala", "responsible": "João", "dueDate": "01/11/2026" },
            { "action": "Recompor o pavimento", "responsible": "Maria", "dueDate": "05/11/2026" },
            { "action": "", "responsible": "", "dueDate": "" },
            { "action": "Vistoria final", "responsible": "Fiscal", "dueDate": "10/11/2026" }
        ]
    }"#;
    let pages = rnc::layout(
        &FormRecord::from_json(json).unwrap(),
        &options(Orientation::Portrait),
    )
    .unwrap();
    let count: usize = pages.iter().map(|p| p.find("TableRow").count()).sum();
    assert_eq!(count, 4);
}

// ─── Empty record ───────────────────────────────────────────────

#[test]
fn test_empty_record_renders_placeholders() {
    let pages = layout(&FormRecord::default());
    assert!(pages.len() >= 3);

    let count = |tag: &str| -> usize { pages.iter().map(|p| p.find(tag).count()).sum() };
    assert_eq!(count("ImagePlaceholder"), 2);
    assert_eq!(count("Image"), 0);
    assert_eq!(count("TableRow"), 4);
    // Contrato, Contratada, Local, Resp. Frente, Escopo.
    assert_eq!(count("FieldPlaceholder"), 5);
    assert_eq!(count("FieldValue"), 1);
}

#[test]
fn test_empty_record_produces_valid_pdf() {
    let doc = rnc::render_with(&FormRecord::default(), &options(Orientation::Portrait)).unwrap();
    let pdf = text(&doc.bytes);
    assert_eq!(doc.document_id, "RNC-20261018-0731");
    assert_eq!(doc.file_name, "RNC-20261018-0731.pdf");
    assert!(doc.bytes.starts_with(b"%PDF-1.7"));
    assert!(pdf.trim_end().ends_with("%%EOF"));
    assert!(pdf.contains(&format!("/Count {}", doc.page_count)));
    assert!(pdf.contains("/Title (RNC-20261018-0731)"));
}

// ─── Images ─────────────────────────────────────────────────────

#[test]
fn test_evidence_images_are_embedded() {
    let record = FormRecord {
        image1: Some(jpeg_data_uri(8, 6)),
        image2: Some(png_data_uri(4, 4, [10, 200, 30, 255])),
        image1_caption: "Vala sem escoramento".to_string(),
        ..FormRecord::default()
    };
    let pages = layout(&record);
    let evidence = page_with_banner(&pages, "EVIDÊNCIAS");
    assert_eq!(pages[evidence].find("Image").count(), 2);
    assert_eq!(pages[evidence].find("ImagePlaceholder").count(), 0);

    let doc = rnc::render_with(&record, &options(Orientation::Portrait)).unwrap();
    let pdf = text(&doc.bytes);
    assert!(pdf.contains("/Filter /DCTDecode"));
    assert!(pdf.contains("/Subtype /Image"));
}

#[test]
fn test_broken_image_falls_back_to_placeholder() {
    let record = FormRecord {
        image1: Some("data:image/png;base64,bm90IGFuIGltYWdl".to_string()),
        image2: Some(png_data_uri(2, 2, [0, 0, 0, 255])),
        ..FormRecord::default()
    };
    let pages = layout(&record);
    let evidence = page_with_banner(&pages, "EVIDÊNCIAS");
    assert_eq!(pages[evidence].find("ImagePlaceholder").count(), 1);
    assert_eq!(pages[evidence].find("Image").count(), 1);
}

#[test]
fn test_truncated_jpeg_falls_back_to_placeholder() {
    let img = image::RgbImage::from_fn(64, 64, |x, y| {
        image::Rgb([(x * 37 % 256) as u8, (y * 91 % 256) as u8, ((x ^ y) * 13 % 256) as u8])
    });
    let mut buf = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, 95);
    image::ImageEncoder::write_image(encoder, img.as_raw(), 64, 64, image::ColorType::Rgb8)
        .unwrap();
    buf.truncate(buf.len() * 2 / 3);
    let truncated = format!(
        "data:image/jpeg;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(&buf)
    );

    let record = FormRecord {
        image1: Some(truncated.clone()),
        image2: Some(truncated),
        ..FormRecord::default()
    };
    let pages = layout(&record);
    let evidence = page_with_banner(&pages, "EVIDÊNCIAS");
    assert_eq!(pages[evidence].find("ImagePlaceholder").count(), 2);
    assert_eq!(pages[evidence].find("Image").count(), 0);

    // Nothing broken reaches the PDF.
    let doc = rnc::render_with(&record, &options(Orientation::Portrait)).unwrap();
    assert!(!text(&doc.bytes).contains("/DCTDecode"));
}

#[test]
fn test_signatures_are_drawn_with_alpha() {
    let signature = png_data_uri(6, 2, [0, 0, 0, 0]);
    let record = FormRecord {
        contractor_opening_signature: Some(signature.clone()),
        contracted_closing_signature: Some(signature),
        opening_date: "18/10/2026".to_string(),
        ..FormRecord::default()
    };
    let pages = layout(&record);
    let last = pages.last().unwrap();
    assert_eq!(last.find("Image").count(), 2);
    let lines = last
        .elements
        .iter()
        .filter(|e| matches!(e.draw, DrawCommand::Line { .. }))
        .count();
    assert_eq!(lines, 2);

    let doc = rnc::render_with(&record, &options(Orientation::Portrait)).unwrap();
    assert!(text(&doc.bytes).contains("/SMask"));
}

// ─── Orientation, config, errors ────────────────────────────────

#[test]
fn test_landscape_uses_wide_pages() {
    let pages = rnc::layout(&FormRecord::default(), &options(Orientation::Landscape)).unwrap();
    assert!(pages.iter().all(|p| p.width == 297.0 && p.height == 210.0));
    let evidence = page_with_banner(&pages, "EVIDÊNCIAS");
    assert_eq!(banners(&pages[evidence])[0], "EVIDÊNCIAS");

    let doc = rnc::render_with(&FormRecord::default(), &options(Orientation::Landscape)).unwrap();
    assert!(text(&doc.bytes).contains("/MediaBox [0 0 841.89 595.28]"));
}

#[test]
fn test_overflow_policy_error_is_reported() {
    // Every fixed block is taller than this body.
    let config = LayoutConfig {
        page_size: (210.0, 120.0),
        overflow_policy: OverflowPolicy::Error,
        ..LayoutConfig::default()
    };
    let opts = RenderOptions {
        orientation: Orientation::Landscape,
        config,
        stamp: Some(stamp()),
    };
    let err = rnc::render_with(&FormRecord::default(), &opts).unwrap_err();
    assert!(matches!(err, RncError::LayoutOverflow { .. }));
}

#[test]
fn test_force_place_still_renders_tiny_page() {
    let config = LayoutConfig {
        page_size: (210.0, 120.0),
        ..LayoutConfig::default()
    };
    let opts = RenderOptions {
        orientation: Orientation::Landscape,
        config,
        stamp: Some(stamp()),
    };
    let doc = rnc::render_with(&FormRecord::default(), &opts).unwrap();
    assert!(doc.page_count >= 6);
}

#[test]
fn test_bad_json_is_parse_error() {
    let err = rnc::render_json("{ \"grade\": ", &options(Orientation::Portrait)).unwrap_err();
    match err {
        RncError::Parse { hint, .. } => assert!(hint.contains("truncated")),
        other => panic!("expected parse error, got {other}"),
    }
}

#[test]
fn test_render_is_deterministic_for_fixed_stamp() {
    let record = FormRecord {
        company: "Construtora Exemplo".to_string(),
        problem: numbered_problem(30),
        ..FormRecord::default()
    };
    let a = rnc::render_with(&record, &options(Orientation::Portrait)).unwrap();
    let b = rnc::render_with(&record, &options(Orientation::Portrait)).unwrap();
    assert_eq!(a.bytes, b.bytes);
}
