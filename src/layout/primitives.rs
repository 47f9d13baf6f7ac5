//! # Drawing Primitives
//!
//! Stateless building blocks the composer assembles sections from. Each one
//! draws into the surface it is handed and reports how much vertical space it
//! used (or the advanced cursor); none of them remembers anything between
//! calls.

use log::warn;

use super::{DrawCommand, LayoutCursor, LayoutElement, Stroke, TextLine};
use crate::font::StandardFont;
use crate::image_loader;
use crate::style::{Color, LayoutConfig, RowOverflow};
use crate::text;

/// Caption drawn inside an empty evidence box.
pub const NO_IMAGE_TEXT: &str = "Sem imagem";

const HAIRLINE: f64 = 0.1;
const THIN: f64 = 0.2;

/// A single line of text at a baseline.
#[allow(clippy::too_many_arguments)]
pub fn text_line(
    out: &mut Vec<LayoutElement>,
    x: f64,
    baseline: f64,
    content: &str,
    font: StandardFont,
    font_size: f64,
    color: Color,
) -> f64 {
    let width = font.measure_mm(content, font_size);
    out.push(LayoutElement::new(
        x,
        baseline,
        width,
        0.0,
        DrawCommand::Text {
            lines: vec![TextLine {
                x,
                y: baseline,
                text: content.to_string(),
            }],
            font,
            font_size,
            color,
        },
    ));
    width
}

/// Wrapped lines with baselines `line_height` apart, as one element.
pub fn text_block(
    x: f64,
    baseline: f64,
    lines: &[String],
    line_height: f64,
    font: StandardFont,
    font_size: f64,
    color: Color,
) -> LayoutElement {
    let width = lines
        .iter()
        .map(|l| font.measure_mm(l, font_size))
        .fold(0.0, f64::max);
    LayoutElement::new(
        x,
        baseline,
        width,
        lines.len() as f64 * line_height,
        DrawCommand::Text {
            lines: lines
                .iter()
                .enumerate()
                .map(|(i, l)| TextLine {
                    x,
                    y: baseline + i as f64 * line_height,
                    text: l.clone(),
                })
                .collect(),
            font,
            font_size,
            color,
        },
    )
}

pub fn rule(out: &mut Vec<LayoutElement>, x1: f64, y1: f64, x2: f64, y2: f64, stroke: Stroke) {
    out.push(LayoutElement::new(
        x1,
        y1,
        x2 - x1,
        y2 - y1,
        DrawCommand::Line { stroke },
    ));
}

/// Filled and/or outlined box.
pub fn panel(
    out: &mut Vec<LayoutElement>,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    background: Option<Color>,
    border: Option<Stroke>,
) {
    out.push(LayoutElement::new(
        x,
        y,
        width,
        height,
        DrawCommand::Rect { background, border },
    ));
}

/// Full-width coloured band with a white bold title.
pub fn section_banner(
    out: &mut Vec<LayoutElement>,
    config: &LayoutConfig,
    x: f64,
    width: f64,
    title: &str,
    cursor: LayoutCursor,
) -> LayoutCursor {
    let h = config.banner_height;
    out.push(
        LayoutElement::new(
            x,
            cursor.y,
            width,
            h,
            DrawCommand::Rect {
                background: Some(config.palette.primary),
                border: None,
            },
        )
        .tagged("SectionBanner"),
    );
    text_line(
        out,
        x + 5.0,
        cursor.y + h - 2.5,
        title,
        StandardFont::HelveticaBold,
        10.0,
        Color::WHITE,
    );
    cursor.advance(h)
}

/// A label with its value to the right of it.
pub struct Field<'a> {
    pub label: &'a str,
    pub value: &'a str,
    pub x: f64,
    /// Baseline of the label and of the first value line.
    pub y: f64,
    /// Total width from `x`, label included.
    pub width: f64,
}

impl Field<'_> {
    fn value_x(&self, config: &LayoutConfig) -> f64 {
        self.x + label_width(self.label, config) + config.field_padding
    }

    /// Width the value wraps to.
    fn value_width(&self, config: &LayoutConfig) -> f64 {
        (self.x + self.width - self.value_x(config)).max(0.0)
    }

    /// Wrapped value lines; empty when there is no value.
    pub fn lines(&self, config: &LayoutConfig) -> Vec<String> {
        if self.value.trim().is_empty() {
            return Vec::new();
        }
        text::wrap(
            self.value,
            self.value_width(config),
            config.label_font_size,
            StandardFont::Helvetica,
        )
    }
}

fn label_width(label: &str, config: &LayoutConfig) -> f64 {
    StandardFont::HelveticaBold.measure_mm(label, config.label_font_size)
}

/// Draw a label and either its wrapped value or a placeholder line.
///
/// Returns `lines * line_height + field_padding` for a value and the fixed
/// `empty_field_height` for a blank one.
pub fn labeled_field(out: &mut Vec<LayoutElement>, config: &LayoutConfig, field: &Field) -> f64 {
    let palette = &config.palette;
    text_line(
        out,
        field.x,
        field.y,
        field.label,
        StandardFont::HelveticaBold,
        config.label_font_size,
        palette.primary,
    );

    let value_x = field.value_x(config);
    let lines = field.lines(config);
    if lines.is_empty() {
        let end = (field.x + field.width).max(value_x);
        out.push(
            LayoutElement::new(
                value_x,
                field.y,
                end - value_x,
                0.0,
                DrawCommand::Line {
                    stroke: Stroke::new(palette.secondary, HAIRLINE),
                },
            )
            .tagged("FieldPlaceholder"),
        );
        return config.empty_field_height;
    }

    out.push(
        text_block(
            value_x,
            field.y,
            &lines,
            config.line_height,
            StandardFont::Helvetica,
            config.label_font_size,
            palette.text,
        )
        .tagged("FieldValue"),
    );
    lines.len() as f64 * config.line_height + config.field_padding
}

/// The one checkbox glyph used for every selection in the document.
///
/// `(x, y)` is the top-left corner of the box.
pub fn checkbox(out: &mut Vec<LayoutElement>, config: &LayoutConfig, x: f64, y: f64, checked: bool) {
    let size = config.checkbox_size;
    out.push(
        LayoutElement::new(
            x,
            y,
            size,
            size,
            DrawCommand::Checkbox {
                checked,
                fill: config.palette.accent,
                mark: Color::WHITE,
                border: Stroke::new(config.palette.secondary, THIN),
            },
        )
        .tagged("Checkbox"),
    );
}

/// A checkbox whose bottom sits on `baseline`, followed by its label.
///
/// The label element always comes right after the box. Returns the width of
/// box, gap and label.
pub fn labeled_checkbox(
    out: &mut Vec<LayoutElement>,
    config: &LayoutConfig,
    x: f64,
    baseline: f64,
    checked: bool,
    label: &str,
    font_size: f64,
) -> f64 {
    let size = config.checkbox_size;
    checkbox(out, config, x, baseline - size, checked);
    let label_w = text_line(
        out,
        x + size + 2.0,
        baseline,
        label,
        StandardFont::Helvetica,
        font_size,
        config.palette.text,
    );
    label_w + size + 4.0
}

fn cell_lines(config: &LayoutConfig, cells: &[&str; 3], columns: &[f64; 3]) -> [Vec<String>; 3] {
    let wrap = |i: usize| {
        text::wrap(
            cells[i],
            (columns[i] - 10.0).max(1.0),
            config.label_font_size,
            StandardFont::Helvetica,
        )
    };
    [wrap(0), wrap(1), wrap(2)]
}

/// Height [`table_row`] will use for these cells.
pub fn measure_table_row(config: &LayoutConfig, cells: &[&str; 3], columns: &[f64; 3]) -> f64 {
    match config.row_overflow {
        RowOverflow::Clip => config.table_row_height,
        RowOverflow::Grow => {
            let tallest = cell_lines(config, cells, columns)
                .iter()
                .map(Vec::len)
                .max()
                .unwrap_or(1);
            config.table_row_height + tallest.saturating_sub(1) as f64 * config.table_line_height
        }
    }
}

/// Bold white column titles on a primary band.
pub fn table_header(
    out: &mut Vec<LayoutElement>,
    config: &LayoutConfig,
    titles: &[&str; 3],
    columns: &[f64; 3],
    x: f64,
    cursor: LayoutCursor,
) -> LayoutCursor {
    let h = config.table_row_height;
    let width: f64 = columns.iter().sum();
    out.push(
        LayoutElement::new(
            x,
            cursor.y,
            width,
            h,
            DrawCommand::Rect {
                background: Some(config.palette.primary),
                border: None,
            },
        )
        .tagged("TableHeader"),
    );
    let mut col_x = x;
    for (title, w) in titles.iter().zip(columns) {
        text_line(
            out,
            col_x + 5.0,
            cursor.y + h - 2.5,
            title,
            StandardFont::HelveticaBold,
            config.label_font_size,
            Color::WHITE,
        );
        col_x += w;
    }
    cursor.advance(h)
}

/// One row of the three-column actions table.
///
/// Even rows (0, 2, ...) get the tertiary fill. Each cell wraps on its own;
/// the row height follows [`RowOverflow`].
pub fn table_row(
    out: &mut Vec<LayoutElement>,
    config: &LayoutConfig,
    cells: &[&str; 3],
    columns: &[f64; 3],
    x: f64,
    cursor: LayoutCursor,
    zebra_index: usize,
) -> LayoutCursor {
    let palette = &config.palette;
    let width: f64 = columns.iter().sum();
    let h = measure_table_row(config, cells, columns);
    let top = cursor.y;

    let background = (zebra_index % 2 == 0).then_some(palette.tertiary);
    out.push(
        LayoutElement::new(x, top, width, h, DrawCommand::Rect { background, border: None })
            .tagged("TableRow"),
    );

    let visible = ((h - 5.0) / config.table_line_height).floor().max(0.0) as usize + 1;
    let mut col_x = x;
    for (lines, w) in cell_lines(config, cells, columns).iter().zip(columns) {
        let shown = &lines[..lines.len().min(visible)];
        out.push(
            text_block(
                col_x + 5.0,
                top + 5.0,
                shown,
                config.table_line_height,
                StandardFont::Helvetica,
                config.label_font_size,
                palette.text,
            )
            .tagged("TableCell"),
        );
        col_x += w;
    }

    let hairline = Stroke::new(palette.secondary, HAIRLINE);
    rule(out, x, top + h, x + width, top + h, hairline);
    let mut divider = x;
    for w in &columns[..2] {
        divider += w;
        rule(out, divider, top, divider, top + h, hairline);
    }

    cursor.advance(h)
}

/// Outline around a run of table rows.
pub fn table_border(out: &mut Vec<LayoutElement>, config: &LayoutConfig, x: f64, top: f64, width: f64, bottom: f64) {
    panel(
        out,
        x,
        top,
        width,
        bottom - top,
        None,
        Some(Stroke::new(config.palette.secondary, THIN)),
    );
}

/// Decode `payload` and draw it stretched over the box with a thin border.
///
/// Returns `false`, drawing nothing, when there is no payload or it fails to
/// decode.
pub fn image(
    out: &mut Vec<LayoutElement>,
    config: &LayoutConfig,
    payload: Option<&str>,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
) -> bool {
    let Some(payload) = payload else {
        return false;
    };
    match image_loader::load_image(payload) {
        Ok(image_data) => {
            out.push(
                LayoutElement::new(
                    x,
                    y,
                    width,
                    height,
                    DrawCommand::Image {
                        image_data,
                        border: Some(Stroke::new(config.palette.secondary, HAIRLINE)),
                    },
                )
                .tagged("Image"),
            );
            true
        }
        Err(e) => {
            warn!("{}; drawing without the image", e);
            false
        }
    }
}

/// The image, or an empty bordered box with an italic "no image" note.
pub fn image_or_placeholder(
    out: &mut Vec<LayoutElement>,
    config: &LayoutConfig,
    payload: Option<&str>,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
) {
    if image(out, config, payload, x, y, width, height) {
        return;
    }
    out.push(
        LayoutElement::new(
            x,
            y,
            width,
            height,
            DrawCommand::Rect {
                background: None,
                border: Some(Stroke::new(config.palette.secondary, HAIRLINE)),
            },
        )
        .tagged("ImagePlaceholder"),
    );
    let note_w = StandardFont::HelveticaOblique.measure_mm(NO_IMAGE_TEXT, config.label_font_size);
    text_line(
        out,
        x + (width - note_w) / 2.0,
        y + height / 2.0,
        NO_IMAGE_TEXT,
        StandardFont::HelveticaOblique,
        config.label_font_size,
        config.palette.text_muted,
    );
}
