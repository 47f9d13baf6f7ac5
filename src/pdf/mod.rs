//! # PDF Serializer
//!
//! Takes the finished pages from the layout engine and writes a PDF 1.7 file.
//!
//! The writer is hand-rolled: the document only needs the three standard
//! Helvetica faces, filled and stroked paths, and image XObjects, so no
//! external PDF library is involved.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- catalog, page tree, fonts, images, pages, streams
//! ...
//! xref                <- byte offsets of every object
//! trailer             <- root and info references
//! %%EOF
//! ```
//!
//! Layout coordinates are millimetres from the top-left corner. PDF user
//! space is points from the bottom-left, so every coordinate goes through
//! [`PdfWriter::to_pt`] on the way out.

use std::fmt::Write as FmtWrite;
use std::io::Write as IoWrite;

use chrono::NaiveDateTime;
use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::error::RncError;
use crate::font::{StandardFont, PT_PER_MM};
use crate::image_loader::{ImagePixelData, LoadedImage};
use crate::layout::{DrawCommand, LayoutElement, LayoutPage, Stroke};
use crate::style::Color;

const PRODUCER: &str = concat!("rnc ", env!("CARGO_PKG_VERSION"));

/// Document information dictionary entries.
#[derive(Debug, Clone, Default)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub created: Option<NaiveDateTime>,
}

pub struct PdfWriter;

/// Tracks allocated PDF objects during writing.
struct PdfBuilder {
    objects: Vec<PdfObject>,
    /// Font object ids, in [`StandardFont::ALL`] order.
    font_objects: Vec<usize>,
    /// Images written so far; names them `/Im0`, `/Im1`, ...
    image_count: usize,
}

struct PdfObject {
    #[allow(dead_code)]
    id: usize,
    data: Vec<u8>,
}

impl PdfBuilder {
    fn push(&mut self, data: Vec<u8>) -> usize {
        let id = self.objects.len();
        self.objects.push(PdfObject { id, data });
        id
    }
}

/// Page height plus the coordinate flip, so drawing code can stay in mm.
#[derive(Clone, Copy)]
struct PageSpace {
    height: f64,
}

impl PageSpace {
    fn x(&self, x: f64) -> f64 {
        x * PT_PER_MM
    }

    fn y(&self, y: f64) -> f64 {
        (self.height - y) * PT_PER_MM
    }
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self
    }

    /// Convert a length in millimetres to points.
    pub fn to_pt(mm: f64) -> f64 {
        mm * PT_PER_MM
    }

    /// Write laid-out pages to a PDF byte vector.
    pub fn write(&self, pages: &[LayoutPage], info: &DocumentInfo) -> Result<Vec<u8>, RncError> {
        if pages.is_empty() {
            return Err(RncError::Render("document has no pages".to_string()));
        }

        let mut builder = PdfBuilder {
            objects: Vec::new(),
            font_objects: Vec::new(),
            image_count: 0,
        };

        // 0 = placeholder (PDF objects are 1-indexed)
        // 1 = Catalog
        // 2 = Pages (page tree root)
        // 3+ = fonts, then per page: images, content stream, page dict
        builder.objects.push(PdfObject { id: 0, data: vec![] });
        builder.objects.push(PdfObject { id: 1, data: vec![] });
        builder.objects.push(PdfObject { id: 2, data: vec![] });

        for font in StandardFont::ALL {
            let font_dict = format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                font.pdf_name()
            );
            let id = builder.push(font_dict.into_bytes());
            builder.font_objects.push(id);
        }
        let font_resources = builder
            .font_objects
            .iter()
            .enumerate()
            .map(|(i, id)| format!("/F{} {} 0 R", i, id))
            .collect::<Vec<_>>()
            .join(" ");

        let mut page_obj_ids: Vec<usize> = Vec::new();
        for page in pages {
            let mut xobjects: Vec<(usize, usize)> = Vec::new();
            let content = self.build_content_stream(&mut builder, page, &mut xobjects);
            let compressed = compress_to_vec_zlib(content.as_bytes(), 6);

            let mut content_data: Vec<u8> = Vec::new();
            let _ = write!(
                content_data,
                "<< /Length {} /Filter /FlateDecode >>\nstream\n",
                compressed.len()
            );
            content_data.extend_from_slice(&compressed);
            content_data.extend_from_slice(b"\nendstream");
            let content_obj_id = builder.push(content_data);

            let xobject_resources = if xobjects.is_empty() {
                String::new()
            } else {
                let entries = xobjects
                    .iter()
                    .map(|(idx, id)| format!("/Im{} {} 0 R", idx, id))
                    .collect::<Vec<_>>()
                    .join(" ");
                format!(" /XObject << {} >>", entries)
            };
            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << /Font << {} >>{} >> >>",
                Self::to_pt(page.width),
                Self::to_pt(page.height),
                content_obj_id,
                font_resources,
                xobject_resources
            );
            page_obj_ids.push(builder.push(page_dict.into_bytes()));
        }

        builder.objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();

        let kids: String = page_obj_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        builder.objects[2].data = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_obj_ids.len()
        )
        .into_bytes();

        let info_obj_id = builder.push(Self::info_dict(info).into_bytes());
        Ok(self.serialize(&builder, info_obj_id))
    }

    fn info_dict(info: &DocumentInfo) -> String {
        let mut dict = String::from("<< ");
        if let Some(ref title) = info.title {
            let _ = write!(dict, "/Title ({}) ", Self::encode_text(title));
        }
        if let Some(ref author) = info.author {
            let _ = write!(dict, "/Author ({}) ", Self::encode_text(author));
        }
        if let Some(ref subject) = info.subject {
            let _ = write!(dict, "/Subject ({}) ", Self::encode_text(subject));
        }
        if let Some(created) = info.created {
            let _ = write!(dict, "/CreationDate (D:{}) ", created.format("%Y%m%d%H%M%S"));
        }
        let _ = write!(dict, "/Producer ({}) /Creator ({}) >>", PRODUCER, PRODUCER);
        dict
    }

    /// Paint one page: body, then header, then footer.
    fn build_content_stream(
        &self,
        builder: &mut PdfBuilder,
        page: &LayoutPage,
        xobjects: &mut Vec<(usize, usize)>,
    ) -> String {
        let mut stream = String::new();
        let space = PageSpace {
            height: page.height,
        };
        for element in page.draw_order() {
            self.write_element(&mut stream, builder, element, space, xobjects);
        }
        stream
    }

    fn write_element(
        &self,
        stream: &mut String,
        builder: &mut PdfBuilder,
        element: &LayoutElement,
        space: PageSpace,
        xobjects: &mut Vec<(usize, usize)>,
    ) {
        let x = space.x(element.x);
        let y = space.y(element.y + element.height);
        let w = Self::to_pt(element.width);
        let h = Self::to_pt(element.height);

        match &element.draw {
            DrawCommand::Rect { background, border } => {
                if let Some(bg) = background {
                    let _ = write!(
                        stream,
                        "q\n{}{:.2} {:.2} {:.2} {:.2} re\nf\nQ\n",
                        fill_color(bg),
                        x,
                        y,
                        w,
                        h
                    );
                }
                if let Some(stroke) = border {
                    let _ = write!(
                        stream,
                        "q\n{}{:.2} {:.2} {:.2} {:.2} re\nS\nQ\n",
                        stroke_style(stroke),
                        x,
                        y,
                        w,
                        h
                    );
                }
            }

            DrawCommand::Line { stroke } => {
                let _ = write!(
                    stream,
                    "q\n{}{:.2} {:.2} m\n{:.2} {:.2} l\nS\nQ\n",
                    stroke_style(stroke),
                    space.x(element.x),
                    space.y(element.y),
                    space.x(element.x + element.width),
                    space.y(element.y + element.height)
                );
            }

            DrawCommand::Text {
                lines,
                font,
                font_size,
                color,
            } => {
                let _ = write!(
                    stream,
                    "BT\n{}/F{} {:.1} Tf\n",
                    fill_color(color),
                    font.resource_index(),
                    font_size
                );
                for line in lines {
                    let _ = write!(
                        stream,
                        "1 0 0 1 {:.2} {:.2} Tm\n({}) Tj\n",
                        space.x(line.x),
                        space.y(line.y),
                        Self::encode_text(&line.text)
                    );
                }
                let _ = writeln!(stream, "ET");
            }

            DrawCommand::Checkbox {
                checked,
                fill,
                mark,
                border,
            } => {
                if *checked {
                    let _ = write!(
                        stream,
                        "q\n{}{:.2} {:.2} {:.2} {:.2} re\nf\nQ\n",
                        fill_color(fill),
                        x,
                        y,
                        w,
                        h
                    );
                }
                let _ = write!(
                    stream,
                    "q\n{}{:.2} {:.2} {:.2} {:.2} re\nS\nQ\n",
                    stroke_style(border),
                    x,
                    y,
                    w,
                    h
                );
                if *checked {
                    // Tick drawn on a 3mm grid and scaled to the box.
                    let scale = element.width / 3.0;
                    let point = |px: f64, py: f64| {
                        (
                            space.x(element.x + px * scale),
                            space.y(element.y + py * scale),
                        )
                    };
                    let (ax, ay) = point(0.5, 2.0);
                    let (bx, by) = point(1.0, 2.5);
                    let (cx, cy) = point(2.5, 1.0);
                    let _ = write!(
                        stream,
                        "q\n{}{:.2} {:.2} m\n{:.2} {:.2} l\n{:.2} {:.2} l\nS\nQ\n",
                        stroke_style(&Stroke::new(*mark, 0.3 * scale)),
                        ax,
                        ay,
                        bx,
                        by,
                        cx,
                        cy
                    );
                }
            }

            DrawCommand::Image { image_data, border } => {
                let idx = builder.image_count;
                builder.image_count += 1;
                let obj_id = Self::write_image_xobject(builder, image_data);
                xobjects.push((idx, obj_id));
                let _ = write!(
                    stream,
                    "q\n{:.4} 0 0 {:.4} {:.2} {:.2} cm\n/Im{} Do\nQ\n",
                    w, h, x, y, idx
                );
                if let Some(stroke) = border {
                    let _ = write!(
                        stream,
                        "q\n{}{:.2} {:.2} {:.2} {:.2} re\nS\nQ\n",
                        stroke_style(stroke),
                        x,
                        y,
                        w,
                        h
                    );
                }
            }
        }
    }

    /// Write a single image as one or two XObject PDF objects.
    /// Returns the main XObject ID.
    fn write_image_xobject(builder: &mut PdfBuilder, image: &LoadedImage) -> usize {
        match &image.pixel_data {
            ImagePixelData::Jpeg { data, color_space } => {
                let mut obj_data: Vec<u8> = Vec::new();
                let _ = write!(
                    obj_data,
                    "<< /Type /XObject /Subtype /Image \
                     /Width {} /Height {} \
                     /ColorSpace {} \
                     /BitsPerComponent 8 \
                     /Filter /DCTDecode \
                     /Length {} >>\nstream\n",
                    image.width_px,
                    image.height_px,
                    color_space.pdf_name(),
                    data.len()
                );
                obj_data.extend_from_slice(data);
                obj_data.extend_from_slice(b"\nendstream");
                builder.push(obj_data)
            }

            ImagePixelData::Decoded { rgb, alpha } => {
                let smask_ref = alpha
                    .as_ref()
                    .map(|alpha_data| {
                        let compressed_alpha = compress_to_vec_zlib(alpha_data, 6);
                        let mut smask_data: Vec<u8> = Vec::new();
                        let _ = write!(
                            smask_data,
                            "<< /Type /XObject /Subtype /Image \
                             /Width {} /Height {} \
                             /ColorSpace /DeviceGray \
                             /BitsPerComponent 8 \
                             /Filter /FlateDecode \
                             /Length {} >>\nstream\n",
                            image.width_px,
                            image.height_px,
                            compressed_alpha.len()
                        );
                        smask_data.extend_from_slice(&compressed_alpha);
                        smask_data.extend_from_slice(b"\nendstream");
                        format!(" /SMask {} 0 R", builder.push(smask_data))
                    })
                    .unwrap_or_default();

                let compressed_rgb = compress_to_vec_zlib(rgb, 6);
                let mut obj_data: Vec<u8> = Vec::new();
                let _ = write!(
                    obj_data,
                    "<< /Type /XObject /Subtype /Image \
                     /Width {} /Height {} \
                     /ColorSpace /DeviceRGB \
                     /BitsPerComponent 8 \
                     /Filter /FlateDecode \
                     /Length {}{} >>\nstream\n",
                    image.width_px,
                    image.height_px,
                    compressed_rgb.len(),
                    smask_ref
                );
                obj_data.extend_from_slice(&compressed_rgb);
                obj_data.extend_from_slice(b"\nendstream");
                builder.push(obj_data)
            }
        }
    }

    /// Encode text for a literal string in WinAnsiEncoding, escaping
    /// delimiters and writing non-ASCII bytes as octal.
    fn encode_text(s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        for ch in s.chars() {
            let b = Self::unicode_to_winansi(ch).unwrap_or(b'?');
            match b {
                b'\\' => out.push_str("\\\\"),
                b'(' => out.push_str("\\("),
                b')' => out.push_str("\\)"),
                0x20..=0x7E => out.push(b as char),
                _ => {
                    let _ = write!(out, "\\{:03o}", b);
                }
            }
        }
        out
    }

    /// Map a Unicode codepoint to a WinAnsiEncoding byte value.
    ///
    /// WinAnsiEncoding is based on Windows-1252. Most codepoints in
    /// 0x20..=0x7E and 0xA0..=0xFF map directly; 0x80..=0x9F holds the
    /// typographic extras.
    fn unicode_to_winansi(ch: char) -> Option<u8> {
        let cp = ch as u32;
        if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
            return Some(cp as u8);
        }
        match cp {
            0x20AC => Some(0x80), // €
            0x201A => Some(0x82),
            0x0192 => Some(0x83),
            0x201E => Some(0x84),
            0x2026 => Some(0x85), // …
            0x2020 => Some(0x86),
            0x2021 => Some(0x87),
            0x02C6 => Some(0x88),
            0x2030 => Some(0x89),
            0x0160 => Some(0x8A),
            0x2039 => Some(0x8B),
            0x0152 => Some(0x8C),
            0x017D => Some(0x8E),
            0x2018 => Some(0x91), // ‘
            0x2019 => Some(0x92), // ’
            0x201C => Some(0x93), // “
            0x201D => Some(0x94), // ”
            0x2022 => Some(0x95), // •
            0x2013 => Some(0x96), // en dash
            0x2014 => Some(0x97), // em dash
            0x02DC => Some(0x98),
            0x2122 => Some(0x99), // ™
            0x0161 => Some(0x9A),
            0x203A => Some(0x9B),
            0x0153 => Some(0x9C),
            0x017E => Some(0x9E),
            0x0178 => Some(0x9F),
            _ => None,
        }
    }

    /// Serialize all objects into the final PDF byte stream.
    fn serialize(&self, builder: &PdfBuilder, info_obj_id: usize) -> Vec<u8> {
        let mut output: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = vec![0; builder.objects.len()];

        output.extend_from_slice(b"%PDF-1.7\n");
        output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

        for (i, obj) in builder.objects.iter().enumerate().skip(1) {
            offsets[i] = output.len();
            let header = format!("{} 0 obj\n", i);
            output.extend_from_slice(header.as_bytes());
            output.extend_from_slice(&obj.data);
            output.extend_from_slice(b"\nendobj\n\n");
        }

        let xref_offset = output.len();
        let _ = write!(output, "xref\n0 {}\n", builder.objects.len());
        let _ = write!(output, "0000000000 65535 f \n");
        for offset in offsets.iter().skip(1) {
            let _ = write!(output, "{:010} 00000 n \n", offset);
        }

        let _ = write!(
            output,
            "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            builder.objects.len(),
            info_obj_id,
            xref_offset
        );

        output
    }
}

fn fill_color(c: &Color) -> String {
    format!("{:.3} {:.3} {:.3} rg\n", c.r, c.g, c.b)
}

fn stroke_style(s: &Stroke) -> String {
    format!(
        "{:.3} {:.3} {:.3} RG\n{:.2} w\n",
        s.color.r,
        s.color.g,
        s.color.b,
        PdfWriter::to_pt(s.width)
    )
}
