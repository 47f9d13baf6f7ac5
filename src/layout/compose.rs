//! # Document Composer
//!
//! Lays the record out section by section, always in the same order:
//!
//! 1. general information
//! 2. classification
//! 3. problem description
//! 4. evidence (always starts a new page)
//! 5. corrective actions
//! 6. dates and signatures
//!
//! The cursor is threaded through every step by value. Blocks whose height
//! can be computed up front are measured first and go through
//! [`PageFlow::ensure_space`] before anything is drawn.

use log::debug;

use super::page_break::{FlowState, LineFit, PageFlow};
use super::primitives::{self, Field};
use super::{LayoutCursor, LayoutPage, Stroke};
use crate::error::RncError;
use crate::font::StandardFont;
use crate::model::{
    ActivityStatus, Choice, Disposition, FormRecord, Grade, NcType, Nature, Orientation,
    WorkCategory,
};
use crate::style::{GridSpec, LayoutConfig};
use crate::text;

const BLANK_DATE: &str = "___/___/______";
const TABLE_TITLES: [&str; 3] = ["AÇÃO", "RESPONSÁVEL", "PRAZO"];

/// Baseline offsets of the five field rows in the general-information panel.
const INFO_ROW_OFFSETS: [f64; 5] = [15.0, 25.0, 35.0, 45.0, 55.0];
/// Baseline of the status row inside the panel.
const STATUS_BASELINE: f64 = 5.0;
/// Baseline of the first classification category inside its panel.
const CLASSIFICATION_FIRST_BASELINE: f64 = 7.0;

/// Draft-pass layout of one record.
pub struct DocumentComposer<'a> {
    record: &'a FormRecord,
    config: &'a LayoutConfig,
    orientation: Orientation,
    flow: PageFlow<'a>,
    x: f64,
    width: f64,
}

impl<'a> DocumentComposer<'a> {
    pub fn new(record: &'a FormRecord, config: &'a LayoutConfig, orientation: Orientation) -> Self {
        let geometry = config.geometry(orientation);
        Self {
            record,
            config,
            orientation,
            flow: PageFlow::new(config, geometry),
            x: geometry.content_x,
            width: geometry.content_width,
        }
    }

    /// Run every section and hand back the draft pages.
    pub fn compose(mut self) -> Result<Vec<LayoutPage>, RncError> {
        let cursor = self.flow.top();
        let cursor = self.general_info(cursor)?;
        let cursor = self.classification(cursor)?;
        let cursor = self.problem(cursor)?;
        let cursor = self.evidence(cursor)?;
        let cursor = self.actions(cursor)?;
        self.signatures(cursor)?;
        Ok(self.flow.finish())
    }

    fn banner(&mut self, title: &str, cursor: LayoutCursor) -> LayoutCursor {
        let (x, width) = (self.x, self.width);
        let out = self.flow.surface(cursor);
        primitives::section_banner(out, self.config, x, width, title, cursor)
    }

    /// Banner plus the gap below it.
    fn banner_height(&self) -> f64 {
        self.config.banner_height + self.config.block_gap
    }

    // ── 1. General information ─────────────────────────────────

    fn info_fields(&self) -> [Vec<Field<'a>>; 5] {
        let record = self.record;
        let config = self.config;
        let x = self.x + 5.0;
        let half_col = (self.width / 2.0 - 5.0) / 2.0;
        let full = self.width - 10.0;
        let contract_x = x + half_col + 5.0;
        let field = |label: &'a str, value: &'a str, x: f64, width: f64| Field {
            label,
            value,
            x,
            y: 0.0,
            width,
        };
        [
            vec![
                field("Contratante:", &config.brand, x, half_col),
                field("Contrato:", &record.contract, contract_x, self.x + self.width - 5.0 - contract_x),
            ],
            vec![field("Contratada:", &record.company, x, full)],
            vec![field("Local da NC:", &record.location, x, full)],
            vec![field("Resp. Frente:", &record.site_manager, x, full)],
            vec![field("Escopo:", &record.scope, x, full)],
        ]
    }

    fn general_info(&mut self, cursor: LayoutCursor) -> Result<LayoutCursor, RncError> {
        let config = self.config;
        let lh = config.line_height;

        // A row whose value wraps pushes every later row down.
        let mut rows = self.info_fields();
        let mut shift = 0.0;
        for (row, offset) in rows.iter_mut().zip(INFO_ROW_OFFSETS) {
            let extra = row
                .iter()
                .map(|f| f.lines(config).len().saturating_sub(1))
                .max()
                .unwrap_or(0) as f64
                * lh;
            for f in row.iter_mut() {
                f.y = offset + shift;
            }
            shift += extra;
        }
        let panel_height = config.info_panel_height + shift;

        let cursor = self.flow.ensure_space(
            self.banner_height() + panel_height + config.block_gap,
            cursor,
        )?;
        let cursor = self.banner("INFORMAÇÕES GERAIS", cursor);
        let top = cursor.y + config.block_gap;
        let (x, width) = (self.x, self.width);
        let palette = &config.palette;
        let record = self.record;

        let out = self.flow.surface(cursor);
        primitives::panel(
            out,
            x,
            top,
            width,
            panel_height,
            Some(palette.panel),
            Some(Stroke::new(palette.secondary, 0.1)),
        );

        primitives::text_line(
            out,
            x + 5.0,
            top + STATUS_BASELINE,
            "Status da Atividade:",
            StandardFont::HelveticaBold,
            config.body_font_size,
            palette.primary,
        );
        let mut option_x = x + 45.0;
        for &status in ActivityStatus::ALL {
            let w = primitives::labeled_checkbox(
                out,
                config,
                option_x,
                top + STATUS_BASELINE,
                record.activity_status == Some(status),
                status.label(),
                config.label_font_size,
            );
            option_x += w + 5.0;
        }

        for field in rows.iter_mut().flatten() {
            field.y += top;
            primitives::labeled_field(out, config, field);
        }

        Ok(LayoutCursor {
            y: top + panel_height + config.block_gap,
            ..cursor
        })
    }

    // ── 2. Classification ──────────────────────────────────────

    /// Panel height needed for the four checkbox grids.
    fn classification_height(&self) -> f64 {
        let grid = &self.config.grid;
        let categories = [
            (grid.nc_type, NcType::ALL.len()),
            (grid.nature, Nature::ALL.len()),
            (grid.work_category, WorkCategory::ALL.len()),
            (grid.grade, Grade::ALL.len()),
        ];
        let mut baseline = CLASSIFICATION_FIRST_BASELINE;
        let mut last = baseline;
        for (spec, options) in categories {
            last = baseline + (spec.rows(options) - 1) as f64 * grid.row_pitch;
            baseline = last + grid.category_gap;
        }
        last + 4.0
    }

    fn classification(&mut self, cursor: LayoutCursor) -> Result<LayoutCursor, RncError> {
        let config = self.config;
        let panel_height = self.classification_height();
        let cursor = self.flow.ensure_space(
            self.banner_height() + panel_height + config.block_gap,
            cursor,
        )?;
        let cursor = self.banner("CLASSIFICAÇÃO", cursor);
        let top = cursor.y + config.block_gap;
        let (x, width) = (self.x, self.width);
        let record = self.record;
        let grid = config.grid;
        let palette = &config.palette;

        let out = self.flow.surface(cursor);
        primitives::panel(
            out,
            x,
            top,
            width,
            panel_height,
            Some(palette.panel),
            Some(Stroke::new(palette.secondary, 0.1)),
        );

        let mut grids = ChoiceGrid {
            out,
            config,
            label_x: x + 5.0,
            baseline: top + CLASSIFICATION_FIRST_BASELINE,
        };
        grids.draw("Tipo:", grid.nc_type, |o: NcType| record.nc_types.contains(&o));
        grids.draw("Natureza:", grid.nature, |o: Nature| record.natures.contains(&o));
        grids.draw("Obra:", grid.work_category, |o: WorkCategory| {
            record.work_categories.contains(&o)
        });
        grids.draw("Grau:", grid.grade, |o: Grade| record.grade == Some(o));

        Ok(LayoutCursor {
            y: top + panel_height + config.block_gap,
            ..cursor
        })
    }

    // ── 3. Problem description ─────────────────────────────────

    fn problem(&mut self, cursor: LayoutCursor) -> Result<LayoutCursor, RncError> {
        let config = self.config;
        let lh = config.line_height;
        let wrapped = text::measure(
            &self.record.problem,
            self.width,
            config.body_font_size,
            StandardFont::Helvetica,
            lh,
        );
        let split_at = config.long_text_split_lines.max(1);
        let head = wrapped.line_count().min(split_at);

        let cursor = self
            .flow
            .ensure_space(self.banner_height() + head as f64 * lh, cursor)?;
        let lines = wrapped.lines;
        let cursor = self.banner("PROBLEMA IDENTIFICADO", cursor);
        let mut cursor = cursor.advance(config.block_gap);

        if lines.len() > split_at {
            debug!(
                "Problem description has {} lines, splitting after {}",
                lines.len(),
                split_at
            );
            cursor = self.problem_lines(&lines[..split_at], cursor);
            cursor = self.flow.force_new_page();
            cursor = self.flow_problem_lines(&lines[split_at..], cursor);
        } else {
            cursor = self.problem_lines(&lines, cursor);
        }
        Ok(cursor.advance(config.paragraph_gap))
    }

    fn problem_lines(&mut self, lines: &[String], cursor: LayoutCursor) -> LayoutCursor {
        let config = self.config;
        let element = primitives::text_block(
            self.x,
            cursor.y,
            lines,
            config.line_height,
            StandardFont::Helvetica,
            config.body_font_size,
            config.palette.text,
        )
        .tagged("ProblemText");
        self.flow.surface(cursor).push(element);
        cursor.advance(lines.len() as f64 * config.line_height)
    }

    /// Place lines, continuing on new pages for as long as they run.
    fn flow_problem_lines(&mut self, mut rest: &[String], mut cursor: LayoutCursor) -> LayoutCursor {
        let lh = self.config.line_height;
        while !rest.is_empty() {
            match self.flow.split_lines(cursor, rest.len(), lh) {
                LineFit::All => return self.problem_lines(rest, cursor),
                LineFit::Partial(count) => {
                    let (here, next) = rest.split_at(count);
                    self.problem_lines(here, cursor);
                    rest = next;
                    cursor = self.flow.force_new_page();
                }
                LineFit::NextPage => cursor = self.flow.force_new_page(),
            }
        }
        cursor
    }

    // ── 4. Evidence ────────────────────────────────────────────

    fn evidence(&mut self, _cursor: LayoutCursor) -> Result<LayoutCursor, RncError> {
        let config = self.config;
        let lh = config.line_height;
        let record = self.record;
        let (x, width) = (self.x, self.width);
        let image_w = width / 2.0 - 5.0;
        let second_x = x + image_w + 10.0;

        let caption = |s: &str| {
            text::measure(
                s,
                (image_w - 20.0).max(1.0),
                config.label_font_size,
                StandardFont::Helvetica,
                lh,
            )
        };
        let captions = [caption(&record.image1_caption), caption(&record.image2_caption)];
        // The first caption line shares the "Figura n:" baseline.
        let caption_extra = captions
            .iter()
            .map(|c| c.height() - lh)
            .fold(0.0, f64::max);

        let cursor = self.flow.force_new_page();
        let cursor = self.flow.ensure_space(
            self.banner_height()
                + caption_extra
                + config.block_gap
                + config.image_height
                + config.section_gap,
            cursor,
        )?;
        let cursor = self.banner("EVIDÊNCIAS", cursor);
        let caption_y = cursor.y + config.block_gap;
        let palette = &config.palette;

        let out = self.flow.surface(cursor);
        for (i, (fig_x, caption)) in [x, second_x].into_iter().zip(&captions).enumerate() {
            primitives::text_line(
                out,
                fig_x,
                caption_y,
                &format!("Figura {}:", i + 1),
                StandardFont::HelveticaBold,
                config.body_font_size,
                palette.text,
            );
            out.push(
                primitives::text_block(
                    fig_x + 20.0,
                    caption_y,
                    &caption.lines,
                    lh,
                    StandardFont::Helvetica,
                    config.label_font_size,
                    palette.text_muted,
                )
                .tagged("Caption"),
            );
        }

        let image_y = caption_y + caption_extra + config.block_gap;
        let h = config.image_height;
        primitives::image_or_placeholder(out, config, record.image1.as_deref(), x, image_y, image_w, h);
        primitives::image_or_placeholder(out, config, record.image2.as_deref(), second_x, image_y, image_w, h);

        Ok(LayoutCursor {
            y: image_y + h + config.section_gap,
            ..cursor
        })
    }

    // ── 5. Corrective actions ──────────────────────────────────

    fn actions(&mut self, cursor: LayoutCursor) -> Result<LayoutCursor, RncError> {
        let config = self.config;
        let record = self.record;
        let (x, width) = (self.x, self.width);
        let palette = &config.palette;

        let cursor = self.flow.ensure_space(config.actions_block_height, cursor)?;
        let cursor = self.banner("AÇÕES CORRETIVAS", cursor);
        let mut cursor = cursor.advance(config.block_gap);

        let per_row = match self.orientation {
            Orientation::Portrait => 2,
            Orientation::Landscape => Disposition::ALL.len(),
        };
        let out = self.flow.surface(cursor);
        primitives::text_line(
            out,
            x,
            cursor.y,
            "Disposições Gerais:",
            StandardFont::HelveticaBold,
            config.body_font_size,
            palette.text,
        );
        for (row, options) in Disposition::ALL.chunks(per_row).enumerate() {
            if row > 0 {
                cursor = cursor.advance(8.0);
            }
            let mut option_x = x + 40.0;
            for &option in options {
                let w = primitives::labeled_checkbox(
                    out,
                    config,
                    option_x,
                    cursor.y,
                    record.disposition == Some(option),
                    option.label(),
                    config.label_font_size,
                );
                option_x += w + 10.0;
            }
        }
        cursor = cursor.advance(12.0);

        primitives::text_line(
            out,
            x,
            cursor.y,
            "Ações a Executar / Concessões Obtidas:",
            StandardFont::HelveticaBold,
            config.body_font_size,
            palette.text,
        );
        cursor = cursor.advance(config.block_gap);

        let fractions = config.table_column_fractions;
        let columns = [
            width * fractions[0],
            width * fractions[1],
            width * fractions[2],
        ];
        cursor = primitives::table_header(out, config, &TABLE_TITLES, &columns, x, cursor);
        let mut rows_top = cursor.y;

        for (i, item) in record.actions.iter().enumerate() {
            let cells = [item.action.as_str(), item.responsible.as_str(), item.due_date.as_str()];
            let h = primitives::measure_table_row(config, &cells, &columns);

            if self.flow.state(h, cursor) == FlowState::PageBreakPending {
                let out = self.flow.surface(cursor);
                primitives::table_border(out, config, x, rows_top, width, cursor.y);
                // The continuation page repeats the header above this row.
                cursor = self.flow.ensure_space(config.table_row_height + h, cursor)?;
                debug!("Actions table continues on page {}", cursor.page_index + 1);
                let out = self.flow.surface(cursor);
                cursor = primitives::table_header(out, config, &TABLE_TITLES, &columns, x, cursor);
                rows_top = cursor.y;
            } else {
                cursor = self.flow.ensure_space(h, cursor)?;
            }

            let out = self.flow.surface(cursor);
            cursor = primitives::table_row(out, config, &cells, &columns, x, cursor, i);
        }

        let out = self.flow.surface(cursor);
        primitives::table_border(out, config, x, rows_top, width, cursor.y);
        Ok(cursor.advance(config.section_gap))
    }

    // ── 6. Dates and signatures ────────────────────────────────

    fn signatures(&mut self, cursor: LayoutCursor) -> Result<LayoutCursor, RncError> {
        let config = self.config;
        let record = self.record;
        let palette = &config.palette;
        let col_w = self.width / 2.0 - 5.0;
        let h = config.signature_panel_height;

        let cursor = self.flow.ensure_space(config.signatures_block_height, cursor)?;
        let cursor = self.banner("ASSINATURAS", cursor);
        let top = cursor.y + config.paragraph_gap;

        let panels = [
            (
                self.x,
                "ABERTURA",
                &record.opening_date,
                [
                    record.contractor_opening_signature.as_deref(),
                    record.contracted_opening_signature.as_deref(),
                ],
            ),
            (
                self.x + col_w + 10.0,
                "FECHAMENTO",
                &record.closing_date,
                [
                    record.contractor_closing_signature.as_deref(),
                    record.contracted_closing_signature.as_deref(),
                ],
            ),
        ];

        let out = self.flow.surface(cursor);
        for (px, title, date, signatures) in panels {
            primitives::panel(out, px, top, col_w, h, Some(palette.tertiary), None);

            let title_w = StandardFont::HelveticaBold.measure_mm(title, 10.0);
            primitives::text_line(
                out,
                px + (col_w - title_w) / 2.0,
                top + 8.0,
                title,
                StandardFont::HelveticaBold,
                10.0,
                palette.primary,
            );

            let date = if date.trim().is_empty() { BLANK_DATE } else { date.as_str() };
            primitives::text_line(
                out,
                px + 10.0,
                top + 20.0,
                &format!("Data: {}", date),
                StandardFont::Helvetica,
                config.label_font_size,
                palette.text,
            );

            if !config.draw_signatures {
                continue;
            }
            for (party, label_offset, payload) in [
                ("Contratante:", 30.0, signatures[0]),
                ("Contratada:", 65.0, signatures[1]),
            ] {
                primitives::text_line(
                    out,
                    px + 10.0,
                    top + label_offset,
                    party,
                    StandardFont::HelveticaBold,
                    config.label_font_size,
                    palette.text,
                );
                let image_y = top + label_offset + 5.0;
                let drawn =
                    primitives::image(out, config, payload, px + 10.0, image_y, col_w - 20.0, 20.0);
                if !drawn {
                    let line_y = top + label_offset + 15.0;
                    primitives::rule(
                        out,
                        px + 10.0,
                        line_y,
                        px + col_w - 10.0,
                        line_y,
                        Stroke::new(palette.secondary, 0.1),
                    );
                }
            }
        }

        Ok(LayoutCursor {
            y: top + h,
            ..cursor
        })
    }
}

/// Draws the classification categories one under the other.
struct ChoiceGrid<'o, 'c> {
    out: &'o mut Vec<super::LayoutElement>,
    config: &'c LayoutConfig,
    label_x: f64,
    /// Baseline of the next category's first row.
    baseline: f64,
}

impl ChoiceGrid<'_, '_> {
    /// One category: bold label, then every option of `C` in a grid, checked
    /// where `is_selected` says so.
    fn draw<C: Choice>(&mut self, label: &str, spec: GridSpec, is_selected: impl Fn(C) -> bool) {
        let config = self.config;
        let grid = &config.grid;
        primitives::text_line(
            self.out,
            self.label_x,
            self.baseline,
            label,
            StandardFont::HelveticaBold,
            config.label_font_size,
            config.palette.primary,
        );

        let columns = spec.columns.max(1);
        for (i, &option) in C::ALL.iter().enumerate() {
            let row = (i / columns) as f64;
            let col = (i % columns) as f64;
            primitives::labeled_checkbox(
                self.out,
                config,
                self.label_x + spec.offset + col * spec.spacing,
                self.baseline + row * grid.row_pitch,
                is_selected(option),
                option.label(),
                config.small_font_size,
            );
        }

        let rows = spec.rows(C::ALL.len());
        self.baseline += (rows - 1) as f64 * grid.row_pitch + grid.category_gap;
    }
}
