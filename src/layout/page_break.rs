//! # Page Flow
//!
//! Owns the pages of one document and the decision of when to open the next
//! one. Blocks whose height is known up front go through
//! [`PageFlow::ensure_space`]; line-based content that may run across
//! several pages asks [`PageFlow::split_lines`] how many lines still fit.

use log::{debug, warn};

use super::finalize;
use super::{LayoutCursor, LayoutElement, LayoutPage};
use crate::error::RncError;
use crate::style::{LayoutConfig, OverflowPolicy, PageGeometry};

/// Slack for comparisons against the flow limit.
const EPSILON: f64 = 1e-6;

/// How much of a run of equal-height lines goes on the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFit {
    /// Every line fits.
    All,
    /// The first `n` lines fit; the rest continue on the next page.
    Partial(usize),
    /// Not even one line fits below the cursor.
    NextPage,
}

/// Whether the next block can go where the cursor is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Flowing,
    /// The block would cross the flow limit; a new page must be opened first.
    PageBreakPending,
}

/// The page buffers of one layout run plus the overflow rules.
pub struct PageFlow<'a> {
    config: &'a LayoutConfig,
    geometry: PageGeometry,
    pages: Vec<LayoutPage>,
}

impl<'a> PageFlow<'a> {
    /// Start a flow with its first page already open.
    pub fn new(config: &'a LayoutConfig, geometry: PageGeometry) -> Self {
        let mut flow = Self {
            config,
            geometry,
            pages: Vec::new(),
        };
        flow.open_page();
        flow
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Cursor right below the header of the current page.
    pub fn top(&self) -> LayoutCursor {
        LayoutCursor {
            y: self.geometry.content_top,
            page_index: self.pages.len() - 1,
        }
    }

    pub fn at_top(&self, cursor: LayoutCursor) -> bool {
        cursor.y <= self.geometry.content_top + EPSILON
    }

    /// Room left between the cursor and the flow limit.
    pub fn remaining(&self, cursor: LayoutCursor) -> f64 {
        (self.geometry.flow_limit - cursor.y).max(0.0)
    }

    /// Classify a block of `required` height at `cursor`.
    ///
    /// A cursor already at the top of a page is always `Flowing`: another
    /// break would only produce an empty page.
    pub fn state(&self, required: f64, cursor: LayoutCursor) -> FlowState {
        let overflows = cursor.y + required > self.geometry.flow_limit + EPSILON;
        if overflows && !self.at_top(cursor) {
            FlowState::PageBreakPending
        } else {
            FlowState::Flowing
        }
    }

    /// Make sure a block of `required` height can be placed, opening a new
    /// page if it cannot. Returns the cursor to place the block at.
    ///
    /// Blocks taller than an empty page body follow the configured
    /// [`OverflowPolicy`].
    pub fn ensure_space(
        &mut self,
        required: f64,
        cursor: LayoutCursor,
    ) -> Result<LayoutCursor, RncError> {
        let available = self.geometry.body_height();
        if required > available + EPSILON {
            match self.config.overflow_policy {
                OverflowPolicy::Error => {
                    return Err(RncError::LayoutOverflow {
                        required,
                        available,
                    });
                }
                OverflowPolicy::ForcePlace => {
                    warn!(
                        "Block of {:.1}mm exceeds the {:.1}mm page body, placing it anyway",
                        required, available
                    );
                }
            }
        }

        match self.state(required, cursor) {
            FlowState::Flowing => Ok(cursor),
            FlowState::PageBreakPending => {
                debug!(
                    "Page break before {:.1}mm block at y={:.1} on page {}",
                    required,
                    cursor.y,
                    cursor.page_index + 1
                );
                Ok(self.force_new_page())
            }
        }
    }

    /// Open a new page unconditionally.
    pub fn force_new_page(&mut self) -> LayoutCursor {
        self.open_page();
        self.top()
    }

    /// How many of `line_count` lines of `line_height` fit below `cursor`.
    ///
    /// Never answers `NextPage` at the top of a page, so callers looping over
    /// the result always make progress.
    pub fn split_lines(&self, cursor: LayoutCursor, line_count: usize, line_height: f64) -> LineFit {
        let remaining = self.remaining(cursor);
        let fitting = if line_height > 0.0 {
            ((remaining + EPSILON) / line_height).floor() as usize
        } else {
            line_count
        };

        if fitting >= line_count {
            LineFit::All
        } else if fitting > 0 {
            LineFit::Partial(fitting)
        } else if self.at_top(cursor) {
            warn!("Line of {:.1}mm does not fit an empty page body", line_height);
            if line_count == 1 {
                LineFit::All
            } else {
                LineFit::Partial(1)
            }
        } else {
            LineFit::NextPage
        }
    }

    /// Drawing surface of the page the cursor is on.
    pub fn surface(&mut self, cursor: LayoutCursor) -> &mut Vec<LayoutElement> {
        let index = cursor.page_index.min(self.pages.len() - 1);
        &mut self.pages[index].elements
    }

    pub fn finish(self) -> Vec<LayoutPage> {
        self.pages
    }

    fn open_page(&mut self) {
        let mut page = LayoutPage::new(&self.geometry);
        page.header = finalize::draft_header(self.config, &self.geometry);
        self.pages.push(page);
    }
}
