//! # Fonts
//!
//! The RNC document only uses Helvetica in three faces, all of them standard
//! PDF fonts, so nothing is embedded. Measurement goes through the AFM
//! widths in [`metrics`] and is returned in millimetres, the layout unit.

pub mod metrics;

pub use metrics::StandardFontMetrics;

/// Points per millimetre.
pub const PT_PER_MM: f64 = 72.0 / 25.4;

/// The standard PDF fonts the layout draws with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
}

impl StandardFont {
    /// Every face, in PDF resource order (/F0, /F1, /F2).
    pub const ALL: [StandardFont; 3] = [
        StandardFont::Helvetica,
        StandardFont::HelveticaBold,
        StandardFont::HelveticaOblique,
    ];

    /// The PDF name for this font.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::HelveticaOblique => "Helvetica-Oblique",
        }
    }

    /// Index of the font resource (`/F{index}`) in every page.
    pub fn resource_index(&self) -> usize {
        match self {
            Self::Helvetica => 0,
            Self::HelveticaBold => 1,
            Self::HelveticaOblique => 2,
        }
    }

    pub fn metrics(&self) -> &'static StandardFontMetrics {
        match self {
            // Oblique shares the upright widths.
            Self::Helvetica | Self::HelveticaOblique => &metrics::HELVETICA_METRICS,
            Self::HelveticaBold => &metrics::HELVETICA_BOLD_METRICS,
        }
    }

    /// Rendered width of `text` at `font_size` points, in millimetres.
    pub fn measure_mm(&self, text: &str, font_size: f64) -> f64 {
        self.metrics().measure_string(text, font_size) / PT_PER_MM
    }
}
