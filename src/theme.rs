//! Theme resolution
//!
//! Turns [`StyleOptions`] into concrete colours and pixel sizes. Layering:
//! ```text
//! grid preset (whitegrid, darkgrid, white, dark, ticks)
//! └── dark figure mode (recolours background, text, spines, grid)
//!     └── context scale (paper, notebook, talk, poster) x DPI
//! ```

use crate::palette::{hex, ColorCycle};
use crate::style::StyleOptions;
use plotters::style::RGBColor;

const BASE_FONT_PT: f64 = 10.0;
const LABEL_FONT_PT: f64 = 11.0;
const TITLE_FONT_PT: f64 = 13.0;
const LEGEND_FONT_PT: f64 = 9.0;
const BASE_LINE_PT: f64 = 1.5;

const DARK_BACKGROUND: u32 = 0x020617;
const DARK_PANEL: u32 = 0x0F172A;
const DARK_TEXT: u32 = 0xE5E7EB;
const DARK_SPINE: u32 = 0x4B5563;
const DARK_GRID: u32 = 0x1F2937;

const LIGHT_SHADED_PANEL: u32 = 0xEAEAF2;
const LIGHT_TEXT: u32 = 0x262626;
const LIGHT_SPINE: u32 = 0x4D4D4D;
const LIGHT_GRID: u32 = 0xDDDDDD;

/// Fully resolved text style ready for rendering
#[derive(Debug, Clone)]
pub struct ResolvedText {
    pub color: RGBColor,
    /// Pixels
    pub size: f64,
    pub bold: bool,
}

/// Fully resolved line style ready for rendering
#[derive(Debug, Clone)]
pub struct ResolvedLine {
    pub color: RGBColor,
    /// Pixels
    pub width: f64,
}

/// Complete resolved theme, all sizes already in pixels for the target DPI
#[derive(Debug, Clone)]
pub struct ResolvedTheme {
    pub dpi: u32,
    pub figure_background: RGBColor,
    pub panel_background: RGBColor,
    pub title: ResolvedText,
    pub axis_label: ResolvedText,
    pub axis_text: ResolvedText,
    pub legend_text: ResolvedText,
    pub axis_line: ResolvedLine,
    /// None when the preset has no grid
    pub grid: Option<ResolvedLine>,
    /// Contrast colour for medians, edges and annotations
    pub foreground: RGBColor,
    pub series: ColorCycle,
    line_scale: f64,
}

impl ResolvedTheme {
    pub fn resolve(style: &StyleOptions) -> Self {
        let dpi = style.dpi;
        let font = |pt: f64| pt * style.context.scale() * dpi as f64 / 72.0;
        let line_scale = style.context.scale() * dpi as f64 / 72.0;

        let (figure_background, text_color, spine_color, grid_color) = if style.dark_mode {
            (hex(DARK_BACKGROUND), hex(DARK_TEXT), hex(DARK_SPINE), hex(DARK_GRID))
        } else {
            (RGBColor(255, 255, 255), hex(LIGHT_TEXT), hex(LIGHT_SPINE), hex(LIGHT_GRID))
        };

        let panel_background = match (style.grid.shaded_panel(), style.dark_mode) {
            (true, true) => hex(DARK_PANEL),
            (true, false) => hex(LIGHT_SHADED_PANEL),
            (false, _) => figure_background,
        };

        // darkgrid draws white lines on the shaded panel
        let grid = style.grid.has_grid().then(|| ResolvedLine {
            color: if style.grid.shaded_panel() && !style.dark_mode {
                RGBColor(255, 255, 255)
            } else {
                grid_color
            },
            width: (0.8 * line_scale).max(1.0),
        });

        let text = |pt: f64, bold: bool| ResolvedText {
            color: text_color,
            size: font(pt),
            bold,
        };

        ResolvedTheme {
            dpi,
            figure_background,
            panel_background,
            title: text(TITLE_FONT_PT, true),
            axis_label: text(LABEL_FONT_PT, false),
            axis_text: text(BASE_FONT_PT, false),
            legend_text: text(LEGEND_FONT_PT, false),
            axis_line: ResolvedLine {
                color: spine_color,
                width: (0.8 * line_scale).max(1.0),
            },
            grid,
            foreground: text_color,
            series: ColorCycle::new(style.palette),
            line_scale,
        }
    }

    /// Convert a length in points (already context-scaled by the caller if needed) to pixels
    pub fn pt(&self, points: f64) -> f64 {
        points * self.dpi as f64 / 72.0
    }

    /// Line width in pixels for a base width multiplier
    pub fn line_width(&self, factor: f64) -> u32 {
        (BASE_LINE_PT * factor * self.line_scale).round().max(1.0) as u32
    }

    /// Circle radius in pixels for a marker area given in pt²
    pub fn marker_radius(&self, area: f64) -> i32 {
        (area.max(0.0).sqrt() / 2.0 * self.line_scale).round().max(1.0) as i32
    }

    pub fn series_color(&self, index: usize) -> RGBColor {
        self.series.color(index)
    }
}
