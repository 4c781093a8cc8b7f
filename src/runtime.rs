//! Render engine
//!
//! Stages:
//! 1. `transform::build_figure` validates the request, filters rows and lays out a figure
//! 2. `theme` resolves the style into colours and pixel sizes
//! 3. `graph::render_figure` draws and encodes the PNG
//! 4. `listing::emit` writes the listing that reproduces it

use crate::data::Table;
use crate::error::{LabError, LabResult};
use crate::graph::{self, RenderedArtifact};
use crate::ir::MAX_CANVAS_PIXELS;
use crate::listing::{self, CodeListing};
use crate::parser::parse_listing;
use crate::request::PlotRequest;
use crate::resolve::resolve_pipeline;
use crate::style::StyleOptions;
use crate::theme::ResolvedTheme;
use crate::transform;

/// Seed used for row sampling unless configured otherwise
pub const DEFAULT_SEED: u64 = 42;

/// Everything produced by one render
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub artifact: RenderedArtifact,
    pub listing: CodeListing,
    /// Reading guide for the chart family
    pub description: String,
    pub title: String,
    /// Rows the chart was drawn from, after dropping missing values and sampling
    pub rows_used: usize,
}

/// Render `request` against `table`. Same inputs always give the same bytes.
///
/// `seed` drives row sampling unless the request pins its own; the listing
/// always records the seed that was used.
pub fn render(table: &Table, request: &PlotRequest, style: &StyleOptions, seed: u64) -> LabResult<Rendered> {
    style.validate()?;

    let request = &request.clone().with_default_seed(seed);
    let figure = transform::build_figure(table, request, seed)?;
    tracing::debug!(
        title = %figure.title,
        panels = figure.panels.len(),
        rows = figure.rows_used,
        "built figure"
    );

    let (width, height) = figure.pixel_size(style.dpi);
    if u64::from(width) * u64::from(height) > MAX_CANVAS_PIXELS {
        return Err(LabError::config(
            "columns",
            format!(
                "a {}x{} px canvas at {} dpi is too large; use fewer columns or a lower dpi",
                width, height, style.dpi
            ),
        ));
    }

    let theme = ResolvedTheme::resolve(style);
    let artifact = graph::render_figure(&figure, &theme).map_err(|err| LabError::Render(format!("{err:#}")))?;
    tracing::debug!(
        width = artifact.width(),
        height = artifact.height(),
        bytes = artifact.png().len(),
        "encoded png"
    );

    Ok(Rendered {
        artifact,
        listing: listing::emit(request, style),
        description: request.description().to_string(),
        title: figure.title,
        rows_used: figure.rows_used,
    })
}

/// Read a listing back into the request and style it describes
pub fn read_listing(text: &str) -> LabResult<(PlotRequest, StyleOptions)> {
    let pipeline = parse_listing(text)?;
    resolve_pipeline(&pipeline)
}

/// Parse and render a listing against `table`
pub fn execute_listing(table: &Table, text: &str, seed: u64) -> LabResult<Rendered> {
    let (request, style) = read_listing(text)?;
    render(table, &request, &style, seed)
}
