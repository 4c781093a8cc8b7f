use crate::ir::{format_number, Axis, ColorBar, Figure, Mark, Paint, Panel, TextAnchor};
use crate::palette::diverging;
use crate::theme::{ResolvedText, ResolvedTheme};
use anyhow::{Context, Result};
use image::ImageEncoder;
use plotters::coord::ranged1d::{DefaultFormatting, KeyPointHint, Ranged};
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::ops::Range;

const COLORBAR_IN: f64 = 0.9;
const COLORBAR_STEPS: usize = 64;

/// Encoded chart image. Pixel size is the figure size in inches times `dpi`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    png: Vec<u8>,
    dpi: u32,
    width: u32,
    height: u32,
}

impl RenderedArtifact {
    pub fn new(png: Vec<u8>, dpi: u32, width: u32, height: u32) -> Self {
        Self {
            png,
            dpi,
            width,
            height,
        }
    }

    pub fn png(&self) -> &[u8] {
        &self.png
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn into_png(self) -> Vec<u8> {
        self.png
    }
}

/// Linear axis whose grid lines and labels sit on precomputed ticks
struct TickedRange {
    coord: RangedCoordf64,
    ticks: Vec<f64>,
}

impl TickedRange {
    fn new(lo: f64, hi: f64, ticks: &[f64]) -> Self {
        TickedRange {
            coord: (lo..hi).into(),
            ticks: ticks.to_vec(),
        }
    }
}

impl Ranged for TickedRange {
    type FormatOption = DefaultFormatting;
    type ValueType = f64;

    fn map(&self, value: &f64, limit: (i32, i32)) -> i32 {
        self.coord.map(value, limit)
    }

    fn key_points<Hint: KeyPointHint>(&self, hint: Hint) -> Vec<f64> {
        if hint.max_num_points() == 0 {
            return Vec::new();
        }
        self.ticks.clone()
    }

    fn range(&self) -> Range<f64> {
        self.coord.range()
    }
}

/// RGB bitmap a figure is drawn into
pub struct Canvas {
    buffer: Vec<u8>,
    width: u32,
    height: u32,
}

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Canvas {
            buffer: vec![0u8; (width as usize) * (height as usize) * 3],
            width,
            height,
        }
    }

    /// Draw every panel of `figure`, plus its title and colour bar
    pub fn draw(&mut self, figure: &Figure, theme: &ResolvedTheme) -> Result<()> {
        let root = BitMapBackend::with_buffer(&mut self.buffer, (self.width, self.height)).into_drawing_area();
        root.fill(&theme.figure_background)
            .context("Failed to fill background")?;

        let body = if figure.title.is_empty() {
            root.clone()
        } else {
            root.titled(&figure.title, text_style(&theme.title))
                .context("Failed to draw title")?
        };

        let main = match &figure.colorbar {
            Some(bar) => {
                let bar_px = (COLORBAR_IN * theme.dpi as f64).round() as u32;
                let split_at = body.dim_in_pixel().0.saturating_sub(bar_px);
                let (main, side) = body.split_horizontally(split_at);
                draw_colorbar(&side, bar, theme)?;
                main
            }
            None => body,
        };

        let (rows, cols) = figure.grid;
        let cells = main.split_evenly((rows.max(1), cols.max(1)));
        for panel in &figure.panels {
            let cell = cells
                .get(panel.row * cols.max(1) + panel.col)
                .with_context(|| format!("Panel ({}, {}) is outside the {}x{} grid", panel.row, panel.col, rows, cols))?;
            draw_panel(cell, panel, theme)
                .with_context(|| format!("Failed to draw panel ({}, {})", panel.row, panel.col))?;
        }

        root.present().context("Failed to present drawing")?;
        Ok(())
    }

    /// Finalize and encode the canvas as PNG
    pub fn render(self) -> Result<Vec<u8>> {
        let mut png_bytes = Vec::new();
        {
            let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
            encoder
                .write_image(&self.buffer, self.width, self.height, image::ColorType::Rgb8)
                .context("Failed to encode PNG")?;
        }

        Ok(png_bytes)
    }
}

/// Draw a figure at the theme's DPI and encode it
pub fn render_figure(figure: &Figure, theme: &ResolvedTheme) -> Result<RenderedArtifact> {
    let (width, height) = figure.pixel_size(theme.dpi);
    let mut canvas = Canvas::new(width, height);
    canvas.draw(figure, theme)?;
    let png = canvas.render()?;
    Ok(RenderedArtifact::new(png, theme.dpi, width, height))
}

fn text_style(text: &ResolvedText) -> TextStyle<'static> {
    colored_text(text, &text.color)
}

fn colored_text(text: &ResolvedText, color: &RGBColor) -> TextStyle<'static> {
    let style = if text.bold { FontStyle::Bold } else { FontStyle::Normal };
    FontDesc::new(FontFamily::SansSerif, text.size, style).color(color)
}

fn paint_color(paint: Paint, theme: &ResolvedTheme) -> RGBColor {
    match paint {
        Paint::Series(i) => theme.series_color(i),
        Paint::Foreground => theme.foreground,
        Paint::Background => theme.panel_background,
        Paint::Diverging(t) => diverging(t),
        Paint::Rgb(r, g, b) => RGBColor(r, g, b),
    }
}

/// Rough pixel width of the widest tick label, for sizing the label area
fn label_width(axis: &Axis, theme: &ResolvedTheme) -> f64 {
    let chars = axis
        .ticks
        .iter()
        .map(|&t| axis.format_tick(t).chars().count())
        .max()
        .unwrap_or(1);
    chars as f64 * theme.axis_text.size * 0.6
}

fn draw_panel(area: &Area, panel: &Panel, theme: &ResolvedTheme) -> Result<()> {
    let area = match &panel.title {
        Some(title) => area
            .titled(title, text_style(&theme.axis_label))
            .context("Failed to draw panel title")?,
        None => area.clone(),
    };

    let desc = |label: &str| if label.is_empty() { 0.0 } else { theme.axis_label.size * 1.6 };
    let x_area = theme.axis_text.size * 1.8 + desc(&panel.x.label);
    let y_area = label_width(&panel.y, theme) + theme.axis_text.size + desc(&panel.y.label);

    let x_spec = TickedRange::new(panel.x.range.0, panel.x.range.1, &panel.x.ticks);
    let y_spec = TickedRange::new(panel.y.range.0, panel.y.range.1, &panel.y.ticks);

    let mut chart = ChartBuilder::on(&area)
        .margin(theme.pt(8.0).round() as u32)
        .x_label_area_size(x_area.round() as u32)
        .y_label_area_size(y_area.round() as u32)
        .build_cartesian_2d(x_spec, y_spec)
        .context("Failed to build chart")?;

    chart
        .plotting_area()
        .fill(&theme.panel_background)
        .context("Failed to fill panel")?;

    let x_fmt = |v: &f64| panel.x.format_tick(*v);
    let y_fmt = |v: &f64| panel.y.format_tick(*v);
    let axis_style = ShapeStyle::from(&theme.axis_line.color).stroke_width(theme.axis_line.width.round() as u32);

    let mut mesh = chart.configure_mesh();
    mesh.x_labels(panel.x.ticks.len().max(1))
        .y_labels(panel.y.ticks.len().max(1))
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .x_desc(panel.x.label.as_str())
        .y_desc(panel.y.label.as_str())
        .label_style(text_style(&theme.axis_text))
        .axis_desc_style(text_style(&theme.axis_label))
        .axis_style(axis_style)
        .light_line_style(&TRANSPARENT);

    match &theme.grid {
        Some(grid) => {
            mesh.bold_line_style(ShapeStyle::from(&grid.color).stroke_width(grid.width.round() as u32));
            // no grid lines across categories
            if panel.x.categories().is_some() {
                mesh.disable_x_mesh();
            }
            if panel.y.categories().is_some() {
                mesh.disable_y_mesh();
            }
        }
        None => {
            mesh.disable_mesh();
        }
    }
    mesh.draw().context("Failed to draw mesh")?;

    for mark in &panel.marks {
        match mark {
            Mark::Points {
                points,
                paint,
                alpha,
                size,
            } => {
                let color = paint_color(*paint, theme).mix(*alpha);
                let radius = theme.marker_radius(*size);
                chart
                    .draw_series(points.iter().map(|&p| Circle::new(p, radius, color.filled())))
                    .context("Failed to draw points")?;
            }
            Mark::Line {
                points,
                paint,
                alpha,
                width,
            } => {
                let color = paint_color(*paint, theme).mix(*alpha);
                chart
                    .draw_series(LineSeries::new(
                        points.iter().copied(),
                        color.stroke_width(theme.line_width(*width)),
                    ))
                    .context("Failed to draw line")?;
            }
            Mark::Rect {
                from,
                to,
                paint,
                alpha,
                outline,
            } => {
                let color = paint_color(*paint, theme).mix(*alpha);
                chart
                    .draw_series(std::iter::once(Rectangle::new([*from, *to], color.filled())))
                    .context("Failed to draw rectangle")?;
                if let Some(edge) = outline {
                    let edge = ShapeStyle::from(&paint_color(*edge, theme)).stroke_width(theme.line_width(0.5));
                    chart
                        .draw_series(std::iter::once(Rectangle::new([*from, *to], edge)))
                        .context("Failed to draw rectangle outline")?;
                }
            }
            Mark::Polygon { points, paint, alpha } => {
                let color = paint_color(*paint, theme).mix(*alpha);
                chart
                    .draw_series(std::iter::once(Polygon::new(points.clone(), color.filled())))
                    .context("Failed to draw polygon")?;
            }
            Mark::Text {
                at,
                text,
                paint,
                anchor,
            } => {
                let pad = theme.pt(3.0).round() as i32;
                let (offset, pos) = match anchor {
                    TextAnchor::Center => ((0, 0), Pos::new(HPos::Center, VPos::Center)),
                    TextAnchor::Right => ((pad, 0), Pos::new(HPos::Left, VPos::Center)),
                    TextAnchor::Above => ((0, -pad), Pos::new(HPos::Center, VPos::Bottom)),
                };
                let color = paint_color(*paint, theme);
                let style = colored_text(&theme.legend_text, &color).pos(pos);
                chart
                    .draw_series(std::iter::once(
                        EmptyElement::at(*at) + Text::new(text.clone(), offset, style),
                    ))
                    .context("Failed to draw text")?;
            }
        }
    }

    if !panel.legend.is_empty() {
        let radius = theme.marker_radius(40.0);
        for entry in &panel.legend {
            let color = paint_color(entry.paint, theme);
            chart
                .draw_series(std::iter::empty::<Circle<(f64, f64), i32>>())
                .context("Failed to register legend entry")?
                .label(entry.label.as_str())
                .legend(move |(x, y)| Circle::new((x, y), radius, color.filled()));
        }
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .margin(theme.pt(4.0).round() as u32)
            .background_style(&theme.panel_background.mix(0.8))
            .border_style(&theme.axis_line.color)
            .label_font(text_style(&theme.legend_text))
            .draw()
            .context("Failed to draw legend")?;
    }

    Ok(())
}

fn draw_colorbar(area: &Area, bar: &ColorBar, theme: &ResolvedTheme) -> Result<()> {
    let labels = bar.ticks.iter().map(|&t| format_number(t).chars().count()).max().unwrap_or(1);
    let label_px = labels as f64 * theme.axis_text.size * 0.6 + theme.axis_text.size;
    let y_spec = TickedRange::new(bar.min, bar.max, &bar.ticks);

    let mut chart = ChartBuilder::on(area)
        .margin_top(theme.pt(24.0).round() as u32)
        .margin_bottom(theme.pt(24.0).round() as u32)
        .margin_left(theme.pt(8.0).round() as u32)
        .margin_right(theme.pt(4.0).round() as u32)
        .y_label_area_size(label_px.round() as u32)
        .build_cartesian_2d(0.0..1.0, y_spec)
        .context("Failed to build colour bar")?;

    let fmt = |v: &f64| format_number(*v);
    chart
        .configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .x_labels(0)
        .y_labels(bar.ticks.len().max(1))
        .y_label_formatter(&fmt)
        .label_style(text_style(&theme.axis_text))
        .axis_style(&theme.axis_line.color)
        .draw()
        .context("Failed to draw colour bar axis")?;

    let step = (bar.max - bar.min) / COLORBAR_STEPS as f64;
    chart
        .draw_series((0..COLORBAR_STEPS).map(|i| {
            let lo = bar.min + step * i as f64;
            let hi = lo + step;
            let color = diverging(bar.normalize((lo + hi) / 2.0));
            Rectangle::new([(0.0, lo), (1.0, hi)], color.filled())
        }))
        .context("Failed to draw colour bar")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{AxisKind, LegendEntry};
    use crate::style::StyleOptions;

    fn make_figure() -> Figure {
        let axis = Axis {
            label: "x".to_string(),
            range: (0.0, 4.0),
            ticks: vec![0.0, 2.0, 4.0],
            kind: AxisKind::Linear,
        };
        let mut panel = Panel::new(axis.clone(), Axis { label: "y".to_string(), ..axis });
        panel.marks.push(Mark::Points {
            points: vec![(1.0, 1.0), (3.0, 2.0)],
            paint: Paint::Series(0),
            alpha: 0.7,
            size: 70.0,
        });
        panel.marks.push(Mark::Line {
            points: vec![(0.0, 0.0), (4.0, 4.0)],
            paint: Paint::Series(1),
            alpha: 1.0,
            width: 1.0,
        });
        panel.legend.push(LegendEntry {
            label: "a".to_string(),
            paint: Paint::Series(0),
        });
        Figure {
            title: "Test".to_string(),
            width_in: 4.0,
            height_in: 3.0,
            grid: (1, 1),
            panels: vec![panel],
            colorbar: None,
            rows_used: 2,
        }
    }

    #[test]
    fn test_render_png_signature_and_size() {
        let theme = ResolvedTheme::resolve(&StyleOptions::default().with_dpi(72));
        let artifact = render_figure(&make_figure(), &theme).unwrap();
        assert_eq!(&artifact.png()[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
        assert_eq!((artifact.width(), artifact.height()), (288, 216));
        assert_eq!(artifact.dpi(), 72);
    }

    #[test]
    fn test_render_is_deterministic() {
        let theme = ResolvedTheme::resolve(&StyleOptions::default().with_dpi(72));
        let a = render_figure(&make_figure(), &theme).unwrap();
        let b = render_figure(&make_figure(), &theme).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_ticked_range_keeps_given_ticks() {
        let range = TickedRange::new(0.0, 10.0, &[0.0, 2.5, 10.0]);
        assert_eq!(range.key_points(5usize), vec![0.0, 2.5, 10.0]);
        assert!(range.key_points(0usize).is_empty());
        assert_eq!(range.map(&5.0, (0, 100)), 50);
        assert_eq!(range.range(), 0.0..10.0);
    }

    #[test]
    fn test_panel_outside_grid_is_an_error() {
        let mut figure = make_figure();
        figure.panels[0].row = 3;
        let theme = ResolvedTheme::resolve(&StyleOptions::default().with_dpi(72));
        assert!(render_figure(&figure, &theme).is_err());
    }
}
