//! Backend-independent figure description
//!
//! `transform` fills these types from a table and a request; `graph` draws
//! them. Coordinates are data coordinates, except on categorical axes where
//! category `i` sits at `i as f64`.

// =============================================================================
// Figure
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub title: String,
    pub width_in: f64,
    pub height_in: f64,
    /// Panel grid (rows, cols); cells without a panel stay blank
    pub grid: (usize, usize),
    pub panels: Vec<Panel>,
    pub colorbar: Option<ColorBar>,
    /// Number of table rows the figure was drawn from, after filtering and sampling
    pub rows_used: usize,
}

/// Largest bitmap a figure may be drawn into (about 120 MB of RGB)
pub const MAX_CANVAS_PIXELS: u64 = 40_000_000;

impl Figure {
    pub fn pixel_size(&self, dpi: u32) -> (u32, u32) {
        let px = |inches: f64| (inches * dpi as f64).round().max(1.0) as u32;
        (px(self.width_in), px(self.height_in))
    }

    pub fn panel_at(&self, row: usize, col: usize) -> Option<&Panel> {
        self.panels.iter().find(|p| p.row == row && p.col == col)
    }
}

/// Diverging colour scale legend for heatmaps
#[derive(Debug, Clone, PartialEq)]
pub struct ColorBar {
    pub min: f64,
    pub max: f64,
    /// Value mapped to the neutral colour
    pub center: f64,
    pub ticks: Vec<f64>,
}

impl ColorBar {
    /// Position of `value` on the diverging map, in [-1, 1]
    pub fn normalize(&self, value: f64) -> f64 {
        if value >= self.center {
            let span = self.max - self.center;
            if span > 0.0 { (value - self.center) / span } else { 0.0 }
        } else {
            let span = self.center - self.min;
            if span > 0.0 { (value - self.center) / span } else { 0.0 }
        }
    }
}

// =============================================================================
// Panels and axes
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub row: usize,
    pub col: usize,
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub marks: Vec<Mark>,
    pub legend: Vec<LegendEntry>,
}

impl Panel {
    pub fn new(x: Axis, y: Axis) -> Self {
        Panel {
            row: 0,
            col: 0,
            title: None,
            x,
            y,
            marks: Vec::new(),
            legend: Vec::new(),
        }
    }

    pub fn at(mut self, row: usize, col: usize) -> Self {
        self.row = row;
        self.col = col;
        self
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Every point mark drawn with the given series colour
    pub fn points_for_series(&self, series: usize) -> Vec<(f64, f64)> {
        self.marks
            .iter()
            .filter_map(|m| match m {
                Mark::Points { points, paint: Paint::Series(s), .. } if *s == series => Some(points),
                _ => None,
            })
            .flatten()
            .copied()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AxisKind {
    Linear,
    /// Values are already log10-transformed; labels show `10^v`
    Log10,
    /// Fractions in [0, 1] labelled as percentages
    Percent,
    /// Category `i` at coordinate `i`
    Categorical(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub label: String,
    pub range: (f64, f64),
    pub ticks: Vec<f64>,
    pub kind: AxisKind,
}

impl Axis {
    pub fn categories(&self) -> Option<&[String]> {
        match &self.kind {
            AxisKind::Categorical(names) => Some(names),
            _ => None,
        }
    }

    /// Text shown next to a tick
    pub fn format_tick(&self, value: f64) -> String {
        match &self.kind {
            AxisKind::Categorical(names) => {
                let idx = value.round();
                if idx >= 0.0 && (value - idx).abs() < 1e-6 {
                    names.get(idx as usize).cloned().unwrap_or_default()
                } else {
                    String::new()
                }
            }
            AxisKind::Percent => format!("{:.0}%", value * 100.0),
            AxisKind::Log10 => format_number(10f64.powf(value)),
            AxisKind::Linear => format_number(value),
        }
    }
}

/// Shortest readable rendering of a tick value
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let abs = value.abs();
    if !(1e-4..1e6).contains(&abs) {
        return format!("{:.1e}", value);
    }
    let text = format!("{:.4}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" { "0".to_string() } else { text.to_string() }
}

// =============================================================================
// Marks
// =============================================================================

/// Colour source for a mark, resolved against the theme at draw time
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Paint {
    /// n-th colour of the palette
    Series(usize),
    /// Text/spine colour of the theme
    Foreground,
    /// Panel background colour of the theme
    Background,
    /// Position on the diverging colour map, in [-1, 1]
    Diverging(f64),
    Rgb(u8, u8, u8),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextAnchor {
    Center,
    /// Left-aligned, vertically centred (labels after horizontal bars)
    Right,
    /// Centred above the anchor point (labels on top of vertical bars)
    Above,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mark {
    Points {
        points: Vec<(f64, f64)>,
        paint: Paint,
        alpha: f64,
        /// Marker area in pt²
        size: f64,
    },
    Line {
        points: Vec<(f64, f64)>,
        paint: Paint,
        alpha: f64,
        /// Multiple of the context line width
        width: f64,
    },
    Rect {
        from: (f64, f64),
        to: (f64, f64),
        paint: Paint,
        alpha: f64,
        outline: Option<Paint>,
    },
    /// Closed filled polygon (violins, confidence bands, filled densities)
    Polygon {
        points: Vec<(f64, f64)>,
        paint: Paint,
        alpha: f64,
    },
    Text {
        at: (f64, f64),
        text: String,
        paint: Paint,
        anchor: TextAnchor,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    pub paint: Paint,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_size() {
        let figure = Figure {
            title: String::new(),
            width_in: 10.0,
            height_in: 5.0,
            grid: (1, 1),
            panels: Vec::new(),
            colorbar: None,
            rows_used: 0,
        };
        assert_eq!(figure.pixel_size(72), (720, 360));
        assert_eq!(figure.pixel_size(300), (3000, 1500));
    }

    #[test]
    fn test_format_tick() {
        let linear = Axis {
            label: String::new(),
            range: (0.0, 1.0),
            ticks: vec![],
            kind: AxisKind::Linear,
        };
        assert_eq!(linear.format_tick(2.5), "2.5");
        assert_eq!(linear.format_tick(4.0), "4");
        assert_eq!(linear.format_tick(-0.0), "0");

        let percent = Axis { kind: AxisKind::Percent, ..linear.clone() };
        assert_eq!(percent.format_tick(0.25), "25%");

        let log = Axis { kind: AxisKind::Log10, ..linear.clone() };
        assert_eq!(log.format_tick(2.0), "100");

        let cats = Axis {
            kind: AxisKind::Categorical(vec!["a".to_string(), "b".to_string()]),
            ..linear
        };
        assert_eq!(cats.format_tick(1.0), "b");
        assert_eq!(cats.format_tick(0.5), "");
        assert_eq!(cats.format_tick(5.0), "");
    }

    #[test]
    fn test_colorbar_normalize() {
        let bar = ColorBar {
            min: -0.5,
            max: 1.0,
            center: 0.0,
            ticks: vec![],
        };
        assert_eq!(bar.normalize(1.0), 1.0);
        assert_eq!(bar.normalize(-0.5), -1.0);
        assert_eq!(bar.normalize(0.0), 0.0);
        assert!((bar.normalize(0.5) - 0.5).abs() < 1e-12);
    }
}
