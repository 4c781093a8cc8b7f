use crate::data::{Column, Table};
use crate::error::{LabError, LabResult};
use crate::ir::{Axis, AxisKind, ColorBar, Figure, LegendEntry, Mark, Paint, Panel, TextAnchor};
use crate::request::{CategoryKind, DistributionKind, MultiView, PlotRequest, RelationshipKind};
use crate::stats::{self, Aggregate, BoxStats, Curve};

/// Figure size for single-panel charts, inches
const WIDE: (f64, f64) = (10.0, 5.0);
const HEATMAP: (f64, f64) = (7.0, 6.0);
const PAIR_CELL_IN: f64 = 2.5;
const OVERVIEW_CELL_IN: f64 = 4.0;
/// Cells shrink once a grid reaches this many inches
const MAX_GRID_IN: f64 = 15.0;
const MAX_STRIP_IN: f64 = 24.0;

const OVERVIEW_BINS: usize = 30;
const PAIR_POINT_SIZE: f64 = 20.0;
const PAIR_ALPHA: f64 = 0.6;
const BAR_HALF: f64 = 0.4;
const TICK_TARGET: usize = 6;

/// Main entry point: validate the request, filter the table and build a backend-independent figure
pub fn build_figure(table: &Table, request: &PlotRequest, seed: u64) -> LabResult<Figure> {
    // 1. Validate before touching data
    request.validate(table)?;

    // 2. Drop rows missing any referenced column
    let data = table.drop_missing(&request.columns());
    tracing::debug!(
        family = request.family(),
        rows = data.row_count(),
        dropped = table.row_count() - data.row_count(),
        "filtered rows"
    );
    if data.is_empty() {
        return Err(LabError::empty("render"));
    }

    // 3. Statistics and layout per family
    let mut figure = match request {
        PlotRequest::Distribution {
            column,
            kind,
            hue,
            bins,
            log_x,
            density,
        } => distribution_figure(&data, column, *kind, hue.as_deref(), *bins, *log_x, *density)?,
        PlotRequest::Relationship {
            x,
            y,
            kind,
            hue,
            alpha,
            point_size,
        } => relationship_figure(&data, x, y, *kind, hue.as_deref(), *alpha, *point_size)?,
        PlotRequest::Category {
            category,
            kind,
            top_n,
            horizontal,
        } => category_figure(&data, category, kind, *top_n, *horizontal)?,
        PlotRequest::Matrix {
            columns,
            annotate,
            center_zero,
        } => matrix_figure(&data, columns, *annotate, *center_zero)?,
        PlotRequest::MultiVariable { columns, view } => match view {
            MultiView::Pairplot {
                hue,
                sample_size,
                seed: pinned,
            } => {
                let sample = data.sample(*sample_size, pinned.unwrap_or(seed));
                pairplot_figure(&sample, columns, hue.as_deref())?
            }
            MultiView::Overview { kde } => overview_figure(&data, columns, *kde)?,
            MultiView::Boxes => boxes_figure(&data, columns)?,
        },
    };

    figure.title = request.title();
    Ok(figure)
}

// =============================================================================
// Column access
// =============================================================================

/// Present values of a numeric column; aligned with rows once missing rows are dropped
fn numeric_values(table: &Table, name: &str) -> LabResult<Vec<f64>> {
    table
        .column(name)
        .and_then(Column::as_numeric)
        .map(|values| values.iter().flatten().copied().collect())
        .ok_or_else(|| LabError::config(name, "expected a numeric column"))
}

fn category_values<'a>(table: &'a Table, name: &str) -> LabResult<Vec<&'a str>> {
    table
        .column(name)
        .and_then(Column::as_categorical)
        .map(|values| values.iter().flatten().map(String::as_str).collect())
        .ok_or_else(|| LabError::config(name, "expected a categorical column"))
}

/// Colour groups in first-occurrence order; a single unlabeled group without hue
fn series_of(table: &Table, hue: Option<&str>) -> LabResult<Vec<(Option<String>, Vec<usize>)>> {
    match hue {
        Some(hue) => Ok(stats::group_indices(category_values(table, hue)?)
            .into_iter()
            .map(|(key, rows)| (Some(key), rows))
            .collect()),
        None => Ok(vec![(None, (0..table.row_count()).collect())]),
    }
}

fn pick(values: &[f64], rows: &[usize]) -> Vec<f64> {
    rows.iter().map(|&r| values[r]).collect()
}

fn legend_for(groups: &[(Option<String>, Vec<usize>)]) -> Vec<LegendEntry> {
    groups
        .iter()
        .enumerate()
        .filter_map(|(i, (label, _))| {
            label.as_ref().map(|label| LegendEntry {
                label: label.clone(),
                paint: Paint::Series(i),
            })
        })
        .collect()
}

// =============================================================================
// Axes
// =============================================================================

fn linear_axis(label: impl Into<String>, lo: f64, hi: f64) -> Axis {
    let (lo, hi) = stats::padded_range(lo, hi, 0.05);
    Axis {
        label: label.into(),
        range: (lo, hi),
        ticks: stats::nice_ticks(lo, hi, TICK_TARGET),
        kind: AxisKind::Linear,
    }
}

/// Axis anchored at zero for counts, densities and aggregates
fn value_axis(label: impl Into<String>, lo: f64, hi: f64, headroom: f64) -> Axis {
    let lo = lo.min(0.0);
    let hi = hi.max(0.0);
    let (lo, hi) = if hi > lo { (lo, hi) } else { (0.0, 1.0) };
    let span = hi - lo;
    let lo = if lo < 0.0 { lo - span * headroom } else { 0.0 };
    let hi = if hi > 0.0 { hi + span * headroom } else { 0.0 };
    Axis {
        label: label.into(),
        range: (lo, hi),
        ticks: stats::nice_ticks(lo, hi, TICK_TARGET),
        kind: AxisKind::Linear,
    }
}

fn category_axis(label: impl Into<String>, names: Vec<String>) -> Axis {
    let n = names.len();
    Axis {
        label: label.into(),
        range: (-0.5, n as f64 - 0.5),
        ticks: (0..n).map(|i| i as f64).collect(),
        kind: AxisKind::Categorical(names),
    }
}

/// Categories listed top to bottom on a horizontal chart sit at descending coordinates
struct Slots {
    n: usize,
    horizontal: bool,
}

impl Slots {
    fn position(&self, index: usize) -> f64 {
        if self.horizontal {
            (self.n - 1 - index) as f64
        } else {
            index as f64
        }
    }

    fn point(&self, value: f64, position: f64) -> (f64, f64) {
        if self.horizontal {
            (value, position)
        } else {
            (position, value)
        }
    }

    fn axis(&self, label: &str, names: Vec<String>) -> Axis {
        let names = if self.horizontal {
            names.into_iter().rev().collect()
        } else {
            names
        };
        category_axis(label, names)
    }

    /// (x, y) axes from the category axis and the value axis
    fn axes(&self, category: Axis, value: Axis) -> (Axis, Axis) {
        if self.horizontal {
            (value, category)
        } else {
            (category, value)
        }
    }
}

fn single_panel(size: (f64, f64), panel: Panel, rows_used: usize) -> Figure {
    Figure {
        title: String::new(),
        width_in: size.0,
        height_in: size.1,
        grid: (1, 1),
        panels: vec![panel],
        colorbar: None,
        rows_used,
    }
}

fn extend_range(range: &mut (f64, f64), curve: &Curve) {
    if let Some((lo, hi)) = stats::min_max(&curve.x) {
        range.0 = range.0.min(lo);
        range.1 = range.1.max(hi);
    }
}

// =============================================================================
// Shared mark builders
// =============================================================================

fn box_marks(stats: &BoxStats, position: f64, slots: &Slots, paint: Paint) -> Vec<Mark> {
    let pt = |v: f64, p: f64| slots.point(v, p);
    let cap = BAR_HALF / 2.0;
    let mut marks = vec![
        Mark::Line {
            points: vec![pt(stats.lower_whisker, position), pt(stats.q1, position)],
            paint: Paint::Foreground,
            alpha: 1.0,
            width: 1.0,
        },
        Mark::Line {
            points: vec![pt(stats.q3, position), pt(stats.upper_whisker, position)],
            paint: Paint::Foreground,
            alpha: 1.0,
            width: 1.0,
        },
        Mark::Line {
            points: vec![pt(stats.lower_whisker, position - cap), pt(stats.lower_whisker, position + cap)],
            paint: Paint::Foreground,
            alpha: 1.0,
            width: 1.0,
        },
        Mark::Line {
            points: vec![pt(stats.upper_whisker, position - cap), pt(stats.upper_whisker, position + cap)],
            paint: Paint::Foreground,
            alpha: 1.0,
            width: 1.0,
        },
        Mark::Rect {
            from: pt(stats.q1, position - BAR_HALF),
            to: pt(stats.q3, position + BAR_HALF),
            paint,
            alpha: 1.0,
            outline: Some(Paint::Foreground),
        },
        Mark::Line {
            points: vec![pt(stats.median, position - BAR_HALF), pt(stats.median, position + BAR_HALF)],
            paint: Paint::Foreground,
            alpha: 1.0,
            width: 1.3,
        },
    ];
    if !stats.outliers.is_empty() {
        marks.push(Mark::Points {
            points: stats.outliers.iter().map(|&v| pt(v, position)).collect(),
            paint: Paint::Foreground,
            alpha: 0.8,
            size: 16.0,
        });
    }
    marks
}

/// Mirrored density with an inner box; returns the marks and the value extent of the curve
fn violin_marks(values: &[f64], position: f64, slots: &Slots, paint: Paint) -> (Vec<Mark>, Curve) {
    let curve = stats::kde(values);
    let mut marks = Vec::new();

    let peak = curve.max_y();
    if peak > 0.0 {
        let half = |d: f64| BAR_HALF * d / peak;
        let mut outline: Vec<(f64, f64)> = curve
            .x
            .iter()
            .zip(&curve.y)
            .map(|(&v, &d)| slots.point(v, position + half(d)))
            .collect();
        outline.extend(
            curve
                .x
                .iter()
                .zip(&curve.y)
                .rev()
                .map(|(&v, &d)| slots.point(v, position - half(d))),
        );
        marks.push(Mark::Polygon {
            points: outline,
            paint,
            alpha: 1.0,
        });
    }

    if let Some(stats) = stats::box_stats(values) {
        marks.push(Mark::Line {
            points: vec![slots.point(stats.lower_whisker, position), slots.point(stats.upper_whisker, position)],
            paint: Paint::Foreground,
            alpha: 1.0,
            width: 1.0,
        });
        marks.push(Mark::Line {
            points: vec![slots.point(stats.q1, position), slots.point(stats.q3, position)],
            paint: Paint::Foreground,
            alpha: 1.0,
            width: 3.0,
        });
        marks.push(Mark::Points {
            points: vec![slots.point(stats.median, position)],
            paint: Paint::Rgb(255, 255, 255),
            alpha: 1.0,
            size: 16.0,
        });
    }

    (marks, curve)
}

fn density_marks(curve: &Curve, weight: f64, paint: Paint, fill: bool) -> Vec<Mark> {
    let points: Vec<(f64, f64)> = curve.x.iter().zip(&curve.y).map(|(&x, &y)| (x, y * weight)).collect();
    let mut marks = Vec::new();
    if fill {
        if let (Some(first), Some(last)) = (points.first(), points.last()) {
            let mut area = points.clone();
            area.push((last.0, 0.0));
            area.push((first.0, 0.0));
            marks.push(Mark::Polygon {
                points: area,
                paint,
                alpha: 0.25,
            });
        }
    }
    marks.push(Mark::Line {
        points,
        paint,
        alpha: 1.0,
        width: 1.0,
    });
    marks
}

// =============================================================================
// Families
// =============================================================================

fn distribution_figure(
    data: &Table,
    column: &str,
    kind: DistributionKind,
    hue: Option<&str>,
    bins: usize,
    log_x: bool,
    density: bool,
) -> LabResult<Figure> {
    let mut values = numeric_values(data, column)?;
    if log_x {
        for v in &mut values {
            *v = v.log10();
        }
    }
    let groups = series_of(data, hue)?;
    let total = values.len() as f64;
    let (lo, hi) = stats::min_max(&values).ok_or_else(|| LabError::empty("render"))?;
    let mut x_range = (lo, hi);

    let mut marks = Vec::new();
    let (y_axis, x_ticks_range) = match kind {
        DistributionKind::Histogram | DistributionKind::HistogramKde => {
            let range = stats::bin_range(&values).ok_or_else(|| LabError::empty("render"))?;
            x_range = range;
            let alpha = if groups.len() > 1 { 0.5 } else { 0.85 };
            let mut top: f64 = 0.0;

            for (i, (_, rows)) in groups.iter().enumerate() {
                let group = pick(&values, rows);
                let mut hist = stats::histogram(&group, bins, range);
                if density {
                    hist = hist.into_density();
                }
                for (b, &count) in hist.counts.iter().enumerate() {
                    top = top.max(count);
                    if count > 0.0 {
                        marks.push(Mark::Rect {
                            from: (hist.edges[b], 0.0),
                            to: (hist.edges[b + 1], count),
                            paint: Paint::Series(i),
                            alpha,
                            outline: Some(Paint::Background),
                        });
                    }
                }
                if kind == DistributionKind::HistogramKde {
                    let curve = stats::kde(&group);
                    let scale = if density {
                        1.0
                    } else {
                        group.len() as f64 * hist.bin_width()
                    };
                    top = top.max(curve.max_y() * scale);
                    extend_range(&mut x_range, &curve);
                    marks.extend(density_marks(&curve, scale, Paint::Series(i), false));
                }
            }
            let label = if density { "Density" } else { "Count" };
            (value_axis(label, 0.0, top, 0.05), x_range)
        }
        DistributionKind::Kde => {
            let mut top: f64 = 0.0;
            for (i, (_, rows)) in groups.iter().enumerate() {
                let group = pick(&values, rows);
                let curve = stats::kde(&group);
                // groups share one normalisation so areas compare
                let weight = group.len() as f64 / total;
                top = top.max(curve.max_y() * weight);
                extend_range(&mut x_range, &curve);
                marks.extend(density_marks(&curve, weight, Paint::Series(i), true));
            }
            (value_axis("Density", 0.0, top, 0.05), x_range)
        }
        DistributionKind::Ecdf => {
            for (i, (_, rows)) in groups.iter().enumerate() {
                let curve = stats::ecdf(&pick(&values, rows));
                let mut steps = Vec::with_capacity(curve.x.len() * 2 + 1);
                let mut previous = 0.0;
                if let Some(&first) = curve.x.first() {
                    steps.push((first, 0.0));
                }
                for (&x, &y) in curve.x.iter().zip(&curve.y) {
                    steps.push((x, previous));
                    steps.push((x, y));
                    previous = y;
                }
                marks.push(Mark::Line {
                    points: steps,
                    paint: Paint::Series(i),
                    alpha: 1.0,
                    width: 1.0,
                });
            }
            let axis = Axis {
                label: "Proportion".to_string(),
                range: (-0.02, 1.02),
                ticks: vec![0.0, 0.25, 0.5, 0.75, 1.0],
                kind: AxisKind::Percent,
            };
            (axis, x_range)
        }
        DistributionKind::Box | DistributionKind::Violin => {
            let slots = Slots { n: 1, horizontal: true };
            if kind == DistributionKind::Box {
                if let Some(summary) = stats::box_stats(&values) {
                    marks.extend(box_marks(&summary, 0.0, &slots, Paint::Series(0)));
                }
            } else {
                let (violin, curve) = violin_marks(&values, 0.0, &slots, Paint::Series(0));
                extend_range(&mut x_range, &curve);
                marks.extend(violin);
            }
            (category_axis("", vec![String::new()]), x_range)
        }
    };

    let mut x_axis = linear_axis(column, x_ticks_range.0, x_ticks_range.1);
    if log_x {
        x_axis.kind = AxisKind::Log10;
    }

    let mut panel = Panel::new(x_axis, y_axis);
    panel.marks = marks;
    panel.legend = legend_for(&groups);
    Ok(single_panel(WIDE, panel, data.row_count()))
}

fn relationship_figure(
    data: &Table,
    x: &str,
    y: &str,
    kind: RelationshipKind,
    hue: Option<&str>,
    alpha: f64,
    point_size: f64,
) -> LabResult<Figure> {
    let xs = numeric_values(data, x)?;
    let ys = numeric_values(data, y)?;
    let groups = series_of(data, hue)?;

    let (x_lo, x_hi) = stats::min_max(&xs).ok_or_else(|| LabError::empty("render"))?;
    let (mut y_lo, mut y_hi) = stats::min_max(&ys).ok_or_else(|| LabError::empty("render"))?;
    let mut marks = Vec::new();

    match kind {
        RelationshipKind::Scatter => {
            for (i, (_, rows)) in groups.iter().enumerate() {
                let points = rows.iter().map(|&r| (xs[r], ys[r])).collect();
                marks.push(Mark::Points {
                    points,
                    paint: Paint::Series(i),
                    alpha,
                    size: point_size,
                });
            }
        }
        RelationshipKind::Line => {
            for (i, (_, rows)) in groups.iter().enumerate() {
                let points = stats::mean_by_x(&pick(&xs, rows), &pick(&ys, rows));
                marks.push(Mark::Line {
                    points,
                    paint: Paint::Series(i),
                    alpha: 1.0,
                    width: 1.0,
                });
            }
        }
        RelationshipKind::Regression => {
            if let Some(fit) = stats::linear_fit(&xs, &ys) {
                const STEPS: usize = 100;
                let grid: Vec<f64> = (0..STEPS)
                    .map(|i| x_lo + (x_hi - x_lo) * i as f64 / (STEPS - 1) as f64)
                    .collect();
                let mut band: Vec<(f64, f64)> = grid.iter().map(|&gx| (gx, fit.predict(gx) + fit.band(gx))).collect();
                band.extend(grid.iter().rev().map(|&gx| (gx, fit.predict(gx) - fit.band(gx))));
                for &(_, by) in &band {
                    y_lo = y_lo.min(by);
                    y_hi = y_hi.max(by);
                }
                marks.push(Mark::Polygon {
                    points: band,
                    paint: Paint::Series(0),
                    alpha: 0.15,
                });
                marks.push(Mark::Points {
                    points: xs.iter().copied().zip(ys.iter().copied()).collect(),
                    paint: Paint::Series(0),
                    alpha,
                    size: point_size,
                });
                marks.push(Mark::Line {
                    points: vec![(x_lo, fit.predict(x_lo)), (x_hi, fit.predict(x_hi))],
                    paint: Paint::Series(0),
                    alpha: 1.0,
                    width: 1.33,
                });
            } else {
                marks.push(Mark::Points {
                    points: xs.iter().copied().zip(ys.iter().copied()).collect(),
                    paint: Paint::Series(0),
                    alpha,
                    size: point_size,
                });
            }
        }
    }

    let mut panel = Panel::new(linear_axis(x, x_lo, x_hi), linear_axis(y, y_lo, y_hi));
    panel.marks = marks;
    panel.legend = legend_for(&groups);
    Ok(single_panel(WIDE, panel, data.row_count()))
}

fn category_figure(
    data: &Table,
    category: &str,
    kind: &CategoryKind,
    top_n: Option<usize>,
    horizontal: bool,
) -> LabResult<Figure> {
    // top-N restriction comes before any aggregation
    let (data, frequency_order): (Table, Vec<String>) = match top_n {
        Some(n) => (data.filter_top_n(category, n)?, data.top_categories(category, n)?),
        None => (
            data.clone(),
            data.value_counts(category)?.into_iter().map(|(c, _)| c).collect(),
        ),
    };
    let cats = category_values(&data, category)?;

    let mut marks = Vec::new();
    let (names, value_axis_out): (Vec<String>, Axis) = match kind {
        CategoryKind::Count => {
            let counts = data.value_counts(category)?;
            let slots = Slots {
                n: counts.len(),
                horizontal,
            };
            let top = counts.iter().map(|(_, c)| *c).max().unwrap_or(0) as f64;
            for (i, (_, count)) in counts.iter().enumerate() {
                let pos = slots.position(i);
                let count = *count as f64;
                marks.push(Mark::Rect {
                    from: slots.point(0.0, pos - BAR_HALF),
                    to: slots.point(count, pos + BAR_HALF),
                    paint: Paint::Series(i),
                    alpha: 1.0,
                    outline: None,
                });
                marks.push(Mark::Text {
                    at: slots.point(count, pos),
                    text: format!("{}", count as usize),
                    paint: Paint::Foreground,
                    anchor: if horizontal { TextAnchor::Right } else { TextAnchor::Above },
                });
            }
            let names = counts.into_iter().map(|(c, _)| c).collect();
            (names, value_axis("count", 0.0, top, 0.12))
        }
        CategoryKind::Bar { value, agg } => {
            let values = numeric_values(&data, value)?;
            let groups = stats::aggregate_by(&cats, &values, *agg);
            let slots = Slots {
                n: groups.len(),
                horizontal,
            };
            let (mut lo, mut hi) = (0.0f64, 0.0f64);
            for (i, (_, aggregate)) in groups.iter().enumerate() {
                let pos = slots.position(i);
                lo = lo.min(*aggregate);
                hi = hi.max(*aggregate);
                marks.push(Mark::Rect {
                    from: slots.point(0.0, pos - BAR_HALF),
                    to: slots.point(*aggregate, pos + BAR_HALF),
                    paint: Paint::Series(i),
                    alpha: 1.0,
                    outline: None,
                });
            }
            let label = match agg {
                Aggregate::Count => format!("count of {}", value),
                other => format!("{} of {}", other.as_str(), value),
            };
            let names = groups.into_iter().map(|(c, _)| c).collect();
            (names, value_axis(label, lo, hi, 0.05))
        }
        CategoryKind::Box { value } | CategoryKind::Violin { value } => {
            let values = numeric_values(&data, value)?;
            let slots = Slots {
                n: frequency_order.len(),
                horizontal,
            };
            let (mut lo, mut hi) = stats::min_max(&values).ok_or_else(|| LabError::empty("render"))?;

            for (i, name) in frequency_order.iter().enumerate() {
                let group: Vec<f64> = cats
                    .iter()
                    .zip(&values)
                    .filter(|(c, _)| **c == name.as_str())
                    .map(|(_, &v)| v)
                    .collect();
                let pos = slots.position(i);
                if matches!(kind, CategoryKind::Box { .. }) {
                    if let Some(summary) = stats::box_stats(&group) {
                        marks.extend(box_marks(&summary, pos, &slots, Paint::Series(i)));
                    }
                } else {
                    let (violin, curve) = violin_marks(&group, pos, &slots, Paint::Series(i));
                    if let Some((c_lo, c_hi)) = stats::min_max(&curve.x) {
                        lo = lo.min(c_lo);
                        hi = hi.max(c_hi);
                    }
                    marks.extend(violin);
                }
            }
            (frequency_order.clone(), linear_axis(value.as_str(), lo, hi))
        }
    };

    let slots = Slots {
        n: names.len(),
        horizontal,
    };
    let (x_axis, y_axis) = slots.axes(slots.axis(category, names), value_axis_out);
    let mut panel = Panel::new(x_axis, y_axis);
    panel.marks = marks;
    Ok(single_panel(WIDE, panel, data.row_count()))
}

fn matrix_figure(data: &Table, columns: &[String], annotate: bool, center_zero: bool) -> LabResult<Figure> {
    let series: Vec<Vec<f64>> = columns
        .iter()
        .map(|c| numeric_values(data, c))
        .collect::<LabResult<_>>()?;
    let k = columns.len();

    let mut corr = vec![vec![f64::NAN; k]; k];
    for i in 0..k {
        for j in 0..k {
            corr[i][j] = stats::pearson(&series[i], &series[j]);
        }
    }

    let finite: Vec<f64> = corr.iter().flatten().copied().filter(|v| v.is_finite()).collect();
    let colorbar = match stats::min_max(&finite) {
        Some((lo, hi)) if center_zero => {
            let m = lo.abs().max(hi.abs()).max(f64::EPSILON);
            ColorBar {
                min: -m,
                max: m,
                center: 0.0,
                ticks: stats::nice_ticks(-m, m, 5),
            }
        }
        Some((lo, hi)) => ColorBar {
            min: lo,
            max: hi,
            center: (lo + hi) / 2.0,
            ticks: stats::nice_ticks(lo, hi, 5),
        },
        None => ColorBar {
            min: -1.0,
            max: 1.0,
            center: 0.0,
            ticks: vec![-1.0, 0.0, 1.0],
        },
    };

    // first column on the top row
    let rows = Slots { n: k, horizontal: true };
    let mut marks = Vec::new();
    for (i, row) in corr.iter().enumerate() {
        let y = rows.position(i);
        for (j, &value) in row.iter().enumerate() {
            let x = j as f64;
            let t = colorbar.normalize(value);
            let paint = if value.is_finite() {
                Paint::Diverging(t)
            } else {
                Paint::Rgb(0xBF, 0xBF, 0xBF)
            };
            // inset leaves a gap between cells
            marks.push(Mark::Rect {
                from: (x - 0.48, y - 0.48),
                to: (x + 0.48, y + 0.48),
                paint,
                alpha: 1.0,
                outline: None,
            });
            if annotate {
                let text_paint = if value.is_finite() && t.abs() > 0.6 {
                    Paint::Rgb(255, 255, 255)
                } else {
                    Paint::Rgb(0x26, 0x26, 0x26)
                };
                marks.push(Mark::Text {
                    at: (x, y),
                    text: if value.is_finite() {
                        format!("{:.2}", value)
                    } else {
                        "nan".to_string()
                    },
                    paint: text_paint,
                    anchor: TextAnchor::Center,
                });
            }
        }
    }

    let mut panel = Panel::new(
        category_axis("", columns.to_vec()),
        rows.axis("", columns.to_vec()),
    );
    panel.marks = marks;

    let mut figure = single_panel(HEATMAP, panel, data.row_count());
    figure.colorbar = Some(colorbar);
    Ok(figure)
}

fn pairplot_figure(sample: &Table, columns: &[String], hue: Option<&str>) -> LabResult<Figure> {
    let vars: Vec<Vec<f64>> = columns
        .iter()
        .map(|c| numeric_values(sample, c))
        .collect::<LabResult<_>>()?;
    let groups = series_of(sample, hue)?;
    let k = columns.len();
    let total = sample.row_count() as f64;

    let extents: Vec<(f64, f64)> = vars
        .iter()
        .map(|v| stats::min_max(v).ok_or_else(|| LabError::empty("render")))
        .collect::<LabResult<_>>()?;

    let mut panels = Vec::new();
    for i in 0..k {
        for j in 0..=i {
            let x_label = if i == k - 1 { columns[j].as_str() } else { "" };
            let y_label = if j == 0 { columns[i].as_str() } else { "" };
            let (x_lo, x_hi) = extents[j];

            let panel = if i == j {
                let mut marks = Vec::new();
                let mut top: f64 = 0.0;
                let mut range = (x_lo, x_hi);
                for (g, (_, rows)) in groups.iter().enumerate() {
                    let group = pick(&vars[j], rows);
                    let curve = stats::kde(&group);
                    let weight = group.len() as f64 / total;
                    top = top.max(curve.max_y() * weight);
                    extend_range(&mut range, &curve);
                    marks.extend(density_marks(&curve, weight, Paint::Series(g), true));
                }
                let mut panel = Panel::new(linear_axis(x_label, range.0, range.1), value_axis(y_label, 0.0, top, 0.05));
                panel.marks = marks;
                panel
            } else {
                let (y_lo, y_hi) = extents[i];
                let marks = groups
                    .iter()
                    .enumerate()
                    .map(|(g, (_, rows))| Mark::Points {
                        points: rows.iter().map(|&r| (vars[j][r], vars[i][r])).collect(),
                        paint: Paint::Series(g),
                        alpha: PAIR_ALPHA,
                        size: PAIR_POINT_SIZE,
                    })
                    .collect();
                let mut panel = Panel::new(linear_axis(x_label, x_lo, x_hi), linear_axis(y_label, y_lo, y_hi));
                panel.marks = marks;
                panel
            };
            panels.push(panel.at(i, j));
        }
    }

    if let Some(first) = panels.first_mut() {
        first.legend = legend_for(&groups);
    }

    let side = (PAIR_CELL_IN * k as f64).clamp(5.0, MAX_GRID_IN);
    Ok(Figure {
        title: String::new(),
        width_in: side,
        height_in: side,
        grid: (k, k),
        panels,
        colorbar: None,
        rows_used: sample.row_count(),
    })
}

fn overview_figure(data: &Table, columns: &[String], kde: bool) -> LabResult<Figure> {
    let mut panels = Vec::with_capacity(columns.len());
    for (j, name) in columns.iter().enumerate() {
        let values = numeric_values(data, name)?;
        let range = stats::bin_range(&values).ok_or_else(|| LabError::empty("render"))?;
        let hist = stats::histogram(&values, OVERVIEW_BINS, range).into_density();
        let mut top = hist.counts.iter().copied().fold(0.0, f64::max);
        let mut x_range = range;

        let mut marks: Vec<Mark> = hist
            .counts
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c > 0.0)
            .map(|(b, &c)| Mark::Rect {
                from: (hist.edges[b], 0.0),
                to: (hist.edges[b + 1], c),
                paint: Paint::Series(0),
                alpha: 0.8,
                outline: Some(Paint::Background),
            })
            .collect();

        if kde {
            let curve = stats::kde(&values);
            top = top.max(curve.max_y());
            extend_range(&mut x_range, &curve);
            marks.extend(density_marks(&curve, 1.0, Paint::Series(1), false));
        }

        let y_label = if j == 0 { "Density" } else { "" };
        let mut panel = Panel::new(linear_axis("", x_range.0, x_range.1), value_axis(y_label, 0.0, top, 0.05))
            .at(0, j)
            .titled(name.as_str());
        panel.marks = marks;
        panels.push(panel);
    }

    Ok(Figure {
        title: String::new(),
        width_in: (OVERVIEW_CELL_IN * columns.len() as f64).min(MAX_STRIP_IN),
        height_in: OVERVIEW_CELL_IN,
        grid: (1, columns.len()),
        panels,
        colorbar: None,
        rows_used: data.row_count(),
    })
}

fn boxes_figure(data: &Table, columns: &[String]) -> LabResult<Figure> {
    let slots = Slots {
        n: columns.len(),
        horizontal: false,
    };
    let mut marks = Vec::new();
    let mut extent: Option<(f64, f64)> = None;

    for (i, name) in columns.iter().enumerate() {
        let values = numeric_values(data, name)?;
        if let Some((lo, hi)) = stats::min_max(&values) {
            extent = Some(match extent {
                Some((a, b)) => (a.min(lo), b.max(hi)),
                None => (lo, hi),
            });
        }
        if let Some(summary) = stats::box_stats(&values) {
            marks.extend(box_marks(&summary, slots.position(i), &slots, Paint::Series(i)));
        }
    }

    let (lo, hi) = extent.ok_or_else(|| LabError::empty("render"))?;
    let (x_axis, y_axis) = slots.axes(slots.axis("", columns.to_vec()), linear_axis("", lo, hi));
    let mut panel = Panel::new(x_axis, y_axis);
    panel.marks = marks;
    Ok(single_panel(WIDE, panel, data.row_count()))
}
