//! Chart requests
//!
//! A [`PlotRequest`] names one chart family, the columns it reads and the
//! family's options. [`PlotRequest::validate`] checks it against a table
//! before anything is drawn.

use crate::data::{ColumnKind, Table};
use crate::error::{LabError, LabResult};
pub use crate::stats::Aggregate;

pub const MAX_BINS: usize = 200;

pub(crate) const DEFAULT_BINS: usize = 30;
pub(crate) const DEFAULT_ALPHA: f64 = 0.7;
pub(crate) const DEFAULT_POINT_SIZE: f64 = 70.0;
pub(crate) const DEFAULT_TOP_N: usize = 8;
pub(crate) const DEFAULT_SAMPLE_SIZE: usize = 400;

/// Largest whole number a listing carries exactly (2^53)
pub const MAX_WHOLE: u64 = 1 << 53;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionKind {
    Histogram,
    Kde,
    HistogramKde,
    Box,
    Violin,
    Ecdf,
}

impl DistributionKind {
    pub fn label(&self) -> &'static str {
        match self {
            DistributionKind::Histogram => "Histogram",
            DistributionKind::Kde => "KDE",
            DistributionKind::HistogramKde => "Histogram + KDE",
            DistributionKind::Box => "Box",
            DistributionKind::Violin => "Violin",
            DistributionKind::Ecdf => "ECDF",
        }
    }

    pub fn allows_hue(&self) -> bool {
        !matches!(self, DistributionKind::Box | DistributionKind::Violin)
    }

    pub fn uses_bins(&self) -> bool {
        matches!(self, DistributionKind::Histogram | DistributionKind::HistogramKde)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipKind {
    Scatter,
    Line,
    Regression,
}

impl RelationshipKind {
    pub fn label(&self) -> &'static str {
        match self {
            RelationshipKind::Scatter => "Scatter",
            RelationshipKind::Line => "Line",
            RelationshipKind::Regression => "Regression",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryKind {
    Count,
    Bar { value: String, agg: Aggregate },
    Box { value: String },
    Violin { value: String },
}

impl CategoryKind {
    pub fn label(&self) -> &'static str {
        match self {
            CategoryKind::Count => "Count",
            CategoryKind::Bar { .. } => "Bar",
            CategoryKind::Box { .. } => "Box",
            CategoryKind::Violin { .. } => "Violin",
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            CategoryKind::Count => None,
            CategoryKind::Bar { value, .. } | CategoryKind::Box { value } | CategoryKind::Violin { value } => {
                Some(value)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultiView {
    /// Lower-triangle scatter grid with densities on the diagonal
    Pairplot {
        hue: Option<String>,
        sample_size: usize,
        /// Sampling seed; the render seed is used when unset
        seed: Option<u64>,
    },
    /// One density histogram per column
    Overview { kde: bool },
    /// Side-by-side box plots
    Boxes,
}

/// One chart, by family
#[derive(Debug, Clone, PartialEq)]
pub enum PlotRequest {
    Distribution {
        column: String,
        kind: DistributionKind,
        hue: Option<String>,
        bins: usize,
        log_x: bool,
        density: bool,
    },
    Relationship {
        x: String,
        y: String,
        kind: RelationshipKind,
        hue: Option<String>,
        alpha: f64,
        /// Marker area in pt²
        point_size: f64,
    },
    Category {
        category: String,
        kind: CategoryKind,
        top_n: Option<usize>,
        horizontal: bool,
    },
    Matrix {
        columns: Vec<String>,
        annotate: bool,
        center_zero: bool,
    },
    MultiVariable {
        columns: Vec<String>,
        view: MultiView,
    },
}

impl PlotRequest {
    pub fn distribution(column: impl Into<String>, kind: DistributionKind) -> Self {
        PlotRequest::Distribution {
            column: column.into(),
            kind,
            hue: None,
            bins: DEFAULT_BINS,
            log_x: false,
            density: false,
        }
    }

    pub fn relationship(x: impl Into<String>, y: impl Into<String>, kind: RelationshipKind) -> Self {
        PlotRequest::Relationship {
            x: x.into(),
            y: y.into(),
            kind,
            hue: None,
            alpha: DEFAULT_ALPHA,
            point_size: DEFAULT_POINT_SIZE,
        }
    }

    pub fn category(category: impl Into<String>, kind: CategoryKind) -> Self {
        PlotRequest::Category {
            category: category.into(),
            kind,
            top_n: Some(DEFAULT_TOP_N),
            horizontal: true,
        }
    }

    pub fn matrix<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        PlotRequest::Matrix {
            columns: columns.into_iter().map(Into::into).collect(),
            annotate: true,
            center_zero: true,
        }
    }

    pub fn pairplot<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        PlotRequest::MultiVariable {
            columns: columns.into_iter().map(Into::into).collect(),
            view: MultiView::Pairplot {
                hue: None,
                sample_size: DEFAULT_SAMPLE_SIZE,
                seed: None,
            },
        }
    }

    /// Pin the row-sampling seed of a pairplot
    pub fn with_seed(mut self, value: u64) -> Self {
        if let PlotRequest::MultiVariable {
            view: MultiView::Pairplot { seed, .. },
            ..
        } = &mut self
        {
            *seed = Some(value);
        }
        self
    }

    /// Pin `value` as the sampling seed unless one is already set
    pub fn with_default_seed(self, value: u64) -> Self {
        match self.sample_seed() {
            Some(_) => self,
            None => self.with_seed(value),
        }
    }

    pub fn sample_seed(&self) -> Option<u64> {
        match self {
            PlotRequest::MultiVariable {
                view: MultiView::Pairplot { seed, .. },
                ..
            } => *seed,
            _ => None,
        }
    }

    /// Set the colour grouping column on families that take one
    pub fn with_hue(mut self, column: impl Into<String>) -> Self {
        match &mut self {
            PlotRequest::Distribution { hue, .. }
            | PlotRequest::Relationship { hue, .. }
            | PlotRequest::MultiVariable {
                view: MultiView::Pairplot { hue, .. },
                ..
            } => *hue = Some(column.into()),
            _ => {}
        }
        self
    }

    /// Chart family name
    pub fn family(&self) -> &'static str {
        match self {
            PlotRequest::Distribution { .. } => "Distribution",
            PlotRequest::Relationship { .. } => "Relationship",
            PlotRequest::Category { .. } => "Category",
            PlotRequest::Matrix { .. } => "Matrix",
            PlotRequest::MultiVariable { .. } => "Multi-variable",
        }
    }

    pub fn title(&self) -> String {
        match self {
            PlotRequest::Distribution { column, kind, .. } => format!("{} for {}", kind.label(), column),
            PlotRequest::Relationship { x, y, kind, .. } => format!("{}: {} vs {}", kind.label(), y, x),
            PlotRequest::Category { category, kind, .. } => match kind {
                CategoryKind::Bar { value, agg } => {
                    format!("{} of {} by {}", capitalize(agg.as_str()), value, category)
                }
                other => format!("{} for {}", other.label(), category),
            },
            PlotRequest::Matrix { .. } => "Correlation heatmap".to_string(),
            PlotRequest::MultiVariable { view, .. } => match view {
                MultiView::Pairplot { .. } => "Pairplot".to_string(),
                MultiView::Overview { .. } => "Numeric overview".to_string(),
                MultiView::Boxes => "Box plots".to_string(),
            },
        }
    }

    /// One-sentence reading guide shown next to the chart
    pub fn description(&self) -> &'static str {
        match self {
            PlotRequest::Distribution { .. } => {
                "Distribution pattern: shape, spread, and tails of a single numeric column."
            }
            PlotRequest::Relationship { .. } => "Relationship pattern: how two numeric variables move together.",
            PlotRequest::Category { .. } => "Category pattern: compare distributions or means across groups.",
            PlotRequest::Matrix { .. } => "Matrix pattern: scan many pairwise relationships at once.",
            PlotRequest::MultiVariable { view, .. } => match view {
                MultiView::Pairplot { .. } => "Multi-variable view: every pair of variables in one grid.",
                MultiView::Overview { .. } => "Multi-variable view: the distribution of each numeric column side by side.",
                MultiView::Boxes => "Multi-variable view: medians and spread of several columns on one axis.",
            },
        }
    }

    /// Every column the request reads, in first-mention order without duplicates
    pub fn columns(&self) -> Vec<&str> {
        let names: Vec<&str> = match self {
            PlotRequest::Distribution { column, hue, .. } => {
                std::iter::once(column.as_str()).chain(hue.as_deref()).collect()
            }
            PlotRequest::Relationship { x, y, hue, .. } => {
                [x.as_str(), y.as_str()].into_iter().chain(hue.as_deref()).collect()
            }
            PlotRequest::Category { category, kind, .. } => {
                std::iter::once(category.as_str()).chain(kind.value()).collect()
            }
            PlotRequest::Matrix { columns, .. } => columns.iter().map(String::as_str).collect(),
            PlotRequest::MultiVariable { columns, view } => {
                let hue = match view {
                    MultiView::Pairplot { hue, .. } => hue.as_deref(),
                    _ => None,
                };
                columns.iter().map(String::as_str).chain(hue).collect()
            }
        };
        let mut out: Vec<&str> = Vec::new();
        for name in names {
            if !out.contains(&name) {
                out.push(name);
            }
        }
        out
    }

    /// Check columns and option ranges against `table`
    pub fn validate(&self, table: &Table) -> LabResult<()> {
        match self {
            PlotRequest::Distribution {
                column,
                kind,
                hue,
                bins,
                log_x,
                ..
            } => {
                require(table, "column", column, ColumnKind::Numeric)?;
                if let Some(hue) = hue {
                    if !kind.allows_hue() {
                        return Err(LabError::config(
                            "hue",
                            format!("{} plots do not support colour grouping", kind.label()),
                        ));
                    }
                    require(table, "hue", hue, ColumnKind::Categorical)?;
                }
                if !(1..=MAX_BINS).contains(bins) {
                    return Err(LabError::config("bins", format!("must be between 1 and {}", MAX_BINS)));
                }
                if *log_x {
                    if matches!(kind, DistributionKind::Box | DistributionKind::Violin) {
                        return Err(LabError::config("log_x", format!("not available for {} plots", kind.label())));
                    }
                    let non_positive = table
                        .column(column)
                        .and_then(|c| c.as_numeric())
                        .map(|values| values.iter().flatten().any(|&v| v <= 0.0))
                        .unwrap_or(false);
                    if non_positive {
                        return Err(LabError::config(
                            "log_x",
                            format!("column '{}' has values <= 0", column),
                        ));
                    }
                }
                Ok(())
            }
            PlotRequest::Relationship {
                x,
                y,
                kind,
                hue,
                alpha,
                point_size,
            } => {
                require(table, "x", x, ColumnKind::Numeric)?;
                require(table, "y", y, ColumnKind::Numeric)?;
                if x == y {
                    return Err(LabError::config("y", "x and y must be different columns"));
                }
                if let Some(hue) = hue {
                    if *kind == RelationshipKind::Regression {
                        return Err(LabError::config("hue", "regression plots do not support colour grouping"));
                    }
                    require(table, "hue", hue, ColumnKind::Categorical)?;
                }
                if !(*alpha > 0.0 && *alpha <= 1.0) {
                    return Err(LabError::config("alpha", "must be in (0, 1]"));
                }
                if !(point_size.is_finite() && *point_size > 0.0) {
                    return Err(LabError::config("size", "must be positive"));
                }
                Ok(())
            }
            PlotRequest::Category {
                category, kind, top_n, ..
            } => {
                require(table, "category", category, ColumnKind::Categorical)?;
                if let Some(value) = kind.value() {
                    require(table, "value", value, ColumnKind::Numeric)?;
                }
                match top_n {
                    Some(0) => return Err(LabError::config("top", "must be at least 1")),
                    Some(n) if *n as u64 > MAX_WHOLE => {
                        return Err(LabError::config("top", format!("must be at most {}", MAX_WHOLE)))
                    }
                    _ => {}
                }
                Ok(())
            }
            PlotRequest::Matrix { columns, .. } => {
                require_distinct_numeric(table, columns, 2)
            }
            PlotRequest::MultiVariable { columns, view } => match view {
                MultiView::Pairplot { hue, sample_size, seed } => {
                    require_distinct_numeric(table, columns, 2)?;
                    if let Some(hue) = hue {
                        require(table, "hue", hue, ColumnKind::Categorical)?;
                    }
                    if *sample_size == 0 {
                        return Err(LabError::config("sample", "must be at least 1"));
                    }
                    if *sample_size as u64 > MAX_WHOLE {
                        return Err(LabError::config("sample", format!("must be at most {}", MAX_WHOLE)));
                    }
                    if seed.is_some_and(|s| s > MAX_WHOLE) {
                        return Err(LabError::config("seed", format!("must be at most {}", MAX_WHOLE)));
                    }
                    Ok(())
                }
                MultiView::Overview { .. } | MultiView::Boxes => require_distinct_numeric(table, columns, 1),
            },
        }
    }
}

fn require(table: &Table, field: &str, name: &str, kind: ColumnKind) -> LabResult<()> {
    let column = table
        .column(name)
        .ok_or_else(|| LabError::config(field, format!("column '{}' not found", name)))?;
    if column.kind() != kind {
        return Err(LabError::config(
            field,
            format!("column '{}' is {}, expected {}", name, column.kind().as_str(), kind.as_str()),
        ));
    }
    Ok(())
}

fn require_distinct_numeric(table: &Table, columns: &[String], min: usize) -> LabResult<()> {
    if columns.len() < min {
        return Err(LabError::config(
            "columns",
            format!("select at least {} numeric column{}", min, if min == 1 { "" } else { "s" }),
        ));
    }
    for (i, name) in columns.iter().enumerate() {
        if columns[..i].contains(name) {
            return Err(LabError::config("columns", format!("column '{}' is listed twice", name)));
        }
        require(table, "columns", name, ColumnKind::Numeric)?;
    }
    Ok(())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
