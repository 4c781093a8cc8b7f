//! Code listings
//!
//! Every rendered chart comes with a listing that reproduces it. Each family
//! has its own template; [`crate::runtime::execute_listing`] reads a listing
//! back through the parser and renders the same pixels.

use crate::parser::lexer::quote;
use crate::request::{CategoryKind, DistributionKind, MultiView, PlotRequest, RelationshipKind};
use crate::style::StyleOptions;
use std::fmt;

/// Re-executable text reproducing one chart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeListing(String);

impl CodeListing {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CodeListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CodeListing {
    fn from(text: String) -> Self {
        CodeListing(text)
    }
}

/// Emit the listing for `request` drawn with `style`
pub fn emit(request: &PlotRequest, style: &StyleOptions) -> CodeListing {
    let chart = match request {
        PlotRequest::Distribution {
            column,
            kind,
            hue,
            bins,
            log_x,
            density,
        } => distribution_call(column, *kind, hue.as_deref(), *bins, *log_x, *density),
        PlotRequest::Relationship {
            x,
            y,
            kind,
            hue,
            alpha,
            point_size,
        } => relationship_call(x, y, *kind, hue.as_deref())
            .number("alpha", *alpha)
            .number("size", *point_size),
        PlotRequest::Category {
            category,
            kind,
            top_n,
            horizontal,
        } => category_call(category, kind, *top_n, *horizontal),
        PlotRequest::Matrix {
            columns,
            annotate,
            center_zero,
        } => Call::new("heatmap")
            .list("columns", columns)
            .flag("annotate", *annotate)
            .flag("center", *center_zero),
        PlotRequest::MultiVariable { columns, view } => multi_call(columns, view),
    };
    CodeListing(format!("df\n  | {}\n  | {}\n", theme_call(style), chart))
}

/// Renders `name(arg: value, ...)` with arguments in insertion order
struct Call {
    name: &'static str,
    args: Vec<String>,
}

impl Call {
    fn new(name: &'static str) -> Self {
        Call { name, args: Vec::new() }
    }

    fn text(mut self, key: &str, value: &str) -> Self {
        self.args.push(format!("{}: {}", key, quote(value)));
        self
    }

    fn opt_text(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.text(key, v),
            None => self,
        }
    }

    fn number(mut self, key: &str, value: f64) -> Self {
        self.args.push(format!("{}: {}", key, value));
        self
    }

    fn whole(mut self, key: &str, value: u64) -> Self {
        self.args.push(format!("{}: {}", key, value));
        self
    }

    fn flag(mut self, key: &str, value: bool) -> Self {
        self.args.push(format!("{}: {}", key, value));
        self
    }

    fn list(mut self, key: &str, values: &[String]) -> Self {
        let items: Vec<String> = values.iter().map(|v| quote(v)).collect();
        self.args.push(format!("{}: [{}]", key, items.join(", ")));
        self
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.args.join(", "))
    }
}

fn theme_call(style: &StyleOptions) -> Call {
    Call::new("theme")
        .text("palette", style.palette.as_str())
        .text("context", style.context.as_str())
        .text("grid", style.grid.as_str())
        .flag("dark", style.dark_mode)
        .whole("dpi", u64::from(style.dpi))
}

fn distribution_call(
    column: &str,
    kind: DistributionKind,
    hue: Option<&str>,
    bins: usize,
    log_x: bool,
    density: bool,
) -> Call {
    let name = match kind {
        DistributionKind::Histogram | DistributionKind::HistogramKde => "histogram",
        DistributionKind::Kde => "kde",
        DistributionKind::Ecdf => "ecdf",
        DistributionKind::Box => "boxplot",
        DistributionKind::Violin => "violin",
    };
    let call = Call::new(name).text("x", column);
    match kind {
        DistributionKind::Box | DistributionKind::Violin => call,
        DistributionKind::Histogram | DistributionKind::HistogramKde => call
            .opt_text("hue", hue)
            .whole("bins", bins as u64)
            .flag("kde", kind == DistributionKind::HistogramKde)
            .flag("density", density)
            .flag("log_x", log_x),
        DistributionKind::Kde | DistributionKind::Ecdf => call.opt_text("hue", hue).flag("log_x", log_x),
    }
}

fn relationship_call(x: &str, y: &str, kind: RelationshipKind, hue: Option<&str>) -> Call {
    let name = match kind {
        RelationshipKind::Scatter => "scatter",
        RelationshipKind::Line => "lineplot",
        RelationshipKind::Regression => "regplot",
    };
    Call::new(name).text("x", x).text("y", y).opt_text("hue", hue)
}

fn category_call(category: &str, kind: &CategoryKind, top_n: Option<usize>, horizontal: bool) -> Call {
    let call = match kind {
        CategoryKind::Count => Call::new("countplot").text("x", category),
        CategoryKind::Bar { value, agg } => Call::new("barplot")
            .text("x", category)
            .text("y", value)
            .text("agg", agg.as_str()),
        CategoryKind::Box { value } => Call::new("catbox").text("x", category).text("y", value),
        CategoryKind::Violin { value } => Call::new("catviolin").text("x", category).text("y", value),
    };
    let call = match top_n {
        Some(n) => call.whole("top", n as u64),
        None => call,
    };
    call.flag("horizontal", horizontal)
}

fn multi_call(columns: &[String], view: &MultiView) -> Call {
    match view {
        MultiView::Pairplot { hue, sample_size, seed } => {
            let call = Call::new("pairplot")
                .list("columns", columns)
                .opt_text("hue", hue.as_deref())
                .whole("sample", *sample_size as u64);
            match seed {
                Some(seed) => call.whole("seed", *seed),
                None => call,
            }
        }
        MultiView::Overview { kde } => Call::new("overview").list("columns", columns).flag("kde", *kde),
        MultiView::Boxes => Call::new("boxes").list("columns", columns),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_listing;
    use crate::request::Aggregate;
    use crate::resolve::resolve_pipeline;
    use crate::style::{GridStyle, Palette};

    fn read_back(listing: &CodeListing) -> (PlotRequest, StyleOptions) {
        resolve_pipeline(&parse_listing(listing.as_str()).unwrap()).unwrap()
    }

    #[test]
    fn test_scatter_listing_text() {
        let request = PlotRequest::relationship("x", "y", RelationshipKind::Scatter).with_hue("g");
        let listing = emit(&request, &StyleOptions::default());
        assert_eq!(
            listing.as_str(),
            "df\n  | theme(palette: \"deep\", context: \"notebook\", grid: \"whitegrid\", dark: false, dpi: 300)\n  | scatter(x: \"x\", y: \"y\", hue: \"g\", alpha: 0.7, size: 70)\n"
        );
    }

    #[test]
    fn test_every_family_reads_back() {
        let requests = vec![
            PlotRequest::distribution("a", DistributionKind::Histogram),
            PlotRequest::distribution("a", DistributionKind::HistogramKde).with_hue("g"),
            PlotRequest::distribution("a", DistributionKind::Kde),
            PlotRequest::distribution("a", DistributionKind::Ecdf).with_hue("g"),
            PlotRequest::distribution("a", DistributionKind::Box),
            PlotRequest::distribution("a", DistributionKind::Violin),
            PlotRequest::relationship("a", "b", RelationshipKind::Line).with_hue("g"),
            PlotRequest::relationship("a", "b", RelationshipKind::Regression),
            PlotRequest::category("g", CategoryKind::Count),
            PlotRequest::category(
                "g",
                CategoryKind::Bar {
                    value: "v".to_string(),
                    agg: Aggregate::Count,
                },
            ),
            PlotRequest::Category {
                category: "g".to_string(),
                kind: CategoryKind::Violin { value: "v".to_string() },
                top_n: None,
                horizontal: false,
            },
            PlotRequest::category("g", CategoryKind::Box { value: "v".to_string() }),
            PlotRequest::matrix(["a", "b", "c"]),
            PlotRequest::pairplot(["a", "b"]).with_hue("g"),
            PlotRequest::pairplot(["a", "b"]).with_seed(7),
            PlotRequest::MultiVariable {
                columns: vec!["a".to_string()],
                view: MultiView::Overview { kde: false },
            },
            PlotRequest::MultiVariable {
                columns: vec!["a".to_string(), "b".to_string()],
                view: MultiView::Boxes,
            },
        ];
        let style = StyleOptions {
            palette: Palette::Set2,
            grid: GridStyle::Ticks,
            dark_mode: true,
            ..StyleOptions::default()
        }
        .with_dpi(96);

        for request in requests {
            let listing = emit(&request, &style);
            assert_eq!(read_back(&listing), (request, style.clone()), "{}", listing);
        }
    }

    #[test]
    fn test_awkward_names_are_quoted() {
        let request = PlotRequest::distribution("price \"usd\" \\ net", DistributionKind::Kde);
        let listing = emit(&request, &StyleOptions::default());
        assert_eq!(read_back(&listing).0, request);
    }

    #[test]
    fn test_fractional_values_read_back_exactly() {
        let request = PlotRequest::Relationship {
            x: "a".to_string(),
            y: "b".to_string(),
            kind: RelationshipKind::Scatter,
            hue: None,
            alpha: 0.1 + 0.2,
            point_size: 12.345678901234,
        };
        let listing = emit(&request, &StyleOptions::default());
        assert_eq!(read_back(&listing).0, request);
    }
}
