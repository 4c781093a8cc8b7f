//! Listing resolution
//!
//! Gives parsed listing commands their meaning: one optional `theme(...)`
//! command becomes [`StyleOptions`], exactly one chart command becomes a
//! [`PlotRequest`]. Arguments left out take the same defaults as the
//! request builders, except `top`, whose absence means "all categories".

use crate::error::{LabError, LabResult};
use crate::parser::{Argument, Command, Pipeline, Value};
use crate::request::{
    Aggregate, CategoryKind, DistributionKind, MultiView, PlotRequest, RelationshipKind, DEFAULT_ALPHA,
    DEFAULT_BINS, DEFAULT_POINT_SIZE, DEFAULT_SAMPLE_SIZE, MAX_WHOLE,
};
use crate::style::{validate_dpi, StyleOptions};

/// Every chart command the listing language knows
pub const CHART_COMMANDS: [&str; 16] = [
    "histogram",
    "kde",
    "ecdf",
    "boxplot",
    "violin",
    "scatter",
    "lineplot",
    "regplot",
    "countplot",
    "barplot",
    "catbox",
    "catviolin",
    "heatmap",
    "pairplot",
    "overview",
    "boxes",
];

/// Turn a parsed listing into the request and style it describes
pub fn resolve_pipeline(pipeline: &Pipeline) -> LabResult<(PlotRequest, StyleOptions)> {
    let mut style = None;
    let mut request = None;

    for command in &pipeline.commands {
        if command.name == "theme" {
            if style.is_some() {
                return Err(LabError::config("theme", "only one theme command is allowed"));
            }
            style = Some(resolve_theme(command)?);
        } else {
            if request.is_some() {
                return Err(LabError::config(
                    "command",
                    format!("only one chart command is allowed, found another '{}'", command.name),
                ));
            }
            request = Some(resolve_chart(command)?);
        }
    }

    let request = request.ok_or_else(|| LabError::config("command", "listing has no chart command"))?;
    Ok((request, style.unwrap_or_default()))
}

fn resolve_theme(command: &Command) -> LabResult<StyleOptions> {
    let mut args = Args::new(command)?;
    let mut style = StyleOptions::default();
    if let Some(name) = args.string("palette")? {
        style.palette = name.parse()?;
    }
    if let Some(name) = args.string("context")? {
        style.context = name.parse()?;
    }
    if let Some(name) = args.string("grid")? {
        style.grid = name.parse()?;
    }
    if let Some(dark) = args.boolean("dark")? {
        style.dark_mode = dark;
    }
    if let Some(dpi) = args.whole("dpi")? {
        let dpi = u32::try_from(dpi).map_err(|_| LabError::config("dpi", "value is too large"))?;
        validate_dpi(dpi)?;
        style.dpi = dpi;
    }
    args.finish()?;
    Ok(style)
}

fn resolve_chart(command: &Command) -> LabResult<PlotRequest> {
    let mut args = Args::new(command)?;
    let request = match command.name.as_str() {
        "histogram" => {
            let column = args.required_string("x")?;
            let kde = args.boolean("kde")?.unwrap_or(false);
            PlotRequest::Distribution {
                column,
                kind: if kde {
                    DistributionKind::HistogramKde
                } else {
                    DistributionKind::Histogram
                },
                hue: args.string("hue")?,
                bins: args.size("bins")?.unwrap_or(DEFAULT_BINS),
                log_x: args.boolean("log_x")?.unwrap_or(false),
                density: args.boolean("density")?.unwrap_or(false),
            }
        }
        "kde" | "ecdf" => PlotRequest::Distribution {
            column: args.required_string("x")?,
            kind: if command.name == "kde" {
                DistributionKind::Kde
            } else {
                DistributionKind::Ecdf
            },
            hue: args.string("hue")?,
            bins: DEFAULT_BINS,
            log_x: args.boolean("log_x")?.unwrap_or(false),
            density: false,
        },
        "boxplot" | "violin" => PlotRequest::Distribution {
            column: args.required_string("x")?,
            kind: if command.name == "boxplot" {
                DistributionKind::Box
            } else {
                DistributionKind::Violin
            },
            hue: None,
            bins: DEFAULT_BINS,
            log_x: false,
            density: false,
        },
        "scatter" | "lineplot" | "regplot" => {
            let kind = match command.name.as_str() {
                "scatter" => RelationshipKind::Scatter,
                "lineplot" => RelationshipKind::Line,
                _ => RelationshipKind::Regression,
            };
            let x = args.required_string("x")?;
            let y = args.required_string("y")?;
            let hue = if kind == RelationshipKind::Regression {
                None
            } else {
                args.string("hue")?
            };
            PlotRequest::Relationship {
                x,
                y,
                kind,
                hue,
                alpha: args.number("alpha")?.unwrap_or(DEFAULT_ALPHA),
                point_size: args.number("size")?.unwrap_or(DEFAULT_POINT_SIZE),
            }
        }
        "countplot" | "barplot" | "catbox" | "catviolin" => {
            let category = args.required_string("x")?;
            let kind = match command.name.as_str() {
                "countplot" => CategoryKind::Count,
                "barplot" => {
                    let value = args.required_string("y")?;
                    let agg = match args.string("agg")? {
                        Some(name) => parse_aggregate(&name)?,
                        None => Aggregate::default(),
                    };
                    CategoryKind::Bar { value, agg }
                }
                "catbox" => CategoryKind::Box {
                    value: args.required_string("y")?,
                },
                _ => CategoryKind::Violin {
                    value: args.required_string("y")?,
                },
            };
            PlotRequest::Category {
                category,
                kind,
                top_n: args.size("top")?,
                horizontal: args.boolean("horizontal")?.unwrap_or(true),
            }
        }
        "heatmap" => PlotRequest::Matrix {
            columns: args.required_list("columns")?,
            annotate: args.boolean("annotate")?.unwrap_or(true),
            center_zero: args.boolean("center")?.unwrap_or(true),
        },
        "pairplot" => PlotRequest::MultiVariable {
            columns: args.required_list("columns")?,
            view: MultiView::Pairplot {
                hue: args.string("hue")?,
                sample_size: args.size("sample")?.unwrap_or(DEFAULT_SAMPLE_SIZE),
                seed: args.whole("seed")?,
            },
        },
        "overview" => PlotRequest::MultiVariable {
            columns: args.required_list("columns")?,
            view: MultiView::Overview {
                kde: args.boolean("kde")?.unwrap_or(true),
            },
        },
        "boxes" => PlotRequest::MultiVariable {
            columns: args.required_list("columns")?,
            view: MultiView::Boxes,
        },
        other => {
            return Err(LabError::config(
                "command",
                format!("unknown command '{}' (expected theme or one of: {})", other, CHART_COMMANDS.join(", ")),
            ))
        }
    };
    args.finish()?;
    Ok(request)
}

fn parse_aggregate(name: &str) -> LabResult<Aggregate> {
    Aggregate::ALL
        .iter()
        .copied()
        .find(|a| a.as_str().eq_ignore_ascii_case(name))
        .ok_or_else(|| LabError::config("agg", format!("unknown aggregate '{}' (expected mean, sum or count)", name)))
}

/// Typed access to a command's arguments; tracks which ones were read so
/// that leftovers can be reported as unknown
struct Args<'a> {
    command: &'a str,
    args: &'a [Argument],
    used: Vec<bool>,
}

impl<'a> Args<'a> {
    fn new(command: &'a Command) -> LabResult<Self> {
        for (i, arg) in command.args.iter().enumerate() {
            if command.args[..i].iter().any(|a| a.name == arg.name) {
                return Err(LabError::config(
                    arg.name.as_str(),
                    format!("argument given twice in '{}'", command.name),
                ));
            }
        }
        Ok(Args {
            command: &command.name,
            args: &command.args,
            used: vec![false; command.args.len()],
        })
    }

    fn take(&mut self, name: &str) -> Option<&'a Value> {
        let index = self.args.iter().position(|a| a.name == name)?;
        self.used[index] = true;
        Some(&self.args[index].value)
    }

    fn mismatch(&self, name: &str, expected: &str, found: &Value) -> LabError {
        LabError::config(
            name,
            format!("expected a {} in '{}', found a {}", expected, self.command, found.type_name()),
        )
    }

    fn string(&mut self, name: &str) -> LabResult<Option<String>> {
        match self.take(name) {
            None => Ok(None),
            Some(Value::Str(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.mismatch(name, "string", other)),
        }
    }

    fn required_string(&mut self, name: &str) -> LabResult<String> {
        self.string(name)?
            .ok_or_else(|| LabError::config(name, format!("required by '{}'", self.command)))
    }

    fn number(&mut self, name: &str) -> LabResult<Option<f64>> {
        match self.take(name) {
            None => Ok(None),
            Some(Value::Number(n)) => Ok(Some(*n)),
            Some(other) => Err(self.mismatch(name, "number", other)),
        }
    }

    fn whole(&mut self, name: &str) -> LabResult<Option<u64>> {
        match self.number(name)? {
            None => Ok(None),
            Some(n) if n >= 0.0 && n.fract() == 0.0 && n <= MAX_WHOLE as f64 => Ok(Some(n as u64)),
            Some(n) => Err(LabError::config(
                name,
                format!("expected a whole number up to {}, found {}", MAX_WHOLE, n),
            )),
        }
    }

    fn size(&mut self, name: &str) -> LabResult<Option<usize>> {
        self.whole(name)?
            .map(|n| usize::try_from(n).map_err(|_| LabError::config(name, format!("{} is too large", n))))
            .transpose()
    }

    fn boolean(&mut self, name: &str) -> LabResult<Option<bool>> {
        match self.take(name) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(self.mismatch(name, "boolean", other)),
        }
    }

    fn required_list(&mut self, name: &str) -> LabResult<Vec<String>> {
        match self.take(name) {
            None => Err(LabError::config(name, format!("required by '{}'", self.command))),
            Some(Value::List(items)) => Ok(items.clone()),
            Some(other) => Err(self.mismatch(name, "list", other)),
        }
    }

    /// Fail on the first argument nothing asked for
    fn finish(self) -> LabResult<()> {
        match self.args.iter().zip(&self.used).find(|(_, used)| !**used) {
            Some((arg, _)) => Err(LabError::config(
                arg.name.as_str(),
                format!("unknown argument for '{}'", self.command),
            )),
            None => Ok(()),
        }
    }
}
